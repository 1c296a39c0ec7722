use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meteo_importer::models::{
    FieldDescriptor, FormatKind, FormatSpec, Granularity, PointCodeOrigin, PointCodeRule,
    SchemaModel, TimeRule, VariableRule,
};
use meteo_importer::readers::RecordParser;
use meteo_importer::writers::{MemorySink, StorageKind};
use meteo_importer::processors::ImportPipeline;
use std::io::Write;
use std::path::Path;

fn fixed_schema(replications: usize) -> SchemaModel {
    SchemaModel {
        format: FormatSpec {
            kind: Some(FormatKind::Fixed),
            ..FormatSpec::default()
        },
        point_code: PointCodeRule {
            origin: Some(PointCodeOrigin::FieldDefined),
            field: FieldDescriptor::fixed(1, 5, "%s"),
        },
        time: TimeRule {
            granularity: Some(Granularity::Daily),
            field: FieldDescriptor::fixed(7, 8, "yyyyMMdd"),
        },
        variables: vec![VariableRule::builder()
            .value_field(FieldDescriptor::fixed(16, 6, "%.1f").with_kind("DAILY_PREC"))
            .replication_count(replications)
            .build()],
        num_var_fields: replications,
        ..SchemaModel::default()
    }
}

fn fixed_line(replications: usize) -> String {
    let mut line = String::from("00123 20230101 ");
    for i in 0..replications {
        line.push_str(&format!("{:>6.1}", i as f32 * 0.3));
    }
    line
}

fn benchmark_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_fixed_line");

    for replications in [1usize, 31] {
        let schema = fixed_schema(replications);
        let parser = RecordParser::new(&schema).expect("valid schema");
        let line = fixed_line(replications);

        group.bench_with_input(
            BenchmarkId::from_parameter(replications),
            &line,
            |b, line| {
                b.iter(|| {
                    parser
                        .parse_line(black_box(line), 1, Path::new("bench.txt"))
                        .expect("parse")
                })
            },
        );
    }

    group.finish();
}

fn benchmark_import_file(c: &mut Criterion) {
    let schema = fixed_schema(31);
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    for station in 0..20 {
        for day in 0..30 {
            let line = fixed_line(31).replacen("00123", &format!("{:05}", station), 1);
            let line = line.replacen("20230101", &format!("2023{:02}01", day % 12 + 1), 1);
            writeln!(file, "{}", line).expect("write");
        }
    }
    file.flush().expect("flush");

    c.bench_function("import_600_lines", |b| {
        b.iter(|| {
            let mut sink = MemorySink::new()
                .with_stations(StorageKind::Point, (0..20).map(|s| format!("{:05}", s)));
            ImportPipeline::new(&schema, StorageKind::Point)
                .run(black_box(file.path()), &mut sink)
                .expect("import")
        })
    });
}

criterion_group!(benches, benchmark_parse_line, benchmark_import_file);
criterion_main!(benches);
