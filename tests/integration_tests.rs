use meteo_importer::config::ImportConfig;
use meteo_importer::error::{ProcessingError, Result};
use meteo_importer::processors::{ImportPipeline, ImportSession};
use meteo_importer::readers::{SchemaLoader, StationReader};
use meteo_importer::utils::build_filename;
use meteo_importer::writers::{MemorySink, ParquetSink, StorageKind};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXED_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<importSchema>
    <filename>
        <path>data/</path>
        <field>
            <pragaName>id_point</pragaName>
            <text>_daily</text>
            <text>.txt</text>
            <nrChar>5</nrChar>
        </field>
    </filename>
    <format>
        <type>Fixed</type>
        <attribute>multiPoint</attribute>
        <headerRows>2</headerRows>
        <missingValue>-999</missingValue>
    </format>
    <pointCode>
        <type>FieldDefined</type>
        <format>%s</format>
        <firstChar>1</firstChar>
        <nrChar>5</nrChar>
    </pointCode>
    <time>
        <type>daily</type>
        <format>yyyyMMdd</format>
        <firstChar>7</firstChar>
        <nrChar>8</nrChar>
    </time>
    <variableCode>
        <type>FIXED</type>
    </variableCode>
    <variable>
        <field>
            <type>DAILY_TMIN</type>
            <format>%.1f</format>
            <firstChar>16</firstChar>
            <nrChar>6</nrChar>
        </field>
        <flag>
            <field>
                <format>%d</format>
                <firstChar>22</firstChar>
                <nrChar>1</nrChar>
            </field>
            <accepted>1</accepted>
        </flag>
    </variable>
    <variable>
        <field>
            <type>DAILY_PREC</type>
            <format>%.1f</format>
            <firstChar>23</firstChar>
            <nrChar>6</nrChar>
        </field>
        <nr_replications>3</nr_replications>
    </variable>
</importSchema>"#;

const DELIMITED_SCHEMA: &str = r#"<importSchema>
    <format><type>csv</type><headerRows>1</headerRows></format>
    <pointCode><type>FIELDEFINED</type><position>1</position></pointCode>
    <time><type>hourly</type><position>2</position><format>yyyy-MM-dd hh</format></time>
    <variable><field><type>TAVG</type><position>3</position><format>%.1f</format></field></variable>
    <variable>
        <field><type>PREC</type><position>4</position><format>%.1f</format></field>
        <flag><field><position>5</position></field><accepted>V</accepted></flag>
    </variable>
</importSchema>"#;

const STATIONS: &str = "code,name,latitude,longitude,elevation\n\
    # test network\n\
    00123,Bologna Urbana,44.50,11.35,54\n\
    00456,Modena,44.65,10.92,\n";

/// One fixed-width row: code, date, tmin+flag, then three daily precipitation values
fn fixed_row(code: &str, date: &str, tmin: &str, flag: &str, prec: [&str; 3]) -> String {
    format!(
        "{:<5} {:8} {:>6}{}{:>6}{:>6}{:>6}",
        code, date, tmin, flag, prec[0], prec[1], prec[2]
    )
}

fn write_fixture(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

fn fixed_data_file(dir: &Path) -> Result<PathBuf> {
    let lines = [
        "FIXED WIDTH EXPORT".to_string(),
        "code  date     tmin f prec".to_string(),
        fixed_row("00123", "20230101", "-2.5", "1", ["0.2", "1.4", "0.0"]),
        fixed_row("00123", "20230104", "3.0", "0", ["1.0", "-999.0", "2.0"]),
        String::new(),
        fixed_row("00456", "20230101", "1.2", "1", ["0.0", "0.0", "abc"]),
    ];
    write_fixture(dir, "network_daily.txt", &(lines.join("\n") + "\n"))
}

fn rows(sink: &MemorySink, code: &str) -> Vec<String> {
    sink.rows_for(code).iter().map(|r| r.to_string()).collect()
}

#[test]
fn test_fixed_multi_point_import() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = SchemaLoader::new().load_str(FIXED_SCHEMA)?;
    let data = fixed_data_file(dir.path())?;

    let mut sink = MemorySink::new().with_stations(StorageKind::Point, ["00123", "00456"]);
    let outcome = ImportPipeline::new(&schema, StorageKind::Point)
        .with_max_batch_size(0)
        .run(&data, &mut sink)?;

    assert_eq!(outcome.data_lines, 3);
    assert_eq!(outcome.stations, vec!["00123".to_string(), "00456".to_string()]);
    // rejected flag on the second row and the -999 sentinel
    assert_eq!(outcome.missing_values, 2);
    assert_eq!(outcome.error_rows, 1);
    assert_eq!(outcome.error_count, 1);

    assert_eq!(
        rows(&sink, "00123"),
        vec![
            "('2023-01-01',101,-2.5)",
            "('2023-01-01',104,0.2)",
            "('2023-01-02',104,1.4)",
            "('2023-01-03',104,0)",
            "('2023-01-04',104,1)",
            "('2023-01-06',104,2)",
        ]
    );
    assert_eq!(
        rows(&sink, "00456"),
        vec![
            "('2023-01-01',101,1.2)",
            "('2023-01-01',104,0)",
            "('2023-01-02',104,0)",
        ]
    );
    assert_eq!(sink.batches().len(), 2);
    Ok(())
}

#[test]
fn test_schema_file_and_filename_rule() -> Result<()> {
    let dir = TempDir::new()?;
    let schema_path = write_fixture(dir.path(), "schema.xml", FIXED_SCHEMA)?;
    let schema = SchemaLoader::new().load_file(&schema_path)?;

    assert_eq!(
        build_filename("00123", &schema)?,
        PathBuf::from("data/00123_daily.txt")
    );
    assert!(build_filename("001234", &schema).is_err());
    Ok(())
}

#[test]
fn test_missing_schema_file() {
    let result = SchemaLoader::new().load_file(Path::new("/nonexistent/schema.xml"));
    assert!(result.is_err());
}

#[test]
fn test_session_writes_parquet() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = SchemaLoader::new().load_str(FIXED_SCHEMA)?;
    let data = fixed_data_file(dir.path())?;
    let stations_path = write_fixture(dir.path(), "stations.csv", STATIONS)?;
    let stations = StationReader::new().read_stations(&stations_path)?;
    assert_eq!(stations.len(), 2);

    let output = dir.path().join("import.parquet");
    let mut sink = ParquetSink::new(&output)
        .with_compression("snappy")?
        .with_row_group_size(4)
        .with_stations(StorageKind::Point, &stations);

    let report = ImportSession::new(&schema, ImportConfig::default()).run(&[data], &mut sink)?;
    assert_eq!(report.total_observations(), 9);
    assert_eq!(sink.rows_written(), 9);

    let info = sink.finish()?;
    assert!(output.exists());
    assert_eq!(info.total_rows, 9);
    assert_eq!(info.row_groups, 3);
    Ok(())
}

#[test]
fn test_delimited_hourly_import_with_text_flag() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = SchemaLoader::new().load_str(DELIMITED_SCHEMA)?;
    let data = write_fixture(
        dir.path(),
        "hourly.csv",
        "code,time,tavg,prec,flag\n\
         00456,2023-06-01 00,18.4,0.0,V\n\
         00456,2023-06-01 01,17.9,3.2,N\n",
    )?;

    let mut sink = MemorySink::new().with_station(StorageKind::Grid, "00456");
    let outcome = ImportPipeline::new(&schema, StorageKind::Grid).run(&data, &mut sink)?;

    assert_eq!(outcome.missing_values, 1);
    assert_eq!(
        rows(&sink, "00456"),
        vec![
            "('2023-06-01 00:00:00',1,18.4)",
            "('2023-06-01 00:00:00',2,0)",
            "('2023-06-01 01:00:00',1,17.9)",
        ]
    );
    Ok(())
}

#[test]
fn test_unknown_station_keeps_earlier_batches() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = SchemaLoader::new().load_str(FIXED_SCHEMA)?;
    let data = fixed_data_file(dir.path())?;

    let mut sink = MemorySink::new().with_station(StorageKind::Point, "00123");
    let err = ImportPipeline::new(&schema, StorageKind::Point)
        .run(&data, &mut sink)
        .unwrap_err();

    match err {
        ProcessingError::UnknownStation { code, .. } => assert_eq!(code, "00456"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.rows_for("00123").len(), 6);
    assert!(sink.rows_for("00456").is_empty());
    Ok(())
}

#[test]
fn test_dry_run_session_over_latin1_file() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = SchemaLoader::new().load_str(DELIMITED_SCHEMA)?;

    // trailing non-ASCII column
    let mut bytes = b"code,time,tavg,prec,flag\n".to_vec();
    bytes.extend_from_slice(b"00123,2023-06-01 00,21.0,0.4,V,Forl\xEC\n");
    let data = dir.path().join("latin1.csv");
    std::fs::write(&data, bytes)?;

    let config = ImportConfig {
        encoding: "latin1".to_string(),
        ..ImportConfig::default()
    };
    let mut sink = MemorySink::new().with_station(StorageKind::Point, "00123");
    let report = ImportSession::new(&schema, config)
        .with_dry_run(true)
        .run(&[data], &mut sink)?;

    assert!(report.dry_run);
    assert_eq!(report.total_observations(), 2);
    assert!(report.generate_summary().contains("Files imported: 1"));
    Ok(())
}

#[test]
fn test_parquet_keeps_earlier_files_after_fatal_error() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = SchemaLoader::new().load_str(DELIMITED_SCHEMA)?;
    let stations_path = write_fixture(dir.path(), "stations.csv", STATIONS)?;
    let stations = StationReader::new().read_stations(&stations_path)?;

    let good = write_fixture(
        dir.path(),
        "good.csv",
        "code,time,tavg,prec,flag\n00123,2023-06-01 00,21.0,0.4,V\n",
    )?;
    let bad = write_fixture(
        dir.path(),
        "bad.csv",
        "code,time,tavg,prec,flag\n00456,2023-06-01 00,18.0\n",
    )?;

    let output = dir.path().join("partial.parquet");
    let mut sink = ParquetSink::new(&output).with_stations(StorageKind::Point, &stations);

    let result = ImportSession::new(&schema, ImportConfig::default()).run(&[good, bad], &mut sink);
    assert!(matches!(
        result,
        Err(ProcessingError::ColumnOutOfRange { column: 4, .. })
    ));
    assert_eq!(sink.rows_written(), 2);

    let info = sink.finish()?;
    assert!(output.exists());
    assert_eq!(info.total_rows, 2);
    Ok(())
}
