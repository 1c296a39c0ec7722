use crate::cli::args::{Cli, Commands};
use crate::config::ImportConfig;
use crate::error::Result;
use crate::processors::ImportSession;
use crate::readers::{SchemaLoader, StationReader};
use crate::utils::filename::{build_filename, generate_default_parquet_filename};
use crate::writers::{MemorySink, ParquetSink, StorageKind};
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments of the import command, moved onto the blocking pool
struct ImportOptions {
    schema: PathBuf,
    stations: PathBuf,
    grid: bool,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    dry_run: bool,
    encoding: Option<String>,
    compression: Option<String>,
    max_batch_size: Option<usize>,
    mmap: bool,
    files: Vec<PathBuf>,
}

pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(&cli)?;

    match cli.command {
        Commands::Import {
            schema,
            stations,
            grid,
            output,
            config,
            dry_run,
            encoding,
            compression,
            max_batch_size,
            mmap,
            files,
        } => {
            let options = ImportOptions {
                schema,
                stations,
                grid,
                output,
                config,
                dry_run,
                encoding,
                compression,
                max_batch_size,
                mmap,
                files,
            };
            tokio::task::spawn_blocking(move || run_import(options)).await??;
        }

        Commands::Schema { schema, json } => {
            let model = tokio::task::spawn_blocking(move || SchemaLoader::new().load_file(&schema))
                .await??;

            if json {
                println!("{}", serde_json::to_string_pretty(&model)?);
            } else {
                println!("{}", model.summary());
            }
        }

        Commands::Filename { schema, code } => {
            let model = SchemaLoader::new().load_file(&schema)?;
            println!("{}", build_filename(&code, &model)?.display());
        }
    }

    Ok(())
}

/// Set up structured logging; `RUST_LOG` takes precedence over `--verbose`
pub fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = cli.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("meteo_importer={}", log_level)));

    if let Some(path) = &cli.log_file {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn resolve_config(options: &ImportOptions) -> Result<ImportConfig> {
    let mut config = ImportConfig::load(options.config.as_deref())?;

    if options.grid {
        config.storage = StorageKind::Grid;
    }
    if let Some(encoding) = &options.encoding {
        config.encoding = encoding.clone();
    }
    if let Some(compression) = &options.compression {
        config.compression = compression.clone();
    }
    if let Some(max_batch_size) = options.max_batch_size {
        config.max_batch_size = max_batch_size;
    }
    if options.mmap {
        config.use_mmap = true;
    }

    config.check()?;
    Ok(config)
}

fn run_import(options: ImportOptions) -> Result<()> {
    let config = resolve_config(&options)?;
    let schema = SchemaLoader::new().load_file(&options.schema)?;
    println!("{}\n", schema.summary());

    let stations = StationReader::new().read_stations(&options.stations)?;
    info!(
        "{} {} stations registered",
        stations.len(),
        config.storage
    );

    let session = ImportSession::new(&schema, config.clone())
        .with_progress(true)
        .with_dry_run(options.dry_run);

    if options.dry_run {
        let mut sink = MemorySink::new()
            .with_stations(config.storage, stations.iter().map(|s| s.code.as_str()));
        let report = session.run(&options.files, &mut sink)?;
        println!("\n{}", report.generate_summary());
        println!("Dry run complete - no output file written");
        return Ok(());
    }

    let output = options
        .output
        .clone()
        .unwrap_or_else(generate_default_parquet_filename);

    // Create output directory if it doesn't exist
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut sink = ParquetSink::new(&output)
        .with_compression(&config.compression)?
        .with_row_group_size(config.row_group_size)
        .with_stations(config.storage, &stations);

    // close the file before surfacing an import error so written batches persist
    let result = session.run(&options.files, &mut sink);
    let file_info = sink.finish()?;
    let report = result?;

    println!("\n{}", report.generate_summary());
    println!("\n{}", file_info.summary());
    println!("Import complete: {}", output.display());

    Ok(())
}
