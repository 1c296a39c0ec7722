use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meteo-importer")]
#[command(about = "Schema-driven importer for meteorological flat files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import data files (or zip archives of data files) described by a schema
    Import {
        #[arg(short, long, help = "XML import schema")]
        schema: PathBuf,

        #[arg(long, help = "CSV station list: code,name,latitude,longitude,elevation")]
        stations: PathBuf,

        #[arg(long, help = "Import into grid cells instead of point stations")]
        grid: bool,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/meteo-import-{YYMMDD}.parquet]"
        )]
        output: Option<PathBuf>,

        #[arg(short, long, help = "TOML settings file")]
        config: Option<PathBuf>,

        #[arg(long, help = "Parse and validate without writing output")]
        dry_run: bool,

        #[arg(long, help = "Text encoding of the data files")]
        encoding: Option<String>,

        #[arg(long, help = "Parquet compression codec")]
        compression: Option<String>,

        #[arg(long, help = "Rows per station batch (0 = unbounded)")]
        max_batch_size: Option<usize>,

        #[arg(long, help = "Read data files through a memory map")]
        mmap: bool,

        #[arg(required = true, help = "Data files or zip archives")]
        files: Vec<PathBuf>,
    },

    /// Load a schema and print the resulting model
    Schema {
        #[arg(short, long)]
        schema: PathBuf,

        #[arg(long, help = "Print the model as JSON")]
        json: bool,
    },

    /// Print the data filename the schema derives for a station code
    Filename {
        #[arg(short, long)]
        schema: PathBuf,

        #[arg(long)]
        code: String,
    },
}
