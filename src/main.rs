use std::path::PathBuf;

use clap::Parser;

/// CNC Catalog - browse laser-cut design catalogs from the terminal.
#[derive(Parser, Debug)]
#[command(name = "cnc-catalog", version, about)]
struct Cli {
    /// Dataset file: a JSON array or a generated db.js script
    #[arg(short, long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level written to the log file; RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Log file (defaults to the user cache directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let opts = cnc_catalog::RunOptions {
        data_file: cli.data,
        config_file: cli.config,
        log_level: cli.log_level,
        log_file: cli.log_file,
    };
    if let Err(err) = cnc_catalog::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
