mod commands;

use clap::{Parser, Subcommand};
use datapackage_core::VALIDATE_PEEK_ROWS;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "datapackage",
    version,
    about = "Validate, read and pack data packages"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a package descriptor and sample its data.
    Validate {
        /// Descriptor file, URL or JSON text.
        source: String,
        /// Directory relative data paths are resolved against.
        #[arg(long)]
        base_path: Option<PathBuf>,
        /// Rows sampled from each data stream.
        #[arg(long, default_value_t = VALIDATE_PEEK_ROWS)]
        sample_rows: usize,
    },
    /// Print the rows of one resource.
    Read {
        /// Descriptor file, URL or JSON text.
        source: String,
        /// Name of the resource to read.
        resource: String,
        /// Stop after this many rows.
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        base_path: Option<PathBuf>,
    },
    /// Pack a package and its data into a zip archive.
    Pack {
        /// Descriptor file, URL or JSON text.
        source: String,
        /// Archive to write.
        archive: PathBuf,
        #[arg(long)]
        base_path: Option<PathBuf>,
    },
    /// Extract a package archive into a directory.
    Unpack {
        archive: PathBuf,
        /// Target directory, created when missing.
        dir: PathBuf,
    },
    /// List the known profiles and their schemas.
    Profiles,
}

fn init_logging(verbose: bool, trace: bool) {
    let default_level = match (trace, verbose) {
        (true, _) => "trace",
        (false, true) => "debug",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_env("DATAPACKAGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    // `read` output piped into `head` must not end in a panic
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if info.to_string().contains("failed printing to stdout") {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.trace);

    let json = cli.json;
    let result = match cli.command {
        Commands::Validate {
            source,
            base_path,
            sample_rows,
        } => commands::validate::run(&source, base_path.as_deref(), sample_rows, json),
        Commands::Read {
            source,
            resource,
            limit,
            base_path,
        } => commands::read::run(&source, &resource, limit, base_path.as_deref(), json),
        Commands::Pack {
            source,
            archive,
            base_path,
        } => commands::pack::run(&source, &archive, base_path.as_deref(), json),
        Commands::Unpack { archive, dir } => commands::unpack::run(&archive, &dir, json),
        Commands::Profiles => commands::profiles::run(json),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code())
        }
    }
}
