//! tfchart CLI - render Terraform charts from Jinja2 templates

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod logging;
mod server;

use error::{CliError, Result};
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "tfchart")]
#[command(author = "tfchart Contributors")]
#[command(version)]
#[command(about = "Render Terraform charts from Jinja2 templates and a values document", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "LOG_MODE", value_enum, default_value_t = LogFormat::Console)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a chart into an output directory
    Render {
        /// Chart directory, .tgz archive or oci:// reference
        #[arg(short, long, env = "TFCHART_CHART")]
        chart: String,

        /// Values file
        #[arg(short = 'f', long = "values", env = "TFCHART_VALUES", default_value = "values.yaml")]
        values: PathBuf,

        /// Output directory
        #[arg(short, long, env = "TFCHART_OUTPUT", default_value = "output")]
        output: PathBuf,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Render undefined variables as empty instead of failing
        #[arg(long)]
        lenient: bool,

        /// Where archives and registry charts are unpacked
        #[arg(long, default_value = ".tfchart/charts")]
        cache_dir: PathBuf,
    },

    /// Pull a chart from an OCI registry
    Pull {
        /// Chart reference (oci://registry/repository/chart:tag)
        reference: String,

        /// Destination directory
        #[arg(short, long, default_value = "charts")]
        dest: PathBuf,
    },

    /// Lint a chart
    Lint {
        /// Chart path
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Values file to validate against the chart
        #[arg(short = 'f', long = "values")]
        values: Option<PathBuf>,
    },

    /// Show chart information
    Show {
        /// Chart path
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Run the HTTP render server
    Serve {
        /// Address to listen on
        #[arg(long, env = "TFCHART_ADDR", default_value = "0.0.0.0:8080")]
        addr: SocketAddr,
    },
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let code = match run(cli.command) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            tracing::debug!(exit_code = code, error = %err, "command failed");
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };

    std::process::exit(code);
}

fn run(command: Commands) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::internal(format!("failed to start async runtime: {}", e)))?;

    match command {
        Commands::Render {
            chart,
            values,
            output,
            set,
            lenient,
            cache_dir,
        } => runtime.block_on(commands::render::run(
            &chart, &values, &set, &output, lenient, &cache_dir,
        )),

        Commands::Pull { reference, dest } => {
            runtime.block_on(commands::pull::run(&reference, &dest))
        }

        Commands::Lint { path, values } => commands::lint::run(&path, values.as_deref()),

        Commands::Show { path } => commands::show::run(&path),

        Commands::Serve { addr } => runtime.block_on(commands::serve::run(addr)),
    }
}
