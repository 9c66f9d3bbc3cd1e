//! booking-etl command line interface

mod commands;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use booking_etl::pipeline::PipelineError;
use clap::{Parser, Subcommand};

use commands::RunArgs;

#[derive(Parser)]
#[command(name = "booking-etl", version, about = "Hotel booking star-schema ETL")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline
    Run(RunArgs),
    /// Check a pipeline configuration file
    ValidateConfig {
        /// TOML configuration file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => logging::init(args.verbose, args.log_file.as_deref())
            .and_then(|()| commands::handle_run(args)),
        Commands::ValidateConfig { file } => commands::handle_validate_config(file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PipelineError>() {
                Some(pipeline_err) => eprintln!("Error: {}", pipeline_err.user_message()),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
