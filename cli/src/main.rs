use clap::Parser;
use std::process::ExitCode;

mod analyze;
mod backend;
mod container;
mod entrypoint;
mod error;
mod execute;
mod logger;
mod plan;
mod vendor;
mod wi4mpi;

use self::execute::ExecuteArgs;
use self::logger::LogLevel;
use self::logger::Logger;

#[derive(clap::Parser)]
#[clap(version)]
struct Args {
    /// Verbose output; raises the effective level to at least `debug`.
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,

    /// Log level.
    #[clap(long = "log-level", default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Prepare and launch a container so a host-built MPI program runs
    /// against whichever MPI and C runtime the container actually needs.
    Execute(ExecuteArgs),
    /// In-container analysis step: scan the guest's library directories and
    /// write the result as JSON to stdout.
    Analyze,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = Logger::init(args.log_level, args.verbose) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let result = match args.command {
        Command::Execute(execute_args) => execute::run(execute_args),
        Command::Analyze => analyze::run().map(|()| 0),
    };

    match result {
        Ok(code) => exit_code(code),
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map(ExitCode::from).unwrap_or(ExitCode::FAILURE)
}
