use clap::{Parser, Subcommand};
use logwatch_core::cli;
use logwatch_core::cli::config::ConfigCmd;
use logwatch_core::cli::run::RunArgs;
use logwatch_core::logging::init_logging;

#[derive(Parser, Debug)]
#[command(
    name = "logwatch",
    version,
    about = "Logwatch: follow, parse and aggregate observer logs"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow a container or file and stream parsed events (default)
    Run(RunArgs),

    /// Parse lines from stdin into JSON events
    Parse,

    /// Configuration tooling
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Command::Run(args)) => {
            init_logging();
            cli::run::run(args)
        }
        Some(Command::Parse) => cli::parse::run_parse(),
        Some(Command::Config { cmd }) => cli::config::run(cmd),
        None => {
            init_logging();
            cli::run::run(RunArgs::default())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
