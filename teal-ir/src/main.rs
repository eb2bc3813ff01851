//! Teal IR runner
//!
//! Lists, runs and dumps the bundled demo programs.

use std::process::ExitCode;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use teal_ir::ir::PrintOptions;
use teal_ir::{InterpConfig, Interpreter, demos, parse_arg};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "teal-ir", version, about = "Run Teal programs on the IR interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the available demo programs.
    List,
    /// Evaluate a demo with the given program arguments.
    Run {
        demo: String,
        /// Integers are passed as ints, anything else as strings.
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the IR of a demo.
    Dump {
        /// Annotate instructions with their source locations.
        #[arg(short, long)]
        source_locations: bool,
        demo: String,
    },
}

fn main() -> ExitCode {
    let log_level = std::env::var("TEAL_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::List => {
            for demo in demos::all() {
                println!("{:<18} ({}) {}", demo.name, demo.params.join(", "), demo.description);
            }
        }
        Command::Run { demo, args } => {
            let demo = find_demo(&demo)?;
            if args.len() != demo.params.len() {
                bail!(
                    "Demo '{}' takes {} argument(s) ({}), got {}",
                    demo.name,
                    demo.params.len(),
                    demo.params.join(", "),
                    args.len()
                );
            }
            let program = demo.lower()?;
            let args = args.iter().map(|arg| parse_arg(arg)).collect();
            let result = Interpreter::new(&program)
                .with_config(InterpConfig::from_env())
                .eval(args)?;
            info!("Demo '{}' finished", demo.name);
            println!("{}", result.return_value());
        }
        Command::Dump {
            source_locations,
            demo,
        } => {
            let program = find_demo(&demo)?.lower()?;
            print!("{}", program.dump(PrintOptions { source_locations }));
        }
    }
    Ok(())
}

fn find_demo(name: &str) -> Result<&'static demos::Demo> {
    demos::find(name).ok_or_else(|| anyhow!("Unknown demo '{}'; try `teal-ir list`", name))
}
