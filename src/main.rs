use anyhow::Result;
use clap::Parser;

use suiteconf::logging;
use suiteconf::{cli, commands};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose);
    let log = logging::Logger::new(args.verbose);

    match args.command {
        cli::Command::Dump(opts) => {
            commands::dump::run(&args.global, &opts, &log)
        }
        cli::Command::Diff(opts) => {
            commands::diff::run(&args.global, &opts, &log)
        }
        cli::Command::Resolve(opts) => {
            commands::resolve::run(&args.global, &opts, &log)
        }
        cli::Command::Validate(opts) => {
            commands::validate::run(&args.global, &opts, &log)
        }
        cli::Command::Transform(opts) => {
            commands::transform::run(&args.global, &opts, &log)
        }
        cli::Command::Version => {
            let version = option_env!("SUITECONF_VERSION")
                .unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("suiteconf {version}");
            Ok(())
        }
    }
}
