use clap::Parser;
use mesmerise_cli::args::CliArgs;
use mesmerise_cli::{logging, run};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logging::init(args.verbose, args.quiet)?;
    run::run(&args)
}
