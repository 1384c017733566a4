use std::process;

use clap::Parser;
use log::error;

use aep::main_with_cli;
use aep_config::Cli;

fn main() {
    let cli = Cli::parse();
    logger::Logger::init(cli.verbose + u8::from(!cli.quiet));

    if let Err(err) = main_with_cli(cli) {
        error!("{err:?}");
        process::exit(1);
    }
}
