//! Generates the work model of a simulated service topology.
//!
//! Reads the work model parameters and the service graph, assigns an internal function to every service, and writes the
//! resulting work model next to the other simulation artifacts.

#![deny(warnings)]
#![deny(missing_docs)]

use clap::Parser as _;
use tracing::{error, info};
use workmodel_error::GenericError;

mod cli;
use self::cli::Cli;

mod config;

mod driver;
use self::driver::Driver;

mod logging;
use self::logging::initialize_logging;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = initialize_logging(&cli.log_level) {
        eprintln!("FATAL: {:?}", e);
        std::process::exit(1);
    }

    match run(cli) {
        Ok(()) => info!("workmodel-gen stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<(), GenericError> {
    info!("workmodel-gen starting...");

    let driver = Driver::from_cli(cli)?;
    driver.run()
}
