use std::env;
use std::process;

use clap::ErrorKind;
use log::{debug, error};
use simple_logger::SimpleLogger;

use ntpcheck::config::Config;
use ntpcheck::{test_server, Report};

fn main() {
    let config = match Config::from_args(env::args_os()) {
        Ok(config) => config,
        Err(e) if e.kind == ErrorKind::HelpDisplayed || e.kind == ErrorKind::VersionDisplayed => {
            e.exit()
        }
        Err(e) => {
            eprintln!("{}", e.message);
            process::exit(2);
        }
    };

    if let Err(e) = SimpleLogger::new().with_level(config.log_level()).init() {
        eprintln!("unable to initialize logger: {}", e);
    }
    debug!("{:?}", config);

    let outcome = test_server(&config.target, config.timeout);
    let report = Report::from(&outcome);

    let json = if config.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };

    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("unable to serialize report: {}", e);
            process::exit(1);
        }
    }

    if outcome.is_err() {
        process::exit(1);
    }
}
