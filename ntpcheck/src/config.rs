//! Command line configuration.

use std::ffi::OsString;
use std::time::Duration;

use clap::{crate_version, App, Arg, ArgMatches};
use log::LevelFilter;

use crate::DEFAULT_TIMEOUT;

/// Settings for one run of the probe.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub target: String,
    pub timeout: Duration,
    pub verbosity: u64,
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: String::new(),
            timeout: DEFAULT_TIMEOUT,
            verbosity: 0,
            pretty: false,
        }
    }
}

impl Config {
    pub fn app<'a, 'b>() -> App<'a, 'b> {
        App::new("ntpcheck")
            .version(crate_version!())
            .about("Tests an NTP server with a single SNTP request")
            .arg(
                Arg::with_name("TARGET")
                    .help("Server IP address, ip:port or host name")
                    .required(true)
                    .index(1),
            )
            .arg(
                Arg::with_name("timeout")
                    .short("t")
                    .long("timeout")
                    .value_name("SECONDS")
                    .help("Seconds to wait for the reply")
                    .takes_value(true)
                    .validator(|v| parse_timeout(&v).map(|_| ())),
            )
            .arg(
                Arg::with_name("verbose")
                    .short("v")
                    .multiple(true)
                    .help("Sets the level of verbosity"),
            )
            .arg(
                Arg::with_name("pretty")
                    .long("pretty")
                    .help("Pretty-prints the JSON report"),
            )
    }

    /// Parses the given arguments; the first one is the program name.
    pub fn from_args<I, T>(args: I) -> Result<Config, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Config::app().get_matches_from_safe(args)?;
        Ok(Config::from_matches(&matches))
    }

    pub fn from_matches(matches: &ArgMatches<'_>) -> Config {
        let defaults = Config::default();

        Config {
            target: matches.value_of("TARGET").unwrap_or_default().to_owned(),
            timeout: matches
                .value_of("timeout")
                .and_then(|v| parse_timeout(v).ok())
                .unwrap_or(defaults.timeout),
            verbosity: matches.occurrences_of("verbose"),
            pretty: matches.is_present("pretty"),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Positive, finite number of seconds.
pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid timeout {:?}: {}", value, e))?;

    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {}", value));
    }

    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) if timeout > Duration::from_secs(0) => Ok(timeout),
        _ => Err(format!("timeout {} is out of range", value)),
    }
}
