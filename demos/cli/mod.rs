//! Argument handling shared by the demos.
//!
//! Every demo takes `--config FILE` (or `-c FILE`), a few on/off switches and
//! some paths. Anything else starting with `-` prints the usage and exits.

use std::process;

use tracing_subscriber::EnvFilter;
use unistore::{Dispatcher, StorageConfig};

/// Parsed command line of one demo.
pub struct Args {
    usage: &'static str,
    config: Option<String>,
    switches: Vec<String>,
    pub paths: Vec<String>,
}

impl Args {
    /// Parse the process arguments, accepting only the given switches.
    pub fn parse(usage: &'static str, switches: &[&str]) -> Self {
        let mut args = Self {
            usage,
            config: None,
            switches: Vec::new(),
            paths: Vec::new(),
        };
        let mut raw = std::env::args().skip(1);
        while let Some(arg) = raw.next() {
            match arg.as_str() {
                "-h" | "--help" => {
                    println!("{}", usage);
                    process::exit(0);
                }
                "-c" | "--config" => match raw.next() {
                    Some(file) => args.config = Some(file),
                    None => args.fail(),
                },
                s if switches.contains(&s) => args.switches.push(s.to_string()),
                s if s.starts_with('-') => args.fail(),
                s => args.paths.push(s.to_string()),
            }
        }
        args
    }

    /// Whether `switch` was given.
    pub fn has(&self, switch: &str) -> bool {
        self.switches.iter().any(|s| s == switch)
    }

    /// Print the usage and exit with status 1.
    pub fn fail(&self) -> ! {
        eprintln!("{}", self.usage);
        process::exit(1);
    }

    /// Dispatcher built from `--config`, or from defaults without one.
    pub fn dispatcher(&self) -> unistore::Result<Dispatcher> {
        let config = match &self.config {
            Some(file) => StorageConfig::from_file(file)?,
            None => StorageConfig::default(),
        };
        Ok(Dispatcher::from_config(&config))
    }
}

/// Install a `tracing` subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("unistore=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
