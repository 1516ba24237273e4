//! Command-line argument parsing for Tuning Lab.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

/// Policy-checked SQL*Plus broker for an Oracle tuning lab.
#[derive(Parser, Debug)]
#[command(name = "tuning-lab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Use the in-memory mock runner instead of docker and SQL*Plus
    #[arg(long, global = true)]
    pub mock: bool,

    /// Write logs to the default log file when none is configured
    #[arg(long, global = true)]
    pub log_to_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Check a script against the statement policy without running it
    Check {
        /// Script file, or "-" for stdin
        #[arg(value_name = "FILE")]
        script: String,
    },
    /// Check and run a script, printing the parsed output
    Run {
        /// Script file, or "-" for stdin
        #[arg(value_name = "FILE")]
        script: String,
    },
    /// Report container and database readiness
    Health,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
