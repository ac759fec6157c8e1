use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;

/// Assess the health of PyPI dependencies
#[derive(Parser, Debug)]
#[command(name = "dep-health")]
#[command(version)]
#[command(
    about = "Assess the health of PyPI dependencies from registry, repository and vulnerability data",
    long_about = None
)]
pub struct Args {
    /// Path to a config file (defaults to ./dep-health.config.yml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the cache database (defaults to ~/.dep-health/cache.db)
    #[arg(long, global = true, value_name = "FILE")]
    pub cache_path: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assess one or more packages and print a JSON report
    ///
    /// Packages use the form name[extra1,extra2]==version; extras and
    /// version are optional.
    Check {
        /// Package specifiers, e.g. requests==2.31.0
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<String>,

        /// Bypass the local cache
        #[arg(long)]
        no_cache: bool,

        /// Number of packages assessed at the same time
        #[arg(long, value_name = "N")]
        max_concurrency: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print compact JSON instead of pretty-printed JSON
        #[arg(long)]
        compact: bool,
    },

    /// Inspect or maintain the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheAction {
    /// Show entry counts and database size
    Stats,
    /// Remove expired entries
    Cleanup,
    /// Remove every entry
    Clear,
    /// Remove entries whose key matches a pattern ('*' is a wildcard)
    Invalidate {
        /// Key pattern, e.g. "github:*" or "pypi:pkg:requests"
        pattern: String,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Command-line values that override the config file.
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            cache_path: self.cache_path.clone(),
            ..CliOverrides::default()
        };
        if let Command::Check {
            no_cache,
            max_concurrency,
            timeout,
            ..
        } = &self.command
        {
            overrides.no_cache = *no_cache;
            overrides.max_concurrency = *max_concurrency;
            overrides.request_timeout_secs = *timeout;
        }
        overrides
    }
}
