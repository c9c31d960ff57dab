//! Command-line argument parsing.
//!
//! Flags given here take precedence over the values in the config file.

use std::time::Duration;

use clap::Parser;

use bmm_core::cache::DEFAULT_TTL;

/// Command-line arguments for the `bmm` interactive session.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use bmm_cli::cli_args::Args;
///
/// let args = Args::parse_from(["bmm", "--org", "acme"]);
/// assert_eq!(args.org.as_deref(), Some("acme"));
/// ```
#[derive(Parser, Debug)]
#[command(term_width = 0)] // Just to make testing across clap features easier
pub struct Args {
    /// Path to the config file YAML.
    ///
    /// If not provided, defaults to `~/.bmm/config.yaml`, or asks which one
    /// to use when `~/.bmm/` holds several.
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Organization to operate in, overriding `api.org`.
    #[arg(long, short = 'o')]
    pub org: Option<String>,

    /// API base URL, overriding `api.base`.
    #[arg(long, short = 'b')]
    pub base_url: Option<String>,

    /// Bearer token, overriding any token in the config.
    #[arg(long, short = 't')]
    pub token: Option<String>,

    /// Seconds a fetched resource list stays fresh.
    #[arg(long, default_value_t = DEFAULT_TTL.as_secs())]
    pub cache_ttl: u64,
}

impl Args {
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}
