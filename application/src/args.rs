//! Command line [`Args`] of the server.

use clap::Parser;

/// Server admitting purchases on flash sales.
///
/// Everything besides the configuration file location is configured via
/// the file itself or `CONF.`-prefixed environment variables.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file, skipped if it doesn't exist.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

impl Args {
    /// Parses [`Args`] of the current process.
    ///
    /// # Errors
    ///
    /// If unknown or malformed arguments are provided, or `--help` or
    /// `--version` is requested.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod spec {
    use clap::Parser as _;

    use super::Args;

    #[test]
    fn defaults_config_path() {
        let args = Args::try_parse_from(["server"]).unwrap();
        assert_eq!(args.config, "config.toml");

        let args =
            Args::try_parse_from(["server", "-c", "/etc/sales.toml"]).unwrap();
        assert_eq!(args.config, "/etc/sales.toml");
    }
}
