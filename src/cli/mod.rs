pub mod consolidate;
pub mod kinds;
pub mod template;

use clap::{Args, Parser, Subcommand};

fn long_version() -> String {
    let git_hash = option_env!("GIT_HASH").unwrap_or("dev");
    let build_ts = option_env!("BUILD_TIMESTAMP").unwrap_or("unknown");
    format!("{} ({git_hash}, built {build_ts})", env!("CARGO_PKG_VERSION"))
}

#[derive(Parser)]
#[command(
    name = "coalesce",
    version,
    long_version = long_version(),
    about = "Consolidation engine for vulnerability scan findings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deduplicate and group findings into notification inputs
    Consolidate(ConsolidateArgs),
    /// List every kind known to the registered adapters
    Kinds,
    /// Print the composed notification template
    Template(TemplateArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ConsolidateArgs {
    /// JSON file with the findings to consolidate
    #[arg(short, long)]
    pub findings: String,

    /// Treat the input as raw scanner results and run adapter extraction
    #[arg(long)]
    pub raw: bool,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON file mapping hostnames to already-resolved IP addresses
    #[arg(long)]
    pub resolved_ips: Option<String>,

    /// JSON file with normal-form keys of previously sent reports
    #[arg(long)]
    pub already_reported: Option<String>,

    /// Message locale used during extraction: en_US, pl_PL
    #[arg(long, default_value = "en_US")]
    pub locale: String,

    /// Output directory for results
    #[arg(short, long, default_value = "./output")]
    pub output: String,
}

#[derive(Args, Clone)]
pub struct TemplateArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: String,
}

pub(crate) fn load_config(
    path: Option<&str>,
) -> Result<coalesce::config::CoalesceConfig, coalesce::CoalesceError> {
    match path {
        Some(path) => coalesce::config::parse_config(std::path::Path::new(path)),
        None => Ok(coalesce::config::CoalesceConfig::default()),
    }
}

pub(crate) fn parse_locale(raw: &str) -> Result<coalesce::adapters::Locale, coalesce::CoalesceError> {
    match raw {
        "en_US" => Ok(coalesce::adapters::Locale::EnUs),
        "pl_PL" => Ok(coalesce::adapters::Locale::PlPl),
        other => Err(coalesce::CoalesceError::Config(format!(
            "Unknown locale: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        // Builds the complete command, long_version included.
        Cli::command().debug_assert();
    }

    #[test]
    fn test_long_version_carries_package_version() {
        assert!(long_version().contains(env!("CARGO_PKG_VERSION")));
    }
}
