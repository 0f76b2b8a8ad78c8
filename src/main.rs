mod cli;

use clap::Parser;
use coalesce::CoalesceError;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = cli::Cli::parse();

    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let result = match cli.command {
        cli::Commands::Consolidate(args) => cli::consolidate::handle_consolidate(args),
        cli::Commands::Kinds => cli::kinds::handle_kinds(),
        cli::Commands::Template(args) => cli::template::handle_template(args),
        cli::Commands::Validate(args) => handle_validate(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            CoalesceError::Config(_) => 2,
            CoalesceError::UnregisteredKind(_)
            | CoalesceError::DuplicateKind { .. }
            | CoalesceError::RuleForUndeclaredKind { .. }
            | CoalesceError::MissingSeverity { .. } => 3,
            CoalesceError::MalformedTarget { .. } | CoalesceError::NotADomain(_) => 4,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

fn handle_validate(args: cli::ValidateArgs) -> Result<(), CoalesceError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = coalesce::config::parse_config(&path)?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
