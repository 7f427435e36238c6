//! Package Promoter CLI
//!
//! Promotes a production analytics package into development and testing copies

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use package_promoter::core::{
    AssetFailurePolicy, AssetScope, ConfigLoadOptions, ConfigLoader, HideConfig, HideStrategy,
    PromoteError, PromoterConfig, PromotionConfig, Settings,
};
use package_promoter::promotion::{HideReport, Promoter, derive_package_names};
use package_promoter::HttpStudioClient;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Promote analytics packages from production to development and testing
#[derive(Parser)]
#[command(name = "package-promoter")]
#[command(version)]
#[command(
    about = "Promote analytics packages from production to development and testing",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to ./.promote-config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy production into development and testing
    Promote {
        /// Key of the production package
        #[arg(long)]
        package_key: Option<String>,

        /// Space holding the packages
        #[arg(long)]
        space_id: Option<String>,

        /// Team domain sent with copy requests
        #[arg(long)]
        team_domain: Option<String>,

        /// Re-publish development and testing packages that already exist
        #[arg(long)]
        republish_existing: bool,

        /// Which assets to hide (views, all)
        #[arg(long)]
        hide_scope: Option<AssetScope>,

        /// How to issue visibility requests (batch, per-asset)
        #[arg(long)]
        hide_strategy: Option<HideStrategy>,

        /// What to do when hiding one asset fails (skip, abort)
        #[arg(long)]
        on_hide_failure: Option<AssetFailurePolicy>,
    },

    /// Copy one named package into another
    Copy {
        /// Name of the source package
        #[arg(long)]
        from: String,

        /// Name of the destination package
        #[arg(long)]
        to: String,

        /// Space holding the packages
        #[arg(long)]
        space_id: Option<String>,
    },

    /// Hide a package's assets and publish it
    Hide {
        /// Name of the package
        #[arg(long)]
        package: String,

        /// Space holding the package
        #[arg(long)]
        space_id: Option<String>,
    },

    /// Print the development and testing names for a production package
    Names {
        #[arg(value_name = "PRODUCTION_NAME")]
        production_name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            if let Some(promote_error) = e.downcast_ref::<PromoteError>() {
                eprintln!("\nSuggested actions:");
                for action in promote_error.suggested_actions() {
                    eprintln!("  - {}", action);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Promote {
            package_key,
            space_id,
            team_domain,
            republish_existing,
            hide_scope,
            hide_strategy,
            on_hide_failure,
        } => {
            let cli_layer = PromoterConfig {
                promotion: Some(PromotionConfig {
                    space_id,
                    source_package_key: package_key,
                    team_domain,
                    flavor: None,
                    republish_existing: republish_existing.then_some(true),
                }),
                hide: Some(HideConfig {
                    scope: hide_scope,
                    strategy: hide_strategy,
                    on_failure: on_hide_failure,
                }),
                ..PromoterConfig::default()
            };
            let settings = load_settings(cli.config, cli_layer).await?;
            promote_command(&settings).await
        }
        Commands::Copy { from, to, space_id } => {
            let settings = load_settings(cli.config, space_layer(space_id)).await?;
            copy_command(&settings, &from, &to).await
        }
        Commands::Hide { package, space_id } => {
            let settings = load_settings(cli.config, space_layer(space_id)).await?;
            hide_command(&settings, &package).await
        }
        Commands::Names { production_name } => {
            let names = derive_package_names(&production_name);
            println!("development: {}", names.development);
            println!("testing:     {}", names.testing);
            Ok(())
        }
    }
}

fn space_layer(space_id: Option<String>) -> PromoterConfig {
    PromoterConfig {
        promotion: Some(PromotionConfig {
            space_id,
            ..PromotionConfig::default()
        }),
        ..PromoterConfig::default()
    }
}

async fn load_settings(
    config_file: Option<PathBuf>,
    cli_layer: PromoterConfig,
) -> Result<Settings> {
    let options = ConfigLoadOptions {
        project_path: env::current_dir()?,
        config_file,
        cli_args: Some(cli_layer),
        env: env::vars().collect::<HashMap<_, _>>(),
    };

    let config = ConfigLoader::load(options).await?;
    Ok(ConfigLoader::resolve(config)?)
}

fn promoter(settings: &Settings) -> Result<Promoter> {
    let client = HttpStudioClient::from_settings(settings)?;
    Ok(Promoter::from_settings(Arc::new(client), settings))
}

async fn promote_command(settings: &Settings) -> Result<()> {
    let package_key = settings.require_source_package_key()?;
    println!("\n📦 package-promoter\n");

    let report = promoter(settings)?.promote(package_key).await?;

    println!("Production:  {} ({})", report.production.name, report.production.key);
    println!(
        "Development: {} ({}){}",
        report.development.name,
        report.development.key,
        if report.development_created { " [created]" } else { "" }
    );
    println!(
        "Testing:     {} ({}){}",
        report.testing.name,
        report.testing.key,
        if report.testing_created { " [created]" } else { "" }
    );
    print_hide_report(&report.hide);

    println!("\nStages:");
    for line in report.tracker.history().lines() {
        println!("  {}", line);
    }

    println!("\n✅ Promotion completed in {} ms", report.duration_ms);
    Ok(())
}

async fn copy_command(settings: &Settings, from: &str, to: &str) -> Result<()> {
    let report = promoter(settings)?.copy_between(from, to).await?;

    println!("Source:      {} ({})", report.source.name, report.source.key);
    println!("Destination: {} ({})", report.destination.name, report.destination.key);
    print_hide_report(&report.hide);

    println!("\n✅ Copy completed in {} ms", report.duration_ms);
    Ok(())
}

async fn hide_command(settings: &Settings, package: &str) -> Result<()> {
    let report = promoter(settings)?.hide_and_publish(package).await?;

    print_hide_report(&report);
    println!("\n✅ {} published", report.package);
    Ok(())
}

fn print_hide_report(report: &HideReport) {
    println!(
        "Hidden assets in {}: {}",
        report.package,
        report.hidden.len()
    );

    if !report.is_complete() {
        println!("⚠️  Assets left visible:");
        for failure in &report.failed {
            println!("  - {} ({}): {}", failure.name, failure.id, failure.error);
        }
    }
}
