//! CLI entry point for the easel-locate discovery tool.

use std::sync::Arc;

use clap::Parser;
use ipnet::Ipv4Net;
use tracing_subscriber::{fmt, EnvFilter};

use easel_locate::config::LocateConfig;
use easel_locate::orchestrator::{Discovery, Orchestrator};
use easel_locate::probe::PingProbe;
use easel_locate::registry::TargetRegistry;
use easel_locate::scanner::NmapScanner;
use easel_locate::verify::SshVerifier;

#[derive(Parser)]
#[command(name = "easel-locate")]
#[command(about = "Finds the easel display unit and records its address for deploys")]
struct Cli {
    /// Search only these ranges instead of enumerating local interfaces.
    #[arg(long = "cidr", value_name = "CIDR")]
    cidrs: Vec<Ipv4Net>,

    /// Search and verify, but leave the deploy document alone.
    #[arg(long)]
    dry_run: bool,

    /// Config file prefix (default: easel).
    #[arg(short, long, default_value = "easel")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = load_locate_config(&cli.config)?;
    config.validate()?;

    let scanner = Arc::new(NmapScanner::new(&config));
    let prober = Arc::new(PingProbe::new(&config));
    let verifier = Arc::new(SshVerifier::new(&config.ssh));
    let registry = TargetRegistry::new(&config.deploy.config_path, &config.deploy.address_key);

    let mut orchestrator = Orchestrator::new(config.clone(), scanner, prober, verifier, registry);
    if cli.dry_run {
        orchestrator = orchestrator.dry_run();
    }

    let result = if cli.cidrs.is_empty() {
        orchestrator.run().await?
    } else {
        orchestrator.run_with_ranges(cli.cidrs.clone()).await?
    };

    match result {
        Some(Discovery { address, origin }) => {
            println!("Display unit located at {address} ({origin})");
            println!("Ready to deploy.");
            Ok(())
        }
        None => {
            print_troubleshooting(&config);
            std::process::exit(1);
        }
    }
}

fn load_locate_config(file_prefix: &str) -> anyhow::Result<LocateConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("EASEL_LOCATE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<LocateConfig>("locate") {
        Ok(c) => Ok(c),
        Err(_) => Ok(LocateConfig::default()),
    }
}

fn print_troubleshooting(config: &LocateConfig) {
    eprintln!("Could not locate the display unit.");
    eprintln!();
    eprintln!("Check the following:");
    eprintln!("  - The unit is powered on and connected to the same network");
    eprintln!("  - SSH is enabled on the unit");
    eprintln!("  - The configured SSH user and password are correct");
    eprintln!(
        "  - Try connecting manually: ssh {}@{}",
        config.ssh.user, config.fallback.hostname
    );
}
