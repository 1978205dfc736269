use anyhow::Result;
use clap::Parser;
use gmail_ticket_counter::cli::{self, Cli, Commands};
use gmail_ticket_counter::config::Config;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        eprintln!("\nFor help, run: ticket-counter --help");
        process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let default_directive = if cli.verbose {
        "gmail_ticket_counter=debug,info"
    } else {
        "gmail_ticket_counter=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // On non-Windows platforms, use aws-lc-rs; on Windows, use ring
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    init_logging(&cli);

    match &cli.command {
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {:?}. Use --force to overwrite.",
                    output
                );
            }
            Config::create_example(output).await?;
            println!("Created example configuration at {:?}", output);
            println!("Fill in the label, token and webhook settings, or set them via environment variables.");
            Ok(())
        }

        Commands::Authorize {
            credentials,
            output,
            force,
        } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Token file already exists at {:?}. Use --force to overwrite.",
                    output
                );
            }
            cli::authorize(credentials, output).await?;
            println!("Saved credentials in {:?}", output);
            println!("Point auth.token_path at it, or export its contents as GCLOUD_OAUTH2_TOKEN.");
            Ok(())
        }

        Commands::Run => {
            let config = Config::load(&cli.config).await?;
            let pipeline = cli::build_pipeline(&config).await?;
            let summary = cli::run_once(&pipeline).await?;
            cli::print_summary(&summary);
            Ok(())
        }

        Commands::Watch { interval } => {
            let config = Config::load(&cli.config).await?;
            let interval = Duration::from_secs(interval.unwrap_or(config.trigger.interval_secs).max(1));
            let pipeline = cli::build_pipeline(&config).await?;
            cli::watch(&pipeline, interval).await?;
            Ok(())
        }
    }
}
