mod cli;

use anyhow::Result;
use batchpress::{config, runner, tools};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "batchpress=trace".to_string()
        } else {
            "batchpress=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Run {
            dry_run,
            concurrency,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(cli.config.as_deref(), dry_run, concurrency))
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("batchpress {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_batch(
    config_path: Option<&std::path::Path>,
    dry_run: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if dry_run {
        config.options.dry_run = true;
    }
    if let Some(n) = concurrency {
        config.options.concurrency = n;
    }

    let summary = runner::run(config, Arc::new(tools::ProcessInvoker)).await?;

    // Per-step failures do not change the exit code; a completed run always
    // reports where the metrics went.
    println!(
        "Processed {} files. Metrics log: {}",
        summary.files,
        summary.log_path.display()
    );

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = tools::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All known tools are available!");
    } else {
        println!("Some tools are missing. Steps that need them will fail per file.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(path)?;

    println!("✓ Configuration is valid");
    println!("  Input: {:?}", config.input_dir);
    println!("  Output: {:?}", config.output_dir);
    println!("  Extensions: {}", config.selection.extensions.join(", "));
    println!("  Steps: {}", config.steps.len());
    println!(
        "    Enabled: {}",
        config.steps.iter().filter(|s| s.enabled).count()
    );
    println!(
        "    Unknown tools: {}",
        config
            .steps
            .iter()
            .filter(|s| s.capability.is_none())
            .count()
    );
    println!("  Concurrency: {}", config.options.concurrency);
    println!("  Metrics log: {:?}", config.metrics_log_path());

    Ok(())
}
