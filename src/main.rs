mod cli;

use reelprobe::{batch, config, probe, report};
use rp_probe::{check_duration_mismatch, Prober};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelprobe=trace,rp_probe=trace,rp_av=debug".to_string()
        } else {
            "reelprobe=info,rp_probe=info,rp_av=info".to_string()
        }
    });

    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe {
            file,
            json,
            native_only,
        } => probe_file(&file, cli.config.as_deref(), json, native_only),
        Commands::Scan {
            files,
            json,
            tolerance,
            jobs,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan_files(
                files,
                cli.config.as_deref(),
                json,
                tolerance,
                jobs,
            ))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelprobe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(file: &Path, config_path: Option<&Path>, json: bool, native_only: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let prober = probe::build_prober(&config.probe, native_only);

    let meta = prober
        .probe(file)
        .with_context(|| format!("Failed to probe {:?}", file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        print!("{}", report::format_metadata(&meta));
    }

    Ok(())
}

async fn scan_files(
    files: Vec<PathBuf>,
    config_path: Option<&Path>,
    json: bool,
    tolerance: Option<f64>,
    jobs: Option<usize>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let concurrency = jobs.unwrap_or(config.scan.concurrency);
    if concurrency == 0 {
        anyhow::bail!("--jobs must be at least 1");
    }
    let tolerance = tolerance.unwrap_or(config.scan.tolerance_secs);

    let prober: Arc<dyn Prober> = Arc::new(probe::build_prober(&config.probe, false));
    tracing::info!("Scanning {} files with concurrency {}", files.len(), concurrency);

    let batch::BatchReport { mut files, errors } =
        batch::probe_batch(prober, files, concurrency).await;
    let duration_check = check_duration_mismatch(&mut files, tolerance);

    let scan = report::ScanReport {
        files,
        errors,
        duration_check,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
    } else {
        print!("{}", report::format_scan(&scan));
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = rp_av::check_tools(config.probe.ffprobe_path.as_deref());
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
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All tools are available!");
    } else {
        println!("Some tools are missing. Native MP4/MKV/AVI parsing still works without them.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_config(&config::Config::default());
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    println!("  Native parsers: {}", config.probe.native);
    println!("  ffprobe fallback: {}", config.probe.fallback);
    if let Some(ref path) = config.probe.ffprobe_path {
        println!("  ffprobe path: {}", path.display());
    }
    println!("  ffprobe timeout: {}s", config.probe.timeout_secs);
    println!("  Scan concurrency: {}", config.scan.concurrency);
    println!("  Duration tolerance: {}s", config.scan.tolerance_secs);
}
