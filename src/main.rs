mod cli;

use discforge::{
    config,
    failures::FailureCache,
    scanner::{self, ScanOrchestrator},
    upload::UploadDispatcher,
};
use discforge_common::{
    detect_protocol,
    paths::{is_placeholder, read_placeholder},
    protocol::detect_protocol_any,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, FailuresCommand, UploadCommand};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "discforge=trace,discforge_av=debug,discforge_db=debug,discforge_common=debug"
                .to_string()
        } else {
            "discforge=info,discforge_av=info,discforge_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Scan { root, batch } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan(config_path, root, batch))
        }
        Commands::Process { placeholder } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(process(config_path, &placeholder))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe(config_path, &file, json))
        }
        Commands::Failures { command } => failures(config_path, command),
        Commands::Upload { command } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(upload(config_path, command))
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("discforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn resolve_root(explicit: Option<PathBuf>, config: &config::Config) -> Result<PathBuf> {
    explicit
        .or_else(|| config.scan.root.clone())
        .context("No library root given; pass --root or set scan.root")
}

async fn scan(config_path: Option<&Path>, root: Option<PathBuf>, batch: Option<usize>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(batch) = batch {
        config.scan.batch_size = batch.max(1);
    }
    let root = resolve_root(root, &config)?;

    let orchestrator = ScanOrchestrator::from_config(&config)?;
    let report = orchestrator.scan(&root).await?;

    if report.locked_out {
        return Ok(());
    }
    println!(
        "{} written, {} failed, {} at failure ceiling, {} pending",
        report.processed.len(),
        report.failed.len(),
        report.skipped,
        report.pending
    );
    Ok(())
}

async fn process(config_path: Option<&Path>, placeholder: &Path) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    if !placeholder.exists() {
        anyhow::bail!("Placeholder does not exist: {:?}", placeholder);
    }

    let orchestrator = ScanOrchestrator::from_config(&config)?;
    let outcome = orchestrator.process_one(placeholder).await?;

    println!("Descriptor: {}", outcome.descriptor.display());
    println!("Image: {}", outcome.image.display());
    print!("Protocol: {}", outcome.protocol);
    if outcome.used_fallback {
        print!(" (fallback)");
    }
    println!();
    println!("Streams: {}", outcome.stream_count);
    println!("Runtime: {}", format_duration(outcome.duration_secs));
    Ok(())
}

async fn probe(config_path: Option<&Path>, file: &Path, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let (image, protocol) = if is_placeholder(file, &config.scan.placeholder_extension) {
        let image = read_placeholder(file)?;
        let protocol = detect_protocol_any(&[file, &image]);
        (image, protocol)
    } else {
        (file.to_path_buf(), detect_protocol(file))
    };

    let extractor = scanner::probe_extractor(&config);
    let outcome = extractor.extract(&image, protocol).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.result)?);
        return Ok(());
    }

    println!("Image: {}", image.display());
    print!("Protocol: {}", outcome.protocol);
    if outcome.used_fallback(protocol) {
        print!(" (requested {})", protocol);
    }
    println!(" after {} attempt(s)", outcome.attempts);
    if let Some(ref format) = outcome.result.format.format_name {
        println!("Container: {}", format);
    }
    println!("Duration: {}", format_duration(outcome.result.duration_secs()));

    println!("\nStreams: {}", outcome.result.streams.len());
    for stream in &outcome.result.streams {
        print!(
            "  [{}] {} {}",
            stream.index,
            stream.codec_type.as_deref().unwrap_or("?"),
            stream.codec_name.as_deref().unwrap_or("?")
        );
        if let (Some(w), Some(h)) = (stream.width, stream.height) {
            print!(" {}x{}", w, h);
        }
        if let Some(ch) = stream.channels {
            print!(" {}ch", ch);
        }
        if let Some(lang) = stream.language() {
            print!(" ({})", lang);
        }
        println!();
    }
    println!("\nChapters: {}", outcome.result.chapters.len());

    Ok(())
}

fn format_duration(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn format_epoch(epoch: i64) -> String {
    chrono::DateTime::from_timestamp(epoch, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}

fn failures(config_path: Option<&Path>, command: FailuresCommand) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let cache = FailureCache::open(&config.failures_db_path(), config.failures.max_retries)?;

    match command {
        FailuresCommand::List => {
            let entries = cache.list()?;
            if entries.is_empty() {
                println!("No recorded failures");
            }
            for entry in entries {
                let marker = if entry.failure_count >= cache.max_retries() {
                    "✗"
                } else {
                    "!"
                };
                println!(
                    "{} {} [{}x, last {}]",
                    marker,
                    entry.file_path,
                    entry.failure_count,
                    format_epoch(entry.last_failure_time)
                );
                if let Some(message) = entry.last_error_message {
                    println!("    {}", message);
                }
            }
        }
        FailuresCommand::Stats => {
            let stats = cache.stats()?;
            println!("Failed: {}", stats.total);
            println!(
                "Skipped (>= {} failures): {}",
                cache.max_retries(),
                stats.permanent
            );
        }
        FailuresCommand::Reset { path } => {
            if cache.reset(&path)? {
                println!("Reset {}", path.display());
            } else {
                println!("No failures recorded for {}", path.display());
            }
        }
        FailuresCommand::Clear => {
            let removed = cache.clear()?;
            println!("Cleared {} entries", removed);
        }
    }

    Ok(())
}

async fn upload(config_path: Option<&Path>, command: UploadCommand) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let uploads = UploadDispatcher::from_config(&config)?;

    match command {
        UploadCommand::File { path } => {
            let target = uploads.upload_file(&path).await?;
            println!("Uploaded {} -> {}", path.display(), target.display());
        }
        UploadCommand::All { root } => {
            let root = resolve_root(root, &config)?;
            let report = uploads.upload_all(&root).await?;
            println!(
                "{} uploaded, {} already uploaded, {} failed",
                report.uploaded, report.skipped, report.failed
            );
        }
        UploadCommand::Retry => {
            let report = uploads.retry_failed().await?;
            println!(
                "{} uploaded, {} skipped, {} still failing",
                report.uploaded, report.skipped, report.failed
            );
        }
        UploadCommand::Stats => {
            let stats = uploads.stats()?;
            println!("Pending: {}", stats.pending);
            println!("Success: {}", stats.success);
            println!("Failed: {}", stats.failed);
            println!("Total: {}", stats.total());
        }
        UploadCommand::Reset { path } => {
            if uploads.reset(&path)? {
                println!("Reset {}", path.display());
            } else {
                println!("No upload recorded for {}", path.display());
            }
        }
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let tools = discforge_av::check_tools(
        &config.probe.ffprobe_path,
        &config.disc.lister_path,
        &config.disc.mount_path,
        &config.disc.umount_path,
    );
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
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Scans will refuse to start without them.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            match &config.scan.root {
                Some(root) => println!("  Scan root: {}", root.display()),
                None => println!("  Scan root: (not set)"),
            }
            println!("  Batch size: {}", config.scan.batch_size);
            println!("  Max retries: {}", config.failures.max_retries);
            println!("  Prober: {}", config.probe.ffprobe_path.display());
            println!("  Upload enabled: {}", config.upload.enabled);
            println!("  Notify enabled: {}", config.notify.enabled);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Batch size: {}", config.scan.batch_size);
            println!("  State dir: {}", config.scan.state_dir.display());
        }
    }

    Ok(())
}
