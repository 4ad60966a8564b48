use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn, Level};

use converter::{
    CatalogUrl, ConsoleProgressReporter, ConvertConfig, ConvertError, ConvertedPack, Converter,
    IntoProgressCallback, LogNotifier, UserNotifier,
};

#[derive(Parser)]
#[command(name = "mrpack-to-zip", version, about = "Convert a Modrinth modpack into a plain zip")]
struct Cli {
    /// Local .mrpack file, catalog page URL, or direct .mrpack URL
    source: String,
    /// Directory to write the converted zip into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
    /// Exact output file path (overrides --output)
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Do not open manual downloads in a browser
    #[arg(long, default_value_t = false)]
    no_browser: bool,
    /// Cap concurrent file downloads (0 = unlimited)
    #[arg(long)]
    max_downloads: Option<usize>,
    /// Only print the final summary
    #[arg(long, default_value_t = false)]
    quiet: bool,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Opens deferred files in the default browser
struct BrowserNotifier;

impl UserNotifier for BrowserNotifier {
    fn prompt_manual_download(&self, path: &str, url: &str) {
        eprintln!("🖐️  {} must be downloaded manually: {}", path, url);
        eprintln!("    Place it at '{}' inside the final zip.", path);
        if let Err(e) = open::that(url) {
            warn!("Could not open browser for {}: {}", url, e);
        }
    }
}

enum Source {
    Local(PathBuf),
    Catalog(String),
    Direct(String),
}

fn classify(input: &str, config: &ConvertConfig) -> Result<Source> {
    let path = Path::new(input);
    if path.is_file() {
        return Ok(Source::Local(path.to_path_buf()));
    }
    if CatalogUrl::parse(input, &config.catalog_host).is_ok() {
        return Ok(Source::Catalog(input.to_string()));
    }
    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok(Source::Direct(input.to_string()));
    }
    bail!("'{}' is neither an existing file nor a pack URL", input)
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ConvertConfig::from_env().context("Failed to load configuration")?;
    if let Some(max) = cli.max_downloads {
        config.max_concurrent_downloads = (max > 0).then_some(max);
    }

    let source = classify(&cli.source, &config)?;
    let notifier: Arc<dyn UserNotifier> = if cli.no_browser {
        Arc::new(LogNotifier)
    } else {
        Arc::new(BrowserNotifier)
    };
    let converter = Converter::new(config)?.with_notifier(notifier);
    let progress =
        (!cli.quiet).then(|| ConsoleProgressReporter::new(cli.verbose > 0).into_callback());

    let pack = match source {
        Source::Local(path) => {
            info!("Reading {}", path.display());
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path.file_name().and_then(|n| n.to_str());
            converter.convert_archive(bytes.into(), name, progress).await?
        }
        Source::Catalog(url) => converter.convert_from_catalog_url(&url, progress).await?,
        Source::Direct(url) => converter.convert_from_url(&url, progress).await?,
    };

    let saved = match &cli.output_file {
        Some(path) => {
            pack.save_as(path).await?;
            path.clone()
        }
        None => pack.save_to(&cli.output).await?,
    };

    print_summary(&pack, &saved);
    Ok(())
}

fn print_summary(pack: &ConvertedPack, saved: &Path) {
    let report = &pack.report;
    println!("📦 Saved {} ({} bytes)", saved.display(), pack.content.len());
    println!(
        "   {} overrides, {} downloaded, {} manual, {} failed, {} skipped",
        report.overrides_copied,
        report.files_placed,
        report.files_deferred,
        report.files_failed,
        report.entries_skipped
    );
    if !report.deferred.is_empty() {
        println!("🖐️  Add these files to the zip yourself:");
        for file in &report.deferred {
            println!("   {} <- {}", file.path, file.url);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    debug!("Log level set to {}", level);

    if let Err(e) = run(cli).await {
        if let Some(convert_error) = e.downcast_ref::<ConvertError>() {
            eprintln!("{}", convert_error.detailed_report());
        }
        return Err(e);
    }
    Ok(())
}
