//! Inspect a local pack and convert it without opening a browser
//!
//! Usage: cargo run -p converter --example inspect_pack -- <path/to/pack.mrpack> [output-dir]
//!
//! Prints the manifest summary, which files would be fetched and which
//! would be deferred, then converts the pack with console progress.

use converter::{
    manifest::read_manifest, ConsoleProgressReporter, ConvertConfig, Converter, HostPolicy,
    IntoProgressCallback, SourceArchive,
};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for better debugging
    tracing_subscriber::fmt().init();

    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().ok_or("missing pack path")?);
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let config = ConvertConfig::from_env()?;
    let bytes = tokio::fs::read(&input).await?;
    let name = input.file_name().and_then(|n| n.to_str()).unwrap_or("pack.mrpack").to_string();

    println!("🔍 Inspecting {}", input.display());
    let archive = SourceArchive::open(bytes.clone().into(), name.clone())?;
    let manifest = read_manifest(&archive, &config.manifest_name).await?;

    println!(
        "   {} {} ({} files, {} skipped, {} bytes declared)",
        manifest.name.as_deref().unwrap_or("<unnamed>"),
        manifest.version_id.as_deref().unwrap_or(""),
        manifest.files.len(),
        manifest.skipped.len(),
        manifest.total_declared_size()
    );
    for (dependency, version) in &manifest.dependencies {
        println!("   requires {} {}", dependency, version);
    }

    let policy = HostPolicy::from_config(&config);
    for file in &manifest.files {
        match policy.check(file) {
            None => println!("   ⏬ {}", file.path),
            Some(reason) => println!("   🖐️  {} ({:?})", file.path, reason),
        }
    }

    let converter = Converter::new(config)?;
    let pack = converter
        .convert_archive(
            bytes.into(),
            Some(&name),
            Some(ConsoleProgressReporter::new(true).into_callback()),
        )
        .await?;

    let saved = pack.save_to(&output_dir).await?;
    println!("✅ Saved {} ({:?})", saved.display(), pack.report);
    Ok(())
}
