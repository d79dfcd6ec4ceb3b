//! markform command line
//!
//! Turns page renders carrying colored markers into a fillable PDF laid over a
//! clean copy of the same document.

mod pages;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use markform_core::{
    get_page_count, render_overlay, FormConfig, FormPipeline, PageRegions, RegionOrder,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "markform")]
#[command(version, about = "Build a fillable PDF from marker-annotated page renders")]
struct Args {
    /// Directory of PNG page renders, ordered by the trailing number in each name
    #[arg(long, conflicts_with = "page")]
    pages_dir: Option<PathBuf>,

    /// Explicit page render, repeatable, in document order
    #[arg(long)]
    page: Vec<PathBuf>,

    /// Clean PDF providing the visual layer
    #[arg(long)]
    clean: PathBuf,

    /// Output path for the fillable PDF
    #[arg(short, long)]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the field descriptors as JSON
    #[arg(long)]
    fields_json: Option<PathBuf>,

    /// Write one detection overlay PNG per page into this directory
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Fail on degenerate field geometry instead of warning
    #[arg(long)]
    strict: bool,

    /// Region ordering: discovery, reverse-discovery or reading-order
    #[arg(long)]
    order: Option<String>,
}

fn load_config(args: &Args) -> Result<FormConfig> {
    let mut config = match &args.config {
        Some(path) => FormConfig::from_file(path)?,
        None => FormConfig::default(),
    };
    if args.strict {
        config.strict_geometry = true;
    }
    if let Some(order) = &args.order {
        config.region_order = order.parse::<RegionOrder>().map_err(|e| anyhow!(e))?;
    }
    Ok(config)
}

fn page_paths(args: &Args) -> Result<Vec<PathBuf>> {
    match &args.pages_dir {
        Some(dir) => pages::collect_page_paths(dir),
        None if !args.page.is_empty() => Ok(args.page.clone()),
        None => bail!("Provide either --pages-dir or at least one --page"),
    }
}

fn write_overlays(detections: &[PageRegions], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create overlay directory {}", dir.display()))?;

    for regions in detections {
        let path = overlay_path(dir, regions.page);
        render_overlay(regions)
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn overlay_path(dir: &Path, page: usize) -> PathBuf {
    dir.join(format!("overlay_{}.png", page + 1))
}

fn run(args: Args) -> Result<()> {
    let pipeline = FormPipeline::new(load_config(&args)?)?;

    let paths = page_paths(&args)?;
    tracing::info!("Loading {} page renders", paths.len());
    let pages = paths
        .iter()
        .enumerate()
        .map(|(index, path)| Ok(pipeline.page(index, pages::load_raster(path)?)))
        .collect::<Result<Vec<_>>>()?;

    let clean = fs::read(&args.clean)
        .with_context(|| format!("Failed to read clean PDF {}", args.clean.display()))?;
    tracing::info!("Clean PDF has {} pages", get_page_count(&clean)?);

    let detections = pipeline.detect_all(&pages)?;
    let conversion = pipeline.convert_detected(&detections, &clean)?;
    for warning in &conversion.warnings {
        tracing::warn!("{}", warning);
    }

    fs::write(&args.output, &conversion.pdf)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracing::info!(
        "Wrote {} fields to {}",
        conversion.layout.field_count(),
        args.output.display()
    );

    if let Some(path) = &args.fields_json {
        let json = conversion.layout.to_json()?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if let Some(dir) = &args.overlay_dir {
        write_overlays(&detections, dir)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("markform v{}", env!("CARGO_PKG_VERSION"));
    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "markform",
            "--page",
            "a.png",
            "--clean",
            "clean.pdf",
            "-o",
            "out.pdf",
            "--strict",
            "--order",
            "reverse-discovery",
        ]);
        let config = load_config(&args).unwrap();
        assert!(config.strict_geometry);
        assert_eq!(config.region_order, RegionOrder::ReverseDiscovery);
    }

    #[test]
    fn test_unknown_order_rejected() {
        let args = Args::parse_from([
            "markform", "--page", "a.png", "--clean", "c.pdf", "-o", "o.pdf", "--order", "random",
        ]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_overlays_written_per_page() {
        let pipeline = FormPipeline::new(FormConfig::default()).unwrap();
        let mut raster = image::RgbImage::from_pixel(40, 30, image::Rgb([255, 255, 255]));
        for x in 0..10 {
            raster.put_pixel(x, 5, image::Rgb([255, 0, 0]));
        }
        let pages = vec![
            pipeline.page(0, raster),
            pipeline.page(1, image::RgbImage::from_pixel(40, 30, image::Rgb([255, 255, 255]))),
        ];
        let detections = pipeline.detect_all(&pages).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("overlays");
        write_overlays(&detections, &out).unwrap();

        let first = image::open(overlay_path(&out, 0)).unwrap().to_rgb8();
        assert_eq!(first.dimensions(), (40, 30));
        assert_eq!(*first.get_pixel(0, 5), image::Rgb([255, 0, 0]));
        assert!(overlay_path(&out, 1).exists());
        assert!(!overlay_path(&out, 2).exists());
    }

    #[test]
    fn test_pages_required() {
        let args = Args::parse_from(["markform", "--clean", "c.pdf", "-o", "o.pdf"]);
        assert!(page_paths(&args).is_err());
    }

    #[test]
    fn test_pages_dir_conflicts_with_page() {
        let parsed = Args::try_parse_from([
            "markform", "--pages-dir", "dir", "--page", "a.png", "--clean", "c.pdf", "-o", "o.pdf",
        ]);
        assert!(parsed.is_err());
    }
}
