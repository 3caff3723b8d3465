use anyhow::{Context, Result};
use clap::Parser;
use paint_by_number_wasm::{
    ConvertOptions, GridType, MergeMetric, convert_bytes, convert_bytes_with_palette,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Turn images into paint-by-number grids (JSON).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Grid layout: square, diamond, honeycomb, pentagon
    #[arg(short = 'g', long, default_value_t = GridType::Square)]
    grid_type: GridType,

    /// Cell size in source pixels
    #[arg(short = 's', long, default_value_t = 10.0)]
    cell_size: f64,

    /// Number of colors for k-means when no custom palette is provided
    #[arg(short = 'k', long, default_value_t = 16)]
    n_colors: usize,

    /// Assign cells by per-pixel vote instead of minimum total error
    #[arg(long)]
    vote: bool,

    /// Palette entries closer than this Delta E are merged
    #[arg(long, default_value_t = 5.0)]
    dedup_threshold: f64,

    /// Use the cheaper CIE76 distance for palette deduplication
    #[arg(long)]
    cie76: bool,

    /// Palette entries used by fewer cells are merged into a neighbour
    #[arg(long, default_value_t = 3)]
    min_cell_count: usize,

    /// Comma-separated list of hex colors to use as palette (skip k-means)
    #[arg(short = 'c', long)]
    palette: Option<String>,

    /// Output directory
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Output filename prefix (ignored when --out-dir supplied)
    #[arg(short = 'p', long, default_value = "pbn_")]
    prefix: String,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paint_by_number_wasm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let args = Args::parse();

    let options = ConvertOptions {
        grid_type: args.grid_type,
        cell_size: args.cell_size,
        n_colors: args.n_colors,
        block_average: !args.vote,
        dedup_threshold: args.dedup_threshold,
        dedup_metric: if args.cie76 {
            MergeMetric::Cie76
        } else {
            MergeMetric::Ciede2000
        },
        min_cell_count: args.min_cell_count,
        ..ConvertOptions::default()
    };
    options.validate().context("invalid settings")?;

    let palette_vec: Option<Vec<String>> = args.palette.as_ref().map(|s| {
        s.split(',').map(|x| x.trim().trim_start_matches('#').to_uppercase()).collect()
    });

    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let conversion = match &palette_vec {
            Some(hex) => convert_bytes_with_palette(&bytes, &options, hex),
            None => convert_bytes(&bytes, &options),
        }
        .with_context(|| format!("converting {}", input.display()))?;

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let out_path = if let Some(dir) = &args.out_dir {
            dir.join(format!("{stem}.json"))
        } else {
            let parent = input.parent().map(PathBuf::from).unwrap_or_default();
            parent.join(format!("{}{}.json", args.prefix, stem))
        };

        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&conversion)?;
        fs::write(&out_path, json)?;
        println!(
            "Saved → {} ({}x{} cells, {} colors)",
            out_path.display(),
            conversion.grid.width(),
            conversion.grid.height(),
            conversion.palette.len()
        );
    }

    Ok(())
}
