//! doct - inspection and preprocessing for dual-octree shape records
//!
//! Provides subcommands for:
//! - `inspect`: Load one record, transform it and print the sample layout
//! - `build-octree`: Build `octree.pth` from a record's point cloud
//! - `dump-config`: Write the default shape configuration as JSON

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::backend::NdArray;
use burn::config::Config;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use doct_data::prelude::*;
use doct_io::{layout, save_octree_file};

#[derive(Parser, Debug)]
#[command(name = "doct")]
#[command(about = "Inspect and preprocess dual-octree shape records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a shape record, apply the transform and print the result
    Inspect(InspectArgs),
    /// Build the input octree of a shape record from its point cloud
    #[command(name = "build-octree")]
    BuildOctree(BuildOctreeArgs),
    /// Write the default shape configuration as JSON
    #[command(name = "dump-config")]
    DumpConfig(DumpConfigArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Shape record directory
    location: PathBuf,

    /// Shape configuration JSON (defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the sampling RNG
    #[arg(long, default_value = "0")]
    seed: u64,
}

#[derive(Parser, Debug)]
struct BuildOctreeArgs {
    /// Shape record directory
    location: PathBuf,

    /// Shape configuration JSON (defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output path (defaults to `<location>/octree.pth`)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct DumpConfigArgs {
    /// Output JSON path
    path: PathBuf,
}

fn load_config(path: Option<&Path>) -> Result<ShapeConfig> {
    match path {
        Some(path) => ShapeConfig::load(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ShapeConfig::default()),
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let loader = ShapeLoader::new(&config);
    let transform = ShapeTransform::new(config)?;

    let raw = loader
        .load(&args.location)
        .with_context(|| format!("Failed to load {}", args.location.display()))?;
    println!("record {}", args.location.display());
    println!("  raw fields: {:?}", raw.keys());

    let mut rng = StdRng::seed_from_u64(args.seed);
    let sample = transform.apply(&raw, 0, &mut rng)?;
    println!("  sample fields: {:?}", sample.keys());

    if let Some(octree) = &sample.octree_in {
        println!(
            "  octree_in: depth {} full_depth {}",
            octree.depth(),
            octree.full_depth()
        );
        for d in 0..=octree.depth() {
            println!(
                "    depth {:>2}: {:>8} nodes, {:>8} non-empty",
                d,
                octree.node_count(d),
                octree.non_empty_count(d)
            );
        }
    }
    if let Some(points) = &sample.points {
        let features = points.features().map_or(0, |f| f.channels());
        println!("  points: {} x 3, features {}", points.len(), features);
        if let Some((lo, hi)) = points.bounding_box() {
            println!("    bounds {:?} .. {:?}", lo.as_array(), hi.as_array());
        }
    }
    if let Some(split) = &sample.split_small {
        println!("  split_small: {:?}", split.shape());
    }
    if let Some(split) = &sample.split_large {
        println!("  split_large: {:?}", split.shape());
    }
    if let Some(sdf) = &sample.sdf {
        let tensors = sdf.to_tensors::<NdArray>(&Default::default());
        println!(
            "  sdf: pos {:?}, sdf {:?}, grad {:?}",
            tensors.pos.dims(),
            tensors.sdf.dims(),
            tensors.grad.dims()
        );
    }
    Ok(())
}

fn build_octree(args: BuildOctreeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    // Only the point cloud (and colors) is needed here
    let loader = ShapeLoader::new(
        &ShapeConfig::new()
            .with_load_pointcloud(true)
            .with_load_color(config.load_color)
            .with_load_sdf(false),
    );
    let transform = ShapeTransform::new(config)?;

    let raw = loader
        .load(&args.location)
        .with_context(|| format!("Failed to load {}", args.location.display()))?;
    let cloud = raw
        .point_cloud
        .as_ref()
        .context("Record has no point cloud")?;

    let points = transform.process_point_cloud(cloud)?;
    let octree = transform.points_to_octree(&points)?;

    let output = args
        .output
        .unwrap_or_else(|| args.location.join(layout::OCTREE));
    save_octree_file(&octree, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!(
        "built octree from {} points: {} nodes, {} leaves",
        points.len(),
        octree.total_nodes(),
        octree.leaf_points().len()
    );
    println!("wrote {}", output.display());
    Ok(())
}

fn dump_config(args: DumpConfigArgs) -> Result<()> {
    ShapeConfig::default()
        .save(&args.path)
        .with_context(|| format!("Failed to write {}", args.path.display()))?;
    println!("wrote {}", args.path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect(args) => inspect(args),
        Commands::BuildOctree(args) => build_octree(args),
        Commands::DumpConfig(args) => dump_config(args),
    }
}
