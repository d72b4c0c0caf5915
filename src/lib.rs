//! Cocomask: labeled masks to COCO annotations and back.
//!
//! Cocomask converts directories of labeled instance masks (grayscale
//! PNGs) into COCO-format annotation documents, reconstructs masks from
//! such documents, and merges or splits the documents themselves. The
//! polygon codec is exact: extracting a label and rasterizing the
//! resulting rings reproduces the original pixel set.
//!
//! # Modules
//!
//! - [`mask`]: the labeled raster type
//! - [`geometry`]: contour extraction and polygon rasterization
//! - [`coco`]: the validated document model, JSON I/O, category files
//! - [`convert`]: masks to annotations
//! - [`reconstruct`]: annotations back to masks
//! - [`merge`] / [`split`]: whole-document operations
//! - [`check`]: document health reports
//! - [`raster`]: mask PNG I/O

pub mod check;
pub mod coco;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod merge;
pub mod raster;
pub mod reconstruct;
pub mod split;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::coco::{io_json, CategorySet};
use crate::convert::{convert_masks, ConvertOptions, ConvertUnit};
use crate::mask::Mask;

pub use error::CocomaskError;

/// The cocomask CLI application.
#[derive(Parser)]
#[command(name = "cocomask")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert a directory of labeled mask PNGs to a COCO document.
    Convert(ConvertArgs),

    /// Reconstruct labeled mask PNGs from a COCO document.
    Reconstruct(ReconstructArgs),

    /// Merge two COCO documents into one.
    Merge(MergeArgs),

    /// Split a COCO document into one document per image.
    Split(SplitArgs),

    /// Report the health of a COCO document.
    Check(CheckArgs),
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Directory containing the mask PNGs.
    #[arg(short, long)]
    input: PathBuf,

    /// Output COCO JSON file (or directory with --per-file).
    #[arg(short, long)]
    output: PathBuf,

    /// Category definition file (JSON array of {"id", "name"}).
    #[arg(short, long)]
    categories: PathBuf,

    /// Write one COCO document per mask instead of a combined one.
    #[arg(long)]
    per_file: bool,

    /// Drop connected components smaller than this many pixels.
    #[arg(long, default_value_t = 0)]
    min_area: usize,
}

/// Arguments for the reconstruct subcommand.
#[derive(clap::Args)]
struct ReconstructArgs {
    /// Input COCO JSON file.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory to write the reconstructed mask PNGs into.
    #[arg(short, long)]
    output: PathBuf,

    /// Worker threads (0 = all cores, 1 = sequential).
    #[arg(long, default_value_t = 0)]
    workers: usize,
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// First COCO JSON file; its ids and category table take precedence.
    first: PathBuf,

    /// Second COCO JSON file.
    second: PathBuf,

    /// Output COCO JSON file.
    #[arg(short, long)]
    output: PathBuf,
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    /// Input COCO JSON file.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory to write the per-image COCO JSON files into.
    #[arg(short, long)]
    output: PathBuf,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// COCO JSON file to check.
    input: PathBuf,

    /// Treat warnings as failures (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,
}

/// Run the cocomask CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CocomaskError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => run_convert(args),
        Commands::Reconstruct(args) => run_reconstruct(args),
        Commands::Merge(args) => run_merge(args),
        Commands::Split(args) => run_split(args),
        Commands::Check(args) => run_check(args),
    }
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), CocomaskError> {
    let document = io_json::read_coco_json(&args.input)?;
    let report = check::check_document(&document);
    print!("{report}");

    if report.is_ok() && !(args.strict && report.warning_count() > 0) {
        Ok(())
    } else {
        Err(CocomaskError::HealthCheckFailed {
            errors: report.error_count(),
            warnings: report.warning_count(),
        })
    }
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), CocomaskError> {
    let categories = CategorySet::from_path(&args.categories)?;
    let files = raster::find_mask_files(&args.input)?;
    let options = ConvertOptions {
        min_area: args.min_area,
    };

    // A mask that fails to decode becomes a failed unit; the rest of
    // the batch proceeds.
    let mut masks: Vec<(String, Mask)> = Vec::with_capacity(files.len());
    let mut read_failures: Vec<ConvertUnit> = Vec::new();
    for path in &files {
        let file_name = display_name(path);
        match raster::read_mask(path) {
            Ok(mask) => masks.push((file_name, mask)),
            Err(e) => read_failures.push(ConvertUnit {
                file_name,
                result: Err(e),
            }),
        }
    }

    if args.per_file {
        fs::create_dir_all(&args.output)?;
        let mut failed = 0usize;
        let total = masks.len() + read_failures.len();
        for (file_name, mask) in &masks {
            let unit = vec![(file_name.clone(), mask.clone())];
            let outcome = convert_masks(&unit, &categories, &options)?;
            print!("{}", outcome.report);
            if outcome.report.is_ok() {
                let out_path = args.output.join(json_name(file_name));
                io_json::write_coco_json(&out_path, &outcome.document)?;
            } else {
                failed += outcome.report.failed_count();
            }
        }
        for unit in &read_failures {
            if let Err(e) = &unit.result {
                eprintln!("FAIL {}: {}", unit.file_name, e);
            }
            failed += 1;
        }
        if failed > 0 {
            return Err(CocomaskError::BatchFailed { failed, total });
        }
        return Ok(());
    }

    let mut outcome = convert_masks(&masks, &categories, &options)?;
    outcome.report.units.extend(read_failures);
    print!("{}", outcome.report);

    io_json::write_coco_json(&args.output, &outcome.document)?;

    if outcome.report.is_ok() {
        Ok(())
    } else {
        Err(CocomaskError::BatchFailed {
            failed: outcome.report.failed_count(),
            total: outcome.report.units.len(),
        })
    }
}

/// Execute the reconstruct subcommand.
fn run_reconstruct(args: ReconstructArgs) -> Result<(), CocomaskError> {
    let document = io_json::read_coco_json(&args.input)?;
    fs::create_dir_all(&args.output)?;

    let results = reconstruct::reconstruct(&document, args.workers);
    let total = results.len();
    let mut failed = 0usize;

    for unit in &results {
        match &unit.result {
            Ok(mask) => {
                let out_path = args.output.join(png_name(&unit.file_name));
                raster::write_mask(&out_path, mask)?;
                println!("ok   {} -> {}", unit.file_name, out_path.display());
            }
            Err(e) => {
                eprintln!("FAIL {}: {}", unit.file_name, e);
                failed += 1;
            }
        }
    }
    println!("{} mask(s) written, {} failed", total - failed, failed);

    if failed > 0 {
        Err(CocomaskError::BatchFailed { failed, total })
    } else {
        Ok(())
    }
}

/// Execute the merge subcommand.
fn run_merge(args: MergeArgs) -> Result<(), CocomaskError> {
    let first = io_json::read_coco_json(&args.first)?;
    let second = io_json::read_coco_json(&args.second)?;

    let merged = merge::merge(&first, &second)?;
    io_json::write_coco_json(&args.output, &merged)?;

    println!(
        "merged {} + {} image(s), {} annotation(s), {} categorie(s)",
        first.images().len(),
        second.images().len(),
        merged.annotations().len(),
        merged.categories().len()
    );
    Ok(())
}

/// Execute the split subcommand.
fn run_split(args: SplitArgs) -> Result<(), CocomaskError> {
    let document = io_json::read_coco_json(&args.input)?;
    fs::create_dir_all(&args.output)?;

    let units = split::split(&document)?;
    for unit in &units {
        let out_path = args.output.join(json_name(&unit.image.file_name));
        io_json::write_coco_json(&out_path, &unit.document)?;
        println!("ok   {} -> {}", unit.image.file_name, out_path.display());
    }
    println!("{} document(s) written", units.len());
    Ok(())
}

/// The bare file name of a path, for reports and COCO image records.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `<stem>.json` for a mask or image file name.
fn json_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    format!("{stem}.json")
}

/// `<stem>.png` for an image file name, flattened to a single component.
fn png_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    format!("{stem}.png")
}
