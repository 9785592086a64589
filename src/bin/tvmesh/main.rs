//! tvmesh CLI - total-variation triangulation of images.
//!
//! Usage: tvmesh <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `tvmesh --help` for available commands. Set `RUST_LOG=info` (or
//! `debug`) to follow the optimization passes.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use clap::{Parser, Subcommand};

use tvmesh::algo::tv::denoise::DenoiseOptions;
use tvmesh::algo::tv::flip::{EqualStrategy, FlipOptions};
use tvmesh::algo::tv::pipeline::RegularizeOptions;
use tvmesh::algo::tv::{TvOptions, TvTriangulation};
use tvmesh::algo::Progress;
use tvmesh::io;

#[derive(Parser)]
#[command(name = "tvmesh")]
#[command(author, version, about = "Total-variation triangulation of images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display image and initial triangulation information
    Info {
        /// Input image
        input: PathBuf,

        /// Power applied to the gradient norm in the TV energy
        #[arg(short, long, default_value = "0.5")]
        power: f64,
    },

    /// Denoise an image and optimize its triangulation
    Regularize {
        /// Input image
        input: PathBuf,

        /// Output image (regularized pixel values)
        output: PathBuf,

        /// Maximum number of flip passes
        #[arg(short = 'L', long, default_value = "100")]
        limit: usize,

        /// Tie-break strategy for equal-energy flips (0-5)
        #[arg(short, long, default_value = "4")]
        strategy: u8,

        /// Power applied to the gradient norm in the TV energy
        #[arg(short, long, default_value = "0.5")]
        power: f64,

        /// Data fidelity weight; 0 disables denoising
        #[arg(short = 'l', long, default_value = "0.0")]
        lambda: f64,

        /// Dual step size, in (0, 0.25)
        #[arg(long, default_value = "0.248")]
        dt: f64,

        /// Denoising stopping tolerance
        #[arg(short, long, default_value = "0.01")]
        tolerance: f64,

        /// Quantization levels; 0 or less keeps the values unquantized
        #[arg(short, long, default_value = "256", allow_negative_numbers = true)]
        quantize: i64,

        /// Maximum number of denoising iterations
        #[arg(short = 'N', long, default_value = "10")]
        iterations: usize,

        /// Number of alternated denoise/flip rounds
        #[arg(short = 'A', long, default_value = "1")]
        alternations: usize,

        /// Never flip diagonals joining two pixels at or below this value
        #[arg(long, default_value = "0")]
        fix_dark_edges: f64,

        /// Never flip diagonals joining two pixels at or above this value
        #[arg(long, default_value = "255")]
        fix_bright_edges: f64,

        /// Seed for the randomized tie-break strategies
        #[arg(long)]
        seed: Option<u64>,

        /// Also export the triangulation as PLY
        #[arg(long)]
        ply: Option<PathBuf>,

        /// Report the faces holding this fraction of the TV energy
        #[arg(short = 'D', long, default_value = "0.0")]
        discontinuities: f64,

        /// Compute gradients on all cores while denoising
        #[arg(long)]
        parallel: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, power } => {
            cmd_info(&input, power)?;
        }

        Commands::Regularize {
            input,
            output,
            limit,
            strategy,
            power,
            lambda,
            dt,
            tolerance,
            quantize,
            iterations,
            alternations,
            fix_dark_edges,
            fix_bright_edges,
            seed,
            ply,
            discontinuities,
            parallel,
        } => {
            let mut tv_options = TvOptions::default()
                .with_power(power)
                .with_fix_dark(fix_dark_edges)
                .with_fix_bright(fix_bright_edges);
            if let Some(seed) = seed {
                tv_options = tv_options.with_seed(seed);
            }

            let options = RegularizeOptions::default()
                .with_denoise(
                    DenoiseOptions::default()
                        .with_lambda(lambda)
                        .with_dt(dt)
                        .with_tolerance(tolerance)
                        .with_max_iterations(iterations)
                        .with_parallel(parallel),
                )
                .with_flip(
                    FlipOptions::default()
                        .with_max_iterations(limit)
                        .with_strategy(EqualStrategy::from_id(strategy)?),
                )
                .with_quantize(usize::try_from(quantize).ok().filter(|&q| q > 0))
                .with_alternations(alternations);

            cmd_regularize(&input, &output, ply.as_ref(), discontinuities, &tv_options, &options)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
///
/// Denoising and flipping report against different totals, so the bar
/// starts over whenever the message changes.
fn create_progress() -> Progress {
    let last = Mutex::new((String::new(), usize::MAX));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        let Ok(mut last) = last.lock() else {
            return;
        };
        if last.0 == message && last.1 == percent {
            return;
        }
        if last.0 != message && !last.0.is_empty() && last.1 != 100 {
            eprintln!();
        }
        *last = (message.to_string(), percent);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_info(input: &PathBuf, power: f64) -> Result<(), Box<dyn std::error::Error>> {
    let raster = io::load(input)?;
    let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default().with_power(power))?;
    let mesh = tvt.mesh();

    println!("File: {}", input.display());
    println!("Size: {} x {}", raster.width(), raster.height());
    println!("Mode: {:?}", tvt.color_mode());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Half-edges: {}", mesh.num_halfedges());
    let boundary = mesh.vertex_ids().filter(|&v| mesh.is_boundary_vertex(v)).count();
    let max_valence = mesh
        .vertex_ids()
        .map(|v| mesh.vertex_neighbors(v).count())
        .max()
        .unwrap_or(0);
    println!("Boundary vertices: {}", boundary);
    println!("Max valence: {}", max_valence);
    if let Some((min, max)) = mesh.bounding_box() {
        println!("Domain: ({:.1}, {:.1}) to ({:.1}, {:.1})", min.x, min.y, max.x, max.y);
    }

    let energies = tvt.face_energies();
    let max = energies.iter().cloned().fold(0.0_f64, f64::max);
    let flat = energies.iter().filter(|&&e| e == 0.0).count();
    println!("TV energy (p={}): {:.6}", power, tvt.energy());
    println!("Face energy: max={:.4}, avg={:.4}", max, tvt.energy() / energies.len() as f64);
    println!("Flat faces: {} ({:.1}%)", flat, 100.0 * flat as f64 / energies.len() as f64);

    Ok(())
}

fn cmd_regularize(
    input: &PathBuf,
    output: &PathBuf,
    ply: Option<&PathBuf>,
    discontinuities: f64,
    tv_options: &TvOptions,
    options: &RegularizeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let raster = io::load(input)?;
    let mut tvt: TvTriangulation = TvTriangulation::from_raster(&raster, tv_options)?;

    println!("Loaded: {} x {} ({:?})", raster.width(), raster.height(), tvt.color_mode());
    println!(
        "Regularizing (lambda={}, strategy={}, {} round(s))...",
        options.denoise.lambda,
        options.flip.strategy.id(),
        options.effective_alternations()
    );

    let progress = create_progress();

    let start = Instant::now();
    let summary = tvt.regularize_with_progress(options, &progress)?;
    let elapsed = start.elapsed();

    let flips: usize = summary.rounds.iter().map(|r| r.flips).sum();
    let tie_breaks: usize = summary.rounds.iter().map(|r| r.tie_breaks).sum();
    println!(
        "TV energy: {:.4} -> {:.4} ({} flips, {} tie-breaks)",
        summary.initial_energy, summary.energy, flips, tie_breaks
    );
    println!(
        "Result: {} vertices, {} faces",
        tvt.mesh().num_vertices(),
        tvt.mesh().num_faces()
    );

    let max_aspect = tvt
        .mesh()
        .face_ids()
        .map(|f| tvt.mesh().face_aspect_ratio(f))
        .fold(0.0_f64, f64::max);
    println!("Max aspect ratio: {:.2}", max_aspect);

    if discontinuities > 0.0 {
        let faces = tvt.discontinuities(discontinuities);
        let energy: f64 = faces.iter().map(|&f| tvt.face_energy(f)).sum();
        println!(
            "Discontinuities: {} faces ({:.1}% of the energy)",
            faces.len(),
            100.0 * energy / tvt.energy().max(f64::MIN_POSITIVE)
        );
    }

    io::save(&tvt.output_raster()?, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    if let Some(path) = ply {
        io::ply::save(&tvt, path)?;
        println!("Saved: {}", path.display());
    }

    Ok(())
}
