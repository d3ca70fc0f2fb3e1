//! Command-line interface for the AFM roughness pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::core::loaders;
use crate::core::transforms::normalize_to_zero;
use crate::processors::corrections::{apply_chain, DEFAULT_CHAIN};
use crate::processors::roughness::rms_roughness;
use crate::processors::batch;
use crate::visualization;

#[derive(Parser)]
#[command(name = "afm-roughness")]
#[command(about = "AFM height-map roughness and 3D surface pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every scan under a directory: correct, measure, render
    Process {
        /// Directory containing scan container files
        input_dir: PathBuf,
        /// Output directory for rendered 3D images (created if missing)
        image_dir: PathBuf,
        /// Export the summary table to this path (.csv or .xlsx)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Render a single scan file as a 3D surface image
    Visualize {
        /// Input scan container file
        scan_file: PathBuf,
        /// Output image path (defaults to <stem>_3D.png next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Title for the plot
        #[arg(long)]
        title: Option<String>,
    },

    /// Print the RMS roughness of a single scan file
    Roughness {
        /// Input scan container file
        scan_file: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Process {
            input_dir,
            image_dir,
            export,
        } => {
            cmd_process(input_dir, image_dir, export, config);
        }
        Commands::Visualize {
            scan_file,
            output,
            title,
        } => {
            cmd_visualize(&scan_file, output, title, &config);
        }
        Commands::Roughness { scan_file } => {
            cmd_roughness(&scan_file, &config);
        }
    }
}

fn cmd_process(
    input_dir: PathBuf,
    image_dir: PathBuf,
    export: Option<PathBuf>,
    mut config: PipelineConfig,
) {
    let start = Instant::now();

    config.input_dir = Some(input_dir.clone());
    config.image_dir = Some(image_dir.clone());
    if let Some(path) = export {
        config.export.enabled = true;
        config.export.path = Some(path);
    }

    println!("Processing scans...");
    println!("Input directory: {}", input_dir.display());
    println!("Image directory: {}", image_dir.display());

    let spinner = create_spinner("Correcting, measuring, and rendering scans...");

    match batch::process_directory(&config) {
        Ok(outcome) => {
            spinner.finish_and_clear();

            let export_status = match (&outcome.export_path, &outcome.export_error) {
                (Some(path), _) => path.display().to_string(),
                (None, Some(e)) => format!("FAILED: {e}"),
                (None, None) => "disabled".to_string(),
            };

            print_summary(
                "Batch Processing Complete",
                &[
                    ("Input directory", input_dir.display().to_string()),
                    ("Image directory", image_dir.display().to_string()),
                    ("Scans processed", outcome.table.len().to_string()),
                    ("Scans skipped", outcome.skipped.len().to_string()),
                    ("Summary export", export_status),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Batch processing failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_visualize(
    scan_file: &PathBuf,
    output: Option<PathBuf>,
    title: Option<String>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    // Default output: next to the input, with the pipeline's naming scheme.
    let output_path = output.unwrap_or_else(|| {
        let parent = scan_file.parent().unwrap_or_else(|| std::path::Path::new("."));
        visualization::output_image_path(scan_file, parent, &config.render.image_ext)
    });

    let mut render = config.render.clone();
    if let Some(title) = title {
        render.title = title;
    }

    println!("Rendering scan...");
    println!("Input: {}", scan_file.display());
    println!("Output: {}", output_path.display());

    let spinner = create_spinner("Loading and correcting scan...");

    let field = match load_corrected(scan_file, config) {
        Ok(field) => field,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to prepare scan: {}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Rendering surface...");

    match visualization::render_surface(
        &output_path,
        &field,
        config.scale.nm_per_pixel(),
        &render,
    ) {
        Ok(()) => {
            spinner.finish_and_clear();

            print_summary(
                "Visualization Complete",
                &[
                    ("Input file", scan_file.display().to_string()),
                    ("Output image", output_path.display().to_string()),
                    (
                        "Field size",
                        format!("{}x{} px", field.rows(), field.cols()),
                    ),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Rendering failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_roughness(scan_file: &PathBuf, config: &PipelineConfig) {
    let start = Instant::now();

    let field = match load_corrected(scan_file, config) {
        Ok(field) => field,
        Err(e) => {
            error!("Failed to prepare scan: {}", e);
            std::process::exit(1);
        }
    };

    let rms = match rms_roughness(&field) {
        Ok(rms) => rms,
        Err(e) => {
            error!("Roughness computation failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("{:.6}", rms);

    print_summary(
        "Roughness Complete",
        &[
            ("Input file", scan_file.display().to_string()),
            ("RMS roughness (nm)", format!("{:.6}", rms)),
            (
                "Field size",
                format!("{}x{} px", field.rows(), field.cols()),
            ),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

/// Load one scan and run the correction chain plus normalization.
fn load_corrected(
    scan_file: &PathBuf,
    config: &PipelineConfig,
) -> Result<crate::core::loaders::HeightField, String> {
    let raw = loaders::load_scan(scan_file, &config.scan.channel).map_err(|e| e.to_string())?;
    let corrected = apply_chain(&raw, &DEFAULT_CHAIN, config.correction.scar_threshold);
    normalize_to_zero(&corrected).map_err(|e| e.to_string())
}
