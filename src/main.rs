//! Real vs. Generated Image Detector CLI
//!
//! Entry point for training, evaluating and inspecting the frequency-domain
//! Vision Transformer detector.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use freqvit_detector::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use freqvit_detector::dataset::loader::{glob_images, GENERATED_PATTERN};
use freqvit_detector::dataset::transform::save_preview_grid;
use freqvit_detector::dataset::{
    discover_test_samples, discover_training_samples, random_split, subset_length, DatasetStats,
    DetectorDataset, ImageTransform,
};
use freqvit_detector::training::{
    evaluate, run_training, CheckpointManager, CheckpointManifest, TrainingConfig,
};
use freqvit_detector::utils::logging::{init_logging, LogConfig, LogLevel};
use freqvit_detector::utils::{format_duration, format_number};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Frequency-domain ViT detector for generated images
#[derive(Parser, Debug)]
#[command(name = "freqvit_detector")]
#[command(version)]
#[command(about = "Train a frequency-domain ViT to tell real from generated images", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false", conflicts_with = "verbose")]
    quiet: bool,

    /// Explicit log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the detector (optionally resuming from a checkpoint)
    Train(TrainArgs),

    /// Evaluate a checkpoint on the labelled test images
    Evaluate {
        /// Checkpoint manifest (`detector_<n>.json`) or a directory holding checkpoints
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Folder containing `test/`
        #[arg(long, default_value = "./datasets")]
        test_root: PathBuf,

        /// Label CSV (default: `<test_root>/test/test_labels.csv`)
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Share of the test images to evaluate on
        #[arg(long, default_value = "1.0")]
        fraction: f64,

        #[arg(short, long, default_value = "16")]
        batch_size: usize,

        /// Seed for the test subset
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Show image counts for the training and test folders
    Stats {
        #[arg(long, default_value = "./datasets/train")]
        train_dir: PathBuf,

        #[arg(long, default_value = "real")]
        real_folder: String,

        #[arg(long, default_value = "generated")]
        fake_folder: String,

        #[arg(long, default_value = "./datasets")]
        test_root: PathBuf,
    },

    /// Save a grid of transformed images for visual inspection
    Preview {
        /// Folder of images
        #[arg(short, long)]
        dir: PathBuf,

        /// Number of images in the grid
        #[arg(short, long, default_value = "16")]
        count: usize,

        /// Images per row
        #[arg(long, default_value = "4")]
        columns: usize,

        #[arg(long, default_value = "224")]
        image_size: usize,

        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },
}

/// Training options. Values given here override the `--config` file.
#[derive(Args, Debug)]
struct TrainArgs {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sub-folder with real training images
    #[arg(long)]
    real_folder: Option<String>,

    /// Sub-folder with generated training images
    #[arg(long)]
    fake_folder: Option<String>,

    /// Folder containing the real and generated sub-folders
    #[arg(long)]
    train_dir: Option<PathBuf>,

    /// Folder containing `test/`
    #[arg(long)]
    test_folder: Option<PathBuf>,

    /// Test label CSV
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Where checkpoints are written
    #[arg(short, long)]
    save_path: Option<PathBuf>,

    #[arg(short, long)]
    epochs: Option<usize>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Test sessions per epoch
    #[arg(long)]
    test_interval: Option<usize>,

    /// Resume from the newest checkpoint in the save path
    #[arg(long, default_value = "false")]
    use_checkpoint: bool,

    #[arg(long)]
    lr: Option<f64>,

    #[arg(long)]
    weight_decay: Option<f64>,

    /// Real images to sample (0 = all)
    #[arg(long)]
    real_samples: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Decode all images into memory before training
    #[arg(long, default_value = "false")]
    cache_images: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    if let Some(level) = &cli.log_level {
        log_config.level = LogLevel::parse(level);
    }
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train(args) => cmd_train(args)?,
        Commands::Evaluate {
            checkpoint,
            test_root,
            labels,
            fraction,
            batch_size,
            seed,
        } => cmd_evaluate(&checkpoint, &test_root, labels.as_deref(), fraction, batch_size, seed)?,
        Commands::Stats {
            train_dir,
            real_folder,
            fake_folder,
            test_root,
        } => cmd_stats(&train_dir, &real_folder, &fake_folder, &test_root)?,
        Commands::Preview {
            dir,
            count,
            columns,
            image_size,
            output,
        } => cmd_preview(&dir, count, columns, image_size, &output)?,
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════╗
 ║   FreqViT Detector                                       ║
 ║   Real vs. Generated Images with Burn + Rust             ║
 ╚══════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn apply_overrides(config: &mut TrainingConfig, args: TrainArgs) {
    if let Some(real_folder) = args.real_folder {
        config.real_folder = real_folder;
    }
    if let Some(fake_folder) = args.fake_folder {
        config.fake_folder = fake_folder;
    }
    if let Some(train_dir) = args.train_dir {
        config.train_dir = train_dir;
    }
    if let Some(test_root) = args.test_folder {
        config.test_root = test_root;
    }
    if let Some(labels) = args.labels {
        config.labels_csv = Some(labels);
    }
    if let Some(save_path) = args.save_path {
        config.save_path = save_path;
    }
    if let Some(epochs) = args.epochs {
        config.num_epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(test_interval) = args.test_interval {
        config.test_interval = test_interval;
    }
    if let Some(lr) = args.lr {
        config.learning_rate = lr;
    }
    if let Some(weight_decay) = args.weight_decay {
        config.weight_decay = weight_decay;
    }
    if let Some(real_samples) = args.real_samples {
        config.real_samples = real_samples;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.use_checkpoint |= args.use_checkpoint;
    config.cache_images |= args.cache_images;
}

fn cmd_train(args: TrainArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainingConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    apply_overrides(&mut config, args);
    config.validate().context("Invalid training configuration")?;

    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Backend:        {}", backend_name());
    println!("  Train dir:      {}", config.train_dir.display());
    println!("  Test root:      {}", config.test_root.display());
    println!("  Save path:      {}", config.save_path.display());
    println!("  Epochs:         {}", config.num_epochs);
    println!("  Batch size:     {}", config.batch_size);
    println!("  Learning rate:  {}", config.learning_rate);
    println!("  Weight decay:   {}", config.weight_decay);
    println!("  Resume:         {}", config.use_checkpoint);
    println!();

    let device = default_device();
    let history = run_training::<TrainingBackend>(&config, &device).context("Training failed")?;

    println!();
    println!("{}", "Training Complete!".green().bold());
    if let Some(last) = history.last() {
        println!(
            "  Final epoch {}: train acc {:.2}% | val acc {:.2}% | val loss {:.4}",
            last.epoch, last.train_accuracy, last.val_accuracy, last.val_loss
        );
    }
    if let Some(best) = history.best_epoch() {
        println!(
            "  {} Best validation accuracy: {:.2}% (epoch {})",
            "→".cyan(),
            best.val_accuracy,
            best.epoch
        );
    }
    println!("  Artifacts in: {}", config.save_path.display());

    Ok(())
}

/// Resolve a manifest file or the newest checkpoint in a directory
fn resolve_checkpoint(path: &Path) -> Result<(CheckpointManager, CheckpointManifest)> {
    if path.is_dir() {
        let manager = CheckpointManager::new(path);
        let manifest = manager
            .latest()?
            .with_context(|| format!("No checkpoints found in {}", path.display()))?;
        return Ok((manager, manifest));
    }

    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let manifest = CheckpointManifest::load(path)
        .with_context(|| format!("Failed to read checkpoint manifest {}", path.display()))?;
    Ok((CheckpointManager::new(dir), manifest))
}

fn cmd_evaluate(
    checkpoint: &Path,
    test_root: &Path,
    labels: Option<&Path>,
    fraction: f64,
    batch_size: usize,
    seed: u64,
) -> Result<()> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        bail!("--fraction must be in (0, 1], got {}", fraction);
    }

    let (manager, manifest) = resolve_checkpoint(checkpoint)?;
    info!("Evaluating checkpoint from epoch {}", manifest.epoch);

    let device = default_device();
    let model = manager
        .load_model::<DefaultBackend>(&manifest, &device)
        .context("Failed to load model")?;

    let samples = discover_test_samples(test_root, labels)?;
    let keep = subset_length(samples.len(), fraction);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let samples = random_split(samples, &[keep], &mut rng)?
        .into_iter()
        .next()
        .unwrap_or_default();
    DatasetStats::from_samples(&samples).print("Test images");

    let dataset = DetectorDataset::new(samples, ImageTransform::new(manifest.model.image_size));
    let result = evaluate::<DefaultBackend>(&model, &dataset, batch_size.max(1));

    println!();
    println!("{}", "Evaluation Results:".cyan().bold());
    println!("  Samples:    {}", format_number(result.num_samples));
    println!("  Accuracy:   {:.2}%", result.accuracy);
    println!("  Mean loss:  {:.4}", result.loss);
    println!("  Precision:  {:.4}", result.confusion.precision());
    println!("  Recall:     {:.4}", result.confusion.recall());
    println!("  F1:         {:.4}", result.confusion.f1());
    println!("  Time:       {}", format_duration(result.duration_secs));
    println!();
    println!("{}", result.confusion);

    Ok(())
}

fn cmd_stats(train_dir: &Path, real_folder: &str, fake_folder: &str, test_root: &Path) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let training = discover_training_samples(train_dir, real_folder, fake_folder, 0, &mut rng)
        .context("Failed to list training images")?;
    DatasetStats::from_samples(&training).print("Training images");

    match discover_test_samples(test_root, None) {
        Ok(test) => DatasetStats::from_samples(&test).print("Test images"),
        Err(e) => println!("\n{} {}", "Test set unavailable:".yellow(), e),
    }

    Ok(())
}

fn cmd_preview(dir: &Path, count: usize, columns: usize, image_size: usize, output: &Path) -> Result<()> {
    let transform = ImageTransform::new(image_size);
    let paths = glob_images(dir, GENERATED_PATTERN)?;

    let mut tiles = Vec::new();
    for path in paths.iter().take(count) {
        let data = transform
            .load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        tiles.push(transform.invert(&data)?);
    }
    if tiles.is_empty() {
        bail!("No images found in {}", dir.display());
    }

    save_preview_grid(&tiles, columns, output)?;
    println!(
        "  {} Saved {} images to {}",
        "✓".green(),
        tiles.len(),
        output.display()
    );

    Ok(())
}
