/// Command line interface
///
/// `train` runs the epoch loop, `eval` scores a saved checkpoint.
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::data::{InMemoryDataset, NpyFolderDataset, SampleLoader, SrDataset};
use crate::models::loader::load_model;
use crate::training::{evaluate, Checkpoint, RunSnapshot, ScalarWriter, Trainer, TrainingConfig};
use crate::utils::select_device;
use crate::SrNetConfig;

/// Synthetic smoke-run sizes: (train samples, val samples, low-res edge)
const SYNTHETIC_SIZES: (usize, usize, usize) = (64, 8, 16);

#[derive(Parser, Debug)]
#[command(
    name = "hsi-sr-train",
    version,
    about = "Train and evaluate a hyperspectral super-resolution network."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the network, checkpointing every epoch
    Train(TrainArgs),

    /// Score a checkpoint on a test set
    Eval(EvalArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Run on CUDA
    #[arg(long)]
    pub cuda: bool,

    /// GPU ids, comma separated; only the first is used
    #[arg(long, default_value = "0")]
    pub gpus: String,

    /// Seed for initialisation and shuffling
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Dataset root with `train/` and `test/` folders
    #[arg(long, default_value = "data")]
    pub dataset_dir: PathBuf,

    /// Loader worker threads
    #[arg(long, default_value_t = 2)]
    pub threads: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// First epoch when not resuming
    #[arg(long, default_value_t = 1)]
    pub start_epoch: usize,

    /// Last epoch (inclusive)
    #[arg(long, default_value_t = 200)]
    pub n_epochs: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 4)]
    pub upscale_factor: usize,

    /// Checkpoint to resume from; a missing file is only a warning
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Write Train/Loss and Val/PSNR scalars to `--log-dir`
    #[arg(long)]
    pub show: bool,

    /// Spectral bands per cube
    #[arg(long, default_value_t = 31)]
    pub bands: usize,

    #[arg(long, default_value_t = 32)]
    pub n_feats: usize,

    #[arg(long, default_value_t = 3)]
    pub n_blocks: usize,

    #[arg(long, default_value_t = 0.0)]
    pub dropout: f32,

    #[arg(long, default_value = "checkpoint")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Keep only the newest N checkpoints
    #[arg(long)]
    pub keep_last: Option<usize>,

    /// Train on generated cubes instead of `--dataset-dir`
    #[arg(long)]
    pub synthetic: bool,
}

impl From<&TrainArgs> for SrNetConfig {
    fn from(a: &TrainArgs) -> Self {
        SrNetConfig {
            bands: a.bands,
            n_feats: a.n_feats,
            n_blocks: a.n_blocks,
            upscale_factor: a.upscale_factor,
            dropout: a.dropout,
            ..Default::default()
        }
    }
}

impl From<&TrainArgs> for TrainingConfig {
    fn from(a: &TrainArgs) -> Self {
        TrainingConfig {
            start_epoch: a.start_epoch,
            n_epochs: a.n_epochs,
            batch_size: a.batch_size,
            learning_rate: a.lr,
            seed: a.seed,
            checkpoint_dir: a.checkpoint_dir.clone(),
            keep_last: a.keep_last,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Checkpoint written by `train`
    #[arg(long)]
    pub checkpoint: PathBuf,

    /// Dataset root; cubes are read from its `test/` folder
    #[arg(long, default_value = "data")]
    pub dataset_dir: PathBuf,

    #[arg(long)]
    pub cuda: bool,

    #[arg(long, default_value = "0")]
    pub gpus: String,
}

impl Cli {
    pub fn run(self) -> crate::Result<()> {
        match self.command {
            Commands::Train(args) => run_train(&args),
            Commands::Eval(args) => run_eval(&args),
        }
    }
}

fn run_train(args: &TrainArgs) -> crate::Result<()> {
    log::info!("{:?}", args);

    let net_config = SrNetConfig::from(args);
    let training_config = TrainingConfig::from(args);
    net_config.validate()?;
    training_config.validate()?;

    let device = select_device(args.cuda, &args.gpus)?;

    log::info!("===> Loading datasets");
    let mut trainer = Trainer::new(net_config.clone(), training_config.clone(), device)?;
    if args.show {
        trainer = trainer.with_summary(ScalarWriter::new(&args.log_dir)?);
    }

    if args.synthetic {
        let (n_train, n_val, lr_size) = SYNTHETIC_SIZES;
        let scale = net_config.upscale_factor;
        let train = InMemoryDataset::synthetic(n_train, net_config.bands, lr_size, scale, args.seed)?;
        let val = InMemoryDataset::synthetic(n_val, net_config.bands, lr_size, scale, args.seed.wrapping_add(1))?;
        train_on(&mut trainer, train, val, args)
    } else {
        let train = open_split(&args.dataset_dir, "train", &net_config)?;
        let val = open_split(&args.dataset_dir, "test", &net_config)?;
        train_on(&mut trainer, train, val, args)
    }
}

fn train_on<D: SrDataset>(
    trainer: &mut Trainer,
    train: D,
    val: D,
    args: &TrainArgs,
) -> crate::Result<()> {
    log::info!("Train samples: {}, validation samples: {}", train.len(), val.len());

    let mut train_loader = SampleLoader::new(train, args.batch_size, true)
        .with_seed(args.seed)
        .with_threads(args.threads);
    let mut val_loader = SampleLoader::new(val, 1, false).with_threads(args.threads);

    trainer.resume(args.resume.as_ref())?;

    log::info!("===> Training");
    let history = trainer.fit(&mut train_loader, &mut val_loader)?;
    if let Some(best) = history
        .iter()
        .max_by(|a, b| a.validation.psnr.total_cmp(&b.validation.psnr))
    {
        log::info!(
            "Best PSNR {:.3} at epoch {} ({})",
            best.validation.psnr,
            best.epoch,
            best.checkpoint.display()
        );
    }
    if let Some(summary) = trainer.summary() {
        log::info!(
            "{} scalars written to {}",
            summary.records()?.len(),
            summary.log_dir().display()
        );
    }
    Ok(())
}

fn open_split(root: &Path, split: &str, config: &SrNetConfig) -> crate::Result<NpyFolderDataset> {
    let dataset = NpyFolderDataset::from_directory(root.join(split), config.upscale_factor)?;
    dataset.check_bands(config.bands)?;
    Ok(dataset)
}

fn run_eval(args: &EvalArgs) -> crate::Result<()> {
    let device = select_device(args.cuda, &args.gpus)?;

    let metadata = Checkpoint::read_metadata(&args.checkpoint)?;
    let net_config = RunSnapshot::from_metadata(&metadata)?
        .ok_or_else(|| {
            crate::SrError::Checkpoint(format!(
                "{} carries no run configuration",
                args.checkpoint.display()
            ))
        })?
        .net;

    let (model, _varmap) = load_model(net_config.clone(), &args.checkpoint, &device)?;
    let dataset = open_split(&args.dataset_dir, "test", &net_config)?;
    let mut loader = SampleLoader::new(dataset, 1, false);

    let report = evaluate(&model, &mut loader, &device, metadata.epoch)?;
    println!(
        "epoch {}: PSNR = {:.3} dB, SAM = {:.3} deg over {} samples",
        metadata.epoch, report.psnr, report.sam, report.samples
    );
    Ok(())
}
