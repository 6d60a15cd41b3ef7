use std::path::PathBuf;

use clap::{ Args, Parser, Subcommand };

use crate::config::{ InferenceConfig, PsnrAverage, TrainingConfig };
use crate::data::DEFAULT_PATCH_SIZE;
use crate::resolver::{ DatasetSplit, FixedResolver };

/// Single image super resolution with ESPCN
#[derive(Parser, Debug)]
#[command(name = "super-res", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an ESPCN on zipped training and validation image sets
    Train(TrainArgs),
    /// Upscale one image with a trained checkpoint
    Upscale(UpscaleArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Super resolution upscale factor
    #[arg(long)]
    pub upscale: usize,

    /// Training batch size
    #[arg(long, alias = "trainBatchSize")]
    pub train_batch_size: usize,

    /// Validation batch size
    #[arg(long, alias = "validBatchSize")]
    pub valid_batch_size: usize,

    /// Number of epochs to train for
    #[arg(long, alias = "nEpochs")]
    pub epochs: usize,

    /// Learning rate
    #[arg(long)]
    pub lr: f64,

    /// Threads used to load batches
    #[arg(long, alias = "nWorkers", default_value_t = 8)]
    pub workers: usize,

    /// Use a CUDA device when one is available
    #[arg(long)]
    pub cuda: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Side of the square crop taken from each image
    #[arg(long, default_value_t = DEFAULT_PATCH_SIZE)]
    pub patch_size: u32,

    /// Where extracted sets, logs and checkpoints go
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Training archive, relative to the working directory. Both archives
    /// are asked for when neither is given.
    #[arg(long, requires = "valid_archive")]
    pub train_archive: Option<PathBuf>,

    #[arg(long, requires = "train_archive")]
    pub valid_archive: Option<PathBuf>,

    /// Folder inside the training archive that holds the images
    #[arg(long, requires = "train_archive")]
    pub train_inner: Option<PathBuf>,

    #[arg(long, requires = "valid_archive")]
    pub valid_inner: Option<PathBuf>,

    /// Average PSNR over the training batch count, like the first logs did
    #[arg(long)]
    pub legacy_psnr_average: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpscaleArgs {
    /// Image to upscale
    #[arg(long)]
    pub input: PathBuf,

    /// Checkpoint written during training (`epoch_N_model.mpk`)
    #[arg(long)]
    pub model: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub cuda: bool,
}

impl TrainArgs {
    /// Resolver over the archives given on the command line, or `None` when
    /// they have to be asked for. Paths are used as given, so relative ones
    /// resolve against the working directory and not `--output-dir`.
    pub fn fixed_resolver(&self) -> Option<FixedResolver> {
        let (train, valid) = (self.train_archive.as_deref()?, self.valid_archive.as_deref()?);
        Some(
            FixedResolver::new()
                .with_archive(DatasetSplit::Train, train, self.train_inner.as_deref())
                .with_archive(DatasetSplit::Valid, valid, self.valid_inner.as_deref())
        )
    }
}

impl From<&TrainArgs> for TrainingConfig {
    fn from(args: &TrainArgs) -> Self {
        TrainingConfig {
            upscale_factor: args.upscale,
            train_batch_size: args.train_batch_size,
            valid_batch_size: args.valid_batch_size,
            epochs: args.epochs,
            learning_rate: args.lr,
            workers: args.workers,
            use_gpu: args.cuda,
            seed: args.seed,
            patch_size: args.patch_size,
            output_dir: args.output_dir.clone(),
            psnr_average: if args.legacy_psnr_average {
                PsnrAverage::TrainingBatches
            } else {
                PsnrAverage::ValidationBatches
            },
        }
    }
}

impl From<UpscaleArgs> for InferenceConfig {
    fn from(args: UpscaleArgs) -> Self {
        InferenceConfig {
            input: args.input,
            model: args.model,
            output: args.output,
            use_gpu: args.cuda,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PathResolver;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from([
            "super-res",
            "train",
            "--upscale",
            "3",
            "--train-batch-size",
            "4",
            "--valid-batch-size",
            "2",
            "--epochs",
            "5",
            "--lr",
            "0.01",
        ]).unwrap();

        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert!(args.fixed_resolver().is_none());
        let config = TrainingConfig::from(&args);
        assert_eq!(config.upscale_factor, 3);
        assert_eq!(config.workers, 8);
        assert_eq!(config.seed, 42);
        assert_eq!(config.patch_size, 244);
        assert!(!config.use_gpu);
        assert_eq!(config.psnr_average, PsnrAverage::ValidationBatches);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_camel_case_aliases() {
        let cli = Cli::try_parse_from([
            "super-res",
            "train",
            "--upscale",
            "2",
            "--trainBatchSize",
            "8",
            "--validBatchSize",
            "8",
            "--nEpochs",
            "1",
            "--nWorkers",
            "2",
            "--lr",
            "0.001",
            "--cuda",
            "--legacy-psnr-average",
        ]).unwrap();

        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = TrainingConfig::from(&args);
        assert_eq!(config.train_batch_size, 8);
        assert_eq!(config.workers, 2);
        assert!(config.use_gpu);
        assert_eq!(config.psnr_average, PsnrAverage::TrainingBatches);
    }

    #[test]
    fn test_upscale_args() {
        let cli = Cli::try_parse_from([
            "super-res",
            "upscale",
            "--input",
            "in.png",
            "--model",
            "epoch_3_model.mpk",
            "--output",
            "out.png",
        ]).unwrap();

        let Commands::Upscale(args) = cli.command else {
            panic!("expected upscale");
        };
        let config = InferenceConfig::from(args);
        assert_eq!(config.model, PathBuf::from("epoch_3_model.mpk"));
        assert!(!config.use_gpu);
    }

    const BASE: [&str; 12] = [
        "super-res",
        "train",
        "--upscale",
        "2",
        "--train-batch-size",
        "1",
        "--valid-batch-size",
        "1",
        "--epochs",
        "1",
        "--lr",
        "0.001",
    ];

    #[test]
    fn test_single_archive_is_rejected() {
        for extra in [["--train-archive", "t.zip"], ["--valid-archive", "v.zip"], ["--train-inner", "imgs"]] {
            let argv: Vec<&str> = BASE.iter().copied().chain(extra).collect();
            assert!(Cli::try_parse_from(argv).is_err(), "{:?}", extra);
        }
    }

    #[test]
    fn test_archives_are_not_joined_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("t.zip");
        let valid = dir.path().join("v.zip");
        std::fs::write(&train, "zip").unwrap();
        std::fs::write(&valid, "zip").unwrap();

        let (train_arg, valid_arg) = (train.to_str().unwrap(), valid.to_str().unwrap());
        let argv: Vec<&str> = BASE.iter()
            .copied()
            .chain(["--output-dir", "runs", "--train-archive", train_arg, "--valid-archive", valid_arg])
            .chain(["--valid-inner", "pics"])
            .collect();
        let Commands::Train(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected train");
        };

        let mut resolver = args.fixed_resolver().unwrap();
        let source = resolver.resolve_archive(DatasetSplit::Train).unwrap();
        assert_eq!(source.archive, train);
        assert_eq!(source.inner_folder, None);
        let source = resolver.resolve_archive(DatasetSplit::Valid).unwrap();
        assert_eq!(source.archive, valid);
        assert_eq!(source.inner_folder, Some(PathBuf::from("pics")));
    }

    #[test]
    fn test_missing_required_argument() {
        assert!(Cli::try_parse_from(["super-res", "train", "--upscale", "2"]).is_err());
    }
}
