use std::fs;
use std::path::PathBuf;

use burn::module::{ AutodiffModule, Module };
use burn::optim::{ AdamConfig, GradientsParams, Optimizer };
use burn::prelude::Backend;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;

use crate::archive;
use crate::checkpoint::{ Checkpoint, CheckpointManager };
use crate::config::{ PsnrAverage, TrainingConfig };
use crate::data::{ DataLoader, SrDataset };
use crate::device::{ select_device, InferenceBackend, TrainBackend };
use crate::error::{ Result, SrError };
use crate::logs::{ EpochLog, QualityLog };
use crate::metrics::{ self, MAX_PSNR_DB };
use crate::model::{ Espcn, EspcnConfig, Upscaler };
use crate::resolver::{ ArchiveSource, DatasetSplit, PathResolver };

/// Running sums for one epoch. Only ever written out as plain-text logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub iterations: usize,
    pub loss_sum: f64,
    pub validation_batches: usize,
    pub psnr_sum: f64,
}

impl EpochRecord {
    pub fn new(epoch: usize) -> Self {
        Self { epoch, ..Default::default() }
    }

    pub fn average_loss(&self) -> f64 {
        self.loss_sum / (self.iterations as f64)
    }

    pub fn average_psnr(&self, policy: PsnrAverage) -> f64 {
        let divisor = match policy {
            PsnrAverage::ValidationBatches => self.validation_batches,
            PsnrAverage::TrainingBatches => self.iterations,
        };
        self.psnr_sum / (divisor as f64)
    }
}

#[derive(Debug, Clone)]
pub struct EpochSummary {
    pub epoch: usize,
    pub iterations: usize,
    pub average_loss: f64,
    pub average_psnr: f64,
    pub checkpoint: Checkpoint,
}

#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub output_dir: PathBuf,
    pub epochs: Vec<EpochSummary>,
}

/// One sweep over the training set: forward, MSE, backward, one optimizer
/// step per batch, one log line per iteration.
pub fn train_epoch<B, M, O>(
    mut model: M,
    optim: &mut O,
    loader: &mut DataLoader<B>,
    learning_rate: f64,
    log: &mut EpochLog,
    record: &mut EpochRecord
)
    -> Result<M>
    where B: AutodiffBackend, M: Upscaler<B> + AutodiffModule<B>, O: Optimizer<M, B>
{
    let total = loader.len_batch();

    for (i, batch) in loader.by_ref().enumerate() {
        let batch = batch?;
        let prediction = model.forward(batch.input);
        let loss = metrics::loss(prediction, batch.target)?;
        let loss_value = loss.clone().into_scalar().elem::<f64>();
        if !loss_value.is_finite() {
            return Err(
                SrError::NumericFailure(
                    format!("loss became {} at epoch {} iteration {}", loss_value, record.epoch, i + 1)
                )
            );
        }

        // backward() devolve gradientes novos: nada sobra da iteração anterior
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(learning_rate, model, grads);

        record.iterations += 1;
        record.loss_sum += loss_value;
        log.iteration(i + 1, total, loss_value)?;

        tracing::debug!("[Train - Epoch {} - Batch {}/{}] Loss {:.4}", record.epoch, i + 1, total, loss_value);
    }

    Ok(model)
}

/// One sweep over the validation set with a model on the inner backend
/// (no gradient tracking), accumulating PSNR.
pub fn validate_epoch<B: Backend, M: Upscaler<B>>(
    model: &M,
    loader: &mut DataLoader<B>,
    record: &mut EpochRecord
) -> Result<()> {
    for batch in loader.by_ref() {
        let batch = batch?;
        let prediction = model.forward(batch.input);
        let mse = metrics::loss(prediction, batch.target)?.into_scalar().elem::<f64>();
        if !mse.is_finite() {
            return Err(SrError::NumericFailure(format!("validation mse became {}", mse)));
        }

        let psnr = match metrics::quality_score(mse) {
            Ok(psnr) => psnr,
            Err(SrError::DegenerateMetric { .. }) => {
                tracing::warn!("zero mse in validation batch, PSNR clamped to {} dB", MAX_PSNR_DB);
                MAX_PSNR_DB
            }
            Err(e) => {
                return Err(e);
            }
        };

        record.validation_batches += 1;
        record.psnr_sum += psnr;
    }

    Ok(())
}

/// Runs every epoch of a session for an already constructed model.
pub fn run_epochs<B, M>(
    config: &TrainingConfig,
    mut model: M,
    train_loader: &mut DataLoader<B>,
    valid_loader: &mut DataLoader<B::InnerBackend>
)
    -> Result<(M, SessionSummary)>
    where
        B: AutodiffBackend,
        M: Upscaler<B> + AutodiffModule<B>,
        M::InnerModule: Upscaler<B::InnerBackend>
{
    fs::create_dir_all(&config.output_dir)?;
    let checkpoints = CheckpointManager::new(&config.output_dir)?;
    let mut optim = AdamConfig::new().init::<B, M>();
    let mut quality_log = QualityLog::create(&config.output_dir)?;

    let mut summary = SessionSummary {
        output_dir: config.output_dir.clone(),
        epochs: Vec::with_capacity(config.epochs),
    };

    for epoch in 0..config.epochs {
        let mut record = EpochRecord::new(epoch);

        let mut epoch_log = EpochLog::create(&config.output_dir, epoch)?;
        model = train_epoch(
            model,
            &mut optim,
            train_loader,
            config.learning_rate,
            &mut epoch_log,
            &mut record
        )?;
        let average_loss = record.average_loss();
        epoch_log.finish(average_loss)?;

        let model_valid = model.valid();
        validate_epoch(&model_valid, valid_loader, &mut record)?;
        let average_psnr = record.average_psnr(config.psnr_average);
        quality_log.record(epoch, average_psnr)?;

        let checkpoint = checkpoints.save(&model, epoch)?;

        tracing::info!(
            "[Epoch {}] Average Loss {:.4} | Average PSNR {:.4} dB",
            epoch,
            average_loss,
            average_psnr
        );
        println!(
            "Epoch ({}/{}) is done! See {} for logs and models",
            epoch + 1,
            config.epochs,
            config.output_dir.display()
        );

        summary.epochs.push(EpochSummary {
            epoch,
            iterations: record.iterations,
            average_loss,
            average_psnr,
            checkpoint,
        });
    }

    quality_log.finish()?;
    Ok((model, summary))
}

/// Resolves both archives, extracts them under `config.output_dir` and loads
/// the training and validation sets.
pub fn prepare_datasets<R: PathResolver>(
    resolver: &mut R,
    config: &TrainingConfig
) -> Result<(SrDataset, SrDataset)> {
    let train = resolver.resolve_archive(DatasetSplit::Train)?;
    let valid = resolver.resolve_archive(DatasetSplit::Valid)?;

    let train_set = extract_split(config, DatasetSplit::Train, &train)?;
    let valid_set = extract_split(config, DatasetSplit::Valid, &valid)?;
    Ok((train_set, valid_set))
}

fn extract_split(config: &TrainingConfig, split: DatasetSplit, source: &ArchiveSource) -> Result<SrDataset> {
    let dir = archive::prepare(
        &config.output_dir,
        &source.archive,
        source.inner_folder.as_deref(),
        split.dir_label()
    )?;
    let dataset = SrDataset::from_dir(&dir, config.patch_size, config.upscale_factor as u32)?;
    dataset.print();
    Ok(dataset)
}

/// Full training session: device, seed, a fresh ESPCN and `config.epochs`
/// epochs over the given datasets.
pub fn run_session(
    config: &TrainingConfig,
    train_set: SrDataset,
    valid_set: SrDataset
) -> Result<SessionSummary> {
    config.validate()?;
    for dataset in [&train_set, &valid_set] {
        if dataset.upscale_factor() as usize != config.upscale_factor {
            return Err(
                SrError::InvalidConfig(
                    format!(
                        "dataset built for upscale {} but session uses {}",
                        dataset.upscale_factor(),
                        config.upscale_factor
                    )
                )
            );
        }
    }

    let device = select_device(config.use_gpu);
    TrainBackend::seed(config.seed);

    let model_config = EspcnConfig::new(config.upscale_factor);
    model_config.validate()?;
    let model: Espcn<TrainBackend> = model_config.init(&device);
    tracing::info!("model {} ({} params)", model, model.num_params());

    let mut train_loader = DataLoader::<TrainBackend>::new(
        train_set,
        config.train_batch_size,
        true,
        config.workers,
        config.seed,
        device.clone()
    )?;
    let mut valid_loader = DataLoader::<InferenceBackend>::new(
        valid_set,
        config.valid_batch_size,
        true,
        config.workers,
        config.seed.wrapping_add(1),
        device
    )?;

    let (_model, summary) = run_epochs(config, model, &mut train_loader, &mut valid_loader)?;
    Ok(summary)
}
