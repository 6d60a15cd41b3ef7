use std::fs;
use std::path::{ Path, PathBuf };

use burn::{
    prelude::*,
    record::{ FullPrecisionSettings, NamedMpkFileRecorder },
};
use serde::{ Deserialize, Serialize };

use crate::error::{ Result, SrError };
use crate::model::{ Espcn, EspcnConfig, Upscaler };

const WEIGHTS_EXT: &str = "mpk";
const META_EXT: &str = "json";

/// Architecture details stored next to the weights, so inference can rebuild
/// the network before loading them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub epoch: usize,
    pub upscale_factor: usize,
    pub channels: usize,
}

/// Files written for one epoch.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub weights: PathBuf,
    pub meta: PathBuf,
}

/// `epoch_{n}_model`, where `n` is the 1-based epoch number.
pub fn checkpoint_stem(epoch: usize) -> String {
    format!("epoch_{}_model", epoch + 1)
}

pub struct CheckpointManager {
    dir: PathBuf,
    recorder: NamedMpkFileRecorder<FullPrecisionSettings>,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            recorder: NamedMpkFileRecorder::new(),
        })
    }

    /// Saves the model state for `epoch` (0-based), replacing any earlier
    /// checkpoint with the same name.
    pub fn save<B: Backend, M: Upscaler<B>>(&self, model: &M, epoch: usize) -> Result<Checkpoint> {
        let stem = self.dir.join(checkpoint_stem(epoch));
        let weights = stem.with_extension(WEIGHTS_EXT);
        let meta_path = stem.with_extension(META_EXT);

        model
            .clone()
            .save_file(stem.clone(), &self.recorder)
            .map_err(|e| SrError::serialization(&weights, e))?;

        let meta = CheckpointMeta {
            epoch,
            upscale_factor: model.upscale_factor(),
            channels: 1,
        };
        let json = serde_json
            ::to_string_pretty(&meta)
            .map_err(|e| SrError::serialization(&meta_path, e))?;
        fs::write(&meta_path, json).map_err(|e| SrError::serialization(&meta_path, e))?;

        tracing::debug!("saved checkpoint {}", weights.display());
        Ok(Checkpoint { weights, meta: meta_path })
    }
}

pub fn load_meta(path: &Path) -> Result<CheckpointMeta> {
    let meta_path = path.with_extension(META_EXT);
    if !meta_path.is_file() {
        return Err(SrError::PathNotFound(meta_path));
    }
    let json = fs::read_to_string(&meta_path).map_err(|e| SrError::serialization(&meta_path, e))?;
    serde_json::from_str(&json).map_err(|e| SrError::serialization(&meta_path, e))
}

/// Rebuilds an ESPCN from a checkpoint. `path` may name the weights file or
/// its stem.
pub fn load_espcn<B: Backend>(path: &Path, device: &B::Device) -> Result<Espcn<B>> {
    let weights = path.with_extension(WEIGHTS_EXT);
    if !weights.is_file() {
        return Err(SrError::PathNotFound(weights));
    }

    let meta = load_meta(path)?;
    let config = EspcnConfig::new(meta.upscale_factor).with_channels(meta.channels);
    config.validate()?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    config
        .init::<B>(device)
        .load_file(weights.clone(), &recorder, device)
        .map_err(|e| SrError::serialization(&weights, e))
}
