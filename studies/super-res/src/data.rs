use burn::prelude::Backend;
use burn::tensor::{ Device, Tensor, TensorData };
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::{ ThreadPool, ThreadPoolBuilder };
use std::fs::read_dir;
use std::path::{ Path, PathBuf };

use crate::color;
use crate::error::{ Result, SrError };
use crate::utils::images::{ center_crop, downscale, load_rgb, normalize };

/// Patch size used when building the training and validation sets.
pub const DEFAULT_PATCH_SIZE: u32 = 244;

const VALID_EXT: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// One low/high resolution luma pair, normalized to [0, 1].
#[derive(Debug, Clone)]
pub struct SrItem {
    pub input: Vec<f32>,
    pub target: Vec<f32>,
}

/// Centre-cropped luma patches built from a folder of images.
#[derive(Debug, Clone)]
pub struct SrDataset {
    root: PathBuf,
    image_path: Vec<PathBuf>,
    crop_size: u32,
    upscale_factor: u32,
}

impl SrDataset {
    /// Walks `root` (non-recursively) and keeps every decodable image extension.
    pub fn from_dir<T: AsRef<Path>>(root: T, patch_size: u32, upscale_factor: u32) -> Result<SrDataset> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(SrError::PathNotFound(root.to_path_buf()));
        }
        if upscale_factor < 2 {
            return Err(SrError::InvalidConfig(format!("upscale factor must be >= 2, got {}", upscale_factor)));
        }
        let crop_size = patch_size - (patch_size % upscale_factor);
        if crop_size == 0 {
            return Err(
                SrError::InvalidConfig(
                    format!("patch size {} is smaller than upscale factor {}", patch_size, upscale_factor)
                )
            );
        }

        let mut image_path = Self::get_images_in_folder(root)?;
        if image_path.is_empty() {
            return Err(SrError::EmptyDataset(root.to_path_buf()));
        }
        image_path.sort();

        Ok(SrDataset {
            root: root.to_path_buf(),
            image_path,
            crop_size,
            upscale_factor,
        })
    }

    fn get_images_in_folder(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut image_path = Vec::new();
        for entry in read_dir(dir)? {
            let file_path = entry?.path();
            let has_valid_ext = file_path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| VALID_EXT.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);
            if file_path.is_file() && has_valid_ext {
                image_path.push(file_path);
            }
        }
        Ok(image_path)
    }

    pub fn len(&self) -> usize {
        self.image_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_path.is_empty()
    }

    /// Side of the high resolution target patch.
    pub fn crop_size(&self) -> u32 {
        self.crop_size
    }

    /// Side of the low resolution input patch.
    pub fn input_size(&self) -> u32 {
        self.crop_size / self.upscale_factor
    }

    pub fn upscale_factor(&self) -> u32 {
        self.upscale_factor
    }

    pub fn print(&self) {
        tracing::info!(
            root = %self.root.display(),
            size = self.len(),
            crop = self.crop_size,
            input = self.input_size(),
            "dataset loaded"
        );
    }

    pub fn get_item(&self, idx: usize) -> Result<SrItem> {
        let rgb = load_rgb(&self.image_path[idx])?;
        let luma = color::split(&rgb).luma;
        let target = center_crop(&luma, self.crop_size);
        let input = downscale(&target, self.input_size());

        Ok(SrItem {
            input: normalize(&input),
            target: normalize(&target),
        })
    }
}

/// A batch of `[batch, 1, h, w]` inputs and `[batch, 1, h * r, w * r]` targets.
#[derive(Debug, Clone)]
pub struct SrBatch<B: Backend> {
    pub input: Tensor<B, 4>,
    pub target: Tensor<B, 4>,
}

pub struct DataLoader<B: Backend> {
    dataset: SrDataset,
    indices: Vec<usize>,
    batch_size: usize,
    batch_index: usize,
    shuffle: bool,
    rng: StdRng,
    pool: ThreadPool,
    device: Device<B>,
}

impl<B: Backend> DataLoader<B> {
    pub fn new(
        dataset: SrDataset,
        batch_size: usize,
        shuffle: bool,
        workers: usize,
        seed: u64,
        device: Device<B>
    ) -> Result<DataLoader<B>> {
        if batch_size == 0 {
            return Err(SrError::InvalidConfig("batch size must be >= 1".to_string()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| SrError::InvalidConfig(format!("failed to start data workers: {}", e)))?;

        Ok(DataLoader {
            indices: (0..dataset.len()).collect(),
            dataset,
            batch_size,
            batch_index: 0,
            shuffle,
            rng: StdRng::seed_from_u64(seed),
            pool,
            device,
        })
    }

    fn shuffle_dataset(&mut self) {
        self.indices.shuffle(&mut self.rng);
    }

    /// Total number of images in the dataset
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Number of batches based on the dataset size and batch size
    pub fn len_batch(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    fn load_batch(&self, start: usize, end: usize) -> Result<SrBatch<B>> {
        let dataset = &self.dataset;
        let batch_indices = &self.indices[start..end];
        let items: Vec<SrItem> = self.pool.install(|| {
            batch_indices
                .par_iter()
                .map(|&i| dataset.get_item(i))
                .collect::<Result<Vec<_>>>()
        })?;

        let n = items.len();
        let lr = dataset.input_size() as usize;
        let hr = dataset.crop_size() as usize;
        let mut inputs = Vec::with_capacity(n * lr * lr);
        let mut targets = Vec::with_capacity(n * hr * hr);
        for item in items {
            inputs.extend(item.input);
            targets.extend(item.target);
        }

        Ok(SrBatch {
            input: Tensor::from_data(TensorData::new(inputs, [n, 1, lr, lr]), &self.device),
            target: Tensor::from_data(TensorData::new(targets, [n, 1, hr, hr]), &self.device),
        })
    }
}

/// Yields every batch once, then resets for the next epoch.
impl<B: Backend> Iterator for DataLoader<B> {
    type Item = Result<SrBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.batch_index * self.batch_size;
        if start >= self.dataset.len() {
            self.batch_index = 0;
            return None;
        }
        let end = (start + self.batch_size).min(self.dataset.len());
        if self.batch_index == 0 && self.shuffle {
            self.shuffle_dataset();
        }

        self.batch_index += 1;
        Some(self.load_batch(start, end))
    }
}
