//! ESPCN single image super resolution on burn.
//!
//! Training works on the luma plane of centre-cropped patches and writes
//! plain-text logs plus one checkpoint per epoch. Inference upscales the
//! luma through the network and the chroma with a bicubic resize.

pub mod archive;
pub mod checkpoint;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod inference;
pub mod logs;
pub mod metrics;
pub mod model;
pub mod resolver;
pub mod train;
pub mod utils;

pub use error::{ Result, SrError };
