//! Backend aliases and compute device selection.
//!
//! With the `tch` feature the LibTorch backend is used and CUDA is picked
//! when requested and present. Without it everything runs on the ndarray
//! CPU backend.

use burn::backend::Autodiff;
use burn::tensor::Device;

use crate::error::SrError;

#[cfg(feature = "tch")]
pub type InferenceBackend = burn::backend::LibTorch;
#[cfg(not(feature = "tch"))]
pub type InferenceBackend = burn::backend::NdArray;

pub type TrainBackend = Autodiff<InferenceBackend>;

pub const CPU_FALLBACK_NOTICE: &str = "No CUDA supporting GPU found, using CPU";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Gpu,
    Cpu,
}

/// GPU only when it was asked for and one exists. Asking without a GPU is
/// reported as `DeviceUnavailable` alongside the CPU choice, never as a
/// failure.
pub fn resolve_device(use_gpu: bool, gpu_available: bool) -> (DeviceKind, Option<SrError>) {
    match (use_gpu, gpu_available) {
        (true, true) => (DeviceKind::Gpu, None),
        (true, false) => (DeviceKind::Cpu, Some(SrError::DeviceUnavailable)),
        (false, _) => (DeviceKind::Cpu, None),
    }
}

#[cfg(feature = "tch")]
pub fn gpu_available() -> bool {
    tch::Cuda::is_available()
}

#[cfg(not(feature = "tch"))]
pub fn gpu_available() -> bool {
    false
}

/// Picks the device for this run, printing the fallback notice when a GPU
/// was requested but cannot be used.
pub fn select_device(use_gpu: bool) -> Device<InferenceBackend> {
    let (kind, warning) = resolve_device(use_gpu, gpu_available());
    if let Some(warning) = warning {
        tracing::warn!("{}", warning);
        println!("{}", CPU_FALLBACK_NOTICE);
    }
    let device = backend_device(kind);
    tracing::info!("The device is {:?}", device);
    device
}

#[cfg(feature = "tch")]
fn backend_device(kind: DeviceKind) -> Device<InferenceBackend> {
    use burn::backend::libtorch::LibTorchDevice;
    match kind {
        DeviceKind::Gpu => LibTorchDevice::Cuda(0),
        DeviceKind::Cpu => LibTorchDevice::Cpu,
    }
}

#[cfg(not(feature = "tch"))]
fn backend_device(_kind: DeviceKind) -> Device<InferenceBackend> {
    burn::backend::ndarray::NdArrayDevice::Cpu
}
