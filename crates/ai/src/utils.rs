use candle_core::{
    utils::{cuda_is_available, metal_is_available},
    Device,
};

/// Pick the compute device once at startup: CUDA, then Metal, then CPU.
pub fn select_device() -> Device {
    if cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return device,
            Err(e) => tracing::warn!("cuda reported available but failed to init: {}", e),
        }
    }

    if metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => return device,
            Err(e) => tracing::warn!("metal reported available but failed to init: {}", e),
        }
    }

    Device::Cpu
}

pub fn device_name(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}
