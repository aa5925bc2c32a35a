use candle_core::Device;
use tracing::debug;

#[cfg(any(feature = "metal", feature = "cuda"))]
use tracing::warn;

/// Picks the first usable accelerator compiled in, else the CPU.
///
/// Embedding must keep working on machines without a GPU, so accelerator
/// failures are logged and never returned.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            debug!("embedding on Metal");
            return device;
        }
        Err(e) => warn!(error = %e, "Metal unavailable for embedding"),
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            debug!("embedding on CUDA");
            return device;
        }
        Err(e) => warn!(error = %e, "CUDA unavailable for embedding"),
    }

    debug!("embedding on CPU");
    Device::Cpu
}
