//! GPU utilization probe.
//!
//! NVIDIA GPUs are read through NVML (`nvml` feature). Everything else gets
//! the documented fallback: zero utilization and zero memory.

#[cfg(feature = "nvml")]
use nvml_wrapper::{Device, Nvml};

use crate::error::{GuardError, Result};

/// One GPU reading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuReading {
    pub utilization_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
}

/// Vendor-specific GPU probe
pub trait GpuProbe: Send {
    fn name(&self) -> &str;

    fn read(&mut self) -> Result<GpuReading>;
}

/// Attempt to get an available GPU probe
pub fn get_gpu_probe() -> Result<Box<dyn GpuProbe>> {
    let probe = NvidiaGpuProbe::new()?;
    Ok(Box::new(probe))
}

/// NVIDIA GPU probe using NVML
pub struct NvidiaGpuProbe {
    #[cfg(feature = "nvml")]
    nvml: Nvml,
    device_index: u32,
}

impl NvidiaGpuProbe {
    /// Initialize NVML and select the first GPU
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    pub fn with_device_index(index: u32) -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init().map_err(|e| {
                GuardError::gpu_not_available(format!("Failed to init NVML: {}", e))
            })?;

            // Verify device exists
            let _ = nvml.device_by_index(index).map_err(|e| {
                GuardError::gpu_not_available(format!("GPU {} not found: {}", index, e))
            })?;

            Ok(Self {
                nvml,
                device_index: index,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(GuardError::gpu_not_available(format!(
                "NVIDIA GPU {} support not enabled",
                index
            )))
        }
    }

    #[cfg(feature = "nvml")]
    fn device(&self) -> Result<Device<'_>> {
        self.nvml
            .device_by_index(self.device_index)
            .map_err(|e| GuardError::probe(format!("Failed to get GPU device: {}", e)))
    }
}

impl GpuProbe for NvidiaGpuProbe {
    fn name(&self) -> &str {
        "nvidia"
    }

    fn read(&mut self) -> Result<GpuReading> {
        #[cfg(feature = "nvml")]
        {
            let device = self.device()?;

            let utilization = device.utilization_rates().map(|u| u.gpu).unwrap_or(0);

            let memory_info = device.memory_info().map_err(|e| {
                GuardError::probe(format!("Failed to get GPU memory info: {}", e))
            })?;

            Ok(GpuReading {
                utilization_percent: f64::from(utilization).clamp(0.0, 100.0),
                memory_used_bytes: memory_info.used,
                memory_total_bytes: memory_info.total,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(GuardError::gpu_not_available(format!(
                "NVIDIA GPU {} support not enabled",
                self.device_index
            )))
        }
    }
}
