use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuToolkit {
    #[default]
    None,
    Cuda,
    OpenCl,
}

impl fmt::Display for GpuToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GpuToolkit::None => "none",
            GpuToolkit::Cuda => "CUDA",
            GpuToolkit::OpenCl => "OpenCL",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("A worker needs at least one thread")]
    NoThreads,
    #[error("{gpus} GPU(s) requested but no GPU toolkit selected")]
    MissingToolkit { gpus: usize },
}

/// Hardware assigned to a single worker.
///
/// Values are validated on construction and cannot be changed afterwards; every worker gets
/// its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawResources")]
pub struct ComputeResources {
    number_of_threads: usize,
    number_of_gpus: usize,
    preferred_gpu_toolkit: GpuToolkit,
}

#[derive(Deserialize)]
struct RawResources {
    number_of_threads: usize,
    number_of_gpus: usize,
    preferred_gpu_toolkit: GpuToolkit,
}

impl TryFrom<RawResources> for ComputeResources {
    type Error = ResourceError;

    fn try_from(raw: RawResources) -> Result<Self, Self::Error> {
        Self::new(
            raw.number_of_threads,
            raw.number_of_gpus,
            raw.preferred_gpu_toolkit,
        )
    }
}

impl ComputeResources {
    pub fn new(
        number_of_threads: usize,
        number_of_gpus: usize,
        preferred_gpu_toolkit: GpuToolkit,
    ) -> Result<Self, ResourceError> {
        if number_of_threads == 0 {
            return Err(ResourceError::NoThreads);
        }
        if number_of_gpus > 0 && preferred_gpu_toolkit == GpuToolkit::None {
            return Err(ResourceError::MissingToolkit {
                gpus: number_of_gpus,
            });
        }
        Ok(Self {
            number_of_threads,
            number_of_gpus,
            preferred_gpu_toolkit,
        })
    }

    pub fn cpu_only(number_of_threads: usize) -> Result<Self, ResourceError> {
        Self::new(number_of_threads, 0, GpuToolkit::None)
    }

    pub fn number_of_threads(&self) -> usize {
        self.number_of_threads
    }

    pub fn number_of_gpus(&self) -> usize {
        self.number_of_gpus
    }

    pub fn preferred_gpu_toolkit(&self) -> GpuToolkit {
        self.preferred_gpu_toolkit
    }
}

impl Default for ComputeResources {
    fn default() -> Self {
        Self {
            number_of_threads: 1,
            number_of_gpus: 0,
            preferred_gpu_toolkit: GpuToolkit::None,
        }
    }
}

impl fmt::Display for ComputeResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} thread(s), {} GPU(s) [{}]",
            self.number_of_threads, self.number_of_gpus, self.preferred_gpu_toolkit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        assert_eq!(
            ComputeResources::new(0, 0, GpuToolkit::None),
            Err(ResourceError::NoThreads)
        );
    }

    #[test]
    fn gpus_require_a_toolkit() {
        assert_eq!(
            ComputeResources::new(1, 1, GpuToolkit::None),
            Err(ResourceError::MissingToolkit { gpus: 1 })
        );
        let resources = ComputeResources::new(1, 1, GpuToolkit::Cuda).unwrap();
        assert_eq!(resources.to_string(), "1 thread(s), 1 GPU(s) [CUDA]");
    }

    #[test]
    fn deserialization_applies_validation() {
        let ok: ComputeResources = serde_json::from_str(
            r#"{"number_of_threads":2,"number_of_gpus":1,"preferred_gpu_toolkit":"opencl"}"#,
        )
        .unwrap();
        assert_eq!(ok.preferred_gpu_toolkit(), GpuToolkit::OpenCl);

        let bad: Result<ComputeResources, _> = serde_json::from_str(
            r#"{"number_of_threads":0,"number_of_gpus":0,"preferred_gpu_toolkit":"none"}"#,
        );
        assert!(bad.is_err());
    }
}
