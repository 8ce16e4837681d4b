//! # lapsmooth-gpu
//!
//! Device layer for the lapsmooth pipeline.
//!
//! Provides a [`ComputeBackend`] trait with two implementations:
//! - [`CpuFallback`]: Sequential host reference (always available)
//! - `WgpuBackend`: GPU compute via wgpu (feature `wgpu`)
//!
//! On top of a backend sit the [`DeviceBufferSet`], which owns the six
//! uploaded regions, and the [`SmoothingScheduler`], which ping-pongs the
//! two position regions through a [`SmoothingKernel`].

pub mod backend;
pub mod buffers;
pub mod device;
pub mod kernel;
pub mod scheduler;
#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

pub use backend::{ComputeBackend, CpuFallback};
pub use buffers::{BufferAccess, BufferLayout, BufferSlot, ComputeBuffer};
pub use device::DeviceBufferSet;
pub use kernel::{NeighborAverage, SmoothingKernel};
pub use scheduler::{Parity, SmoothingOutcome, SmoothingScheduler, SmoothingState};
#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuBackend;
