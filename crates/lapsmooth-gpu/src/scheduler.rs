//! Ping-pong smoothing scheduler.
//!
//! Each iteration reads one position region and writes the other, then
//! waits on a barrier before flipping parity:
//!
//! ```text
//! iteration 0: A -> B    barrier    parity = BSource
//! iteration 1: B -> A    barrier    parity = ASource
//! ...
//! ```
//!
//! The authoritative result is the region last written by a dispatch,
//! tracked explicitly in [`SmoothingState::last_written`]. With no
//! dispatch at all, region A still holds the uploaded positions.

use lapsmooth_types::{SmoothError, SmoothResult};

use crate::buffers::BufferSlot;
use crate::device::DeviceBufferSet;

/// Which position region the next dispatch reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parity {
    #[default]
    ASource,
    BSource,
}

impl Parity {
    pub fn source(self) -> BufferSlot {
        match self {
            Self::ASource => BufferSlot::PositionsA,
            Self::BSource => BufferSlot::PositionsB,
        }
    }

    pub fn destination(self) -> BufferSlot {
        match self {
            Self::ASource => BufferSlot::PositionsB,
            Self::BSource => BufferSlot::PositionsA,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::ASource => Self::BSource,
            Self::BSource => Self::ASource,
        }
    }
}

/// Scheduler bookkeeping, stored with the buffers it describes.
/// Mutated only by [`SmoothingScheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmoothingState {
    /// Iterations completed.
    pub iteration: u32,
    pub parity: Parity,
    /// Dispatches issued by this scheduler.
    pub dispatches: u64,
    /// Region written by the most recent dispatch.
    pub last_written: Option<BufferSlot>,
}

impl SmoothingState {
    /// Region holding the current result.
    pub fn authoritative(&self) -> BufferSlot {
        self.last_written.unwrap_or(BufferSlot::PositionsA)
    }
}

/// Result of a [`SmoothingScheduler::smooth`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingOutcome {
    /// Interleaved positions read back from the authoritative region.
    pub positions: Vec<f32>,
    /// Parity after the last iteration; its source is the authoritative region.
    pub final_parity: Parity,
    pub authoritative: BufferSlot,
    /// Dispatches issued during this call.
    pub dispatches: u64,
}

/// Drives iterations of the kernel over a [`DeviceBufferSet`].
pub struct SmoothingScheduler<'a> {
    buffers: &'a mut DeviceBufferSet,
}

impl<'a> SmoothingScheduler<'a> {
    pub fn new(buffers: &'a mut DeviceBufferSet) -> Self {
        Self { buffers }
    }

    pub fn state(&self) -> &SmoothingState {
        self.buffers.smoothing_state()
    }

    /// Runs one iteration: dispatch, barrier, flip.
    pub fn step(&mut self) -> SmoothResult<()> {
        let parity = self.state().parity;
        let source = parity.source();
        let destination = parity.destination();
        let work_items = u32::try_from(self.buffers.vertex_count()).map_err(|_| {
            SmoothError::Device(format!(
                "{} vertices exceed the dispatch range",
                self.buffers.vertex_count()
            ))
        })?;

        let backend = self.buffers.backend_mut()?;
        let before = backend.dispatch_count();
        backend.dispatch(source, destination, work_items)?;
        backend.barrier()?;

        if backend.dispatch_count() != before + 1 {
            return Err(SmoothError::ParityViolation(format!(
                "Backend recorded {} dispatches for one iteration",
                backend.dispatch_count() - before
            )));
        }

        let state = self.buffers.state_mut();
        state.dispatches += 1;
        state.last_written = Some(destination);
        state.parity = parity.flipped();
        state.iteration += 1;

        tracing::debug!(
            iteration = state.iteration,
            source = source.name(),
            destination = destination.name(),
            "dispatched smoothing pass"
        );
        Ok(())
    }

    /// Runs `iterations` passes and reads back the result.
    pub fn smooth(&mut self, iterations: u32) -> SmoothResult<SmoothingOutcome> {
        self.smooth_with(iterations, |_| {})
    }

    /// Like [`smooth`](Self::smooth), calling `on_iteration` after every
    /// completed pass.
    ///
    /// Zero iterations, or a mesh with no vertices, issues no dispatch.
    pub fn smooth_with<F>(&mut self, iterations: u32, mut on_iteration: F) -> SmoothResult<SmoothingOutcome>
    where
        F: FnMut(&SmoothingState),
    {
        let start_dispatches = self.state().dispatches;

        if self.buffers.vertex_count() == 0 {
            tracing::debug!(iterations, "empty mesh; skipping dispatch");
        } else {
            for _ in 0..iterations {
                self.step()?;
                on_iteration(self.state());
            }
        }

        let state = *self.state();
        let authoritative = state.authoritative();
        if state.last_written.is_some() && state.parity.source() != authoritative {
            return Err(SmoothError::ParityViolation(format!(
                "Next source {} differs from last written {}",
                state.parity.source(),
                authoritative
            )));
        }

        let positions = self.buffers.read_positions(authoritative)?;
        let dispatches = state.dispatches - start_dispatches;
        tracing::info!(
            iterations,
            dispatches,
            authoritative = authoritative.name(),
            "smoothing finished"
        );

        Ok(SmoothingOutcome {
            positions,
            final_parity: state.parity,
            authoritative,
            dispatches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_flips_between_regions() {
        let p = Parity::ASource;
        assert_eq!(p.source(), BufferSlot::PositionsA);
        assert_eq!(p.destination(), BufferSlot::PositionsB);
        assert_eq!(p.flipped().source(), BufferSlot::PositionsB);
        assert_eq!(p.flipped().flipped(), p);
    }

    #[test]
    fn fresh_state_points_at_a() {
        let state = SmoothingState::default();
        assert_eq!(state.authoritative(), BufferSlot::PositionsA);
        assert_eq!(state.dispatches, 0);
    }
}
