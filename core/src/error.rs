//! Top-level error taxonomy. Matches the teacher crate's flat,
//! `thiserror`-derived enum style (`FrameDecodeError`, `TagError`) but
//! groups by failure mode rather than by decoder, since the propagation
//! policy (fatal vs. logged-and-recovered) is keyed on that axis.

use thiserror::Error;

use crate::allocator::AllocationError;
use crate::model::ConfigError;

/// Raised during validation, before the scheduler starts. Fatal.
#[derive(Debug, Error)]
pub enum InvalidConfiguration {
    #[error(transparent)]
    Ensemble(#[from] ConfigError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// A condition that should have been impossible given a validated
/// configuration, e.g. the assembler being asked to write past the end
/// of the MST buffer. Terminates the run; no attempt at repair.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("subchannel {subchid}: write of {len} bytes at offset {offset} exceeds MST length {mst_len}")]
    MscOverrun {
        subchid: u8,
        offset: usize,
        len: usize,
        mst_len: usize,
    },
    #[error("fic byte length {got} does not match mode's expected {expected}")]
    FicLengthMismatch { got: usize, expected: usize },
}

/// The scheduler's top-level error: only [`InvalidConfiguration`] (at
/// startup) and [`InvariantViolation`] (at runtime) ever stop it.
/// Underrun, reader faults and sink faults are logged and accumulated
/// in [`crate::stats::MuxStats`] instead of being propagated here.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error(transparent)]
    InvalidConfiguration(#[from] InvalidConfiguration),
    #[error(transparent)]
    InvariantViolation(#[from] InvariantViolation),
}
