//! DAB/DAB+ ensemble multiplexer engine.
//!
//! Produces a bit-exact, on-time ETI (and optionally EDI/PFT) frame
//! stream from a statically configured [`model::Ensemble`] plus a set
//! of asynchronous subchannel input readers. See [`scheduler::Scheduler`]
//! for the entry point a host binds everything else to.

pub mod allocator;
pub mod bits;
pub mod clock;
pub mod edi;
pub mod error;
pub mod eti;
pub mod fic;
pub mod input;
pub mod model;
pub mod msc;
pub mod scheduler;
pub mod stats;

pub use error::MuxError;
pub use model::{Ensemble, EnsembleBuilder};
pub use scheduler::{Output, Scheduler};
