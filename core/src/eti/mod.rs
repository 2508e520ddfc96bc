//! ETI (Ensemble Transport Interface) frame assembly: FC/STC composition,
//! EOH/EOF CRCs, TIST timestamping and FCT sequencing.

pub mod frame;

pub use frame::{assemble_frame, EtiFrame, FrameCounter};
