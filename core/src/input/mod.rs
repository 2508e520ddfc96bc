//! Subchannel input adapters: file, UDP and TCP readers that each supply
//! one logical frame of `size_cu*8` octets per tick.

pub mod file;
pub mod tcp;
pub mod udp;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Idle,
    Active,
    Stalled,
    Closed,
}

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("reader for subchannel {subchid} underran: no data available this tick")]
    Underrun { subchid: u8 },
    #[error("reader for subchannel {subchid} faulted: {source}")]
    Fault {
        subchid: u8,
        #[source]
        source: std::io::Error,
    },
}

/// A source of one subchannel's logical frames, one per tick.
///
/// Implementations never block past the current tick: `read_logical_frame`
/// returns `Ok(None)` (an underrun, not an error) when no complete frame is
/// available yet, leaving the caller free to zero-fill the MSC slot and
/// keep the schedule.
#[async_trait]
pub trait SubchannelReader: Send {
    fn subchid(&self) -> u8;
    fn state(&self) -> ReaderState;
    async fn open(&mut self) -> Result<(), ReaderError>;
    async fn read_logical_frame(&mut self, frame_len: usize) -> Result<Option<Vec<u8>>, ReaderError>;
    async fn close(&mut self);
}
