//! EDI transport sinks: delivery of PFT fragments onto the wire. UDP is
//! the plain, connectionless path; TCP mirrors the broadcast-with-slow
//! client-eviction pattern the teacher's frame-forwarder uses for its
//! WebSocket fan-out, adapted to a raw length-prefixed TCP stream.

pub mod tcp;
pub mod udp;

use thiserror::Error;

pub use tcp::TcpSink;
pub use udp::UdpSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("edi sink io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A destination for assembled PFT fragments (or, for transports that
/// carry the whole AF packet in-band, unfragmented AF packets).
#[async_trait::async_trait]
pub trait EdiSink: Send {
    async fn send_fragment(&mut self, bytes: &[u8]) -> Result<(), SinkError>;
}
