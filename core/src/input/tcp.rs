//! Reads a subchannel's logical frames from a TCP byte stream (client
//! mode), reconnecting with bounded exponential backoff if the peer
//! drops the connection. Grounded in the teacher crate's `try_read` /
//! `Interest::READABLE` polling loop (`cli/src/main.rs`).

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::Interest;
use tokio::net::TcpStream;

use super::{ReaderError, ReaderState, SubchannelReader};

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

pub struct TcpReader {
    subchid: u8,
    addr: SocketAddr,
    stream: Option<TcpStream>,
    state: ReaderState,
    backoff: Duration,
    next_attempt: Option<Instant>,
    /// Buffer for the logical frame in progress, carried across ticks so
    /// a `WouldBlock` mid-frame never loses already-read bytes.
    pending: Vec<u8>,
    /// Octets of `pending` already filled.
    filled: usize,
}

impl TcpReader {
    pub fn new(subchid: u8, addr: SocketAddr) -> Self {
        Self {
            subchid,
            addr,
            stream: None,
            state: ReaderState::Idle,
            backoff: INITIAL_BACKOFF,
            next_attempt: None,
            pending: Vec::new(),
            filled: 0,
        }
    }

    async fn try_reconnect(&mut self) {
        if let Some(next) = self.next_attempt {
            if Instant::now() < next {
                return;
            }
        }
        match TcpStream::connect(self.addr).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = ReaderState::Active;
                self.backoff = INITIAL_BACKOFF;
                self.next_attempt = None;
            }
            Err(_) => {
                self.next_attempt = Some(Instant::now() + self.backoff);
                self.backoff = (self.backoff * 2).min(MAX_BACKOFF);
                self.state = ReaderState::Stalled;
            }
        }
    }
}

#[async_trait]
impl SubchannelReader for TcpReader {
    fn subchid(&self) -> u8 {
        self.subchid
    }

    fn state(&self) -> ReaderState {
        self.state
    }

    async fn open(&mut self) -> Result<(), ReaderError> {
        self.try_reconnect().await;
        Ok(())
    }

    async fn read_logical_frame(&mut self, frame_len: usize) -> Result<Option<Vec<u8>>, ReaderError> {
        if self.stream.is_none() {
            self.try_reconnect().await;
        }

        let Some(stream) = self.stream.as_ref() else {
            return Ok(None);
        };

        let ready = match stream.ready(Interest::READABLE).await {
            Ok(ready) => ready,
            Err(source) => {
                self.stream = None;
                return Err(ReaderError::Fault {
                    subchid: self.subchid,
                    source,
                });
            }
        };
        if !ready.is_readable() {
            return Ok(None);
        }

        if self.pending.len() != frame_len {
            self.pending = vec![0u8; frame_len];
            self.filled = 0;
        }

        loop {
            match stream.try_read(&mut self.pending[self.filled..]) {
                Ok(0) => {
                    self.stream = None;
                    self.state = ReaderState::Stalled;
                    self.pending.clear();
                    self.filled = 0;
                    return Ok(None);
                }
                Ok(n) => {
                    self.filled += n;
                    if self.filled == frame_len {
                        self.filled = 0;
                        let frame = std::mem::replace(&mut self.pending, vec![0u8; frame_len]);
                        return Ok(Some(frame));
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    // Partial frame this tick; bytes already read stay in
                    // `pending` for the next call.
                    return Ok(None);
                }
                Err(source) => {
                    self.stream = None;
                    return Err(ReaderError::Fault {
                        subchid: self.subchid,
                        source,
                    });
                }
            }
        }
    }

    async fn close(&mut self) {
        self.stream = None;
        self.pending.clear();
        self.filled = 0;
        self.state = ReaderState::Closed;
    }
}
