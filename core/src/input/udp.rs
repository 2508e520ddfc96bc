//! Reads a subchannel's logical frames from UDP datagrams, one datagram
//! per frame. Supports joining a multicast group. A tick with no datagram
//! waiting is an underrun, not a fault: live UDP feeds are expected to
//! glitch occasionally.

use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::{ReaderError, ReaderState, SubchannelReader};

pub struct UdpReader {
    subchid: u8,
    bind_addr: SocketAddr,
    multicast_group: Option<Ipv4Addr>,
    socket: Option<UdpSocket>,
    state: ReaderState,
}

impl UdpReader {
    pub fn new(subchid: u8, bind_addr: SocketAddr) -> Self {
        Self {
            subchid,
            bind_addr,
            multicast_group: None,
            socket: None,
            state: ReaderState::Idle,
        }
    }

    pub fn with_multicast_group(mut self, group: Ipv4Addr) -> Self {
        self.multicast_group = Some(group);
        self
    }
}

#[async_trait]
impl SubchannelReader for UdpReader {
    fn subchid(&self) -> u8 {
        self.subchid
    }

    fn state(&self) -> ReaderState {
        self.state
    }

    async fn open(&mut self) -> Result<(), ReaderError> {
        let socket =
            UdpSocket::bind(self.bind_addr)
                .await
                .map_err(|source| ReaderError::Fault {
                    subchid: self.subchid,
                    source,
                })?;

        if let Some(group) = self.multicast_group {
            socket
                .join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
                .map_err(|source| ReaderError::Fault {
                    subchid: self.subchid,
                    source,
                })?;
        }

        self.socket = Some(socket);
        self.state = ReaderState::Active;
        Ok(())
    }

    async fn read_logical_frame(&mut self, frame_len: usize) -> Result<Option<Vec<u8>>, ReaderError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(ReaderError::Underrun {
                subchid: self.subchid,
            });
        };

        let mut buf = vec![0u8; frame_len];
        match socket.try_recv(&mut buf) {
            Ok(n) if n == frame_len => {
                self.state = ReaderState::Active;
                Ok(Some(buf))
            }
            Ok(_) => {
                // Short datagram: treat as an underrun rather than a
                // partial, mis-aligned frame.
                self.state = ReaderState::Stalled;
                Ok(None)
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                self.state = ReaderState::Stalled;
                Ok(None)
            }
            Err(source) => Err(ReaderError::Fault {
                subchid: self.subchid,
                source,
            }),
        }
    }

    async fn close(&mut self) {
        self.socket = None;
        self.state = ReaderState::Closed;
    }
}

