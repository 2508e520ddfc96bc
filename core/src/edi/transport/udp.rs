//! UDP EDI sink: one datagram per PFT fragment, TTL scaled to
//! destination scope as the spec requires (unicast=1,
//! organizational-multicast>=2).

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

use super::SinkError;

pub struct UdpSink {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpSink {
    pub async fn connect(destination: SocketAddr, ttl: u32) -> std::io::Result<Self> {
        let bind_addr: SocketAddr = if destination.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_ttl(ttl)?;

        if let SocketAddr::V4(v4) = destination {
            if is_multicast(*v4.ip()) {
                socket.set_multicast_ttl_v4(ttl)?;
            }
        }

        Ok(Self { socket, destination })
    }

    pub async fn send_fragment(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.socket.send_to(bytes, self.destination).await?;
        Ok(())
    }
}

fn is_multicast(addr: Ipv4Addr) -> bool {
    addr.octets()[0] & 0xF0 == 0xE0
}

#[async_trait::async_trait]
impl super::EdiSink for UdpSink {
    async fn send_fragment(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        UdpSink::send_fragment(self, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_organizational_multicast_range() {
        assert!(is_multicast(Ipv4Addr::new(239, 1, 1, 1)));
        assert!(!is_multicast(Ipv4Addr::new(10, 0, 0, 1)));
    }
}
