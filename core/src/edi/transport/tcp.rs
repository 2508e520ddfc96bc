//! TCP EDI sink, server mode: accepts any number of concurrent clients
//! and broadcasts every PFT fragment to all of them, each framed with a
//! 16-bit big-endian length prefix. A client whose write doesn't drain
//! before the next frame deadline is dropped rather than allowed to
//! stall the whole mux, mirroring the `retain_mut`-based client eviction
//! the teacher's frame-forwarder uses for its WebSocket fan-out
//! (`frame-forwarder/src/main.rs::start_ws_server`).

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use super::SinkError;

const CLIENT_WRITE_TIMEOUT: Duration = Duration::from_millis(24);

pub struct TcpSink {
    clients: Arc<Mutex<Vec<TcpStream>>>,
}

impl TcpSink {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let clients: Arc<Mutex<Vec<TcpStream>>> = Arc::new(Mutex::new(Vec::new()));
        let accept_clients = Arc::clone(&clients);

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        info!("edi tcp sink: client connected ({peer})");
                        accept_clients.lock().await.push(stream);
                    }
                    Err(e) => {
                        warn!("edi tcp sink: accept error: {e}");
                    }
                }
            }
        });

        Ok(Self { clients })
    }

    pub async fn send_fragment(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let mut framed = Vec::with_capacity(2 + bytes.len());
        framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        framed.extend_from_slice(bytes);

        let mut clients = self.clients.lock().await;
        let mut keep = Vec::with_capacity(clients.len());
        for mut client in clients.drain(..) {
            let write = tokio::time::timeout(CLIENT_WRITE_TIMEOUT, client.write_all(&framed));
            match write.await {
                Ok(Ok(())) => keep.push(client),
                Ok(Err(e)) => warn!("edi tcp sink: dropping client after write error: {e}"),
                Err(_) => warn!("edi tcp sink: dropping client that missed the frame deadline"),
            }
        }
        *clients = keep;
        Ok(())
    }
}

#[async_trait::async_trait]
impl super::EdiSink for TcpSink {
    async fn send_fragment(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        TcpSink::send_fragment(self, bytes).await
    }
}
