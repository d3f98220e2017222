//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use uwsgi_gateway::config::{GatewayConfig, StaticMapConfig};
use uwsgi_gateway::protocol::{encode_dict, encode_frame, FrameHeader, HEADER_SIZE};

/// Reads one complete frame from `sock`.
pub async fn read_frame(sock: &mut TcpStream) -> std::io::Result<(FrameHeader, Vec<u8>)> {
    let mut head = [0u8; HEADER_SIZE];
    sock.read_exact(&mut head).await?;
    let header = FrameHeader::decode(&head).map_err(std::io::Error::other)?;
    let mut payload = vec![0u8; header.payload_len as usize];
    sock.read_exact(&mut payload).await?;
    Ok((header, payload))
}

/// Start a mock uwsgi peer answering every frame with `respond(header, payload)`.
pub async fn start_mock_peer<F, Fut>(respond: F) -> SocketAddr
where
    F: Fn(FrameHeader, Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Vec<u8>>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = std::sync::Arc::new(respond);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        let Ok((header, payload)) = read_frame(&mut socket).await else {
                            return;
                        };
                        if let Some(reply) = respond(header, payload).await {
                            let _ = socket.write_all(&reply).await;
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a peer that answers pings with an empty ping frame.
pub async fn start_ping_responder() -> SocketAddr {
    start_mock_peer(|header, _| async move {
        Some(encode_frame(header.modifier1, 0, &[]).unwrap())
    })
    .await
}

/// Start a peer that accepts connections and never answers.
pub async fn start_silent_peer() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Encodes request variables as a frame payload.
pub fn payload(pairs: &[(&str, &str)]) -> Vec<u8> {
    encode_dict(pairs).unwrap()
}

/// A config with one static map per `(mountpoint, dir)`.
pub fn config_with_maps(maps: &[(&str, &Path)]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.static_files.static_maps = maps
        .iter()
        .map(|(mountpoint, dir)| StaticMapConfig {
            mountpoint: mountpoint.to_string(),
            document_root: dir.to_str().unwrap().to_string(),
        })
        .collect();
    config
}
