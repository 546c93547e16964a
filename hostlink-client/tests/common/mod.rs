//! Common test utilities for hostlink-client integration tests
//!
//! `MockHost` stands in for a real polling server. It parses each request the
//! same way the host does (the buffered bytes form one JSON document) and
//! answers with a scripted `Reply`, which lets tests produce the transport
//! faults a real host only shows under failure.

#![allow(dead_code)]

use hostlink_core::BridgeConfig;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the mock host does with one parsed request
pub enum Reply {
    /// Write the document in one piece
    Json(Value),
    /// Write these pieces with a short pause between them
    Chunks(Vec<Vec<u8>>),
    /// Write these bytes, then close the connection
    Partial(Vec<u8>),
    /// Write these bytes, then keep the connection open without answering
    Stall(Vec<u8>),
    /// Close the connection without writing
    Close,
    /// Keep the connection open and never answer
    Silent,
}

pub fn success(result: Value) -> Reply {
    Reply::Json(json!({"status": "success", "result": result}))
}

pub fn error(message: &str) -> Reply {
    Reply::Json(json!({"status": "error", "message": message}))
}

/// Scripted single-process host
///
/// The handler receives the zero-based index of the connection the request
/// arrived on and the request document.
pub struct MockHost {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: mpsc::UnboundedReceiver<Value>,
    task: JoinHandle<()>,
}

impl MockHost {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(usize, &Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let (request_tx, requests) = mpsc::unbounded_channel();
        let handler = Arc::new(handler);

        let accepted = Arc::clone(&connections);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = accepted.fetch_add(1, Ordering::SeqCst);
                let handler = Arc::clone(&handler);
                let request_tx = request_tx.clone();
                tokio::spawn(serve(stream, index, handler, request_tx));
            }
        });

        Self {
            addr,
            connections,
            requests,
            task,
        }
    }

    /// Host that answers every request with `result`
    pub async fn answering(result: Value) -> Self {
        Self::start(move |_, _| success(result.clone())).await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bridge settings pointing at this host, with a short response timeout
    pub fn config(&self) -> BridgeConfig {
        BridgeConfig::new("127.0.0.1", self.addr.port()).with_response_timeout(Duration::from_millis(500))
    }

    /// Number of connections accepted so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next request the host parsed, or None after 5 seconds
    pub async fn next_request(&mut self) -> Option<Value> {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .ok()
            .flatten()
    }

    /// Requests parsed so far and not yet taken
    pub fn drain_requests(&mut self) -> Vec<Value> {
        let mut drained = Vec::new();
        while let Ok(request) = self.requests.try_recv() {
            drained.push(request);
        }
        drained
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve<F>(
    mut stream: TcpStream,
    index: usize,
    handler: Arc<F>,
    request_tx: mpsc::UnboundedSender<Value>,
) where
    F: Fn(usize, &Value) -> Reply + Send + Sync + 'static,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);

        let request: Value = match serde_json::from_slice(&buffer) {
            Ok(value) => value,
            Err(_) => continue,
        };
        buffer.clear();
        let _ = request_tx.send(request.clone());

        match handler(index, &request) {
            Reply::Json(value) => {
                let bytes = serde_json::to_vec(&value).unwrap();
                if stream.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Reply::Chunks(pieces) => {
                for piece in pieces {
                    if stream.write_all(&piece).await.is_err() {
                        return;
                    }
                    let _ = stream.flush().await;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            }
            Reply::Partial(bytes) => {
                let _ = stream.write_all(&bytes).await;
                return;
            }
            Reply::Stall(bytes) => {
                if stream.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Reply::Close => return,
            Reply::Silent => {}
        }
    }
}

/// Split `bytes` into `parts` roughly equal pieces
pub fn split_bytes(bytes: &[u8], parts: usize) -> Vec<Vec<u8>> {
    let size = bytes.len().div_ceil(parts).max(1);
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_bytes() {
        let pieces = split_bytes(b"abcdefg", 3);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces.concat(), b"abcdefg".to_vec());
    }

    #[tokio::test]
    async fn test_mock_host_starts() {
        let host = MockHost::answering(json!(null)).await;
        assert_eq!(host.connections(), 0);
        assert_ne!(host.addr().port(), 0);
    }
}
