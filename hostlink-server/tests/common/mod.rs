//! Common test utilities for hostlink-server integration tests
//!
//! The polling server is not `Send`, so `TestHost` builds it inside a
//! dedicated thread and drives it there with `run_blocking`, the same way a
//! host application would drive it from its own timer.

#![allow(dead_code)]

use hostlink_client::ConnectionManager;
use hostlink_core::BridgeConfig;
use hostlink_server::{run_blocking, PollingServer, ServerBuilder, StopHandle};
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Polling server running on its own thread
pub struct TestHost {
    addr: SocketAddr,
    stop: StopHandle,
    thread: Option<JoinHandle<()>>,
}

impl TestHost {
    /// Build a server on a fresh thread, bound to an ephemeral port
    ///
    /// `configure` receives a builder already bound to 127.0.0.1:0 with a
    /// 5 ms poll interval and registers whatever the test needs.
    pub fn spawn<F>(configure: F) -> Self
    where
        F: FnOnce(ServerBuilder) -> ServerBuilder + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        let thread = std::thread::spawn(move || {
            let builder = PollingServer::builder()
                .bind_str("127.0.0.1:0")
                .unwrap()
                .poll_interval(Duration::from_millis(5));
            let mut server = configure(builder).build().unwrap();

            tx.send((server.local_addr(), server.stop_handle())).unwrap();
            run_blocking(&mut server);
        });

        let (addr, stop) = rx.recv_timeout(Duration::from_secs(5)).unwrap();

        Self {
            addr,
            stop,
            thread: Some(thread),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> BridgeConfig {
        BridgeConfig::new("127.0.0.1", self.addr.port()).with_response_timeout(Duration::from_secs(5))
    }

    /// A fresh, disconnected client for this host
    pub fn client(&self) -> ConnectionManager {
        ConnectionManager::new(self.config())
    }

    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

impl Drop for TestHost {
    fn drop(&mut self) {
        self.stop.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Raw TCP peer for cases the real client never produces
pub struct RawPeer {
    stream: TcpStream,
}

impl RawPeer {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        Self { stream }
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
        self.stream.flush().unwrap();
    }

    /// Read until the bytes form one JSON document, or the peer closes
    ///
    /// Returns `None` when the host closed the connection without answering.
    pub fn receive(&mut self) -> Option<Value> {
        match self.receive_within(Duration::from_secs(5)) {
            Received::Document(value) => Some(value),
            Received::Closed => None,
            Received::Nothing => panic!("host neither answered nor closed"),
        }
    }

    /// Like `receive`, but give up quietly once `wait` has passed
    pub fn receive_within(&mut self, wait: Duration) -> Received {
        let deadline = Instant::now() + wait;
        let mut received = Vec::new();
        let mut chunk = [0u8; 1024];

        while Instant::now() < deadline {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Received::Closed,
                Ok(n) => {
                    received.extend_from_slice(&chunk[..n]);
                    if let Ok(value) = serde_json::from_slice(&received) {
                        return Received::Document(value);
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(_) => return Received::Closed,
            }
        }
        Received::Nothing
    }
}

/// What a raw peer saw within its wait
#[derive(Debug, PartialEq)]
pub enum Received {
    Document(Value),
    Closed,
    Nothing,
}
