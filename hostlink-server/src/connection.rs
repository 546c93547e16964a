//! The server's single client connection
//!
//! A `ClientConnection` owns the accepted socket and the `FrameAssembler`
//! that buffers its bytes. Reads are non-blocking and happen at most once per
//! server step. Response writes switch the socket to blocking mode for the
//! duration of the write so a large response is always sent whole.

use hostlink_core::{codec, Error, Frame, FrameAssembler, Request, Response, Result};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// Result of one receive attempt
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// Nothing to read right now
    Idle,
    /// Bytes arrived but do not complete a message yet
    Pending,
    /// A complete, well-formed request
    Request(Request),
    /// The peer closed its end
    Closed,
}

pub(crate) struct ClientConnection {
    stream: TcpStream,
    peer: SocketAddr,
    assembler: FrameAssembler,
    chunk: Vec<u8>,
}

impl ClientConnection {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        read_chunk_size: usize,
        max_frame_len: usize,
    ) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            peer,
            assembler: FrameAssembler::with_max_frame_len(max_frame_len),
            chunk: vec![0; read_chunk_size],
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Make one non-blocking read and feed whatever arrived
    ///
    /// # Errors
    ///
    /// `Transport` for socket failures, `Framing` when the assembler gives up,
    /// and `Protocol` for a complete document that is not a request. All of
    /// them mean the connection must be dropped.
    pub fn poll_request(&mut self) -> Result<ReadOutcome> {
        let n = match self.stream.read(&mut self.chunk) {
            Ok(0) => return Ok(ReadOutcome::Closed),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(ReadOutcome::Idle),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(ReadOutcome::Idle),
            Err(e) => return Err(e.into()),
        };

        tracing::trace!(peer = %self.peer, bytes = n, "Received data");

        match self.assembler.feed(&self.chunk[..n])? {
            Frame::Incomplete => Ok(ReadOutcome::Pending),
            Frame::Message(value) => codec::decode_request(value).map(ReadOutcome::Request),
        }
    }

    /// Write a complete response
    pub fn send_response(&mut self, response: &Response) -> Result<()> {
        let bytes = codec::encode_response(response)?;

        self.stream.set_nonblocking(false)?;
        let written = self
            .stream
            .write_all(&bytes)
            .and_then(|()| self.stream.flush());
        self.stream.set_nonblocking(true)?;
        written.map_err(Error::from)?;

        tracing::trace!(peer = %self.peer, bytes = bytes.len(), "Sent response");
        Ok(())
    }

    /// Close the socket, discarding any partial message
    pub fn close(mut self) {
        self.assembler.reset();
        // The peer may already be gone; there is nothing useful to do then.
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
