//! JSON encoding, decoding and message framing
//!
//! The protocol has no length prefix and no delimiter. A message ends exactly
//! where the bytes received so far first parse as a complete JSON document.
//! `FrameAssembler` implements that rule for a single connection; the
//! `encode_*`/`decode_*` functions convert between wire bytes and the types in
//! [`crate::types`].
//!
//! # Single outstanding message
//!
//! Two JSON documents written back to back never form one valid document, so
//! the assembler keeps buffering and reports `Incomplete` until the framing
//! window overflows. Peers must therefore wait for the response before sending
//! the next request. What happens when they don't is deliberately left
//! undefined.
//!
//! Bytes that can never become a document, such as a syntax error or invalid
//! UTF-8 in the first document, fail immediately instead of waiting for the
//! window.
//!
//! # Examples
//!
//! ```rust
//! use hostlink_core::{codec, Response};
//! use serde_json::json;
//!
//! let bytes = codec::encode_response(&Response::success(json!([1, 2, 3]))).unwrap();
//! let decoded = codec::decode_response(&bytes).unwrap();
//! assert_eq!(decoded, Response::success(json!([1, 2, 3])));
//! ```

use crate::error::{Error, Result};
use crate::types::{Request, Response};
use serde::Serialize;
use serde_json::Value;

/// Default framing window: 16 MiB of unparsed bytes
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encode any serializable value as one compact JSON document
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).map_err(|e| Error::Serialization(e.to_string()))
}

pub fn encode_request(req: &Request) -> Result<Vec<u8>> {
    encode(req)
}

pub fn encode_response(resp: &Response) -> Result<Vec<u8>> {
    encode(resp)
}

/// Interpret an already-parsed document as a request
///
/// # Errors
///
/// Returns `Error::Protocol` when the document is not an object with a string
/// `type` and an object `params` (if present).
pub fn decode_request(value: Value) -> Result<Request> {
    serde_json::from_value(value).map_err(|e| Error::Protocol(format!("Malformed request: {}", e)))
}

/// Parse wire bytes as a response document
///
/// Bytes that are not JSON at all are reported as `IncompleteResponse`, which
/// is what a truncated stream looks like from the client's side. Valid JSON of
/// the wrong shape is a `Protocol` error.
pub fn decode_response(data: &[u8]) -> Result<Response> {
    let value: Value = serde_json::from_slice(data).map_err(|_| Error::IncompleteResponse)?;
    decode_response_value(value)
}

/// Interpret an already-parsed document as a response
pub fn decode_response_value(value: Value) -> Result<Response> {
    serde_json::from_value(value).map_err(|e| Error::Protocol(format!("Malformed response: {}", e)))
}

/// Outcome of feeding bytes into a [`FrameAssembler`]
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// The buffer parsed as a complete document; the buffer is now empty
    Message(Value),
    /// Not a complete document yet; the bytes stay buffered
    Incomplete,
}

/// Accumulates bytes until they form one complete JSON document
///
/// Owned by exactly one connection. The buffer only grows between resets and
/// is cleared when a message completes or when the owner calls [`reset`].
///
/// [`reset`]: FrameAssembler::reset
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    max_frame_len: usize,
}

impl FrameAssembler {
    /// Create an assembler with the default framing window
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Create an assembler that gives up after `max_frame_len` unparsed bytes
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_len,
        }
    }

    /// Append `bytes` and try to parse the whole buffer
    ///
    /// # Errors
    ///
    /// Returns `Error::Framing` when the first document in the buffer is
    /// malformed, or once the buffer exceeds the framing window without
    /// parsing. The buffer is cleared in both cases.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Frame> {
        self.buffer.extend_from_slice(bytes);

        let mut documents = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
        match documents.next() {
            Some(Ok(value)) if is_json_whitespace(&self.buffer[documents.byte_offset()..]) => {
                self.buffer.clear();
                Ok(Frame::Message(value))
            }
            Some(Err(e)) if !e.is_eof() => {
                self.buffer.clear();
                Err(Error::Framing(format!("Malformed JSON: {}", e)))
            }
            // A partial document, or a complete one followed by more bytes.
            _ if self.buffer.len() > self.max_frame_len => {
                let buffered = self.buffer.len();
                self.buffer.clear();
                Err(Error::Framing(format!(
                    "{} bytes buffered without a complete JSON document (limit {})",
                    buffered, self.max_frame_len
                )))
            }
            _ => Ok(Frame::Incomplete),
        }
    }

    /// Drop any partially received message
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn is_json_whitespace(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| matches!(b, b' ' | b'\n' | b'\r' | b'\t'))
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
