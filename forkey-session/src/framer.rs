/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Streaming line framer for the read path.

use bytes::BytesMut;
use forkey_transport::codec::{CodecError, LineCodec};
use tokio_util::codec::Decoder;

/// Accumulates received bytes and splits them into non-empty lines.
///
/// Partial lines stay buffered until a later read completes them. Empty lines
/// are dropped.
#[derive(Debug)]
pub struct ReadFramer {
    buffer: BytesMut,
    codec: LineCodec,
}

impl ReadFramer {
    /// Creates a framer rejecting lines longer than `max_line_length`.
    #[must_use]
    pub fn new(max_line_length: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            codec: LineCodec::new().with_max_line_length(max_line_length),
        }
    }

    /// Appends `data` and returns every complete, non-empty line in order.
    ///
    /// # Errors
    /// Returns `CodecError::LineTooLong` if the buffered partial line grows
    /// past the limit.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<String>, CodecError> {
        self.buffer.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(frame) = self.codec.decode(&mut self.buffer)? {
            if frame.is_empty() {
                continue;
            }
            lines.push(String::from_utf8_lossy(&frame).into_owned());
        }
        Ok(lines)
    }

    /// Returns the number of buffered bytes not yet delivered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
