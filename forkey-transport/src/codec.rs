/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Tokio codec for IRC line framing.
//!
//! Inbound frames are delimited by a bare linefeed with an optional carriage
//! return stripped. Outbound lines are always terminated with CR LF.

use bytes::{BufMut, BytesMut};
use memchr::memchr;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Errors that can occur during codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A line exceeded the maximum length before its delimiter arrived.
    #[error("line too long: {size} bytes exceeds maximum {max_size}")]
    LineTooLong {
        /// Bytes buffered so far.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// Line terminator appended to outbound lines.
pub const CRLF: &[u8] = b"\r\n";

/// Tokio codec for linefeed-delimited text.
///
/// Decoding yields one frame per delimiter, including empty frames; callers
/// decide whether empty lines carry meaning. The search cursor is kept between
/// calls so bytes already scanned are not scanned again.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Maximum line length in bytes, excluding the terminator.
    max_line_length: usize,
    /// Offset into the buffer where the next delimiter search starts.
    next_index: usize,
}

impl LineCodec {
    /// Creates a new codec with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_line_length: 64 * 1024,
            next_index: 0,
        }
    }

    /// Sets the maximum line length.
    #[must_use]
    pub const fn with_max_line_length(mut self, size: usize) -> Self {
        self.max_line_length = size;
        self
    }

    /// Returns the maximum line length.
    #[must_use]
    pub const fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Appends `item` to `dst`, terminated with CRLF unless it already ends
    /// in a linefeed.
    pub fn put_line(item: &[u8], dst: &mut BytesMut) {
        dst.reserve(item.len() + CRLF.len());
        dst.put_slice(item);
        if item.last() != Some(&LF) {
            dst.put_slice(CRLF);
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = self.next_index.min(src.len());

        let Some(offset) = memchr(LF, &src[start..]) else {
            // A trailing CR may still turn out to be the terminator.
            let pending = src.len() - usize::from(src.last() == Some(&CR));
            if pending > self.max_line_length {
                return Err(CodecError::LineTooLong {
                    size: pending,
                    max_size: self.max_line_length,
                });
            }
            self.next_index = src.len();
            return Ok(None);
        };

        let delimiter = start + offset;
        self.next_index = 0;

        let mut line = src.split_to(delimiter + 1);
        line.truncate(delimiter);
        if line.last() == Some(&CR) {
            line.truncate(line.len() - 1);
        }

        if line.len() > self.max_line_length {
            return Err(CodecError::LineTooLong {
                size: line.len(),
                max_size: self.max_line_length,
            });
        }

        Ok(Some(line))
    }
}

impl Encoder<&[u8]> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        Self::put_line(item, dst);
        Ok(())
    }
}

impl Encoder<&str> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(item.as_bytes(), dst)
    }
}
