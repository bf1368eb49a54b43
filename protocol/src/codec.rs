//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::consts::{MAX_LINE_LENGTH, SWITCH_VERB};
use crate::{CodecError, ConsoleService};
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// A frame written by a client to the core console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Switch the connection to a dedicated service (`qemu <service>`)
    Switch(ConsoleService),
    /// A plain console command line, for instance `help` or `kill`
    Line(String),
}

impl fmt::Display for ConsoleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleCommand::Switch(service) => write!(f, "{} {}", SWITCH_VERB, service),
            ConsoleCommand::Line(line) => f.write_str(line),
        }
    }
}

/// Line codec for the core console.
///
/// Decodes `\r\n` (or bare `\n`) terminated lines into `String`s without the
/// terminator and encodes [`ConsoleCommand`]s as `\r\n` terminated lines.
/// Lines longer than the configured limit are reported as
/// [`CodecError::LineTooLong`] instead of buffering without bound.
///
/// Once a connection has been switched to a raw service the codec should be
/// dropped; any bytes it already buffered are handed over with
/// `Framed::into_parts`.
#[derive(Debug, Clone)]
pub struct ConsoleCodec {
    max_line_length: usize,
    next_index: usize,
}

impl Default for ConsoleCodec {
    fn default() -> Self {
        Self {
            max_line_length: MAX_LINE_LENGTH,
            next_index: 0,
        }
    }
}

impl ConsoleCodec {
    /// Creates a codec with the default line limit.
    pub fn new() -> ConsoleCodec {
        ConsoleCodec::default()
    }

    /// Creates a codec that rejects lines longer than `max_line_length` bytes.
    pub fn with_max_line_length(max_line_length: usize) -> ConsoleCodec {
        ConsoleCodec {
            max_line_length,
            next_index: 0,
        }
    }

    /// Maximum accepted line length in bytes
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn take_line(&mut self, src: &mut BytesMut, len: usize) -> Result<String, CodecError> {
        let mut line = src.split_to(len);
        if src.has_remaining() && src[0] == b'\n' {
            src.advance(1);
        }
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        self.next_index = 0;
        let line = String::from_utf8(line.to_vec()).map_err(|_| CodecError::InvalidUtf8)?;
        trace!(line = %line, "Console line decoded");
        Ok(line)
    }
}

impl Decoder for ConsoleCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        let scan_end = src.len().min(self.max_line_length + 2);
        let newline = src[self.next_index.min(scan_end)..scan_end]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(index) => {
                let line = self.take_line(src, index)?;
                if line.len() > self.max_line_length {
                    return Err(CodecError::LineTooLong {
                        limit: self.max_line_length,
                    });
                }
                Ok(Some(line))
            }
            None if src.len() > self.max_line_length + 1 => Err(CodecError::LineTooLong {
                limit: self.max_line_length,
            }),
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => {
                let len = src.len();
                self.take_line(src, len).map(Some)
            }
        }
    }
}

impl Encoder<ConsoleCommand> for ConsoleCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ConsoleCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.to_string();
        self.encode(line.as_str(), dst)
    }
}

impl Encoder<&str> for ConsoleCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let item = item.trim_end_matches(['\r', '\n']);
        if item.len() > self.max_line_length {
            return Err(CodecError::LineTooLong {
                limit: self.max_line_length,
            });
        }
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
