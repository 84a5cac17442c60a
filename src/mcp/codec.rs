// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! MCP Transport Codec.
//!
//! Handles the low-level framing of JSON-RPC messages on byte streams.
//! Inbound, both newline-delimited JSON and LSP-style `Content-Length`
//! framing are accepted; the decoder yields raw frame bytes so that a frame
//! with invalid JSON can still be answered with a parse error. Outbound
//! frames are always newline-delimited.

use crate::core::constants::limits;
use crate::core::errors::McpError;
use crate::core::models::OutboundMessage;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

const CONTENT_LENGTH: &[u8] = b"content-length:";

// State machine for LSP-style headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Head,
    Body(usize),
}

pub struct McpCodec {
    state: DecodeState,
}

impl McpCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecodeState::Head,
        }
    }

    fn decode_header(&mut self, src: &mut BytesMut) -> Result<bool, McpError> {
        // Robust header parsing: scan for \r\n\r\n or \n\n
        let mut end = None;
        for i in 1..src.len() {
            if src[i] != b'\n' {
                continue;
            }
            if src[i - 1] == b'\n' || (i >= 3 && &src[i - 3..i] == b"\r\n\r") {
                end = Some(i + 1);
                break;
            }
        }

        let Some(end) = end else {
            if src.len() > limits::MAX_HEADER_BYTES {
                return Err(McpError::Parse("Header too large".into()));
            }
            return Ok(false);
        };

        let header_bytes = src.split_to(end);
        let header_str = std::str::from_utf8(&header_bytes)
            .map_err(|_| McpError::Parse("Invalid UTF-8 in headers".into()))?;

        let mut len = 0usize;
        for line in header_str.lines() {
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    len = value.trim().parse::<usize>().map_err(|_| {
                        McpError::Parse(format!("Invalid content-length value: {}", value.trim()))
                    })?;
                    debug!("Found Content-Length: {}", len);
                }
            }
        }

        if len == 0 {
            return Err(McpError::Parse(
                "Missing or invalid Content-Length header".into(),
            ));
        }
        if len as u64 > limits::MAX_MESSAGE_SIZE_BYTES {
            return Err(McpError::Parse(format!(
                "Message length {} exceeds max limit",
                len
            )));
        }

        self.state = DecodeState::Body(len);
        Ok(true)
    }

    fn decode_line(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, McpError> {
        match src.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                let mut line = src.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                Ok(Some(line.freeze()))
            }
            None => {
                if src.len() as u64 > limits::MAX_MESSAGE_SIZE_BYTES {
                    return Err(McpError::Parse(format!(
                        "Message exceeded size limit of {} bytes",
                        limits::MAX_MESSAGE_SIZE_BYTES
                    )));
                }
                Ok(None)
            }
        }
    }
}

impl Default for McpCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_blank(src: &mut BytesMut) {
    let blank = src
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    if blank > 0 {
        let _ = src.split_to(blank);
    }
}

fn starts_with_header(src: &BytesMut) -> bool {
    src.len() >= CONTENT_LENGTH.len()
        && src[..CONTENT_LENGTH.len()].eq_ignore_ascii_case(CONTENT_LENGTH)
}

impl Decoder for McpCodec {
    type Item = Bytes;
    type Error = McpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        trace!("Decoder attempting to read from {} bytes buffer", src.len());
        loop {
            match self.state {
                DecodeState::Head => {
                    skip_blank(src);
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let maybe_header = src[0].eq_ignore_ascii_case(&b'c');
                    if maybe_header && src.len() < CONTENT_LENGTH.len() && !src.contains(&b'\n')
                    {
                        return Ok(None);
                    }
                    if starts_with_header(src) {
                        if !self.decode_header(src)? {
                            return Ok(None);
                        }
                        continue;
                    }
                    return self.decode_line(src);
                }
                DecodeState::Body(len) => {
                    if src.len() < len {
                        src.reserve(len - src.len());
                        return Ok(None);
                    }
                    let body = src.split_to(len);
                    self.state = DecodeState::Head;
                    return Ok(Some(body.freeze()));
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        skip_blank(src);
        if src.is_empty() {
            return Ok(None);
        }
        match self.state {
            // Final line without a trailing newline
            DecodeState::Head if !starts_with_header(src) => {
                Ok(Some(src.split_to(src.len()).freeze()))
            }
            _ => Err(McpError::ConnectionClosed),
        }
    }
}

impl<'a> Encoder<&'a OutboundMessage> for McpCodec {
    type Error = McpError;

    fn encode(&mut self, item: &'a OutboundMessage, dst: &mut BytesMut) -> Result<(), McpError> {
        let body = serde_json::to_vec(item)?;
        dst.reserve(body.len() + 1);
        dst.extend_from_slice(&body);
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}
