// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Newline framing for wire messages
//!
//! Both sides of the link read whole lines before decoding. TCP gives no
//! message boundaries, so a single response may arrive across several reads
//! and one read may hold the tail of a message plus the head of the next;
//! [`read_frame`] handles the reassembly through the buffered reader.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::{oversized_line_error, MAX_LINE_BYTES};

/// Read one `\n`-terminated message from the peer.
///
/// Returns `Ok(None)` on a clean EOF between messages. EOF in the middle of
/// a message, a line longer than [`MAX_LINE_BYTES`] and non-UTF-8 bytes are
/// all transport errors: the connection is no longer trustworthy and the
/// caller must tear it down.
///
/// The returned line does not include the trailing `\n`.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::new();

    loop {
        let (consumed, terminated) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                if buf.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed in the middle of a message",
                ));
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    buf.extend_from_slice(&available[..pos]);
                    (pos + 1, true)
                }
                None => {
                    buf.extend_from_slice(available);
                    (available.len(), false)
                }
            }
        };
        reader.consume(consumed);

        if buf.len() > MAX_LINE_BYTES {
            return Err(oversized_line_error());
        }
        if terminated {
            let line = String::from_utf8(buf).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "message is not valid UTF-8")
            })?;
            return Ok(Some(line));
        }
    }
}
