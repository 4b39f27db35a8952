/*
 * facteur mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::log_channels;
use crate::receiver::AbstractIO;

const SENTINEL: &[u8] = b"\r\n.\r\n";

// how long one raw read may wait before the ceiling steps down; short so a
// sentinel split across two reads is noticed promptly
const PROBE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

/// What the DATA phase produced
#[derive(Debug, PartialEq, Eq)]
pub enum BodyOutcome {
    /// the end-of-data sentinel has been seen
    Complete {
        /// headers in the order received
        headers: Vec<(String, String)>,
        /// dot-unstuffed body, exclusive of the sentinel
        body: Vec<u8>,
    },
    /// stored bytes went over the cap; no data is kept
    SizeExceeded,
    /// the peer closed the stream mid-message
    Eof,
    /// no byte received within the idle budget
    Timeout,
}

/// Raw-read ceiling for the body phase.
///
/// Starts at 0 ("deliver whatever arrives"), climbs one step after more
/// than 2 non-empty reads and after every 5 reads from then on, and steps
/// back down on each read timeout. The 0 floor re-enables the 1 second
/// probe as the stall detector.
#[derive(Debug, Default)]
struct ChunkSizer {
    step: usize,
    reads: usize,
}

impl ChunkSizer {
    const STEPS: [usize; 5] = [0, 8192, 65_536, 262_144, 1_048_576];

    const fn ceiling(&self) -> usize {
        Self::STEPS[self.step]
    }

    fn on_data(&mut self) {
        self.reads += 1;
        let grow = if self.step == 0 {
            self.reads > 2
        } else {
            self.step + 1 < Self::STEPS.len() && self.reads >= 5
        };
        if grow {
            self.step += 1;
            self.reads = 0;
        }
    }

    fn on_timeout(&mut self) {
        if self.step > 0 {
            self.step -= 1;
            self.reads = 0;
        }
    }
}

/// Drive the DATA phase: headers in line mode, then the raw body up to the
/// `CRLF.CRLF` sentinel. Bytes following the sentinel are pushed back into
/// the framer to be parsed as the next command.
///
/// `size_max` caps headers + body together; going over it aborts without
/// keeping any data.
///
/// # Errors
///
/// * stream's error other than a timeout
pub async fn receive_body<S>(
    io: &mut AbstractIO<S>,
    size_max: usize,
    idle_timeout: std::time::Duration,
) -> std::io::Result<BodyOutcome>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    let mut headers: Vec<(String, String)> = vec![];
    let mut stored = 0_usize;
    let mut first_body_line: Option<Vec<u8>> = None;

    // headers phase, line mode
    loop {
        let line = match io.next_line(Some(idle_timeout)).await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(BodyOutcome::Eof),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(BodyOutcome::Timeout),
            Err(e) => return Err(e),
        };
        stored += line.len() + 2;
        if stored > size_max {
            return Ok(BodyOutcome::SizeExceeded);
        }

        if line == "." {
            log::trace!(target: log_channels::BODY, "empty message, {} headers", headers.len());
            return Ok(BodyOutcome::Complete {
                headers,
                body: vec![],
            });
        }
        if line.is_empty() {
            break;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            // folded continuation of the previous header
            match headers.last_mut() {
                Some((_, value)) => {
                    value.push_str(&line);
                    continue;
                }
                None => {
                    first_body_line = Some(line.into_bytes());
                    break;
                }
            }
        }

        // unstuffed before inspection, stored verbatim when it turns out to
        // be body content
        let unstuffed = line.strip_prefix('.').unwrap_or(&line);
        match unstuffed.split_once(':') {
            Some((name, value))
                if !name.is_empty()
                    && name.bytes().all(|b| b > 32 && b < 127 && b != b':') =>
            {
                headers.push((name.to_string(), value.trim().to_string()));
            }
            _ => {
                first_body_line = Some(line.into_bytes());
                break;
            }
        }
    }

    // body phase, raw mode; the two leading bytes stand for the line
    // boundary the header terminator already consumed
    let mut raw: Vec<u8> = b"\r\n".to_vec();
    if let Some(first) = first_body_line {
        raw.extend_from_slice(&first);
        raw.extend_from_slice(b"\r\n");
    }

    let mut sizer = ChunkSizer::default();
    let mut idle = std::time::Duration::ZERO;
    let mut scan_from = 0_usize;

    loop {
        if let Some(position) = find_sentinel(&raw, scan_from) {
            let trailing = raw.split_off(position + SENTINEL.len());
            if !trailing.is_empty() {
                log::trace!(
                    target: log_channels::BODY,
                    "{} pipelined bytes pushed back after the sentinel",
                    trailing.len()
                );
                io.unread(trailing);
            }
            raw.truncate(position);
            // anything at or before the virtual boundary is an empty body
            let body = if raw.len() > 2 {
                unstuff(&raw[2..])
            } else {
                vec![]
            };
            return Ok(BodyOutcome::Complete { headers, body });
        }
        scan_from = raw.len().saturating_sub(SENTINEL.len() - 1);

        match io.next_chunk(sizer.ceiling(), PROBE_TIMEOUT).await {
            Ok(Some(chunk)) => {
                idle = std::time::Duration::ZERO;
                stored += chunk.len();
                raw.extend_from_slice(&chunk);
                sizer.on_data();
                if stored > size_max {
                    return Ok(BodyOutcome::SizeExceeded);
                }
            }
            Ok(None) => return Ok(BodyOutcome::Eof),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                sizer.on_timeout();
                idle += PROBE_TIMEOUT;
                if idle >= idle_timeout {
                    return Ok(BodyOutcome::Timeout);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

fn find_sentinel(raw: &[u8], from: usize) -> Option<usize> {
    raw.get(from..)?
        .windows(SENTINEL.len())
        .position(|window| window == SENTINEL)
        .map(|i| i + from)
}

// one leading dot removed per line, the inverse of the client's stuffing
fn unstuff(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut at_line_start = true;
    let mut i = 0;
    while i < raw.len() {
        let byte = raw[i];
        if at_line_start && byte == b'.' {
            at_line_start = false;
            i += 1;
            continue;
        }
        out.push(byte);
        at_line_start = byte == b'\n';
        i += 1;
    }
    out
}
