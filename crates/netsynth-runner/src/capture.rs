//! Bounded capture of subprocess output streams.
//!
//! Streams are read incrementally in fixed-size chunks. Each stream keeps at
//! most `cap` bytes, discarding the oldest bytes first: diagnostics from
//! synthesis tools are at the end of the log, so the tail is what matters.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;

const CHUNK_SIZE: usize = 8 * 1024;

/// The retained tail of one output stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedStream {
    /// Retained bytes (the last `cap` bytes written).
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Total bytes the process wrote to the stream.
    pub total_bytes: u64,
    /// `true` if older bytes were discarded.
    pub truncated: bool,
}

impl CapturedStream {
    /// Retained bytes decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// The last `max_chars` characters of the retained text, and whether
    /// anything was cut (here or during capture).
    pub fn tail(&self, max_chars: usize) -> (String, bool) {
        let text = self.text();
        let count = text.chars().count();
        if count <= max_chars {
            return (text, self.truncated);
        }
        let tail: String = text.chars().skip(count - max_chars).collect();
        (tail, true)
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }
}

/// stdout and stderr of one tool run plus its wall-clock duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
    pub elapsed: Duration,
}

/// Ring buffer that keeps the most recent `cap` bytes.
#[derive(Debug)]
pub struct TailBuffer {
    cap: usize,
    buf: VecDeque<u8>,
    total: u64,
    cut_short: bool,
}

impl TailBuffer {
    pub fn new(cap: usize) -> Self {
        TailBuffer {
            cap,
            buf: VecDeque::with_capacity(cap.min(CHUNK_SIZE * 4)),
            total: 0,
            cut_short: false,
        }
    }

    /// Marks the stream as ended before EOF.
    pub fn cut_short(&mut self) {
        self.cut_short = true;
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.total += chunk.len() as u64;
        let chunk = if chunk.len() > self.cap {
            &chunk[chunk.len() - self.cap..]
        } else {
            chunk
        };
        let overflow = (self.buf.len() + chunk.len()).saturating_sub(self.cap);
        self.buf.drain(..overflow);
        self.buf.extend(chunk);
    }

    pub fn finish(self) -> CapturedStream {
        let truncated = self.cut_short || self.total > self.buf.len() as u64;
        CapturedStream {
            bytes: self.buf.into_iter().collect(),
            total_bytes: self.total,
            truncated,
        }
    }
}

/// Reads `reader` to EOF, keeping at most `cap` bytes.
///
/// Read errors end the capture early; whatever was read so far is kept. A
/// signal on `stop` (or dropping its sender) ends the capture too, with the
/// retained bytes intact and the stream marked truncated.
pub async fn drain<R>(reader: Option<R>, cap: usize, mut stop: oneshot::Receiver<()>) -> CapturedStream
where
    R: AsyncRead + Unpin,
{
    let mut tail = TailBuffer::new(cap);
    let Some(mut reader) = reader else {
        return tail.finish();
    };

    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        tokio::select! {
            read = reader.read(&mut chunk) => match read {
                Ok(0) => break,
                Ok(n) => tail.push(&chunk[..n]),
                Err(err) => {
                    tracing::debug!(error = %err, "stream capture stopped");
                    break;
                }
            },
            _ = &mut stop => {
                tracing::debug!(bytes = tail.total, "stream capture cut off before EOF");
                tail.cut_short();
                break;
            }
        }
    }
    tail.finish()
}
