// src/io/serial/lines.rs
//
// Newline-delimited text view of a serial byte stream.
//
// The reader keeps partial lines across read timeouts so a short serial
// timeout never splits a record. It performs no retries: every I/O failure is
// reported as a ConnectionFault and the supervisor decides what happens next.

use std::io::{BufRead, BufReader, ErrorKind, Read};

use crate::io::rad8::LINE_WIDTH;
use crate::io::IoError;

/// Internal buffer size of the line reader
pub const LINE_BUFFER_SIZE: usize = 1000;

/// Longest run of bytes accepted without a line terminator
pub const MAX_LINE_LENGTH: usize = 4 * LINE_WIDTH;

/// A source of trimmed, non-empty text lines.
pub trait LineSource: Send {
    /// Next complete line, `Ok(None)` if nothing arrived within the read timeout.
    fn next_line(&mut self) -> Result<Option<String>, IoError>;

    /// Name of the underlying port, for logs and errors
    fn port_name(&self) -> &str;
}

/// Line reader over any byte stream (the open serial port in production).
pub struct LineReader<R> {
    port: String,
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(port: impl Into<String>, inner: R) -> Self {
        Self {
            port: port.into(),
            reader: BufReader::with_capacity(LINE_BUFFER_SIZE, inner),
            pending: Vec::with_capacity(LINE_WIDTH + 2),
        }
    }

    fn fault(&self, message: impl std::fmt::Display) -> IoError {
        IoError::fault(&self.port, message)
    }

    fn check_overrun(&self) -> Result<(), IoError> {
        if self.pending.len() > MAX_LINE_LENGTH {
            return Err(self.fault(format!(
                "{} bytes without a line terminator",
                self.pending.len()
            )));
        }
        Ok(())
    }
}

impl<R: Read + Send> LineSource for LineReader<R> {
    fn next_line(&mut self) -> Result<Option<String>, IoError> {
        loop {
            // Never buffer more than one byte past the limit per read
            let budget = (MAX_LINE_LENGTH + 1).saturating_sub(self.pending.len()) as u64;
            let read = (&mut self.reader)
                .take(budget)
                .read_until(b'\n', &mut self.pending);
            match read {
                Ok(0) => return Err(self.fault("end of stream (device disconnected)")),
                Ok(_) if self.pending.last() == Some(&b'\n') => {
                    let raw = std::mem::take(&mut self.pending);
                    if let Some(line) = take_line(&raw).map_err(|m| self.fault(m))? {
                        return Ok(Some(line));
                    }
                    // blank line, keep reading
                }
                Ok(_) => {
                    // No terminator yet: line limit reached, or the stream
                    // ended mid-line and the next read reports end of stream
                    self.check_overrun()?;
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    self.check_overrun()?;
                    return Ok(None);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(self.fault(format!("read error: {}", e))),
            }
        }
    }

    fn port_name(&self) -> &str {
        &self.port
    }
}

/// Validate and trim one raw line. Blank lines yield `None`.
fn take_line(raw: &[u8]) -> Result<Option<String>, String> {
    if let Some(pos) = raw.iter().position(|b| !b.is_ascii()) {
        return Err(format!("non-ASCII byte 0x{:02X} at offset {}", raw[pos], pos));
    }
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

// ============================================================================
// Test support
// ============================================================================

/// Byte stream that replays a script of reads, then times out forever.
#[cfg(test)]
pub(crate) struct ScriptedRead {
    script: std::collections::VecDeque<std::io::Result<Vec<u8>>>,
    idle: std::time::Duration,
}

#[cfg(test)]
impl ScriptedRead {
    pub(crate) fn new(script: Vec<std::io::Result<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
            idle: std::time::Duration::from_millis(2),
        }
    }
}

#[cfg(test)]
impl Read for ScriptedRead {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.script.pop_front() {
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.script.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => {
                std::thread::sleep(self.idle);
                Err(std::io::Error::new(ErrorKind::TimedOut, "scripted timeout"))
            }
        }
    }
}
