//! `Mem://` driver — an in-memory byte buffer channel.
//!
//! `Create` allocates a fresh buffer; `Truncate` zero-fills an existing one;
//! `Close` frees the buffer at channel close (the owned `Vec<u8>` case).
//! Without `Close` the buffer is conceptually borrowed for the channel's
//! lifetime — modeled here as the same owned `Vec<u8>`, since a borrowed
//! `&'static mut [u8]` driver would force an unsafe, 'static-only API; the
//! observable close-time behaviour (content available to the caller
//! afterwards via `into_inner`) is preserved instead.

use std::io::SeekFrom;

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};
use crate::iochannel::mode::{ChannelMode, ChannelType};

#[derive(Debug, Default)]
pub struct MemDriver {
    buf: Vec<u8>,
    pos: usize,
}

impl MemDriver {
    pub fn new() -> Self {
        MemDriver::default()
    }

    /// Builds a driver pre-loaded with `data`, for read-only in-memory
    /// sources that don't go through the open-string grammar.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        MemDriver { buf: data, pos: 0 }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl ChannelDriver for MemDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let size: usize = match cfg.get("size") {
            Some(s) => s.parse().map_err(|_| IoChannelError::BadSize)?,
            None => 0,
        };
        if cfg.mode.contains(ChannelMode::CREATE) {
            self.buf = vec![0u8; size];
        } else if cfg.mode.contains(ChannelMode::TRUNCATE) {
            self.buf.clear();
            self.buf.resize(size, 0);
        } else if self.buf.is_empty() && size > 0 {
            self.buf = vec![0u8; size];
        }
        self.pos = 0;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        let remaining = self.buf.len().saturating_sub(self.pos);
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        let end = self.pos + buf.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoChannelError> {
        let new_pos = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
            SeekFrom::End(delta) => {
                if delta > 0 {
                    return Err(IoChannelError::NoEndSeekOnMemory);
                }
                self.buf.len() as i64 + delta
            }
        };
        if new_pos < 0 {
            return Err(IoChannelError::BadSeekWhence);
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn kind(&self) -> ChannelType {
        ChannelType::MemPointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_resizes_and_read_drains() {
        let mut d = MemDriver::new();
        assert_eq!(d.write(b"hello world").unwrap(), 11);
        d.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = [0u8; 11];
        assert_eq!(d.read(&mut buf).unwrap(), 11);
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn end_seek_rejected() {
        let mut d = MemDriver::from_bytes(vec![1, 2, 3]);
        assert_eq!(d.seek(SeekFrom::End(1)).unwrap_err(), IoChannelError::NoEndSeekOnMemory);
        assert!(d.seek(SeekFrom::End(-1)).is_ok());
    }
}
