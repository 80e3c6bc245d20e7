//! `IoChannel` — the driver-polymorphic byte channel facade.
//!
//! Unifies read/write/seek/flush across every scheme behind one concrete
//! type with a runtime "already open" guard, the same texture the teacher's
//! own `ReadWrite`-bound helpers use rather than splitting open/opened state
//! across two types.

pub mod driver;
pub mod file;
pub mod format_io;
pub mod handle;
pub mod mem;
pub mod mode;
pub mod net;
pub mod null;
pub mod pipe;
pub mod rand;
pub mod rtbos;
#[cfg(unix)]
pub mod shm;
pub mod stdio;

use std::io::SeekFrom;
use std::time::Duration;

use crate::error::IoChannelError;
use crate::openstring;

pub use driver::{ChannelDriver, OpenStringConfig};
pub use format_io::{PrintArg, ScanArg};
pub use mode::{ChannelMode, ChannelType};

const DEFAULT_UNGET_CAPACITY: usize = 512;

/// Byte buffer staged in front of the driver, with optional geometric
/// growth on overflow (§4.3 "Write buffering").
#[derive(Debug)]
struct WriteBuffer {
    data: Vec<u8>,
    index: usize,
    auto_resize: bool,
}

impl WriteBuffer {
    fn new(size: usize, auto_resize: bool) -> Self {
        WriteBuffer {
            data: vec![0u8; size],
            index: 0,
            auto_resize,
        }
    }

    fn capacity_left(&self) -> usize {
        self.data.len() - self.index
    }
}

/// The driver-polymorphic channel facade described in §4.3.
#[derive(Debug)]
pub struct IoChannel {
    driver: Option<Box<dyn ChannelDriver>>,
    mode: ChannelMode,
    kind: ChannelType,
    unget_buf: Vec<u8>,
    unget_capacity: usize,
    write_buf: Option<WriteBuffer>,
    read_timeout: Duration,
    write_timeout: Duration,
    error: Option<IoChannelError>,
    eof: bool,
    bytes_read: u64,
    bytes_written: u64,
}

impl Default for IoChannel {
    fn default() -> Self {
        IoChannel {
            driver: None,
            mode: ChannelMode::empty(),
            kind: ChannelType::NotSet,
            unget_buf: Vec::new(),
            unget_capacity: DEFAULT_UNGET_CAPACITY,
            write_buf: None,
            read_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            error: None,
            eof: false,
            bytes_read: 0,
            bytes_written: 0,
        }
    }
}

impl IoChannel {
    pub fn new() -> Self {
        IoChannel::default()
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    fn guard_open(&mut self) -> Result<&mut Box<dyn ChannelDriver>, IoChannelError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.driver.as_mut().ok_or(IoChannelError::IoOnClosedChannel)
    }

    fn sticky<T>(&mut self, result: Result<T, IoChannelError>) -> Result<T, IoChannelError> {
        if let Err(e) = &result {
            self.error = Some(e.clone());
        }
        result
    }

    /// Opens a channel from a structured `Scheme://...` string.
    pub fn open(&mut self, url: &str, mode: ChannelMode, perm: Option<u32>) -> Result<(), IoChannelError> {
        if self.is_open() {
            return Err(IoChannelError::BadOpenArg);
        }
        if !mode.has_valid_access() {
            return Err(IoChannelError::BadMode);
        }
        let cfg = openstring::parse_open_string(url, mode, perm)?;
        self.open_from_config(cfg)
    }

    pub fn open_from_config(&mut self, cfg: OpenStringConfig) -> Result<(), IoChannelError> {
        if self.is_open() {
            return Err(IoChannelError::BadOpenArg);
        }
        let mut driver = openstring::driver_for_scheme(&cfg)?;
        driver.open(&cfg)?;
        self.mode = cfg.mode;
        self.kind = driver.kind();
        self.driver = Some(driver);
        self.eof = false;
        self.error = None;
        log::debug!("opened channel scheme={} mode={:?}", cfg.scheme, cfg.mode);
        Ok(())
    }

    /// Wraps an already-constructed driver directly (used by `Fd`/`Socket`/
    /// `AnsiFile`/`MemMapFd` wrap-existing-handle schemes, whose open-string
    /// form can't safely resolve a raw handle on its own).
    pub fn adopt(&mut self, mode: ChannelMode, mut driver: Box<dyn ChannelDriver>) -> Result<(), IoChannelError> {
        if self.is_open() {
            return Err(IoChannelError::BadOpenArg);
        }
        handle::require_valid_access(mode)?;
        let cfg = OpenStringConfig {
            scheme: String::new(),
            mode,
            perm: None,
            params: crate::refvalue::ReferenceValueList::new(),
        };
        driver.open(&cfg)?;
        self.mode = mode;
        self.kind = driver.kind();
        self.driver = Some(driver);
        self.eof = false;
        self.error = None;
        Ok(())
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut filled = 0;
        while filled < buf.len() && !self.unget_buf.is_empty() {
            buf[filled] = self.unget_buf.pop().unwrap();
            filled += 1;
        }
        if filled == buf.len() {
            self.bytes_read += filled as u64;
            return Ok(filled);
        }
        let driver = self.guard_open()?;
        let result = driver.read(&mut buf[filled..]);
        let n = self.sticky(result)?;
        if n == 0 && filled == 0 {
            self.eof = true;
        }
        self.bytes_read += (filled + n) as u64;
        Ok(filled + n)
    }

    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn flush_write_buffer(&mut self) -> Result<(), IoChannelError> {
        if let Some(wb) = self.write_buf.as_mut() {
            if wb.index > 0 {
                let pending = wb.data[..wb.index].to_vec();
                let driver = self.driver.as_mut().ok_or(IoChannelError::IoOnClosedChannel)?;
                write_all_through(driver.as_mut(), &pending)?;
                self.write_buf.as_mut().unwrap().index = 0;
            }
        }
        Ok(())
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        if self.error.is_some() {
            return Err(self.error.clone().unwrap());
        }
        if !self.is_open() {
            return Err(IoChannelError::IoOnClosedChannel);
        }
        if self.write_buf.is_none() {
            let driver = self.driver.as_mut().unwrap();
            let result = driver.write(buf);
            let n = self.sticky(result)?;
            self.bytes_written += n as u64;
            return Ok(n);
        }

        let mut written = 0;
        while written < buf.len() {
            let wb = self.write_buf.as_mut().unwrap();
            let space = wb.capacity_left();
            if space == 0 {
                if wb.auto_resize {
                    let new_len = (wb.data.len() * 2).max(wb.data.len() + buf.len() - written);
                    wb.data.resize(new_len, 0);
                } else {
                    self.flush_write_buffer()?;
                    continue;
                }
            }
            let wb = self.write_buf.as_mut().unwrap();
            let space = wb.capacity_left();
            let n = space.min(buf.len() - written);
            let idx = wb.index;
            wb.data[idx..idx + n].copy_from_slice(&buf[written..written + n]);
            wb.index += n;
            written += n;
        }
        self.bytes_written += written as u64;
        Ok(written)
    }

    pub fn write_block(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.write(&buf[total..])?;
            if n == 0 {
                return Err(IoChannelError::LowLevelShortWrite);
            }
            total += n;
        }
        Ok(total)
    }

    pub fn unget(&mut self, buf: &[u8]) -> Result<(), IoChannelError> {
        if self.unget_buf.len() + buf.len() > self.unget_capacity {
            return Err(IoChannelError::TooUnget);
        }
        for &b in buf.iter().rev() {
            self.unget_buf.push(b);
        }
        Ok(())
    }

    /// Reads `n` bytes without consuming them, by reading then ungetting.
    pub fn peek(&mut self, n: usize) -> Result<Vec<u8>, IoChannelError> {
        let mut buf = vec![0u8; n];
        let got = self.read_block(&mut buf)?;
        buf.truncate(got);
        self.unget(&buf)?;
        Ok(buf)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoChannelError> {
        self.unget_buf.clear();
        let driver = self.guard_open()?;
        let result = driver.seek(pos);
        self.sticky(result)
    }

    pub fn tell(&mut self) -> Result<u64, IoChannelError> {
        self.seek(SeekFrom::Current(0))
    }

    pub fn rewind(&mut self) -> Result<(), IoChannelError> {
        self.seek(SeekFrom::Start(0))?;
        self.eof = false;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), IoChannelError> {
        self.flush_write_buffer()?;
        let driver = self.guard_open()?;
        let result = driver.flush();
        self.sticky(result)
    }

    pub fn set_write_buffer(&mut self, size: usize, auto_resize: bool) {
        self.write_buf = Some(WriteBuffer::new(size, auto_resize));
    }

    pub fn set_use_write_buffering(&mut self, on: bool, auto_resize: bool) {
        if on {
            if self.write_buf.is_none() {
                self.write_buf = Some(WriteBuffer::new(4096, auto_resize));
            } else {
                self.write_buf.as_mut().unwrap().auto_resize = auto_resize;
            }
        } else {
            self.write_buf = None;
        }
    }

    pub fn is_read_data_available(&mut self, timeout: Duration) -> bool {
        if !self.unget_buf.is_empty() {
            return true;
        }
        match self.driver.as_mut() {
            Some(driver) => driver.poll_ready(false, timeout),
            None => false,
        }
    }

    pub fn is_write_possible(&mut self, timeout: Duration) -> bool {
        match self.driver.as_mut() {
            Some(driver) => driver.poll_ready(true, timeout),
            None => false,
        }
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }

    pub fn get_property(&self, name: &str) -> Result<String, IoChannelError> {
        match &self.driver {
            Some(driver) => driver.get_property(name),
            None => Err(IoChannelError::IoOnClosedChannel),
        }
    }

    pub fn set_property(&mut self, name: &str, value: &str) -> Result<(), IoChannelError> {
        match &mut self.driver {
            Some(driver) => driver.set_property(name, value),
            None => Err(IoChannelError::IoOnClosedChannel),
        }
    }

    pub fn kind(&self) -> ChannelType {
        self.kind
    }

    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Cumulative bytes handed back by [`IoChannel::read`] since open,
    /// counting bytes drained from the unget stack as well as the driver —
    /// the byte count `Serializer::read_bytes` accumulates from.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Cumulative bytes accepted by [`IoChannel::write`] since open
    /// (buffered or written through), mirroring [`IoChannel::bytes_read`]
    /// for the write direction.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_error_occurred(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_description(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn error_number(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.error_number())
    }

    pub fn clean_error(&mut self) {
        self.error = None;
    }

    pub fn close(&mut self) -> Result<(), IoChannelError> {
        if !self.mode.contains(ChannelMode::NOT_CLOSE) {
            self.flush_write_buffer().ok();
        }
        if let Some(mut driver) = self.driver.take() {
            let result = driver.close();
            self.unget_buf.clear();
            return result;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = IoChannel::default();
    }
}

impl Drop for IoChannel {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        }
    }
}

fn write_all_through(driver: &mut dyn ChannelDriver, mut buf: &[u8]) -> Result<(), IoChannelError> {
    while !buf.is_empty() {
        let n = driver.write(buf)?;
        if n == 0 {
            return Err(IoChannelError::LowLevelShortWrite);
        }
        buf = &buf[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_round_trip_through_facade() {
        let mut chan = IoChannel::new();
        chan.open("Mem:///buf size=32", ChannelMode::RW | ChannelMode::CREATE, None)
            .unwrap();
        assert_eq!(chan.write(b"payload").unwrap(), 7);
        chan.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = [0u8; 7];
        assert_eq!(chan.read(&mut buf).unwrap(), 7);
        assert_eq!(&buf, b"payload");
    }

    #[test]
    fn unget_is_lifo_and_drained_before_driver() {
        let mut chan = IoChannel::new();
        chan.open("Null://x", ChannelMode::RW, None).unwrap();
        chan.unget(&[1, 2, 3]).unwrap();
        let mut buf = [0u8; 3];
        chan.read(&mut buf).unwrap();
        assert_eq!(buf, [3, 2, 1]);
    }

    #[test]
    fn unget_over_capacity_errors() {
        let mut chan = IoChannel::new();
        chan.open("Null://x", ChannelMode::RW, None).unwrap();
        let big = vec![0u8; DEFAULT_UNGET_CAPACITY + 1];
        assert_eq!(chan.unget(&big).unwrap_err(), IoChannelError::TooUnget);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut chan = IoChannel::new();
        chan.open("Mem:///buf size=4", ChannelMode::RW | ChannelMode::CREATE, None)
            .unwrap();
        chan.write(&[9, 8, 7, 6]).unwrap();
        chan.seek(SeekFrom::Start(0)).unwrap();
        let peeked = chan.peek(2).unwrap();
        assert_eq!(peeked, vec![9, 8]);
        let mut buf = [0u8; 4];
        let n = chan.read(&mut buf).unwrap();
        assert_eq!(n, 4);
        assert_eq!(buf, [9, 8, 7, 6]);
    }

    #[test]
    fn write_buffering_defers_until_flush() {
        let mut chan = IoChannel::new();
        chan.open("Mem:///buf size=16", ChannelMode::RW | ChannelMode::CREATE, None)
            .unwrap();
        chan.set_use_write_buffering(true, true);
        chan.write(b"abc").unwrap();
        chan.flush().unwrap();
        chan.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = [0u8; 3];
        chan.read(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn sticky_error_exposes_number_and_clears() {
        let mut chan = IoChannel::new();
        chan.open("Mem:///buf size=4", ChannelMode::RW | ChannelMode::CREATE, None)
            .unwrap();
        let err = chan.seek(SeekFrom::End(1)).unwrap_err();
        assert_eq!(err, IoChannelError::NoEndSeekOnMemory);
        assert!(chan.is_error_occurred());
        assert_eq!(chan.error_number(), Some(err.error_number()));
        chan.clean_error();
        assert!(!chan.is_error_occurred());
        assert_eq!(chan.error_number(), None);
    }
}
