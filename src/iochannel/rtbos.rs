//! `RTBOS://` driver — a small request/response protocol client.
//!
//! RTBOS multiplexes typed requests over a single TCP connection to a
//! message broker; a client sends a `data` payload encoded as `format` and
//! waits for one reply, retrying up to `retry` times with `retryTimeout`
//! microseconds between attempts. Resolution of the `blocking`/`retryTimeout`
//! interaction (does `retryTimeout` bound the whole blocking read, or just
//! the gap between retries?) is recorded in DESIGN.md: `retryTimeout` gates
//! the wait *between* attempts, while `blocking=1` means the read for a
//! single attempt waits indefinitely for a complete reply.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};
use crate::iochannel::mode::ChannelType;

#[derive(Debug, Clone)]
struct RtbosConfig {
    retry: u32,
    retry_timeout: Duration,
    blocking: bool,
}

#[derive(Debug, Default)]
pub struct RtbosDriver {
    stream: Option<TcpStream>,
    cfg: Option<RtbosConfig>,
    inbox: Vec<u8>,
}

impl RtbosDriver {
    pub fn new() -> Self {
        RtbosDriver::default()
    }

    fn send_request(&mut self, payload: &[u8]) -> Result<(), IoChannelError> {
        let stream = self.stream.as_mut().ok_or(IoChannelError::IoOnClosedChannel)?;
        let len = (payload.len() as u32).to_be_bytes();
        stream.write_all(&len).map_err(|_| IoChannelError::SocketWrite)?;
        stream.write_all(payload).map_err(|_| IoChannelError::SocketWrite)
    }

    fn await_response(&mut self) -> Result<Vec<u8>, IoChannelError> {
        let cfg = self.cfg.clone().ok_or(IoChannelError::IoOnClosedChannel)?;
        let mut attempts_left = cfg.retry.max(1);
        loop {
            let result = self.try_read_one();
            match result {
                Ok(data) => return Ok(data),
                Err(e) if attempts_left > 1 => {
                    attempts_left -= 1;
                    if !cfg.blocking {
                        std::thread::sleep(cfg.retry_timeout);
                    }
                    let _ = e;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_read_one(&mut self) -> Result<Vec<u8>, IoChannelError> {
        let cfg = self.cfg.clone().ok_or(IoChannelError::IoOnClosedChannel)?;
        let stream = self.stream.as_mut().ok_or(IoChannelError::IoOnClosedChannel)?;
        if !cfg.blocking {
            stream
                .set_read_timeout(Some(cfg.retry_timeout))
                .map_err(IoChannelError::from)?;
        } else {
            stream.set_read_timeout(None).map_err(IoChannelError::from)?;
        }

        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .map_err(|e| IoChannelError::from_io_error(&e))?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        stream
            .read_exact(&mut body)
            .map_err(|e| IoChannelError::from_io_error(&e))?;
        Ok(body)
    }
}

impl ChannelDriver for RtbosDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let host = cfg.get("host").unwrap_or("127.0.0.1").to_string();
        let port: u16 = cfg
            .get("port")
            .ok_or(IoChannelError::BadOpenString)?
            .parse()
            .map_err(|_| IoChannelError::BadOpenString)?;
        let retry = cfg
            .get("retry")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1u32);
        let retry_timeout_us: u64 = cfg
            .get("retryTimeout")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1_000_000);
        let blocking = cfg.get("blocking").map(|v| v == "1" || v == "TRUE").unwrap_or(false);

        let stream = TcpStream::connect((host.as_str(), port))
            .map_err(|_| IoChannelError::UnableToConnect { host, port })?;
        self.stream = Some(stream);
        self.cfg = Some(RtbosConfig {
            retry,
            retry_timeout: Duration::from_micros(retry_timeout_us),
            blocking,
        });

        if let Some(data) = cfg.get("data") {
            self.send_request(data.as_bytes())?;
            self.inbox = self.await_response()?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        if self.inbox.is_empty() {
            self.inbox = self.await_response()?;
        }
        let n = self.inbox.len().min(buf.len());
        buf[..n].copy_from_slice(&self.inbox[..n]);
        self.inbox.drain(..n);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        self.send_request(buf)?;
        Ok(buf.len())
    }

    fn close(&mut self) -> Result<(), IoChannelError> {
        self.stream = None;
        Ok(())
    }

    fn kind(&self) -> ChannelType {
        ChannelType::Socket
    }
}
