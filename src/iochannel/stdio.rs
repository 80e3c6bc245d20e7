//! `StdIn|StdOut|StdErr://` console drivers.

use std::io::{Read, Write};

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};
use crate::iochannel::mode::ChannelMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioStream {
    In,
    Out,
    Err,
}

#[derive(Debug)]
pub struct StdioDriver {
    stream: StdioStream,
}

impl StdioDriver {
    pub fn new(stream: StdioStream) -> Self {
        StdioDriver { stream }
    }
}

impl ChannelDriver for StdioDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        match self.stream {
            StdioStream::In if !cfg.mode.contains(ChannelMode::R_ONLY) => {
                Err(IoChannelError::BadStdInMode)
            }
            StdioStream::Out | StdioStream::Err if !cfg.mode.contains(ChannelMode::W_ONLY) => {
                Err(IoChannelError::BadStdOutMode)
            }
            _ => Ok(()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        if self.stream != StdioStream::In {
            return Err(IoChannelError::BadAccess);
        }
        std::io::stdin().read(buf).map_err(IoChannelError::from)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        match self.stream {
            StdioStream::Out => std::io::stdout().write(buf).map_err(IoChannelError::from),
            StdioStream::Err => std::io::stderr().write(buf).map_err(IoChannelError::from),
            StdioStream::In => Err(IoChannelError::BadAccess),
        }
    }

    fn flush(&mut self) -> Result<(), IoChannelError> {
        match self.stream {
            StdioStream::Out => std::io::stdout().flush().map_err(IoChannelError::from),
            StdioStream::Err => std::io::stderr().flush().map_err(IoChannelError::from),
            StdioStream::In => Ok(()),
        }
    }
}
