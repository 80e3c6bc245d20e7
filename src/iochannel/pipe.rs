//! `PipeCmd://` driver — runs a command and exposes its stdout.
//!
//! Unidirectional (read-only) per spec: the child's stdin is not wired up.

use std::io::Read;
use std::process::{Child, Command, Stdio};

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};

#[derive(Debug, Default)]
pub struct PipeCmdDriver {
    child: Option<Child>,
}

impl PipeCmdDriver {
    pub fn new() -> Self {
        PipeCmdDriver { child: None }
    }
}

impl ChannelDriver for PipeCmdDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let command_line = cfg.get("name").ok_or(IoChannelError::BadOpenString)?;
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or(IoChannelError::BadOpenString)?;

        let child = Command::new(program)
            .args(parts)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(IoChannelError::from)?;
        self.child = Some(child);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        let child = self.child.as_mut().ok_or(IoChannelError::IoOnClosedChannel)?;
        let stdout = child.stdout.as_mut().ok_or(IoChannelError::BadFd)?;
        stdout.read(buf).map_err(IoChannelError::from)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize, IoChannelError> {
        Err(IoChannelError::BadAccess)
    }

    fn close(&mut self) -> Result<(), IoChannelError> {
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
        Ok(())
    }
}
