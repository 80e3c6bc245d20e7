//! `Null://` driver — discards writes, reads always report EOF.

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};

#[derive(Debug, Default)]
pub struct NullDriver;

impl ChannelDriver for NullDriver {
    fn open(&mut self, _cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, IoChannelError> {
        Ok(0)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iochannel::mode::ChannelMode;
    use crate::refvalue::ReferenceValueList;

    #[test]
    fn reads_are_always_eof() {
        let mut d = NullDriver;
        d.open(&OpenStringConfig {
            scheme: "Null".into(),
            mode: ChannelMode::RW,
            perm: None,
            params: ReferenceValueList::new(),
        })
        .unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(d.read(&mut buf).unwrap(), 0);
        assert_eq!(d.write(b"ignored").unwrap(), 7);
    }
}
