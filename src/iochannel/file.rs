//! `File://` driver, built on `std::fs::File` the way the teacher's own file
//! drivers wrap `std::fs`/`OpenOptions` directly.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};
use crate::iochannel::mode::{ChannelMode, ChannelType};

#[derive(Debug, Default)]
pub struct FileDriver {
    file: Option<File>,
}

impl FileDriver {
    pub fn new() -> Self {
        FileDriver { file: None }
    }

    fn file_mut(&mut self) -> Result<&mut File, IoChannelError> {
        self.file.as_mut().ok_or(IoChannelError::IoOnClosedChannel)
    }
}

impl ChannelDriver for FileDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let name = cfg.get("name").ok_or(IoChannelError::BadOpenString)?;

        let mut opts = OpenOptions::new();
        opts.read(cfg.mode.is_readable()).write(cfg.mode.is_writable());
        if cfg.mode.contains(ChannelMode::CREATE) {
            opts.create(true);
        }
        if cfg.mode.contains(ChannelMode::TRUNCATE) {
            opts.truncate(true);
        }
        if cfg.mode.contains(ChannelMode::APPEND) {
            opts.append(true);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            if let Some(perm) = cfg.perm {
                opts.mode(perm);
            }
        }

        let file = opts.open(name).map_err(IoChannelError::from)?;
        self.file = Some(file);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        self.file_mut()?.read(buf).map_err(IoChannelError::from)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        self.file_mut()?.write(buf).map_err(IoChannelError::from)
    }

    fn flush(&mut self) -> Result<(), IoChannelError> {
        self.file_mut()?.flush().map_err(IoChannelError::from)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoChannelError> {
        self.file_mut()?.seek(pos).map_err(IoChannelError::from)
    }

    fn close(&mut self) -> Result<(), IoChannelError> {
        self.file = None;
        Ok(())
    }

    fn kind(&self) -> ChannelType {
        ChannelType::Fd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refvalue::ReferenceValueList;

    fn cfg(path: &str, mode: ChannelMode) -> OpenStringConfig {
        let mut params = ReferenceValueList::new();
        params.push("name", path);
        OpenStringConfig {
            scheme: "File".into(),
            mode,
            perm: None,
            params,
        }
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.bin");
        let path_str = path.to_str().unwrap();

        let mut writer = FileDriver::new();
        writer
            .open(&cfg(path_str, ChannelMode::W_ONLY | ChannelMode::CREATE | ChannelMode::TRUNCATE))
            .unwrap();
        assert_eq!(writer.write(b"hello").unwrap(), 5);
        writer.close().unwrap();

        let mut reader = FileDriver::new();
        reader.open(&cfg(path_str, ChannelMode::R_ONLY)).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn missing_file_maps_to_no_ent() {
        let mut driver = FileDriver::new();
        let err = driver
            .open(&cfg("/nonexistent/path/for/sure.bin", ChannelMode::R_ONLY))
            .unwrap_err();
        assert_eq!(err, IoChannelError::NoEnt);
    }
}
