//! `Shm://` driver — POSIX shared memory via `shm_open`/`mmap`.
//!
//! No portable shared-memory crate is in the teacher's dependency set and
//! POSIX shm is unavoidably an OS primitive, so this is a small unix-only
//! shim built directly on `libc`; non-unix targets get `NotSupported`.

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};
use crate::iochannel::mode::{ChannelMode, ChannelType};

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::ffi::CString;

    #[derive(Debug)]
    pub struct Mapping {
        pub ptr: *mut libc::c_void,
        pub len: usize,
        pub fd: libc::c_int,
        pub name: CString,
        pub owner: bool,
    }

    unsafe impl Send for Mapping {}

    impl Drop for Mapping {
        fn drop(&mut self) {
            unsafe {
                libc::munmap(self.ptr, self.len);
                libc::close(self.fd);
                if self.owner {
                    libc::shm_unlink(self.name.as_ptr());
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ShmDriver {
    #[cfg(unix)]
    mapping: Option<unix_impl::Mapping>,
    pos: usize,
}

impl ShmDriver {
    pub fn new() -> Self {
        ShmDriver::default()
    }

    #[cfg(unix)]
    fn slice(&self) -> &[u8] {
        let m = self.mapping.as_ref().expect("shm mapping missing");
        unsafe { std::slice::from_raw_parts(m.ptr as *const u8, m.len) }
    }

    #[cfg(unix)]
    fn slice_mut(&mut self) -> &mut [u8] {
        let m = self.mapping.as_ref().expect("shm mapping missing");
        unsafe { std::slice::from_raw_parts_mut(m.ptr as *mut u8, m.len) }
    }
}

impl ChannelDriver for ShmDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        #[cfg(unix)]
        {
            use std::ffi::CString;

            let name = cfg.get("name").ok_or(IoChannelError::BadOpenString)?;
            if !name.starts_with('/') {
                return Err(IoChannelError::BadShmName);
            }
            let cname = CString::new(name).map_err(|_| IoChannelError::BadShmName)?;
            let size: usize = cfg
                .get("size")
                .ok_or(IoChannelError::BadMemMapSize)?
                .parse()
                .map_err(|_| IoChannelError::BadMemMapSize)?;
            if size == 0 {
                return Err(IoChannelError::BadMemMapSize);
            }

            let mut oflags = 0;
            if cfg.mode.contains(ChannelMode::CREATE) {
                oflags |= libc::O_CREAT;
            }
            oflags |= if cfg.mode.is_readable() && cfg.mode.is_writable() {
                libc::O_RDWR
            } else if cfg.mode.is_writable() {
                libc::O_RDWR
            } else {
                libc::O_RDONLY
            };

            let fd = unsafe { libc::shm_open(cname.as_ptr(), oflags, 0o600) };
            if fd < 0 {
                return Err(IoChannelError::from(std::io::Error::last_os_error()));
            }

            if cfg.mode.contains(ChannelMode::CREATE) {
                if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
                    unsafe { libc::close(fd) };
                    return Err(IoChannelError::from(std::io::Error::last_os_error()));
                }
            }

            let prot = libc::PROT_READ | libc::PROT_WRITE;
            let ptr = unsafe { libc::mmap(std::ptr::null_mut(), size, prot, libc::MAP_SHARED, fd, 0) };
            if ptr == libc::MAP_FAILED {
                unsafe { libc::close(fd) };
                return Err(IoChannelError::from(std::io::Error::last_os_error()));
            }

            self.mapping = Some(unix_impl::Mapping {
                ptr,
                len: size,
                fd,
                name: cname,
                owner: cfg.mode.contains(ChannelMode::CREATE),
            });
            self.pos = 0;
            Ok(())
        }
        #[cfg(not(unix))]
        {
            let _ = cfg;
            Err(IoChannelError::NotSupported)
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        #[cfg(unix)]
        {
            let src = self.slice();
            let remaining = src.len().saturating_sub(self.pos);
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&src[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
        #[cfg(not(unix))]
        {
            let _ = buf;
            Err(IoChannelError::NotSupported)
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        #[cfg(unix)]
        {
            let dst = self.slice_mut();
            let remaining = dst.len().saturating_sub(self.pos);
            let n = remaining.min(buf.len());
            dst[self.pos..self.pos + n].copy_from_slice(&buf[..n]);
            self.pos += n;
            Ok(n)
        }
        #[cfg(not(unix))]
        {
            let _ = buf;
            Err(IoChannelError::NotSupported)
        }
    }

    fn close(&mut self) -> Result<(), IoChannelError> {
        #[cfg(unix)]
        {
            self.mapping = None;
        }
        Ok(())
    }

    fn kind(&self) -> ChannelType {
        ChannelType::MemPointer
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::refvalue::ReferenceValueList;

    fn cfg(name: &str, size: usize, mode: ChannelMode) -> OpenStringConfig {
        let mut params = ReferenceValueList::new();
        params.push("name".to_string(), name.to_string());
        params.push("size".to_string(), size.to_string());
        OpenStringConfig {
            scheme: "Shm".to_string(),
            mode,
            perm: None,
            params,
        }
    }

    #[test]
    fn create_write_read_roundtrip() {
        let name = format!("/tbserialize-test-{}", std::process::id());
        let mode = ChannelMode::RW | ChannelMode::CREATE;
        let mut driver = ShmDriver::new();
        driver.open(&cfg(&name, 64, mode)).unwrap();
        let written = driver.write(b"hello shm").unwrap();
        assert_eq!(written, 9);
        driver.pos = 0;
        let mut buf = [0u8; 9];
        driver.read(&mut buf).unwrap();
        assert_eq!(&buf, b"hello shm");
    }
}
