//! Parses `Scheme://path?k=v k=v …`-style open-strings into an
//! [`OpenStringConfig`] and dispatches to the right driver constructor.
//!
//! This is the crate's configuration surface (§1.1): instead of the
//! original varargs-based `open(...)`, every channel is opened from one
//! structured string, parsed once into a typed record.

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};
use crate::iochannel::file::FileDriver;
use crate::iochannel::mem::MemDriver;
use crate::iochannel::mode::ChannelMode;
use crate::iochannel::net::{ServerTcpDriver, ServerUdpDriver, TcpDriver, UdpDriver};
use crate::iochannel::null::NullDriver;
use crate::iochannel::pipe::PipeCmdDriver;
use crate::iochannel::rand::{RandDriver, RandKind};
use crate::iochannel::rtbos::RtbosDriver;
use crate::iochannel::stdio::{StdioDriver, StdioStream};
use crate::refvalue::ReferenceValueList;

#[cfg(unix)]
use crate::iochannel::shm::ShmDriver;

/// Splits `Scheme://rest` into the scheme token and the remainder.
fn split_scheme(url: &str) -> Result<(&str, &str), IoChannelError> {
    url.split_once("://").ok_or(IoChannelError::BadOpenString)
}

/// Parses the `k=v k=v …` tail of an open-string into a config record.
///
/// `path` (everything between `://` and the first space, if any) is stored
/// under the synthetic key `"name"` when the scheme's own params don't
/// already define one — this mirrors `File:///tmp/x.bin key=val` meaning
/// "path is /tmp/x.bin", matching the original grammar's positional first
/// argument.
pub fn parse_open_string(url: &str, mode: ChannelMode, perm: Option<u32>) -> Result<OpenStringConfig, IoChannelError> {
    let (scheme, rest) = split_scheme(url)?;
    // `rest` is already the URI path component (e.g. `Scheme:///tmp/x` splits
    // to `rest = "/tmp/x"`, the correct absolute path with no authority) —
    // stripping leading slashes here would silently turn absolute paths
    // relative, so `rest` is used as-is.
    let (path, params_str) = match rest.split_once(char::is_whitespace) {
        Some((p, tail)) => (p, tail),
        None => (rest, ""),
    };

    let mut params = ReferenceValueList::parse(params_str).map_err(|_| IoChannelError::BadOpenString)?;
    if !path.is_empty() && params.find_value("name").is_none() {
        params.push("name".to_string(), path.to_string());
    }

    Ok(OpenStringConfig {
        scheme: scheme.to_string(),
        mode,
        perm,
        params,
    })
}

/// Resolves an `OpenStringConfig`'s scheme into a freshly constructed,
/// not-yet-opened driver.
pub fn driver_for_scheme(cfg: &OpenStringConfig) -> Result<Box<dyn ChannelDriver>, IoChannelError> {
    let path = cfg.get("name").unwrap_or_default();
    match cfg.scheme.as_str() {
        "File" => Ok(Box::new(FileDriver::new())),
        "Tcp" => Ok(Box::new(TcpDriver::new())),
        "Udp" => Ok(Box::new(UdpDriver::new())),
        "ServerTcp" => Ok(Box::new(ServerTcpDriver::new())),
        "ServerUdp" => Ok(Box::new(ServerUdpDriver::new())),
        "Mem" => Ok(Box::new(MemDriver::new())),
        #[cfg(unix)]
        "Shm" => Ok(Box::new(ShmDriver::new())),
        #[cfg(not(unix))]
        "Shm" => Err(IoChannelError::NotSupported),
        "Null" => Ok(Box::new(NullDriver)),
        "Rand" => {
            let kind = RandKind::parse(path).unwrap_or(RandKind::Integers);
            let seed = cfg.get("key").and_then(|v| v.parse().ok()).unwrap_or(0x2545_F491u64);
            Ok(Box::new(RandDriver::new(kind, seed)))
        }
        "PipeCmd" => Ok(Box::new(PipeCmdDriver::new())),
        "StdIn" => Ok(Box::new(StdioDriver::new(StdioStream::In))),
        "StdOut" => Ok(Box::new(StdioDriver::new(StdioStream::Out))),
        "StdErr" => Ok(Box::new(StdioDriver::new(StdioStream::Err))),
        "RTBOS" => Ok(Box::new(RtbosDriver::new())),
        "Fd" | "Socket" | "AnsiFile" | "MemMapFd" => Err(IoChannelError::BadOpenString),
        _ => Err(IoChannelError::BadOpenString),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_path_and_params() {
        let cfg = parse_open_string("File:///tmp/foo.bin mode=rb extra=1", ChannelMode::R_ONLY, None).unwrap();
        assert_eq!(cfg.scheme, "File");
        assert_eq!(cfg.get("name"), Some("/tmp/foo.bin"));
        assert_eq!(cfg.get("mode"), Some("rb"));
        assert_eq!(cfg.get("extra"), Some("1"));
    }

    #[test]
    fn rejects_missing_scheme_separator() {
        assert!(parse_open_string("not-a-url", ChannelMode::R_ONLY, None).is_err());
    }

    #[test]
    fn rand_scheme_resolves_path_as_kind() {
        let cfg = parse_open_string("Rand:///Printables", ChannelMode::R_ONLY, None).unwrap();
        let driver = driver_for_scheme(&cfg);
        assert!(driver.is_ok());
    }
}
