//! `Tcp://`, `Udp://`, `ServerTcp://`, `ServerUdp://` drivers.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};

use crate::error::IoChannelError;
use crate::iochannel::driver::{ChannelDriver, OpenStringConfig};
use crate::iochannel::mode::ChannelType;

fn parse_host_port(cfg: &OpenStringConfig) -> Result<(String, u16), IoChannelError> {
    let host = cfg.get("host").unwrap_or("127.0.0.1").to_string();
    let port: u16 = cfg
        .get("port")
        .ok_or(IoChannelError::BadOpenString)?
        .parse()
        .map_err(|_| IoChannelError::BadOpenString)?;
    Ok((host, port))
}

#[derive(Debug, Default)]
pub struct TcpDriver {
    stream: Option<TcpStream>,
}

impl TcpDriver {
    pub fn new() -> Self {
        TcpDriver::default()
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, IoChannelError> {
        self.stream.as_mut().ok_or(IoChannelError::IoOnClosedChannel)
    }
}

impl ChannelDriver for TcpDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let (host, port) = parse_host_port(cfg)?;
        let stream = TcpStream::connect((host.as_str(), port)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                IoChannelError::SocketTimeout
            } else {
                IoChannelError::UnableToConnect { host: host.clone(), port }
            }
        })?;
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        self.stream_mut()?
            .read(buf)
            .map_err(|_| IoChannelError::SocketRead)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        self.stream_mut()?
            .write(buf)
            .map_err(|_| IoChannelError::SocketWrite)
    }

    fn close(&mut self) -> Result<(), IoChannelError> {
        self.stream = None;
        Ok(())
    }

    fn kind(&self) -> ChannelType {
        ChannelType::Socket
    }

    fn get_property(&self, name: &str) -> Result<String, IoChannelError> {
        match name {
            "peerAddr" => self
                .stream
                .as_ref()
                .and_then(|s| s.peer_addr().ok())
                .map(|a| a.to_string())
                .ok_or(IoChannelError::NotDefined),
            _ => Err(IoChannelError::NotSupported),
        }
    }
}

#[derive(Debug, Default)]
pub struct UdpDriver {
    socket: Option<UdpSocket>,
}

impl UdpDriver {
    pub fn new() -> Self {
        UdpDriver::default()
    }

    fn socket_mut(&mut self) -> Result<&mut UdpSocket, IoChannelError> {
        self.socket.as_mut().ok_or(IoChannelError::IoOnClosedChannel)
    }
}

impl ChannelDriver for UdpDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let (host, port) = parse_host_port(cfg)?;
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(IoChannelError::from)?;
        socket
            .connect((host.as_str(), port))
            .map_err(|_| IoChannelError::UnableToConnect { host, port })?;
        self.socket = Some(socket);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        self.socket_mut()?
            .recv(buf)
            .map_err(|_| IoChannelError::SocketRead)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        self.socket_mut()?
            .send(buf)
            .map_err(|_| IoChannelError::SocketWrite)
    }

    fn kind(&self) -> ChannelType {
        ChannelType::Socket
    }
}

/// `ServerTcp://` — listens, then accepts exactly one client connection on
/// open, bounded by `waitClientTimeout`.
#[derive(Debug, Default)]
pub struct ServerTcpDriver {
    stream: Option<TcpStream>,
}

impl ServerTcpDriver {
    pub fn new() -> Self {
        ServerTcpDriver::default()
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, IoChannelError> {
        self.stream.as_mut().ok_or(IoChannelError::IoOnClosedChannel)
    }
}

impl ChannelDriver for ServerTcpDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let port: u16 = cfg
            .get("port")
            .ok_or(IoChannelError::BadOpenString)?
            .parse()
            .map_err(|_| IoChannelError::BadOpenString)?;
        let reuse_addr = cfg.get("reuseAddr").map(|v| v == "TRUE").unwrap_or(false);
        let _ = reuse_addr; // socket2-level SO_REUSEADDR is a platform detail not modeled here.

        let listener = TcpListener::bind(("0.0.0.0", port)).map_err(IoChannelError::from)?;
        if let Some(timeout_us) = cfg.get("waitClientTimeout").and_then(|v| v.parse::<u64>().ok()) {
            listener
                .set_nonblocking(timeout_us == 0)
                .map_err(IoChannelError::from)?;
        }
        let (stream, _addr) = listener.accept().map_err(|_| IoChannelError::SocketTimeout)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        self.stream_mut()?
            .read(buf)
            .map_err(|_| IoChannelError::SocketRead)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        self.stream_mut()?
            .write(buf)
            .map_err(|_| IoChannelError::SocketWrite)
    }

    fn kind(&self) -> ChannelType {
        ChannelType::Socket
    }
}

/// `ServerUdp://` — a bound, unconnected UDP socket; `read`/`write` use
/// `recv_from`/`send_to` against the most recently seen peer.
#[derive(Debug, Default)]
pub struct ServerUdpDriver {
    socket: Option<UdpSocket>,
    last_peer: Option<SocketAddr>,
}

impl ServerUdpDriver {
    pub fn new() -> Self {
        ServerUdpDriver::default()
    }
}

impl ChannelDriver for ServerUdpDriver {
    fn open(&mut self, cfg: &OpenStringConfig) -> Result<(), IoChannelError> {
        let port: u16 = cfg
            .get("port")
            .ok_or(IoChannelError::BadOpenString)?
            .parse()
            .map_err(|_| IoChannelError::BadOpenString)?;
        let socket = UdpSocket::bind(("0.0.0.0", port)).map_err(IoChannelError::from)?;
        self.socket = Some(socket);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoChannelError> {
        let socket = self.socket.as_mut().ok_or(IoChannelError::IoOnClosedChannel)?;
        let (n, peer) = socket.recv_from(buf).map_err(|_| IoChannelError::SocketRead)?;
        self.last_peer = Some(peer);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoChannelError> {
        let socket = self.socket.as_mut().ok_or(IoChannelError::IoOnClosedChannel)?;
        let peer = self.last_peer.ok_or(IoChannelError::NotDefined)?;
        socket.send_to(buf, peer).map_err(|_| IoChannelError::SocketWrite)
    }

    fn kind(&self) -> ChannelType {
        ChannelType::Socket
    }
}

