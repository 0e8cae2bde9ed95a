// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! socket_port implement the management of a listening endpoint, open, accept and close the socket
//!
use crate::error::*;
use basic::fd_util::{self, INVALID_FD};
use nix::errno::Errno;
use nix::sys::socket::{
    self, sockopt::ReuseAddr, AddressFamily, SockFlag, SockType, SockaddrIn, SockaddrIn6,
    SockaddrLike, SockaddrStorage, UnixAddr,
};
use std::cell::RefCell;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::unix::prelude::RawFd;
use std::path::PathBuf;

/// The parsed ListenStream value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenEndpoint {
    /// a local stream socket bound at the path
    Unix(PathBuf),
    /// a network stream socket
    Inet(SocketAddr),
}

impl ListenEndpoint {
    /// Parse `path`, `address:port`, `[ipv6]:port` or a bare port, which listens on every IPv4 address.
    pub fn parse(item: &str) -> Result<ListenEndpoint> {
        let item = item.trim();
        if item.is_empty() {
            return Err(BindError::InvalidEndpoint {
                listen: item.to_string(),
            });
        }

        if let Ok(port) = item.parse::<u16>() {
            if port == 0 {
                return Err(BindError::InvalidEndpoint {
                    listen: item.to_string(),
                });
            }
            return Ok(ListenEndpoint::Inet(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                port,
            ))));
        }

        if let Ok(socket_addr) = item.parse::<SocketAddr>() {
            return Ok(ListenEndpoint::Inet(socket_addr));
        }

        /* host names are not resolved */
        if item.contains(':') && !item.contains('/') {
            return Err(BindError::InvalidEndpoint {
                listen: item.to_string(),
            });
        }

        Ok(ListenEndpoint::Unix(PathBuf::from(item)))
    }
}

impl fmt::Display for ListenEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ListenEndpoint::Unix(path) => write!(f, "{}", path.display()),
            ListenEndpoint::Inet(addr) => write!(f, "{}", addr),
        }
    }
}

/// A listening socket owned by one socket unit
pub struct SocketPort {
    endpoint: ListenEndpoint,
    fd: RefCell<RawFd>,
}

impl SocketPort {
    ///
    pub fn new(endpoint: ListenEndpoint) -> SocketPort {
        SocketPort {
            endpoint,
            fd: RefCell::new(INVALID_FD),
        }
    }

    ///
    pub fn endpoint(&self) -> &ListenEndpoint {
        &self.endpoint
    }

    /// the listening fd, INVALID_FD when closed
    pub fn fd(&self) -> RawFd {
        *self.fd.borrow()
    }

    /// Create a non-blocking socket, bind and listen. Opening an opened port is a no-op.
    pub fn open(&self, backlog: usize) -> Result<RawFd> {
        // process reentrant protection
        if self.fd() >= 0 {
            return Ok(self.fd());
        }

        let listen = self.endpoint.to_string();
        let flags = SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC;
        let family = match &self.endpoint {
            ListenEndpoint::Unix(_) => AddressFamily::Unix,
            ListenEndpoint::Inet(SocketAddr::V4(_)) => AddressFamily::Inet,
            ListenEndpoint::Inet(SocketAddr::V6(_)) => AddressFamily::Inet6,
        };

        log::debug!("create socket, family: {:?}, listen: {}", family, listen);
        let fd = socket::socket(family, SockType::Stream, flags, None)
            .context(SocketSnafu { listen: &listen })?;

        if let Err(e) = self.bind_listen(fd, backlog) {
            fd_util::close(fd);
            return Err(e);
        }

        log::debug!("Successfully opened socket {}", listen);
        *self.fd.borrow_mut() = fd;
        Ok(fd)
    }

    fn bind_listen(&self, fd: RawFd, backlog: usize) -> Result<()> {
        let listen = self.endpoint.to_string();
        match &self.endpoint {
            ListenEndpoint::Unix(path) => {
                self.unlink();
                let addr = UnixAddr::new(path).context(BindSnafu { listen: &listen })?;
                socket::bind(fd, &addr).context(BindSnafu { listen: &listen })?;
            }
            ListenEndpoint::Inet(addr) => {
                socket::setsockopt(fd, ReuseAddr, &true).context(SocketSnafu { listen: &listen })?;
                let sock_addr: Box<dyn SockaddrLike> = match addr {
                    SocketAddr::V4(addr) => Box::new(SockaddrIn::from(*addr)),
                    SocketAddr::V6(addr) => Box::new(SockaddrIn6::from(*addr)),
                };
                socket::bind(fd, &*sock_addr).context(BindSnafu { listen: &listen })?;
            }
        }

        socket::listen(fd, backlog).context(ListenSnafu { listen: &listen })
    }

    /// Accept one pending connection. None when nothing is pending.
    pub fn accept(&self) -> std::result::Result<Option<RawFd>, nix::Error> {
        match socket::accept4(self.fd(), SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC) {
            Ok(fd) => Ok(Some(fd)),
            Err(Errno::EAGAIN) | Err(Errno::EINTR) | Err(Errno::ECONNABORTED) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// the bound port of a network socket
    pub fn local_port(&self) -> Option<u16> {
        let addr: SockaddrStorage = socket::getsockname(self.fd()).ok()?;
        if let Some(v4) = addr.as_sockaddr_in() {
            return Some(v4.port());
        }
        addr.as_sockaddr_in6().map(|v6| v6.port())
    }

    /// Close the socket and remove the path of a local socket.
    pub fn close(&self) {
        if self.fd() < 0 {
            return;
        }

        fd_util::close(self.fd());
        self.unlink();
        log::debug!("Successfully closed socket {}", self.endpoint);
        *self.fd.borrow_mut() = INVALID_FD;
    }

    fn unlink(&self) {
        if let ListenEndpoint::Unix(path) = &self.endpoint {
            match std::fs::remove_file(path) {
                Ok(_) => log::debug!("unlink path: {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Unable to unlink {:?}, error: {}", path, e),
            }
        }
    }
}

impl Drop for SocketPort {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpStream;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            ListenEndpoint::parse("/run/echo.sock").unwrap(),
            ListenEndpoint::Unix(PathBuf::from("/run/echo.sock"))
        );
        assert_eq!(
            ListenEndpoint::parse("8080").unwrap(),
            ListenEndpoint::Inet("0.0.0.0:8080".parse().unwrap())
        );
        assert_eq!(
            ListenEndpoint::parse("127.0.0.1:9000").unwrap(),
            ListenEndpoint::Inet("127.0.0.1:9000".parse().unwrap())
        );
        assert_eq!(
            ListenEndpoint::parse("[::1]:9000").unwrap(),
            ListenEndpoint::Inet("[::1]:9000".parse().unwrap())
        );
        assert!(ListenEndpoint::parse("0").is_err());
        assert!(ListenEndpoint::parse("").is_err());
        assert!(ListenEndpoint::parse("localhost:80").is_err());
    }

    #[test]
    fn test_unix_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("port.sock");
        /* a stale file is replaced */
        std::fs::write(&path, b"stale").unwrap();

        let port = SocketPort::new(ListenEndpoint::Unix(path.clone()));
        let fd = port.open(16).unwrap();
        assert!(fd >= 0);
        assert_eq!(port.open(16).unwrap(), fd);
        assert_eq!(port.accept().unwrap(), None);

        let _client = UnixStream::connect(&path).unwrap();
        let conn = port.accept().unwrap().unwrap();
        fd_util::close(conn);

        port.close();
        assert_eq!(port.fd(), INVALID_FD);
        assert!(!path.exists());
    }

    #[test]
    fn test_inet_port() {
        let port = SocketPort::new(ListenEndpoint::parse("127.0.0.1:0").unwrap());
        port.open(16).unwrap();
        let number = port.local_port().unwrap();
        assert_ne!(number, 0);

        let _client = TcpStream::connect(("127.0.0.1", number)).unwrap();
        let conn = port.accept().unwrap().unwrap();
        fd_util::close(conn);
    }

    #[test]
    fn test_bind_failure() {
        let port = SocketPort::new(ListenEndpoint::Unix(PathBuf::from(
            "/nonexistent/coreinit/port.sock",
        )));
        assert!(matches!(port.open(16), Err(BindError::Bind { .. })));
        assert_eq!(port.fd(), INVALID_FD);
    }
}
