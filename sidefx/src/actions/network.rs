// ABOUTME: executes the NetworkWrite action: dial, write the payload once, close.
// ABOUTME: no reply is read; the local address bound for the connection is logged.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use sidefx_common::{NetworkWriteAction, Protocol, Transport};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tracing::info;

use crate::errors::FatalError;

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

/// Local side of a connection, captured before the connection is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEndpoint {
    pub address: String,
    pub port: u16,
    /// IPv6 scope id, empty when there is none.
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReport {
    pub local: LocalEndpoint,
    pub n_written: usize,
    pub n_requested: usize,
}

impl LocalEndpoint {
    fn from_socket_addr(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => LocalEndpoint {
                address: v4.ip().to_string(),
                port: v4.port(),
                zone: String::new(),
            },
            SocketAddr::V6(v6) => LocalEndpoint {
                address: v6.ip().to_string(),
                port: v6.port(),
                zone: match v6.scope_id() {
                    0 => String::new(),
                    id => id.to_string(),
                },
            },
        }
    }
}

impl fmt::Display for LocalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.address.contains(':'), self.zone.is_empty()) {
            (false, _) => write!(f, "{}:{}", self.address, self.port),
            (true, true) => write!(f, "[{}]:{}", self.address, self.port),
            (true, false) => write!(f, "[{}%{}]:{}", self.address, self.zone, self.port),
        }
    }
}

impl Connection {
    fn local_endpoint(&self) -> std::io::Result<LocalEndpoint> {
        let addr = match self {
            Connection::Tcp(stream) => stream.local_addr()?,
            Connection::Udp(socket) => socket.local_addr()?,
        };
        Ok(LocalEndpoint::from_socket_addr(addr))
    }

    async fn write_once(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match self {
            Connection::Tcp(stream) => stream.write(data).await,
            Connection::Udp(socket) => socket.send(data).await,
        }
    }

    async fn close(self) {
        match self {
            Connection::Tcp(mut stream) => {
                let _ = stream.shutdown().await;
            }
            Connection::Udp(_) => {}
        }
    }
}

pub async fn write(net: &NetworkWriteAction) -> Result<NetworkReport, FatalError> {
    let protocol: Protocol = net.protocol.parse()?;

    let dial_error = |source| FatalError::Dial {
        protocol: net.protocol.clone(),
        host: net.host.clone(),
        port: net.port,
        source,
    };

    let mut conn = match tokio::time::timeout(DIAL_TIMEOUT, dial(protocol, &net.host, net.port)).await {
        Ok(res) => res.map_err(dial_error)?,
        Err(_) => return Err(dial_error(timed_out("dial"))),
    };

    // Read before close; the address may not survive it.
    let local = conn.local_endpoint().map_err(dial_error)?;

    let data = net.data.as_bytes();
    let written = match tokio::time::timeout(WRITE_TIMEOUT, conn.write_once(data)).await {
        Ok(res) => res,
        Err(_) => Err(timed_out("write")),
    };
    let n_written = written.map_err(|source| FatalError::NetworkWrite {
        protocol: net.protocol.clone(),
        host: net.host.clone(),
        port: net.port,
        local: local.to_string(),
        source,
    })?;

    conn.close().await;

    info!(
        action = "NetworkWrite",
        host = %net.host,
        port = net.port,
        protocol = %protocol,
        local_address = %local.address,
        local_port = local.port,
        local_zone = %local.zone,
        n_written,
        n_requested = data.len(),
        short_write = n_written < data.len(),
        "NetworkWrite"
    );

    Ok(NetworkReport {
        local,
        n_written,
        n_requested: data.len(),
    })
}

async fn dial(protocol: Protocol, host: &str, port: u16) -> std::io::Result<Connection> {
    let resolved: Vec<SocketAddr> = if host.is_empty() {
        // An empty host means the local system.
        vec![(Ipv4Addr::LOCALHOST, port).into(), (Ipv6Addr::LOCALHOST, port).into()]
    } else {
        tokio::net::lookup_host((host, port)).await?.collect()
    };
    let candidates: Vec<SocketAddr> = resolved.into_iter().filter(|addr| protocol.accepts(addr)).collect();

    let Some(first) = candidates.first().copied() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no {protocol} address found for {host}"),
        ));
    };

    match protocol.transport() {
        Transport::Tcp => {
            let mut last_err = None;
            for addr in candidates {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Ok(Connection::Tcp(stream)),
                    Err(err) => last_err = Some(err),
                }
            }
            Err(last_err.unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected)))
        }
        Transport::Udp => {
            let bind: SocketAddr = if first.is_ipv4() {
                (Ipv4Addr::UNSPECIFIED, 0).into()
            } else {
                (Ipv6Addr::UNSPECIFIED, 0).into()
            };
            let socket = UdpSocket::bind(bind).await?;
            socket.connect(first).await?;
            Ok(Connection::Udp(socket))
        }
    }
}

fn timed_out(what: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("{what} timed out"),
    )
}
