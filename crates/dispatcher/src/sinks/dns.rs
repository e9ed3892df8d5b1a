//! DnsForwardSink - replays wire-format queries to DNS servers
//!
//! Every write opens a fresh socket per destination. All destinations are
//! attempted; the failures are reported together.

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use contracts::{ContractError, RecordSink};
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::{debug, instrument, warn};

/// Default DNS port
pub const DNS_PORT: u16 = 53;

/// Per-destination connect and send timeout
pub const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport used for one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    /// Two-byte length prefix framing
    Tcp,
}

/// Replay destination, `[udp://|tcp://]host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
}

impl FromStr for Destination {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (transport, rest) = if let Some(rest) = s.strip_prefix("tcp://") {
            (Transport::Tcp, rest)
        } else if let Some(rest) = s.strip_prefix("udp://") {
            (Transport::Udp, rest)
        } else {
            (Transport::Udp, s)
        };

        let invalid = |message: &str| {
            ContractError::config_validation("servers", format!("invalid server `{s}`: {message}"))
        };

        let (host, port) = if let Ok(addr) = rest.parse::<SocketAddr>() {
            (addr.ip().to_string(), addr.port())
        } else if let Ok(ip) = rest.parse::<IpAddr>() {
            (ip.to_string(), DNS_PORT)
        } else if let Some((host, port)) = rest.rsplit_once(':') {
            let port = port.parse::<u16>().map_err(|_| invalid("bad port"))?;
            (host.to_string(), port)
        } else {
            (rest.to_string(), DNS_PORT)
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        Ok(Self {
            transport,
            host,
            port,
        })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.transport {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
        };
        match self.host.parse::<Ipv6Addr>() {
            Ok(_) => write!(f, "{scheme}://[{}]:{}", self.host, self.port),
            Err(_) => write!(f, "{scheme}://{}:{}", self.host, self.port),
        }
    }
}

/// Sink that sends each payload to every configured DNS server
pub struct DnsForwardSink {
    name: String,
    destinations: Vec<Destination>,
}

impl DnsForwardSink {
    /// Parse the destination list
    pub fn new(name: impl Into<String>, servers: &[String]) -> Result<Self, ContractError> {
        let destinations = servers
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<Destination>, _>>()?;
        if destinations.is_empty() {
            return Err(ContractError::config_validation(
                "servers",
                "dns output needs at least one server",
            ));
        }
        Ok(Self {
            name: name.into(),
            destinations,
        })
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    async fn send(destination: &Destination, payload: &[u8]) -> io::Result<usize> {
        tokio::time::timeout(SEND_TIMEOUT, Self::send_inner(destination, payload))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out"))?
    }

    async fn send_inner(destination: &Destination, payload: &[u8]) -> io::Result<usize> {
        let addr = lookup_host((destination.host.as_str(), destination.port))
            .await?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address for host"))?;

        match destination.transport {
            Transport::Udp => {
                let socket = UdpSocket::bind(unspecified(&addr)).await?;
                socket.connect(addr).await?;
                socket.send(payload).await
            }
            Transport::Tcp => {
                let len = u16::try_from(payload.len()).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "message too large for tcp")
                })?;
                let mut stream = TcpStream::connect(addr).await?;
                stream.write_all(&len.to_be_bytes()).await?;
                stream.write_all(payload).await?;
                stream.shutdown().await?;
                Ok(payload.len())
            }
        }
    }
}

fn unspecified(peer: &SocketAddr) -> SocketAddr {
    let ip = match peer {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, 0)
}

impl RecordSink for DnsForwardSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "dns_sink_write",
        skip(self, payload),
        fields(sink = %self.name, bytes = payload.len())
    )]
    async fn write(&mut self, payload: &[u8]) -> Result<usize, ContractError> {
        let mut failures = Vec::new();
        for destination in &self.destinations {
            match Self::send(destination, payload).await {
                Ok(sent) => debug!(%destination, bytes = sent, "query forwarded"),
                Err(e) => {
                    warn!(%destination, error = %e, "query forward failed");
                    failures.push(format!("{destination}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            Ok(payload.len())
        } else {
            Err(ContractError::ForwardFailed {
                sink_name: self.name.clone(),
                total: self.destinations.len(),
                failures,
            })
        }
    }

    #[instrument(name = "dns_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Sockets live for one write
        Ok(())
    }

    #[instrument(name = "dns_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "DnsForwardSink closed");
        Ok(())
    }
}
