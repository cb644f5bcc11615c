//! Address resolution and stream transports for the relay connection.
//!
//! A relay address is either a filesystem path (Unix domain stream socket)
//! or a `tcp://host:port` target. Resolution is purely syntactic; opening
//! the stream is a separate step so the reconnect supervisor can re-resolve
//! cheaply on every attempt.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, tcp, unix, TcpStream, UnixStream};
use tracing::{debug, warn};

/// A resolved relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain stream socket at the given filesystem path.
    Local(PathBuf),
    /// TCP target. The host may be a numeric address or a name.
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    /// Resolve an address string into an endpoint.
    ///
    /// `tcp://<host>:<port>` produces a TCP target; the *last* colon is the
    /// host/port separator, so hosts containing colons before the final one
    /// are tolerated. Anything else is treated as a local socket path.
    ///
    /// A `tcp://` string without a usable `host:port` tail also falls back
    /// to the local-path interpretation (with a warning), matching the
    /// relay's historical lenient behavior. No I/O happens here.
    pub fn parse(address: &str) -> Self {
        if let Some(target) = address.strip_prefix("tcp://") {
            if let Some((host, port)) = target.rsplit_once(':') {
                if !host.is_empty() {
                    if let Ok(port) = port.parse::<u16>() {
                        return Endpoint::Tcp {
                            host: host.to_owned(),
                            port,
                        };
                    }
                }
            }
            warn!(
                "address {:?} looks like a TCP target but has no valid host:port; \
                 treating it as a local socket path",
                address
            );
        }

        Endpoint::Local(PathBuf::from(address))
    }

    /// Open a stream to this endpoint and split it into owned halves.
    ///
    /// TCP hosts are tried as numeric addresses first, then through name
    /// resolution; the first resolved address is used. On failure no socket
    /// is left open.
    pub async fn connect(&self) -> io::Result<(StreamReader, StreamWriter)> {
        match self {
            Endpoint::Local(path) => {
                let stream = UnixStream::connect(path).await?;
                let (read_half, write_half) = stream.into_split();
                Ok((
                    StreamReader::Local(read_half),
                    StreamWriter::Local(write_half),
                ))
            }
            Endpoint::Tcp { host, port } => {
                let addr = match host.parse::<IpAddr>() {
                    Ok(ip) => SocketAddr::new(ip, *port),
                    Err(_) => {
                        debug!("resolving relay host {:?}", host);
                        lookup_host((host.as_str(), *port))
                            .await?
                            .next()
                            .ok_or_else(|| {
                                io::Error::new(
                                    io::ErrorKind::NotFound,
                                    format!("no addresses resolved for {host}"),
                                )
                            })?
                    }
                };
                let stream = TcpStream::connect(addr).await?;
                let (read_half, write_half) = stream.into_split();
                Ok((
                    StreamReader::Tcp(read_half),
                    StreamWriter::Tcp(write_half),
                ))
            }
        }
    }
}

/// Read half of a relay stream, independent of the underlying transport.
#[derive(Debug)]
pub enum StreamReader {
    Local(unix::OwnedReadHalf),
    Tcp(tcp::OwnedReadHalf),
}

impl StreamReader {
    /// Read a chunk of bytes. Returns `Ok(0)` on end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StreamReader::Local(r) => r.read(buf).await,
            StreamReader::Tcp(r) => r.read(buf).await,
        }
    }
}

/// Write half of a relay stream, independent of the underlying transport.
#[derive(Debug)]
pub enum StreamWriter {
    Local(unix::OwnedWriteHalf),
    Tcp(tcp::OwnedWriteHalf),
}

impl StreamWriter {
    /// Write an entire buffer, flushing afterwards.
    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            StreamWriter::Local(w) => {
                w.write_all(bytes).await?;
                w.flush().await
            }
            StreamWriter::Tcp(w) => {
                w.write_all(bytes).await?;
                w.flush().await
            }
        }
    }

}
