use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while dispatching a payload to the target.
///
/// Send failures are transient by contract: the fuzzing loop skips the
/// payload, logs the event, and continues.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("failed to resolve target {address}:{port}")]
    Unresolvable { address: String, port: u16 },
    #[error("packet dispatch to {address}:{port} failed: {source}")]
    Dispatch {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Delivers raw payload bytes to a destination. The core treats the wire as
/// an external collaborator; implementations decide transport details.
pub trait PacketSender: Send + Sync {
    fn send(&self, address: &str, port: u16, payload: &[u8]) -> Result<(), SendError>;
}

/// Default timeout for connecting to the target.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// A `PacketSender` that opens a fresh TCP connection per payload and writes
/// the bytes. One connection per payload keeps crash attribution clean: the
/// target sees each candidate in isolation.
#[derive(Debug, Clone)]
pub struct TcpPacketSender {
    connect_timeout: Duration,
}

impl TcpPacketSender {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpPacketSender {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketSender for TcpPacketSender {
    fn send(&self, address: &str, port: u16, payload: &[u8]) -> Result<(), SendError> {
        let socket_addr = (address, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| SendError::Unresolvable {
                address: address.to_string(),
                port,
            })?;

        let mut stream = TcpStream::connect_timeout(&socket_addr, self.connect_timeout)
            .map_err(|source| SendError::Dispatch {
                address: address.to_string(),
                port,
                source,
            })?;
        stream
            .write_all(payload)
            .map_err(|source| SendError::Dispatch {
                address: address.to_string(),
                port,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn tcp_sender_delivers_payload_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let accept_handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).unwrap();
            received
        });

        let sender = TcpPacketSender::new();
        sender
            .send("127.0.0.1", port, b"GET / HTTP/1.1\r\n")
            .expect("send to local listener failed");

        assert_eq!(accept_handle.join().unwrap(), b"GET / HTTP/1.1\r\n".to_vec());
    }

    #[test]
    fn connection_refused_is_a_dispatch_error() {
        // Bind then drop to get a port nothing is listening on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let sender = TcpPacketSender::with_timeout(Duration::from_millis(200));
        match sender.send("127.0.0.1", port, b"x") {
            Err(SendError::Dispatch { .. }) => {}
            other => panic!("expected Dispatch error, got {other:?}"),
        }
    }

    #[test]
    fn unresolvable_host_is_reported_as_such() {
        let sender = TcpPacketSender::with_timeout(Duration::from_millis(200));
        match sender.send("host.invalid.", 80, b"x") {
            Err(SendError::Unresolvable { .. }) | Err(SendError::Dispatch { .. }) => {}
            Ok(()) => panic!("send to invalid host should not succeed"),
        }
    }
}
