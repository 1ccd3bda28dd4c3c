//! Network writers for remote logging
//!
//! `tcp://host:port` sends newline-terminated records over one connection,
//! reconnecting once when a write fails. `udp://host:port` sends one
//! datagram per record. Both report into a shared [`NetworkStats`] owned by
//! the logger.

use super::writer::{DestinationKind, SinkWriter};
use crate::core::{LoggerError, NetworkStats, Record, Result};
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

fn connect(address: &str) -> Result<TcpStream> {
    let network_err = |e: std::io::Error| LoggerError::network(address, e.to_string());

    let socket_addr = address
        .to_socket_addrs()
        .map_err(network_err)?
        .next()
        .ok_or_else(|| LoggerError::network(address, "address did not resolve"))?;

    let stream = TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT).map_err(network_err)?;
    stream
        .set_write_timeout(Some(WRITE_TIMEOUT))
        .map_err(network_err)?;
    stream.set_nodelay(true).map_err(network_err)?;
    Ok(stream)
}

/// TCP writer
pub struct TcpWriter {
    address: String,
    name: String,
    stream: Option<TcpStream>,
    stats: Arc<NetworkStats>,
}

impl TcpWriter {
    /// Connect to `address` (`host:port`)
    pub fn connect(address: impl Into<String>, stats: Arc<NetworkStats>) -> Result<Self> {
        let address = address.into();
        let stream = connect(&address)?;
        Ok(Self {
            name: format!("tcp://{}", address),
            address,
            stream: Some(stream),
            stats,
        })
    }

    fn send(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.write_all(bytes),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "stream not connected",
            )),
        }
    }
}

impl SinkWriter for TcpWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let first = match self.send(bytes) {
            Ok(()) => {
                self.stats.record_sent(bytes.len());
                return Ok(());
            }
            Err(e) => e,
        };

        // Connection lost: one reconnect, one resend
        self.stream = None;
        self.stats.record_error();
        match connect(&self.address) {
            Ok(stream) => {
                self.stats.record_reconnect();
                self.stream = Some(stream);
                self.send(bytes).map_err(|e| {
                    self.stats.record_error();
                    LoggerError::network(&self.address, format!("resend failed: {}", e))
                })?;
                self.stats.record_sent(bytes.len());
                Ok(())
            }
            Err(reconnect) => Err(LoggerError::network(
                &self.address,
                format!("send failed: {} (reconnect: {})", first, reconnect),
            )),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.as_mut() {
            stream
                .flush()
                .map_err(|e| LoggerError::network(&self.address, e.to_string()))?;
        }
        Ok(())
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::Network
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// UDP writer; one datagram per record
pub struct UdpWriter {
    address: String,
    name: String,
    socket: UdpSocket,
    stats: Arc<NetworkStats>,
}

impl UdpWriter {
    pub fn connect(address: impl Into<String>, stats: Arc<NetworkStats>) -> Result<Self> {
        let address = address.into();
        let network_err = |e: std::io::Error| LoggerError::network(&address, e.to_string());

        let socket = UdpSocket::bind("0.0.0.0:0").map_err(network_err)?;
        socket.connect(&address).map_err(network_err)?;
        socket
            .set_write_timeout(Some(WRITE_TIMEOUT))
            .map_err(network_err)?;

        Ok(Self {
            name: format!("udp://{}", address),
            address,
            socket,
            stats,
        })
    }
}

impl SinkWriter for UdpWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        // Buffered chunks arrive newline-separated; keep one record per datagram
        for datagram in bytes.split_inclusive(|&b| b == b'\n') {
            self.send_datagram(datagram)?;
        }
        Ok(())
    }

    fn write_record(&mut self, _record: &Record, bytes: &[u8]) -> Result<()> {
        self.send_datagram(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::Network
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl UdpWriter {
    fn send_datagram(&self, datagram: &[u8]) -> Result<()> {
        match self.socket.send(datagram) {
            Ok(_) => {
                self.stats.record_sent(datagram.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_error();
                Err(LoggerError::network(&self.address, e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    #[test]
    fn test_tcp_connect_refused() {
        // Bind then drop to get a port with no listener
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let stats = Arc::new(NetworkStats::new());

        let result = TcpWriter::connect(format!("127.0.0.1:{}", port), stats);
        assert!(matches!(result, Err(LoggerError::NetworkError { .. })));
    }

    #[test]
    fn test_tcp_delivers_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let stats = Arc::new(NetworkStats::new());

        let reader = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).unwrap();
            line
        });

        let mut writer = TcpWriter::connect(address, Arc::clone(&stats)).unwrap();
        writer.write_all(b"remote hello\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(reader.join().unwrap(), "remote hello\n");
        assert_eq!(stats.messages_sent(), 1);
        assert_eq!(stats.bytes_sent(), 13);
        assert_eq!(writer.kind(), DestinationKind::Network);
    }

    #[test]
    fn test_udp_one_datagram_per_record() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let address = receiver.local_addr().unwrap().to_string();
        let stats = Arc::new(NetworkStats::new());

        let mut writer = UdpWriter::connect(address, Arc::clone(&stats)).unwrap();
        let record = Record::new(LogLevel::Info, "ping");
        writer.write_record(&record, b"ping\n").unwrap();
        writer.write_all(b"a\nb\n").unwrap();

        let mut buf = [0u8; 64];
        let mut received = Vec::new();
        for _ in 0..3 {
            let n = receiver.recv(&mut buf).unwrap();
            received.push(String::from_utf8_lossy(&buf[..n]).to_string());
        }
        assert_eq!(received, vec!["ping\n", "a\n", "b\n"]);
        assert_eq!(stats.messages_sent(), 3);
    }
}
