//! Raw DNS over UDP with TCP fallback on truncation, built directly on
//! `hickory-proto` wire encode/decode rather than `hickory-resolver`, so the
//! host OS resolver configuration is never consulted (§4.1).

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable, BinEncoder};
use netenrich_application::{ResolveError, ResolvedAnswer, Resolver};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Stub resolver that rotates across configured upstreams by atomic
/// post-increment, one dial per `resolve()` call (§4.1).
pub struct RoundRobinResolver {
    servers: Vec<SocketAddr>,
    next: AtomicUsize,
}

impl RoundRobinResolver {
    pub fn new(servers: Vec<SocketAddr>) -> Self {
        Self {
            servers,
            next: AtomicUsize::new(0),
        }
    }

    fn pick_server(&self) -> SocketAddr {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.servers.len();
        self.servers[idx]
    }

    fn build_query(domain: &str, record_type: RecordType) -> Result<(u16, Vec<u8>), ResolveError> {
        let name = Name::from_str(domain)
            .map_err(|e| ResolveError::Other(format!("invalid domain name '{domain}': {e}")))?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(record_type);
        query.set_query_class(DNSClass::IN);

        let id = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos()) as u16;

        let mut message = Message::new(id, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        message
            .emit(&mut encoder)
            .map_err(|e| ResolveError::Other(format!("failed to encode DNS query: {e}")))?;
        Ok((id, buf))
    }

    async fn send_udp(
        server: SocketAddr,
        query_bytes: &[u8],
    ) -> Result<Vec<u8>, ResolveError> {
        let bind_addr: SocketAddr = if server.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| ResolveError::Other(format!("failed to bind UDP socket: {e}")))?;

        timeout(CONNECT_TIMEOUT, socket.connect(server))
            .await
            .map_err(|_| ResolveError::Timeout)?
            .map_err(|e| ResolveError::Other(format!("failed to connect to {server}: {e}")))?;

        socket
            .send(query_bytes)
            .await
            .map_err(|e| ResolveError::Other(format!("failed to send query to {server}: {e}")))?;

        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let n = socket
            .recv(&mut buf)
            .await
            .map_err(|e| ResolveError::Other(format!("failed to receive from {server}: {e}")))?;
        buf.truncate(n);
        Ok(buf)
    }

    async fn send_tcp(server: SocketAddr, query_bytes: &[u8]) -> Result<Vec<u8>, ResolveError> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(server))
            .await
            .map_err(|_| ResolveError::Timeout)?
            .map_err(|e| ResolveError::Other(format!("failed to connect to {server}: {e}")))?;

        let len = (query_bytes.len() as u16).to_be_bytes();
        stream
            .write_all(&len)
            .await
            .map_err(|e| ResolveError::Other(format!("failed to write to {server}: {e}")))?;
        stream
            .write_all(query_bytes)
            .await
            .map_err(|e| ResolveError::Other(format!("failed to write to {server}: {e}")))?;

        let mut len_buf = [0u8; 2];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| ResolveError::Other(format!("failed to read from {server}: {e}")))?;
        let resp_len = u16::from_be_bytes(len_buf) as usize;

        let mut resp = vec![0u8; resp_len];
        stream
            .read_exact(&mut resp)
            .await
            .map_err(|e| ResolveError::Other(format!("failed to read from {server}: {e}")))?;
        Ok(resp)
    }

    fn extract_addresses(bytes: &[u8]) -> Result<(Vec<IpAddr>, bool), ResolveError> {
        let message = Message::from_bytes(bytes)
            .map_err(|e| ResolveError::Other(format!("failed to decode DNS response: {e}")))?;

        match message.response_code() {
            ResponseCode::NoError => {}
            ResponseCode::NXDomain => return Err(ResolveError::Nxdomain),
            ResponseCode::ServFail => return Err(ResolveError::ServFail),
            ResponseCode::Refused => return Err(ResolveError::Refused),
            other => {
                return Err(ResolveError::Other(format!(
                    "unexpected response code {other}"
                )))
            }
        }

        let truncated = message.truncated();
        let mut addresses = Vec::with_capacity(message.answer_count() as usize);
        for record in message.answers() {
            match record.data() {
                RData::A(a) => addresses.push(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) => addresses.push(IpAddr::V6(aaaa.0)),
                _ => {}
            }
        }
        Ok((addresses, truncated))
    }

    async fn query_one(
        server: SocketAddr,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<IpAddr>, ResolveError> {
        let (_id, query_bytes) = Self::build_query(domain, record_type)?;
        let response = Self::send_udp(server, &query_bytes).await?;
        let (addresses, truncated) = Self::extract_addresses(&response)?;
        if truncated {
            debug!(%server, %domain, "UDP response truncated, retrying over TCP");
            let response = Self::send_tcp(server, &query_bytes).await?;
            let (addresses, _truncated) = Self::extract_addresses(&response)?;
            return Ok(addresses);
        }
        Ok(addresses)
    }
}

#[async_trait]
impl Resolver for RoundRobinResolver {
    async fn resolve(
        &self,
        hostname: &str,
        prefer_ipv6: bool,
    ) -> Result<ResolvedAnswer, ResolveError> {
        if self.servers.is_empty() {
            return Err(ResolveError::Other("no upstream servers configured".into()));
        }
        let server = self.pick_server();
        debug!(%server, %hostname, "dialing upstream");

        let mut addresses = Self::query_one(server, hostname, RecordType::A).await?;

        if prefer_ipv6 {
            match Self::query_one(server, hostname, RecordType::AAAA).await {
                Ok(mut v6) => addresses.append(&mut v6),
                Err(ResolveError::Nxdomain) if !addresses.is_empty() => {}
                Err(err) if addresses.is_empty() => return Err(err),
                Err(_) => {}
            }
        }

        Ok(ResolvedAnswer {
            addresses,
            server: server.to_string(),
        })
    }
}
