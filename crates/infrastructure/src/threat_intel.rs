//! Secondary threat-intel resolver probe (§4.5). Quad9 synthesizes NXDOMAIN
//! with RA=0 for domains it blocks, whereas a genuine NXDOMAIN carries RA=1;
//! that two-bit pattern is the sole discriminator.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable, BinEncoder};
use netenrich_application::ThreatIntelProbe;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

const QUAD9: &str = "9.9.9.9:53";

pub struct Quad9Probe {
    server: SocketAddr,
}

impl Default for Quad9Probe {
    fn default() -> Self {
        Self {
            server: QUAD9.parse().expect("Quad9 address is a valid literal"),
        }
    }
}

impl Quad9Probe {
    pub fn new(server: SocketAddr) -> Self {
        Self { server }
    }

    async fn query(&self, domain: &str, timeout_budget: Duration) -> Result<(ResponseCode, bool), ()> {
        let name = Name::from_str(domain).map_err(|_| ())?;
        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(RecordType::A);
        query.set_query_class(DNSClass::IN);

        let mut message = Message::new(0, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        message.emit(&mut encoder).map_err(|_| ())?;

        let bind_addr: SocketAddr = if self.server.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(bind_addr).await.map_err(|_| ())?;
        timeout(timeout_budget, socket.connect(self.server))
            .await
            .map_err(|_| ())?
            .map_err(|_| ())?;

        timeout(timeout_budget, socket.send(&buf))
            .await
            .map_err(|_| ())?
            .map_err(|_| ())?;

        let mut recv_buf = vec![0u8; 512];
        let n = timeout(timeout_budget, socket.recv(&mut recv_buf))
            .await
            .map_err(|_| ())?
            .map_err(|_| ())?;
        recv_buf.truncate(n);

        let response = Message::from_bytes(&recv_buf).map_err(|_| ())?;
        Ok((response.response_code(), response.recursion_available()))
    }
}

#[async_trait]
impl ThreatIntelProbe for Quad9Probe {
    async fn check_malicious_domain(
        &self,
        domain: &str,
        primary_resolved: bool,
        timeout: Duration,
    ) -> bool {
        if !primary_resolved {
            return false;
        }

        match self.query(domain, timeout).await {
            Ok((rcode, recursion_available)) => {
                let blocked = rcode == ResponseCode::NXDomain && !recursion_available;
                debug!(%domain, ?rcode, recursion_available, blocked, "threat-intel probe result");
                blocked
            }
            Err(()) => false,
        }
    }
}
