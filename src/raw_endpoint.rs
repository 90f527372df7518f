/// Raw endpoint codec - `host:port` text for raw mode
///
/// Raw mode only speaks IPv4 on the way out. Incoming IPv6 peers are
/// rendered in the bracketed standard form, which `parse` rejects.
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::errors::AddressFormatError;

pub struct RawEndpoint;

impl RawEndpoint {
    /// Render an IPv4 peer as `A.B.C.D:port`
    pub fn format_v4(addr: &SocketAddrV4) -> String {
        format!("{}:{}", addr.ip(), addr.port())
    }

    /// Render any peer address for the synthesized group segment
    pub fn format(addr: &SocketAddr) -> String {
        match addr {
            SocketAddr::V4(v4) => Self::format_v4(v4),
            SocketAddr::V6(v6) => v6.to_string(),
        }
    }

    /// Parse `A.B.C.D:port` into a destination address
    ///
    /// The separator is the last colon in the text. Port 0 is invalid.
    pub fn parse(text: &[u8]) -> Result<SocketAddrV4, AddressFormatError> {
        let lossy = || String::from_utf8_lossy(text).into_owned();

        let Some(colon) = text.iter().rposition(|&b| b == b':') else {
            return Err(AddressFormatError::MissingPort(lossy()));
        };
        let (host, port) = (&text[..colon], &text[colon + 1..]);

        let port = std::str::from_utf8(port)
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
            .filter(|&port| port != 0)
            .ok_or_else(|| AddressFormatError::InvalidPort(lossy()))?;

        let host = std::str::from_utf8(host)
            .ok()
            .and_then(|host| host.parse::<Ipv4Addr>().ok())
            .ok_or_else(|| AddressFormatError::InvalidHost(lossy()))?;

        Ok(SocketAddrV4::new(host, port))
    }
}
