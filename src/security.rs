use std::net::{IpAddr, SocketAddr};

use rocket::http::HeaderMap;
use rocket::request::{FromRequest, Outcome, Request};
use sha2::{Digest, Sha256};

/// Proxy headers consulted before the socket peer, most trusted first.
/// X-Forwarded-For contributes only its leftmost entry.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "CF-Connecting-IP",
    "True-Client-IP",
    "X-Real-IP",
    "X-Forwarded-For",
];

/// Network identity of the caller, used as a rate limit key.
pub struct ClientIp(pub IpAddr);

impl ClientIp {
    /// Stable, non-reversible key for this caller.
    pub fn hashed(&self) -> String {
        hash_ip(&self.0.to_string())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_client_ip(request.headers(), request.client_ip()) {
            Some(ip) => Outcome::Success(ClientIp(ip)),
            // No header and no socket peer (local dispatch): everyone shares one bucket
            None => Outcome::Success(ClientIp(IpAddr::from([0, 0, 0, 0]))),
        }
    }
}

/// First header value that parses as an address wins; unparseable values are
/// skipped so arbitrary header text can't mint fresh rate limit keys.
pub fn resolve_client_ip(headers: &HeaderMap<'_>, peer: Option<IpAddr>) -> Option<IpAddr> {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get_one(name))
        .filter_map(|value| parse_ip(value.split(',').next().unwrap_or_default()))
        .next()
        .or(peer)
        .map(|ip| ip.to_canonical())
}

/// Accepts a bare address or `addr:port` / `[v6]:port`.
fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value.trim();
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|s| s.ip()))
}

pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}
