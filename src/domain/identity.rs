//! Client identity derivation.
//!
//! The identity is the rate-limit key for a requester. Behind reverse
//! proxies the connection peer is the proxy itself, so the real origin is
//! read from the `X-Forwarded-For` chain, trusting only the entries the
//! configured number of proxies appended.

use std::fmt;
use std::net::IpAddr;

/// Rate-limit key derived from the network origin of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Create an identity from an already-derived origin string.
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    /// Identity of a direct connection peer.
    pub fn from_peer(peer: IpAddr) -> Self {
        Self(peer.to_string())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives client identities for a fixed number of trusted proxy hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentityResolver {
    trusted_hops: usize,
}

impl IdentityResolver {
    /// Resolver trusting `trusted_hops` reverse proxies in front of the service.
    pub fn new(trusted_hops: usize) -> Self {
        Self { trusted_hops }
    }

    /// Number of trusted proxy hops.
    pub fn trusted_hops(&self) -> usize {
        self.trusted_hops
    }

    /// Resolve the identity for a request.
    ///
    /// With zero trusted hops the peer address is used as-is. Otherwise the
    /// entry `trusted_hops` positions from the end of the forwarded list is
    /// selected, clamped to the first entry. A missing header or an empty
    /// selected entry falls back to the peer address.
    pub fn resolve(&self, peer: IpAddr, forwarded_for: Option<&str>) -> ClientIdentity {
        if self.trusted_hops == 0 {
            return ClientIdentity::from_peer(peer);
        }

        let Some(header) = forwarded_for else {
            return ClientIdentity::from_peer(peer);
        };

        let parts: Vec<&str> = header.split(',').collect();
        let index = parts.len().saturating_sub(self.trusted_hops);

        match parts.get(index).map(|part| part.trim()) {
            Some(origin) if !origin.is_empty() => ClientIdentity::new(origin),
            _ => ClientIdentity::from_peer(peer),
        }
    }
}
