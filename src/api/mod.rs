//! redirect.pizza API integration module.
//!
//! This module provides the wire codec and the HTTP client used to create,
//! fetch, replace and delete redirects on the remote service.

mod client;
mod codec;
mod types;

pub use client::{
    default_user_agent, ClientConfig, RedirectApi, RedirectClient, DEFAULT_BASE_URL,
    DEFAULT_TIMEOUT_SECS,
};
#[cfg(test)]
pub use client::MockRedirectApi;
pub use codec::{decode, decode_destinations, encode};
pub use types::{
    DestinationRecord, DnsRecord, DnsStatus, DomainStatus, RedirectAttributes, RedirectId,
    RedirectPayload, RemoteRedirect, SecurityStatus,
};
