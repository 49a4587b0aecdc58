//! Resolved service endpoint configuration

/// A resolved content-service endpoint.
///
/// The address is normalized with a trailing `/` so that two configs
/// pointing at the same service compare equal and partition together.
/// Timeouts are in milliseconds; `0` means no timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Normalized service address (always ends with `/`)
    pub address: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Bearer token; `None` = unauthenticated requests
    pub auth_token: Option<String>,
    /// Accept a self-signed transport certificate
    pub accept_invalid_certs: bool,
}

impl EndpointConfig {
    pub fn new(address: &str) -> Self {
        Self {
            address: normalize_address(address),
            connect_timeout_ms: 0,
            read_timeout_ms: 0,
            auth_token: None,
            accept_invalid_certs: false,
        }
    }

    /// Same endpoint, different address. Used when input tuples name an
    /// endpoint explicitly: timeouts and credentials stay as configured.
    pub fn with_address(&self, address: &str) -> Self {
        Self {
            address: normalize_address(address),
            ..self.clone()
        }
    }
}

fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
