use thiserror::Error;

/// Top-level error type for the `crestron-api` crate.
///
/// Three families matter to callers: the hub could not be reached
/// ([`Connection`](Self::Connection), [`Timeout`](Self::Timeout),
/// [`Tls`](Self::Tls)), the session was rejected
/// ([`Authentication`](Self::Authentication)), or the hub answered with
/// something unusable (everything else). `crestron-core` maps these into
/// its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Authentication ──────────────────────────────────────────────
    /// Token rejected at login, or the auth key was refused mid-session.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx response from the hub.
    #[error("Hub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the hub could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout { .. } | Self::Tls(_)
        )
    }

    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_families() {
        assert!(Error::Timeout { timeout_secs: 10 }.is_connection());
        assert!(Error::Tls("bad cert".into()).is_connection());
        assert!(
            Error::Authentication {
                message: "nope".into()
            }
            .is_auth()
        );
        let api = Error::Api {
            status: 503,
            message: "busy".into(),
        };
        assert!(!api.is_connection());
        assert!(api.is_transient());
        assert!(
            !Error::Api {
                status: 404,
                message: "missing".into()
            }
            .is_transient()
        );
    }
}
