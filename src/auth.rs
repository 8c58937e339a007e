//! Authentication hooks.
//!
//! Two independent, optional hooks are resolved once when the handler is
//! configured:
//!
//! - [`RequestAuthenticator`] runs once per handshake, before the connection
//!   is constructed, and seeds the connection's principal.
//! - [`TokenAuthenticator`] runs on `connection_init` and replaces the
//!   principal when it succeeds.
//!
//! A failing request-level hook does not abort the handshake; the connection
//! proceeds anonymously and authorization is left to the subscription engine.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Opaque authenticated identity attached to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(serde_json::Value);

impl Principal {
    /// Wraps an arbitrary JSON value as a principal.
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Returns the wrapped value.
    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self(serde_json::Value::String(s.to_string()))
    }
}

/// The parts of the HTTP upgrade request visible to authenticators.
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    /// Request method (always `GET` for a valid upgrade).
    pub method: Method,
    /// Request URI including query string.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
}

impl HandshakeRequest {
    /// Returns the bearer token from the `Authorization` header, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Request-level authentication hook.
#[async_trait]
pub trait RequestAuthenticator: Send + Sync + fmt::Debug {
    /// Authenticates the raw handshake request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] when the request carries no
    /// acceptable credentials.
    async fn authenticate(&self, request: &HandshakeRequest) -> Result<Principal, GatewayError>;
}

/// Connection-level authentication hook, fed the `authToken` of
/// `connection_init`.
#[async_trait]
pub trait TokenAuthenticator: Send + Sync + fmt::Debug {
    /// Authenticates a token sent over an established connection.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] when the token is rejected.
    async fn authenticate(&self, token: &str) -> Result<Principal, GatewayError>;
}

/// The configured set of authentication hooks. Both default to absent.
#[derive(Debug, Clone, Default)]
pub struct AuthHooks {
    /// Hook run once per handshake.
    pub request: Option<Arc<dyn RequestAuthenticator>>,
    /// Hook run on `connection_init`.
    pub connection: Option<Arc<dyn TokenAuthenticator>>,
}

impl AuthHooks {
    /// No authentication at all; every connection is anonymous.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the request-level hook.
    #[must_use]
    pub fn with_request(mut self, hook: Arc<dyn RequestAuthenticator>) -> Self {
        self.request = Some(hook);
        self
    }

    /// Sets the connection-level hook.
    #[must_use]
    pub fn with_connection(mut self, hook: Arc<dyn TokenAuthenticator>) -> Self {
        self.connection = Some(hook);
        self
    }

    /// Runs the request-level hook, if any. Failure yields `None`.
    pub async fn authenticate_request(&self, request: &HandshakeRequest) -> Option<Principal> {
        let hook = self.request.as_ref()?;
        match hook.authenticate(request).await {
            Ok(principal) => Some(principal),
            Err(err) => {
                tracing::debug!(error = %err, uri = %request.uri, "request authentication failed, continuing anonymously");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BearerEcho;

    #[async_trait]
    impl RequestAuthenticator for BearerEcho {
        async fn authenticate(
            &self,
            request: &HandshakeRequest,
        ) -> Result<Principal, GatewayError> {
            request
                .bearer_token()
                .map(Principal::from)
                .ok_or_else(|| GatewayError::Unauthenticated("missing bearer token".to_string()))
        }
    }

    fn request(auth: Option<&str>) -> HandshakeRequest {
        let mut headers = HeaderMap::new();
        if let Some(value) = auth {
            let Ok(value) = value.parse() else {
                panic!("valid header value");
            };
            headers.insert(axum::http::header::AUTHORIZATION, value);
        }
        HandshakeRequest {
            method: Method::GET,
            uri: Uri::from_static("/graphql"),
            headers,
        }
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(request(Some("Bearer abc")).bearer_token(), Some("abc"));
        assert_eq!(request(Some("Basic abc")).bearer_token(), None);
        assert_eq!(request(Some("Bearer  ")).bearer_token(), None);
        assert_eq!(request(None).bearer_token(), None);
    }

    #[tokio::test]
    async fn no_hook_is_anonymous() {
        let hooks = AuthHooks::none();
        assert_eq!(hooks.authenticate_request(&request(Some("Bearer abc"))).await, None);
    }

    #[tokio::test]
    async fn hook_success_seeds_principal() {
        let hooks = AuthHooks::none().with_request(Arc::new(BearerEcho));
        let principal = hooks.authenticate_request(&request(Some("Bearer alice"))).await;
        assert_eq!(principal, Some(Principal::from("alice")));
    }

    #[tokio::test]
    async fn hook_failure_is_soft() {
        let hooks = AuthHooks::none().with_request(Arc::new(BearerEcho));
        assert_eq!(hooks.authenticate_request(&request(None)).await, None);
    }

    #[test]
    fn principal_display_unquotes_strings() {
        assert_eq!(Principal::from("bob").to_string(), "bob");
        assert_eq!(
            Principal::new(serde_json::json!({"sub": 1})).to_string(),
            r#"{"sub":1}"#
        );
    }
}
