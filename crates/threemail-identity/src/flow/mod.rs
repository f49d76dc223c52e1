//! Login flows against the identity provider.

mod challenge;
mod login;
mod loopback;
#[cfg(test)]
mod mock_server;

pub use challenge::SessionChallenge;
pub use login::{Callback, LoginFlow};
pub use loopback::BrowserAuthenticator;

use std::collections::HashMap;
use std::future::Future;

use crate::delegation::{Delegation, DelegationResponse, ErrorResponse};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::principal::Principal;
use crate::provider::Provider;
use reqwest::Client;

/// Anything that can run an interactive login and hand back an identity.
///
/// Implementations must not retain partial state when the login fails or is
/// cancelled.
pub trait Authenticator: Send + Sync {
    /// Runs the login flow to completion.
    fn login(&self) -> impl Future<Output = Result<Identity>> + Send;
}

/// Client configuration for one identity provider.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    /// Provider configuration.
    pub provider: Provider,
    /// Redirect URI receiving the callback.
    pub redirect_uri: Option<String>,
    /// HTTP client.
    http_client: Client,
}

impl IdentityClient {
    /// Creates a new client.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            redirect_uri: None,
            http_client: Client::new(),
        }
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Exchanges an authorization code for a delegation and builds the
    /// identity it authenticates.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails, the response is malformed, or
    /// the provider answered with the anonymous principal.
    pub(crate) async fn exchange_code(&self, code: &str, session_key: &str) -> Result<Identity> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("session_key", session_key);

        if let Some(uri) = &self.redirect_uri {
            params.insert("redirect_uri", uri);
        }

        let response = self
            .http_client
            .post(self.provider.delegation_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let delegation_response: DelegationResponse = response.json().await?;
        identity_from_response(&delegation_response, session_key)
    }
}

/// Validates a delegation response and turns it into an identity.
fn identity_from_response(response: &DelegationResponse, session_key: &str) -> Result<Identity> {
    let principal = Principal::from_text(&response.principal)?;
    if principal.is_anonymous() {
        return Err(Error::InvalidResponse(
            "provider returned the anonymous principal".into(),
        ));
    }

    let delegation = Delegation::from_response(response, session_key)?;
    Ok(Identity::new(principal, delegation))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn response(principal: &str) -> DelegationResponse {
        DelegationResponse {
            principal: principal.to_string(),
            delegation: "signed".to_string(),
            expires_in: 3600,
        }
    }

    #[test]
    fn test_identity_client_creation() {
        let client = IdentityClient::new(Provider::internet_identity().unwrap())
            .with_redirect_uri("http://127.0.0.1:4000/callback");
        assert_eq!(
            client.redirect_uri.as_deref(),
            Some("http://127.0.0.1:4000/callback")
        );
    }

    #[test]
    fn test_identity_from_response() {
        let identity = identity_from_response(&response("em77e-bvlzu-aq"), "key").unwrap();
        assert_eq!(identity.principal().to_text(), "em77e-bvlzu-aq");
        assert_eq!(identity.delegation().session_key, "key");
    }

    #[test]
    fn test_identity_from_response_rejects_anonymous() {
        assert!(matches!(
            identity_from_response(&response("2vxsx-fae"), "key"),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let (origin, provider) = mock_server::serve_once(
            "200 OK",
            r#"{"principal": "em77e-bvlzu-aq", "delegation": "signed", "expires_in": 3600}"#,
        )
        .await;
        let client = IdentityClient::new(Provider::from_origin("Test", &origin).unwrap())
            .with_redirect_uri("http://127.0.0.1:4000/callback");

        let identity = client.exchange_code("c0de", "key").await.unwrap();
        assert_eq!(identity.principal().to_text(), "em77e-bvlzu-aq");
        assert_eq!(identity.delegation().token, "signed");
        assert!(!identity.is_expired());

        let request = provider.await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.target, "/delegation");
        assert!(request.headers["content-type"].starts_with("application/x-www-form-urlencoded"));
        for pair in [
            "grant_type=authorization_code",
            "code=c0de",
            "session_key=key",
            "redirect_uri=http%3A%2F%2F127.0.0.1%3A4000%2Fcallback",
        ] {
            assert!(request.body.split('&').any(|p| p == pair), "{pair} in {}", request.body);
        }
    }

    #[tokio::test]
    async fn test_exchange_code_maps_provider_error() {
        let (origin, provider) = mock_server::serve_once(
            "400 Bad Request",
            r#"{"error": "invalid_grant", "error_description": "code expired"}"#,
        )
        .await;
        let client = IdentityClient::new(Provider::from_origin("Test", &origin).unwrap());

        let result = client.exchange_code("stale", "key").await;
        assert!(matches!(
            result,
            Err(Error::Provider { ref error, ref description })
                if error == "invalid_grant" && description == "code expired"
        ));
        provider.await.unwrap();
    }

    #[test]
    fn test_identity_from_response_rejects_bad_principal() {
        assert!(matches!(
            identity_from_response(&response("alice"), "key"),
            Err(Error::Principal(_))
        ));
    }
}
