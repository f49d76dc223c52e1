//! Redirect-based login flow.

use super::challenge::{CHALLENGE_METHOD, random_token};
use super::{IdentityClient, SessionChallenge};
use crate::error::{Error, Result};
use crate::identity::Identity;
use url::Url;

/// One login attempt: authorization URL out, callback in, identity back.
///
/// This flow is suitable for applications that can open a browser and
/// receive the provider's redirect.
#[derive(Debug)]
pub struct LoginFlow {
    client: IdentityClient,
    challenge: SessionChallenge,
    state: String,
}

impl LoginFlow {
    /// Creates a login attempt with a fresh session key and CSRF state.
    #[must_use]
    pub fn new(client: IdentityClient) -> Self {
        Self {
            client,
            challenge: SessionChallenge::generate(),
            state: random_token(),
        }
    }

    /// Builds the authorization URL the user is sent to.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    pub fn authorization_url(&self) -> Result<Url> {
        let mut url = self.client.provider.auth_url.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("response_type", "code")
                .append_pair("session_challenge", self.challenge.challenge())
                .append_pair("challenge_method", CHALLENGE_METHOD)
                .append_pair("state", &self.state);

            if let Some(redirect_uri) = &self.client.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }

            if let Some(ttl) = self.client.provider.max_time_to_live {
                pairs.append_pair("max_time_to_live", &ttl.to_string());
            }
        }

        Ok(url)
    }

    /// Returns the CSRF state sent with the authorization URL.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Checks the provider's callback and exchanges its code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when the user denied the login,
    /// [`Error::InvalidCallback`] when the callback does not belong to this
    /// attempt, and any exchange error otherwise.
    pub async fn complete(&self, callback: &Callback) -> Result<Identity> {
        let code = self.verify(callback)?;
        self.client
            .exchange_code(code, self.challenge.session_key())
            .await
    }

    fn verify<'a>(&self, callback: &'a Callback) -> Result<&'a str> {
        if let Some(error) = &callback.error {
            if error == "access_denied" {
                return Err(Error::Cancelled);
            }
            return Err(Error::provider_error(
                error.clone(),
                callback.error_description.clone().unwrap_or_default(),
            ));
        }

        if callback.state.as_deref() != Some(self.state.as_str()) {
            return Err(Error::InvalidCallback("state mismatch".into()));
        }

        callback
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::InvalidCallback("missing authorization code".into()))
    }
}

/// Query parameters of the provider's redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Callback {
    /// Authorization code.
    pub code: Option<String>,
    /// CSRF state echoed back.
    pub state: Option<String>,
    /// Error code, when the login failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

impl Callback {
    /// Reads the callback parameters from a redirect URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut callback = Self::default();
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "code" => &mut callback.code,
                "state" => &mut callback.state,
                "error" => &mut callback.error,
                "error_description" => &mut callback.error_description,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        callback
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    fn flow() -> LoginFlow {
        let client = IdentityClient::new(Provider::internet_identity().unwrap())
            .with_redirect_uri("http://127.0.0.1:8080/callback");
        LoginFlow::new(client)
    }

    fn callback(query: &str) -> Callback {
        Callback::from_url(&Url::parse(&format!("http://127.0.0.1:8080/callback?{query}")).unwrap())
    }

    #[test]
    fn test_authorization_url() {
        let flow = flow();
        let url = flow.authorization_url().unwrap();

        assert!(url.as_str().starts_with("https://identity.ic0.app/authorize?"));
        assert!(url.as_str().contains("response_type=code"));
        assert!(url.as_str().contains("session_challenge="));
        assert!(url.as_str().contains("challenge_method=S256"));
        assert!(url.as_str().contains(&format!("state={}", flow.state())));
        assert!(url.as_str().contains("max_time_to_live=28800"));
        assert!(
            url.as_str()
                .contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback")
        );
    }

    #[test]
    fn test_authorization_url_never_leaks_session_key() {
        let flow = flow();
        let url = flow.authorization_url().unwrap();
        assert!(!url.as_str().contains(flow.challenge.session_key()));
    }

    #[test]
    fn test_callback_parsing() {
        let parsed = callback("code=abc&state=xyz&extra=1");
        assert_eq!(parsed.code.as_deref(), Some("abc"));
        assert_eq!(parsed.state.as_deref(), Some("xyz"));
        assert!(parsed.error.is_none());
    }

    #[test]
    fn test_verify_accepts_matching_state() {
        let flow = flow();
        let parsed = callback(&format!("code=abc&state={}", flow.state()));
        assert_eq!(flow.verify(&parsed).unwrap(), "abc");
    }

    #[test]
    fn test_verify_rejects_state_mismatch() {
        let flow = flow();
        let parsed = callback("code=abc&state=forged");
        assert!(matches!(flow.verify(&parsed), Err(Error::InvalidCallback(_))));
    }

    #[test]
    fn test_verify_rejects_missing_code() {
        let flow = flow();
        let parsed = callback(&format!("state={}", flow.state()));
        assert!(matches!(flow.verify(&parsed), Err(Error::InvalidCallback(_))));
    }

    #[test]
    fn test_verify_maps_denial_to_cancelled() {
        let flow = flow();
        let parsed = callback("error=access_denied");
        assert!(matches!(flow.verify(&parsed), Err(Error::Cancelled)));

        let parsed = callback("error=server_error&error_description=down");
        assert!(matches!(
            flow.verify(&parsed),
            Err(Error::Provider { ref description, .. }) if description == "down"
        ));
    }
}
