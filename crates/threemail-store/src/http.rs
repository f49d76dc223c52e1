//! JSON-over-HTTP transport for the message store.
//!
//! Every capability is `POST {base}/{capability}` with a JSON argument
//! object. Requests carry the delegation in `Authorization` and the caller
//! in `X-Principal`. Replies are `{"ok": value}` or `{"err": "reason"}`.

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use threemail_identity::{Principal, RequestChannel};
use tracing::debug;
use url::Url;

use crate::api::{Capability, Connect, MessageStore};
use crate::error::{Error, Result};
use crate::types::{AliasRecord, Message};

/// Header naming the calling principal.
const PRINCIPAL_HEADER: &str = "X-Principal";

/// Reply envelope.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum Reply<T> {
    Ok(T),
    Err(String),
}

impl<T> Reply<T> {
    fn into_result(self, capability: Capability) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Err(reason) => Err(Error::rejected(capability.as_str(), reason)),
        }
    }
}

/// Builds [`HttpStore`]s for a store base URL.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    base: Url,
    http_client: Client,
}

impl HttpConnector {
    /// Creates a connector for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut base = Url::parse(base_url.as_ref())?;
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            http_client: Client::new(),
        })
    }

    /// The normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }
}

impl Connect for HttpConnector {
    type Store = HttpStore;

    fn connect(&self, channel: RequestChannel) -> Result<HttpStore> {
        Ok(HttpStore {
            base: self.base.clone(),
            channel,
            http_client: self.http_client.clone(),
        })
    }
}

/// Message store reached over HTTP, bound to one identity.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base: Url,
    channel: RequestChannel,
    http_client: Client,
}

impl HttpStore {
    async fn call<A, T>(&self, capability: Capability, args: &A) -> Result<T>
    where
        A: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base.join(capability.as_str())?;
        debug!(%capability, "store request");

        let response = self
            .http_client
            .post(url)
            .header(AUTHORIZATION, self.channel.authorization())
            .header(PRINCIPAL_HEADER, self.channel.principal().to_text())
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        decode_reply(capability, status, &body)
    }
}

/// Maps an HTTP answer to the call's result.
fn decode_reply<T: DeserializeOwned>(
    capability: Capability,
    status: StatusCode,
    body: &[u8],
) -> Result<T> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::NotAuthenticated);
    }

    if !status.is_success() {
        let reason = serde_json::from_slice::<Reply<serde_json::Value>>(body).map_or_else(
            |_| format!("HTTP {status}"),
            |reply| match reply {
                Reply::Err(reason) => reason,
                Reply::Ok(_) => format!("HTTP {status}"),
            },
        );
        return Err(Error::rejected(capability.as_str(), reason));
    }

    let reply: Reply<T> = serde_json::from_slice(body)?;
    reply.into_result(capability)
}

impl MessageStore for HttpStore {
    fn caller(&self) -> &Principal {
        self.channel.principal()
    }

    async fn submit_message(&self, recipient: &Principal, subject: &str, body: &str) -> Result<String> {
        let args = json!({ "recipient": recipient, "subject": subject, "message": body });
        self.call(Capability::SubmitMessage, &args).await
    }

    async fn get_my_messages(&self) -> Result<Vec<Message>> {
        self.call(Capability::GetMyMessages, &json!({})).await
    }

    async fn get_unviewed_messages(&self) -> Result<Vec<Message>> {
        self.call(Capability::GetUnviewedMessages, &json!({})).await
    }

    async fn get_sent_messages(&self) -> Result<Vec<Message>> {
        self.call(Capability::GetSentMessages, &json!({})).await
    }

    async fn search_by_subject(&self, query: &str) -> Result<Vec<Message>> {
        self.call(Capability::SearchBySubject, &json!({ "subject": query }))
            .await
    }

    async fn mark_as_viewed(&self, subject: &str) -> Result<String> {
        self.call(Capability::MarkAsViewed, &json!({ "subject": subject }))
            .await
    }

    async fn delete_message(&self, subject: &str) -> Result<String> {
        self.call(Capability::DeleteMessage, &json!({ "subject": subject }))
            .await
    }

    async fn delete_all_messages(&self) -> Result<String> {
        self.call(Capability::DeleteAllMessages, &json!({})).await
    }

    async fn get_total_messages(&self) -> Result<u64> {
        self.call(Capability::GetTotalMessages, &json!({})).await
    }

    async fn get_total_messages_sent(&self) -> Result<u64> {
        self.call(Capability::GetTotalMessagesSent, &json!({})).await
    }

    async fn get_custom_address(&self, account: &Principal) -> Result<Option<AliasRecord>> {
        self.call(Capability::GetCustomAddress, &json!({ "account": account }))
            .await
    }

    async fn resolve_custom_address(&self, alias: &str) -> Result<Option<Principal>> {
        self.call(Capability::ResolveCustomAddress, &json!({ "alias": alias }))
            .await
    }

    async fn set_username(&self, candidate: &str, account: &Principal) -> Result<bool> {
        let args = json!({ "username": candidate, "account": account });
        self.call(Capability::SetUsername, &args).await
    }
}
