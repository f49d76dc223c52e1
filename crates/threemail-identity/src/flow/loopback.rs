//! Browser login with a loopback redirect listener.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

use super::{Authenticator, Callback, IdentityClient, LoginFlow};
use crate::error::{Error, Result};
use crate::identity::Identity;

const CALLBACK_PATH: &str = "/callback";

const DONE_PAGE: &str = "<!doctype html><html><body>\
<p>3Mail login finished. You can close this window.</p>\
</body></html>";

/// Opens the system browser on the provider and waits for its redirect on
/// `127.0.0.1`.
#[derive(Debug, Clone)]
pub struct BrowserAuthenticator {
    client: IdentityClient,
    port: u16,
    timeout: Duration,
}

impl BrowserAuthenticator {
    /// Creates an authenticator listening on an ephemeral port.
    #[must_use]
    pub const fn new(client: IdentityClient, timeout: Duration) -> Self {
        Self {
            client,
            port: 0,
            timeout,
        }
    }

    /// Listens on a fixed port instead of an ephemeral one.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Authenticator for BrowserAuthenticator {
    async fn login(&self) -> Result<Identity> {
        self.run(open_browser).await
    }
}

impl BrowserAuthenticator {
    /// Binds the listener, hands the authorization URL to `launch` and
    /// completes the flow with the first callback.
    async fn run(&self, launch: impl FnOnce(&Url) + Send) -> Result<Identity> {
        let listener = TcpListener::bind(("127.0.0.1", self.port)).await?;
        let port = listener.local_addr()?.port();

        let client = self
            .client
            .clone()
            .with_redirect_uri(format!("http://127.0.0.1:{port}{CALLBACK_PATH}"));
        let flow = LoginFlow::new(client);
        let url = flow.authorization_url()?;

        info!("Opening {} for login", self.client.provider.name);
        launch(&url);

        let callback = tokio::time::timeout(self.timeout, wait_for_callback(&listener))
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_secs()))??;

        flow.complete(&callback).await
    }
}

fn open_browser(url: &Url) {
    if let Err(e) = opener::open(url.as_str()) {
        warn!("Could not open a browser ({e}); visit {url} to log in");
    }
}

/// Accepts connections until one hits the callback path.
async fn wait_for_callback(listener: &TcpListener) -> Result<Callback> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Loopback connection from {peer}");
        if let Some(callback) = serve_one(stream).await? {
            return Ok(callback);
        }
    }
}

/// Reads one request; answers it and returns the callback if it was one.
async fn serve_one(stream: TcpStream) -> Result<Option<Callback>> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers so the browser sees a clean response.
    let mut header = String::new();
    loop {
        header.clear();
        let read = reader.read_line(&mut header).await?;
        if read == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    let callback = parse_request_line(&request_line);
    let response = if callback.is_some() {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{DONE_PAGE}",
            DONE_PAGE.len()
        )
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
    };

    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;

    Ok(callback)
}

/// Extracts the callback from `GET /callback?... HTTP/1.1`.
fn parse_request_line(line: &str) -> Option<Callback> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }

    let target = parts.next()?;
    let url = Url::parse(&format!("http://127.0.0.1{target}")).ok()?;
    (url.path() == CALLBACK_PATH).then(|| Callback::from_url(&url))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::flow::mock_server::serve_once;
    use crate::provider::Provider;

    #[test]
    fn test_parse_request_line() {
        let callback = parse_request_line("GET /callback?code=abc&state=s1 HTTP/1.1\r\n").unwrap();
        assert_eq!(callback.code.as_deref(), Some("abc"));
        assert_eq!(callback.state.as_deref(), Some("s1"));
    }

    #[test]
    fn test_parse_request_line_ignores_other_paths() {
        assert!(parse_request_line("GET /favicon.ico HTTP/1.1\r\n").is_none());
        assert!(parse_request_line("POST /callback?code=abc HTTP/1.1\r\n").is_none());
        assert!(parse_request_line("").is_none());
    }

    /// Follows the authorization URL like a browser whose user approved
    /// (or denied) the login.
    fn redirect_back(query: impl Fn(&str) -> String + Send + 'static) -> impl FnOnce(&Url) + Send {
        move |url: &Url| {
            let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let redirect = Url::parse(&pairs["redirect_uri"]).unwrap();
            let target = format!("{}?{}", redirect.path(), query(pairs["state"].as_str()));
            let port = redirect.port().unwrap();

            tokio::spawn(async move {
                let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                stream
                    .write_all(format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
                    .await
                    .unwrap();
                let mut reply = String::new();
                stream.read_to_string(&mut reply).await.unwrap();
            });
        }
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let (origin, provider) = serve_once(
            "200 OK",
            r#"{"principal": "em77e-bvlzu-aq", "delegation": "signed", "expires_in": 3600}"#,
        )
        .await;
        let client = IdentityClient::new(Provider::from_origin("Test", &origin).unwrap());
        let authenticator = BrowserAuthenticator::new(client, Duration::from_secs(10));

        let identity = authenticator
            .run(redirect_back(|state| format!("code=c0de&state={state}")))
            .await
            .unwrap();
        assert_eq!(identity.principal().to_text(), "em77e-bvlzu-aq");
        assert_eq!(identity.delegation().token, "signed");

        let exchange = provider.await.unwrap();
        assert_eq!(exchange.method, "POST");
        assert_eq!(exchange.target, "/delegation");
        assert!(exchange.body.split('&').any(|pair| pair == "code=c0de"));
        assert!(
            exchange
                .body
                .contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A")
        );
    }

    #[tokio::test]
    async fn test_login_denied_by_user() {
        let client = IdentityClient::new(Provider::from_origin("Test", "http://127.0.0.1:9/").unwrap());
        let authenticator = BrowserAuthenticator::new(client, Duration::from_secs(10));

        let result = authenticator
            .run(redirect_back(|state| format!("error=access_denied&state={state}")))
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_login_times_out_without_callback() {
        let client = IdentityClient::new(Provider::from_origin("Test", "http://127.0.0.1:9/").unwrap());
        let authenticator = BrowserAuthenticator::new(client, Duration::from_millis(50));

        let result = authenticator.run(|_| {}).await;
        assert!(matches!(result, Err(Error::Timeout(0))));
    }

    #[tokio::test]
    async fn test_wait_for_callback_skips_unrelated_requests() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = tokio::spawn(async move {
            for target in ["/favicon.ico", "/callback?code=c0de&state=st"] {
                let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                stream
                    .write_all(format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
                    .await
                    .unwrap();
                let mut reply = String::new();
                stream.read_to_string(&mut reply).await.unwrap();
                assert!(reply.starts_with("HTTP/1.1"));
            }
        });

        let callback = wait_for_callback(&listener).await.unwrap();
        browser.await.unwrap();

        assert_eq!(callback.code.as_deref(), Some("c0de"));
        assert_eq!(callback.state.as_deref(), Some("st"));
    }
}
