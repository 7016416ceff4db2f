use std::error::Error as _;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use reqwest::header::CACHE_CONTROL;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};

use super::types::{CheckDefinition, CheckFailure, Variant};
use super::validation::validate_response;

/// Identifying client header sent with every probe
pub const DEFAULT_USER_AGENT: &str =
    concat!("uptime-mon/", env!("CARGO_PKG_VERSION"), " (+https://github.com/CHTJonas/uptime-mon)");

/// Prober trait for executing a single probe attempt
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Perform exactly one attempt for `definition` under `variant`
    async fn probe(&self, definition: &CheckDefinition, variant: Variant) -> Result<(), CheckFailure>;
}

/// HTTP/HTTPS prober
///
/// A fresh client is built for every attempt so that no pooled connection can
/// be reused, which would hide both connection latency and the family override.
pub struct HttpProber {
    user_agent: String,
}

impl HttpProber {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self { user_agent: user_agent.into() }
    }

    fn client(&self, timeout: Duration, variant: Variant) -> Result<Client, CheckFailure> {
        let builder = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .pool_max_idle_per_host(0)
            .tcp_keepalive(None::<Duration>)
            .no_proxy()
            .user_agent(self.user_agent.as_str());

        // Binding to the unspecified address of one family restricts the dialer
        // to resolved addresses of that family.
        let builder = match variant {
            Variant::Default => builder,
            Variant::V4 => builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            Variant::V6 => builder.local_address(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        };

        builder.build().map_err(|e| CheckFailure::RequestBuild(describe(&e)))
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, definition: &CheckDefinition, variant: Variant) -> Result<(), CheckFailure> {
        let method = Method::from_bytes(definition.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| CheckFailure::RequestBuild(e.to_string()))?;
        let client = self.client(definition.max_response_time, variant)?;
        let to_failure = |e: reqwest::Error| classify(e, definition.max_response_time);

        let response = client
            .request(method, definition.url.as_str())
            .header(CACHE_CONTROL, "no-store, max-age=0")
            .send()
            .await
            .map_err(to_failure)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // The client timeout covers reading the body too.
        let body = response.text().await.map_err(to_failure)?;

        validate_response(definition, status, &headers, &body)
    }
}

fn classify(error: reqwest::Error, budget: Duration) -> CheckFailure {
    if error.is_timeout() {
        CheckFailure::Timeout(budget.as_millis() as u64)
    } else if error.is_builder() {
        CheckFailure::RequestBuild(describe(&error))
    } else {
        CheckFailure::Network(describe(&error))
    }
}

/// Render an error with its source chain, since reqwest keeps the root cause
/// (refused connection, DNS failure) out of its own message.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
