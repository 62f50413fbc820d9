use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde_json::{Map, Value};
use wreq::Method;

use crate::retry::{BasicAuth, RetryingClient, UpstreamError};

/// Proxy for the third-party paginated movie catalogue.
pub struct MovieProxy {
    client: RetryingClient,
    base_url: String,
    auth: BasicAuth,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl MovieProxy {
    pub fn new(client: RetryingClient, base_url: String, auth: BasicAuth, rps: u32) -> Self {
        if auth.username.trim().is_empty() {
            tracing::warn!("USER_NAME is not set; movie catalogue requests will be unauthenticated");
        }

        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        Self { client, base_url, auth, limiter }
    }

    /// Fetches `page` from the catalogue and rewrites it to point back at
    /// `public_base`'s own `/movies/` endpoint.
    pub async fn list_movies(&self, page: u32, public_base: &str) -> Result<Value, UpstreamError> {
        self.limiter.until_ready().await;

        let url = page_url(&self.base_url, page);
        tracing::debug!(url = %url, page, "fetching movie page");

        let auth = (!self.auth.username.is_empty()).then_some(&self.auth);
        let resp = self.client.send(Method::GET, &url, auth).await?;
        if !resp.status.is_success() {
            return Err(UpstreamError::Status(resp.status.as_u16()));
        }

        let body: Value =
            serde_json::from_slice(&resp.body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        reshape_page(body, page, public_base)
    }
}

fn page_url(base_url: &str, page: u32) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{sep}page={page}")
}

/// Renames `results` to `data` and rewrites `next`/`previous` to this service's URLs.
pub fn reshape_page(body: Value, page: u32, public_base: &str) -> Result<Value, UpstreamError> {
    let Value::Object(mut envelope) = body else {
        return Err(UpstreamError::Decode("expected a JSON object".to_string()));
    };

    let data = envelope.remove("results").unwrap_or_else(|| Value::Array(Vec::new()));
    envelope.insert("data".to_string(), data);

    let base = public_base.trim_end_matches('/');
    rewrite_link(&mut envelope, "next", || Some(page.saturating_add(1)), base);
    rewrite_link(&mut envelope, "previous", || page.checked_sub(1).filter(|p| *p >= 1), base);

    Ok(Value::Object(envelope))
}

fn rewrite_link(
    envelope: &mut Map<String, Value>,
    key: &str,
    target: impl FnOnce() -> Option<u32>,
    base: &str,
) {
    let link = match envelope.get(key) {
        Some(v) if is_truthy(v) => target().map(|p| Value::String(format!("{base}/movies/?page={p}"))),
        _ => None,
    };
    envelope.insert(key.to_string(), link.unwrap_or(Value::Null));
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
