//! JSON-over-HTTP transport.
//!
//! Maps the [`ResourceTransport`] operations onto the usual REST shape
//! under the resource's collection path:
//!
//! | operation | request                    |
//! |-----------|----------------------------|
//! | list      | `GET {base}{path}`         |
//! | get       | `GET {base}{path}/{id}`    |
//! | create    | `POST {base}{path}`        |
//! | update    | `PATCH {base}{path}/{id}`  |
//! | delete    | `DELETE {base}{path}/{id}` |
//!
//! `{id}` is percent-encoded as a single path segment.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::trace;

use super::ResourceTransport;
use crate::config::TransportConfig;
use crate::{MuninnError, Resource, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`ResourceTransport`].
#[derive(Clone)]
pub struct RestTransport<R> {
    http: Client,
    base_url: String,
    collection: Url,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> RestTransport<R> {
    /// Create a transport rooted at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout.
    ///
    /// Fails when `base_url` is not an absolute http(s)-style URL.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let collection = Url::parse(&format!("{base_url}{}", R::PATH))
            .map_err(|e| MuninnError::Configuration(format!("invalid base URL {base_url:?}: {e}")))?;
        if collection.cannot_be_a_base() {
            return Err(MuninnError::Configuration(format!(
                "base URL {base_url:?} cannot carry a path"
            )));
        }

        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            MuninnError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url,
            collection,
            _resource: PhantomData,
        })
    }

    /// Create a transport from the `[transport]` configuration section.
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> Url {
        self.collection.clone()
    }

    fn item_url(&self, id: &R::Id) -> Url {
        let mut url = self.collection.clone();
        // Checked in the constructor: the collection URL can carry segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        url
    }
}

/// Check response status and map to the appropriate error.
async fn check_status(response: Response, url: &Url) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        404 => Err(MuninnError::NotFound(url.to_string())),
        code => {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string()
            } else {
                body
            };
            Err(MuninnError::Api {
                status: code,
                message,
            })
        }
    }
}

#[async_trait]
impl<R: Resource> ResourceTransport<R> for RestTransport<R> {
    fn name(&self) -> &str {
        "rest"
    }

    async fn list(&self) -> Result<Vec<R>> {
        let url = self.collection_url();
        trace!(%url, "GET");
        let response = self.http.get(url.clone()).send().await?;
        Ok(check_status(response, &url).await?.json().await?)
    }

    async fn get(&self, id: &R::Id) -> Result<R> {
        let url = self.item_url(id);
        trace!(%url, "GET");
        let response = self.http.get(url.clone()).send().await?;
        Ok(check_status(response, &url).await?.json().await?)
    }

    async fn create(&self, input: &R::Input) -> Result<R> {
        let url = self.collection_url();
        trace!(%url, "POST");
        let response = self.http.post(url.clone()).json(input).send().await?;
        Ok(check_status(response, &url).await?.json().await?)
    }

    async fn update(&self, id: &R::Id, input: &R::Input) -> Result<R> {
        let url = self.item_url(id);
        trace!(%url, "PATCH");
        let response = self.http.patch(url.clone()).json(input).send().await?;
        Ok(check_status(response, &url).await?.json().await?)
    }

    async fn delete(&self, id: &R::Id) -> Result<()> {
        let url = self.item_url(id);
        trace!(%url, "DELETE");
        let response = self.http.delete(url.clone()).send().await?;
        check_status(response, &url).await?;
        Ok(())
    }
}

impl<R> fmt::Debug for RestTransport<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
