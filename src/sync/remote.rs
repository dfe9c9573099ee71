//! Remote collection sources.
//!
//! [`RemoteSource`] is the engine's view of the backend. [`HttpRemote`]
//! talks to the real backend; [`StaticRemote`] serves fixed payloads through
//! the same decoding path.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use super::types::FetchError;
use super::wire::{decode_collection, RemoteEntity};
use crate::error::{Error, Result};

/// Source of remote collections.
pub trait RemoteSource: Send + Sync {
    /// Fetch the complete collection for one kind.
    fn fetch_all<E: RemoteEntity>(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<E>, FetchError>> + Send;
}

/// JSON-over-HTTP backend client.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    /// Create a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("eeese/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL serving the collection of `E`.
    #[must_use]
    pub fn collection_url<E: RemoteEntity>(&self) -> String {
        format!("{}/{}", self.base_url, E::ENDPOINT)
    }
}

impl RemoteSource for HttpRemote {
    async fn fetch_all<E: RemoteEntity>(&self) -> std::result::Result<Vec<E>, FetchError> {
        let url = self.collection_url::<E>();
        tracing::debug!(url = %url, "Fetching remote collection");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Io(format!("GET {url} returned {status}")));
        }

        let body = response.bytes().await?;
        let entities = decode_collection::<E>(&body)?;

        tracing::debug!(url = %url, count = entities.len(), "Fetched remote collection");
        Ok(entities)
    }
}

/// Fixed payloads per endpoint, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRemote {
    payloads: HashMap<&'static str, std::result::Result<Vec<u8>, FetchError>>,
}

impl StaticRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `E`'s endpoint.
    #[must_use]
    pub fn with_payload<E: RemoteEntity>(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(E::ENDPOINT, Ok(body.into()));
        self
    }

    /// Fail every fetch of `E`'s endpoint with `err`.
    #[must_use]
    pub fn with_failure<E: RemoteEntity>(mut self, err: FetchError) -> Self {
        self.payloads.insert(E::ENDPOINT, Err(err));
        self
    }
}

impl RemoteSource for StaticRemote {
    fn fetch_all<E: RemoteEntity>(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<E>, FetchError>> + Send {
        let result = match self.payloads.get(E::ENDPOINT) {
            Some(Ok(body)) => decode_collection(body),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::Io(format!("no payload for {}", E::ENDPOINT))),
        };
        std::future::ready(result)
    }
}
