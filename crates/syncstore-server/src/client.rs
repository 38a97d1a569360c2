//! Client for the account store API
//!
//! The raw calls ([`StoreClient::get_entry`], [`StoreClient::put_entry`],
//! [`StoreClient::remove_entry`]) move sealed entries. The `store_*`
//! helpers work on logical paths and plaintext: they seal before writing
//! and verify plus decrypt after reading, so a node that fails verification
//! fails the whole call.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use syncstore_core::{
    path, AccountId, Entry, EntryEnvelope, ErrorKind, OpenedEntry, PathHash, StoreError,
};
use url::Url;

use crate::api::{store_path, PutRequest, WireEntry, WriteResponse};
use crate::error::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("HTTP status {status}: {message}")]
    Remote {
        status: StatusCode,
        kind: Option<ErrorKind>,
        message: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    /// Store error kind, whether raised remotely or while opening locally
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Remote { kind, .. } => *kind,
            ClientError::Store(e) => Some(e.kind()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreClient {
    remote: Url,
    client: Client,
}

impl StoreClient {
    pub fn new(remote: &Url) -> Result<Self, ClientError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    fn entry_url(&self, account: &AccountId, path: &PathHash) -> Result<Url, ClientError> {
        Ok(self.remote.join(&store_path(account, path))?)
    }

    /// Fetch a sealed entry, optionally with its subtree.
    pub async fn get_entry(
        &self,
        account: &AccountId,
        path: &PathHash,
        recursive: bool,
        since: Option<i64>,
    ) -> Result<Entry, ClientError> {
        let mut url = self.entry_url(account, path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("recursive", if recursive { "1" } else { "0" });
            if let Some(since) = since {
                query.append_pair("since", &since.to_string());
            }
        }

        let response = self.client.get(url).send().await?;
        let wire: WireEntry = decode(response).await?;
        Ok(wire.into_entry()?)
    }

    /// Store a sealed entry. Returns the timestamp the store stamped.
    pub async fn put_entry(&self, account: &AccountId, entry: &Entry) -> Result<i64, ClientError> {
        let url = self.entry_url(account, &entry.path)?;
        let response = self
            .client
            .post(url)
            .json(&PutRequest::from_entry(entry))
            .send()
            .await?;
        let written: WriteResponse = decode(response).await?;
        Ok(written.timestamp)
    }

    /// Remove a leaf entry. Returns the timestamp of the removal.
    pub async fn remove_entry(
        &self,
        account: &AccountId,
        path: &PathHash,
        recursive: bool,
    ) -> Result<i64, ClientError> {
        let mut url = self.entry_url(account, path)?;
        url.query_pairs_mut()
            .append_pair("recursive", if recursive { "1" } else { "0" });

        let response = self.client.delete(url).send().await?;
        let removed: WriteResponse = decode(response).await?;
        Ok(removed.timestamp)
    }

    /// Read the entry at `logical_path` and open every returned node.
    pub async fn store_get_path(
        &self,
        envelope: &EntryEnvelope,
        logical_path: &str,
        recursive: bool,
        since: Option<i64>,
    ) -> Result<OpenedEntry, ClientError> {
        let path = path::hash(envelope.account(), logical_path)?;
        let entry = self
            .get_entry(envelope.account(), &path, recursive, since)
            .await?;
        Ok(envelope.open_since(&entry, since)?)
    }

    /// Seal `value` for `logical_path` and store it under its parent path.
    pub async fn store_put_value(
        &self,
        envelope: &EntryEnvelope,
        logical_path: &str,
        value: &[u8],
    ) -> Result<i64, ClientError> {
        let entry = envelope.seal_path(logical_path, value)?;
        self.put_entry(envelope.account(), &entry).await
    }

    pub async fn store_remove_path(
        &self,
        account: &AccountId,
        logical_path: &str,
    ) -> Result<i64, ClientError> {
        let path = path::hash(account, logical_path)?;
        self.remove_entry(account, &path, false).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await?;
    Err(match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ClientError::Remote {
            status,
            kind: ErrorKind::parse(&body.error),
            message: body.message,
        },
        Err(_) => ClientError::Remote {
            status,
            kind: None,
            message: text,
        },
    })
}
