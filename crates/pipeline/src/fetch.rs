//! Injected network-fetch capability.

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

use crate::error::{PipelineError, Result};

/// Response from the fetch capability: a status code and a readable byte
/// stream. Bodies are streamed so large subresources never sit in memory
/// whole just to be hashed.
pub struct FetchResponse {
	pub status: u16,
	pub body: Pin<Box<dyn AsyncRead + Send>>,
}

impl FetchResponse {
	pub fn ok(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Network access used by the SSRI stage.
///
/// Timeout and proxy policy belong to the implementation, not the pipeline.
#[async_trait]
pub trait Fetch: Send + Sync {
	async fn fetch(&self, url: &Url) -> Result<FetchResponse>;
}

/// [`Fetch`] over HTTP(S) via `reqwest`, streaming response bodies.
#[derive(Debug, Clone, Default)]
pub struct HttpFetch {
	client: reqwest::Client,
}

impl HttpFetch {
	pub fn new(client: reqwest::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Fetch for HttpFetch {
	async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
		let response = self
			.client
			.get(url.clone())
			.send()
			.await
			.map_err(|err| PipelineError::Fetch {
				url: url.to_string(),
				reason: err.to_string(),
			})?;

		let status = response.status().as_u16();
		let stream = response.bytes_stream().map_err(io::Error::other);

		Ok(FetchResponse {
			status,
			body: Box::pin(StreamReader::new(stream)),
		})
	}
}
