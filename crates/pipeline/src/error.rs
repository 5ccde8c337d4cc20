//! Error types for header resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by loaders, stages and the SSRI machinery.
///
/// Everything here is fatal for the build except where a loader documents a
/// soft failure (the package loader falls back to empty metadata).
#[derive(Debug, Error)]
pub enum PipelineError {
	/// Both the legacy and the canonical spelling of a tag are set.
	#[error("ambiguous tags: (\"{legacy}\", \"{canonical}\")")]
	AmbiguousTags {
		legacy: &'static str,
		canonical: &'static str,
	},

	/// Strict-mode validation failure.
	#[error(transparent)]
	Header(#[from] grease_headers::HeaderError),

	/// File I/O failure on an explicitly configured path.
	#[error("failed to access {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// A configured headers file holds malformed JSON.
	#[error("malformed headers file {path}: {source}")]
	HeadersFile {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	/// A header tag value is not a parseable URL where one is needed.
	#[error("invalid URL \"{url}\": {source}")]
	Url {
		url: String,
		#[source]
		source: url::ParseError,
	},

	/// An integrity string (URL fragment or lock entry) could not be parsed.
	#[error("invalid integrity \"{input}\": {reason}")]
	IntegrityParse { input: String, reason: String },

	/// Two integrity sources disagree about a digest for the same URL.
	#[error("integrity mismatch for {url}: conflicting {algorithm} digests")]
	IntegrityMismatch { url: String, algorithm: String },

	/// A subresource fetch returned a non-success status.
	#[error("failed to fetch SSRI sources: [{status}] {url}")]
	FetchStatus { url: String, status: u16 },

	/// A subresource fetch returned no body.
	#[error("failed to fetch SSRI sources: empty body from {url}")]
	EmptyBody { url: String },

	/// A subresource fetch failed at the transport level.
	#[error("failed to fetch {url}: {reason}")]
	Fetch { url: String, reason: String },

	/// A user-supplied header provider reported an error.
	#[error("headers provider failed: {0}")]
	Provider(String),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
