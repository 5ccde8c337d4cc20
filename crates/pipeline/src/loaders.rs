//! Header sources: package metadata, static objects, JSON files and
//! user-supplied providers.
//!
//! Per locale, sources compose in a fixed order with later layers winning:
//! package metadata (default locale only), then the configured object or
//! file, then the provider function. The composed result is what the first
//! waterfall stage hands to the rest of the chain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use grease_headers::HeaderSet;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::WaterfallContext;
use crate::error::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::waterfall::Stage;

/// User-supplied header source invoked once per artifact and locale.
///
/// Receives the headers composed so far and returns the replacement set.
/// Implement the trait directly for async providers; plain closures of
/// shape `Fn(HeaderSet, &WaterfallContext) -> HeaderSet` get a blanket
/// implementation.
#[async_trait]
pub trait HeaderProvider: Send + Sync {
	async fn provide(&self, headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet>;
}

#[async_trait]
impl<F> HeaderProvider for F
where
	F: Fn(HeaderSet, &WaterfallContext) -> HeaderSet + Send + Sync,
{
	async fn provide(&self, headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		Ok(self(headers, ctx))
	}
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthorField {
	Plain(String),
	Detailed { name: Option<String> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BugsField {
	Url(String),
	Detailed { url: Option<String> },
}

#[derive(Debug, Deserialize)]
struct PackageInfo {
	name: Option<String>,
	version: Option<String>,
	description: Option<String>,
	author: Option<AuthorField>,
	homepage: Option<String>,
	bugs: Option<BugsField>,
}

/// Loads default header tags from the nearest `package.json`.
///
/// Walks ancestor directories from the configured root. Every failure mode
/// (no manifest anywhere, unreadable, malformed) is soft: the loader logs
/// and yields an empty set, and the build goes on.
#[derive(Debug)]
pub struct PackageLoader {
	root: PathBuf,
	headers: Option<HeaderSet>,
}

impl PackageLoader {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			headers: None,
		}
	}

	/// Returns the package-derived headers, reading the manifest on first
	/// call and caching for the plugin's lifetime.
	pub async fn load(&mut self, fs: &dyn FileSystem) -> HeaderSet {
		if let Some(headers) = &self.headers {
			return headers.clone();
		}

		let headers = match self.read(fs).await {
			Ok(headers) => headers,
			Err(err) => {
				warn!(root = %self.root.display(), error = %err, "package metadata unavailable, continuing without");
				HeaderSet::new()
			}
		};
		self.headers = Some(headers.clone());
		headers
	}

	async fn read(&self, fs: &dyn FileSystem) -> Result<HeaderSet> {
		let manifest = self.find_manifest(fs).await?;
		let text = fs
			.read_to_string(&manifest)
			.await
			.map_err(|source| PipelineError::Io {
				path: manifest.clone(),
				source,
			})?;
		let info: PackageInfo =
			serde_json::from_str(&text).map_err(|source| PipelineError::HeadersFile {
				path: manifest,
				source,
			})?;

		let mut headers = HeaderSet::new();
		if let Some(name) = info.name {
			headers.set("name", name);
		}
		if let Some(version) = info.version {
			headers.set("version", version);
		}
		if let Some(description) = info.description {
			headers.set("description", description);
		}
		match info.author {
			Some(AuthorField::Plain(author)) => headers.set("author", author),
			Some(AuthorField::Detailed { name: Some(author) }) => headers.set("author", author),
			_ => {}
		}
		if let Some(homepage) = info.homepage {
			headers.set("homepage", homepage);
		}
		match info.bugs {
			Some(BugsField::Url(url)) => headers.set("supportURL", url),
			Some(BugsField::Detailed { url: Some(url) }) => headers.set("supportURL", url),
			_ => {}
		}
		Ok(headers)
	}

	async fn find_manifest(&self, fs: &dyn FileSystem) -> Result<PathBuf> {
		let mut dir = self.root.as_path();
		loop {
			let candidate = dir.join("package.json");
			if fs.mtime_millis(&candidate).await.is_ok() {
				return Ok(candidate);
			}
			dir = match dir.parent() {
				Some(parent) => parent,
				None => {
					return Err(PipelineError::Io {
						path: self.root.join("package.json"),
						source: std::io::Error::from(std::io::ErrorKind::NotFound),
					});
				}
			};
		}
	}
}

/// Loads a header set from a JSON file, re-reading only when the file's
/// change-detection timestamp advances.
///
/// Unlike the package loader, this file is explicitly configured, so every
/// failure (missing, unreadable, malformed) is fatal.
#[derive(Debug)]
pub struct FileLoader {
	path: PathBuf,
	headers: Option<HeaderSet>,
	timestamp: u64,
}

impl FileLoader {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			headers: None,
			timestamp: 0,
		}
	}

	/// The configured file path; callers register it as a build dependency.
	pub fn path(&self) -> &Path {
		&self.path
	}

	pub async fn load(&mut self, fs: &dyn FileSystem) -> Result<HeaderSet> {
		let timestamp = fs
			.mtime_millis(&self.path)
			.await
			.map_err(|source| PipelineError::Io {
				path: self.path.clone(),
				source,
			})?;

		if let Some(headers) = &self.headers {
			if self.timestamp >= timestamp {
				debug!(path = %self.path.display(), "headers file unchanged");
				return Ok(headers.clone());
			}
		}
		self.timestamp = timestamp;

		let text = fs
			.read_to_string(&self.path)
			.await
			.map_err(|source| PipelineError::Io {
				path: self.path.clone(),
				source,
			})?;
		let headers: HeaderSet =
			serde_json::from_str(&text).map_err(|source| PipelineError::HeadersFile {
				path: self.path.clone(),
				source,
			})?;

		self.headers = Some(headers.clone());
		Ok(headers)
	}
}

/// First waterfall stage: hands the pre-composed per-locale headers to the
/// chain, running the locale's provider (if any) over them.
pub struct LoadHeaders {
	base: HashMap<String, HeaderSet>,
	providers: HashMap<String, Arc<dyn HeaderProvider>>,
}

impl LoadHeaders {
	/// `base` maps each locale to its composed package/object/file headers;
	/// `providers` maps locales to their provider functions.
	pub fn new(
		base: HashMap<String, HeaderSet>,
		providers: HashMap<String, Arc<dyn HeaderProvider>>,
	) -> Self {
		Self { base, providers }
	}
}

#[async_trait]
impl Stage for LoadHeaders {
	fn name(&self) -> &'static str {
		"load-headers"
	}

	async fn run(&self, _headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		let base = self.base.get(&ctx.locale).cloned().unwrap_or_default();

		match self.providers.get(&ctx.locale) {
			Some(provider) => provider.provide(base, ctx).await,
			None => Ok(base),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::FileInfo;
	use crate::fs::NativeFs;
	use grease_headers::{DEFAULT_LOCALE, HeaderValue};

	fn ctx(locale: &str) -> WaterfallContext {
		WaterfallContext {
			build_no: 1,
			build_time: 0,
			file_info: FileInfo::from_output("main", "out.js").unwrap(),
			locale: locale.to_owned(),
		}
	}

	fn single(headers: &HeaderSet, tag: &str) -> Option<String> {
		headers.get(tag).and_then(HeaderValue::as_single).map(str::to_owned)
	}

	#[tokio::test]
	async fn package_loader_maps_manifest_fields() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("package.json"),
			r#"{
				"name": "x",
				"version": "1.0.0",
				"description": "a script",
				"author": {"name": "someone", "email": "s@example.com"},
				"homepage": "https://example.com",
				"bugs": {"url": "https://example.com/issues"}
			}"#,
		)
		.unwrap();

		let mut loader = PackageLoader::new(dir.path());
		let headers = loader.load(&NativeFs).await;
		assert_eq!(single(&headers, "name").as_deref(), Some("x"));
		assert_eq!(single(&headers, "version").as_deref(), Some("1.0.0"));
		assert_eq!(single(&headers, "author").as_deref(), Some("someone"));
		assert_eq!(
			single(&headers, "supportURL").as_deref(),
			Some("https://example.com/issues")
		);
	}

	#[tokio::test]
	async fn package_loader_walks_ancestors() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("package.json"), r#"{"name": "up"}"#).unwrap();
		let nested = dir.path().join("a").join("b");
		std::fs::create_dir_all(&nested).unwrap();

		let mut loader = PackageLoader::new(&nested);
		let headers = loader.load(&NativeFs).await;
		assert_eq!(single(&headers, "name").as_deref(), Some("up"));
	}

	#[tokio::test]
	async fn package_loader_soft_fails_to_empty() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("package.json"), "not json").unwrap();

		let mut loader = PackageLoader::new(dir.path());
		assert!(loader.load(&NativeFs).await.is_empty());
	}

	/// Test file system with an externally controlled timestamp.
	struct ClockedFs {
		contents: std::sync::Mutex<String>,
		mtime: std::sync::atomic::AtomicU64,
	}

	impl ClockedFs {
		fn new(contents: &str) -> Self {
			Self {
				contents: std::sync::Mutex::new(contents.to_owned()),
				mtime: std::sync::atomic::AtomicU64::new(1),
			}
		}

		fn update(&self, contents: &str, advance_mtime: bool) {
			*self.contents.lock().unwrap() = contents.to_owned();
			if advance_mtime {
				self.mtime.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
			}
		}
	}

	#[async_trait]
	impl FileSystem for ClockedFs {
		async fn read_to_string(&self, _path: &Path) -> std::io::Result<String> {
			Ok(self.contents.lock().unwrap().clone())
		}

		async fn write_string(&self, _path: &Path, _contents: &str) -> std::io::Result<()> {
			unreachable!("loaders never write")
		}

		async fn mtime_millis(&self, _path: &Path) -> std::io::Result<u64> {
			Ok(self.mtime.load(std::sync::atomic::Ordering::SeqCst))
		}
	}

	#[tokio::test]
	async fn file_loader_caches_until_timestamp_advances() {
		let fs = ClockedFs::new(r#"{"name": "one"}"#);
		let mut loader = FileLoader::new("/headers.json");

		let first = loader.load(&fs).await.unwrap();
		assert_eq!(single(&first, "name").as_deref(), Some("one"));

		// Content changed but the timestamp did not: cache is served.
		fs.update(r#"{"name": "two"}"#, false);
		let cached = loader.load(&fs).await.unwrap();
		assert_eq!(single(&cached, "name").as_deref(), Some("one"));

		// Timestamp advanced: re-read.
		fs.update(r#"{"name": "three"}"#, true);
		let reread = loader.load(&fs).await.unwrap();
		assert_eq!(single(&reread, "name").as_deref(), Some("three"));
	}

	#[tokio::test]
	async fn file_loader_rejects_malformed_json() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("headers.json");
		std::fs::write(&path, "{").unwrap();

		let mut loader = FileLoader::new(&path);
		assert!(matches!(
			loader.load(&NativeFs).await,
			Err(PipelineError::HeadersFile { .. })
		));
	}

	#[tokio::test]
	async fn load_stage_composes_base_and_provider() {
		let mut base = HeaderSet::new();
		base.set("name", "from-base");
		base.set("version", "1");

		let provider: Arc<dyn HeaderProvider> =
			Arc::new(|mut headers: HeaderSet, _ctx: &WaterfallContext| {
				headers.set("name", "from-provider");
				headers
			});

		let stage = LoadHeaders::new(
			HashMap::from([(DEFAULT_LOCALE.to_owned(), base)]),
			HashMap::from([(DEFAULT_LOCALE.to_owned(), provider)]),
		);

		let out = stage.run(HeaderSet::new(), &ctx(DEFAULT_LOCALE)).await.unwrap();
		assert_eq!(single(&out, "name").as_deref(), Some("from-provider"));
		assert_eq!(single(&out, "version").as_deref(), Some("1"));

		// Locale without any source resolves to an empty set.
		assert!(stage.run(HeaderSet::new(), &ctx("en")).await.unwrap().is_empty());
	}
}
