//! The subresource-integrity stage.
//!
//! Attaches integrity fragments to every eligible `require`/`resource` URL
//! so the userscript manager can verify fetched remote code. Integrity for
//! a URL comes from three sources, merged in order: the inline fragment the
//! user pinned in configuration, the persisted lock file, and digests
//! computed by fetching the resource. Sources that disagree are a hard
//! error; a missing digest triggers exactly one network fetch per URL per
//! build, bounded by a shared concurrency gate.

mod integrity;
mod lock;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use grease_headers::{HeaderSet, HeaderValue};
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;
use url::Url;

use crate::context::WaterfallContext;
use crate::error::{PipelineError, Result};
use crate::fetch::Fetch;
use crate::waterfall::Stage;

pub use integrity::{Algorithm, Integrity};
pub use lock::{DEFAULT_LOCK_FILE, SsriLock};

/// Which header tag a candidate URL came from; filter predicates see this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsriTag {
	Require,
	Resource,
}

/// Candidate filter: return `true` from an include filter to keep a URL,
/// `true` from an exclude filter to drop it.
pub type UrlFilter = Arc<dyn Fn(SsriTag, &Url) -> bool + Send + Sync>;

/// Where the lock file lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LockOption {
	/// No persistence; integrities are recomputed every build.
	Disabled,
	/// [`DEFAULT_LOCK_FILE`] under the project root.
	#[default]
	Default,
	/// An explicit path, resolved against the project root when relative.
	Path(PathBuf),
}

impl LockOption {
	/// Resolves the lock-file path, `None` when locking is disabled.
	pub fn resolve(&self, root: &Path) -> Option<PathBuf> {
		match self {
			Self::Disabled => None,
			Self::Default => Some(root.join(DEFAULT_LOCK_FILE)),
			Self::Path(path) if path.is_relative() => Some(root.join(path)),
			Self::Path(path) => Some(path.clone()),
		}
	}
}

/// Configuration of the SSRI stage.
#[derive(Clone)]
pub struct SsriOptions {
	/// Digests to guarantee for every eligible URL.
	pub algorithms: Vec<Algorithm>,
	/// Keep only URLs this predicate accepts.
	pub include: Option<UrlFilter>,
	/// Drop URLs this predicate accepts.
	pub exclude: Option<UrlFilter>,
	/// Reject malformed inline integrity fragments instead of skipping them.
	pub strict: bool,
	/// Lock-file persistence.
	pub lock: LockOption,
	/// Maximum simultaneous in-flight fetches.
	pub concurrency: usize,
}

impl Default for SsriOptions {
	fn default() -> Self {
		Self {
			algorithms: vec![Algorithm::Sha512],
			include: None,
			exclude: None,
			strict: false,
			lock: LockOption::Default,
			concurrency: 6,
		}
	}
}

impl fmt::Debug for SsriOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SsriOptions")
			.field("algorithms", &self.algorithms)
			.field("include", &self.include.as_ref().map(|_| ".."))
			.field("exclude", &self.exclude.as_ref().map(|_| ".."))
			.field("strict", &self.strict)
			.field("lock", &self.lock)
			.field("concurrency", &self.concurrency)
			.finish()
	}
}

/// The SSRI waterfall stage.
///
/// One instance serves every artifact of a build; the lock map behind the
/// mutex is the only state shared across concurrent artifact resolutions.
pub struct ProcessSsri {
	algorithms: Vec<Algorithm>,
	include: Option<UrlFilter>,
	exclude: Option<UrlFilter>,
	strict: bool,
	lock: Arc<Mutex<SsriLock>>,
	semaphore: Arc<Semaphore>,
	url_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
	fetch: Arc<dyn Fetch>,
}

impl ProcessSsri {
	pub fn new(options: &SsriOptions, lock: Arc<Mutex<SsriLock>>, fetch: Arc<dyn Fetch>) -> Self {
		Self {
			algorithms: options.algorithms.clone(),
			include: options.include.clone(),
			exclude: options.exclude.clone(),
			strict: options.strict,
			lock,
			semaphore: Arc::new(Semaphore::new(options.concurrency.max(1))),
			url_locks: Mutex::new(HashMap::new()),
			fetch,
		}
	}

	/// Collects eligible URLs from `require` and `resource`, keyed by the
	/// literal header string so patching can put results back exactly where
	/// they came from. Unparseable URLs are fatal; filtered URLs are simply
	/// not candidates.
	fn collect_targets(&self, headers: &HeaderSet) -> Result<Vec<(String, Url)>> {
		let mut seen = BTreeSet::new();
		let mut targets = Vec::new();

		let mut add = |tag: SsriTag, raw: &str| -> Result<()> {
			if !seen.insert(raw.to_owned()) {
				return Ok(());
			}
			let url = Url::parse(raw).map_err(|source| PipelineError::Url {
				url: raw.to_owned(),
				source,
			})?;
			if self.eligible(tag, &url) {
				targets.push((raw.to_owned(), url));
			}
			Ok(())
		};

		if let Some(require) = headers.get("require") {
			for raw in require.values() {
				add(SsriTag::Require, raw)?;
			}
		}
		if let Some(HeaderValue::Named(resource)) = headers.get("resource") {
			for raw in resource.values() {
				add(SsriTag::Resource, raw)?;
			}
		}

		Ok(targets)
	}

	fn eligible(&self, tag: SsriTag, url: &Url) -> bool {
		if !matches!(url.scheme(), "http" | "https") {
			return false;
		}
		if let Some(include) = &self.include {
			if !include(tag, url) {
				return false;
			}
		}
		if let Some(exclude) = &self.exclude {
			if exclude(tag, url) {
				return false;
			}
		}
		true
	}

	/// Merges the inline fragment integrity of every target into the lock.
	async fn seed_inline(&self, targets: &[(String, Url)]) -> Result<()> {
		let mut lock = self.lock.lock().await;

		for (_, url) in targets {
			let Some(fragment) = url.fragment() else {
				continue;
			};
			let inline = Integrity::parse(fragment, self.strict)?;
			if inline.is_empty() {
				continue;
			}

			let normalized = normalize(url);
			let mut merged = inline;
			if let Some(known) = lock.get(&normalized) {
				merged.merge(known, &normalized)?;
			}
			lock.store(&normalized, merged);
		}

		Ok(())
	}

	/// Guarantees the configured algorithms are known for `normalized`,
	/// fetching and digesting at most once per URL per build.
	async fn ensure_integrity(&self, normalized: &str) -> Result<()> {
		if self.missing_for(normalized).await.is_empty() {
			return Ok(());
		}

		let url_lock = {
			let mut locks = self.url_locks.lock().await;
			locks
				.entry(normalized.to_owned())
				.or_insert_with(|| Arc::new(Mutex::new(())))
				.clone()
		};
		let _serialized = url_lock.lock().await;

		// Another artifact may have finished this URL while we waited.
		let missing = self.missing_for(normalized).await;
		if missing.is_empty() {
			return Ok(());
		}

		let computed = {
			let _permit =
				self.semaphore
					.acquire()
					.await
					.map_err(|err| PipelineError::Fetch {
						url: normalized.to_owned(),
						reason: err.to_string(),
					})?;
			self.compute(normalized, &missing).await?
		};

		let mut lock = self.lock.lock().await;
		let mut merged = lock.get(normalized).cloned().unwrap_or_default();
		merged.merge(&computed, normalized)?;
		lock.store(normalized, merged);
		Ok(())
	}

	async fn missing_for(&self, normalized: &str) -> Vec<Algorithm> {
		let lock = self.lock.lock().await;
		match lock.get(normalized) {
			Some(integrity) => integrity.missing(&self.algorithms),
			None => self.algorithms.clone(),
		}
	}

	async fn compute(&self, normalized: &str, algorithms: &[Algorithm]) -> Result<Integrity> {
		let url = Url::parse(normalized).map_err(|source| PipelineError::Url {
			url: normalized.to_owned(),
			source,
		})?;

		debug!(url = normalized, ?algorithms, "fetching subresource for integrity");
		let response = self.fetch.fetch(&url).await?;
		if !response.ok() {
			return Err(PipelineError::FetchStatus {
				url: normalized.to_owned(),
				status: response.status,
			});
		}

		let mut hashers: Vec<integrity::Hasher> =
			algorithms.iter().map(|alg| integrity::Hasher::new(*alg)).collect();
		let mut body = response.body;
		let mut buf = vec![0u8; 16 * 1024];
		let mut total = 0usize;

		loop {
			let n = body.read(&mut buf).await.map_err(|err| PipelineError::Fetch {
				url: normalized.to_owned(),
				reason: err.to_string(),
			})?;
			if n == 0 {
				break;
			}
			total += n;
			for hasher in &mut hashers {
				hasher.update(&buf[..n]);
			}
		}

		if total == 0 {
			return Err(PipelineError::EmptyBody {
				url: normalized.to_owned(),
			});
		}

		let mut integrity = Integrity::default();
		for hasher in hashers {
			let (algorithm, digest) = hasher.finalize();
			integrity.insert(algorithm, digest);
		}
		Ok(integrity)
	}

	/// Rewrites targeted URLs with their full merged integrity as the
	/// fragment. Non-target URLs come through byte-identical.
	async fn patch_headers(
		&self,
		mut headers: HeaderSet,
		targets: &[(String, Url)],
	) -> HeaderSet {
		let lock = self.lock.lock().await;
		let mut patched: HashMap<&str, String> = HashMap::new();

		for (raw, url) in targets {
			let normalized = normalize(url);
			if let Some(integrity) = lock.get(&normalized) {
				if !integrity.is_empty() {
					let mut with_fragment = url.clone();
					with_fragment.set_fragment(Some(&integrity.to_string()));
					patched.insert(raw.as_str(), with_fragment.to_string());
				}
			}
		}
		drop(lock);

		let rewrite = |raw: &str| patched.get(raw).cloned().unwrap_or_else(|| raw.to_owned());

		if let Some(require) = headers.get("require") {
			let rewritten = match require {
				HeaderValue::Single(value) => HeaderValue::Single(rewrite(value)),
				HeaderValue::Multi(values) => {
					HeaderValue::Multi(values.iter().map(|value| rewrite(value)).collect())
				}
				other => other.clone(),
			};
			headers.set("require", rewritten);
		}

		if let Some(HeaderValue::Named(resource)) = headers.get("resource") {
			let rewritten: indexmap::IndexMap<String, String> = resource
				.iter()
				.map(|(name, value)| (name.clone(), rewrite(value)))
				.collect();
			headers.set("resource", HeaderValue::Named(rewritten));
		}

		headers
	}
}

fn normalize(url: &Url) -> String {
	let mut stripped = url.clone();
	stripped.set_fragment(None);
	stripped.to_string()
}

#[async_trait]
impl Stage for ProcessSsri {
	fn name(&self) -> &'static str {
		"ssri"
	}

	async fn run(&self, headers: HeaderSet, _ctx: &WaterfallContext) -> Result<HeaderSet> {
		let targets = self.collect_targets(&headers)?;
		if targets.is_empty() {
			return Ok(headers);
		}

		self.seed_inline(&targets).await?;

		let normalized: BTreeSet<String> =
			targets.iter().map(|(_, url)| normalize(url)).collect();
		futures::future::try_join_all(
			normalized.iter().map(|url| self.ensure_integrity(url)),
		)
		.await?;

		Ok(self.patch_headers(headers, &targets).await)
	}
}
