//! The plugin's recognized configuration options.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use grease_headers::{HeaderSet, RenderOptions, ValidationPolicy};
use grease_pipeline::{HeaderProvider, SsriOptions};
use indexmap::IndexMap;
use url::Url;

/// Where one locale's headers come from.
#[derive(Clone)]
pub enum HeadersSource {
	/// A statically supplied header set.
	Object(HeaderSet),
	/// A JSON file, resolved against the project root when relative.
	File(PathBuf),
	/// A provider function invoked per artifact and locale.
	Provider(Arc<dyn HeaderProvider>),
}

impl HeadersSource {
	pub fn provider(provider: impl HeaderProvider + 'static) -> Self {
		Self::Provider(Arc::new(provider))
	}
}

impl fmt::Debug for HeadersSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Object(headers) => f.debug_tuple("Object").field(headers).finish(),
			Self::File(path) => f.debug_tuple("File").field(path).finish(),
			Self::Provider(_) => f.debug_tuple("Provider").field(&"..").finish(),
		}
	}
}

impl From<HeaderSet> for HeadersSource {
	fn from(headers: HeaderSet) -> Self {
		Self::Object(headers)
	}
}

impl From<PathBuf> for HeadersSource {
	fn from(path: PathBuf) -> Self {
		Self::File(path)
	}
}

/// Dev-mode proxy-script options.
#[derive(Debug, Clone, Default)]
pub struct ProxyScriptOptions {
	/// Output-name template; `[token]` variables apply. Defaults to
	/// `[basename].proxy.user.js`.
	pub filename: Option<String>,
	/// Dev-server base the proxy `@require`s the bundle from. Defaults to
	/// `http://localhost:8080/`.
	pub base_url: Option<Url>,
}

/// Everything the plugin recognizes.
///
/// The zero-config default emits `.user.js`/`.meta.js` with strict
/// validation and headers taken from the nearest `package.json`.
#[derive(Debug)]
pub struct UserscriptOptions {
	/// Base directory for the package manifest, relative header files and
	/// the SSRI lock file. Defaults to the current directory.
	pub root: Option<PathBuf>,
	/// Default-locale header source.
	pub headers: Option<HeadersSource>,
	/// Additional locales and their sources.
	pub i18n: IndexMap<String, HeadersSource>,
	/// Emit the `.meta.js` companion.
	pub metajs: bool,
	/// Base URL for auto-resolving `downloadURL`.
	pub download_base_url: Option<Url>,
	/// Base URL for auto-resolving `updateURL`; falls back to
	/// `download_base_url`.
	pub update_base_url: Option<Url>,
	/// Subresource-integrity stage; `None` disables it.
	pub ssri: Option<SsriOptions>,
	/// Dev-mode proxy script; `None` disables it.
	pub proxy_script: Option<ProxyScriptOptions>,
	/// Fail the build on header rule violations.
	pub strict: bool,
	/// Silently drop unrecognized tags.
	pub whitelist: bool,
	/// Align rendered values into a column.
	pub pretty: bool,
	/// Override the rendered block prefix.
	pub prefix: Option<String>,
	/// Override the rendered block suffix.
	pub suffix: Option<String>,
	/// Override the tag priority order.
	pub tag_order: Option<Vec<String>>,
}

impl Default for UserscriptOptions {
	fn default() -> Self {
		Self {
			root: None,
			headers: None,
			i18n: IndexMap::new(),
			metajs: true,
			download_base_url: None,
			update_base_url: None,
			ssri: None,
			proxy_script: None,
			strict: true,
			whitelist: false,
			pretty: false,
			prefix: None,
			suffix: None,
			tag_order: None,
		}
	}
}

impl UserscriptOptions {
	pub(crate) fn render_options(&self) -> RenderOptions {
		let mut render = RenderOptions {
			pretty: self.pretty,
			..RenderOptions::default()
		};
		if let Some(prefix) = &self.prefix {
			render.prefix = prefix.clone();
		}
		if let Some(suffix) = &self.suffix {
			render.suffix = suffix.clone();
		}
		if let Some(tag_order) = &self.tag_order {
			render.tag_order = tag_order.clone();
		}
		render
	}

	pub(crate) fn validation_policy(&self) -> ValidationPolicy {
		ValidationPolicy {
			strict: self.strict,
			whitelist: self.whitelist,
		}
	}

	pub(crate) fn root(&self) -> PathBuf {
		self.root.clone().unwrap_or_else(|| PathBuf::from("."))
	}
}
