//! The build orchestrator.
//!
//! One [`UserscriptPlugin`] lives for the whole watch session; each call to
//! [`UserscriptPlugin::build`] processes one build: compose header sources,
//! resolve headers per eligible artifact (concurrently, one waterfall run
//! per locale), emit the `.user.js`/`.meta.js`/proxy assets, and persist
//! the SSRI lock when it changed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::try_join_all;
use grease_headers::{
	DEFAULT_LOCALE, HeaderSet, LocaleHeaders, RenderOptions, render_header_set, render_headers,
};
use grease_pipeline::{
	DEFAULT_PROXY_BASE, DEFAULT_PROXY_FILENAME, Fetch, FileInfo, FileLoader, FileSystem, FixTags,
	HeaderProvider, HttpFetch, Interpolate, LoadHeaders, NativeFs, PackageLoader, PipelineError,
	ProcessSsri, ProxyScript, ResolveBaseUrls, Result, SetDefaultMatch, SsriLock, Stage,
	ValidateHeaders, Waterfall, WaterfallContext, interpolate_str, variables,
};
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::host::BuildHost;
use crate::options::{HeadersSource, ProxyScriptOptions, UserscriptOptions};

/// The userscript build plugin.
///
/// Holds the state that survives across builds of one watch session: the
/// cached package metadata, the per-locale file-loader caches, and the
/// monotonic build counter.
pub struct UserscriptPlugin {
	options: UserscriptOptions,
	fs: Arc<dyn FileSystem>,
	fetch: Arc<dyn Fetch>,
	package_loader: PackageLoader,
	file_loaders: IndexMap<String, FileLoader>,
	build_no: u32,
}

struct ResolvedArtifact {
	info: FileInfo,
	headers_block: String,
	/// Proxy output filename and rendered block, when proxy mode is on.
	proxy: Option<(String, String)>,
}

impl UserscriptPlugin {
	/// Creates a plugin with the native file system and HTTP fetch.
	pub fn new(options: UserscriptOptions) -> Self {
		Self::with_capabilities(options, Arc::new(NativeFs), Arc::new(HttpFetch::default()))
	}

	/// Creates a plugin with injected file-system and fetch capabilities.
	pub fn with_capabilities(
		options: UserscriptOptions,
		fs: Arc<dyn FileSystem>,
		fetch: Arc<dyn Fetch>,
	) -> Self {
		let root = options.root();

		let mut file_loaders = IndexMap::new();
		let mut register = |locale: &str, source: &HeadersSource| {
			if let HeadersSource::File(path) = source {
				let resolved = if path.is_relative() {
					root.join(path)
				} else {
					path.clone()
				};
				file_loaders.insert(locale.to_owned(), FileLoader::new(resolved));
			}
		};
		if let Some(source) = &options.headers {
			register(DEFAULT_LOCALE, source);
		}
		for (locale, source) in &options.i18n {
			register(locale, source);
		}

		Self {
			package_loader: PackageLoader::new(&root),
			options,
			fs,
			fetch,
			file_loaders,
			build_no: 0,
		}
	}

	/// Runs one build against the host: preprocess, per-artifact resolution,
	/// emission, close. Any stage failure fails the whole build with nothing
	/// emitted for the failing artifact.
	pub async fn build(&mut self, host: &mut dyn BuildHost) -> Result<()> {
		self.build_no += 1;
		let build_no = self.build_no;
		let build_time = now_millis();
		debug!(build_no, "userscript build starting");

		let root = self.options.root();

		// Preprocess: compose per-locale header sources. Package metadata
		// is loaded once per plugin; header files re-read when they change.
		let package = self.package_loader.load(self.fs.as_ref()).await;

		let sources: Vec<(String, Option<HeadersSource>)> =
			std::iter::once((DEFAULT_LOCALE.to_owned(), self.options.headers.clone()))
				.chain(
					self.options
						.i18n
						.iter()
						.map(|(locale, source)| (locale.clone(), Some(source.clone()))),
				)
				.collect();

		let mut base = HashMap::new();
		let mut providers: HashMap<String, Arc<dyn HeaderProvider>> = HashMap::new();
		for (locale, source) in sources {
			let mut composed = if locale == DEFAULT_LOCALE {
				package.clone()
			} else {
				HeaderSet::new()
			};
			match source {
				Some(HeadersSource::Object(headers)) => composed.merge(&headers),
				Some(HeadersSource::File(_)) => {
					if let Some(loader) = self.file_loaders.get_mut(&locale) {
						let loaded = loader.load(self.fs.as_ref()).await?;
						host.add_file_dependency(loader.path());
						composed.merge(&loaded);
					}
				}
				Some(HeadersSource::Provider(provider)) => {
					providers.insert(locale.clone(), provider);
				}
				None => {}
			}
			base.insert(locale, composed);
		}

		// Preprocess: SSRI lock, loaded fresh each build when locking is on.
		let ssri = match &self.options.ssri {
			Some(ssri_options) => {
				let lock_path = ssri_options.lock.resolve(&root);
				let mut lock = SsriLock::new();
				if let Some(path) = &lock_path {
					if let Ok(text) = self.fs.read_to_string(path).await {
						lock = SsriLock::parse(&text).unwrap_or_default();
					}
				}
				let lock = Arc::new(Mutex::new(lock));
				let stage = Arc::new(ProcessSsri::new(
					ssri_options,
					lock.clone(),
					self.fetch.clone(),
				));
				Some((stage, lock, lock_path))
			}
			None => None,
		};

		// The stage chains. Order is load-bearing; see the pipeline docs.
		let load: Arc<dyn Stage> = Arc::new(LoadHeaders::new(base, providers));
		let base_urls: Arc<dyn Stage> = Arc::new(ResolveBaseUrls::new(
			self.options.download_base_url.clone(),
			self.options.update_base_url.clone(),
			self.options.metajs,
		));
		let validate: Arc<dyn Stage> =
			Arc::new(ValidateHeaders::new(self.options.validation_policy()));

		let mut stages: Vec<Arc<dyn Stage>> = vec![load, Arc::new(FixTags), base_urls];
		if let Some((stage, _, _)) = &ssri {
			stages.push(stage.clone());
		}
		stages.push(Arc::new(SetDefaultMatch));

		let mut proxy_stages = stages.clone();
		stages.push(Arc::new(Interpolate));
		stages.push(validate.clone());
		let main = Waterfall::new(stages);

		let proxy = match &self.options.proxy_script {
			Some(proxy_options) => {
				let base_url = match &proxy_options.base_url {
					Some(url) => url.clone(),
					None => Url::parse(DEFAULT_PROXY_BASE).map_err(|source| PipelineError::Url {
						url: DEFAULT_PROXY_BASE.to_owned(),
						source,
					})?,
				};
				proxy_stages.push(Arc::new(ProxyScript::new(base_url)));
				proxy_stages.push(Arc::new(Interpolate));
				proxy_stages.push(validate);
				Some((Waterfall::new(proxy_stages), proxy_options.clone()))
			}
			None => None,
		};

		// Per-artifact resolution, fanned out concurrently. Artifacts never
		// observe each other's in-progress headers; the SSRI lock behind its
		// mutex is the only shared state.
		let locales: Vec<String> = std::iter::once(DEFAULT_LOCALE.to_owned())
			.chain(self.options.i18n.keys().cloned())
			.collect();
		let render = self.options.render_options();
		let metajs = self.options.metajs;

		let mut file_infos = Vec::new();
		for chunk in host.chunks() {
			if !chunk.initial {
				continue;
			}
			for file in &chunk.files {
				if host.get_asset(file).is_none() {
					continue;
				}
				if let Some(info) = FileInfo::from_output(&chunk.name, file) {
					file_infos.push(info);
				}
			}
		}

		let resolved: Vec<ResolvedArtifact> = try_join_all(file_infos.into_iter().map(|info| {
			resolve_artifact(
				&main,
				proxy.as_ref(),
				&render,
				&locales,
				info,
				build_no,
				build_time,
			)
		}))
		.await?;

		// Emission.
		for artifact in &resolved {
			let info = &artifact.info;
			let Some(source) = host.get_asset(&info.original_file) else {
				continue;
			};

			host.emit_asset(
				&info.userjs_file,
				format!("{}\n{}", artifact.headers_block, source),
			);
			if metajs {
				let meta = artifact
					.proxy
					.as_ref()
					.map(|(_, block)| block.as_str())
					.unwrap_or(&artifact.headers_block);
				host.emit_asset(&info.metajs_file, meta.to_owned());
			}
			if let Some((filename, block)) = &artifact.proxy {
				host.emit_asset(filename, block.clone());
			}
			if info.original_file != info.userjs_file {
				host.delete_asset(&info.original_file);
			}
		}

		// Close: persist the SSRI lock, only when something changed.
		if let Some((_, lock, Some(path))) = ssri {
			let mut guard = lock.lock().await;
			if guard.dirty() {
				let json = guard.to_json().map_err(|err| PipelineError::Io {
					path: path.clone(),
					source: std::io::Error::other(err),
				})?;
				self.fs
					.write_string(&path, &json)
					.await
					.map_err(|source| PipelineError::Io {
						path: path.clone(),
						source,
					})?;
				guard.mark_clean();
				info!(path = %path.display(), entries = guard.len(), "ssri lock written");
			}
		}

		Ok(())
	}
}

async fn resolve_artifact(
	main: &Waterfall,
	proxy: Option<&(Waterfall, ProxyScriptOptions)>,
	render: &RenderOptions,
	locales: &[String],
	info: FileInfo,
	build_no: u32,
	build_time: u64,
) -> Result<ResolvedArtifact> {
	let mut locale_map = LocaleHeaders::default();
	for locale in locales {
		let ctx = WaterfallContext {
			build_no,
			build_time,
			file_info: info.clone(),
			locale: locale.clone(),
		};
		let headers = main.run(HeaderSet::new(), &ctx).await?;
		locale_map.insert(locale.clone(), headers);
	}
	let headers_block = render_headers(&locale_map, render);

	let proxy = match proxy {
		Some((chain, options)) => {
			let ctx = WaterfallContext {
				build_no,
				build_time,
				file_info: info.clone(),
				locale: DEFAULT_LOCALE.to_owned(),
			};
			let headers = chain.run(HeaderSet::new(), &ctx).await?;
			let block = render_header_set(&headers, render);
			let template = options.filename.as_deref().unwrap_or(DEFAULT_PROXY_FILENAME);
			let filename = interpolate_str(template, &variables(&ctx));
			Some((filename, block))
		}
		None => None,
	};

	Ok(ResolvedArtifact {
		info,
		headers_block,
		proxy,
	})
}

fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_millis() as u64)
		.unwrap_or_default()
}
