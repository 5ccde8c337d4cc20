//! Userscript build plugin.
//!
//! Generates the `// ==UserScript==` metadata block for JavaScript bundles
//! and attaches it to build outputs: for every eligible entry-chunk `.js`
//! artifact the plugin resolves headers through the `grease-pipeline`
//! waterfall (per configured locale), renders the block, and emits the
//! `.user.js`, `.meta.js` and optional dev-proxy assets through the
//! [`BuildHost`] seam.
//!
//! # Quick start
//!
//! ```no_run
//! use grease_plugin::{MemoryHost, UserscriptOptions, UserscriptPlugin};
//!
//! # async fn demo() -> grease_pipeline::Result<()> {
//! let mut host = MemoryHost::new();
//! host.add_entry("main", "output.js", "console.log('hi');");
//!
//! let mut plugin = UserscriptPlugin::new(UserscriptOptions::default());
//! plugin.build(&mut host).await?;
//!
//! assert!(host.asset("output.user.js").is_some());
//! # Ok(())
//! # }
//! ```

pub mod host;
pub mod options;
pub mod plugin;

pub use grease_headers::{
	DEFAULT_LOCALE, HeaderSet, HeaderValue, RenderOptions, ValidationPolicy,
};
pub use grease_pipeline::{
	Algorithm, Fetch, FileSystem, HeaderProvider, HttpFetch, LockOption, NativeFs, PipelineError,
	Result, SsriOptions, SsriTag, WaterfallContext,
};
pub use host::{BuildHost, ChunkFiles, MemoryHost};
pub use options::{HeadersSource, ProxyScriptOptions, UserscriptOptions};
pub use plugin::UserscriptPlugin;
