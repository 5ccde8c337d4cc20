//! Header resolution pipeline for the grease plugin.
//!
//! The pipeline takes an initially empty header set through an ordered
//! chain of stages — source loading, tag fix-up, base-URL resolution,
//! subresource integrity, default-tag injection, interpolation, validation
//! — producing the final per-locale header sets the plugin renders and
//! emits.
//!
//! The outside world is injected: file access through [`FileSystem`],
//! network access through [`Fetch`]. The crate never touches the build
//! host's asset graph; that wiring lives in `grease-plugin`.

pub mod context;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod loaders;
pub mod ssri;
pub mod stages;
pub mod waterfall;

pub use context::{FileInfo, WaterfallContext};
pub use error::{PipelineError, Result};
pub use fetch::{Fetch, FetchResponse, HttpFetch};
pub use fs::{FileSystem, NativeFs};
pub use loaders::{FileLoader, HeaderProvider, LoadHeaders, PackageLoader};
pub use ssri::{
	Algorithm, DEFAULT_LOCK_FILE, Integrity, LockOption, ProcessSsri, SsriLock, SsriOptions,
	SsriTag, UrlFilter,
};
pub use stages::{
	DEFAULT_PROXY_BASE, DEFAULT_PROXY_FILENAME, FixTags, Interpolate, ProxyScript,
	ResolveBaseUrls, SetDefaultMatch, ValidateHeaders, interpolate_str, variables,
};
pub use waterfall::{Stage, Waterfall};
