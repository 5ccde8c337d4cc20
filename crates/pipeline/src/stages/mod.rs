//! The built-in waterfall stages, in their canonical order:
//!
//! 1. [`FixTags`] — legacy tag-name normalization
//! 2. [`ResolveBaseUrls`] — `downloadURL`/`updateURL` from base URLs
//! 3. [`ProcessSsri`](crate::ssri::ProcessSsri) — integrity fragments
//! 4. [`SetDefaultMatch`] — universal `match` fallback
//! 5. [`ProxyScript`] — dev-mode proxy adjustments (proxy chain only)
//! 6. [`Interpolate`] — `[token]` template variables
//! 7. [`ValidateHeaders`] — rule-table validation, last so it sees final
//!    values

mod base_urls;
mod default_match;
mod fix_tags;
mod interpolate;
mod proxy;
mod validate;

pub use base_urls::ResolveBaseUrls;
pub use default_match::SetDefaultMatch;
pub use fix_tags::FixTags;
pub use interpolate::{Interpolate, interpolate_str, variables};
pub use proxy::{DEFAULT_PROXY_BASE, DEFAULT_PROXY_FILENAME, ProxyScript};
pub use validate::ValidateHeaders;
