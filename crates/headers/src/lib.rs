//! Userscript header model for the grease plugin.
//!
//! This crate owns the vocabulary of the `// ==UserScript==` block:
//!
//! - **Model**: the four tag value shapes and the [`HeaderSet`] container,
//!   with override-merge and patch (explicit-delete) semantics.
//! - **Rules**: a declarative table of recognized tags — shape, URL-ness,
//!   required/optional, localizability, mutual-exclusion groups.
//! - **Validation**: one generic interpreter over the table with `strict`
//!   and `whitelist` toggles and locale-aware rule sets.
//! - **Rendering**: deterministic conversion of one or more locales of
//!   resolved headers into the literal comment-block text.
//!
//! Header resolution (loaders, waterfall stages, SSRI) lives in
//! `grease-pipeline`; this crate is pure data and text.

pub mod error;
pub mod model;
pub mod render;
pub mod tags;
pub mod validate;

pub use error::{HeaderError, Result, Violation, Violations};
pub use model::{DEFAULT_LOCALE, HeaderPatch, HeaderSet, HeaderValue, LocaleHeaders};
pub use render::{RenderOptions, render_header_set, render_headers};
pub use tags::{FIXABLE_TAGS, TAG_RULES, TagRule, TagShape, rule_for};
pub use validate::{ValidationPolicy, validate};
