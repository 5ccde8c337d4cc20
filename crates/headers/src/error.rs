//! Error types for header validation.

use std::fmt;

use thiserror::Error;

use crate::model::DEFAULT_LOCALE;

/// A single broken rule, naming the tag and what it violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
	/// Tag is not in the rule table.
	UnknownTag { tag: String },
	/// Tag may not appear in a non-default locale.
	NotLocalizable { tag: String, locale: String },
	/// Required tag is absent.
	MissingRequired { tag: String },
	/// Value has the wrong shape for the tag.
	WrongShape { tag: String, expected: &'static str },
	/// Value is not a member of the tag's enum.
	InvalidEnum {
		tag: String,
		value: String,
		allowed: &'static [&'static str],
	},
	/// Value does not parse as an absolute URL.
	InvalidUrl { tag: String, value: String },
	/// More than one member of a mutual-exclusion group is set.
	ExclusiveGroup { group: &'static str, tags: Vec<String> },
}

impl fmt::Display for Violation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnknownTag { tag } => write!(f, "\"{tag}\" is not a recognized tag"),
			Self::NotLocalizable { tag, locale } => {
				write!(f, "\"{tag}\" is not localizable but appears in locale \"{locale}\"")
			}
			Self::MissingRequired { tag } => write!(f, "\"{tag}\" is required but missing"),
			Self::WrongShape { tag, expected } => {
				write!(f, "\"{tag}\" must be {expected}")
			}
			Self::InvalidEnum { tag, value, allowed } => {
				write!(f, "\"{tag}\" has invalid value \"{value}\" (expected one of: {})", allowed.join(", "))
			}
			Self::InvalidUrl { tag, value } => {
				write!(f, "\"{tag}\" must be a URL, got \"{value}\"")
			}
			Self::ExclusiveGroup { group, tags } => {
				let tags = tags.iter().map(|t| format!("\"{t}\"")).collect::<Vec<_>>().join(", ");
				write!(f, "mutually exclusive group \"{group}\" is violated by {tags}")
			}
		}
	}
}

/// All violations found in one validation pass, joined into one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl fmt::Display for Violations {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, violation) in self.0.iter().enumerate() {
			if i > 0 {
				writeln!(f)?;
			}
			write!(f, "  - {violation}")?;
		}
		Ok(())
	}
}

/// Errors produced while mapping a header set against the rule table.
#[derive(Debug, Error)]
pub enum HeaderError {
	/// One or more rule violations in strict mode.
	#[error("invalid headers for locale \"{}\":\n{violations}", display_locale(.locale))]
	Validation {
		locale: String,
		violations: Violations,
	},
}

impl HeaderError {
	/// The violations behind a [`HeaderError::Validation`].
	pub fn violations(&self) -> &[Violation] {
		match self {
			Self::Validation { violations, .. } => &violations.0,
		}
	}
}

fn display_locale(locale: &str) -> &str {
	if locale == DEFAULT_LOCALE { "default" } else { locale }
}

/// Result alias for header operations.
pub type Result<T> = std::result::Result<T, HeaderError>;
