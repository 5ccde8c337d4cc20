//! The recognized-tag rule table.
//!
//! Every rule the validator applies lives in [`TAG_RULES`]; the validator is
//! a single generic interpreter over this table. Adding a tag means adding a
//! row here.

/// Value shape a tag must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagShape {
	/// Scalar string.
	Single,
	/// Scalar string or list of strings.
	Multi,
	/// String-to-string map.
	Named,
	/// Boolean flag.
	Switch,
	/// Scalar string restricted to a closed value set.
	Enum(&'static [&'static str]),
}

impl TagShape {
	/// Human-readable shape name for violation reports.
	pub fn describe(self) -> &'static str {
		match self {
			Self::Single => "a string",
			Self::Multi => "a string or list of strings",
			Self::Named => "a map of string to string",
			Self::Switch => "a boolean",
			Self::Enum(_) => "an enum string",
		}
	}
}

/// Validation rule for one recognized tag.
#[derive(Debug, Clone, Copy)]
pub struct TagRule {
	pub tag: &'static str,
	pub shape: TagShape,
	/// Value must parse as an absolute URL.
	pub url: bool,
	/// Required in the default locale.
	pub required: bool,
	/// May appear in non-default locale entries.
	pub localizable: bool,
	/// Mutual-exclusion group; at most one member of a group may be set.
	pub exclusive_group: Option<&'static str>,
}

const fn rule(tag: &'static str, shape: TagShape) -> TagRule {
	TagRule {
		tag,
		shape,
		url: false,
		required: false,
		localizable: false,
		exclusive_group: None,
	}
}

impl TagRule {
	const fn url(mut self) -> Self {
		self.url = true;
		self
	}

	const fn required(mut self) -> Self {
		self.required = true;
		self
	}

	const fn localizable(mut self) -> Self {
		self.localizable = true;
		self
	}

	const fn group(mut self, group: &'static str) -> Self {
		self.exclusive_group = Some(group);
		self
	}
}

/// `@run-at` values.
pub const RUN_AT: &[&str] = &[
	"document-start",
	"document-body",
	"document-end",
	"document-idle",
	"context-menu",
];

/// `@sandbox` values.
pub const SANDBOX: &[&str] = &["raw", "JavaScript", "DOM"];

/// `@inject-into` values.
pub const INJECT_INTO: &[&str] = &["page", "content", "auto"];

/// All recognized tags and their constraints.
pub const TAG_RULES: &[TagRule] = &[
	rule("name", TagShape::Single).required().localizable(),
	rule("version", TagShape::Single),
	rule("namespace", TagShape::Single),
	rule("author", TagShape::Single),
	rule("description", TagShape::Single).localizable(),
	rule("homepage", TagShape::Single).url().group("homepage"),
	rule("homepageURL", TagShape::Single).url().group("homepage"),
	rule("website", TagShape::Single).url().group("homepage"),
	rule("source", TagShape::Single).url().group("homepage"),
	rule("icon", TagShape::Single).url().group("icon"),
	rule("iconURL", TagShape::Single).url().group("icon"),
	rule("defaulticon", TagShape::Single).url().group("icon"),
	rule("icon64", TagShape::Single).url().group("icon64"),
	rule("icon64URL", TagShape::Single).url().group("icon64"),
	rule("updateURL", TagShape::Single).url(),
	rule("downloadURL", TagShape::Single).url().group("downloadURL"),
	rule("installURL", TagShape::Single).url().group("downloadURL"),
	rule("supportURL", TagShape::Single).url(),
	rule("include", TagShape::Multi),
	rule("match", TagShape::Multi),
	rule("exclude-match", TagShape::Multi),
	rule("exclude", TagShape::Multi),
	rule("require", TagShape::Multi),
	rule("resource", TagShape::Named),
	rule("connect", TagShape::Multi),
	rule("grant", TagShape::Multi),
	rule("webRequest", TagShape::Multi),
	rule("noframes", TagShape::Switch),
	rule("unwrap", TagShape::Switch),
	rule("antifeature", TagShape::Named).localizable(),
	rule("run-at", TagShape::Enum(RUN_AT)),
	rule("copyright", TagShape::Single),
	rule("sandbox", TagShape::Enum(SANDBOX)),
	rule("inject-into", TagShape::Enum(INJECT_INTO)),
	rule("license", TagShape::Single),
	rule("contributionURL", TagShape::Single).url(),
	rule("contributionAmount", TagShape::Single),
	rule("compatible", TagShape::Named),
	rule("incompatible", TagShape::Named),
];

/// Looks up the rule for a tag name.
pub fn rule_for(tag: &str) -> Option<&'static TagRule> {
	TAG_RULES.iter().find(|rule| rule.tag == tag)
}

/// Legacy tag spellings and their canonical replacements.
///
/// The fix-up stage rewrites the left-hand names; having both sides of a
/// pair set at once is a configuration error.
pub const FIXABLE_TAGS: &[(&str, &str)] = &[
	("updateUrl", "updateURL"),
	("iconUrl", "iconURL"),
	("icon64Url", "icon64URL"),
	("installUrl", "installURL"),
	("supportUrl", "supportURL"),
	("downloadUrl", "downloadURL"),
	("homepageUrl", "homepageURL"),
];
