//! Header value shapes and the header set container.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key of the default (unlocalized) locale in a [`LocaleHeaders`] map.
pub const DEFAULT_LOCALE: &str = "";

/// A single header tag value.
///
/// Deserialization is shape-driven: a JSON boolean becomes [`Switch`],
/// a string becomes [`Single`], an array becomes [`Multi`] and an object
/// becomes [`Named`].
///
/// [`Switch`]: HeaderValue::Switch
/// [`Single`]: HeaderValue::Single
/// [`Multi`]: HeaderValue::Multi
/// [`Named`]: HeaderValue::Named
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
	/// Boolean presence flag (`noframes`, `unwrap`).
	Switch(bool),
	/// Scalar string value.
	Single(String),
	/// Ordered list of values; one rendered line per element.
	Multi(Vec<String>),
	/// Named map value (`resource`, `antifeature`, `compatible`).
	Named(IndexMap<String, String>),
}

impl HeaderValue {
	/// Returns the scalar value of a [`Single`](Self::Single) tag.
	pub fn as_single(&self) -> Option<&str> {
		match self {
			Self::Single(value) => Some(value),
			_ => None,
		}
	}

	/// Iterates the string values of a scalar-or-list tag.
	///
	/// [`Named`](Self::Named) yields its map values; [`Switch`](Self::Switch)
	/// yields nothing.
	pub fn values(&self) -> impl Iterator<Item = &str> {
		let values: Vec<&str> = match self {
			Self::Single(value) => vec![value],
			Self::Multi(values) => values.iter().map(String::as_str).collect(),
			Self::Named(map) => map.values().map(String::as_str).collect(),
			Self::Switch(_) => Vec::new(),
		};
		values.into_iter()
	}

	/// Coerces a scalar-or-list value into a list, consuming self.
	///
	/// Used by stages that append to `require`. Non-list shapes other than
	/// [`Single`](Self::Single) coerce to an empty list.
	pub fn into_list(self) -> Vec<String> {
		match self {
			Self::Single(value) => vec![value],
			Self::Multi(values) => values,
			_ => Vec::new(),
		}
	}
}

impl From<&str> for HeaderValue {
	fn from(value: &str) -> Self {
		Self::Single(value.to_owned())
	}
}

impl From<String> for HeaderValue {
	fn from(value: String) -> Self {
		Self::Single(value)
	}
}

impl From<bool> for HeaderValue {
	fn from(value: bool) -> Self {
		Self::Switch(value)
	}
}

impl From<Vec<String>> for HeaderValue {
	fn from(values: Vec<String>) -> Self {
		Self::Multi(values)
	}
}

impl From<IndexMap<String, String>> for HeaderValue {
	fn from(map: IndexMap<String, String>) -> Self {
		Self::Named(map)
	}
}

/// A mapping from tag name to tag value.
///
/// Insertion order is preserved for reproducible rendering, but equality is
/// structural and order-independent. Unknown tags are allowed; validation
/// decides what to do with them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderSet(IndexMap<String, HeaderValue>);

impl HeaderSet {
	/// Creates an empty header set.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, tag: &str) -> Option<&HeaderValue> {
		self.0.get(tag)
	}

	pub fn contains(&self, tag: &str) -> bool {
		self.0.contains_key(tag)
	}

	/// Inserts a tag, replacing any previous value.
	pub fn set(&mut self, tag: impl Into<String>, value: impl Into<HeaderValue>) {
		self.0.insert(tag.into(), value.into());
	}

	/// Removes a tag, returning its previous value.
	pub fn remove(&mut self, tag: &str) -> Option<HeaderValue> {
		self.0.shift_remove(tag)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
		self.0.iter().map(|(tag, value)| (tag.as_str(), value))
	}

	pub fn tags(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	/// Overlays `other` onto this set; tags present in `other` win whole.
	pub fn merge(&mut self, other: &HeaderSet) {
		for (tag, value) in &other.0 {
			self.0.insert(tag.clone(), value.clone());
		}
	}

	/// Applies a patch: `Some` entries replace, `None` entries delete.
	pub fn apply(&mut self, patch: &HeaderPatch) {
		for (tag, value) in &patch.0 {
			match value {
				Some(value) => {
					self.0.insert(tag.clone(), value.clone());
				}
				None => {
					self.0.shift_remove(tag);
				}
			}
		}
	}
}

impl FromIterator<(String, HeaderValue)> for HeaderSet {
	fn from_iter<I: IntoIterator<Item = (String, HeaderValue)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl<'a> IntoIterator for &'a HeaderSet {
	type Item = (&'a String, &'a HeaderValue);
	type IntoIter = indexmap::map::Iter<'a, String, HeaderValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// A sparse header-set update where `None` means "delete this tag".
///
/// Plain [`HeaderSet::merge`] cannot express removal; stages that must clear
/// tags (the proxy-script adjustment drops `downloadURL`, `updateURL` and
/// `installURL`) build a patch instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderPatch(IndexMap<String, Option<HeaderValue>>);

impl HeaderPatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a replacement for `tag`.
	pub fn set(&mut self, tag: impl Into<String>, value: impl Into<HeaderValue>) {
		self.0.insert(tag.into(), Some(value.into()));
	}

	/// Records a deletion of `tag`.
	pub fn delete(&mut self, tag: impl Into<String>) {
		self.0.insert(tag.into(), None);
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Fully resolved headers per locale; the default locale uses
/// [`DEFAULT_LOCALE`] and is always inserted first.
pub type LocaleHeaders = IndexMap<String, HeaderSet>;
