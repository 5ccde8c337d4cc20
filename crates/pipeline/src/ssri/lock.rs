//! The persisted integrity lock.
//!
//! A flat JSON map from fragment-stripped URL to serialized integrity
//! string. The in-memory form tracks a dirty flag so the orchestrator can
//! skip the write-back when a build computed nothing new.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::ssri::integrity::Integrity;

/// Default lock-file name, resolved under the project root.
pub const DEFAULT_LOCK_FILE: &str = "ssri-lock.json";

#[derive(Debug, Default)]
pub struct SsriLock {
	entries: BTreeMap<String, Integrity>,
	dirty: bool,
}

impl SsriLock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses the persisted JSON form. Entries are parsed strictly; we wrote
	/// them, so anything malformed means the file is not ours to trust.
	pub fn parse(json: &str) -> Result<Self> {
		let raw: BTreeMap<String, String> = serde_json::from_str(json).unwrap_or_default();
		let mut entries = BTreeMap::new();
		for (url, serialized) in raw {
			entries.insert(url, Integrity::parse(&serialized, true)?);
		}
		Ok(Self {
			entries,
			dirty: false,
		})
	}

	/// Serializes for persistence; keys and digests are sorted, so the file
	/// is reproducible.
	pub fn to_json(&self) -> serde_json::Result<String> {
		let raw: BTreeMap<&str, String> = self
			.entries
			.iter()
			.map(|(url, integrity)| (url.as_str(), integrity.to_string()))
			.collect();
		serde_json::to_string_pretty(&raw)
	}

	pub fn get(&self, url: &str) -> Option<&Integrity> {
		self.entries.get(url)
	}

	/// Inserts an entry, raising the dirty flag only when it actually
	/// changed relative to what is stored.
	pub fn store(&mut self, url: &str, integrity: Integrity) {
		if self.entries.get(url) != Some(&integrity) {
			self.entries.insert(url.to_owned(), integrity);
			self.dirty = true;
		}
	}

	pub fn dirty(&self) -> bool {
		self.dirty
	}

	pub fn mark_clean(&mut self) {
		self.dirty = false;
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn urls(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}
}
