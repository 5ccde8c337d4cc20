//! Subresource-integrity digests and their text form.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{PipelineError, Result};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
	Sha256,
	Sha384,
	Sha512,
}

impl Algorithm {
	pub const ALL: &'static [Algorithm] = &[Algorithm::Sha256, Algorithm::Sha384, Algorithm::Sha512];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Sha256 => "sha256",
			Self::Sha384 => "sha384",
			Self::Sha512 => "sha512",
		}
	}

	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"sha256" => Some(Self::Sha256),
			"sha384" => Some(Self::Sha384),
			"sha512" => Some(Self::Sha512),
			_ => None,
		}
	}
}

impl fmt::Display for Algorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Incremental digest over a streamed body.
pub(crate) enum Hasher {
	Sha256(Sha256),
	Sha384(Sha384),
	Sha512(Sha512),
}

impl Hasher {
	pub(crate) fn new(algorithm: Algorithm) -> Self {
		match algorithm {
			Algorithm::Sha256 => Self::Sha256(Sha256::new()),
			Algorithm::Sha384 => Self::Sha384(Sha384::new()),
			Algorithm::Sha512 => Self::Sha512(Sha512::new()),
		}
	}

	pub(crate) fn update(&mut self, data: &[u8]) {
		match self {
			Self::Sha256(hasher) => hasher.update(data),
			Self::Sha384(hasher) => hasher.update(data),
			Self::Sha512(hasher) => hasher.update(data),
		}
	}

	pub(crate) fn finalize(self) -> (Algorithm, String) {
		match self {
			Self::Sha256(hasher) => (Algorithm::Sha256, BASE64.encode(hasher.finalize())),
			Self::Sha384(hasher) => (Algorithm::Sha384, BASE64.encode(hasher.finalize())),
			Self::Sha512(hasher) => (Algorithm::Sha512, BASE64.encode(hasher.finalize())),
		}
	}
}

/// Digests known for one resource, keyed by algorithm.
///
/// Both maps and digest sets are ordered, so the serialized form is stable
/// for identical inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Integrity {
	digests: BTreeMap<Algorithm, BTreeSet<String>>,
}

impl Integrity {
	pub fn is_empty(&self) -> bool {
		self.digests.is_empty()
	}

	pub fn has(&self, algorithm: Algorithm) -> bool {
		self.digests.contains_key(&algorithm)
	}

	pub fn insert(&mut self, algorithm: Algorithm, digest: String) {
		self.digests.entry(algorithm).or_default().insert(digest);
	}

	/// Algorithms from `wanted` with no digest yet.
	pub fn missing(&self, wanted: &[Algorithm]) -> Vec<Algorithm> {
		wanted
			.iter()
			.copied()
			.filter(|algorithm| !self.has(*algorithm))
			.collect()
	}

	/// Unions `other` into `self`.
	///
	/// Two sources claiming different digests for the same algorithm cannot
	/// both be right; that is an [`PipelineError::IntegrityMismatch`], never
	/// a silent preference.
	pub fn merge(&mut self, other: &Integrity, url: &str) -> Result<()> {
		for (algorithm, digests) in &other.digests {
			match self.digests.get(algorithm) {
				Some(existing) if existing != digests => {
					return Err(PipelineError::IntegrityMismatch {
						url: url.to_owned(),
						algorithm: algorithm.to_string(),
					});
				}
				Some(_) => {}
				None => {
					self.digests.insert(*algorithm, digests.clone());
				}
			}
		}
		Ok(())
	}

	/// Parses an integrity string: `alg-base64digest` entries separated by
	/// commas, semicolons or whitespace.
	///
	/// `strict` makes a malformed entry fatal; otherwise it is skipped.
	pub fn parse(input: &str, strict: bool) -> Result<Self> {
		let mut integrity = Self::default();

		for token in input.split([',', ';', ' ', '\t', '\n']) {
			if token.is_empty() {
				continue;
			}

			let parsed = token.split_once('-').and_then(|(name, digest)| {
				let algorithm = Algorithm::parse(name)?;
				BASE64.decode(digest).ok()?;
				Some((algorithm, digest.to_owned()))
			});

			match parsed {
				Some((algorithm, digest)) => integrity.insert(algorithm, digest),
				None if strict => {
					return Err(PipelineError::IntegrityParse {
						input: input.to_owned(),
						reason: format!("malformed entry \"{token}\""),
					});
				}
				None => {}
			}
		}

		Ok(integrity)
	}
}

impl fmt::Display for Integrity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for (algorithm, digests) in &self.digests {
			for digest in digests {
				if !first {
					f.write_str(",")?;
				}
				write!(f, "{algorithm}-{digest}")?;
				first = false;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// base64 of nothing in particular; valid charset is what matters.
	const DIGEST_A: &str = "aGVsbG8=";
	const DIGEST_B: &str = "d29ybGQ=";

	#[test]
	fn parse_accepts_comma_and_semicolon_separators() {
		let integrity =
			Integrity::parse(&format!("sha256-{DIGEST_A};sha512-{DIGEST_B}"), true).unwrap();
		assert!(integrity.has(Algorithm::Sha256));
		assert!(integrity.has(Algorithm::Sha512));
	}

	#[test]
	fn parse_skips_malformed_entries_when_lax() {
		let integrity = Integrity::parse("not-an-integrity", false).unwrap();
		assert!(integrity.is_empty());
	}

	#[test]
	fn parse_rejects_malformed_entries_when_strict() {
		assert!(matches!(
			Integrity::parse("not-an-integrity", true),
			Err(PipelineError::IntegrityParse { .. })
		));
	}

	#[test]
	fn display_is_sorted_and_comma_joined() {
		let mut integrity = Integrity::default();
		integrity.insert(Algorithm::Sha512, DIGEST_B.to_owned());
		integrity.insert(Algorithm::Sha256, DIGEST_A.to_owned());
		assert_eq!(
			integrity.to_string(),
			format!("sha256-{DIGEST_A},sha512-{DIGEST_B}")
		);
	}

	#[test]
	fn merge_unions_disjoint_algorithms() {
		let mut a = Integrity::default();
		a.insert(Algorithm::Sha256, DIGEST_A.to_owned());
		let mut b = Integrity::default();
		b.insert(Algorithm::Sha512, DIGEST_B.to_owned());

		a.merge(&b, "http://x/").unwrap();
		assert!(a.has(Algorithm::Sha256) && a.has(Algorithm::Sha512));
	}

	#[test]
	fn merge_rejects_conflicting_digests() {
		let mut a = Integrity::default();
		a.insert(Algorithm::Sha256, DIGEST_A.to_owned());
		let mut b = Integrity::default();
		b.insert(Algorithm::Sha256, DIGEST_B.to_owned());

		assert!(matches!(
			a.merge(&b, "http://x/"),
			Err(PipelineError::IntegrityMismatch { .. })
		));
	}

	#[test]
	fn merge_of_identical_digests_is_fine() {
		let mut a = Integrity::default();
		a.insert(Algorithm::Sha256, DIGEST_A.to_owned());
		let b = a.clone();
		a.merge(&b, "http://x/").unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn missing_subtracts_known_algorithms() {
		let mut integrity = Integrity::default();
		integrity.insert(Algorithm::Sha512, DIGEST_A.to_owned());
		assert_eq!(
			integrity.missing(&[Algorithm::Sha256, Algorithm::Sha512]),
			vec![Algorithm::Sha256]
		);
	}

	#[test]
	fn hasher_produces_known_sha256() {
		let mut hasher = Hasher::new(Algorithm::Sha256);
		hasher.update(b"console.log(1)");
		let (algorithm, digest) = hasher.finalize();
		assert_eq!(algorithm, Algorithm::Sha256);
		// printf 'console.log(1)' | openssl dgst -sha256 -binary | base64
		assert_eq!(digest, "CihokcEcBW4atb/CW/XWsvWwbTjqwQlE9nj9ii5ww5M=");
	}
}
