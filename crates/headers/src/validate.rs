//! Rule-table validation of header sets.
//!
//! Two independent toggles shape the behavior:
//!
//! - **whitelist** drops tags the rule table does not recognize (and, for
//!   non-default locales, tags that are not localizable) before any rule
//!   runs and from the returned set.
//! - **strict** turns rule violations into a fatal [`HeaderError`]; all
//!   violations are collected before failing, not just the first.
//!
//! With both toggles off, any input passes through untouched.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{HeaderError, Result, Violation, Violations};
use crate::model::{DEFAULT_LOCALE, HeaderSet, HeaderValue};
use crate::tags::{TAG_RULES, TagRule, TagShape, rule_for};

/// Validation toggles, mirroring the plugin's `strict` / `whitelist`
/// options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationPolicy {
	pub strict: bool,
	pub whitelist: bool,
}

/// Validates `headers` for `locale` under `policy`.
///
/// Returns the (possibly whitelist-filtered) header set, or a
/// [`HeaderError::Validation`] carrying every violation found.
pub fn validate(headers: &HeaderSet, locale: &str, policy: ValidationPolicy) -> Result<HeaderSet> {
	let default_locale = locale == DEFAULT_LOCALE;

	let filtered: HeaderSet = if policy.whitelist {
		headers
			.iter()
			.filter(|(tag, _)| {
				rule_for(tag).is_some_and(|rule| default_locale || rule.localizable)
			})
			.map(|(tag, value)| (tag.to_owned(), value.clone()))
			.collect()
	} else {
		headers.clone()
	};

	if !policy.strict {
		return Ok(filtered);
	}

	let mut violations = Vec::new();

	for (tag, value) in filtered.iter() {
		match rule_for(tag) {
			None => violations.push(Violation::UnknownTag { tag: tag.to_owned() }),
			Some(rule) if !default_locale && !rule.localizable => {
				violations.push(Violation::NotLocalizable {
					tag: tag.to_owned(),
					locale: locale.to_owned(),
				});
			}
			Some(rule) => check_value(rule, value, &mut violations),
		}
	}

	if default_locale {
		for rule in TAG_RULES.iter().filter(|rule| rule.required) {
			if !filtered.contains(rule.tag) {
				violations.push(Violation::MissingRequired { tag: rule.tag.to_owned() });
			}
		}
	}

	check_exclusive_groups(&filtered, &mut violations);

	if violations.is_empty() {
		Ok(filtered)
	} else {
		Err(HeaderError::Validation {
			locale: locale.to_owned(),
			violations: Violations(violations),
		})
	}
}

fn check_value(rule: &TagRule, value: &HeaderValue, violations: &mut Vec<Violation>) {
	let tag = rule.tag.to_owned();
	match (rule.shape, value) {
		(TagShape::Single, HeaderValue::Single(single)) => {
			check_url(rule, single, violations);
		}
		(TagShape::Multi, HeaderValue::Single(_) | HeaderValue::Multi(_)) => {}
		(TagShape::Named, HeaderValue::Named(_)) => {}
		(TagShape::Switch, HeaderValue::Switch(_)) => {}
		(TagShape::Enum(allowed), HeaderValue::Single(single)) => {
			if !allowed.contains(&single.as_str()) {
				violations.push(Violation::InvalidEnum {
					tag,
					value: single.clone(),
					allowed,
				});
			}
		}
		(shape, _) => violations.push(Violation::WrongShape {
			tag,
			expected: shape.describe(),
		}),
	}
}

fn check_url(rule: &TagRule, value: &str, violations: &mut Vec<Violation>) {
	if rule.url && Url::parse(value).is_err() {
		violations.push(Violation::InvalidUrl {
			tag: rule.tag.to_owned(),
			value: value.to_owned(),
		});
	}
}

fn check_exclusive_groups(headers: &HeaderSet, violations: &mut Vec<Violation>) {
	let mut groups: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();

	for (tag, _) in headers.iter() {
		if let Some(group) = rule_for(tag).and_then(|rule| rule.exclusive_group) {
			groups.entry(group).or_default().push(tag.to_owned());
		}
	}

	for (group, tags) in groups {
		if tags.len() > 1 {
			violations.push(Violation::ExclusiveGroup { group, tags });
		}
	}
}
