//! Rendering of resolved headers into the `// ==UserScript==` block.

use crate::model::{DEFAULT_LOCALE, HeaderSet, HeaderValue, LocaleHeaders};

/// Formatting options for the rendered block.
#[derive(Debug, Clone)]
pub struct RenderOptions {
	/// Text before the tag lines.
	pub prefix: String,
	/// Text after the tag lines.
	pub suffix: String,
	/// Pad the tag column so values align.
	pub pretty: bool,
	/// Tags listed here sort first, in this order; everything else follows
	/// alphabetically.
	pub tag_order: Vec<String>,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self {
			prefix: "// ==UserScript==\n".to_owned(),
			suffix: "// ==/UserScript==\n".to_owned(),
			pretty: false,
			tag_order: [
				"name",
				"description",
				"version",
				"author",
				"homepage",
				"supportURL",
				"include",
				"exclude",
				"match",
			]
			.into_iter()
			.map(str::to_owned)
			.collect(),
		}
	}
}

/// Renders a locale map into one header block.
///
/// Tags of non-default locales are suffixed `tag:locale` and flattened into
/// a single set, default locale first; a later locale wins on collision.
pub fn render_headers(locales: &LocaleHeaders, options: &RenderOptions) -> String {
	let mut merged = HeaderSet::new();

	for (locale, headers) in locales {
		for (tag, value) in headers.iter() {
			let key = if locale == DEFAULT_LOCALE {
				tag.to_owned()
			} else {
				format!("{tag}:{locale}")
			};
			merged.set(key, value.clone());
		}
	}

	render_header_set(&merged, options)
}

/// Renders a single header set (the proxy-script block, or a locale map
/// already flattened).
pub fn render_header_set(headers: &HeaderSet, options: &RenderOptions) -> String {
	let order: Vec<&str> = options.tag_order.iter().map(String::as_str).collect();

	let mut tags: Vec<(&str, &HeaderValue)> = headers.iter().collect();
	tags.sort_by(|(a, _), (b, _)| {
		let pa = order.iter().position(|tag| tag == a).unwrap_or(order.len());
		let pb = order.iter().position(|tag| tag == b).unwrap_or(order.len());
		pa.cmp(&pb).then_with(|| a.cmp(b))
	});

	let rows: Vec<(String, String)> = tags
		.into_iter()
		.flat_map(|(tag, value)| render_tag(tag, value))
		.collect();

	let body = if options.pretty {
		let width = rows.iter().map(|(tag, _)| tag.len()).max().unwrap_or(0);
		rows.iter()
			.map(|(tag, value)| format!("{tag:<width$} {value}").trim_end().to_owned())
			.collect::<Vec<_>>()
			.join("\n")
	} else {
		rows.iter()
			.map(|(tag, value)| format!("{tag} {value}").trim_end().to_owned())
			.collect::<Vec<_>>()
			.join("\n")
	};

	if body.is_empty() {
		format!("{}{}", options.prefix, options.suffix)
	} else {
		format!("{}{}\n{}", options.prefix, body, options.suffix)
	}
}

fn render_tag(tag: &str, value: &HeaderValue) -> Vec<(String, String)> {
	let lead = format!("// @{tag}");
	match value {
		HeaderValue::Single(single) => vec![(lead, single.clone())],
		HeaderValue::Multi(values) => values.iter().map(|v| (lead.clone(), v.clone())).collect(),
		HeaderValue::Named(map) => map
			.iter()
			.map(|(key, v)| (lead.clone(), format!("{key} {v}")))
			.collect(),
		HeaderValue::Switch(true) => vec![(lead, String::new())],
		HeaderValue::Switch(false) => Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use indexmap::IndexMap;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::model::DEFAULT_LOCALE;

	fn locales(headers: HeaderSet) -> LocaleHeaders {
		LocaleHeaders::from_iter([(DEFAULT_LOCALE.to_owned(), headers)])
	}

	#[test]
	fn compact_block_is_line_per_tag() {
		let mut headers = HeaderSet::new();
		headers.set("name", "example");
		headers.set("version", "1.0.0");
		headers.set("match", vec!["*://*/*".to_owned()]);
		let block = render_headers(&locales(headers), &RenderOptions::default());
		assert_eq!(
			block,
			"// ==UserScript==\n\
			 // @name example\n\
			 // @version 1.0.0\n\
			 // @match *://*/*\n\
			 // ==/UserScript==\n"
		);
	}

	#[test]
	fn tag_order_then_alphabetical() {
		let mut headers = HeaderSet::new();
		headers.set("version", "1");
		headers.set("grant", vec!["none".to_owned()]);
		headers.set("connect", vec!["example.com".to_owned()]);
		headers.set("name", "x");
		let block = render_headers(&locales(headers), &RenderOptions::default());
		let tags: Vec<&str> = block
			.lines()
			.filter(|line| line.starts_with("// @"))
			.map(|line| line.split_whitespace().nth(1).unwrap())
			.collect();
		// name and version are in the priority list; connect/grant follow
		// alphabetically.
		assert_eq!(tags, vec!["@name", "@version", "@connect", "@grant"]);
	}

	#[test]
	fn named_switch_and_multi_shapes() {
		let mut headers = HeaderSet::new();
		headers.set("name", "x");
		headers.set("noframes", true);
		headers.set("unwrap", false);
		headers.set(
			"resource",
			IndexMap::from_iter([("css".to_owned(), "http://a/".to_owned())]),
		);
		headers.set(
			"require",
			vec!["http://a/".to_owned(), "http://b/".to_owned()],
		);
		let block = render_headers(&locales(headers), &RenderOptions::default());
		assert_eq!(
			block,
			"// ==UserScript==\n\
			 // @name x\n\
			 // @noframes\n\
			 // @require http://a/\n\
			 // @require http://b/\n\
			 // @resource css http://a/\n\
			 // ==/UserScript==\n"
		);
	}

	#[test]
	fn pretty_mode_aligns_values() {
		let mut headers = HeaderSet::new();
		headers.set("name", "x");
		headers.set("description", "hello");
		let block = render_headers(
			&locales(headers),
			&RenderOptions {
				pretty: true,
				..RenderOptions::default()
			},
		);
		assert_eq!(
			block,
			"// ==UserScript==\n\
			 // @name        x\n\
			 // @description hello\n\
			 // ==/UserScript==\n"
		);
	}

	#[test]
	fn i18n_tags_are_suffixed_and_sorted_after() {
		let mut base = HeaderSet::new();
		base.set("name", "x");
		base.set("description", "hi");
		let mut en = HeaderSet::new();
		en.set("description", "hello");
		let map = LocaleHeaders::from_iter([
			(DEFAULT_LOCALE.to_owned(), base),
			("en".to_owned(), en),
		]);
		let block = render_headers(&map, &RenderOptions::default());
		assert_eq!(
			block,
			"// ==UserScript==\n\
			 // @name x\n\
			 // @description hi\n\
			 // @description:en hello\n\
			 // ==/UserScript==\n"
		);
	}

	#[test]
	fn custom_prefix_suffix_and_empty_set() {
		let block = render_headers(
			&locales(HeaderSet::new()),
			&RenderOptions {
				prefix: "/* begin */\n".to_owned(),
				suffix: "/* end */\n".to_owned(),
				..RenderOptions::default()
			},
		);
		assert_eq!(block, "/* begin */\n/* end */\n");
	}

	#[test]
	fn rendering_is_reproducible() {
		let mut headers = HeaderSet::new();
		headers.set("name", "x");
		headers.set("grant", vec!["GM_getValue".to_owned(), "GM_setValue".to_owned()]);
		let map = locales(headers);
		let options = RenderOptions::default();
		assert_eq!(render_headers(&map, &options), render_headers(&map, &options));
	}
}
