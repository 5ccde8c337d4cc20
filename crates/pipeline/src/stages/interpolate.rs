use async_trait::async_trait;
use grease_headers::{HeaderSet, HeaderValue};
use indexmap::IndexMap;

use crate::context::WaterfallContext;
use crate::error::Result;
use crate::waterfall::Stage;

/// The template variables available to `[token]` interpolation.
pub fn variables(ctx: &WaterfallContext) -> Vec<(&'static str, String)> {
	let info = &ctx.file_info;
	vec![
		("chunkName", info.chunk_name.clone()),
		("file", info.original_file.clone()),
		("filename", info.filename.clone()),
		("basename", info.basename.clone()),
		("query", info.query.clone()),
		("dirname", info.dirname.clone()),
		("buildNo", ctx.build_no.to_string()),
		("buildTime", ctx.build_time.to_string()),
	]
}

/// Replaces every `[token]` occurrence in `input` with its variable value.
/// Unknown tokens are left untouched.
pub fn interpolate_str(input: &str, vars: &[(&'static str, String)]) -> String {
	let mut out = input.to_owned();
	for (token, value) in vars {
		out = out.replace(&format!("[{token}]"), value);
	}
	out
}

/// Expands `[token]` templates in every string of the header set: tag
/// names, scalar values, list elements, and both keys and values of named
/// tags.
#[derive(Debug, Default)]
pub struct Interpolate;

#[async_trait]
impl Stage for Interpolate {
	fn name(&self) -> &'static str {
		"interpolate"
	}

	async fn run(&self, headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		let vars = variables(ctx);
		Ok(headers
			.iter()
			.map(|(tag, value)| (interpolate_str(tag, &vars), interpolate_value(value, &vars)))
			.collect())
	}
}

fn interpolate_value(value: &HeaderValue, vars: &[(&'static str, String)]) -> HeaderValue {
	match value {
		HeaderValue::Single(single) => HeaderValue::Single(interpolate_str(single, vars)),
		HeaderValue::Multi(values) => {
			HeaderValue::Multi(values.iter().map(|v| interpolate_str(v, vars)).collect())
		}
		HeaderValue::Named(map) => HeaderValue::Named(
			map.iter()
				.map(|(key, v)| (interpolate_str(key, vars), interpolate_str(v, vars)))
				.collect::<IndexMap<_, _>>(),
		),
		HeaderValue::Switch(flag) => HeaderValue::Switch(*flag),
	}
}
