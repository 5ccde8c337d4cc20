use async_trait::async_trait;
use grease_headers::{HeaderPatch, HeaderSet, HeaderValue};
use url::Url;

use crate::context::WaterfallContext;
use crate::error::{PipelineError, Result};
use crate::waterfall::Stage;

/// Default dev-server base the proxy script points at.
pub const DEFAULT_PROXY_BASE: &str = "http://localhost:8080/";

/// Default output-name template for the proxy script.
pub const DEFAULT_PROXY_FILENAME: &str = "[basename].proxy.user.js";

/// Turns a header set into its dev-mode proxy variant: the real bundle is
/// `@require`d from the dev server instead of embedded, and the tags that
/// would make the script look production-hosted (`downloadURL`,
/// `updateURL`, `installURL`) are cleared.
#[derive(Debug)]
pub struct ProxyScript {
	base_url: Url,
}

impl ProxyScript {
	pub fn new(base_url: Url) -> Self {
		Self { base_url }
	}
}

#[async_trait]
impl Stage for ProxyScript {
	fn name(&self) -> &'static str {
		"proxy-script"
	}

	async fn run(&self, mut headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		let userjs = &ctx.file_info.userjs_file;
		let dev_url = self
			.base_url
			.join(userjs)
			.map_err(|source| PipelineError::Url {
				url: userjs.clone(),
				source,
			})?;

		let mut require = headers
			.remove("require")
			.map(HeaderValue::into_list)
			.unwrap_or_default();
		require.push(dev_url.to_string());
		headers.set("require", require);

		let mut patch = HeaderPatch::new();
		patch.delete("downloadURL");
		patch.delete("updateURL");
		patch.delete("installURL");
		headers.apply(&patch);

		Ok(headers)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::FileInfo;
	use grease_headers::DEFAULT_LOCALE;

	fn ctx() -> WaterfallContext {
		WaterfallContext {
			build_no: 1,
			build_time: 0,
			file_info: FileInfo::from_output("main", "out.js").unwrap(),
			locale: DEFAULT_LOCALE.to_owned(),
		}
	}

	fn stage() -> ProxyScript {
		ProxyScript::new(Url::parse(DEFAULT_PROXY_BASE).unwrap())
	}

	#[tokio::test]
	async fn dev_require_is_appended_to_existing_list() {
		let mut headers = HeaderSet::new();
		headers.set("require", "https://cdn.example/lib.js");

		let out = stage().run(headers, &ctx()).await.unwrap();
		assert_eq!(
			out.get("require").unwrap().values().collect::<Vec<_>>(),
			vec![
				"https://cdn.example/lib.js",
				"http://localhost:8080/out.user.js",
			]
		);
	}

	#[tokio::test]
	async fn hosted_url_tags_are_cleared() {
		let mut headers = HeaderSet::new();
		headers.set("downloadURL", "https://dl.example/out.user.js");
		headers.set("updateURL", "https://dl.example/out.meta.js");
		headers.set("installURL", "https://dl.example/install");

		let out = stage().run(headers, &ctx()).await.unwrap();
		assert!(!out.contains("downloadURL"));
		assert!(!out.contains("updateURL"));
		assert!(!out.contains("installURL"));
		assert!(out.contains("require"));
	}
}
