use async_trait::async_trait;
use grease_headers::HeaderSet;
use url::Url;

use crate::context::WaterfallContext;
use crate::error::{PipelineError, Result};
use crate::waterfall::Stage;

/// Derives `downloadURL` and `updateURL` from configured base URLs.
///
/// Explicitly set tags are left alone. `updateURL` points at the meta file
/// when meta-file generation is enabled, at the userscript file otherwise,
/// resolved against the update base (falling back to the download base).
#[derive(Debug)]
pub struct ResolveBaseUrls {
	download_base: Option<Url>,
	update_base: Option<Url>,
	metajs: bool,
}

impl ResolveBaseUrls {
	pub fn new(download_base: Option<Url>, update_base: Option<Url>, metajs: bool) -> Self {
		Self {
			download_base,
			update_base,
			metajs,
		}
	}
}

fn resolve(base: &Url, target: &str) -> Result<String> {
	base.join(target)
		.map(|url| url.to_string())
		.map_err(|source| PipelineError::Url {
			url: target.to_owned(),
			source,
		})
}

#[async_trait]
impl Stage for ResolveBaseUrls {
	fn name(&self) -> &'static str {
		"resolve-base-urls"
	}

	async fn run(&self, mut headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		// Download/update URLs are not localizable; only the default locale
		// carries them.
		if !ctx.default_locale() {
			return Ok(headers);
		}
		let info = &ctx.file_info;

		if let Some(base) = &self.download_base {
			if !headers.contains("downloadURL") {
				headers.set("downloadURL", resolve(base, &info.userjs_file)?);
			}
		}

		if let Some(base) = self.update_base.as_ref().or(self.download_base.as_ref()) {
			if !headers.contains("updateURL") {
				let target = if self.metajs {
					&info.metajs_file
				} else {
					&info.userjs_file
				};
				headers.set("updateURL", resolve(base, target)?);
			}
		}

		Ok(headers)
	}
}
