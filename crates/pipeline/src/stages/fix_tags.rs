use async_trait::async_trait;
use grease_headers::{FIXABLE_TAGS, HeaderSet};

use crate::context::WaterfallContext;
use crate::error::{PipelineError, Result};
use crate::waterfall::Stage;

/// Rewrites legacy tag spellings (`updateUrl`, `iconUrl`, ...) to their
/// canonical names before any other stage looks at them.
///
/// Having both spellings set at once is ambiguous and therefore fatal.
#[derive(Debug, Default)]
pub struct FixTags;

#[async_trait]
impl Stage for FixTags {
	fn name(&self) -> &'static str {
		"fix-tags"
	}

	async fn run(&self, mut headers: HeaderSet, _ctx: &WaterfallContext) -> Result<HeaderSet> {
		for &(legacy, canonical) in FIXABLE_TAGS {
			if let Some(value) = headers.remove(legacy) {
				if headers.contains(canonical) {
					return Err(PipelineError::AmbiguousTags { legacy, canonical });
				}
				headers.set(canonical, value);
			}
		}
		Ok(headers)
	}
}
