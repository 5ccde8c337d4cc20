use async_trait::async_trait;
use grease_headers::HeaderSet;

use crate::context::WaterfallContext;
use crate::error::Result;
use crate::waterfall::Stage;

/// Pattern matching every URL.
pub const MATCH_ALL: &str = "*://*/*";

/// Injects `match *://*/*` when the default locale's headers carry neither
/// `include` nor `match`. A script with no URL pattern at all would never
/// run; one that names either tag keeps exactly what it named.
#[derive(Debug, Default)]
pub struct SetDefaultMatch;

#[async_trait]
impl Stage for SetDefaultMatch {
	fn name(&self) -> &'static str {
		"default-match"
	}

	async fn run(&self, mut headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		if ctx.default_locale() && !headers.contains("include") && !headers.contains("match") {
			headers.set("match", MATCH_ALL);
		}
		Ok(headers)
	}
}
