use async_trait::async_trait;
use grease_headers::{HeaderSet, ValidationPolicy, validate};

use crate::context::WaterfallContext;
use crate::error::Result;
use crate::waterfall::Stage;

/// Final stage: maps the header set through the rule table.
///
/// Runs last so it sees final tag values; the active locale selects the
/// rule set (full rules for the default locale, localizable-only for i18n
/// entries).
#[derive(Debug)]
pub struct ValidateHeaders {
	policy: ValidationPolicy,
}

impl ValidateHeaders {
	pub fn new(policy: ValidationPolicy) -> Self {
		Self { policy }
	}
}

#[async_trait]
impl Stage for ValidateHeaders {
	fn name(&self) -> &'static str {
		"validate-headers"
	}

	async fn run(&self, headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		Ok(validate(&headers, &ctx.locale, self.policy)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::FileInfo;
	use crate::error::PipelineError;
	use grease_headers::DEFAULT_LOCALE;

	fn ctx(locale: &str) -> WaterfallContext {
		WaterfallContext {
			build_no: 1,
			build_time: 0,
			file_info: FileInfo::from_output("main", "out.js").unwrap(),
			locale: locale.to_owned(),
		}
	}

	#[tokio::test]
	async fn strict_mode_propagates_violations() {
		let stage = ValidateHeaders::new(ValidationPolicy {
			strict: true,
			whitelist: false,
		});
		let err = stage.run(HeaderSet::new(), &ctx(DEFAULT_LOCALE)).await.unwrap_err();
		assert!(matches!(err, PipelineError::Header(_)));
	}

	#[tokio::test]
	async fn lax_mode_passes_anything() {
		let stage = ValidateHeaders::new(ValidationPolicy::default());
		let mut headers = HeaderSet::new();
		headers.set("anything", "goes");
		assert!(stage.run(headers, &ctx("en")).await.is_ok());
	}
}
