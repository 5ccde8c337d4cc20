//! The ordered stage chain.
//!
//! Stage order is load-bearing: interpolation must see already-resolved
//! URLs, validation must see final values, and default-match injection must
//! run after base-URL resolution. The chain is therefore a fixed `Vec` run
//! strictly in registration order, not a pluggable event bus.

use std::sync::Arc;

use async_trait::async_trait;
use grease_headers::HeaderSet;
use tracing::trace;

use crate::context::WaterfallContext;
use crate::error::Result;

/// One transformation of the header set.
///
/// Stages receive the current headers and return the (possibly replaced)
/// next headers; an error aborts the whole run for this artifact and
/// locale, with no partial output.
#[async_trait]
pub trait Stage: Send + Sync {
	fn name(&self) -> &'static str;

	async fn run(&self, headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet>;
}

/// An ordered chain of stages, each feeding the next.
#[derive(Clone, Default)]
pub struct Waterfall {
	stages: Vec<Arc<dyn Stage>>,
}

impl Waterfall {
	pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
		Self { stages }
	}

	/// Runs every stage in order, starting from `headers`.
	pub async fn run(&self, mut headers: HeaderSet, ctx: &WaterfallContext) -> Result<HeaderSet> {
		for stage in &self.stages {
			trace!(stage = stage.name(), locale = %ctx.locale, file = %ctx.file_info.original_file, "stage");
			headers = stage.run(headers, ctx).await?;
		}
		Ok(headers)
	}
}
