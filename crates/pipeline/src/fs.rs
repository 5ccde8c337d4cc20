//! Injected file-system capability.

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;

/// File access used by the loaders and the SSRI lock.
///
/// The build host owns file I/O; the pipeline only ever goes through this
/// trait so embedders can virtualize it (in-memory volumes in tests, the
/// bundler's input file system in production).
#[async_trait]
pub trait FileSystem: Send + Sync {
	async fn read_to_string(&self, path: &Path) -> io::Result<String>;

	async fn write_string(&self, path: &Path, contents: &str) -> io::Result<()>;

	/// Change-detection timestamp in milliseconds since the Unix epoch.
	///
	/// Only ordering matters; the file loader re-reads when this advances.
	async fn mtime_millis(&self, path: &Path) -> io::Result<u64>;
}

/// [`FileSystem`] over the real file system via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

#[async_trait]
impl FileSystem for NativeFs {
	async fn read_to_string(&self, path: &Path) -> io::Result<String> {
		tokio::fs::read_to_string(path).await
	}

	async fn write_string(&self, path: &Path, contents: &str) -> io::Result<()> {
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(path, contents).await
	}

	async fn mtime_millis(&self, path: &Path) -> io::Result<u64> {
		let modified = tokio::fs::metadata(path).await?.modified()?;
		let since_epoch = modified
			.duration_since(UNIX_EPOCH)
			.map_err(|err| io::Error::other(err.to_string()))?;
		Ok(since_epoch.as_millis() as u64)
	}
}
