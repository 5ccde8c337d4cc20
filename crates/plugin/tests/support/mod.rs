//! In-memory capability implementations for end-to-end plugin tests.

use std::collections::HashMap;
use std::io;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use grease_pipeline::{Fetch, FetchResponse, FileSystem, Result};
use url::Url;

/// [`FileSystem`] backed by a path map with explicit mtimes.
#[derive(Default)]
pub struct MemoryFs {
	files: Mutex<HashMap<PathBuf, (String, u64)>>,
	writes: AtomicUsize,
}

impl MemoryFs {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, path: &str, contents: &str) {
		self.files
			.lock()
			.unwrap()
			.insert(PathBuf::from(path), (contents.to_owned(), 1));
	}

	pub fn contents(&self, path: &str) -> Option<String> {
		self.files
			.lock()
			.unwrap()
			.get(Path::new(path))
			.map(|(contents, _)| contents.clone())
	}

	pub fn write_count(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl FileSystem for MemoryFs {
	async fn read_to_string(&self, path: &Path) -> io::Result<String> {
		self.files
			.lock()
			.unwrap()
			.get(path)
			.map(|(contents, _)| contents.clone())
			.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
	}

	async fn write_string(&self, path: &Path, contents: &str) -> io::Result<()> {
		self.writes.fetch_add(1, Ordering::SeqCst);
		let mut files = self.files.lock().unwrap();
		let mtime = files.get(path).map(|(_, mtime)| mtime + 1).unwrap_or(1);
		files.insert(path.to_owned(), (contents.to_owned(), mtime));
		Ok(())
	}

	async fn mtime_millis(&self, path: &Path) -> io::Result<u64> {
		self.files
			.lock()
			.unwrap()
			.get(path)
			.map(|(_, mtime)| *mtime)
			.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
	}
}

/// [`Fetch`] serving one fixed body to every URL, counting calls.
pub struct StaticFetch {
	status: u16,
	body: String,
	calls: AtomicUsize,
}

impl StaticFetch {
	pub fn ok(body: &str) -> Self {
		Self {
			status: 200,
			body: body.to_owned(),
			calls: AtomicUsize::new(0),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Fetch for StaticFetch {
	async fn fetch(&self, _url: &Url) -> Result<FetchResponse> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(FetchResponse {
			status: self.status,
			body: Box::pin(Cursor::new(self.body.clone().into_bytes())),
		})
	}
}
