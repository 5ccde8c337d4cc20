//! The build-host seam: asset enumeration and emission.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// One chunk's output files as reported by the build host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFiles {
	/// Chunk name, used as the `[chunkName]` interpolation variable.
	pub name: String,
	/// Whether this is an initial (entry) chunk; only those get headers.
	pub initial: bool,
	/// Output asset names belonging to the chunk.
	pub files: Vec<String>,
}

/// Asset sink and dependency registry the plugin drives.
///
/// The bundler adapter implements this over its compilation object; the
/// bundled [`MemoryHost`] serves tests and standalone embedding.
pub trait BuildHost: Send {
	/// All chunks of the current build.
	fn chunks(&self) -> Vec<ChunkFiles>;

	/// Content of an emitted asset, if present.
	fn get_asset(&self, name: &str) -> Option<String>;

	/// Adds or replaces an asset.
	fn emit_asset(&mut self, name: &str, content: String);

	/// Removes an asset.
	fn delete_asset(&mut self, name: &str);

	/// Registers a file whose change should trigger a rebuild.
	fn add_file_dependency(&mut self, path: &Path);
}

/// In-memory [`BuildHost`].
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
	assets: IndexMap<String, String>,
	chunks: Vec<ChunkFiles>,
	file_dependencies: BTreeSet<PathBuf>,
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an entry chunk with a single output file.
	pub fn add_entry(&mut self, chunk_name: &str, file: &str, content: &str) {
		self.assets.insert(file.to_owned(), content.to_owned());
		self.chunks.push(ChunkFiles {
			name: chunk_name.to_owned(),
			initial: true,
			files: vec![file.to_owned()],
		});
	}

	/// Registers a non-entry chunk with a single output file.
	pub fn add_async_chunk(&mut self, chunk_name: &str, file: &str, content: &str) {
		self.assets.insert(file.to_owned(), content.to_owned());
		self.chunks.push(ChunkFiles {
			name: chunk_name.to_owned(),
			initial: false,
			files: vec![file.to_owned()],
		});
	}

	pub fn asset(&self, name: &str) -> Option<&str> {
		self.assets.get(name).map(String::as_str)
	}

	pub fn asset_names(&self) -> Vec<&str> {
		self.assets.keys().map(String::as_str).collect()
	}

	pub fn file_dependencies(&self) -> impl Iterator<Item = &Path> {
		self.file_dependencies.iter().map(PathBuf::as_path)
	}
}

impl BuildHost for MemoryHost {
	fn chunks(&self) -> Vec<ChunkFiles> {
		self.chunks.clone()
	}

	fn get_asset(&self, name: &str) -> Option<String> {
		self.assets.get(name).cloned()
	}

	fn emit_asset(&mut self, name: &str, content: String) {
		self.assets.insert(name.to_owned(), content);
	}

	fn delete_asset(&mut self, name: &str) {
		self.assets.shift_remove(name);
	}

	fn add_file_dependency(&mut self, path: &Path) {
		self.file_dependencies.insert(path.to_owned());
	}
}
