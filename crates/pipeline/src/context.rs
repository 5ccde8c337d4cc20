//! Per-artifact context threaded through every waterfall stage.

use grease_headers::DEFAULT_LOCALE;

/// Path decomposition of one eligible build artifact, plus the companion
/// file names derived from it.
///
/// Created once per artifact per build; immutable afterwards. Asset names
/// use `/` separators regardless of platform, matching bundler output
/// naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
	/// Name of the chunk the artifact belongs to.
	pub chunk_name: String,
	/// Asset name as produced by the build, query string included.
	pub original_file: String,
	/// Target name of the headered userscript (`<basename>.user.js` plus
	/// any query string).
	pub userjs_file: String,
	/// Target name of the header-only companion (`<basename>.meta.js`).
	pub metajs_file: String,
	/// Asset name with the query string stripped.
	pub filename: String,
	/// `filename` without its directory and without a `.user.js` or `.js`
	/// suffix.
	pub basename: String,
	/// Query string including the leading `?`, or empty.
	pub query: String,
	/// Directory part of `filename`, `.` when there is none.
	pub dirname: String,
	/// Extension of `filename` including the dot.
	pub extname: String,
}

impl FileInfo {
	/// Decomposes an output asset name, returning `None` for files that are
	/// not `.js` (those are not userscript candidates).
	pub fn from_output(chunk_name: &str, original_file: &str) -> Option<Self> {
		let (filename, query) = match original_file.find('?') {
			Some(at) => original_file.split_at(at),
			None => (original_file, ""),
		};

		let extname = match filename.rfind('.') {
			Some(at) if !filename[at..].contains('/') => &filename[at..],
			_ => "",
		};
		if extname != ".js" {
			return None;
		}

		let (dirname, file_part) = match filename.rfind('/') {
			Some(at) => (&filename[..at], &filename[at + 1..]),
			None => (".", filename),
		};

		let basename = file_part
			.strip_suffix(".user.js")
			.or_else(|| file_part.strip_suffix(".js"))
			.unwrap_or(file_part);

		let userjs_file = format!("{}{basename}.user.js{query}", dir_prefix(dirname));
		let metajs_file = format!("{}{basename}.meta.js", dir_prefix(dirname));

		Some(Self {
			chunk_name: chunk_name.to_owned(),
			original_file: original_file.to_owned(),
			userjs_file,
			metajs_file,
			filename: filename.to_owned(),
			basename: basename.to_owned(),
			query: query.to_owned(),
			dirname: dirname.to_owned(),
			extname: extname.to_owned(),
		})
	}
}

fn dir_prefix(dirname: &str) -> String {
	if dirname == "." {
		String::new()
	} else {
		format!("{dirname}/")
	}
}

/// Context handed to every stage of one waterfall run.
#[derive(Debug, Clone)]
pub struct WaterfallContext {
	/// Monotonic build counter for one plugin instance, starting at 1.
	pub build_no: u32,
	/// Build start time, milliseconds since the Unix epoch.
	pub build_time: u64,
	/// The artifact being resolved.
	pub file_info: FileInfo,
	/// Active locale key; [`DEFAULT_LOCALE`] for the unlocalized run.
	pub locale: String,
}

impl WaterfallContext {
	/// Whether this run resolves the default (unlocalized) locale.
	pub fn default_locale(&self) -> bool {
		self.locale == DEFAULT_LOCALE
	}
}
