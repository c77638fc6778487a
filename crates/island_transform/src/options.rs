//! Options for the island transform.
//!
//! These options are supplied by the host build system once per build and
//! shared by every file transform.

/// The bundler producing the final output.
///
/// Client boundaries need runtime-addressable chunks, which only some
/// bundlers provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bundler {
    #[default]
    Vite,
    Webpack,
    Rspack,
}

impl Bundler {
    /// Whether the output format can address client boundaries at runtime.
    pub fn supports_client_boundaries(self) -> bool {
        matches!(self, Self::Vite)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vite => "vite",
            Self::Webpack => "webpack",
            Self::Rspack => "rspack",
        }
    }
}

/// Controls whether and how source maps are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourcemapOption {
    /// No source map.
    None,
    /// Populate the `map` field of the result with a JSON source map.
    #[default]
    External,
    /// Append an inline `//# sourceMappingURL=data:...` comment to the code.
    Inline,
    /// Both: append the inline comment **and** populate `map`.
    Both,
}

/// Options for the island transform.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Rewrite elements carrying the client-only marker into client boundaries.
    pub allow_client_boundaries: bool,

    /// Whether the build runs in development mode.
    ///
    /// Together with `root_directory`, this adds a `root-dir` attribute to
    /// every client boundary wrapper.
    pub development_mode: bool,

    /// Project root emitted as `root-dir` in development mode.
    pub root_directory: Option<String>,

    /// The bundler producing the output.
    pub bundler: Bundler,

    /// Source map generation mode.
    pub sourcemap: SourcemapOption,

    /// The import prefix for the island runtime components.
    /// Defaults to `"#islands"`.
    pub runtime_url: Option<String>,
}

impl TransformOptions {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable client boundary rewriting.
    #[must_use]
    pub fn with_client_boundaries(mut self, enabled: bool) -> Self {
        self.allow_client_boundaries = enabled;
        self
    }

    /// Enable or disable development mode.
    #[must_use]
    pub fn with_development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    /// Set the project root directory.
    #[must_use]
    pub fn with_root_directory(mut self, dir: impl Into<String>) -> Self {
        self.root_directory = Some(dir.into());
        self
    }

    /// Set the bundler.
    #[must_use]
    pub fn with_bundler(mut self, bundler: Bundler) -> Self {
        self.bundler = bundler;
        self
    }

    /// Set the source map mode.
    #[must_use]
    pub fn with_sourcemap(mut self, sourcemap: SourcemapOption) -> Self {
        self.sourcemap = sourcemap;
        self
    }

    /// Set the import prefix for the island runtime.
    #[must_use]
    pub fn with_runtime_url(mut self, url: impl Into<String>) -> Self {
        self.runtime_url = Some(url.into());
        self
    }

    /// Get the runtime import prefix, with default fallback.
    pub fn get_runtime_url(&self) -> &str {
        self.runtime_url.as_deref().unwrap_or("#islands")
    }

    /// The `root-dir` value for boundary wrappers, if one should be emitted.
    pub fn boundary_root_dir(&self) -> Option<&str> {
        if self.development_mode {
            self.root_directory.as_deref()
        } else {
            None
        }
    }
}

/// Normalize a path by resolving `.` and `..` segments (without touching the filesystem).
///
/// Separators are normalized to `/` so that ids coming from the bundler and
/// paths coming from the registry compare equal.
pub(crate) fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let is_absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Pop the last segment if possible (don't go above root)
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !is_absolute {
                    segments.push(segment);
                }
            }
            _ => segments.push(segment),
        }
    }
    let joined = segments.join("/");
    if is_absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
