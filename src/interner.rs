use std::collections::HashSet;
use std::sync::Arc;

/// Deduplicates file paths while reports are parsed.
///
/// One interner lives for one parse unless the caller passes the same
/// instance to several sequential parses.
#[derive(Debug, Default)]
pub struct PathInterner {
    paths: HashSet<Arc<str>>,
}

impl PathInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared copy of `path`, storing it on first sight.
    pub fn intern(&mut self, path: &str) -> Arc<str> {
        if let Some(existing) = self.paths.get(path) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(path);
        self.paths.insert(Arc::clone(&shared));
        shared
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Forward slashes, no `./` prefix, no duplicate separators and no leading
/// root: `/src/Foo.java` becomes `src/Foo.java`.
pub fn normalize_path(path: &str) -> String {
    components(path).join("/")
}

/// Like [`normalize_path`], but an absolute root keeps its leading `/`.
/// Source roots locate the sources on disk.
pub fn normalize_source_root(path: &str) -> String {
    let relative = normalize_path(path);
    if path.trim().starts_with(['/', '\\']) {
        format!("/{relative}")
    } else {
        relative
    }
}

fn components(path: &str) -> Vec<&str> {
    path.trim()
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}
