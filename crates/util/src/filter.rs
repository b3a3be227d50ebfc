use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Matches torrent names against shell-style globs (`*`, `?`, `[...]`).
///
/// An empty filter matches everything.
#[derive(Debug, Clone)]
pub struct NameFilter {
    set: GlobSet,
    empty: bool,
}

impl NameFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid name filter {:?}", pattern))?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build()?,
            empty: patterns.is_empty(),
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.empty || self.set.is_match(name)
    }
}
