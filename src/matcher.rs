use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("invalid glob pattern '{pattern}'")]
#[diagnostic(
    code(synterp::matcher::pattern),
    help("'*' matches within one path segment, '**' spans segments")
)]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

/// Decides which destination-relative paths are eligible for interpolation.
///
/// Patterns use glob semantics with literal path separators: `*` stays
/// within one segment and `**` spans segments. Matching is case-sensitive on
/// every platform.
#[derive(Debug)]
pub struct PathMatcher {
    set: GlobSet,
}

impl PathMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();

            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|error| PatternError {
                    pattern: pattern.to_string(),
                    source: error,
                })?;

            builder.add(glob);
        }

        let set = builder.build().map_err(|error| PatternError {
            pattern: error.glob().unwrap_or_default().to_string(),
            source: error,
        })?;

        Ok(Self { set })
    }

    pub fn matches(&self, relative_path: &Path) -> bool {
        self.set.is_match(relative_path)
    }
}
