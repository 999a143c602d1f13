use crate::{
    interpolate::Interpolator,
    matcher::{self, PathMatcher},
    sync::{self, SyncReport},
    vars::ProcessEnv,
};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SynterpError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pattern(#[from] matcher::PatternError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sync(#[from] sync::SyncError),
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum OptionsError {
    #[error("source '{path}' does not exist or is not a directory")]
    #[diagnostic(
        code(synterp::options::source),
        help("Pass an existing directory as the source")
    )]
    SourceNotADirectory { path: PathBuf },

    #[error("the variable prefix must not be empty")]
    #[diagnostic(code(synterp::options::prefix))]
    EmptyPrefix,

    #[error("at least one file pattern is required")]
    #[diagnostic(
        code(synterp::options::patterns),
        help("Pass one or more --replace-env-file globs")
    )]
    NoPatterns,
}

/// Validated inputs of one synchronization run.
#[derive(Debug)]
pub struct Options {
    pub src: PathBuf,
    pub dest: PathBuf,
    pub skip_newer_in_destination: bool,
    pub prefix: String,
    pub patterns: Vec<String>,
}

/// Synchronizes `src` into `dest`, interpolating every file whose
/// destination-relative path matches one of the configured globs. Variables
/// resolve from the process environment.
///
/// # Errors
///
/// Returns a [`SynterpError`] if:
///
/// - The source is missing or not a directory, the prefix is empty, or no
///   pattern was configured.
/// - A glob pattern does not compile.
/// - A directory cannot be created, a source file cannot be read, or a
///   destination file cannot be written.
pub fn run(options: &Options) -> Result<SyncReport, SynterpError> {
    validate(options)?;

    log::debug!("configured with {:?}", options);

    let matcher = PathMatcher::new(&options.patterns)?;
    let interpolator = Interpolator::new(ProcessEnv, &options.prefix);

    let report = sync::synchronize(
        &options.src,
        &options.dest,
        options.skip_newer_in_destination,
        &matcher,
        &interpolator,
    )?;

    Ok(report)
}

fn validate(options: &Options) -> Result<(), OptionsError> {
    if !options.src.is_dir() {
        return Err(OptionsError::SourceNotADirectory {
            path: options.src.clone(),
        });
    }

    if options.prefix.is_empty() {
        return Err(OptionsError::EmptyPrefix);
    }

    if options.patterns.is_empty() {
        return Err(OptionsError::NoPatterns);
    }

    Ok(())
}
