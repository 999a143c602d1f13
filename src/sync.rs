use crate::{
    errors::{FileOperation, IoError},
    interpolate::Interpolator,
    matcher::PathMatcher,
    vars::VariableSource,
};
use filetime::FileTime;
use miette::Diagnostic;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("I/O error within sync domain")]
    #[diagnostic(code(synterp::sync::io))]
    Io(#[from] IoError),

    #[error("unable to strip prefix from directory")]
    #[diagnostic(code(synterp::sync::strip_prefix))]
    StripPrefix {
        path: PathBuf,
        dir: PathBuf,
        source: std::path::StripPrefixError,
    },
}

/// How a single file entry was handled.
#[derive(Debug, PartialEq, Eq)]
enum FileOutcome {
    Skipped,
    Copied,
    Interpolated(usize),
    CopiedAfterError,
}

/// Counters accumulated over one synchronization run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub files_copied: u64,
    pub files_interpolated: u64,
    pub files_skipped: u64,
    pub interpolation_fallbacks: u64,
}

/// Walks `src` depth-first and mirrors it into `dest`.
///
/// Directories are materialized before any of their files; sibling order is
/// sorted by file name so a run is reproducible. A file whose
/// destination-relative path matches `matcher` is routed through
/// `interpolator`; interpolation failure demotes that file to a verbatim
/// copy with a warning. Structural I/O failures (directory creation, source
/// reads, destination writes) abort the walk. Every written file ends up
/// with its source's modification time.
pub fn synchronize<V: VariableSource>(
    src: &Path,
    dest: &Path,
    skip_newer_in_destination: bool,
    matcher: &PathMatcher,
    interpolator: &Interpolator<V>,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(error) => {
                let path = error.path().unwrap_or_else(|| Path::new("")).to_path_buf();

                Err(IoError::new(FileOperation::Read, path, error.into()))?
            }
        };

        let full_path = entry.path();
        let relative = match full_path.strip_prefix(src) {
            Ok(r) => r,
            Err(error) => Err(SyncError::StripPrefix {
                path: full_path.to_path_buf(),
                dir: src.to_path_buf(),
                source: error,
            })?,
        };

        let dest_path = dest.join(relative);

        if entry.file_type().is_dir() {
            create_directory(&dest_path)?;
            continue;
        }

        let outcome = process_file(
            full_path,
            &dest_path,
            relative,
            skip_newer_in_destination,
            matcher,
            interpolator,
        )?;

        match outcome {
            FileOutcome::Skipped => report.files_skipped += 1,
            FileOutcome::Copied => report.files_copied += 1,
            FileOutcome::Interpolated(count) => {
                if count > 0 {
                    log::debug!("replaced {} variable(s) in {}", count, dest_path.display());
                }
                report.files_interpolated += 1;
            }
            FileOutcome::CopiedAfterError => {
                report.files_copied += 1;
                report.interpolation_fallbacks += 1;
            }
        }
    }

    log::debug!(
        "synchronized {} -> {}: {} copied, {} interpolated, {} skipped",
        src.display(),
        dest.display(),
        report.files_copied,
        report.files_interpolated,
        report.files_skipped
    );

    Ok(report)
}

/// Routing step for one file: skip-newer check first, then the matcher
/// decides between interpolation and a verbatim copy.
fn process_file<V: VariableSource>(
    src_file: &Path,
    dest_file: &Path,
    relative: &Path,
    skip_newer_in_destination: bool,
    matcher: &PathMatcher,
    interpolator: &Interpolator<V>,
) -> Result<FileOutcome, SyncError> {
    if skip_newer_in_destination && destination_is_newer(src_file, dest_file)? {
        log::debug!("skipping {}: destination is newer", dest_file.display());

        return Ok(FileOutcome::Skipped);
    }

    if !matcher.matches(relative) {
        copy_file(src_file, dest_file)?;

        return Ok(FileOutcome::Copied);
    }

    log::info!(
        "interpolating {} -> {}",
        src_file.display(),
        dest_file.display()
    );

    let content = fs::read(src_file)
        .map_err(|error| IoError::new(FileOperation::Read, src_file.to_path_buf(), error))?;

    match interpolator.interpolate(&content) {
        Ok(result) => {
            write_file(dest_file, &result.content)?;
            propagate_mtime(src_file, dest_file)?;

            Ok(FileOutcome::Interpolated(result.replacement_count))
        }
        Err(error) => {
            log::warn!(
                "failed to interpolate {}, copying instead: {}",
                src_file.display(),
                error
            );

            write_file(dest_file, &content)?;
            propagate_mtime(src_file, dest_file)?;

            Ok(FileOutcome::CopiedAfterError)
        }
    }
}

fn destination_is_newer(src_file: &Path, dest_file: &Path) -> Result<bool, SyncError> {
    let dest_meta = match fs::metadata(dest_file) {
        Ok(meta) => meta,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(error) => Err(IoError::new(
            FileOperation::Read,
            dest_file.to_path_buf(),
            error,
        ))?,
    };

    let src_meta = fs::metadata(src_file)
        .map_err(|error| IoError::new(FileOperation::Read, src_file.to_path_buf(), error))?;

    let src_mtime = FileTime::from_last_modification_time(&src_meta);
    let dest_mtime = FileTime::from_last_modification_time(&dest_meta);

    Ok(dest_mtime > src_mtime)
}

fn create_directory(path: &Path) -> Result<(), SyncError> {
    fs::create_dir_all(path)
        .map_err(|error| IoError::new(FileOperation::Mkdir, path.to_path_buf(), error))?;

    Ok(())
}

fn copy_file(src_file: &Path, dest_file: &Path) -> Result<(), SyncError> {
    fs::copy(src_file, dest_file)
        .map_err(|error| IoError::new(FileOperation::Write, dest_file.to_path_buf(), error))?;

    propagate_mtime(src_file, dest_file)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), SyncError> {
    fs::write(path, contents)
        .map_err(|error| IoError::new(FileOperation::Write, path.to_path_buf(), error))?;

    Ok(())
}

fn propagate_mtime(src_file: &Path, dest_file: &Path) -> Result<(), SyncError> {
    let src_meta = fs::metadata(src_file)
        .map_err(|error| IoError::new(FileOperation::Read, src_file.to_path_buf(), error))?;

    let mtime = FileTime::from_last_modification_time(&src_meta);

    filetime::set_file_mtime(dest_file, mtime)
        .map_err(|error| IoError::new(FileOperation::SetTimes, dest_file.to_path_buf(), error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn run(
        src: &Path,
        dest: &Path,
        skip_newer: bool,
        patterns: &[&str],
        pairs: &[(&str, &str)],
    ) -> SyncReport {
        let matcher = PathMatcher::new(patterns).unwrap();
        let interpolator = Interpolator::new(vars(pairs), "${");

        synchronize(src, dest, skip_newer, &matcher, &interpolator).unwrap()
    }

    #[test]
    fn mirrors_the_source_tree() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "plain");
        write(src.path(), "conf/app.conf", "host=${HOST}");

        let report = run(
            src.path(),
            dest.path(),
            false,
            &["conf/*"],
            &[("HOST", "localhost")],
        );

        assert_eq!(
            fs::read_to_string(dest.path().join("a.txt")).unwrap(),
            "plain"
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("conf/app.conf")).unwrap(),
            "host=localhost"
        );
        assert_eq!(report.files_copied, 1);
        assert_eq!(report.files_interpolated, 1);
        assert_eq!(report.files_skipped, 0);
    }

    #[test]
    fn propagates_the_source_modification_time() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "plain");
        let mtime = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(src.path().join("a.txt"), mtime).unwrap();

        run(src.path(), dest.path(), false, &["conf/*"], &[]);

        let dest_meta = fs::metadata(dest.path().join("a.txt")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&dest_meta), mtime);
    }

    #[test]
    fn skip_newer_preserves_a_newer_destination() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "from source");
        write(dest.path(), "a.txt", "already here");
        let older = FileTime::from_unix_time(1_000_000_000, 0);
        let newer = FileTime::from_unix_time(1_000_000_100, 0);
        filetime::set_file_mtime(src.path().join("a.txt"), older).unwrap();
        filetime::set_file_mtime(dest.path().join("a.txt"), newer).unwrap();

        let report = run(src.path(), dest.path(), true, &["conf/*"], &[]);

        assert_eq!(
            fs::read_to_string(dest.path().join("a.txt")).unwrap(),
            "already here"
        );
        let dest_meta = fs::metadata(dest.path().join("a.txt")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&dest_meta), newer);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_copied, 0);
    }

    #[test]
    fn equal_modification_times_are_not_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "from source");
        write(dest.path(), "a.txt", "already here");
        let mtime = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(src.path().join("a.txt"), mtime).unwrap();
        filetime::set_file_mtime(dest.path().join("a.txt"), mtime).unwrap();

        let report = run(src.path(), dest.path(), true, &["conf/*"], &[]);

        assert_eq!(
            fs::read_to_string(dest.path().join("a.txt")).unwrap(),
            "from source"
        );
        assert_eq!(report.files_copied, 1);
    }

    #[test]
    fn disabled_skip_rewrites_a_newer_destination() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "from source");
        write(dest.path(), "a.txt", "already here");
        let newer = FileTime::from_unix_time(2_000_000_000, 0);
        filetime::set_file_mtime(dest.path().join("a.txt"), newer).unwrap();

        run(src.path(), dest.path(), false, &["conf/*"], &[]);

        assert_eq!(
            fs::read_to_string(dest.path().join("a.txt")).unwrap(),
            "from source"
        );
    }

    #[test]
    fn malformed_reference_falls_back_to_a_verbatim_copy() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "conf/app.conf", "host=${HOST");

        let report = run(
            src.path(),
            dest.path(),
            false,
            &["conf/*"],
            &[("HOST", "localhost")],
        );

        assert_eq!(
            fs::read_to_string(dest.path().join("conf/app.conf")).unwrap(),
            "host=${HOST"
        );
        assert_eq!(report.interpolation_fallbacks, 1);
        assert_eq!(report.files_interpolated, 0);
    }

    #[test]
    fn unknown_variable_falls_back_to_a_verbatim_copy() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "conf/app.conf", "host=${MISSING}");

        let report = run(src.path(), dest.path(), false, &["conf/*"], &[]);

        assert_eq!(
            fs::read_to_string(dest.path().join("conf/app.conf")).unwrap(),
            "host=${MISSING}"
        );
        assert_eq!(report.interpolation_fallbacks, 1);
    }

    #[test]
    fn unmatched_paths_are_never_interpolated() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "notes.txt", "host=${HOST}");

        let report = run(
            src.path(),
            dest.path(),
            false,
            &["conf/*"],
            &[("HOST", "localhost")],
        );

        assert_eq!(
            fs::read_to_string(dest.path().join("notes.txt")).unwrap(),
            "host=${HOST}"
        );
        assert_eq!(report.files_interpolated, 0);
        assert_eq!(report.files_copied, 1);
    }

    #[test]
    fn materializes_empty_directories() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("logs/archive")).unwrap();

        run(src.path(), dest.path(), false, &["conf/*"], &[]);

        assert!(dest.path().join("logs/archive").is_dir());
    }
}
