//! Input discovery.
//!
//! Expands the paths given on the command line into the ordered entry list a
//! run consumes. Files are taken as-is when their extension has a decoder;
//! directories are walked recursively.
//!
//! ## Rules
//!
//! - Extensions are matched case-insensitively against
//!   [`supported_input_extensions`].
//! - Hidden files and directories (leading `.`) are skipped while walking.
//! - Outputs of earlier runs (`*_compressed.*`) are skipped so a directory can
//!   be recompressed in place repeatedly.
//! - The result is sorted by path and free of duplicates, so entry indices
//!   are stable for a given input set.

use crate::imaging::supported_input_extensions;
use crate::pipeline::{ErrorKind, ItemError, OUTPUT_SUFFIX};
use crate::types::SourceEntry;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a supported image: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("could not walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Whether `path` has an extension we can decode.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            supported_input_extensions().contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Whether `path` looks like the output of an earlier run.
pub fn is_previous_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with(OUTPUT_SUFFIX))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Expand `inputs` into source entries.
///
/// An explicitly named file must exist and be a supported image. Directories
/// only contribute the files that pass the rules above.
pub fn scan_inputs(inputs: &[PathBuf]) -> Result<Vec<SourceEntry>, ScanError> {
    let mut found = BTreeSet::new();

    for input in inputs {
        if input.is_file() {
            if !is_supported_image(input) {
                return Err(ScanError::Unsupported(input.clone()));
            }
            found.insert(input.clone());
        } else if input.is_dir() {
            let walker = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| !is_hidden(e));
            for entry in walker {
                let entry = entry.map_err(|source| ScanError::Walk {
                    path: input.clone(),
                    source,
                })?;
                let path = entry.path();
                if entry.file_type().is_file()
                    && is_supported_image(path)
                    && !is_previous_output(path)
                {
                    found.insert(path.to_path_buf());
                }
            }
        } else {
            return Err(ScanError::NotFound(input.clone()));
        }
    }

    debug!(count = found.len(), "scan finished");
    Ok(found.into_iter().map(SourceEntry::from_disk).collect())
}

/// Long edge of the previews attached by [`verify_entries`].
pub const PREVIEW_EDGE: u32 = 256;

/// Decode every entry, attaching a preview to those that load.
///
/// Returns a `LoadFailed` error for each entry that would fail in a run,
/// in entry order.
pub fn verify_entries(entries: &mut [SourceEntry]) -> Vec<ItemError> {
    entries
        .par_iter_mut()
        .enumerate()
        .filter_map(|(index, entry)| {
            entry
                .load_preview(PREVIEW_EDGE)
                .err()
                .map(|err| ItemError::new(index, entry.path(), ErrorKind::LoadFailed, err))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn names(entries: &[SourceEntry], root: &Path) -> Vec<String> {
        entries
            .iter()
            .map(|e| {
                e.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    // =========================================================================
    // Extension rules
    // =========================================================================

    #[test]
    fn supported_extensions_match_case_insensitively() {
        assert!(is_supported_image(Path::new("a.jpg")));
        assert!(is_supported_image(Path::new("a.JPEG")));
        assert!(is_supported_image(Path::new("dir/a.Png")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }

    #[test]
    fn previous_outputs_are_recognized() {
        assert!(is_previous_output(Path::new("beach_compressed.webp")));
        assert!(is_previous_output(Path::new("/a/b/beach_compressed.jpeg")));
        assert!(!is_previous_output(Path::new("beach.jpg")));
        assert!(!is_previous_output(Path::new("compressed.jpg")));
    }

    // =========================================================================
    // scan_inputs
    // =========================================================================

    #[test]
    fn walks_directories_recursively_and_sorts() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("b.png"));
        touch(&tmp.path().join("a.jpg"));
        touch(&tmp.path().join("nested/c.JPG"));
        touch(&tmp.path().join("nested/readme.txt"));

        let entries = scan_inputs(&[tmp.path().to_path_buf()]).unwrap();
        assert_eq!(names(&entries, tmp.path()), vec!["a.jpg", "b.png", "nested/c.JPG"]);
        assert_eq!(entries[0].original_size, Some(1));
    }

    #[test]
    fn skips_hidden_and_previous_outputs() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("keep.png"));
        touch(&tmp.path().join("keep_compressed.jpeg"));
        touch(&tmp.path().join(".thumbs/hidden.png"));
        touch(&tmp.path().join(".dotfile.png"));

        let entries = scan_inputs(&[tmp.path().to_path_buf()]).unwrap();
        assert_eq!(names(&entries, tmp.path()), vec!["keep.png"]);
    }

    #[test]
    fn overlapping_inputs_are_deduplicated() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.png");
        touch(&file);
        touch(&tmp.path().join("b.png"));

        let entries = scan_inputs(&[file.clone(), tmp.path().to_path_buf(), file]).unwrap();
        assert_eq!(names(&entries, tmp.path()), vec!["a.png", "b.png"]);
    }

    #[test]
    fn explicit_unsupported_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("notes.txt");
        touch(&file);

        let err = scan_inputs(&[file.clone()]).unwrap_err();
        assert!(matches!(err, ScanError::Unsupported(p) if p == file));
    }

    #[test]
    fn missing_input_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let err = scan_inputs(&[missing]).unwrap_err();
        assert!(err.to_string().starts_with("input not found"));
    }

    #[test]
    fn verify_attaches_previews_and_reports_unreadable() {
        let tmp = TempDir::new().unwrap();
        crate::test_helpers::write_test_png(&tmp.path().join("a.png"), 600, 300);
        fs::write(tmp.path().join("b.jpg"), b"not an image").unwrap();
        crate::test_helpers::write_test_jpeg(&tmp.path().join("c.jpg"), 40, 20);

        let mut entries = scan_inputs(&[tmp.path().to_path_buf()]).unwrap();
        let errors = verify_entries(&mut entries);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[0].kind, ErrorKind::LoadFailed);
        assert!(entries[1].preview.is_none());

        let big = entries[0].preview.as_ref().unwrap();
        assert_eq!((big.width(), big.height()), (PREVIEW_EDGE, PREVIEW_EDGE / 2));
        // Small sources are never enlarged
        let small = entries[2].preview.as_ref().unwrap();
        assert_eq!((small.width(), small.height()), (40, 20));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_inputs(&[tmp.path().to_path_buf()]).unwrap().is_empty());
    }
}
