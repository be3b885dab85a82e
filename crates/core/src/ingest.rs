use crate::error::IngestError;
use crate::extractor::extract_documents;
use crate::models::{PageDocument, SkippedFile};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf") || ext.eq_ignore_ascii_case("txt"))
}

/// Recursively collect supported documents under a folder, sorted for stable
/// ingest order.
pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct LoadReport {
    pub documents: Vec<PageDocument>,
    pub skipped: Vec<SkippedFile>,
}

/// Load every configured path, best effort. Missing files, unsupported
/// formats, extraction failures, and files yielding zero content are logged
/// and recorded as skips; none of them aborts the batch.
pub fn load_documents(paths: &[PathBuf]) -> LoadReport {
    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "file not found, skipping");
            skipped.push(SkippedFile {
                path: path.clone(),
                reason: "file not found".to_string(),
            });
            continue;
        }

        match extract_documents(path) {
            Ok(extracted) => {
                let total_chars: usize = extracted.iter().map(|doc| doc.text.len()).sum();
                if extracted.is_empty() || total_chars == 0 {
                    warn!(path = %path.display(), "no content extracted, skipping");
                    skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: "no content extracted".to_string(),
                    });
                    continue;
                }

                info!(path = %path.display(), pages = extracted.len(), "loaded document");
                documents.extend(extracted);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping document");
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    LoadReport { documents, skipped }
}

/// Same as [`load_documents`] but fails when nothing was usable.
pub fn load_documents_or_fail(paths: &[PathBuf]) -> Result<LoadReport, IngestError> {
    let report = load_documents(paths);
    if report.documents.is_empty() {
        return Err(IngestError::NoDocumentsFound(format!(
            "{} path(s) configured, none yielded content",
            paths.len()
        )));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{discover_documents, load_documents, load_documents_or_fail};
    use crate::error::IngestError;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("b.txt")).and_then(|mut file| file.write_all(b"beta"))?;
        File::create(nested.join("a.pdf"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("skip.png")).and_then(|mut file| file.write_all(b"img"))?;

        let files = discover_documents(base);
        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|pair| pair[0] <= pair[1]));
        Ok(())
    }

    #[test]
    fn missing_and_unsupported_files_are_skipped_not_fatal(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let good = dir.path().join("notes.txt");
        fs::write(&good, "usable content")?;
        let unsupported = dir.path().join("image.png");
        fs::write(&unsupported, "binary")?;
        let missing = dir.path().join("gone.pdf");

        let report = load_documents(&[good, unsupported, missing]);

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .any(|skip| skip.reason == "file not found"));
        Ok(())
    }

    #[test]
    fn empty_batch_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let blank = dir.path().join("blank.txt");
        fs::write(&blank, "   ")?;

        let result = load_documents_or_fail(&[blank]);
        assert!(matches!(result, Err(IngestError::NoDocumentsFound(_))));
        Ok(())
    }
}
