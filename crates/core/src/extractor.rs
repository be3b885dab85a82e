use crate::error::IngestError;
use crate::models::{ChunkMetadata, EntryKind, PageDocument};
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Pages whose directly extracted text trims below this length are treated as
/// scanned images and routed through recognition.
pub const OCR_MIN_CHARS: usize = 100;

/// Rasterization upscale requested from the recognition service.
pub const OCR_SCALE: f32 = 2.0;

/// Recognition language model.
pub const OCR_LANGUAGE: &str = "eng";

#[derive(Debug, Clone, Serialize)]
struct OcrRequest {
    pdf_base64: String,
    source_path: String,
    page: u32,
    scale: f32,
    language: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrEndpointConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl OcrEndpointConfig {
    /// Recognition is an optional external collaborator: absent configuration
    /// disables the fallback instead of failing extraction.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("DOCRAG_OCR_ENDPOINT").ok()?;
        let endpoint = endpoint.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }

        let api_key = std::env::var("DOCRAG_OCR_API_KEY").ok().and_then(|value| {
            let key = value.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });

        Some(OcrEndpointConfig { endpoint, api_key })
    }
}

/// Whether a page's directly extracted text is thin enough to treat the page
/// as a scanned image.
fn needs_recognition(direct: &str) -> bool {
    direct.trim().chars().count() < OCR_MIN_CHARS
}

/// Extract page-level documents from a supported file. PDF pages go through
/// the recognition fallback when direct extraction comes up short; plain text
/// becomes a single document. Anything else is `UnsupportedFormat`, which
/// batch callers treat as skippable.
pub fn extract_documents(path: &Path) -> Result<Vec<PageDocument>, IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => extract_pdf_pages(path),
        "txt" => extract_plain_text(path),
        _ => Err(IngestError::UnsupportedFormat(
            path.to_string_lossy().to_string(),
        )),
    }
}

fn base_metadata(path: &Path) -> ChunkMetadata {
    ChunkMetadata {
        source: path.to_string_lossy().to_string(),
        file_name: path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.to_string()),
        entry: Some(EntryKind::Extracted),
        ..Default::default()
    }
}

fn extract_pdf_pages(path: &Path) -> Result<Vec<PageDocument>, IngestError> {
    // Handle lifetime is this function body; drop releases it on every path.
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;
    let ocr = OcrEndpointConfig::from_env();

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let direct = document.extract_text(&[page_no]).unwrap_or_default();

        let text = if needs_recognition(&direct) {
            match recognize_page(ocr.as_ref(), path, page_no) {
                Ok(Some(recognized)) => recognized,
                // No endpoint configured: keep whatever direct extraction gave.
                Ok(None) => direct,
                Err(error) => {
                    warn!(page = page_no, %error, "page recognition failed, dropping text");
                    String::new()
                }
            }
        } else {
            direct
        };

        if text.trim().is_empty() {
            continue;
        }

        let mut metadata = base_metadata(path);
        metadata.page = Some(page_no);
        metadata.text_length = Some(text.chars().count());

        pages.push(PageDocument { text, metadata });
    }

    Ok(pages)
}

fn extract_plain_text(path: &Path) -> Result<Vec<PageDocument>, IngestError> {
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut metadata = base_metadata(path);
    metadata.page = Some(0);
    Ok(vec![PageDocument { text, metadata }])
}

fn recognize_page(
    config: Option<&OcrEndpointConfig>,
    path: &Path,
    page: u32,
) -> Result<Option<String>, IngestError> {
    let Some(config) = config else {
        return Ok(None);
    };

    tokio::task::block_in_place(|| recognize_page_blocking(config, path, page))
}

/// One recognition round trip: the service rasterizes the requested page at
/// the given scale and runs character recognition against it.
fn recognize_page_blocking(
    config: &OcrEndpointConfig,
    path: &Path,
    page: u32,
) -> Result<Option<String>, IngestError> {
    let pdf = std::fs::read(path)?;
    let payload = OcrRequest {
        pdf_base64: STANDARD.encode(pdf),
        source_path: path.to_string_lossy().to_string(),
        page,
        scale: OCR_SCALE,
        language: OCR_LANGUAGE.to_string(),
    };

    let mut request = Client::new()
        .post(&config.endpoint)
        .header("content-type", "application/json")
        .json(&payload);

    if let Some(api_key) = &config.api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send().map_err(|error| {
        IngestError::PdfParse(format!("recognition request failed: {error}"))
    })?;

    if !response.status().is_success() {
        return Err(IngestError::PdfParse(format!(
            "recognition endpoint {} returned {}",
            config.endpoint,
            response.status()
        )));
    }

    let payload: OcrResponse = response
        .json()
        .map_err(|error| IngestError::PdfParse(format!("bad recognition response: {error}")))?;

    Ok(payload
        .text
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn plain_text_file_becomes_one_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path).and_then(|mut file| file.write_all(b"some plain notes"))?;

        let documents = extract_documents(&path)?;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].text, "some plain notes");
        assert_eq!(documents[0].metadata.page, Some(0));
        assert_eq!(
            documents[0].metadata.file_name.as_deref(),
            Some("notes.txt")
        );
        Ok(())
    }

    #[test]
    fn blank_text_file_yields_no_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("blank.txt");
        std::fs::write(&path, "   \n\t  ")?;

        assert!(extract_documents(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("image.png");
        std::fs::write(&path, b"not a document")?;

        let result = extract_documents(&path);
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
        Ok(())
    }

    #[test]
    fn unreadable_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken")?;

        let result = extract_documents(&path);
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn recognition_triggers_below_the_content_threshold() {
        assert!(needs_recognition("only a few words here"));
        assert!(needs_recognition(&format!("  {}  ", "x".repeat(OCR_MIN_CHARS - 1))));
        assert!(!needs_recognition(&"x".repeat(OCR_MIN_CHARS)));
    }

    #[test]
    fn recognition_is_skipped_when_unconfigured() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%fake")?;

        assert!(recognize_page(None, &path, 1)?.is_none());
        Ok(())
    }
}
