//! PDF document loading.
//!
//! Turns report PDFs into per-page text so every chunk can carry the page
//! label it came from.

use crate::error::{Result, SitewiseError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    /// File name of the source PDF (e.g. "wind_farm_ea.pdf").
    pub file_name: String,
    /// One-based page number as printed in citations.
    pub page_label: String,
    /// Extracted page text.
    pub text: String,
}

impl DocumentPage {
    pub fn new(file_name: &str, page_label: &str, text: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            page_label: page_label.to_string(),
            text: text.to_string(),
        }
    }
}

/// Name used for a document's index directory and tool names.
///
/// The file name is cut at its first `.`, so `report.v2.pdf` becomes `report`.
pub fn document_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    file_name
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// List the PDF files directly inside `dir`, sorted by path.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SitewiseError::InvalidInput(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut pdfs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_pdf(path))
        .collect();

    pdfs.sort();
    debug!("Found {} PDFs in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Extract the text of every page of a PDF.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn load_pdf(path: &Path) -> Result<Vec<DocumentPage>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| SitewiseError::InvalidInput(format!("Not a file: {}", path.display())))?;

    let owned_path = path.to_path_buf();
    let page_texts =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned_path))
        .await
        .map_err(|e| SitewiseError::Pdf(format!("Extraction task failed: {}", e)))?
        .map_err(|e| SitewiseError::Pdf(format!("{}: {:?}", path.display(), e)))?;

    let pages = pages_from_text(&file_name, page_texts);
    info!("Loaded {} pages from {}", pages.len(), file_name);
    Ok(pages)
}

/// Load the pages of several PDFs, in the given order.
pub async fn load_documents(files: &[PathBuf]) -> Result<Vec<DocumentPage>> {
    let mut pages = Vec::new();
    for file in files {
        pages.extend(load_pdf(file).await?);
    }
    Ok(pages)
}

fn pages_from_text(file_name: &str, page_texts: Vec<String>) -> Vec<DocumentPage> {
    page_texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| DocumentPage {
            file_name: file_name.to_string(),
            page_label: (i + 1).to_string(),
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_name_cuts_at_first_dot() {
        assert_eq!(document_name(Path::new("/data/enviro/Wind Farm EA.pdf")), "Wind Farm EA");
        assert_eq!(document_name(Path::new("report.v2.pdf")), "report");
        assert_eq!(document_name(Path::new("plain")), "plain");
    }

    #[test]
    fn test_list_pdfs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let pdfs = list_pdfs(dir.path()).unwrap();
        let names: Vec<String> = pdfs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_list_pdfs_missing_dir() {
        let result = list_pdfs(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(SitewiseError::InvalidInput(_))));
    }

    #[test]
    fn test_page_labels_are_one_based() {
        let pages = pages_from_text("ea.pdf", vec!["first".to_string(), "second".to_string()]);
        assert_eq!(pages[0].page_label, "1");
        assert_eq!(pages[1].page_label, "2");
        assert_eq!(pages[1].file_name, "ea.pdf");
    }
}
