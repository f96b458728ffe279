//! File loaders producing [`Document`]s.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::document::{Document, Metadata};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

const PAGE_BREAK: char = '\x0c';

fn page_metadata(source: &str, page: usize) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), Value::String(source.to_string()));
    metadata.insert("page".to_string(), Value::from(page));
    metadata
}

/// Split extracted PDF text into one document per page. Blank pages are dropped
/// but keep their page number in the count.
pub fn pages_to_documents(text: &str, source: &str) -> Vec<Document> {
    text.split(PAGE_BREAK)
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(page, content)| Document::new(content.trim(), page_metadata(source, page)))
        .collect()
}

pub async fn load_pdf_bytes(bytes: Vec<u8>, source: &str) -> Result<Vec<Document>, ApiError> {
    let source_name = source.to_string();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            // malformed input can panic inside the extractor
            if e.is_panic() {
                ApiError::BadRequest(format!("Failed to read PDF {}: malformed file", source))
            } else {
                ApiError::internal(e)
            }
        })?
        .map_err(|e| ApiError::BadRequest(format!("Failed to read PDF {}: {}", source_name, e)))?;

    Ok(pages_to_documents(&text, source))
}

pub async fn load_pdf(path: &Path) -> Result<Vec<Document>, ApiError> {
    let bytes = tokio::fs::read(path).await?;
    load_pdf_bytes(bytes, &path.to_string_lossy()).await
}

pub async fn load_text_document(path: &Path) -> Result<Document, ApiError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(Document::with_source(content, path.to_string_lossy()))
}

async fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return files;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    files
}

/// Every `.pdf` under `pdfs/` and every `.txt` under `documents/`.
/// Unreadable files are logged and skipped.
pub async fn load_all_documents(paths: &AppPaths) -> Vec<Document> {
    let mut documents = Vec::new();

    for path in files_with_extension(&paths.pdf_dir, "pdf").await {
        match load_pdf(&path).await {
            Ok(pages) => documents.extend(pages),
            Err(err) => tracing::warn!("Skipping PDF {}: {}", path.display(), err),
        }
    }

    for path in files_with_extension(&paths.documents_dir, "txt").await {
        match load_text_document(&path).await {
            Ok(doc) => documents.push(doc),
            Err(err) => tracing::warn!("Skipping document {}: {}", path.display(), err),
        }
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_numbered_from_zero() {
        let docs = pages_to_documents("first page\x0c\x0cthird page\n", "report.pdf");

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "first page");
        assert_eq!(docs[0].metadata["page"], 0);
        assert_eq!(docs[1].content, "third page");
        assert_eq!(docs[1].metadata["page"], 2);
        assert_eq!(docs[1].source(), "report.pdf");
    }

    #[tokio::test]
    async fn invalid_pdf_bytes_are_rejected() {
        let err = load_pdf_bytes(b"not a pdf".to_vec(), "bad.pdf").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn load_all_documents_reads_text_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_layout(dir.path().to_path_buf(), dir.path().join("data"));
        paths.ensure_directories().unwrap();

        std::fs::write(paths.documents_dir.join("b.txt"), "second").unwrap();
        std::fs::write(paths.documents_dir.join("a.txt"), "first").unwrap();
        std::fs::write(paths.documents_dir.join("notes.md"), "ignored").unwrap();
        std::fs::write(paths.pdf_dir.join("broken.pdf"), "not a pdf").unwrap();

        let docs = load_all_documents(&paths).await;

        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert!(docs[0].source().ends_with("a.txt"));
    }
}
