use std::path::Path;

use super::plaintext::split_paragraphs;
use super::{document_name, DocItem, DocumentConverter, StructuredDocument};
use crate::error::{RagindexError, Result};

/// PDF converter backed by lopdf
///
/// Text is extracted page by page; every paragraph is attributed to the
/// 1-based page it was found on.
pub struct PdfConverter;

impl DocumentConverter for PdfConverter {
    fn can_convert(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    fn convert(&self, path: &Path) -> Result<StructuredDocument> {
        let doc = lopdf::Document::load(path).map_err(|e| {
            RagindexError::Conversion(format!("failed to load PDF {}: {}", path.display(), e))
        })?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(RagindexError::Conversion(format!(
                "PDF has no pages: {}",
                path.display()
            )));
        }

        let extracted = page_numbers
            .into_iter()
            .map(|page_no| (page_no, doc.extract_text(&[page_no])));
        let pages = require_all_pages(path, extracted)?;

        let document = items_from_pages(document_name(path), pages);
        if document.items.is_empty() {
            return Err(RagindexError::Conversion(format!(
                "no extractable text in {} (image-based or encrypted PDF?)",
                path.display()
            )));
        }

        Ok(document)
    }
}

/// Unwrap per-page extraction results.
///
/// A page that cannot be read fails the whole file, so it stays unprocessed
/// and is retried on the next run instead of being indexed without that page.
fn require_all_pages<I, E>(path: &Path, extracted: I) -> Result<Vec<(u32, String)>>
where
    I: IntoIterator<Item = (u32, std::result::Result<String, E>)>,
    E: std::fmt::Display,
{
    let mut pages = Vec::new();
    let mut failed = Vec::new();
    for (page_no, result) in extracted {
        match result {
            Ok(text) => pages.push((page_no, text)),
            Err(e) => {
                log::warn!("Could not extract text from page {} of {}: {}", page_no, path.display(), e);
                failed.push(page_no.to_string());
            }
        }
    }

    if !failed.is_empty() {
        return Err(RagindexError::Conversion(format!(
            "failed to extract page(s) {} of {}",
            failed.join(", "),
            path.display()
        )));
    }
    Ok(pages)
}

/// Build paragraph items from `(page_no, page_text)` pairs
pub fn items_from_pages<I>(name: String, pages: I) -> StructuredDocument
where
    I: IntoIterator<Item = (u32, String)>,
{
    let items = pages
        .into_iter()
        .flat_map(|(page_no, text)| {
            split_paragraphs(&text)
                .into_iter()
                .map(move |paragraph| DocItem::paragraph(paragraph).on_page(page_no))
        })
        .collect();

    StructuredDocument { name, items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_items_from_pages_attributes_pages() {
        let doc = items_from_pages(
            "lecture.pdf".into(),
            vec![
                (1, "Intro paragraph.\n\nSecond on page one.".to_string()),
                (2, "   ".to_string()),
                (3, "Third page\ncontinues here.".to_string()),
            ],
        );

        let summary: Vec<(String, u32)> = doc
            .items
            .iter()
            .map(|i| (i.text.clone(), i.prov[0].page_no))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Intro paragraph.".to_string(), 1),
                ("Second on page one.".to_string(), 1),
                ("Third page continues here.".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_unreadable_page_fails_file() {
        let extracted: Vec<(u32, std::result::Result<String, String>)> = vec![
            (1, Ok("Page one text".to_string())),
            (2, Err("missing object 12 0 R".to_string())),
            (3, Ok("Page three text".to_string())),
        ];

        let err = require_all_pages(Path::new("lecture.pdf"), extracted).unwrap_err();
        assert!(matches!(err, RagindexError::Conversion(_)));
        assert!(err.to_string().contains("page(s) 2 of lecture.pdf"));
    }

    #[test]
    fn test_all_pages_readable() {
        let extracted: Vec<(u32, std::result::Result<String, String>)> =
            vec![(1, Ok("One".to_string())), (2, Ok("Two".to_string()))];

        let pages = require_all_pages(Path::new("lecture.pdf"), extracted).unwrap();
        assert_eq!(pages, vec![(1, "One".to_string()), (2, "Two".to_string())]);
    }

    #[test]
    fn test_garbage_pdf_fails_conversion() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();

        let err = PdfConverter.convert(&path).unwrap_err();
        assert!(matches!(err, RagindexError::Conversion(_)));
        assert!(err.to_string().contains("broken.pdf"));
    }
}
