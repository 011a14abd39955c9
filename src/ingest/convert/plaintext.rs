use std::path::Path;

use super::{document_name, DocItem, DocumentConverter, StructuredDocument};
use crate::error::{RagindexError, Result};

const PAGE_BREAK: char = '\x0c';

/// Plain text converter
///
/// Paragraphs are separated by blank lines. A form feed marks a page break
/// (as emitted by `pdftotext` and similar tools); text without any form feed
/// carries no page information.
pub struct PlainTextConverter;

impl DocumentConverter for PlainTextConverter {
    fn can_convert(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "text")
    }

    fn convert(&self, path: &Path) -> Result<StructuredDocument> {
        let bytes = std::fs::read(path).map_err(|e| {
            RagindexError::Conversion(format!("failed to read {}: {}", path.display(), e))
        })?;
        let content = String::from_utf8_lossy(&bytes);

        Ok(convert_text(&content, document_name(path)))
    }
}

/// Convert raw text into paragraph items
pub fn convert_text(content: &str, name: String) -> StructuredDocument {
    let content = content.trim_start_matches('\u{feff}');
    let paged = content.contains(PAGE_BREAK);

    let mut items = Vec::new();
    for (idx, page) in content.split(PAGE_BREAK).enumerate() {
        for paragraph in split_paragraphs(page) {
            let item = DocItem::paragraph(paragraph);
            items.push(if paged { item.on_page(idx as u32 + 1) } else { item });
        }
    }

    StructuredDocument { name, items }
}

/// Split text into paragraphs on blank lines, joining wrapped lines with a space
pub(crate) fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::convert::Provenance;

    #[test]
    fn test_split_paragraphs() {
        let text = "First line\nstill first.\n\n\n  Second paragraph.  \r\n\nThird.";
        assert_eq!(
            split_paragraphs(text),
            vec!["First line still first.", "Second paragraph.", "Third."]
        );
        assert!(split_paragraphs("  \n\n ").is_empty());
    }

    #[test]
    fn test_text_without_form_feed_has_no_pages() {
        let doc = convert_text("Ecology studies organisms.\n\nA population is a group.", "eco.txt".into());
        assert_eq!(doc.items.len(), 2);
        assert!(doc.items.iter().all(|i| i.prov.is_empty()));
    }

    #[test]
    fn test_form_feed_assigns_pages() {
        let doc = convert_text("Page one text.\x0cPage two.\n\nStill two.\x0c\x0cPage four.", "p.txt".into());
        let pages: Vec<Vec<Provenance>> = doc.items.iter().map(|i| i.prov.clone()).collect();
        assert_eq!(
            pages,
            vec![
                vec![Provenance { page_no: 1 }],
                vec![Provenance { page_no: 2 }],
                vec![Provenance { page_no: 2 }],
                vec![Provenance { page_no: 4 }],
            ]
        );
    }

    #[test]
    fn test_convert_reads_file_lossily() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("latin1.txt");
        std::fs::write(&path, b"caf\xe9 au lait").unwrap();

        let doc = PlainTextConverter.convert(&path).unwrap();
        assert_eq!(doc.items.len(), 1);
        assert!(doc.items[0].text.starts_with("caf"));
    }

    #[test]
    fn test_convert_missing_file_fails() {
        let err = PlainTextConverter.convert(Path::new("/no/such/file.txt")).unwrap_err();
        assert!(matches!(err, RagindexError::Conversion(_)));
    }
}
