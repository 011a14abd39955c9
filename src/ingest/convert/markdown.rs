use pulldown_cmark::{Event, Options, Parser as CmarkParser, Tag, TagEnd};
use std::path::Path;

use super::{document_name, DocItem, DocumentConverter, ItemKind, StructuredDocument};
use crate::error::{RagindexError, Result};

/// Markdown converter for lecture notes and handouts
///
/// Emits headings, paragraphs, list items and code blocks as separate items.
/// Markdown has no pages, so items carry no provenance. YAML front matter is
/// skipped.
pub struct MarkdownConverter;

impl DocumentConverter for MarkdownConverter {
    fn can_convert(&self, extension: &str) -> bool {
        matches!(extension, "md" | "markdown")
    }

    fn convert(&self, path: &Path) -> Result<StructuredDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RagindexError::Conversion(format!("failed to read {}: {}", path.display(), e))
        })?;

        Ok(convert_markdown(&content, document_name(path)))
    }
}

/// Convert markdown source into structural items
pub fn convert_markdown(content: &str, name: String) -> StructuredDocument {
    let parser = CmarkParser::new_ext(content, Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    let mut items = Vec::new();
    let mut current: Option<(ItemKind, String)> = None;
    let mut in_metadata = false;

    for event in parser {
        match event {
            Event::Start(Tag::MetadataBlock(_)) => in_metadata = true,
            Event::End(TagEnd::MetadataBlock(_)) => in_metadata = false,
            _ if in_metadata => {}

            Event::Start(Tag::Heading { level, .. }) => {
                flush(&mut current, &mut items);
                current = Some((ItemKind::Heading { level: level as u8 }, String::new()));
            }
            Event::Start(Tag::Item) => {
                flush(&mut current, &mut items);
                current = Some((ItemKind::ListItem, String::new()));
            }
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut current, &mut items);
                current = Some((ItemKind::Code, String::new()));
            }
            Event::Start(Tag::Paragraph) => {
                // Paragraphs inside a list item belong to that item
                if current.is_none() {
                    current = Some((ItemKind::Paragraph, String::new()));
                }
            }
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Item) | Event::End(TagEnd::CodeBlock) => {
                flush(&mut current, &mut items);
            }
            Event::End(TagEnd::Paragraph) => match current.as_mut() {
                Some((ItemKind::Paragraph, _)) => flush(&mut current, &mut items),
                Some((_, text)) => text.push(' '),
                None => {}
            },
            Event::Text(text) | Event::Code(text) => match current.as_mut() {
                Some((_, buf)) => buf.push_str(&text),
                None => current = Some((ItemKind::Paragraph, text.to_string())),
            },
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push(' ');
                }
            }
            _ => {}
        }
    }
    flush(&mut current, &mut items);

    StructuredDocument { name, items }
}

fn flush(current: &mut Option<(ItemKind, String)>, items: &mut Vec<DocItem>) {
    if let Some((kind, text)) = current.take() {
        let text = match kind {
            ItemKind::Code => text.trim_end().to_string(),
            _ => text.split_whitespace().collect::<Vec<_>>().join(" "),
        };
        if !text.trim().is_empty() {
            items.push(DocItem::new(kind, text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_converter_can_convert() {
        assert!(MarkdownConverter.can_convert("md"));
        assert!(!MarkdownConverter.can_convert("txt"));
    }

    #[test]
    fn test_markdown_structure() {
        let content = r#"---
title: Lecture 1
---

# Ecology

Ecology studies **interactions**
between organisms.

## Populations

- A population is a group
- of one species

```
N(t) = N0 * e^(rt)
```
"#;

        let doc = convert_markdown(content, "lecture.md".into());
        let kinds: Vec<ItemKind> = doc.items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Heading { level: 1 },
                ItemKind::Paragraph,
                ItemKind::Heading { level: 2 },
                ItemKind::ListItem,
                ItemKind::ListItem,
                ItemKind::Code,
            ]
        );
        assert_eq!(doc.items[0].text, "Ecology");
        assert_eq!(doc.items[1].text, "Ecology studies interactions between organisms.");
        assert_eq!(doc.items[3].text, "A population is a group");
        assert_eq!(doc.items[5].text, "N(t) = N0 * e^(rt)");
        assert!(doc.items.iter().all(|i| i.prov.is_empty()));
        assert!(!doc.items.iter().any(|i| i.text.contains("Lecture 1")));
    }

    #[test]
    fn test_empty_markdown_has_no_items() {
        let doc = convert_markdown("   \n\n", "empty.md".into());
        assert!(doc.items.is_empty());
    }
}
