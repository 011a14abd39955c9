pub mod markdown;
pub mod pdf;
pub mod plaintext;

use std::path::Path;

use crate::error::{RagindexError, Result};

/// Kind of a structural item within a converted document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Heading { level: u8 },
    Paragraph,
    ListItem,
    Code,
}

/// Where an item came from in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    /// 1-based page number
    pub page_no: u32,
}

/// A structural item (heading, paragraph, ...) with page provenance
#[derive(Debug, Clone, PartialEq)]
pub struct DocItem {
    pub kind: ItemKind,
    pub text: String,
    pub prov: Vec<Provenance>,
}

impl DocItem {
    pub fn new(kind: ItemKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            prov: Vec::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(ItemKind::Paragraph, text)
    }

    /// Attribute this item to a page
    pub fn on_page(mut self, page_no: u32) -> Self {
        self.prov.push(Provenance { page_no });
        self
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, ItemKind::Heading { .. })
    }
}

/// A converted document: an ordered list of structural items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredDocument {
    pub name: String,
    pub items: Vec<DocItem>,
}

/// Trait for document converters
pub trait DocumentConverter: Send + Sync {
    /// Check if this converter can handle the given (lowercase) file extension
    fn can_convert(&self, extension: &str) -> bool;

    /// Convert the file at `path` into a structured document
    fn convert(&self, path: &Path) -> Result<StructuredDocument>;
}

/// Converter registry that selects the appropriate converter by extension
pub struct ConverterRegistry {
    converters: Vec<Box<dyn DocumentConverter>>,
}

impl ConverterRegistry {
    /// Create a new registry with all built-in converters
    pub fn new() -> Self {
        let mut registry = Self {
            converters: Vec::new(),
        };

        registry.register(Box::new(plaintext::PlainTextConverter));
        registry.register(Box::new(markdown::MarkdownConverter));
        registry.register(Box::new(pdf::PdfConverter));

        registry
    }

    /// Register a converter; earlier registrations win on overlapping extensions
    pub fn register(&mut self, converter: Box<dyn DocumentConverter>) {
        self.converters.push(converter);
    }

    /// Find a converter that can handle the given extension
    pub fn find_converter(&self, extension: &str) -> Option<&dyn DocumentConverter> {
        let extension = extension.to_lowercase();
        self.converters
            .iter()
            .find(|c| c.can_convert(&extension))
            .map(|c| c.as_ref())
    }

    /// Convert a file using the converter registered for its extension
    pub fn convert(&self, path: &Path) -> Result<StructuredDocument> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let converter = self.find_converter(&extension).ok_or_else(|| {
            RagindexError::Conversion(format!(
                "unsupported format: {}",
                if extension.is_empty() { "(no extension)".to_string() } else { format!(".{}", extension) }
            ))
        })?;

        converter.convert(path)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Name used for a converted document: the file name component of `path`
pub(crate) fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
