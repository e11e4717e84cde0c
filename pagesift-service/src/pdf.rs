//! PDF loading, per-page text extraction, and page-subset reassembly.

use lopdf::{Document, ObjectId};
use tracing::debug;

use crate::error::DocumentError;

pub mod reassemble;
pub mod text;

#[cfg(test)]
pub(crate) mod fixtures;

pub use reassemble::rebuild;
pub use text::extract_page_texts;

/// A parsed, read-only upload.
///
/// Pages are addressed by 0-based index in document order.
#[derive(Debug)]
pub struct SourceDocument {
    document: Document,
    page_ids: Vec<ObjectId>,
}

impl SourceDocument {
    /// Parse a PDF from raw bytes.
    pub fn load(bytes: &[u8]) -> Result<Self, DocumentError> {
        let document = Document::load_mem(bytes).map_err(DocumentError::Parse)?;
        // get_pages is keyed by 1-based page number, so values come out in page order
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();

        debug!(
            pages = page_ids.len(),
            version = %document.version,
            "Loaded PDF structure"
        );

        Ok(Self { document, page_ids })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn into_parts(self) -> (Document, Vec<ObjectId>) {
        (self.document, self.page_ids)
    }

    /// 1-based page number as used by lopdf, for a 0-based index.
    pub(crate) fn page_number(index: usize) -> u32 {
        index as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::build_pdf;

    #[test]
    fn test_load_counts_pages() {
        let bytes = build_pdf(&["one", "two", "three"]);
        let source = SourceDocument::load(&bytes).unwrap();
        assert_eq!(source.page_count(), 3);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let result = SourceDocument::load(b"definitely not a pdf");
        assert!(matches!(result, Err(DocumentError::Parse(_))));
    }

    #[test]
    fn test_page_number_is_one_based() {
        assert_eq!(SourceDocument::page_number(0), 1);
        assert_eq!(SourceDocument::page_number(4), 5);
    }
}
