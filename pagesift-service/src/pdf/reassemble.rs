//! Build a new PDF holding a subset of a source document's pages.

use std::collections::BTreeSet;

use lopdf::{Document, dictionary};
use tracing::debug;

use super::SourceDocument;
use crate::error::DocumentError;

/// Produce a serialized PDF containing exactly the pages at `keep_indices`.
///
/// `keep_indices` must be strictly ascending. Pages are carried over
/// object-for-object, never re-rendered. The output carries a bare catalog
/// (page tree only) and no document info, so outlines, forms, named
/// destinations and metadata from the source are not inherited. Objects
/// only reachable from dropped pages or discarded catalog entries are
/// pruned, so the output stands alone. An empty `keep_indices` yields a
/// valid document with no pages.
pub fn rebuild(source: &SourceDocument, keep_indices: &[usize]) -> Result<Vec<u8>, DocumentError> {
    debug_assert!(
        keep_indices.windows(2).all(|w| w[0] < w[1]),
        "keep_indices must be strictly ascending"
    );

    let page_count = source.page_count();
    if let Some(&index) = keep_indices.iter().find(|&&index| index >= page_count) {
        return Err(DocumentError::PageOutOfRange { index, page_count });
    }

    let kept: BTreeSet<u32> = keep_indices
        .iter()
        .map(|&index| SourceDocument::page_number(index))
        .collect();
    let dropped: Vec<u32> = (0..page_count)
        .map(SourceDocument::page_number)
        .filter(|number| !kept.contains(number))
        .collect();

    let mut output = source.document().clone();
    output.delete_pages(&dropped);
    reset_catalog(&mut output).map_err(|e| DocumentError::Reassembly(e.into()))?;
    output.prune_objects();
    output.renumber_objects();

    let mut bytes = Vec::new();
    output
        .save_to(&mut bytes)
        .map_err(|e| DocumentError::Reassembly(e.into()))?;

    debug!(
        source_pages = page_count,
        kept_pages = kept.len(),
        bytes = bytes.len(),
        "Reassembled PDF"
    );

    Ok(bytes)
}

/// Replace the catalog with one that references only the page tree, and
/// the trailer with one that references only that catalog.
fn reset_catalog(document: &mut Document) -> lopdf::Result<()> {
    let root_id = document.trailer.get(b"Root")?.as_reference()?;
    let pages_id = document
        .get_object(root_id)?
        .as_dict()?
        .get(b"Pages")?
        .as_reference()?;

    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer = dictionary! { "Root" => catalog_id };
    Ok(())
}
