//! Per-page plain-text extraction.
//!
//! Each text-showing operation (`Tj`, `TJ`, `'`, `"`) yields one fragment.
//! A page's text is its fragments in content-stream order, joined with a
//! single space, so separately drawn strings never run into each other.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info};

use super::SourceDocument;
use crate::error::DocumentError;

/// Extract the text of every page, in page order.
///
/// The result always has one entry per page. A page whose content cannot
/// be decoded contributes an empty string rather than failing the whole
/// document; only an unparseable file is an error.
pub fn extract_page_texts(bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    let source = SourceDocument::load(bytes)?;
    Ok(page_texts(source))
}

/// Extract page text from an already-loaded document.
pub fn page_texts(source: SourceDocument) -> Vec<String> {
    let (mut document, page_ids) = source.into_parts();
    let mut texts = Vec::with_capacity(page_ids.len());

    for (index, &page_id) in page_ids.iter().enumerate() {
        let page_number = SourceDocument::page_number(index);
        let text = isolate_show_operations(&mut document, page_id)
            .and_then(|()| document.extract_text(&[page_number]))
            .map(|raw| join_fragments(&raw));

        texts.push(match text {
            Ok(text) => text,
            Err(e) => {
                debug!(page = page_number, error = %e, "No extractable text on page");
                String::new()
            }
        });
    }

    info!(
        pages = page_ids.len(),
        pages_with_text = texts.iter().filter(|t| !t.is_empty()).count(),
        "Extracted page text"
    );

    texts
}

/// Rewrite a page's content so that every text-showing operation is a lone
/// `Tj` closed by its own text object.
///
/// lopdf ends a line of extracted text at each `ET` and only understands
/// `Tj`/`TJ`, so after this pass every fragment comes back on its own line.
/// Font selection and positioning operators are left untouched.
fn isolate_show_operations(document: &mut Document, page_id: ObjectId) -> lopdf::Result<()> {
    let content = Content::decode(&document.get_page_content(page_id)?)?;

    let mut operations = Vec::with_capacity(content.operations.len());
    for operation in content.operations {
        match shown_bytes(&operation) {
            Some(shown) => {
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(shown, StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
                operations.push(Operation::new("BT", vec![]));
            }
            None => operations.push(operation),
        }
    }

    let encoded = Content { operations }.encode()?;
    let content_id = document.add_object(Stream::new(dictionary! {}, encoded));
    document
        .get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", content_id);
    Ok(())
}

/// The raw string drawn by a text-showing operation, or `None` for any
/// other operator.
///
/// `TJ` arrays are flattened into one string; kerning adjustments between
/// the pieces are dropped.
fn shown_bytes(operation: &Operation) -> Option<Vec<u8>> {
    let operand = match operation.operator.as_str() {
        "Tj" | "'" | "TJ" => operation.operands.first(),
        "\"" => operation.operands.get(2),
        _ => return None,
    }?;

    match operand {
        Object::String(bytes, _) => Some(bytes.clone()),
        Object::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Object::String(bytes, _) => Some(bytes.as_slice()),
                    _ => None,
                })
                .flatten()
                .copied()
                .collect(),
        ),
        _ => None,
    }
}

/// Fragments arrive one per line; re-join them with single spaces in the
/// order they were drawn.
fn join_fragments(raw: &str) -> String {
    raw.split('\n')
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
