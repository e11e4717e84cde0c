//! In-memory PDF builders for tests.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Build a PDF with one text run per page.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let runs: Vec<Vec<&str>> = pages.iter().map(|text| vec![*text]).collect();
    build_pdf_with_runs(&runs)
}

/// Build a PDF where each page holds the given text runs, each in its own
/// text object, top to bottom.
pub fn build_pdf_with_runs(pages: &[Vec<&str>]) -> Vec<u8> {
    let contents = pages
        .iter()
        .map(|runs| {
            let mut operations = Vec::new();
            for (line, run) in runs.iter().enumerate() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new(
                    "Td",
                    vec![72.into(), (720 - 20 * line as i64).into()],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*run)]));
                operations.push(Operation::new("ET", vec![]));
            }
            operations
        })
        .collect();
    assemble(contents)
}

/// Build a PDF where each page is a single text object holding the given
/// operations, after the font is selected and the cursor placed.
pub fn build_pdf_from_operations(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let contents = pages
        .into_iter()
        .map(|body| {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
            ];
            operations.extend(body);
            operations.push(Operation::new("ET", vec![]));
            operations
        })
        .collect();
    assemble(contents)
}

/// Add a document outline whose single entry points at `target_index`,
/// plus an `Info` dictionary, to an existing PDF.
pub fn with_outline_and_info(bytes: &[u8], title: &str, target_index: usize) -> Vec<u8> {
    let mut doc = Document::load_mem(bytes).unwrap();
    let target: ObjectId = doc.get_pages().into_values().nth(target_index).unwrap();

    let outlines_id = doc.new_object_id();
    let item_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Parent" => outlines_id,
        "Dest" => vec![target.into(), "Fit".into()],
    });
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => item_id,
            "Last" => item_id,
            "Count" => 1,
        }),
    );

    let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    doc.get_object_mut(root_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("Outlines", outlines_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
    });
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// A five-page document whose page 3 (0-based) alone carries `marker`.
pub fn five_page_fixture(marker: &str) -> Vec<u8> {
    let page_three = format!("Quarterly figures {}", marker);
    build_pdf(&[
        "Cover page",
        "Table of contents",
        "Introduction",
        &page_three,
        "Closing remarks",
    ])
}

/// One Courier page per operation list, serialized.
fn assemble(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
