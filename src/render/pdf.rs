//! PDF composition. Each page carries the document header region (name,
//! number, revision, issue date), a slice of the wrapped body text, and the
//! footer region with the controlled-copy block when a stamp is present.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};

use super::{ControlCopyStamp, RenderError};
use crate::models::Document;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const BODY_TOP: i64 = PAGE_HEIGHT - 130;
const BODY_BOTTOM: i64 = 140;
const LEADING: i64 = 16;
const BODY_FONT_SIZE: i64 = 11;
// Helvetica at 11pt fits roughly this many characters between the margins.
const WRAP_COLUMNS: usize = 88;

pub fn compose(
    document: &Document,
    paragraphs: &[String],
    stamp: Option<&ControlCopyStamp>,
) -> Result<Vec<u8>, RenderError> {
    let lines = wrap_paragraphs(paragraphs);

    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id, "F2" => bold_font_id },
    });

    let lines_per_page = ((BODY_TOP - BODY_BOTTOM) / LEADING) as usize;
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&[]]
    } else {
        lines.chunks(lines_per_page).collect()
    };

    let mut kids: Vec<Object> = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let content = Content {
            operations: page_operations(document, chunk, stamp),
        };
        let encoded = content.encode().map_err(|err| {
            RenderError::EngineUnavailable(format!("content encoding failed: {err}"))
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
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
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|err| {
        RenderError::EngineUnavailable(format!("pdf serialization failed: {err}"))
    })?;
    Ok(bytes)
}

fn page_operations(
    document: &Document,
    lines: &[String],
    stamp: Option<&ControlCopyStamp>,
) -> Vec<Operation> {
    let issue_date = document
        .date_of_issue
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    let header_line = format!(
        "Doc No: {} | Rev: {} | Date: {}",
        document.doc_number, document.revision_no, issue_date
    );

    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), 14.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - 46).into()]),
        text(&document.doc_name),
        Operation::new("Tf", vec!["F1".into(), 9.into()]),
        Operation::new("Td", vec![0.into(), (-14).into()]),
        text(&header_line),
    ];
    if let Some(info) = document.header_info.as_deref() {
        ops.push(Operation::new("Td", vec![0.into(), (-12).into()]));
        ops.push(text(info));
    }
    ops.push(Operation::new("ET", vec![]));

    // rule separating the header region from the body
    ops.push(Operation::new(
        "m",
        vec![MARGIN.into(), (PAGE_HEIGHT - 94).into()],
    ));
    ops.push(Operation::new(
        "l",
        vec![(PAGE_WIDTH - MARGIN).into(), (PAGE_HEIGHT - 94).into()],
    ));
    ops.push(Operation::new("S", vec![]));

    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), BODY_FONT_SIZE.into()]));
    ops.push(Operation::new("TL", vec![LEADING.into()]));
    ops.push(Operation::new("Td", vec![MARGIN.into(), BODY_TOP.into()]));
    for line in lines {
        if !line.is_empty() {
            ops.push(text(line));
        }
        ops.push(Operation::new("T*", vec![]));
    }
    ops.push(Operation::new("ET", vec![]));

    if let Some(info) = document.footer_info.as_deref() {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec!["F1".into(), 8.into()]));
        ops.push(Operation::new("Td", vec![MARGIN.into(), 112.into()]));
        ops.push(text(info));
        ops.push(Operation::new("ET", vec![]));
    }

    if let Some(stamp) = stamp {
        ops.push(Operation::new("w", vec![1.into()]));
        ops.push(Operation::new(
            "re",
            vec![
                (MARGIN - 5).into(),
                48.into(),
                (PAGE_WIDTH - 2 * MARGIN + 10).into(),
                44.into(),
            ],
        ));
        ops.push(Operation::new("S", vec![]));

        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec!["F2".into(), 9.into()]));
        ops.push(Operation::new(
            "rg",
            vec![Object::Real(0.8), Object::Real(0.0), Object::Real(0.0)],
        ));
        ops.push(Operation::new("Td", vec![MARGIN.into(), 76.into()]));
        ops.push(text("CONTROLLED COPY - NOT FOR DISTRIBUTION"));
        ops.push(Operation::new("Tf", vec!["F1".into(), 8.into()]));
        ops.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        ops.push(text(&format!(
            "User: {} ({}) | Control Copy No: {} | Date: {}",
            stamp.user_name, stamp.user_id, stamp.copy_number, stamp.date
        )));
        ops.push(Operation::new(
            "rg",
            vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    ops
}

fn text(value: &str) -> Operation {
    Operation::new("Tj", vec![Object::string_literal(sanitize(value))])
}

/// The base-14 Helvetica font cannot encode arbitrary unicode; common
/// typographic punctuation is mapped to ASCII and the rest dropped.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter_map(|ch| match ch {
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\u{201c}' | '\u{201d}' => Some('"'),
            '\u{2013}' | '\u{2014}' => Some('-'),
            '\u{2026}' => Some('.'),
            ch if ch.is_ascii() && !ch.is_ascii_control() => Some(ch),
            _ => None,
        })
        .collect()
}

fn wrap_paragraphs(paragraphs: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in paragraphs {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.chars().count() + 1 + word.chars().count() <= WRAP_COLUMNS {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            }
            while current.chars().count() > WRAP_COLUMNS {
                let head: String = current.chars().take(WRAP_COLUMNS).collect();
                let rest: String = current.chars().skip(WRAP_COLUMNS).collect();
                lines.push(head);
                current = rest;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines.push(String::new());
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}
