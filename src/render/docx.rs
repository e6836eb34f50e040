//! Paragraph extraction from Word sources. A `.docx` file is a zip archive;
//! the body text lives in `word/document.xml` as `<w:t>` runs grouped into
//! `<w:p>` paragraphs.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::RenderError;

pub fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>, RenderError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| RenderError::SourceUnreadable(format!("not a Word archive: {err}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| {
            RenderError::SourceUnreadable(format!("missing word/document.xml: {err}"))
        })?
        .read_to_string(&mut xml)
        .map_err(|err| RenderError::SourceUnreadable(format!("unreadable document body: {err}")))?;
    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>, RenderError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(|err| {
            RenderError::SourceUnreadable(format!("malformed document xml: {err}"))
        })?;
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = current.trim();
                    if !text.is_empty() {
                        paragraphs.push(text.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Event::Empty(e)
                if matches!(e.local_name().as_ref(), b"br" | b"tab" | b"cr") =>
            {
                current.push(' ');
            }
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|err| {
                    RenderError::SourceUnreadable(format!("malformed text run: {err}"))
                })?;
                current.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let trailing = current.trim();
    if !trailing.is_empty() {
        paragraphs.push(trailing.to_string());
    }
    Ok(paragraphs)
}

/// Derives the header/footer annotation recorded on the document at upload:
/// the opening paragraphs stand in for the header, the closing ones for the
/// footer, with placeholders when the body is too short.
pub fn derive_header_footer(paragraphs: &[String]) -> (String, String) {
    let header = paragraphs
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let footer = if paragraphs.len() > 2 {
        paragraphs[paragraphs.len() - 2..].join(" ")
    } else {
        "Standard Footer".to_string()
    };
    (
        if header.is_empty() {
            "Document Header".to_string()
        } else {
            header
        },
        if footer.is_empty() {
            "Document Footer".to_string()
        } else {
            footer
        },
    )
}
