//! Report export: feedback text → single-page PDF in temporary storage.
//!
//! Each `\n`-separated line of the feedback becomes one text line, drawn in
//! Helvetica from the top-left origin of the [`PdfLayout`] and moving down by
//! the leading. Lines are not wrapped and the document never grows past one
//! page.
//!
//! The built-in Helvetica font only covers WinAnsi, so text is transliterated
//! with [`encode_winansi`] before it is written.

use crate::config::PdfLayout;
use crate::error::ExportError;
use crate::output::PdfArtifact;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use tracing::debug;

const FONT_RESOURCE: &str = "F1";

/// Render `text` to a PDF in temporary storage.
///
/// The returned artifact deletes the file when dropped.
pub fn export_to_pdf(text: &str, layout: &PdfLayout) -> Result<PdfArtifact, ExportError> {
    let lines = split_lines(text);
    let bytes = build_pdf(&lines, layout)?;

    let mut file = tempfile::Builder::new()
        .prefix("debate-feedback-")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(&bytes)?;
    file.flush()?;

    let path = file.into_temp_path();
    debug!(
        "Wrote feedback report: {} lines, {} bytes → {}",
        lines.len(),
        bytes.len(),
        path.display()
    );
    Ok(PdfArtifact::new(path, lines.len()))
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Serialise a one-page PDF holding `lines`.
pub fn build_pdf(lines: &[&str], layout: &PdfLayout) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_RESOURCE => font_id,
        },
    });

    let content = text_content(lines, layout);
    let encoded = content
        .encode()
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            layout.page_width.into(),
            layout.page_height.into(),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(out)
}

/// Content stream: one `Tj` per line, `T*` between lines.
fn text_content(lines: &[&str], layout: &PdfLayout) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), layout.font_size.into()],
        ),
        Operation::new("TL", vec![layout.leading.into()]),
        Operation::new(
            "Td",
            vec![layout.origin_x.into(), layout.origin_y().into()],
        ),
    ];

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_winansi(line))],
        ));
    }

    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Transliterate `text` to WinAnsi (CP1252) bytes.
///
/// Latin-1 passes through, the typographic characters CP1252 adds in
/// 0x80..0x9F are mapped, tabs become four spaces and anything else becomes
/// `?`.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.extend_from_slice(b"    "),
            '\u{20}'..='\u{7E}' => out.push(c as u8),
            '\u{A0}'..='\u{FF}' => out.push(c as u32 as u8),
            '\u{20AC}' => out.push(0x80),
            '\u{2026}' => out.push(0x85),
            '\u{2018}' => out.push(0x91),
            '\u{2019}' => out.push(0x92),
            '\u{201C}' => out.push(0x93),
            '\u{201D}' => out.push(0x94),
            '\u{2022}' => out.push(0x95),
            '\u{2013}' => out.push(0x96),
            '\u{2014}' => out.push(0x97),
            _ => out.push(b'?'),
        }
    }
    out
}
