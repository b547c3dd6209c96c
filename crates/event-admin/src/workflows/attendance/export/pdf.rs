//! Optional PDF rendering capability and a built-in text renderer.

use std::fmt::Debug;
use std::io::Write;

/// Layout-neutral document handed to a [`PdfRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    pub title: String,
    pub lines: Vec<PdfLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLine {
    pub text: String,
    pub bold: bool,
}

impl PdfLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }

    pub fn blank() -> Self {
        Self::plain("")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("pdf rendering failed: {0}")]
    Render(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Capability injected at wiring time. Absence means exports fall back to CSV.
pub trait PdfRenderer: Debug + Send + Sync {
    fn render(&self, document: &PdfDocument) -> Result<Vec<u8>, PdfError>;
}

const PAGE_WIDTH: u32 = 842;
const PAGE_HEIGHT: u32 = 595;
const MARGIN: u32 = 36;
const FONT_SIZE: u32 = 8;
const LEADING: u32 = 11;
const TITLE_SIZE: u32 = 12;

/// Paginated, monospaced A4 landscape output using the standard Courier fonts,
/// so no font files need to be embedded.
#[derive(Debug, Clone)]
pub struct TextPdfRenderer {
    lines_per_page: usize,
}

impl Default for TextPdfRenderer {
    fn default() -> Self {
        let usable = PAGE_HEIGHT - 2 * MARGIN - 2 * LEADING;
        Self {
            lines_per_page: (usable / LEADING) as usize,
        }
    }
}

impl TextPdfRenderer {
    pub fn with_lines_per_page(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
        }
    }

    fn page_content(
        &self,
        title: &str,
        page: usize,
        pages: usize,
        lines: &[PdfLine],
    ) -> Result<String, PdfError> {
        let top = PAGE_HEIGHT - MARGIN;
        let mut content = String::new();
        content.push_str("BT\n");
        content.push_str(&format!("/F2 {TITLE_SIZE} Tf\n{MARGIN} {top} Td\n"));
        content.push_str(&format!(
            "({}) Tj\n",
            escape_text(&format!("{title}    (page {page} of {pages})"))?
        ));
        content.push_str(&format!("0 -{} Td\n{LEADING} TL\n", 2 * LEADING));

        let mut current_bold = None;
        for line in lines {
            if current_bold != Some(line.bold) {
                let font = if line.bold { "F2" } else { "F1" };
                content.push_str(&format!("/{font} {FONT_SIZE} Tf\n"));
                current_bold = Some(line.bold);
            }
            content.push_str(&format!("({}) Tj\nT*\n", escape_text(&line.text)?));
        }
        content.push_str("ET\n");
        Ok(content)
    }
}

impl PdfRenderer for TextPdfRenderer {
    fn render(&self, document: &PdfDocument) -> Result<Vec<u8>, PdfError> {
        let chunks: Vec<&[PdfLine]> = if document.lines.is_empty() {
            vec![&document.lines[..]]
        } else {
            document.lines.chunks(self.lines_per_page).collect()
        };
        let pages = chunks.len();

        // 1 catalog, 2 page tree, 3 regular font, 4 bold font, then a page and
        // its content stream per chunk.
        let first_page_obj = 5;
        let page_ids: Vec<usize> = (0..pages).map(|i| first_page_obj + i * 2).collect();

        let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + pages * 2);
        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(format!("<< /Type /Pages /Kids [{kids}] /Count {pages} >>").into_bytes());
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Courier /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Courier-Bold /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );

        for (index, chunk) in chunks.iter().enumerate() {
            let content_id = page_ids[index] + 1;
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
                )
                .into_bytes(),
            );

            let stream = self.page_content(&document.title, index + 1, pages, chunk)?;
            let mut body = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
            body.extend_from_slice(stream.as_bytes());
            body.extend_from_slice(b"endstream");
            objects.push(body);
        }

        let mut out = Vec::new();
        out.write_all(b"%PDF-1.4\n")?;
        let mut offsets = Vec::with_capacity(objects.len());
        for (index, object) in objects.iter().enumerate() {
            offsets.push(out.len());
            writeln!(out, "{} 0 obj", index + 1)?;
            out.write_all(object)?;
            out.write_all(b"\nendobj\n")?;
        }

        let xref_offset = out.len();
        write!(out, "xref\n0 {}\n", objects.len() + 1)?;
        out.write_all(b"0000000000 65535 f \n")?;
        for offset in offsets {
            writeln!(out, "{offset:010} 00000 n ")?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )?;

        Ok(out)
    }
}

/// PDF literal string escaping for the WinAnsi-encoded Courier fonts. Bytes
/// above ASCII are written as octal escapes so the content stream stays ASCII.
fn escape_text(value: &str) -> Result<String, PdfError> {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\t' => escaped.push(' '),
            ' '..='~' => escaped.push(ch),
            _ => {
                let byte = win_ansi_byte(ch).ok_or_else(|| {
                    PdfError::Render(format!(
                        "character {ch:?} (U+{:04X}) has no WinAnsi glyph",
                        u32::from(ch)
                    ))
                })?;
                escaped.push_str(&format!("\\{byte:03o}"));
            }
        }
    }
    Ok(escaped)
}

/// Code point to WinAnsiEncoding byte: Latin-1 above 0xA0 plus the cp1252 block.
fn win_ansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        '\u{00A0}'..='\u{00FF}' => return u8::try_from(u32::from(ch)).ok(),
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}
