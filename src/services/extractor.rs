// Text Extractor
// Turns uploaded file bytes plus a declared MIME type into plain text.
// Stateless; the 10 MiB upload cap is enforced by the HTTP layer, not here.

use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use regex::Regex;
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::warn;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

/// Extraction failures. Display strings are the user-facing messages; the
/// underlying cause is logged server-side only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Unsupported file type. Please upload a .txt, .pdf, or .docx file.")]
    Unsupported,
    #[error("Failed to extract text from the file.")]
    Failed,
}

/// Extract plain text from `bytes` according to the declared MIME type.
/// MIME parameters (e.g. `; charset=utf-8`) are ignored.
pub fn extract(bytes: &[u8], declared_mime: &str) -> Result<String, ExtractError> {
    let mime = declared_mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        MIME_TEXT => Ok(String::from_utf8_lossy(bytes).into_owned()),
        MIME_PDF => extract_pdf(bytes),
        MIME_DOCX | MIME_DOC => extract_word(bytes),
        other => {
            warn!("[EXTRACTOR] Unsupported declared type: {}", other);
            Err(ExtractError::Unsupported)
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        warn!("[EXTRACTOR] PDF extraction failed: {}", e);
        ExtractError::Failed
    })
}

/// Word extraction: parse the document model first, then fall back to pulling
/// `word/document.xml` straight out of the archive for files docx-rs rejects.
fn extract_word(bytes: &[u8]) -> Result<String, ExtractError> {
    match read_docx(bytes) {
        Ok(docx) => {
            let mut out = String::new();
            for child in &docx.document.children {
                if let DocumentChild::Paragraph(para) = child {
                    let mut line = String::new();
                    for pc in &para.children {
                        if let ParagraphChild::Run(run) = pc {
                            for rc in &run.children {
                                match rc {
                                    RunChild::Text(t) => line.push_str(&t.text),
                                    RunChild::Tab(_) => line.push('\t'),
                                    RunChild::Break(_) => line.push('\n'),
                                    _ => {}
                                }
                            }
                        }
                    }
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            Ok(out.trim_end().to_string())
        }
        Err(e) => {
            warn!("[EXTRACTOR] docx-rs parse failed, trying raw XML: {:?}", e);
            extract_word_raw_xml(bytes)
        }
    }
}

fn extract_word_raw_xml(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        warn!("[EXTRACTOR] Word archive open failed: {}", e);
        ExtractError::Failed
    })?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| {
            warn!("[EXTRACTOR] word/document.xml missing: {}", e);
            ExtractError::Failed
        })?
        .read_to_string(&mut xml)
        .map_err(|e| {
            warn!("[EXTRACTOR] word/document.xml read failed: {}", e);
            ExtractError::Failed
        })?;

    // Paragraph ends become newlines before the tags are stripped so the
    // recovered text keeps its block structure.
    let xml = xml.replace("</w:p>", "</w:p>\n");
    let tag_re = Regex::new(r"<[^>]+>").expect("static regex");
    let text = tag_re.replace_all(&xml, "").to_string();

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run};

    fn sample_docx(text: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
            .build()
            .pack(&mut cursor)
            .expect("pack docx");
        cursor.into_inner()
    }

    #[test]
    fn test_plain_text_round_trip() {
        let out = extract(b"hello world", MIME_TEXT).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_plain_text_with_charset_parameter() {
        let out = extract(b"hello world", "text/plain; charset=utf-8").unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_plain_text_invalid_utf8_is_lossy_not_fatal() {
        let out = extract(&[0x68, 0x69, 0xFF], MIME_TEXT).unwrap();
        assert!(out.starts_with("hi"));
    }

    #[test]
    fn test_unsupported_type_rejected_without_decoding() {
        assert_eq!(extract(b"\x89PNG", "image/png"), Err(ExtractError::Unsupported));
        assert_eq!(extract(b"", "application/zip"), Err(ExtractError::Unsupported));
    }

    #[test]
    fn test_unsupported_message_lists_accepted_types() {
        let msg = ExtractError::Unsupported.to_string();
        assert!(msg.contains(".txt"));
        assert!(msg.contains(".pdf"));
        assert!(msg.contains(".docx"));
    }

    #[test]
    fn test_corrupt_pdf_fails_closed() {
        assert_eq!(extract(b"not a pdf", MIME_PDF), Err(ExtractError::Failed));
    }

    #[test]
    fn test_docx_round_trip() {
        let bytes = sample_docx("hello from word");
        let out = extract(&bytes, MIME_DOCX).unwrap();
        assert!(out.contains("hello from word"));
    }

    #[test]
    fn test_legacy_doc_mime_accepts_docx_payload() {
        let bytes = sample_docx("legacy route");
        let out = extract(&bytes, MIME_DOC).unwrap();
        assert!(out.contains("legacy route"));
    }

    #[test]
    fn test_garbage_word_bytes_fail() {
        assert_eq!(extract(b"garbage", MIME_DOCX), Err(ExtractError::Failed));
    }

    #[test]
    fn test_raw_xml_fallback_strips_tags() {
        let out = extract_word_raw_xml_from_xml(
            "<w:document><w:body><w:p><w:r><w:t>alpha</w:t></w:r></w:p><w:p><w:r><w:t>beta</w:t></w:r></w:p></w:body></w:document>",
        );
        assert_eq!(out, "alpha\nbeta");
    }

    fn extract_word_raw_xml_from_xml(xml: &str) -> String {
        // Build a minimal zip holding only word/document.xml.
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zw = zip::ZipWriter::new(&mut cursor);
            zw.start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            zw.write_all(xml.as_bytes()).unwrap();
            zw.finish().unwrap();
        }
        extract_word_raw_xml(&cursor.into_inner()).unwrap()
    }
}
