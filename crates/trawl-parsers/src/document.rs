//! Document text extraction: PDF, DOCX, XLSX, XLS, CSV.
//!
//! PDFs that yield no text (scanned/image-only) are not an error — the node is
//! marked `needs_vision` and the orchestrator queues it for the OCR
//! collaborator.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::detect::Format;
use crate::ir::DocumentInfo;
use crate::ParseError;

/// Parse a document file. `extract_text` mirrors the config knob; with it off
/// only format metadata is recorded.
pub fn parse(format: Format, bytes: &[u8], extract_text: bool) -> Result<DocumentInfo, ParseError> {
    let mut info = DocumentInfo {
        format: format.as_str().to_string(),
        ..DocumentInfo::default()
    };
    if !extract_text {
        return Ok(info);
    }

    match format {
        Format::Pdf => parse_pdf(bytes, &mut info),
        Format::Docx => parse_docx(bytes, &mut info)?,
        Format::Xlsx => parse_xlsx(bytes, &mut info)?,
        Format::Xls => {
            // Legacy BIFF is out of scope for text extraction; metadata only
            info.needs_vision = false;
        }
        Format::Csv => parse_csv(bytes, &mut info)?,
        other => return Err(ParseError::UnsupportedFormat(other.as_str().to_string())),
    }
    Ok(info)
}

fn parse_pdf(bytes: &[u8], info: &mut DocumentInfo) {
    info.page_count = count_pdf_pages(bytes);
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            info.text = Some(text);
        }
        Ok(_) => {
            // Parsed fine but produced no text: image-only PDF
            info.needs_vision = true;
        }
        Err(e) => {
            tracing::warn!("pdf text extraction failed: {e}");
            info.needs_vision = true;
        }
    }
}

/// Cheap page count: `/Type /Page` occurrences in the raw stream.
fn count_pdf_pages(bytes: &[u8]) -> Option<u32> {
    let haystack = bytes;
    let needle = b"/Type /Page";
    let exclude = b"/Type /Pages";
    let mut count = 0u32;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            let is_pages =
                i + exclude.len() <= haystack.len() && &haystack[i..i + exclude.len()] == exclude;
            if !is_pages {
                count += 1;
            }
            i += needle.len();
        } else {
            i += 1;
        }
    }
    (count > 0).then_some(count)
}

fn parse_docx(bytes: &[u8], info: &mut DocumentInfo) -> Result<(), ParseError> {
    let document_xml = read_zip_entry(bytes, "word/document.xml")?;
    let Some(document_xml) = document_xml else {
        info.needs_vision = true;
        return Ok(());
    };
    // Paragraph breaks become newlines; runs inside a paragraph concatenate
    let text = collect_xml_text(&document_xml, "w:t", Some("w:p"))?;
    if text.trim().is_empty() {
        info.needs_vision = true;
    } else {
        info.text = Some(text);
    }
    Ok(())
}

fn parse_xlsx(bytes: &[u8], info: &mut DocumentInfo) -> Result<(), ParseError> {
    if let Some(workbook) = read_zip_entry(bytes, "xl/workbook.xml")? {
        info.sheets = collect_xml_attr(&workbook, "sheet", "name")?;
    }
    if let Some(shared) = read_zip_entry(bytes, "xl/sharedStrings.xml")? {
        let text = collect_xml_text(&shared, "t", None)?;
        if !text.trim().is_empty() {
            info.text = Some(text);
        }
    }
    Ok(())
}

fn parse_csv(bytes: &[u8], info: &mut DocumentInfo) -> Result<(), ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(Cursor::new(bytes));

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Data(format!("csv: {e}")))?;
    info.headers = headers.iter().map(str::to_string).collect();
    info.column_count = Some(headers.len() as u32);

    let mut row_count = 0u64;
    let mut sample = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParseError::Data(format!("csv: {e}")))?;
        if row_count < 20 {
            sample.push(record.iter().collect::<Vec<_>>().join(", "));
        }
        row_count += 1;
    }
    info.row_count = Some(row_count);
    info.text = Some(format!(
        "{}\n{}",
        info.headers.join(", "),
        sample.join("\n")
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// Zip / XML helpers
// ---------------------------------------------------------------------------

fn read_zip_entry(bytes: &[u8], name: &str) -> Result<Option<String>, ParseError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ParseError::Data(format!("zip: {e}")))?;
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ParseError::Data(format!("zip: {e}"))),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ParseError::Data(format!("zip: {e}")))?;
    Ok(Some(content))
}

/// Concatenate the text of every `<text_tag>` element; when `break_tag` is
/// given, each of its closings emits a newline.
fn collect_xml_text(
    xml: &str,
    text_tag: &str,
    break_tag: Option<&str>,
) -> Result<String, ParseError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut out = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == text_tag.as_bytes() {
                    in_text = true;
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == text_tag.as_bytes() {
                    in_text = false;
                } else if break_tag.is_some_and(|b| e.name().as_ref() == b.as_bytes()) {
                    out.push('\n');
                }
            }
            Ok(Event::Text(t)) => {
                if in_text {
                    out.push_str(&t.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Data(format!("xml: {e}"))),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn collect_xml_attr(xml: &str, tag: &str, attr: &str) -> Result<Vec<String>, ParseError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut out = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == tag.as_bytes() {
                    for a in e.attributes().flatten() {
                        if a.key.as_ref() == attr.as_bytes() {
                            out.push(String::from_utf8_lossy(&a.value).to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Data(format!("xml: {e}"))),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_csv_parsing() {
        let csv = b"name,age,city\nalice,30,berlin\nbob,25,lisbon\n";
        let info = parse(Format::Csv, csv, true).unwrap();
        assert_eq!(info.headers, vec!["name", "age", "city"]);
        assert_eq!(info.column_count, Some(3));
        assert_eq!(info.row_count, Some(2));
        assert!(info.text.as_deref().unwrap().contains("alice"));
    }

    #[test]
    fn test_extract_text_disabled() {
        let info = parse(Format::Csv, b"a,b\n1,2\n", false).unwrap();
        assert!(info.text.is_none());
        assert_eq!(info.format, "csv");
    }

    fn make_docx(paragraphs: &[&str]) -> Vec<u8> {
        let mut body = String::new();
        for p in paragraphs {
            body.push_str(&format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"));
        }
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="ns"><w:body>{body}</w:body></w:document>"#
        );
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_docx_text_extraction() {
        let bytes = make_docx(&["Hello world", "Second paragraph"]);
        let info = parse(Format::Docx, &bytes, true).unwrap();
        let text = info.text.unwrap();
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second paragraph"));
        assert!(text.contains('\n'));
        assert!(!info.needs_vision);
    }

    #[test]
    fn test_empty_docx_needs_vision() {
        let bytes = make_docx(&[]);
        let info = parse(Format::Docx, &bytes, true).unwrap();
        assert!(info.needs_vision);
    }

    #[test]
    fn test_bad_pdf_needs_vision() {
        let info = parse(Format::Pdf, b"not a pdf at all", true).unwrap();
        assert!(info.needs_vision);
        assert!(info.text.is_none());
    }

    #[test]
    fn test_xls_metadata_only() {
        let info = parse(Format::Xls, b"\xD0\xCF\x11\xE0junk", true).unwrap();
        assert_eq!(info.format, "xls");
        assert!(info.text.is_none());
        assert!(!info.needs_vision);
    }
}
