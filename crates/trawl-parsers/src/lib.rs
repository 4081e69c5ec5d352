//! Format detection and per-format parsers for trawl.
//!
//! Every parser produces the same IR ([`ir::ParseOutput`]); the graph builder
//! composes IR into nodes and relationships. Supported formats:
//! - **Code:** TypeScript/JavaScript, Python, Vue, Svelte, HTML/Astro, CSS,
//!   SCSS, Markdown, generic fallback
//! - **Data:** JSON, YAML, XML, TOML, ENV
//! - **Media:** PNG/JPEG/GIF/WebP/BMP/SVG/ICO/TIFF images, glTF/GLB
//! - **Documents:** PDF, DOCX, XLSX, XLS, CSV

pub mod data;
pub mod detect;
pub mod document;
pub mod ir;
pub mod markdown;
pub mod media;
pub mod queries;
pub mod styles;
pub mod treesitter;
pub mod walker;
pub mod web;

use std::path::Path;
use std::sync::Mutex;

use detect::{Detection, Format};
use ir::{DataFormat, ParseOutput, WebKind};
use trawl_core::config::TrawlConfig;
use treesitter::TreeSitterParser;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("language error: {0}")]
    Language(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("parse failed")]
    ParseFailed,
    #[error("data error: {0}")]
    Data(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Long-lived parser registry. The tree-sitter parser is created lazily on the
/// first code file and reused for the rest of the process.
pub struct ParserRegistry {
    code: Mutex<Option<TreeSitterParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            code: Mutex::new(None),
        }
    }

    /// Detect the format of `path` and parse `bytes` into the uniform IR.
    ///
    /// A parser failure returns `Err` for this file only; callers log it as a
    /// warning and keep the batch going.
    pub fn parse_file(
        &self,
        path: &Path,
        bytes: &[u8],
        config: &TrawlConfig,
    ) -> Result<(Detection, ParseOutput), ParseError> {
        let detection = detect::detect(path, Some(bytes));
        let output = self.parse_detected(detection, path, bytes, config)?;
        Ok((detection, output))
    }

    fn parse_detected(
        &self,
        detection: Detection,
        path: &Path,
        bytes: &[u8],
        config: &TrawlConfig,
    ) -> Result<ParseOutput, ParseError> {
        let mut output = ParseOutput::default();
        match detection.format {
            Format::TypeScript | Format::JavaScript | Format::Python => {
                let source = String::from_utf8_lossy(bytes);
                let mut guard = self.code.lock().unwrap();
                let parser = guard.get_or_insert_with(TreeSitterParser::new);
                let code = parser.parse_file(detection.format, path, &source)?;
                output.scopes = code.scopes;
                output.imports = code.imports;
            }
            Format::Vue | Format::Svelte | Format::Html | Format::Astro => {
                let source = String::from_utf8_lossy(bytes);
                let kind = match detection.format {
                    Format::Vue => WebKind::Vue,
                    Format::Svelte => WebKind::Svelte,
                    _ => WebKind::Html,
                };
                let (web, imports) = web::parse(kind, path, &source);
                output.web = Some(web);
                output.imports = imports;
            }
            Format::Css | Format::Scss => {
                let source = String::from_utf8_lossy(bytes);
                output.stylesheet = Some(styles::parse(&source));
            }
            Format::Markdown => {
                let source = String::from_utf8_lossy(bytes);
                output.markdown = Some(markdown::parse(&source, config.markdown.parse_code_blocks));
            }
            Format::Json | Format::Yaml | Format::Xml | Format::Toml | Format::Env => {
                let data_format = match detection.format {
                    Format::Json => DataFormat::Json,
                    Format::Yaml => DataFormat::Yaml,
                    Format::Xml => DataFormat::Xml,
                    Format::Toml => DataFormat::Toml,
                    _ => DataFormat::Env,
                };
                output.data = Some(data::parse(data_format, bytes)?);
            }
            Format::Png | Format::Jpeg | Format::Gif | Format::Webp | Format::Bmp
            | Format::Svg | Format::Ico | Format::Tiff | Format::Gltf | Format::Glb => {
                output.media = Some(media::parse(
                    detection.format,
                    bytes,
                    config.media.extract_dimensions,
                    config.media.parse_gltf_metadata,
                ));
            }
            Format::Pdf | Format::Docx | Format::Xlsx | Format::Xls | Format::Csv => {
                output.document = Some(document::parse(
                    detection.format,
                    bytes,
                    config.document.extract_text,
                )?);
            }
            Format::GenericCode | Format::PlainText => {
                // File node only; no scopes or sections
            }
        }
        Ok(output)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
