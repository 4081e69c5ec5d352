//! Format detection: path/extension first, filename patterns second, byte
//! sniffing last. Fails soft — anything unrecognized gets the plain-text
//! parser, which produces a File node and nothing else.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Broad family a format belongs to; selects the parser branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatCategory {
    Code,
    Data,
    Media,
    Document,
    Unknown,
}

/// Concrete file format driving parser dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    // Code
    TypeScript,
    JavaScript,
    Python,
    Vue,
    Svelte,
    Html,
    Astro,
    Css,
    Scss,
    Markdown,
    GenericCode,
    // Data
    Json,
    Yaml,
    Xml,
    Toml,
    Env,
    // Media — images
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Svg,
    Ico,
    Tiff,
    // Media — 3D
    Gltf,
    Glb,
    // Documents
    Pdf,
    Docx,
    Xlsx,
    Xls,
    Csv,
    // Fallback
    PlainText,
}

impl Format {
    pub fn category(&self) -> FormatCategory {
        use Format::*;
        match self {
            TypeScript | JavaScript | Python | Vue | Svelte | Html | Astro | Css | Scss
            | Markdown | GenericCode => FormatCategory::Code,
            Json | Yaml | Xml | Toml | Env => FormatCategory::Data,
            Png | Jpeg | Gif | Webp | Bmp | Svg | Ico | Tiff | Gltf | Glb => FormatCategory::Media,
            Pdf | Docx | Xlsx | Xls | Csv => FormatCategory::Document,
            PlainText => FormatCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use Format::*;
        match self {
            TypeScript => "typescript",
            JavaScript => "javascript",
            Python => "python",
            Vue => "vue",
            Svelte => "svelte",
            Html => "html",
            Astro => "astro",
            Css => "css",
            Scss => "scss",
            Markdown => "markdown",
            GenericCode => "code",
            Json => "json",
            Yaml => "yaml",
            Xml => "xml",
            Toml => "toml",
            Env => "env",
            Png => "png",
            Jpeg => "jpeg",
            Gif => "gif",
            Webp => "webp",
            Bmp => "bmp",
            Svg => "svg",
            Ico => "ico",
            Tiff => "tiff",
            Gltf => "gltf",
            Glb => "glb",
            Pdf => "pdf",
            Docx => "docx",
            Xlsx => "xlsx",
            Xls => "xls",
            Csv => "csv",
            PlainText => "text",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of format detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub category: FormatCategory,
    pub format: Format,
}

impl Detection {
    fn of(format: Format) -> Self {
        Detection {
            category: format.category(),
            format,
        }
    }
}

/// Detect a file's format from its path and, when the path is ambiguous, its
/// leading bytes.
pub fn detect(path: &Path, bytes: Option<&[u8]>) -> Detection {
    if let Some(format) = detect_by_extension(path) {
        return Detection::of(format);
    }
    if let Some(format) = detect_by_filename(path) {
        return Detection::of(format);
    }
    if let Some(format) = bytes.and_then(detect_by_magic) {
        return Detection::of(format);
    }
    Detection::of(Format::PlainText)
}

fn detect_by_extension(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "ts" | "tsx" | "mts" | "cts" => Format::TypeScript,
        "js" | "jsx" | "mjs" | "cjs" => Format::JavaScript,
        "py" | "pyi" => Format::Python,
        "vue" => Format::Vue,
        "svelte" => Format::Svelte,
        "html" | "htm" => Format::Html,
        "astro" => Format::Astro,
        "css" => Format::Css,
        "scss" | "sass" => Format::Scss,
        "md" | "mdx" | "markdown" => Format::Markdown,
        "rs" | "go" | "java" | "rb" | "php" | "c" | "h" | "cpp" | "hpp" | "cs" | "swift"
        | "kt" | "sh" | "bash" | "zsh" | "sql" | "lua" | "pl" | "r" => Format::GenericCode,
        "json" | "jsonc" => Format::Json,
        "yml" | "yaml" => Format::Yaml,
        "xml" | "xsd" | "xsl" | "plist" => Format::Xml,
        "toml" => Format::Toml,
        "env" => Format::Env,
        "png" => Format::Png,
        "jpg" | "jpeg" => Format::Jpeg,
        "gif" => Format::Gif,
        "webp" => Format::Webp,
        "bmp" => Format::Bmp,
        "svg" => Format::Svg,
        "ico" => Format::Ico,
        "tif" | "tiff" => Format::Tiff,
        "gltf" => Format::Gltf,
        "glb" => Format::Glb,
        "pdf" => Format::Pdf,
        "docx" => Format::Docx,
        "xlsx" => Format::Xlsx,
        "xls" => Format::Xls,
        "csv" | "tsv" => Format::Csv,
        "txt" | "text" | "log" => Format::PlainText,
        _ => return None,
    })
}

fn detect_by_filename(path: &Path) -> Option<Format> {
    let name = path.file_name()?.to_str()?;
    // `.env`, `.env.local`, `.env.production`, …
    if name == ".env" || name.starts_with(".env.") {
        return Some(Format::Env);
    }
    // Dotfile configs that are JSON under the hood
    if matches!(name, ".babelrc" | ".eslintrc" | ".prettierrc" | ".swcrc") {
        return Some(Format::Json);
    }
    if matches!(name, ".gitignore" | ".dockerignore" | ".npmrc" | ".editorconfig") {
        return Some(Format::PlainText);
    }
    if name == "Dockerfile" || name.starts_with("Dockerfile.") || name == "Makefile" {
        return Some(Format::GenericCode);
    }
    None
}

/// Byte sniffing for extensionless or misnamed files.
fn detect_by_magic(bytes: &[u8]) -> Option<Format> {
    if bytes.len() < 4 {
        return None;
    }
    if bytes.starts_with(b"%PDF-") {
        return Some(Format::Pdf);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some(Format::Png);
    }
    if bytes.starts_with(b"GIF8") {
        return Some(Format::Gif);
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(Format::Jpeg);
    }
    if bytes.starts_with(b"glTF") {
        return Some(Format::Glb);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(Format::Webp);
    }
    // PK zip container without a telling extension stays opaque; a leading
    // brace or angle bracket is worth a guess for sidecar files.
    let text_start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
    match bytes.get(text_start)? {
        b'{' | b'[' => Some(Format::Json),
        b'<' => Some(Format::Xml),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_by_extension() {
        let cases = [
            ("src/app.ts", Format::TypeScript),
            ("src/app.jsx", Format::JavaScript),
            ("lib/util.py", Format::Python),
            ("components/Button.vue", Format::Vue),
            ("components/Card.svelte", Format::Svelte),
            ("docs/readme.md", Format::Markdown),
            ("config.yaml", Format::Yaml),
            ("package.json", Format::Json),
            ("logo.png", Format::Png),
            ("scene.gltf", Format::Gltf),
            ("report.pdf", Format::Pdf),
            ("data.csv", Format::Csv),
            ("main.rs", Format::GenericCode),
        ];
        for (path, expected) in cases {
            let detection = detect(&PathBuf::from(path), None);
            assert_eq!(detection.format, expected, "path {path}");
        }
    }

    #[test]
    fn test_env_filename_patterns() {
        assert_eq!(detect(&PathBuf::from(".env"), None).format, Format::Env);
        assert_eq!(
            detect(&PathBuf::from(".env.production"), None).format,
            Format::Env
        );
    }

    #[test]
    fn test_dotfile_json() {
        assert_eq!(detect(&PathBuf::from(".babelrc"), None).format, Format::Json);
    }

    #[test]
    fn test_magic_sniffing() {
        let png = [0x89u8, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(
            detect(&PathBuf::from("mystery"), Some(&png)).format,
            Format::Png
        );
        assert_eq!(
            detect(&PathBuf::from("mystery"), Some(b"%PDF-1.7 ...")).format,
            Format::Pdf
        );
        assert_eq!(
            detect(&PathBuf::from("mystery"), Some(b"  {\"a\": 1}")).format,
            Format::Json
        );
    }

    #[test]
    fn test_unknown_falls_back_to_text() {
        let detection = detect(&PathBuf::from("mystery.xyz"), Some(b"hello"));
        assert_eq!(detection.format, Format::PlainText);
        assert_eq!(detection.category, FormatCategory::Unknown);
    }

    #[test]
    fn test_categories() {
        assert_eq!(Format::TypeScript.category(), FormatCategory::Code);
        assert_eq!(Format::Yaml.category(), FormatCategory::Data);
        assert_eq!(Format::Webp.category(), FormatCategory::Media);
        assert_eq!(Format::Docx.category(), FormatCategory::Document);
    }
}
