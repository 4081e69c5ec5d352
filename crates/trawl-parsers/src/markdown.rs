//! Markdown parsing: section tree with own/recursive content, fenced code
//! blocks, links, and image references.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::ir::{CodeBlockDef, MarkdownInfo, SectionDef};

/// Parse a markdown document. `parse_code_blocks` gates fenced block capture.
pub fn parse(source: &str, parse_code_blocks: bool) -> MarkdownInfo {
    let line_starts = line_start_offsets(source);
    let mut info = MarkdownInfo::default();

    // Pass 1: collect headings, code blocks, links, images with byte ranges.
    struct Heading {
        level: u8,
        title: String,
        start_offset: usize,
        end_offset: usize,
        line: u32,
    }
    let mut headings: Vec<Heading> = Vec::new();

    let options = Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(source, options);

    let mut current_heading: Option<Heading> = None;
    let mut current_block: Option<(String, String, usize)> = None;

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current_heading = Some(Heading {
                    level: level as u8,
                    title: String::new(),
                    start_offset: range.start,
                    end_offset: range.end,
                    line: offset_to_line(&line_starts, range.start),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(mut h) = current_heading.take() {
                    h.end_offset = range.end;
                    headings.push(h);
                }
            }
            Event::Text(text) => {
                if let Some(h) = current_heading.as_mut() {
                    h.title.push_str(&text);
                } else if let Some((_, code, _)) = current_block.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::Code(code) => {
                if let Some(h) = current_heading.as_mut() {
                    h.title.push_str(&code);
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                if parse_code_blocks {
                    let language = match kind {
                        CodeBlockKind::Fenced(lang) => lang.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    current_block = Some((language, String::new(), range.start));
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, code, start_offset)) = current_block.take() {
                    info.code_blocks.push(CodeBlockDef {
                        language,
                        code,
                        start_line: offset_to_line(&line_starts, start_offset),
                        end_line: offset_to_line(&line_starts, range.end.saturating_sub(1)),
                    });
                }
            }
            Event::Start(Tag::Link { dest_url, title, .. }) => {
                info.links.push((title.to_string(), dest_url.to_string()));
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                info.images.push(dest_url.to_string());
            }
            _ => {}
        }
    }

    // Pass 2: derive section contents from heading byte ranges.
    for (i, heading) in headings.iter().enumerate() {
        let own_end = headings
            .get(i + 1)
            .map(|next| next.start_offset)
            .unwrap_or(source.len());
        let full_end = headings
            .iter()
            .skip(i + 1)
            .find(|next| next.level <= heading.level)
            .map(|next| next.start_offset)
            .unwrap_or(source.len());

        let own_content = source[heading.end_offset..own_end].trim().to_string();
        let full_content = source[heading.end_offset..full_end].trim().to_string();

        let parent_title = headings[..i]
            .iter()
            .rev()
            .find(|prev| prev.level < heading.level)
            .map(|prev| prev.title.clone());

        info.sections.push(SectionDef {
            title: heading.title.clone(),
            level: heading.level,
            slug: slugify(&heading.title),
            own_content,
            full_content,
            parent_title,
            start_line: heading.line,
        });
    }

    info.title = headings.first().map(|h| h.title.clone());
    info
}

/// Lowercase, alphanumerics kept, everything else collapsed to single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn line_start_offsets(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

fn offset_to_line(line_starts: &[usize], offset: usize) -> u32 {
    match line_starts.binary_search(&offset) {
        Ok(i) => i as u32 + 1,
        Err(i) => i as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Guide\n\nIntro text.\n\n## Install\n\nRun the installer.\n\n### Linux\n\napt install trawl\n\n## Usage\n\nCall it.\n";

    #[test]
    fn test_section_hierarchy() {
        let info = parse(DOC, true);
        assert_eq!(info.sections.len(), 4);

        let guide = &info.sections[0];
        assert_eq!(guide.title, "Guide");
        assert_eq!(guide.level, 1);
        assert_eq!(guide.parent_title, None);

        let install = &info.sections[1];
        assert_eq!(install.parent_title.as_deref(), Some("Guide"));

        let linux = &info.sections[2];
        assert_eq!(linux.parent_title.as_deref(), Some("Install"));
        assert_eq!(linux.slug, "linux");

        let usage = &info.sections[3];
        assert_eq!(usage.parent_title.as_deref(), Some("Guide"));
    }

    #[test]
    fn test_own_vs_full_content() {
        let info = parse(DOC, true);
        let install = &info.sections[1];
        assert!(install.own_content.contains("Run the installer"));
        assert!(!install.own_content.contains("apt install"));
        assert!(install.full_content.contains("apt install"));
        assert!(!install.full_content.contains("Call it"));
    }

    #[test]
    fn test_code_blocks() {
        let doc = "# T\n\n```rust\nfn main() {}\n```\n";
        let info = parse(doc, true);
        assert_eq!(info.code_blocks.len(), 1);
        let block = &info.code_blocks[0];
        assert_eq!(block.language, "rust");
        assert!(block.code.contains("fn main"));
        assert_eq!(block.start_line, 3);
        assert_eq!(block.end_line, 5);
    }

    #[test]
    fn test_code_blocks_disabled() {
        let doc = "# T\n\n```rust\nfn main() {}\n```\n";
        let info = parse(doc, false);
        assert!(info.code_blocks.is_empty());
    }

    #[test]
    fn test_links_and_images() {
        let doc = "# T\n\n[docs](https://example.com) ![logo](assets/logo.png)\n";
        let info = parse(doc, true);
        assert_eq!(info.links.len(), 1);
        assert_eq!(info.links[0].1, "https://example.com");
        assert_eq!(info.images, vec!["assets/logo.png".to_string()]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started: The Basics"), "getting-started-the-basics");
        assert_eq!(slugify("  FAQ  "), "faq");
    }
}
