//! Markdown section extraction via `pulldown-cmark`'s event stream: a
//! heading-level stack resolves nesting, section text runs from the
//! heading line to the next heading of equal or shallower level (or EOF).

use hybridrag_core::artifact::{Artifact, ArtifactKind};
use hybridrag_core::identity::{slugify, SlugDeduplicator};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

struct StackEntry {
    level: u8,
    canonical_id: String,
    /// Everything after the `#` of `canonical_id` — the compound fragment
    /// (e.g. `"a.b"` for a third-level heading under `a` and `b`), not
    /// just this entry's own bare slug. Nested children prefix their slug
    /// with this so depth ≥ 3 sections get `a.b.c`, not `b.c`.
    fragment: String,
}

pub struct MarkdownExtractor<'a> {
    relative_path: &'a str,
    source: &'a str,
}

impl<'a> MarkdownExtractor<'a> {
    pub fn new(relative_path: &'a str, source: &'a str) -> Self {
        Self { relative_path, source }
    }

    pub fn extract(&self) -> Vec<Artifact> {
        let module_id = self.relative_path.to_string();
        let mut artifacts = vec![Artifact::new(
            ArtifactKind::MarkdownModule,
            module_id.clone(),
            self.relative_path,
            self.relative_path,
        )
        .with_text(self.source.to_string())];

        let headings = self.collect_headings();
        if headings.is_empty() {
            return artifacts;
        }

        let line_starts = line_start_offsets(self.source);
        let mut dedup = SlugDeduplicator::new();
        let mut stack: Vec<StackEntry> = Vec::new();

        for (i, heading) in headings.iter().enumerate() {
            while let Some(top) = stack.last() {
                if top.level >= heading.level {
                    stack.pop();
                } else {
                    break;
                }
            }

            let (parent_id, parent_fragment) = match stack.last() {
                Some(top) => (top.canonical_id.clone(), Some(top.fragment.clone())),
                None => (module_id.clone(), None),
            };

            let base_slug = slugify(&heading.text);
            let slug = dedup.dedupe(&base_slug);
            let fragment = match &parent_fragment {
                Some(parent_fragment) => format!("{parent_fragment}.{slug}"),
                None => slug.clone(),
            };
            let canonical_id = format!("{}#{fragment}", self.relative_path);

            let start_offset = line_starts[heading.line];
            let end_offset = headings[i + 1..]
                .iter()
                .find(|h| h.level <= heading.level)
                .map(|h| line_starts[h.line])
                .unwrap_or(self.source.len());
            let text = self.source[start_offset..end_offset].trim().to_string();

            artifacts.push(
                Artifact::new(ArtifactKind::MarkdownSection, canonical_id.clone(), heading.text.clone(), self.relative_path)
                    .with_parent(parent_id)
                    .with_text(text)
                    .with_meta("level", heading.level as i64)
                    .with_meta("slug", slug.clone()),
            );

            stack.push(StackEntry { level: heading.level, canonical_id, fragment });
        }

        artifacts
    }

    fn collect_headings(&self) -> Vec<Heading> {
        let parser = Parser::new(self.source);
        let mut headings = Vec::new();
        let mut current_level: Option<u8> = None;
        let mut current_text = String::new();
        let mut current_line = 0usize;

        for (event, range) in parser.into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    current_level = Some(heading_level_to_u8(level));
                    current_text.clear();
                    current_line = line_of_offset(self.source, range.start);
                }
                Event::Text(text) | Event::Code(text) => {
                    if current_level.is_some() {
                        current_text.push_str(&text);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(level) = current_level.take() {
                        headings.push(Heading { level, text: current_text.trim().to_string(), line: current_line });
                    }
                }
                _ => {}
            }
        }

        headings
    }
}

struct Heading {
    level: u8,
    text: String,
    line: usize,
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn line_of_offset(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count()
}

/// Byte offset of the start of each line (index = line number, 0-based).
fn line_start_offsets(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_sections_follow_heading_levels() {
        let src = "# Install\n\n## Docker\n\nbody\n";
        let artifacts = MarkdownExtractor::new("README.md", src).extract();

        let module = artifacts.iter().find(|a| a.kind == ArtifactKind::MarkdownModule).unwrap();
        assert_eq!(module.text.as_deref(), Some(src));

        let install = artifacts.iter().find(|a| a.id == "README.md#install").unwrap();
        assert_eq!(install.parent_id.as_deref(), Some("README.md"));

        let docker = artifacts.iter().find(|a| a.id == "README.md#install.docker").unwrap();
        assert_eq!(docker.parent_id.as_deref(), Some("README.md#install"));
        assert_eq!(docker.text.as_deref(), Some("## Docker\n\nbody"));
    }

    #[test]
    fn three_level_nesting_uses_full_compound_fragment() {
        let src = "# A\n\n## B\n\n### C\n\nbody\n";
        let artifacts = MarkdownExtractor::new("doc.md", src).extract();

        assert!(artifacts.iter().any(|a| a.id == "doc.md#a"));
        assert!(artifacts.iter().any(|a| a.id == "doc.md#a.b"));
        let c = artifacts.iter().find(|a| a.id == "doc.md#a.b.c").expect("expected doc.md#a.b.c, not doc.md#b.c");
        assert_eq!(c.parent_id.as_deref(), Some("doc.md#a.b"));
    }

    #[test]
    fn duplicate_headings_get_numeric_suffix() {
        let src = "# Setup\n# Setup\n";
        let artifacts = MarkdownExtractor::new("file.md", src).extract();
        assert!(artifacts.iter().any(|a| a.id == "file.md#setup"));
        assert!(artifacts.iter().any(|a| a.id == "file.md#setup_2"));
        assert!(artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::MarkdownSection)
            .all(|a| a.parent_id.as_deref() == Some("file.md")));
    }
}
