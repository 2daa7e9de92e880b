//! Chunk generation
//!
//! Converts a final opcode stream (post move detection, post interdiff
//! filtering) into renderable chunks: contiguous same-kind regions with
//! per-line numbering, intraline change regions, indentation info, and move
//! annotations. `highlight` holds the marker-encoding primitives.

pub mod highlight;

use crate::diff::{Opcode, OpcodeMeta, SequenceDiffer, Tag};
use anyhow::Context;
use derive_new::new;
use highlight::{ChangedRegions, get_line_changed_regions};
use phf::phf_map;
use regex::Regex;
use tracing::debug;

/// Header-like line patterns per filename extension, used to label
/// collapsed regions with the enclosing function or class.
pub static HEADER_PATTERNS: phf::Map<&'static str, &'static str> = phf_map! {
    "py" => r"^\s*(def |class )\S+",
    "rb" => r"^\s*(def |class |module )\S+",
    "rs" => r"^\s*(pub\s+)?(fn|struct|enum|trait|impl|mod)\b",
    "go" => r"^func\s+\S+",
    "js" => r"^\s*(function\s+\S+|class\s+\S+)",
    "c" => r"^[A-Za-z_][A-Za-z0-9_ \*]*\(",
    "h" => r"^[A-Za-z_][A-Za-z0-9_ \*]*\(",
    "java" => r"^\s*(public|protected|private|static|final|class|interface)\b",
};

/// Register the header pattern for `filename`'s extension on a differ, so
/// header lines are collected during the opcode scan.
pub fn add_interesting_lines_for_headers<T: AsRef<str>>(
    differ: &mut SequenceDiffer<'_, T>,
    filename: &str,
) -> anyhow::Result<()> {
    let extension = filename.rsplit('.').next().unwrap_or("");

    if let Some(pattern) = HEADER_PATTERNS.get(extension) {
        let regex = Regex::new(pattern)
            .with_context(|| format!("invalid header pattern for .{extension}"))?;
        differ.add_interesting_line_regex("header", regex);
    }

    Ok(())
}

/// Per-call rendering configuration. Never process-global.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRendererConfig {
    pub tab_size: usize,
    pub context_lines: usize,
}

impl Default for ChunkRendererConfig {
    fn default() -> Self {
        ChunkRendererConfig {
            tab_size: 8,
            context_lines: 5,
        }
    }
}

/// One rendered line pair. Line numbers are 1-based; a missing side (the
/// old side of an insert, the new side of a delete) is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiffLine {
    pub old_linenum: Option<usize>,
    pub new_linenum: Option<usize>,
    pub old_text: Option<String>,
    pub new_text: Option<String>,
    pub old_regions: Option<ChangedRegions>,
    pub new_regions: Option<ChangedRegions>,
    pub indentation: Option<(bool, usize)>,
    pub whitespace_only: bool,
    pub moved_from: Option<usize>,
    pub moved_to: Option<usize>,
}

/// A contiguous run of same-kind lines, carrying the source opcode's meta.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub change: Tag,
    pub lines: Vec<DiffLine>,
    pub collapsable: bool,
    pub meta: OpcodeMeta,
}

impl Chunk {
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }
}

/// Converts opcodes plus the two line buffers into chunks. Produced fresh
/// per render request; nothing here is persisted.
#[derive(Debug, new)]
pub struct ChunkRenderer<'c> {
    a: &'c [&'c str],
    b: &'c [&'c str],
    config: ChunkRendererConfig,
}

impl<'c> ChunkRenderer<'c> {
    pub fn generate_chunks(&self, opcodes: &[Opcode]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for op in opcodes {
            // Filtered context renders as unchanged.
            let change = if op.tag == Tag::FilteredEqual {
                Tag::Equal
            } else {
                op.tag
            };

            let lines = match change {
                Tag::Equal => self.equal_lines(op),
                Tag::Replace => self.replace_lines(op),
                Tag::Insert => self.insert_lines(op),
                Tag::Delete => self.delete_lines(op),
                Tag::FilteredEqual => unreachable!(),
            };

            if lines.is_empty() {
                continue;
            }

            chunks.push(Chunk {
                index: chunks.len(),
                change,
                lines,
                collapsable: false,
                meta: op.meta.clone(),
            });
        }

        self.mark_collapsable(&mut chunks);

        debug!(chunks = chunks.len(), "generated chunks");

        chunks
    }

    fn equal_lines(&self, op: &Opcode) -> Vec<DiffLine> {
        let paired = (op.i2 - op.i1).min(op.j2 - op.j1);

        let mut lines: Vec<DiffLine> = (op.i1..op.i1 + paired)
            .zip(op.j1..op.j1 + paired)
            .map(|(i, j)| DiffLine {
                old_linenum: Some(i + 1),
                new_linenum: Some(j + 1),
                old_text: Some(self.a[i].to_string()),
                new_text: Some(self.b[j].to_string()),
                indentation: op.meta.indentation_changes.get(&(i + 1, j + 1)).copied(),
                whitespace_only: op.meta.whitespace_lines.contains(&(i + 1, j + 1)),
                ..DiffLine::default()
            })
            .collect();

        // Interdiff filtering can leave an equal run with uneven side
        // lengths; the surplus lines exist on one side only.
        for i in op.i1 + paired..op.i2 {
            lines.push(DiffLine {
                old_linenum: Some(i + 1),
                old_text: Some(self.a[i].to_string()),
                ..DiffLine::default()
            });
        }
        for j in op.j1 + paired..op.j2 {
            lines.push(DiffLine {
                new_linenum: Some(j + 1),
                new_text: Some(self.b[j].to_string()),
                ..DiffLine::default()
            });
        }

        lines
    }

    fn replace_lines(&self, op: &Opcode) -> Vec<DiffLine> {
        (op.i1..op.i2)
            .zip(op.j1..op.j2)
            .map(|(i, j)| {
                let (old_regions, new_regions) =
                    get_line_changed_regions(Some(self.a[i]), Some(self.b[j]));

                DiffLine {
                    old_linenum: Some(i + 1),
                    new_linenum: Some(j + 1),
                    old_text: Some(self.a[i].to_string()),
                    new_text: Some(self.b[j].to_string()),
                    old_regions,
                    new_regions,
                    moved_from: op.meta.moved_from.get(&(j + 1)).copied(),
                    moved_to: op.meta.moved_to.get(&(i + 1)).copied(),
                    ..DiffLine::default()
                }
            })
            .collect()
    }

    fn insert_lines(&self, op: &Opcode) -> Vec<DiffLine> {
        (op.j1..op.j2)
            .map(|j| DiffLine {
                new_linenum: Some(j + 1),
                new_text: Some(self.b[j].to_string()),
                moved_from: op.meta.moved_from.get(&(j + 1)).copied(),
                ..DiffLine::default()
            })
            .collect()
    }

    fn delete_lines(&self, op: &Opcode) -> Vec<DiffLine> {
        (op.i1..op.i2)
            .map(|i| DiffLine {
                old_linenum: Some(i + 1),
                old_text: Some(self.a[i].to_string()),
                moved_to: op.meta.moved_to.get(&(i + 1)).copied(),
                ..DiffLine::default()
            })
            .collect()
    }

    fn mark_collapsable(&self, chunks: &mut [Chunk]) {
        let last = chunks.len().saturating_sub(1);

        for (index, chunk) in chunks.iter_mut().enumerate() {
            if chunk.change != Tag::Equal {
                continue;
            }

            // Leading and trailing context only needs one window of
            // context; interior context needs one on each side.
            let threshold = if index == 0 || index == last {
                self.config.context_lines
            } else {
                self.config.context_lines * 2
            };

            chunk.collapsable = chunk.num_lines() > threshold;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{DiffOpcodeGenerator, OpcodeGeneratorFlags};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn render(a: &[&str], b: &[&str]) -> Vec<Chunk> {
        let config = ChunkRendererConfig::default();
        let opcodes =
            DiffOpcodeGenerator::new(a, b, OpcodeGeneratorFlags::all(), config.tab_size)
                .generate();

        ChunkRenderer::new(a, b, config).generate_chunks(&opcodes)
    }

    #[rstest]
    fn test_identical_content_is_one_equal_chunk() {
        let lines = vec!["alpha", "beta", "gamma"];
        let chunks = render(&lines, &lines);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].change, Tag::Equal);
        assert_eq!(chunks[0].num_lines(), 3);
        assert_eq!(chunks[0].lines[0].old_linenum, Some(1));
        assert_eq!(chunks[0].lines[0].new_linenum, Some(1));
    }

    #[rstest]
    fn test_uneven_filtered_equal_renders_surplus_lines() {
        // Interdiff filtering can clip an equal run unevenly, leaving more
        // lines on one side than the other.
        let a = vec!["a1", "a2", "a3", "a4"];
        let b = vec!["b1", "b2"];
        let opcodes = vec![Opcode::new(Tag::FilteredEqual, 0, 4, 0, 2)];

        let chunks = ChunkRenderer::new(&a, &b, ChunkRendererConfig::default())
            .generate_chunks(&opcodes);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].change, Tag::Equal);
        assert_eq!(chunks[0].num_lines(), 4);
        assert_eq!(chunks[0].lines[1].old_linenum, Some(2));
        assert_eq!(chunks[0].lines[1].new_linenum, Some(2));
        assert_eq!(chunks[0].lines[2].old_linenum, Some(3));
        assert_eq!(chunks[0].lines[2].new_linenum, None);
        assert_eq!(chunks[0].lines[3].old_text.as_deref(), Some("a4"));
        assert_eq!(chunks[0].lines[3].new_text, None);
    }

    #[rstest]
    fn test_replace_chunk_carries_intraline_regions() {
        let a = vec!["value = compute(1)"];
        let b = vec!["value = compute(2)"];
        let chunks = render(&a, &b);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].change, Tag::Replace);

        let line = &chunks[0].lines[0];
        assert_eq!(line.old_regions, Some(vec![(16, 17)]));
        assert_eq!(line.new_regions, Some(vec![(16, 17)]));
    }

    #[rstest]
    fn test_insert_and_delete_line_numbering() {
        let a = vec!["one", "two", "three"];
        let b = vec!["one", "three"];
        let chunks = render(&a, &b);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].change, Tag::Delete);
        assert_eq!(chunks[1].lines[0].old_linenum, Some(2));
        assert_eq!(chunks[1].lines[0].new_linenum, None);
        assert_eq!(chunks[1].lines[0].old_text.as_deref(), Some("two"));
    }

    #[rstest]
    fn test_indentation_annotation_reaches_lines() {
        let a = vec!["def foo():", "    x = 1"];
        let b = vec!["def foo():", "        x = 1"];
        let chunks = render(&a, &b);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lines[1].indentation, Some((true, 4)));
        assert!(chunks[0].lines[1].whitespace_only);
    }

    #[rstest]
    fn test_long_interior_equal_chunk_is_collapsable() {
        let mut a: Vec<String> = vec!["start original".to_string()];
        for n in 0..12 {
            a.push(format!("shared line {n}"));
        }
        a.push("end original".to_string());

        let mut b = a.clone();
        b[0] = "start changed".to_string();
        b[13] = "end changed".to_string();

        let a: Vec<&str> = a.iter().map(String::as_str).collect();
        let b: Vec<&str> = b.iter().map(String::as_str).collect();
        let chunks = render(&a, &b);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].change, Tag::Equal);
        assert!(chunks[1].collapsable);
        assert!(!chunks[0].collapsable);
        assert!(!chunks[2].collapsable);
    }

    #[rstest]
    fn test_header_pattern_registration() {
        let a = vec!["def foo():", "    pass"];
        let b = vec!["def foo():", "    done"];
        let mut differ = SequenceDiffer::new(&a, &b);

        add_interesting_lines_for_headers(&mut differ, "module.py").unwrap();
        differ.get_opcodes();

        assert_eq!(
            differ.get_interesting_lines("header", false),
            &[(0, "def foo():".to_string())]
        );
    }
}
