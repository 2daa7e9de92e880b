//! Sequence diffing
//!
//! - `myers`: Myers' shortest-edit-script algorithm over generic sequences
//! - `matcher`: ratio-based matcher used for intraline change regions
//!
//! [`SequenceDiffer`] is the line-level entry point. It materializes the full
//! opcode script in one pass and additionally records "interesting lines"
//! matching caller-registered patterns, bucketed by change side.

pub mod matcher;
pub mod myers;

pub use matcher::SequenceMatcher;
pub use myers::MyersDiff;

use regex::Regex;
use std::collections::BTreeMap;

/// Classification of one contiguous editing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    Equal,
    Insert,
    Delete,
    Replace,
    /// Renders as unchanged, but the equality is an artifact of line-number
    /// drift between two diffs. Produced only by interdiff filtering.
    FilteredEqual,
}

/// Typed annotations attached to an opcode.
///
/// Line numbers in the maps are 1-based. `moved_from` lives on the
/// destination opcode (dest line -> source line); `moved_to` on the source
/// opcode (source line -> dest line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpcodeMeta {
    pub moved_from: BTreeMap<usize, usize>,
    pub moved_to: BTreeMap<usize, usize>,
    /// Keyed by (old line, new line), value is (is_indent, raw char delta).
    pub indentation_changes: BTreeMap<(usize, usize), (bool, usize)>,
    /// Line pairs that differ only in whitespace.
    pub whitespace_lines: Vec<(usize, usize)>,
    /// Every line in the opcode is a whitespace-only change.
    pub whitespace_chunk: bool,
}

impl OpcodeMeta {
    pub fn is_empty(&self) -> bool {
        self.moved_from.is_empty()
            && self.moved_to.is_empty()
            && self.indentation_changes.is_empty()
            && self.whitespace_lines.is_empty()
            && !self.whitespace_chunk
    }

    pub fn has_indentation_changes(&self) -> bool {
        !self.indentation_changes.is_empty()
    }

    /// Union the annotations of `other` into `self`.
    pub fn merge(&mut self, other: &OpcodeMeta) {
        self.moved_from
            .extend(other.moved_from.iter().map(|(&k, &v)| (k, v)));
        self.moved_to
            .extend(other.moved_to.iter().map(|(&k, &v)| (k, v)));
        self.indentation_changes
            .extend(other.indentation_changes.iter().map(|(&k, &v)| (k, v)));
        self.whitespace_lines.extend(other.whitespace_lines.iter());
        self.whitespace_chunk = self.whitespace_chunk && other.whitespace_chunk;
    }
}

/// One edit operation: `[i1, i2)` indexes the left sequence, `[j1, j2)` the
/// right. Ranges partition both sequences in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub tag: Tag,
    pub i1: usize,
    pub i2: usize,
    pub j1: usize,
    pub j2: usize,
    pub meta: OpcodeMeta,
}

impl Opcode {
    pub fn new(tag: Tag, i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Opcode {
            tag,
            i1,
            i2,
            j1,
            j2,
            meta: OpcodeMeta::default(),
        }
    }

    pub fn with_meta(tag: Tag, i1: usize, i2: usize, j1: usize, j2: usize, meta: OpcodeMeta) -> Self {
        Opcode {
            tag,
            i1,
            i2,
            j1,
            j2,
            meta,
        }
    }
}

fn strip_whitespace(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Line-level differ with interesting-line scanning.
///
/// Stateful across one diff invocation; use a fresh instance per file pair.
pub struct SequenceDiffer<'d, T> {
    a: &'d [T],
    b: &'d [T],
    ignore_space: bool,
    interesting_patterns: Vec<(String, Regex)>,
    interesting_lines: BTreeMap<(String, bool), Vec<(usize, String)>>,
    opcodes: Option<Vec<Opcode>>,
}

impl<'d, T: AsRef<str>> SequenceDiffer<'d, T> {
    pub fn new(a: &'d [T], b: &'d [T]) -> Self {
        SequenceDiffer {
            a,
            b,
            ignore_space: false,
            interesting_patterns: Vec::new(),
            interesting_lines: BTreeMap::new(),
            opcodes: None,
        }
    }

    /// Treat lines that differ only in whitespace as equal. The resulting
    /// equal opcodes are what indentation annotation operates on.
    pub fn ignore_space(mut self, ignore_space: bool) -> Self {
        self.ignore_space = ignore_space;
        self
    }

    /// Register a pattern whose matching lines are recorded, per side,
    /// during the opcode scan.
    pub fn add_interesting_line_regex(&mut self, name: impl Into<String>, regex: Regex) {
        self.interesting_patterns.push((name.into(), regex));
    }

    /// Lines recorded for `name` on the original (`new_side = false`) or
    /// modified (`new_side = true`) side. Valid once [`Self::get_opcodes`]
    /// has run.
    pub fn get_interesting_lines(&self, name: &str, new_side: bool) -> &[(usize, String)] {
        self.interesting_lines
            .get(&(name.to_string(), new_side))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The full edit script, computed once and cached.
    pub fn get_opcodes(&mut self) -> &[Opcode] {
        if self.opcodes.is_none() {
            let opcodes = self.compute_opcodes();
            self.scan_interesting_lines();
            self.opcodes = Some(opcodes);
        }

        self.opcodes.as_deref().unwrap_or(&[])
    }

    fn compute_opcodes(&self) -> Vec<Opcode> {
        if self.ignore_space {
            let ka = self
                .a
                .iter()
                .map(|l| strip_whitespace(l.as_ref()))
                .collect::<Vec<_>>();
            let kb = self
                .b
                .iter()
                .map(|l| strip_whitespace(l.as_ref()))
                .collect::<Vec<_>>();

            MyersDiff::new(&ka, &kb).opcodes()
        } else {
            let ka = self.a.iter().map(AsRef::as_ref).collect::<Vec<_>>();
            let kb = self.b.iter().map(AsRef::as_ref).collect::<Vec<_>>();

            MyersDiff::new(&ka, &kb).opcodes()
        }
    }

    fn scan_interesting_lines(&mut self) {
        for (name, regex) in &self.interesting_patterns {
            for (new_side, lines) in [(false, self.a), (true, self.b)] {
                let bucket = self
                    .interesting_lines
                    .entry((name.clone(), new_side))
                    .or_default();

                for (index, line) in lines.iter().enumerate() {
                    if regex.is_match(line.as_ref()) {
                        bucket.push((index, line.as_ref().to_string()));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_identity_diff_yields_single_equal() {
        let lines = vec!["a", "b", "c"];
        let mut differ = SequenceDiffer::new(&lines, &lines);

        assert_eq!(differ.get_opcodes(), &[Opcode::new(Tag::Equal, 0, 3, 0, 3)]);
    }

    #[rstest]
    fn test_ignore_space_marks_whitespace_only_changes_equal() {
        let a = vec!["if foo:", "    bar()"];
        let b = vec!["if foo:", "\tbar()"];
        let mut differ = SequenceDiffer::new(&a, &b).ignore_space(true);

        assert_eq!(differ.get_opcodes(), &[Opcode::new(Tag::Equal, 0, 2, 0, 2)]);
    }

    #[rstest]
    fn test_opcode_ranges_partition_both_sequences() {
        let a = vec!["one", "two", "three", "four"];
        let b = vec!["zero", "one", "two", "3", "four", "five"];
        let mut differ = SequenceDiffer::new(&a, &b);

        let (mut i, mut j) = (0, 0);
        for op in differ.get_opcodes() {
            assert_eq!(op.i1, i);
            assert_eq!(op.j1, j);
            assert!(op.i2 >= op.i1);
            assert!(op.j2 >= op.j1);
            i = op.i2;
            j = op.j2;
        }

        assert_eq!(i, a.len());
        assert_eq!(j, b.len());
    }

    #[rstest]
    fn test_interesting_lines_recorded_per_side() {
        let a = vec!["def foo():", "    pass"];
        let b = vec!["def foo():", "    pass", "", "def bar():", "    pass"];
        let mut differ = SequenceDiffer::new(&a, &b);
        differ.add_interesting_line_regex(
            "header",
            Regex::new(r"^\s*def \S+").expect("valid regex"),
        );

        differ.get_opcodes();

        assert_eq!(
            differ.get_interesting_lines("header", false),
            &[(0, "def foo():".to_string())]
        );
        assert_eq!(
            differ.get_interesting_lines("header", true),
            &[(0, "def foo():".to_string()), (3, "def bar():".to_string())]
        );
    }

    #[rstest]
    fn test_meta_merge_unions_annotations() {
        let mut left = OpcodeMeta::default();
        left.indentation_changes.insert((1, 1), (true, 4));

        let mut right = OpcodeMeta::default();
        right.moved_from.insert(2, 10);

        left.merge(&right);

        assert_eq!(left.indentation_changes.get(&(1, 1)), Some(&(true, 4)));
        assert_eq!(left.moved_from.get(&2), Some(&10));
    }
}
