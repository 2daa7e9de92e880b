//! Interdiff reconciliation
//!
//! An interdiff compares two rendered diffs (against a shared baseline), not
//! file contents. Opcode runs that only look equal because unrelated hunks
//! shifted line numbers must render as filtered context, not as real
//! unchanged regions. The boundary arithmetic here is deliberately matched
//! to long-standing observed behavior; treat the tests as the contract.

use crate::diff::{Opcode, Tag};
use anyhow::Context;
use regex::Regex;
use tracing::debug;

const CHUNK_RANGE_PATTERN: &str = r"^@@ -(\d+)(,(\d+))? \+(\d+)(,(\d+))? @@";

/// Half-open windows of new-file lines covered by each hunk, from the
/// hunk's first changed line through its end.
fn get_chunk_ranges(diff: &str) -> anyhow::Result<Vec<(usize, usize)>> {
    let chunk_range_re =
        Regex::new(CHUNK_RANGE_PATTERN).context("invalid chunk range pattern")?;

    let mut ranges = Vec::new();
    let mut chunk_start = 0usize;
    let mut chunk_len = 0usize;
    let mut process_changes = false;
    let mut lines_of_context = 0usize;

    for line in diff.lines() {
        if let Some(captures) = chunk_range_re.captures(line) {
            chunk_start = captures
                .get(4)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            chunk_len = captures
                .get(6)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(1);
            process_changes = true;
            lines_of_context = 0;
        } else if process_changes {
            if line.starts_with('-') || line.starts_with('+') {
                let start = chunk_start.saturating_sub(1) + lines_of_context;
                ranges.push((start, start + chunk_len));
                process_changes = false;
            } else {
                lines_of_context += 1;
            }
        }
    }

    Ok(ranges)
}

fn is_valid_range(
    range: Option<(usize, usize)>,
    tag: Tag,
    x1: usize,
    x2: usize,
) -> bool {
    match range {
        Some((start, _)) => x1 >= start && (tag == Tag::Delete || x1 != x2),
        None => false,
    }
}

/// Re-tag opcode segments that fall outside both diffs' hunk windows as
/// `FilteredEqual`, splitting opcodes that straddle a window boundary.
///
/// `opcodes` is the edit script between the two diffs' text; `orig_diff`
/// and `new_diff` are those diffs' raw text, whose `@@` headers define the
/// windows.
pub fn filter_interdiff_opcodes(
    opcodes: Vec<Opcode>,
    orig_diff: &str,
    new_diff: &str,
) -> anyhow::Result<Vec<Opcode>> {
    let orig_ranges = get_chunk_ranges(orig_diff)?;
    let new_ranges = get_chunk_ranges(new_diff)?;

    // Neither diff has hunks to anchor on; leave the script alone.
    if orig_ranges.is_empty() && new_ranges.is_empty() {
        return Ok(opcodes);
    }

    debug!(
        orig_ranges = orig_ranges.len(),
        new_ranges = new_ranges.len(),
        "filtering interdiff opcodes"
    );

    let mut orig_iter = orig_ranges.into_iter();
    let mut new_iter = new_ranges.into_iter();
    let mut orig_range = orig_iter.next();
    let mut new_range = new_iter.next();

    let mut filtered = Vec::new();

    for op in opcodes {
        while let Some((_, end)) = orig_range
            && op.i1 > end
        {
            orig_range = orig_iter.next();
        }
        while let Some((_, end)) = new_range
            && op.j1 > end
        {
            new_range = new_iter.next();
        }

        let valid_i = is_valid_range(orig_range, op.tag, op.i1, op.i2);
        let valid_j = is_valid_range(new_range, op.tag, op.j1, op.j2);

        if !valid_i && !valid_j {
            filtered.push(Opcode::with_meta(
                Tag::FilteredEqual,
                op.i1,
                op.i2,
                op.j1,
                op.j2,
                op.meta,
            ));
            continue;
        }

        let valid_i2 = if valid_i {
            op.i2.min(orig_range.map(|(_, end)| end + 1).unwrap_or(op.i2))
        } else {
            op.i2
        };
        let valid_j2 = if valid_j {
            op.j2.min(new_range.map(|(_, end)| end + 1).unwrap_or(op.j2))
        } else {
            op.j2
        };

        filtered.push(Opcode::with_meta(
            op.tag,
            op.i1,
            valid_i2,
            op.j1,
            valid_j2,
            op.meta.clone(),
        ));

        if valid_i2 < op.i2 || valid_j2 < op.j2 {
            let (li1, li2) = if valid_i { (valid_i2, op.i2) } else { (op.i1, op.i2) };
            let (lj1, lj2) = if valid_j { (valid_j2, op.j2) } else { (op.j1, op.j2) };

            filtered.push(Opcode::with_meta(
                Tag::FilteredEqual,
                li1,
                li2,
                lj1,
                lj2,
                op.meta,
            ));
        }
    }

    Ok(filtered)
}

/// Merge adjacent `equal`/`filtered-equal` runs back into single `equal`
/// opcodes, except across indentation-change annotations, which keep their
/// own opcode so the annotation isn't hidden inside a larger span.
pub fn post_process_filtered_equals(opcodes: Vec<Opcode>) -> Vec<Opcode> {
    let mut processed = Vec::new();
    let mut current: Option<Opcode> = None;

    for op in opcodes {
        match op.tag {
            Tag::Equal | Tag::FilteredEqual => {
                if let Some(cur) = &mut current
                    && !cur.meta.has_indentation_changes()
                    && !op.meta.has_indentation_changes()
                {
                    cur.i2 = op.i2;
                    cur.j2 = op.j2;
                    cur.meta.merge(&op.meta);
                } else {
                    if let Some(cur) = current.take() {
                        processed.push(cur);
                    }
                    current = Some(Opcode::with_meta(
                        Tag::Equal,
                        op.i1,
                        op.i2,
                        op.j1,
                        op.j2,
                        op.meta,
                    ));
                }
            }
            _ => {
                if let Some(cur) = current.take() {
                    processed.push(cur);
                }
                processed.push(op);
            }
        }
    }

    if let Some(cur) = current.take() {
        processed.push(cur);
    }

    processed
}
