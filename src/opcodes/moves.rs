use crate::diff::{Opcode, Tag};
use std::collections::HashMap;
use tracing::trace;

/// A run must span this many lines to qualify as a move on its own.
const MOVE_PREFERRED_MIN_LINES: usize = 2;

/// A single-line run still qualifies when the line is at least this long.
const MOVE_MIN_LINE_LENGTH: usize = 20;

/// Trailing run lines shorter than this are trimmed before the run is
/// judged, so delimiter-only tails don't pad a move.
const MOVE_TRIM_LINE_LENGTH: usize = 4;

/// Annotate opcodes with move correspondence.
///
/// Lines removed by `delete`/`replace` opcodes are indexed by content; each
/// `insert`/`replace` opcode is then walked looking for runs of consecutive
/// removed lines reappearing in order. Qualifying runs record 1-based
/// `moved_from` (dest -> source) on the destination opcode and `moved_to`
/// (source -> dest) on each owning source opcode.
pub fn add_move_info(opcodes: &mut [Opcode], a: &[&str], b: &[&str]) {
    let mut removes: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut remove_owner: HashMap<usize, usize> = HashMap::new();

    for (opcode_index, op) in opcodes.iter().enumerate() {
        if matches!(op.tag, Tag::Delete | Tag::Replace) {
            for i in op.i1..op.i2 {
                removes.entry(a[i]).or_default().push(i);
                remove_owner.insert(i, opcode_index);
            }
        }
    }

    if removes.is_empty() {
        return;
    }

    // (destination opcode index, dest line j, source line i)
    let mut moved: Vec<(usize, usize, usize)> = Vec::new();

    for group_index in 0..opcodes.len() {
        if !matches!(opcodes[group_index].tag, Tag::Insert | Tag::Replace) {
            continue;
        }

        let (j1, j2) = (opcodes[group_index].j1, opcodes[group_index].j2);
        let mut run: Vec<(usize, usize)> = Vec::new();

        for j in j1..j2 {
            let line = b[j];

            if line.trim().is_empty() {
                commit_run(&mut run, group_index, b, &mut moved);
                continue;
            }

            if let Some(&(_, last_source)) = run.last() {
                let next = last_source + 1;

                if next < a.len() && a[next] == line && remove_owner.contains_key(&next) {
                    run.push((j, next));
                    continue;
                }

                commit_run(&mut run, group_index, b, &mut moved);
            }

            if let Some(candidates) = removes.get(line) {
                run.push((j, candidates[0]));
            }
        }

        commit_run(&mut run, group_index, b, &mut moved);
    }

    for (group_index, j, i) in moved {
        opcodes[group_index].meta.moved_from.insert(j + 1, i + 1);

        if let Some(&owner) = remove_owner.get(&i) {
            opcodes[owner].meta.moved_to.insert(i + 1, j + 1);
        }
    }
}

fn commit_run(
    run: &mut Vec<(usize, usize)>,
    group_index: usize,
    b: &[&str],
    moved: &mut Vec<(usize, usize, usize)>,
) {
    while let Some(&(j, _)) = run.last()
        && b[j].len() < MOVE_TRIM_LINE_LENGTH
    {
        run.pop();
    }

    if run.is_empty() {
        return;
    }

    let qualifies = run.len() >= MOVE_PREFERRED_MIN_LINES
        || run.iter().any(|&(j, _)| b[j].len() >= MOVE_MIN_LINE_LENGTH);

    if qualifies {
        trace!(
            group = group_index,
            lines = run.len(),
            "recording moved block"
        );

        for &(j, i) in run.iter() {
            moved.push((group_index, j, i));
        }
    }

    run.clear();
}
