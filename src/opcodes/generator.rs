use crate::chunks::highlight::get_indentation_change;
use crate::diff::{Opcode, SequenceDiffer, Tag};
use crate::opcodes::moves::add_move_info;
use bitflags::bitflags;
use derive_new::new;
use tracing::debug;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpcodeGeneratorFlags: u32 {
        /// Detect relocated blocks and attach move mappings.
        const MOVES = 0b001;
        /// Record per-line indentation deltas on whitespace-only changes.
        const INDENTATION = 0b010;
    }
}

/// Runs the line differ for one file pair and annotates the resulting
/// opcode script.
///
/// The differ compares lines with whitespace stripped, so a line pair that
/// differs only in leading or trailing whitespace lands in an `equal`
/// opcode. Those pairs are recorded in `whitespace_lines` and, when enabled,
/// classified as indentation changes.
#[derive(Debug, new)]
pub struct DiffOpcodeGenerator<'g> {
    a: &'g [&'g str],
    b: &'g [&'g str],
    flags: OpcodeGeneratorFlags,
    tab_size: usize,
}

impl<'g> DiffOpcodeGenerator<'g> {
    pub fn generate(&self) -> Vec<Opcode> {
        let mut differ = SequenceDiffer::new(self.a, self.b).ignore_space(true);
        let mut opcodes = differ.get_opcodes().to_vec();

        self.mark_whitespace_and_indentation(&mut opcodes);

        if self.flags.contains(OpcodeGeneratorFlags::MOVES) {
            add_move_info(&mut opcodes, self.a, self.b);
        }

        debug!(opcodes = opcodes.len(), "generated opcode script");

        opcodes
    }

    fn mark_whitespace_and_indentation(&self, opcodes: &mut [Opcode]) {
        for op in opcodes.iter_mut() {
            if op.tag != Tag::Equal {
                continue;
            }

            let line_count = op.i2 - op.i1;

            for (i, j) in (op.i1..op.i2).zip(op.j1..op.j2) {
                let (old_line, new_line) = (self.a[i], self.b[j]);

                if old_line == new_line {
                    continue;
                }

                op.meta.whitespace_lines.push((i + 1, j + 1));

                if self.flags.contains(OpcodeGeneratorFlags::INDENTATION)
                    && let Some(change) =
                        get_indentation_change(old_line, new_line, self.tab_size)
                {
                    op.meta.indentation_changes.insert((i + 1, j + 1), change);
                }
            }

            op.meta.whitespace_chunk =
                !op.meta.whitespace_lines.is_empty() && op.meta.whitespace_lines.len() == line_count;
        }
    }
}
