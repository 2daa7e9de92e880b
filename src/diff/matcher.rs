use crate::diff::{Opcode, Tag};
use std::collections::HashMap;
use std::hash::Hash;

/// Ratio-based sequence matcher, used at character granularity for
/// intraline change regions.
///
/// Unlike [`super::MyersDiff`], the gaps between matching blocks are emitted
/// as a single (possibly uneven) `Replace`, and a similarity ratio is
/// available to decide whether character-level highlighting makes sense at
/// all.
pub struct SequenceMatcher<'m, T: Eq + Hash> {
    a: &'m [T],
    b: &'m [T],
    b2j: HashMap<&'m T, Vec<usize>>,
    matching_blocks: Option<Vec<(usize, usize, usize)>>,
}

impl<'m, T: Eq + Hash> SequenceMatcher<'m, T> {
    pub fn new(a: &'m [T], b: &'m [T]) -> Self {
        let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
        for (j, element) in b.iter().enumerate() {
            b2j.entry(element).or_default().push(j);
        }

        SequenceMatcher {
            a,
            b,
            b2j,
            matching_blocks: None,
        }
    }

    /// The longest run of matching elements within `a[alo..ahi]` and
    /// `b[blo..bhi]`, as `(i, j, len)`. Of equally long runs, the earliest
    /// in `a` (then `b`) wins.
    pub fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let mut best_i = alo;
        let mut best_j = blo;
        let mut best_size = 0;
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();

            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }

                    let len = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, len);

                    if len > best_size {
                        best_i = i + 1 - len;
                        best_j = j + 1 - len;
                        best_size = len;
                    }
                }
            }

            j2len = new_j2len;
        }

        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }

        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    /// All matching blocks, ascending, adjacent blocks merged, terminated by
    /// the `(len_a, len_b, 0)` sentinel.
    pub fn get_matching_blocks(&mut self) -> &[(usize, usize, usize)] {
        if self.matching_blocks.is_none() {
            let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
            let mut raw = Vec::new();

            while let Some((alo, ahi, blo, bhi)) = queue.pop() {
                let (i, j, len) = self.find_longest_match(alo, ahi, blo, bhi);

                if len > 0 {
                    raw.push((i, j, len));

                    if alo < i && blo < j {
                        queue.push((alo, i, blo, j));
                    }
                    if i + len < ahi && j + len < bhi {
                        queue.push((i + len, ahi, j + len, bhi));
                    }
                }
            }

            raw.sort_unstable();

            let mut blocks: Vec<(usize, usize, usize)> = Vec::new();
            let (mut i1, mut j1, mut len1) = (0, 0, 0);

            for (i2, j2, len2) in raw {
                if i1 + len1 == i2 && j1 + len1 == j2 {
                    len1 += len2;
                } else {
                    if len1 > 0 {
                        blocks.push((i1, j1, len1));
                    }
                    (i1, j1, len1) = (i2, j2, len2);
                }
            }
            if len1 > 0 {
                blocks.push((i1, j1, len1));
            }

            blocks.push((self.a.len(), self.b.len(), 0));
            self.matching_blocks = Some(blocks);
        }

        self.matching_blocks.as_deref().unwrap_or(&[])
    }

    pub fn get_opcodes(&mut self) -> Vec<Opcode> {
        let blocks = self.get_matching_blocks().to_vec();
        let mut opcodes = Vec::new();
        let (mut i, mut j) = (0, 0);

        for (ai, bj, len) in blocks {
            let tag = if i < ai && j < bj {
                Some(Tag::Replace)
            } else if i < ai {
                Some(Tag::Delete)
            } else if j < bj {
                Some(Tag::Insert)
            } else {
                None
            };

            if let Some(tag) = tag {
                opcodes.push(Opcode::new(tag, i, ai, j, bj));
            }

            i = ai + len;
            j = bj + len;

            if len > 0 {
                opcodes.push(Opcode::new(Tag::Equal, ai, i, bj, j));
            }
        }

        opcodes
    }

    /// Similarity in `[0, 1]`: twice the matched element count over the
    /// total length of both sequences.
    pub fn ratio(&mut self) -> f64 {
        let matches: usize = self.get_matching_blocks().iter().map(|&(_, _, len)| len).sum();
        let total = self.a.len() + self.b.len();

        if total == 0 {
            1.0
        } else {
            2.0 * matches as f64 / total as f64
        }
    }
}
