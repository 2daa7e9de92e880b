use crate::diff::{Opcode, Tag};
use derive_new::new;

/// Myers' shortest-edit-script algorithm over two sequences.
///
/// The forward scan records the frontier (`v`) array per edit distance so the
/// optimal path can be walked back afterwards. Ties prefer deletions, which
/// keeps matches left-aligned the way the classic algorithm does.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MyersDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

impl<'d, T: Eq> MyersDiff<'d, T> {
    fn compute_shortest_edit(&self) -> Vec<Vec<isize>> {
        let (n, m) = (self.a.len() as isize, self.b.len() as isize);
        let offset = (n + m) as usize;

        let mut v = vec![0isize; 2 * offset + 1];
        let mut trace = Vec::new();

        for d in 0..=(n + m) {
            trace.push(v.clone());

            for k in (-d..=d).step_by(2) {
                let idx = (offset as isize + k) as usize;

                let mut x = if k == -d {
                    // only reachable from k+1, an insertion
                    v[idx + 1]
                } else if k == d {
                    // only reachable from k-1, a deletion
                    v[idx - 1] + 1
                } else {
                    let x_del = v[idx - 1] + 1;
                    let x_ins = v[idx + 1];
                    if x_del > x_ins { x_del } else { x_ins }
                };

                let mut y = x - k;
                while x < n && y < m && self.a[x as usize] == self.b[y as usize] {
                    // snake
                    x += 1;
                    y += 1;
                }

                v[idx] = x;

                if x >= n && y >= m {
                    return trace;
                }
            }
        }

        trace
    }

    fn backtrack(&self) -> Vec<(isize, isize, isize, isize)> {
        let (mut x, mut y) = (self.a.len() as isize, self.b.len() as isize);
        let offset = (x + y) as usize;
        let mut edit_path = Vec::new();

        let trace = self.compute_shortest_edit();

        for (d, v) in trace.iter().enumerate().rev() {
            let k = x - y;

            let prev_k = if k == -(d as isize) {
                k + 1
            } else if k == (d as isize) {
                k - 1
            } else {
                let k_del = k - 1;
                let k_ins = k + 1;
                if v[(offset as isize + k_del) as usize] + 1 > v[(offset as isize + k_ins) as usize]
                {
                    k_del
                } else {
                    k_ins
                }
            };

            let prev_x = v[(offset as isize + prev_k) as usize];
            let prev_y = prev_x - prev_k;

            while x > prev_x && y > prev_y {
                edit_path.push((x - 1, y - 1, x, y));
                x -= 1;
                y -= 1;
            }

            if d > 0 {
                edit_path.push((prev_x, prev_y, x, y));
            }

            (x, y) = (prev_x, prev_y);
        }

        edit_path
    }

    /// Maximal runs of matching elements, ascending, as `(i, j, len)`.
    fn matching_blocks(&self) -> Vec<(usize, usize, usize)> {
        let path = self.backtrack();
        let mut blocks: Vec<(usize, usize, usize)> = Vec::new();

        // the path is recorded back-to-front
        for &(prev_x, prev_y, x, y) in path.iter().rev() {
            if x != prev_x && y != prev_y && (prev_x as usize) < self.a.len() {
                let (ai, bi) = (prev_x as usize, prev_y as usize);

                if let Some(last) = blocks.last_mut()
                    && last.0 + last.2 == ai
                    && last.1 + last.2 == bi
                {
                    last.2 += 1;
                } else {
                    blocks.push((ai, bi, 1));
                }
            }
        }

        blocks
    }

    /// The full edit script as opcodes whose ranges partition both
    /// sequences. Gaps between matching runs become a square `Replace`
    /// followed by the uneven remainder as `Delete` or `Insert`.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let (n, m) = (self.a.len(), self.b.len());

        let mut prefix = 0;
        while prefix < n && prefix < m && self.a[prefix] == self.b[prefix] {
            prefix += 1;
        }

        let mut suffix = 0;
        while suffix < n - prefix
            && suffix < m - prefix
            && self.a[n - 1 - suffix] == self.b[m - 1 - suffix]
        {
            suffix += 1;
        }

        let mut blocks: Vec<(usize, usize, usize)> = Vec::new();
        if prefix > 0 {
            blocks.push((0, 0, prefix));
        }

        let core_a = &self.a[prefix..n - suffix];
        let core_b = &self.b[prefix..m - suffix];

        if !core_a.is_empty() && !core_b.is_empty() {
            for (i, j, len) in MyersDiff::new(core_a, core_b).matching_blocks() {
                let (i, j) = (i + prefix, j + prefix);

                if let Some(last) = blocks.last_mut()
                    && last.0 + last.2 == i
                    && last.1 + last.2 == j
                {
                    last.2 += len;
                } else {
                    blocks.push((i, j, len));
                }
            }
        }

        if suffix > 0 {
            let (i, j) = (n - suffix, m - suffix);

            if let Some(last) = blocks.last_mut()
                && last.0 + last.2 == i
                && last.1 + last.2 == j
            {
                last.2 += suffix;
            } else {
                blocks.push((i, j, suffix));
            }
        }

        blocks.push((n, m, 0));

        let mut opcodes = Vec::new();
        let (mut i, mut j) = (0, 0);

        for (bi, bj, len) in blocks {
            let square = (bi - i).min(bj - j);

            if square > 0 {
                opcodes.push(Opcode::new(Tag::Replace, i, i + square, j, j + square));
            }
            if bi - i > square {
                opcodes.push(Opcode::new(Tag::Delete, i + square, bi, bj, bj));
            } else if bj - j > square {
                opcodes.push(Opcode::new(Tag::Insert, bi, bi, j + square, bj));
            }
            if len > 0 {
                opcodes.push(Opcode::new(Tag::Equal, bi, bi + len, bj, bj + len));
            }

            i = bi + len;
            j = bj + len;
        }

        opcodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn char_inputs() -> (Vec<char>, Vec<char>) {
        ("1\n2\n3\n7\n".chars().collect(), "1\n2\n4\n5\n6\n7\n".chars().collect())
    }

    #[rstest]
    fn test_replace_then_insert_remainder(char_inputs: (Vec<char>, Vec<char>)) {
        let (a, b) = char_inputs;
        let opcodes = MyersDiff::new(&a, &b).opcodes();

        assert_eq!(
            opcodes,
            vec![
                Opcode::new(Tag::Equal, 0, 4, 0, 4),
                Opcode::new(Tag::Replace, 4, 5, 4, 5),
                Opcode::new(Tag::Insert, 5, 5, 5, 9),
                Opcode::new(Tag::Equal, 5, 8, 9, 12),
            ]
        );
    }

    #[rstest]
    fn test_leading_insert() {
        let a = "1\n2\n3\n".chars().collect::<Vec<_>>();
        let b = "0\n1\n2\n3\n".chars().collect::<Vec<_>>();
        let opcodes = MyersDiff::new(&a, &b).opcodes();

        assert_eq!(
            opcodes,
            vec![
                Opcode::new(Tag::Insert, 0, 0, 0, 2),
                Opcode::new(Tag::Equal, 0, 6, 2, 8),
            ]
        );
    }

    #[rstest]
    fn test_wholly_different_sequences() {
        let a = vec!["a", "b"];
        let b = vec!["x", "y", "z"];
        let opcodes = MyersDiff::new(&a, &b).opcodes();

        assert_eq!(
            opcodes,
            vec![
                Opcode::new(Tag::Replace, 0, 2, 0, 2),
                Opcode::new(Tag::Insert, 2, 2, 2, 3),
            ]
        );
    }

    #[rstest]
    fn test_empty_sequences() {
        let a: Vec<&str> = vec![];
        let b: Vec<&str> = vec![];

        assert_eq!(MyersDiff::new(&a, &b).opcodes(), vec![]);
    }

    #[rstest]
    fn test_delete_everything() {
        let a = vec!["a", "b", "c"];
        let b: Vec<&str> = vec![];

        assert_eq!(
            MyersDiff::new(&a, &b).opcodes(),
            vec![Opcode::new(Tag::Delete, 0, 3, 0, 0)]
        );
    }

    #[rstest]
    fn test_classic_myers_example() {
        let a = "abcabba".chars().collect::<Vec<_>>();
        let b = "cbabac".chars().collect::<Vec<_>>();
        let opcodes = MyersDiff::new(&a, &b).opcodes();

        // ranges partition both sides
        let (mut i, mut j) = (0, 0);
        for op in &opcodes {
            assert_eq!((op.i1, op.j1), (i, j));
            i = op.i2;
            j = op.j2;
        }
        assert_eq!((i, j), (a.len(), b.len()));

        // every equal range really is equal
        for op in &opcodes {
            if op.tag == Tag::Equal {
                assert_eq!(&a[op.i1..op.i2], &b[op.j1..op.j2]);
            }
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_opcodes_partition_ranges(
            a in proptest::collection::vec("[a-d]{0,3}", 0..24),
            b in proptest::collection::vec("[a-d]{0,3}", 0..24),
        ) {
            let opcodes = MyersDiff::new(&a, &b).opcodes();

            let (mut i, mut j) = (0, 0);
            for op in &opcodes {
                proptest::prop_assert_eq!((op.i1, op.j1), (i, j));
                match op.tag {
                    Tag::Insert => proptest::prop_assert_eq!(op.i1, op.i2),
                    Tag::Delete => proptest::prop_assert_eq!(op.j1, op.j2),
                    Tag::Equal => proptest::prop_assert_eq!(&a[op.i1..op.i2], &b[op.j1..op.j2]),
                    Tag::Replace => {
                        proptest::prop_assert_eq!(op.i2 - op.i1, op.j2 - op.j1);
                    }
                    Tag::FilteredEqual => unreachable!(),
                }
                i = op.i2;
                j = op.j2;
            }

            proptest::prop_assert_eq!((i, j), (a.len(), b.len()));
        }
    }
}
