//! Git diff dialect
//!
//! Git diffs replace the plain filename headers with a `diff --git` line
//! plus a run of extended headers (modes, renames, the `index` blob line).
//! Mode-only changes carry no content and are dropped entirely rather than
//! surfacing as empty files.

use crate::errors::DiffParserError;
use crate::parser::revision::Revision;
use crate::parser::{DiffLines, DiffParserHooks, ParsedDiffFile};

#[derive(Debug, Default)]
pub struct GitDiffHooks;

impl DiffParserHooks for GitDiffHooks {
    fn parse_diff_header(
        &self,
        lines: &DiffLines<'_>,
        linenum: usize,
        file: &mut ParsedDiffFile,
    ) -> Result<usize, DiffParserError> {
        let Some(line) = lines.get(linenum) else {
            return Ok(linenum);
        };
        let Some(paths) = line.strip_prefix("diff --git ") else {
            return Ok(linenum);
        };

        // The header line carries both paths; rename headers below may
        // replace them.
        let mut tokens = paths.split_whitespace().rev();
        let new_path = tokens.next();
        let orig_path = tokens.next();

        if let (Some(orig), Some(new)) = (orig_path, new_path) {
            file.orig_file = Some(strip_path_prefix(orig).to_string());
            file.new_file = Some(strip_path_prefix(new).to_string());
        } else {
            return Err(DiffParserError::new(
                "Unable to parse diff header",
                linenum,
                line,
            ));
        }

        let mut linenum = linenum + 1;

        while let Some(line) = lines.get(linenum) {
            if line.starts_with("old mode ")
                || line.starts_with("new mode ")
                || line.starts_with("new file mode ")
                || line.starts_with("similarity index ")
                || line.starts_with("dissimilarity index ")
            {
                linenum += 1;
            } else if line.starts_with("deleted file mode ") {
                file.deleted = true;
                linenum += 1;
            } else if let Some(path) = line.strip_prefix("rename from ") {
                file.moved = true;
                file.orig_file = Some(path.to_string());
                linenum += 1;
            } else if let Some(path) = line.strip_prefix("rename to ") {
                file.moved = true;
                file.new_file = Some(path.to_string());
                linenum += 1;
            } else if let Some(blobs) = line.strip_prefix("index ") {
                parse_index_line(blobs, file);
                linenum += 1;
            } else if line.starts_with("--- ")
                && lines
                    .get(linenum + 1)
                    .is_some_and(|next| next.starts_with("+++ "))
            {
                if line == "--- /dev/null" {
                    file.orig_info = Some(Revision::PreCreation);
                }

                linenum += 2;
                break;
            } else if (line.starts_with("Binary files ") && line.ends_with(" differ"))
                || line == "GIT binary patch"
            {
                file.binary = true;
                linenum += 1;
                break;
            } else {
                break;
            }
        }

        if file.orig_info.is_none() && file.new_info.is_none() {
            if file.moved || file.binary {
                file.orig_info = Some(Revision::Unknown);
                file.new_info = Some(Revision::Unknown);
            } else {
                // Mode-only changeset; nothing to show.
                file.skip = true;
            }
        }

        Ok(linenum)
    }
}

fn strip_path_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// `index <old>..<new>[ <mode>]`. An all-zero old blob means the file is
/// being created.
fn parse_index_line(blobs: &str, file: &mut ParsedDiffFile) {
    let Some(range) = blobs.split_whitespace().next() else {
        return;
    };
    let Some((orig, new)) = range.split_once("..") else {
        return;
    };

    file.orig_info = Some(if !orig.is_empty() && orig.bytes().all(|b| b == b'0') {
        Revision::PreCreation
    } else {
        Revision::other(orig)
    });
    file.new_info = Some(Revision::other(new));
}
