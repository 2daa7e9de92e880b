//! Diff text parsing
//!
//! Splits raw diff text into per-file records. The generic parser handles
//! unified and context diffs; backend-specific dialects (git, svn) plug in
//! through [`DiffParserHooks`], which can take over any of the three header
//! phases while inheriting the rest.

pub mod git;
pub mod revision;
pub mod svn;

use crate::errors::DiffParserError;
use revision::Revision;
use tracing::debug;

/// One file's worth of parsed diff.
///
/// `data` holds the raw diff text for the file, headers included, so it can
/// be re-emitted or patched verbatim. Line numbers in errors are 0-based
/// offsets into the full diff.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedDiffFile {
    pub orig_file: Option<String>,
    pub new_file: Option<String>,
    pub orig_info: Option<Revision>,
    pub new_info: Option<Revision>,
    pub orig_changeset_id: Option<String>,
    pub index_header: Option<String>,
    pub data: String,
    pub binary: bool,
    pub deleted: bool,
    pub moved: bool,
    pub skip: bool,
    pub insert_count: usize,
    pub delete_count: usize,
    pub index: usize,
}

impl ParsedDiffFile {
    fn has_header_info(&self) -> bool {
        self.orig_file.is_some()
            && self.new_file.is_some()
            && self.orig_info.is_some()
            && self.new_info.is_some()
    }

    fn has_partial_header_info(&self) -> bool {
        self.orig_file.is_some()
            || self.new_file.is_some()
            || self.orig_info.is_some()
            || self.new_info.is_some()
    }
}

/// Line-indexed view over the diff text. Out-of-range access yields `None`
/// so header probes near the end of the input stay branch-free.
///
/// Matching happens on terminator-stripped lines, but byte offsets into the
/// source are kept so per-file `data` can be sliced verbatim; a line whose
/// content carries a trailing `\r` must survive the round trip.
#[derive(Debug)]
pub struct DiffLines<'p> {
    source: &'p str,
    lines: Vec<&'p str>,
    offsets: Vec<usize>,
}

impl<'p> DiffLines<'p> {
    pub fn new(data: &'p str) -> Self {
        let mut lines = Vec::new();
        let mut offsets = Vec::new();
        let mut pos = 0;

        for raw in data.split_inclusive('\n') {
            offsets.push(pos);
            pos += raw.len();

            let line = raw.strip_suffix('\n').unwrap_or(raw);
            let line = line.strip_suffix('\r').unwrap_or(line);
            lines.push(line);
        }

        DiffLines {
            source: data,
            lines,
            offsets,
        }
    }

    pub fn get(&self, linenum: usize) -> Option<&'p str> {
        self.lines.get(linenum).copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Verbatim source bytes for lines `[start, end)`, terminators included.
    pub fn raw(&self, start: usize, end: usize) -> &'p str {
        let from = self
            .offsets
            .get(start)
            .copied()
            .unwrap_or(self.source.len());
        let to = self.offsets.get(end).copied().unwrap_or(self.source.len());

        &self.source[from..to]
    }
}

/// Header-phase extension points for diff dialects.
///
/// Each hook receives the current line number and the file record under
/// construction, and returns the line number to resume from. Returning the
/// input line number unchanged means "not mine".
pub trait DiffParserHooks {
    fn parse_special_header(
        &self,
        lines: &DiffLines<'_>,
        linenum: usize,
        file: &mut ParsedDiffFile,
    ) -> Result<usize, DiffParserError> {
        generic_special_header(lines, linenum, file)
    }

    fn parse_diff_header(
        &self,
        lines: &DiffLines<'_>,
        linenum: usize,
        file: &mut ParsedDiffFile,
    ) -> Result<usize, DiffParserError> {
        generic_diff_header(lines, linenum, file)
    }

    fn parse_after_headers(
        &self,
        _lines: &DiffLines<'_>,
        linenum: usize,
        _file: &mut ParsedDiffFile,
    ) -> Result<usize, DiffParserError> {
        Ok(linenum)
    }
}

/// Plain unified/context diff dialect; every hook keeps its default.
#[derive(Debug, Default)]
pub struct UnifiedDiffHooks;

impl DiffParserHooks for UnifiedDiffHooks {}

/// Everything extracted from one diff: the per-file records plus any
/// errors hit along the way. Errors never abort the scan; the parser
/// resynchronizes on the next recognizable header.
#[derive(Debug, Default)]
pub struct DiffParseResult {
    pub files: Vec<ParsedDiffFile>,
    pub errors: Vec<DiffParserError>,
}

pub struct DiffParser<'p, H> {
    lines: DiffLines<'p>,
    hooks: H,
}

impl<'p, H: DiffParserHooks> DiffParser<'p, H> {
    pub fn new(data: &'p str, hooks: H) -> Self {
        DiffParser {
            lines: DiffLines::new(data),
            hooks,
        }
    }

    pub fn parse(self) -> DiffParseResult {
        let mut result = DiffParseResult::default();
        let mut i = 0;

        while i < self.lines.len() {
            match self.parse_change_header(i) {
                Ok((next, Some(mut file))) => {
                    file.index = result.files.len();
                    result.files.push(file);
                    i = next;
                }
                Ok((next, None)) if next > i => {
                    // A hook consumed a skipped region (property changes,
                    // empty changesets).
                    i = next;
                }
                Ok(_) => {
                    if let Some(file) = result.files.last_mut() {
                        let line = self.lines.get(i).unwrap_or_default();

                        file.data.push_str(self.lines.raw(i, i + 1));

                        if line.starts_with('+') && !line.starts_with("+++ ") {
                            file.insert_count += 1;
                        } else if line.starts_with('-') && !line.starts_with("--- ") {
                            file.delete_count += 1;
                        } else if line.starts_with("Binary files ")
                            && line.ends_with(" differ")
                        {
                            file.binary = true;
                        }
                    }

                    i += 1;
                }
                Err(error) => {
                    result.errors.push(error);
                    i += 1;
                }
            }
        }

        debug!(
            files = result.files.len(),
            errors = result.errors.len(),
            "parsed diff"
        );

        result
    }

    fn parse_change_header(
        &self,
        start: usize,
    ) -> Result<(usize, Option<ParsedDiffFile>), DiffParserError> {
        let mut file = ParsedDiffFile::default();
        let mut linenum = start;

        linenum = self
            .hooks
            .parse_special_header(&self.lines, linenum, &mut file)?;
        linenum = self
            .hooks
            .parse_diff_header(&self.lines, linenum, &mut file)?;

        if file.skip {
            return Ok((linenum, None));
        }

        if file.has_header_info() {
            linenum = self
                .hooks
                .parse_after_headers(&self.lines, linenum, &mut file)?;

            if file.skip {
                return Ok((linenum, None));
            }

            file.data = self.lines.raw(start, linenum).to_string();

            return Ok((linenum, Some(file)));
        }

        if file.has_partial_header_info() {
            return Err(DiffParserError::new(
                "Unable to parse diff header",
                linenum,
                self.lines.get(linenum).unwrap_or_default(),
            ));
        }

        Ok((linenum, None))
    }
}

/// `Index:` line followed by a full-width separator, as emitted by svn and
/// some CVS clients. Records the indexed path.
pub fn generic_special_header(
    lines: &DiffLines<'_>,
    linenum: usize,
    file: &mut ParsedDiffFile,
) -> Result<usize, DiffParserError> {
    if let Some(line) = lines.get(linenum)
        && let Some(path) = line.strip_prefix("Index: ")
        && let Some(separator) = lines.get(linenum + 1)
        && separator.len() == 67
        && separator.bytes().all(|b| b == b'=')
    {
        file.index_header = Some(path.to_string());
        return Ok(linenum + 2);
    }

    Ok(linenum)
}

/// Unified (`--- `/`+++ `) or context (`*** `/`--- `) filename headers.
pub fn generic_diff_header(
    lines: &DiffLines<'_>,
    linenum: usize,
    file: &mut ParsedDiffFile,
) -> Result<usize, DiffParserError> {
    let (Some(first), Some(second)) = (lines.get(linenum), lines.get(linenum + 1)) else {
        return Ok(linenum);
    };

    let is_unified = first.starts_with("--- ") && second.starts_with("+++ ");
    let is_context = first.starts_with("*** ")
        && second.starts_with("--- ")
        && !first.ends_with(" ****");

    if !is_unified && !is_context {
        return Ok(linenum);
    }

    let (orig_file, orig_info) = parse_filename_header(&first[4..], linenum)?;
    file.orig_file = Some(orig_file);
    file.orig_info = Some(Revision::other(orig_info));

    let (new_file, new_info) = parse_filename_header(&second[4..], linenum + 1)?;
    file.new_file = Some(new_file);
    file.new_info = Some(Revision::other(new_info));

    Ok(linenum + 2)
}

/// Split a filename header payload into `(filename, revision)`.
///
/// Tab-separated is the common case; two-or-more spaces handles diffs whose
/// filenames contain single spaces, and a single space is the last resort.
pub fn parse_filename_header(
    payload: &str,
    linenum: usize,
) -> Result<(String, String), DiffParserError> {
    if let Some((filename, revision)) = payload.split_once('\t') {
        return Ok((filename.to_string(), revision.to_string()));
    }

    if let Some(start) = payload.find("  ") {
        let end = start
            + payload[start..]
                .bytes()
                .take_while(|&b| b == b' ')
                .count();
        return Ok((payload[..start].to_string(), payload[end..].to_string()));
    }

    if let Some((filename, revision)) = payload.split_once(' ') {
        return Ok((filename.to_string(), revision.to_string()));
    }

    Err(DiffParserError::new(
        "The diff file is missing revision information",
        linenum,
        payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(data: &str) -> DiffParseResult {
        DiffParser::new(data, UnifiedDiffHooks).parse()
    }

    const INDEX_SEPARATOR: &str =
        "===================================================================";

    #[rstest]
    fn test_unified_diff_with_index_header() {
        let diff = format!(
            concat!(
                "Index: README\n",
                "{sep}\n",
                "--- README\t(revision 123)\n",
                "+++ README\t(working copy)\n",
                "@@ -1 +1 @@\n",
                "-blah blah\n",
                "+blah!\n",
            ),
            sep = INDEX_SEPARATOR,
        );

        let result = parse(&diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);

        let file = &result.files[0];
        assert_eq!(file.index_header.as_deref(), Some("README"));
        assert_eq!(file.orig_file.as_deref(), Some("README"));
        assert_eq!(file.new_file.as_deref(), Some("README"));
        assert_eq!(file.orig_info, Some(Revision::other("(revision 123)")));
        assert_eq!(file.new_info, Some(Revision::other("(working copy)")));
        assert_eq!(file.insert_count, 1);
        assert_eq!(file.delete_count, 1);
        assert_eq!(file.data, diff);
    }

    #[rstest]
    fn test_line_counts_skip_preamble() {
        let diff = format!(
            concat!(
                "+ This is some line before the change\n",
                "- And another line\n",
                "Index: foo\n",
                "{sep}\n",
                "--- README\t(revision 123)\n",
                "+++ README\t(new)\n",
                "@@ -1,1 +1,1 @@\n",
                "-blah blah\n",
                "-blah\n",
                "+blah!\n",
                "-blah...\n",
                "+blah?\n",
                "-blah!\n",
                "+blah?!\n",
            ),
            sep = INDEX_SEPARATOR,
        );

        let result = parse(&diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].insert_count, 3);
        assert_eq!(result.files[0].delete_count, 4);
    }

    #[rstest]
    fn test_multiple_files_are_indexed() {
        let diff = concat!(
            "--- one\t(revision 1)\n",
            "+++ one\t(revision 2)\n",
            "@@ -1 +1 @@\n",
            "-a\n",
            "+b\n",
            "--- two\t(revision 1)\n",
            "+++ two\t(revision 2)\n",
            "@@ -1 +1 @@\n",
            "-c\n",
            "+d\n",
        );

        let result = parse(diff);

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.files[0].index, 0);
        assert_eq!(result.files[0].orig_file.as_deref(), Some("one"));
        assert_eq!(result.files[1].index, 1);
        assert_eq!(result.files[1].orig_file.as_deref(), Some("two"));
    }

    #[rstest]
    fn test_context_diff_headers() {
        let diff = concat!(
            "*** README\t(revision 123)\n",
            "--- README\t(working copy)\n",
            "***************\n",
            "*** 1 ****\n",
            "! blah blah\n",
            "--- 1 ----\n",
            "! blah!\n",
        );

        let result = parse(diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].orig_file.as_deref(), Some("README"));
        assert_eq!(
            result.files[0].new_info,
            Some(Revision::other("(working copy)"))
        );
    }

    #[rstest]
    #[case("README\t(revision 1)", "README", "(revision 1)")]
    #[case("my file  (revision 1)", "my file", "(revision 1)")]
    #[case("README (revision 1)", "README", "(revision 1)")]
    fn test_parse_filename_header(
        #[case] payload: &str,
        #[case] filename: &str,
        #[case] revision: &str,
    ) {
        assert_eq!(
            parse_filename_header(payload, 0),
            Ok((filename.to_string(), revision.to_string()))
        );
    }

    #[rstest]
    fn test_data_keeps_carriage_return_line_terminators() {
        let diff = concat!(
            "--- README\t(revision 123)\n",
            "+++ README\t(working copy)\n",
            "@@ -1,3 +1,3 @@\n",
            "-one\r\n",
            "+1\r\n",
            " two\n",
            " three\n",
        );

        let result = parse(diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].data, diff);
        assert_eq!(result.files[0].insert_count, 1);
        assert_eq!(result.files[0].delete_count, 1);
    }

    #[rstest]
    fn test_data_without_trailing_newline() {
        let diff = concat!(
            "--- README\t(revision 123)\n",
            "+++ README\t(working copy)\n",
            "@@ -1 +1 @@\n",
            "-old\n",
            "+new",
        );

        let result = parse(diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].data, diff);
    }

    #[rstest]
    fn test_missing_revision_information_is_an_error() {
        let diff = concat!(
            "--- README\n",
            "+++ README\t(working copy)\n",
            "@@ -1 +1 @@\n",
            "-a\n",
            "+b\n",
        );

        let result = parse(diff);

        assert!(result.files.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].message,
            "The diff file is missing revision information"
        );
    }
}
