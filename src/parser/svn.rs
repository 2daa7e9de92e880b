//! Subversion diff dialect
//!
//! svn diffs wrap the generic unified format in `Index:` sections, localize
//! the revision word in filename headers, and append property-change
//! sections that carry no file content. Property-only sections are skipped;
//! revision strings are normalized into [`Revision`] values.

use crate::errors::DiffParserError;
use crate::parser::revision::Revision;
use crate::parser::{
    DiffLines, DiffParserHooks, ParsedDiffFile, generic_diff_header, generic_special_header,
};
use regex::Regex;

const BINARY_STRING: &str = "Cannot display: file marked as a binary type.";

/// Revision portion of an svn filename header. Group 2 captures relocation
/// info from branch-to-branch diffs, group 3 the revision number. svnlook
/// prefixes a timestamp; localized clients swap out the revision word.
const SVN_REVISION_PATTERN: &str = r"(?x)
    ^(\(([^\)]+)\)\ )?
    (?:\d+-\d+-\d+\ +
       \d+:\d+:\d+\ +
       [A-Z]+\ +)?
    \(?(?:
        [Rr]ev(?:ision)?|
        revisión:|
        révision|
        revisione|
        リビジョン|
        리비전|
        revisjon|
        wersja|
        revisão|
        版本
    )\ (\d+)\)?$
";

#[derive(Debug, Default)]
pub struct SvnDiffHooks;

impl DiffParserHooks for SvnDiffHooks {
    fn parse_special_header(
        &self,
        lines: &DiffLines<'_>,
        linenum: usize,
        file: &mut ParsedDiffFile,
    ) -> Result<usize, DiffParserError> {
        // A bare Index: line (no path) shows up for newly added empty
        // files; skip it and its separator.
        if lines.get(linenum) == Some("Index:") {
            return Ok(linenum + 2);
        }

        let next = generic_special_header(lines, linenum, file)?;

        if next != linenum
            && let Some(path) = file.index_header.clone()
            && lines.get(next) == Some(BINARY_STRING)
        {
            // Binary files get no filename headers at all; synthesize the
            // record from the Index: path.
            file.binary = true;
            file.orig_file = Some(path.clone());
            file.new_file = Some(path);
            file.orig_info = Some(Revision::Unknown);
            file.new_info = Some(Revision::Head);

            return Ok(next + 2);
        }

        Ok(next)
    }

    fn parse_diff_header(
        &self,
        lines: &DiffLines<'_>,
        linenum: usize,
        file: &mut ParsedDiffFile,
    ) -> Result<usize, DiffParserError> {
        // Old-style property changes masquerade as filename headers.
        if lines
            .get(linenum)
            .is_some_and(|line| line.starts_with("--- ("))
            && lines
                .get(linenum + 1)
                .is_some_and(|line| line.starts_with("+++ ("))
            && lines
                .get(linenum + 2)
                .is_some_and(|line| line.starts_with("Property changes on:"))
        {
            file.skip = true;
            return Ok(linenum + 4);
        }

        let next = generic_diff_header(lines, linenum, file)?;

        if next != linenum {
            normalize_revision(
                &mut file.orig_file,
                &mut file.orig_info,
                linenum,
                lines.get(linenum).unwrap_or_default(),
            )?;
            normalize_revision(
                &mut file.new_file,
                &mut file.new_info,
                linenum + 1,
                lines.get(linenum + 1).unwrap_or_default(),
            )?;
        }

        Ok(next)
    }

    fn parse_after_headers(
        &self,
        lines: &DiffLines<'_>,
        linenum: usize,
        file: &mut ParsedDiffFile,
    ) -> Result<usize, DiffParserError> {
        if lines.get(linenum) == Some("")
            && lines
                .get(linenum + 1)
                .is_some_and(|line| line.starts_with("Property changes on:"))
        {
            file.skip = true;
            return Ok(linenum + 3);
        }

        Ok(linenum)
    }
}

fn normalize_revision(
    filename: &mut Option<String>,
    info: &mut Option<Revision>,
    linenum: usize,
    line: &str,
) -> Result<(), DiffParserError> {
    if let (Some(name), Some(Revision::Other(raw))) = (filename.clone(), info.clone()) {
        let (parsed_name, revision) = parse_svn_revision(&name, &raw, linenum, line)?;
        *filename = Some(parsed_name);
        *info = Some(revision);
    }

    Ok(())
}

/// Resolve an svn revision string, relocating `filename` when the header
/// carries branch relocation info.
pub fn parse_svn_revision(
    filename: &str,
    revision: &str,
    linenum: usize,
    line: &str,
) -> Result<(String, Revision), DiffParserError> {
    let revision = revision.trim();

    match revision {
        "(working copy)" => return Ok((filename.to_string(), Revision::Head)),
        "(revision )" | "(nonexistent)" => {
            return Ok((filename.to_string(), Revision::PreCreation));
        }
        "(unknown)" => return Ok((filename.to_string(), Revision::Unknown)),
        _ => {}
    }

    let revision_re = Regex::new(SVN_REVISION_PATTERN).map_err(|_| {
        DiffParserError::new("Unable to parse diff revision header", linenum, line)
    })?;

    let Some(captures) = revision_re.captures(revision) else {
        return Err(DiffParserError::new(
            "Unable to parse diff revision header",
            linenum,
            line,
        ));
    };

    let number = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
    let parsed = if number == "0" {
        Revision::PreCreation
    } else {
        Revision::other(number)
    };

    let mut filename = filename.to_string();

    if let Some(relocated) = captures.get(2) {
        let Some(rest) = relocated.as_str().strip_prefix("...") else {
            return Err(DiffParserError::new(
                "Unable to parse diff revision header",
                linenum,
                line,
            ));
        };
        let rest = rest.strip_prefix('/').unwrap_or(rest);

        if !rest.is_empty() {
            filename = format!("{rest}/{filename}");
        }
    }

    Ok((filename, parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{DiffParseResult, DiffParser};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const INDEX_SEPARATOR: &str =
        "===================================================================";

    fn parse(data: &str) -> DiffParseResult {
        DiffParser::new(data, SvnDiffHooks).parse()
    }

    fn revision(value: &str) -> Result<(String, Revision), DiffParserError> {
        parse_svn_revision("README", value, 0, "")
    }

    #[rstest]
    #[case("(revision 123)", Revision::other("123"))]
    #[case("(working copy)", Revision::Head)]
    #[case("(revision )", Revision::PreCreation)]
    #[case("(revision 0)", Revision::PreCreation)]
    #[case("(nonexistent)", Revision::PreCreation)]
    #[case("(unknown)", Revision::Unknown)]
    #[case("2007-06-06 15:32:23 UTC (rev 10)", Revision::other("10"))]
    #[case("(リビジョン 5)", Revision::other("5"))]
    #[case("(revisión: 5)", Revision::other("5"))]
    #[case("(版本 8)", Revision::other("8"))]
    fn test_parse_svn_revision(#[case] raw: &str, #[case] expected: Revision) {
        assert_eq!(revision(raw), Ok(("README".to_string(), expected)));
    }

    #[rstest]
    fn test_relocation_information_rewrites_filename() {
        assert_eq!(
            parse_svn_revision("binfile", "(.../trunk) (revision 9)", 0, ""),
            Ok(("trunk/binfile".to_string(), Revision::other("9")))
        );
    }

    #[rstest]
    fn test_unparsable_revision_is_an_error() {
        assert!(revision("(something else)").is_err());
    }

    #[rstest]
    fn test_revisions_are_normalized_in_headers() {
        let diff = format!(
            concat!(
                "Index: README\n",
                "{sep}\n",
                "--- README\t(revision 123)\n",
                "+++ README\t(working copy)\n",
                "@@ -1 +1 @@\n",
                "-old\n",
                "+new\n",
            ),
            sep = INDEX_SEPARATOR,
        );

        let result = parse(&diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].orig_info, Some(Revision::other("123")));
        assert_eq!(result.files[0].new_info, Some(Revision::Head));
    }

    #[rstest]
    fn test_old_style_property_change_is_skipped() {
        let diff = format!(
            concat!(
                "Index: README\n",
                "{sep}\n",
                "--- README\t(revision 123)\n",
                "+++ README\t(working copy)\n",
                "@@ -1 +1 @@\n",
                "-old\n",
                "+new\n",
                "--- (revision 123)\n",
                "+++ (working copy)\n",
                "Property changes on: .\n",
                "{underscores}\n",
                "Name: svn:ignore\n",
                "   + build\n",
            ),
            sep = INDEX_SEPARATOR,
            underscores = "_".repeat(67),
        );

        let result = parse(&diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].orig_file.as_deref(), Some("README"));
    }

    #[rstest]
    fn test_property_only_change_is_skipped() {
        let diff = format!(
            concat!(
                "Index: first\n",
                "{sep}\n",
                "--- first\t(revision 5)\n",
                "+++ first\t(working copy)\n",
                "\n",
                "Property changes on: first\n",
                "{underscores}\n",
                "Added: svn:keywords\n",
                "Index: second\n",
                "{sep}\n",
                "--- second\t(revision 5)\n",
                "+++ second\t(working copy)\n",
                "@@ -1 +1 @@\n",
                "-old\n",
                "+new\n",
            ),
            sep = INDEX_SEPARATOR,
            underscores = "_".repeat(67),
        );

        let result = parse(&diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].orig_file.as_deref(), Some("second"));
    }

    #[rstest]
    fn test_binary_file_record_from_index_header() {
        let diff = format!(
            concat!(
                "Index: logo.png\n",
                "{sep}\n",
                "Cannot display: file marked as a binary type.\n",
                "svn:mime-type = application/octet-stream\n",
            ),
            sep = INDEX_SEPARATOR,
        );

        let result = parse(&diff);

        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);

        let file = &result.files[0];
        assert!(file.binary);
        assert_eq!(file.orig_file.as_deref(), Some("logo.png"));
        assert_eq!(file.new_file.as_deref(), Some("logo.png"));
        assert_eq!(file.orig_info, Some(Revision::Unknown));
        assert_eq!(file.new_info, Some(Revision::Head));
    }
}
