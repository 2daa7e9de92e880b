//! In-memory patch application
//!
//! Applies a unified diff to original file content without touching disk.
//! The diff and the original file may use different newline conventions;
//! the output always follows the original file's convention, and a missing
//! newline at end of file survives the round trip.

use crate::errors::PatchError;
use bytes::Bytes;
use tracing::debug;

/// Apply `diff` to `orig`, returning the patched content.
///
/// An empty diff returns the original unchanged, byte for byte. `filename`
/// is only used in error reporting.
pub fn patch(diff: &[u8], orig: &[u8], filename: &str) -> Result<Bytes, PatchError> {
    if diff.is_empty() {
        return Ok(Bytes::copy_from_slice(orig));
    }

    let diff_text = str::from_utf8(diff).map_err(|_| PatchError::InvalidEncoding {
        filename: filename.to_string(),
    })?;
    let orig_text = str::from_utf8(orig).map_err(|_| PatchError::InvalidEncoding {
        filename: filename.to_string(),
    })?;

    let diff_newline = detect_newline(diff_text);
    let orig_newline = detect_newline(orig_text);

    let (diff_lines, _) = split_lines(diff_text, diff_newline);
    let (orig_lines, orig_trailing) = split_lines(orig_text, orig_newline);

    let mut output: Vec<&str> = Vec::new();
    let mut cursor = 0usize;
    let mut hunks_applied = 0usize;
    let mut no_newline_at_end = false;

    let mut i = 0;
    while i < diff_lines.len() {
        let header = diff_lines[i];

        if !header.starts_with("@@ ") {
            i += 1;
            continue;
        }

        let Some((old_start, old_len, _, new_len)) = parse_hunk_header(header) else {
            return Err(PatchError::MalformedHunk {
                filename: filename.to_string(),
                linenum: i,
                line: header.to_string(),
            });
        };

        let (body, next) = collect_hunk_body(&diff_lines, i + 1, old_len, new_len);

        // A zero-length old side addresses the gap after `old_start`
        // rather than a line.
        let target = if old_len == 0 {
            old_start
        } else {
            old_start.saturating_sub(1)
        };

        let expected: Vec<&str> = body
            .iter()
            .filter(|line| !line.starts_with('+') && !line.starts_with('\\'))
            .map(|line| hunk_line_content(line))
            .collect();

        let pos = locate_hunk(&orig_lines, &expected, target.max(cursor), cursor)
            .ok_or_else(|| PatchError::HunkMismatch {
                filename: filename.to_string(),
                hunk_header: header.to_string(),
                expected: expected.join("\n"),
                found: orig_lines
                    [target.min(orig_lines.len())..(target + expected.len()).min(orig_lines.len())]
                    .join("\n"),
            })?;

        output.extend_from_slice(&orig_lines[cursor..pos]);
        cursor = pos;

        let mut last_emitted_new_side = false;

        for line in &body {
            match line.bytes().next() {
                Some(b'+') => {
                    output.push(hunk_line_content(line));
                    last_emitted_new_side = true;
                }
                Some(b'-') => {
                    cursor += 1;
                    last_emitted_new_side = false;
                }
                Some(b'\\') => {
                    if last_emitted_new_side {
                        no_newline_at_end = true;
                    }
                }
                _ => {
                    // Context lines come from the original so stray
                    // carriage returns survive untouched.
                    output.push(orig_lines[cursor]);
                    cursor += 1;
                    last_emitted_new_side = true;
                }
            }
        }

        hunks_applied += 1;
        i = next;
    }

    if hunks_applied == 0 {
        return Ok(Bytes::copy_from_slice(orig));
    }

    let copied_tail = cursor < orig_lines.len();
    output.extend_from_slice(&orig_lines[cursor..]);

    let final_newline = if copied_tail {
        orig_trailing
    } else {
        !no_newline_at_end
    };

    debug!(
        filename,
        hunks = hunks_applied,
        lines = output.len(),
        "applied patch"
    );

    let mut patched = output.join(orig_newline);
    if final_newline && !output.is_empty() {
        patched.push_str(orig_newline);
    }

    Ok(Bytes::from(patched))
}

/// Dominant newline convention, defaulting to LF.
fn detect_newline(text: &str) -> &'static str {
    let crlf = text.matches("\r\n").count();
    let lf = text.matches('\n').count() - crlf;
    let cr = text.matches('\r').count() - crlf;

    if crlf > 0 && crlf >= lf && crlf >= cr {
        "\r\n"
    } else if cr > lf {
        "\r"
    } else {
        "\n"
    }
}

/// Split by the given convention. LF content keeps stray carriage returns
/// inside lines; CRLF content is stripped of them.
fn split_lines<'t>(text: &'t str, newline: &str) -> (Vec<&'t str>, bool) {
    if text.is_empty() {
        return (Vec::new(), false);
    }

    let trailing = text.ends_with(newline);
    let body = if trailing {
        &text[..text.len() - newline.len()]
    } else {
        text
    };

    let lines = match newline {
        "\r\n" => body
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect(),
        "\r" => body.split('\r').collect(),
        _ => body.split('\n').collect(),
    };

    (lines, trailing)
}

/// `@@ -start[,len] +start[,len] @@`; a missing length means 1.
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@ -")?;
    let (old_part, rest) = rest.split_once(" +")?;
    let (new_part, _) = rest.split_once(" @@")?;

    let (old_start, old_len) = parse_hunk_range(old_part)?;
    let (new_start, new_len) = parse_hunk_range(new_part)?;

    Some((old_start, old_len, new_start, new_len))
}

fn parse_hunk_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Consume body lines until both side counts are satisfied, plus any
/// trailing no-newline marker.
fn collect_hunk_body<'t>(
    lines: &[&'t str],
    start: usize,
    old_len: usize,
    new_len: usize,
) -> (Vec<&'t str>, usize) {
    let mut old_remaining = old_len;
    let mut new_remaining = new_len;
    let mut body = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let line = lines[i];

        match line.bytes().next() {
            Some(b'-') if old_remaining > 0 => old_remaining -= 1,
            Some(b'+') if new_remaining > 0 => new_remaining -= 1,
            Some(b'\\') => {}
            Some(b' ') | None if old_remaining > 0 && new_remaining > 0 => {
                old_remaining -= 1;
                new_remaining -= 1;
            }
            _ => break,
        }

        body.push(line);
        i += 1;
    }

    (body, i)
}

/// Hunk body lines may drop the leading space on blank context lines.
fn hunk_line_content(line: &str) -> &str {
    if line.is_empty() { line } else { &line[1..] }
}

/// Try the header's position first, then drift forward. Never moves
/// backwards past already-patched content.
fn locate_hunk(
    orig_lines: &[&str],
    expected: &[&str],
    target: usize,
    cursor: usize,
) -> Option<usize> {
    let matches = |pos: usize| {
        pos + expected.len() <= orig_lines.len()
            && expected
                .iter()
                .zip(&orig_lines[pos..])
                .all(|(want, have)| want == have)
    };

    if matches(target) {
        return Some(target);
    }

    let limit = orig_lines.len().checked_sub(expected.len())?;
    (cursor..=limit).find(|&pos| matches(pos))
}
