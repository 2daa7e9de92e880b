//! Intraline and indentation highlighting.
//!
//! Region offsets are logical character positions; HTML entities in markup
//! count as one character. Indentation deltas are serialized into the
//! `&gt;`/`&lt;`/`&mdash;`/`|` marker encoding the renderer styles.

use crate::diff::{SequenceMatcher, Tag};

/// Below this similarity, character-level highlighting of a line pair is
/// noise rather than signal.
const MIN_LINE_RATIO: f64 = 0.6;

pub type ChangedRegions = Vec<(usize, usize)>;

fn leading_indent(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|&(_, c)| c != ' ' && c != '\t')
        .map(|(i, _)| i)
        .unwrap_or(line.len());

    &line[..end]
}

fn indent_width(indent: &str, tab_size: usize) -> usize {
    let mut width = 0;

    for c in indent.chars() {
        if c == '\t' {
            width += tab_size - width % tab_size;
        } else {
            width += 1;
        }
    }

    width
}

/// Classify the leading-whitespace difference of a line pair.
///
/// Returns `(is_indent, raw char count)` for a pure indent or unindent, or
/// `None` when the widths match (including tab-vs-space rewrites of the
/// same width) or the change is not a simple prefix addition.
pub fn get_indentation_change(
    old_line: &str,
    new_line: &str,
    tab_size: usize,
) -> Option<(bool, usize)> {
    let old_indent = leading_indent(old_line);
    let new_indent = leading_indent(new_line);
    let old_width = indent_width(old_indent, tab_size);
    let new_width = indent_width(new_indent, tab_size);

    if old_width == new_width {
        return None;
    }

    if new_width > old_width {
        let mut removed = 0;
        let mut rest = new_indent;

        while !rest.is_empty() && indent_width(rest, tab_size) > old_width {
            rest = &rest[1..];
            removed += 1;
        }

        // The surviving characters must be exactly the old indentation, or
        // this is a rewrite rather than an indent.
        (rest == old_indent).then_some((true, removed))
    } else {
        let mut removed = 0;
        let mut rest = old_indent;

        while !rest.is_empty() && indent_width(rest, tab_size) > new_width {
            rest = &rest[1..];
            removed += 1;
        }

        Some((false, removed))
    }
}

/// Serialize added indentation into visual markers: one `&gt;` per space,
/// tabs as a dash run capped by `&gt;|` sized to the tab stop they reach.
pub fn serialize_indentation(indentation: &str, tab_size: usize) -> String {
    let mut serialized = String::new();
    let mut pos = 0;

    for c in indentation.chars() {
        if c == '\t' {
            let width = tab_size - pos % tab_size;

            match width {
                1 => serialized.push('|'),
                2 => serialized.push_str("&gt;|"),
                _ => {
                    serialized.push_str(&"&mdash;".repeat(width - 2));
                    serialized.push_str("&gt;|");
                }
            }

            pos += width;
        } else {
            serialized.push_str("&gt;");
            pos += 1;
        }
    }

    serialized
}

/// The mirror of [`serialize_indentation`] for removed indentation, with
/// the tab markers leading instead of trailing.
pub fn serialize_unindentation(indentation: &str, tab_size: usize) -> String {
    let mut serialized = String::new();
    let mut pos = 0;

    for c in indentation.chars() {
        if c == '\t' {
            let width = tab_size - pos % tab_size;

            match width {
                1 => serialized.push('|'),
                2 => serialized.push_str("|&lt;"),
                _ => {
                    serialized.push_str("|&lt;");
                    serialized.push_str(&"&mdash;".repeat(width - 2));
                }
            }

            pos += width;
        } else {
            serialized.push_str("&lt;");
            pos += 1;
        }
    }

    serialized
}

/// Wrap the changed indentation of a rendered line pair in
/// `indent`/`unindent` spans, nesting inside any markup already present.
pub fn highlight_indentation(
    old_markup: &str,
    new_markup: &str,
    is_indent: bool,
    raw_indent_len: usize,
    tab_size: usize,
) -> (String, String) {
    if is_indent {
        let new_markup = wrap_indentation_chars(
            new_markup,
            raw_indent_len,
            "indent",
            serialize_indentation,
            tab_size,
        );

        (old_markup.to_string(), new_markup)
    } else {
        let old_markup = wrap_indentation_chars(
            old_markup,
            raw_indent_len,
            "unindent",
            serialize_unindentation,
            tab_size,
        );

        (old_markup, new_markup.to_string())
    }
}

fn wrap_indentation_chars(
    markup: &str,
    raw_indent_len: usize,
    css_class: &str,
    serialize: fn(&str, usize) -> String,
    tab_size: usize,
) -> String {
    // skip leading complete tags
    let mut start = 0;
    while markup[start..].starts_with('<') {
        match markup[start..].find('>') {
            Some(offset) => start += offset + 1,
            None => return markup.to_string(),
        }
    }

    let end = start + raw_indent_len;
    if end > markup.len() || !markup.is_char_boundary(end) {
        return markup.to_string();
    }

    let indentation = &markup[start..end];
    if !indentation.trim().is_empty() {
        return markup.to_string();
    }

    format!(
        "{}<span class=\"{}\">{}</span>{}",
        &markup[..start],
        css_class,
        serialize(indentation, tab_size),
        &markup[end..]
    )
}

/// Character-level changed regions for a replaced line pair, or
/// `(None, None)` when the lines are too dissimilar to highlight.
pub fn get_line_changed_regions(
    old: Option<&str>,
    new: Option<&str>,
) -> (Option<ChangedRegions>, Option<ChangedRegions>) {
    let (Some(old), Some(new)) = (old, new) else {
        return (None, None);
    };

    let a: Vec<char> = old.chars().collect();
    let b: Vec<char> = new.chars().collect();
    let mut matcher = SequenceMatcher::new(&a, &b);

    if matcher.ratio() < MIN_LINE_RATIO {
        return (None, None);
    }

    let mut old_regions: ChangedRegions = Vec::new();
    let mut new_regions: ChangedRegions = Vec::new();

    // A short equal run between two changes reads as one change; carry its
    // width backwards into the next changed region.
    let mut back = (0, 0);

    for op in matcher.get_opcodes() {
        if op.tag == Tag::Equal {
            if op.i2 - op.i1 < 3 || op.j2 - op.j1 < 3 {
                back = (op.i2 - op.i1, op.j2 - op.j1);
            }

            continue;
        }

        append_region(&mut old_regions, &a, op.i1 - back.0, op.i2);
        append_region(&mut new_regions, &b, op.j1 - back.1, op.j2);
        back = (0, 0);
    }

    (Some(old_regions), Some(new_regions))
}

fn append_region(regions: &mut ChangedRegions, chars: &[char], start: usize, end: usize) {
    if let Some(last) = regions.last_mut()
        && start <= last.1
        && last.1 < end
    {
        last.1 = end;
        return;
    }

    let slice = &chars[start..end];
    if !slice.is_empty() && slice.iter().all(|c| c.is_whitespace()) {
        return;
    }

    regions.push((start, end));
}

/// Wrap the in-region characters of rendered line markup in highlight
/// spans. Tags are never split: an embedded tag closes the span, which
/// reopens at the next in-region character.
pub fn highlight_region(markup: &str, regions: Option<&[(usize, usize)]>) -> String {
    let Some(regions) = regions else {
        return markup.to_string();
    };
    if regions.is_empty() {
        return markup.to_string();
    }

    let mut output = String::with_capacity(markup.len() + regions.len() * 32);
    let mut chars = markup.char_indices().peekable();
    let mut pos = 0;
    let mut region_index = 0;
    let mut in_highlight = false;

    while let Some((byte_index, c)) = chars.next() {
        if c == '<' {
            if in_highlight {
                output.push_str("</span>");
                in_highlight = false;
            }

            let end = markup[byte_index..]
                .find('>')
                .map(|offset| byte_index + offset + 1)
                .unwrap_or(markup.len());
            output.push_str(&markup[byte_index..end]);

            while let Some(&(next_index, _)) = chars.peek()
                && next_index < end
            {
                chars.next();
            }

            continue;
        }

        while region_index < regions.len() && pos >= regions[region_index].1 {
            region_index += 1;
        }
        let in_region = region_index < regions.len()
            && pos >= regions[region_index].0
            && pos < regions[region_index].1;

        if in_region && !in_highlight {
            output.push_str("<span class=\"hl\">");
            in_highlight = true;
        } else if !in_region && in_highlight {
            output.push_str("</span>");
            in_highlight = false;
        }

        if c == '&' {
            // entities count as a single logical character
            let end = markup[byte_index..]
                .find(';')
                .map(|offset| byte_index + offset + 1)
                .unwrap_or(byte_index + c.len_utf8());
            output.push_str(&markup[byte_index..end]);

            while let Some(&(next_index, _)) = chars.peek()
                && next_index < end
            {
                chars.next();
            }
        } else {
            output.push(c);
        }

        pos += 1;
    }

    if in_highlight {
        output.push_str("</span>");
    }

    output
}
