//! Placeholder scanner for template strings
//!
//! Splits a string into literal text, `{name}` placeholders and escaped
//! `\{name\}` references. Names are one or more ASCII alphanumerics or `_`;
//! braces around anything else stay literal.

/// A piece of a scanned template string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// Text copied to the output unchanged
    Literal(&'a str),
    /// `{name}`, substituted from parameters
    Variable(&'a str),
    /// `\{name\}`, rendered as `{name}`
    Escaped(&'a str),
}

/// Scan a template string left to right
pub(crate) fn scan(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'{') => {
                let name_start = i + 2;
                let name_end = name_end(bytes, name_start);
                if name_end > name_start
                    && bytes.get(name_end) == Some(&b'\\')
                    && bytes.get(name_end + 1) == Some(&b'}')
                {
                    push_literal(&mut segments, &text[literal_start..i]);
                    segments.push(Segment::Escaped(&text[name_start..name_end]));
                    i = name_end + 2;
                    literal_start = i;
                } else {
                    // A lone `\{` never opens a placeholder
                    i += 2;
                }
            }
            b'{' => {
                let name_start = i + 1;
                let name_end = name_end(bytes, name_start);
                if name_end > name_start && bytes.get(name_end) == Some(&b'}') {
                    push_literal(&mut segments, &text[literal_start..i]);
                    segments.push(Segment::Variable(&text[name_start..name_end]));
                    i = name_end + 1;
                    literal_start = i;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    push_literal(&mut segments, &text[literal_start..]);
    segments
}

/// Names of the unescaped placeholders in `text`, in order of appearance
pub(crate) fn variable_names(text: &str) -> impl Iterator<Item = &str> {
    scan(text).into_iter().filter_map(|segment| match segment {
        Segment::Variable(name) => Some(name),
        _ => None,
    })
}

fn name_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    end
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}
