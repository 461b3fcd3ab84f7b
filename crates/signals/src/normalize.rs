use crate::language::{CommentStyle, Language};

/// Comment-stripped, whitespace-collapsed line corpus of one file.
///
/// `lines[i]` came from original line `line_numbers[i]` (1-based). Blank and
/// comment-only lines are never present, so `line_numbers` is strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFile {
    pub path: String,
    pub lines: Vec<String>,
    pub line_numbers: Vec<usize>,
}

impl NormalizedFile {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Normalize `content` for text-based analyzers.
pub fn normalize(path: &str, content: &str, language: Language) -> NormalizedFile {
    let stripped = strip_comments(content, language);

    let mut lines = Vec::new();
    let mut line_numbers = Vec::new();
    for (idx, line) in stripped.lines().enumerate() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            continue;
        }
        lines.push(collapsed);
        line_numbers.push(idx + 1);
    }

    NormalizedFile {
        path: path.to_string(),
        lines,
        line_numbers,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str { quote: char, triple: bool },
}

/// Remove comments while keeping every newline, so line numbers never shift.
///
/// String literals are copied verbatim; comment markers inside them are not comments.
pub fn strip_comments(content: &str, language: Language) -> String {
    let style = language.comment_style();
    if style == CommentStyle::None {
        return content.to_string();
    }

    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            State::Code => {
                if style == CommentStyle::CStyle && c == '/' && next == Some('/') {
                    state = State::LineComment;
                    i += 2;
                    continue;
                }
                if style == CommentStyle::CStyle && c == '/' && next == Some('*') {
                    state = State::BlockComment;
                    i += 2;
                    continue;
                }
                if style == CommentStyle::Hash && c == '#' {
                    state = State::LineComment;
                    i += 1;
                    continue;
                }
                if c == '\'' && language == Language::Rust {
                    // Char literal or lifetime; only literals are skipped over.
                    let len = rust_char_literal_len(&chars[i..]);
                    out.extend(&chars[i..i + len]);
                    i += len;
                    continue;
                }
                if is_quote(c, language) {
                    let triple = language == Language::Python
                        && next == Some(c)
                        && chars.get(i + 2).copied() == Some(c);
                    let width = if triple { 3 } else { 1 };
                    out.extend(&chars[i..i + width]);
                    state = State::Str { quote: c, triple };
                    i += width;
                    continue;
                }
                out.push(c);
            }
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Code;
                    i += 2;
                    continue;
                }
                if c == '\n' {
                    out.push('\n');
                }
            }
            State::Str { quote, triple } => {
                if c == '\\' {
                    out.push(c);
                    if let Some(escaped) = next {
                        out.push(escaped);
                    }
                    i += 2;
                    continue;
                }
                if triple {
                    if c == quote
                        && next == Some(quote)
                        && chars.get(i + 2).copied() == Some(quote)
                    {
                        out.extend(&chars[i..i + 3]);
                        state = State::Code;
                        i += 3;
                        continue;
                    }
                } else if c == quote {
                    state = State::Code;
                } else if c == '\n' && quote != '`' && language != Language::Rust {
                    // Unterminated single-line literal.
                    state = State::Code;
                }
                out.push(c);
            }
        }
        i += 1;
    }

    out
}

fn is_quote(c: char, language: Language) -> bool {
    match language {
        Language::Rust => c == '"',
        Language::Python => c == '"' || c == '\'',
        _ => c == '"' || c == '\'' || c == '`',
    }
}

/// Length of a Rust char literal starting at `chars[0] == '\''`, or 1 for a lifetime tick.
fn rust_char_literal_len(chars: &[char]) -> usize {
    match (chars.get(1), chars.get(2)) {
        (Some('\\'), _) => chars
            .iter()
            .skip(3)
            .position(|&c| c == '\'' || c == '\n')
            .filter(|&pos| chars[pos + 3] == '\'')
            .map_or(1, |pos| pos + 4),
        (Some(_), Some('\'')) => 3,
        _ => 1,
    }
}
