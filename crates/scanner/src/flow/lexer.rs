//! Turns source text into a flat stream of statements and block delimiters.
//!
//! Two front ends feed the same token stream: a brace lexer (C-like
//! languages, and anything unknown) and an indentation lexer (Python, Ruby).

use crate::language::{BlockStyle, Language};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Stmt { text: String, line: usize },
    Open,
    Close,
}

pub(crate) fn lex(text: &str, language: Language) -> Vec<Token> {
    match language.block_style() {
        BlockStyle::Braces => lex_braces(text, language),
        BlockStyle::Indentation => lex_indentation(text, language),
    }
}

struct StmtBuffer {
    text: String,
    line: usize,
}

impl StmtBuffer {
    fn push(&mut self, c: char, line: usize) {
        if self.text.is_empty() {
            if c.is_whitespace() {
                return;
            }
            self.line = line;
        }
        self.text.push(c);
    }

    fn flush(&mut self, tokens: &mut Vec<Token>) {
        let text = self.text.trim();
        if !text.is_empty() {
            tokens.push(Token::Stmt {
                text: text.to_string(),
                line: self.line,
            });
        }
        self.text.clear();
    }
}

fn lex_braces(text: &str, language: Language) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut buffer = StmtBuffer {
        text: String::new(),
        line: 1,
    };
    let mut chars = text.chars().peekable();
    let mut line = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\n' {
                line += 1;
                if q != '`' {
                    // Unterminated literal: recover at end of line.
                    quote = None;
                    buffer.flush(&mut tokens);
                    continue;
                }
            }
            buffer.push(c, line);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\n' => {
                buffer.flush(&mut tokens);
                line += 1;
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        buffer.flush(&mut tokens);
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '"' | '`' => {
                quote = Some(c);
                buffer.push(c, line);
            }
            '\'' if language.single_quote_strings() => {
                quote = Some(c);
                buffer.push(c, line);
            }
            '{' => {
                buffer.flush(&mut tokens);
                tokens.push(Token::Open);
            }
            '}' => {
                buffer.flush(&mut tokens);
                tokens.push(Token::Close);
            }
            ';' => buffer.flush(&mut tokens),
            _ => buffer.push(c, line),
        }
    }
    buffer.flush(&mut tokens);
    tokens
}

struct LogicalLine {
    indent: usize,
    text: String,
    line: usize,
}

fn lex_indentation(text: &str, language: Language) -> Vec<Token> {
    let lines = logical_lines(text, language);
    let mut tokens = Vec::new();
    let mut stack: Vec<usize> = vec![0];

    for (idx, logical) in lines.iter().enumerate() {
        while stack.len() > 1 && logical.indent < stack[stack.len() - 1] {
            stack.pop();
            tokens.push(Token::Close);
        }

        match split_inline_header(&logical.text) {
            Some((header, body)) => {
                tokens.push(Token::Stmt {
                    text: header.to_string(),
                    line: logical.line,
                });
                tokens.push(Token::Open);
                tokens.push(Token::Stmt {
                    text: body.to_string(),
                    line: logical.line,
                });
                tokens.push(Token::Close);
            }
            None => {
                tokens.push(Token::Stmt {
                    text: strip_header_colon(&logical.text).to_string(),
                    line: logical.line,
                });
            }
        }

        let opens_block = lines
            .get(idx + 1)
            .is_some_and(|next| next.indent > logical.indent);
        if opens_block {
            stack.push(lines[idx + 1].indent);
            tokens.push(Token::Open);
        }
    }

    for _ in 1..stack.len() {
        tokens.push(Token::Close);
    }
    tokens
}

/// Physical lines joined across open brackets and `\` continuations, with
/// comments, blank lines, docstrings and Ruby `end` markers removed.
fn logical_lines(text: &str, language: Language) -> Vec<LogicalLine> {
    let comment = language.line_comment();
    let mut out: Vec<LogicalLine> = Vec::new();
    let mut pending: Option<LogicalLine> = None;
    let mut depth: i32 = 0;
    let mut in_docstring: Option<&str> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(delim) = in_docstring {
            if raw.contains(delim) {
                in_docstring = None;
            }
            continue;
        }

        let trimmed = raw.trim();
        if let Some(delim) = ["\"\"\"", "'''"].into_iter().find(|d| trimmed.starts_with(d)) {
            if trimmed.matches(delim).count() < 2 {
                in_docstring = Some(delim);
            }
            continue;
        }

        let content = strip_comment(raw, comment);
        let content_trimmed = content.trim();
        if content_trimmed.is_empty() {
            continue;
        }
        if language == Language::Ruby && content_trimmed == "end" {
            continue;
        }

        depth += bracket_delta(content_trimmed);
        let continues = depth > 0 || content_trimmed.ends_with('\\');
        let piece = content_trimmed.trim_end_matches('\\').trim_end();

        match pending.as_mut() {
            Some(current) => {
                current.text.push(' ');
                current.text.push_str(piece);
            }
            None => {
                pending = Some(LogicalLine {
                    indent: indent_width(raw),
                    text: piece.to_string(),
                    line: line_no,
                });
            }
        }

        if !continues {
            depth = 0;
            if let Some(done) = pending.take() {
                out.push(done);
            }
        }
    }
    if let Some(done) = pending.take() {
        out.push(done);
    }
    out
}

fn indent_width(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn strip_comment<'a>(raw: &'a str, comment: &str) -> &'a str {
    let mut quote: Option<char> = None;
    for (idx, c) in raw.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if raw[idx..].starts_with(comment) => return &raw[..idx],
            None => {}
        }
    }
    raw
}

fn bracket_delta(text: &str) -> i32 {
    let mut delta = 0;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' | '{' => delta += 1,
                ')' | ']' | '}' => delta -= 1,
                _ => {}
            },
        }
    }
    delta
}

const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "def", "class",
    "match", "case", "async",
];

/// `if x: return y` → (`if x`, `return y`)
fn split_inline_header(text: &str) -> Option<(&str, &str)> {
    let first = text.split(|c: char| !c.is_alphanumeric() && c != '_').next()?;
    if !COMPOUND_KEYWORDS.contains(&first) {
        return None;
    }
    let colon = top_level_colon(text)?;
    let header = text[..colon].trim();
    let body = text[colon + 1..].trim();
    if body.is_empty() {
        return None;
    }
    Some((header, body))
}

fn top_level_colon(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (idx, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ':' if depth == 0 => return Some(idx),
                _ => {}
            },
        }
    }
    None
}

fn strip_header_colon(text: &str) -> &str {
    text.strip_suffix(':').map(str::trim_end).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stmt(text: &str, line: usize) -> Token {
        Token::Stmt {
            text: text.to_string(),
            line,
        }
    }

    #[test]
    fn braces_split_else_chains() {
        let tokens = lex("if (x) { A() } else { B() }\nC()", Language::JavaScript);
        assert_eq!(
            tokens,
            vec![
                stmt("if (x)", 1),
                Token::Open,
                stmt("A()", 1),
                Token::Close,
                stmt("else", 1),
                Token::Open,
                stmt("B()", 1),
                Token::Close,
                stmt("C()", 2),
            ]
        );
    }

    #[test]
    fn braces_ignore_comments_and_strings() {
        let tokens = lex(
            "// if (a) {\nlet s = \"{not a block}\"; /* } */\nrun();",
            Language::JavaScript,
        );
        assert_eq!(
            tokens,
            vec![stmt("let s = \"{not a block}\"", 2), stmt("run()", 3)]
        );
    }

    #[test]
    fn rust_lifetimes_are_not_strings() {
        let tokens = lex("fn f<'a>(x: &'a str) {\n    g(x);\n}", Language::Rust);
        assert_eq!(
            tokens,
            vec![
                stmt("fn f<'a>(x: &'a str)", 1),
                Token::Open,
                stmt("g(x)", 2),
                Token::Close,
            ]
        );
    }

    #[test]
    fn indentation_opens_and_closes_blocks() {
        let text = "def f(x):\n    \"\"\"Doc.\"\"\"\n    if x:  # check\n        a()\n    else:\n        b()\nc()\n";
        let tokens = lex(text, Language::Python);
        assert_eq!(
            tokens,
            vec![
                stmt("def f(x)", 1),
                Token::Open,
                stmt("if x", 3),
                Token::Open,
                stmt("a()", 4),
                Token::Close,
                stmt("else", 5),
                Token::Open,
                stmt("b()", 6),
                Token::Close,
                Token::Close,
                stmt("c()", 7),
            ]
        );
    }

    #[test]
    fn inline_headers_and_continuations() {
        let text = "if ready: go()\nvalue = call(\n    1,\n    2)\n";
        let tokens = lex(text, Language::Python);
        assert_eq!(
            tokens,
            vec![
                stmt("if ready", 1),
                Token::Open,
                stmt("go()", 1),
                Token::Close,
                stmt("value = call( 1, 2)", 2),
            ]
        );
    }
}
