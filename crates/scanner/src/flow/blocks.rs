//! Block-structure recovery over the token stream.
//!
//! This is a heuristic, keyword-driven reading of the statement stream, not a
//! grammar: anything unrecognized followed by a block becomes a [`Block::Group`]
//! and anything else a [`Block::Simple`].

use super::lexer::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stmt {
    pub text: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Case {
    pub header: Stmt,
    pub body: Vec<Block>,
    /// Catch-all arm (`default`, `_`, `else`)
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block {
    Simple {
        stmt: Stmt,
        terminal: bool,
    },
    If {
        cond: Stmt,
        then: Vec<Block>,
        otherwise: Option<Vec<Block>>,
    },
    Loop {
        header: Stmt,
        body: Vec<Block>,
    },
    Try {
        header: Stmt,
        body: Vec<Block>,
        handlers: Vec<Case>,
        finally: Option<Vec<Block>>,
    },
    Switch {
        header: Stmt,
        preamble: Vec<Block>,
        cases: Vec<Case>,
    },
    Group {
        header: Stmt,
        body: Vec<Block>,
    },
}

const LOOP_KEYWORDS: &[&str] = &["for", "foreach", "while", "loop", "do", "until", "repeat"];
const IF_KEYWORDS: &[&str] = &["if", "unless"];
const TRY_KEYWORDS: &[&str] = &["try", "begin"];
const HANDLER_KEYWORDS: &[&str] = &["catch", "except", "rescue"];
const FINALLY_KEYWORDS: &[&str] = &["finally", "ensure"];
const SWITCH_KEYWORDS: &[&str] = &["switch", "match", "select", "case", "when"];
const CASE_KEYWORDS: &[&str] = &["case", "default", "when"];
const ELSE_IF_PREFIXES: &[&str] = &["else if", "elif", "elsif", "elseif"];
const TERMINAL_PREFIXES: &[&str] = &[
    "return",
    "raise",
    "throw",
    "exit",
    "abort",
    "panic!",
    "unreachable!",
    "sys.exit",
    "process.exit",
    "os.Exit",
    "System.exit",
];

/// Block tree of `tokens`, or `None` when nesting exceeds `max_depth`
pub(crate) fn parse(tokens: &[Token], max_depth: usize) -> Option<Vec<Block>> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        too_deep: false,
    };
    let mut blocks = Vec::new();
    while parser.pos < tokens.len() {
        blocks.extend(parser.sequence());
        // Unbalanced closing brace at top level: skip it and keep going.
        if parser.peek_close() {
            parser.pos += 1;
        }
    }
    if parser.too_deep {
        return None;
    }
    Some(blocks)
}

/// First word of a statement, ignoring a leading `async`/`await`
pub(crate) fn keyword(text: &str) -> &str {
    let mut rest = text.trim_start();
    for prefix in ["async ", "await "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped.trim_start();
        }
    }
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    &rest[..end]
}

fn is_terminal(text: &str) -> bool {
    TERMINAL_PREFIXES.iter().any(|prefix| {
        text.strip_prefix(prefix).is_some_and(|rest| {
            rest.is_empty() || !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_')
        })
    })
}

fn is_noise(text: &str) -> bool {
    !text.chars().any(char::is_alphanumeric)
}

fn is_default_arm(header: &str) -> bool {
    matches!(header.trim(), "default" | "_" | "else" | "case _") || keyword(header) == "default"
}

fn is_case_header(text: &str) -> bool {
    CASE_KEYWORDS.contains(&keyword(text)) || arm_arrow(text).is_some()
}

/// Byte offset and width of a match-arm arrow (`=>`, ` -> `) outside brackets
fn arm_arrow(text: &str) -> Option<(usize, usize)> {
    let mut depth = 0i32;
    for (idx, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '=' if depth == 0 && text[idx..].starts_with("=>") => return Some((idx, 2)),
            ' ' if depth == 0 && text[idx..].starts_with(" -> ") => return Some((idx, 4)),
            _ => {}
        }
    }
    None
}

/// `case 1: run()` → (`case 1`, `run()`); `Some(x) => go(x),` → (`Some(x)`, `go(x)`)
fn split_case_header(stmt: &Stmt) -> (Stmt, Option<Stmt>) {
    let text = stmt.text.as_str();
    let split = arm_arrow(text).or_else(|| single_colon(text).map(|idx| (idx, 1)));

    let Some((idx, width)) = split else {
        return (stmt.clone(), None);
    };
    let header = text[..idx].trim();
    let body = text[idx + width..].trim().trim_end_matches(',').trim();
    let header = Stmt {
        text: header.to_string(),
        line: stmt.line,
    };
    if body.is_empty() || is_noise(body) {
        (header, None)
    } else {
        (
            header,
            Some(Stmt {
                text: body.to_string(),
                line: stmt.line,
            }),
        )
    }
}

/// Index of the first `:` that is not part of `::`
fn single_colon(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&idx| {
        bytes[idx] == b':'
            && bytes.get(idx + 1) != Some(&b':')
            && (idx == 0 || bytes[idx - 1] != b':')
    })
}

/// `if (x) return y` → (`if (x)`, `return y`)
fn split_paren_header(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    if !text[..open].trim().chars().all(|c| c.is_alphanumeric() || c == '_' || c == ' ') {
        return None;
    }
    let mut depth = 0i32;
    for (idx, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let rest = text[idx + 1..].trim();
                    if rest.is_empty() {
                        return None;
                    }
                    return Some((&text[..=idx], rest));
                }
            }
            _ => {}
        }
    }
    None
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
    too_deep: bool,
}

impl Parser<'_> {
    /// Run `f` one nesting level down. Past `max_depth` the rest of the
    /// input is abandoned and the parse reports failure.
    fn descend<T: Default>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        if self.depth >= self.max_depth {
            self.too_deep = true;
            self.pos = self.tokens.len();
            return T::default();
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn peek_close(&self) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Close))
    }

    fn peek_open(&self) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Open))
    }

    fn peek_text(&self) -> Option<(&str, usize)> {
        match self.tokens.get(self.pos) {
            Some(Token::Stmt { text, line }) => Some((text.as_str(), *line)),
            _ => None,
        }
    }

    /// Blocks up to (not including) the next unmatched `Close`
    fn sequence(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while self.pos < self.tokens.len() && !self.peek_close() {
            if self.peek_open() {
                // Bare block: inline its content.
                self.pos += 1;
                let inner = self.descend(|parser| parser.sequence());
                self.expect_close();
                blocks.extend(inner);
                continue;
            }
            if let Some(block) = self.item() {
                blocks.push(block);
            }
        }
        blocks
    }

    fn expect_close(&mut self) {
        if self.peek_close() {
            self.pos += 1;
        }
    }

    /// `{ ... }` if one follows, else a single following statement when the
    /// header allows it (`if (x)\n  return;`), else nothing
    fn body(&mut self, allow_single: bool) -> Vec<Block> {
        self.descend(|parser| parser.body_inner(allow_single))
    }

    fn body_inner(&mut self, allow_single: bool) -> Vec<Block> {
        if self.peek_open() {
            self.pos += 1;
            let body = self.sequence();
            self.expect_close();
            return body;
        }
        if allow_single {
            if let Some((text, _)) = self.peek_text() {
                if !is_continuation(text) {
                    return self.item().into_iter().collect();
                }
            }
        }
        Vec::new()
    }

    fn take_stmt(&mut self) -> Option<Stmt> {
        let (text, line) = self.peek_text()?;
        let stmt = Stmt {
            text: text.to_string(),
            line,
        };
        self.pos += 1;
        Some(stmt)
    }

    fn item(&mut self) -> Option<Block> {
        let stmt = self.take_stmt()?;
        if is_noise(&stmt.text) {
            return None;
        }
        let kw = keyword(&stmt.text);

        if IF_KEYWORDS.contains(&kw) {
            return Some(self.if_block(stmt));
        }
        if LOOP_KEYWORDS.contains(&kw) {
            return Some(self.loop_block(stmt));
        }
        if TRY_KEYWORDS.contains(&kw) && (self.peek_open() || stmt.text.trim() == kw) {
            return Some(self.try_block(stmt));
        }
        if (SWITCH_KEYWORDS.contains(&kw) && kw != "when") || (kw == "when" && self.peek_open()) {
            if let Some(block) = self.switch_block(stmt.clone()) {
                return Some(block);
            }
        }
        if self.peek_open() {
            let body = self.body(false);
            return Some(Block::Group { header: stmt, body });
        }

        let terminal = is_terminal(&stmt.text);
        Some(Block::Simple { stmt, terminal })
    }

    fn if_block(&mut self, stmt: Stmt) -> Block {
        let inline = if self.peek_open() {
            None
        } else {
            split_paren_header(&stmt.text).map(|(cond, rest)| (cond.to_string(), rest.to_string()))
        };
        let (cond, then) = match inline {
            Some((cond, rest)) => {
                let terminal = is_terminal(&rest);
                let line = stmt.line;
                (
                    Stmt { text: cond, line },
                    vec![Block::Simple {
                        stmt: Stmt { text: rest, line },
                        terminal,
                    }],
                )
            }
            None => {
                let then = self.body(true);
                (stmt, then)
            }
        };
        let otherwise = self.else_branch();
        Block::If {
            cond,
            then,
            otherwise,
        }
    }

    fn else_branch(&mut self) -> Option<Vec<Block>> {
        let (text, line) = self.peek_text()?;
        let text = text.trim();

        if let Some(prefix) = ELSE_IF_PREFIXES.iter().find(|p| starts_with_word(text, p)) {
            let cond = Stmt {
                text: format!("if{}", &text[prefix.len()..]),
                line,
            };
            self.pos += 1;
            return Some(self.descend(|parser| vec![parser.if_block(cond)]));
        }

        if keyword(text) != "else" {
            return None;
        }
        let rest = text["else".len()..]
            .trim()
            .trim_start_matches(':')
            .trim()
            .to_string();
        self.pos += 1;
        if rest.is_empty() {
            return Some(self.body(true));
        }
        let stmt = Stmt { text: rest, line };
        let terminal = is_terminal(&stmt.text);
        Some(vec![Block::Simple { stmt, terminal }])
    }

    fn loop_block(&mut self, header: Stmt) -> Block {
        let is_do = keyword(&header.text) == "do";
        let body = self.body(true);
        if !is_do {
            return Block::Loop { header, body };
        }
        // do { ... } while (cond)
        let mut header = header;
        if let Some((text, _)) = self.peek_text() {
            if matches!(keyword(text), "while" | "until") && !self.next_is_open(1) {
                header.text = format!("do {}", text.trim());
                self.pos += 1;
            }
        }
        Block::Loop { header, body }
    }

    fn next_is_open(&self, offset: usize) -> bool {
        matches!(self.tokens.get(self.pos + offset), Some(Token::Open))
    }

    fn try_block(&mut self, header: Stmt) -> Block {
        let body = self.body(false);
        let mut handlers = Vec::new();
        let mut finally = None;

        while let Some((text, _)) = self.peek_text() {
            let kw = keyword(text);
            if HANDLER_KEYWORDS.contains(&kw) {
                let Some(stmt) = self.take_stmt() else { break };
                let body = self.body(false);
                handlers.push(Case {
                    header: stmt,
                    body,
                    default: false,
                });
            } else if FINALLY_KEYWORDS.contains(&kw) {
                self.pos += 1;
                finally = Some(self.body(false));
            } else {
                break;
            }
        }

        Block::Try {
            header,
            body,
            handlers,
            finally,
        }
    }

    fn switch_block(&mut self, header: Stmt) -> Option<Block> {
        if self.peek_open() {
            return self.descend(|parser| parser.switch_cases(header));
        }
        self.switch_cases(header)
    }

    fn switch_cases(&mut self, header: Stmt) -> Option<Block> {
        let mut preamble = Vec::new();
        let mut cases: Vec<Case> = Vec::new();

        if self.peek_open() {
            self.pos += 1;
            while self.pos < self.tokens.len() && !self.peek_close() {
                if self.peek_open() {
                    self.pos += 1;
                    let inner = self.sequence();
                    self.expect_close();
                    match cases.last_mut() {
                        Some(case) => case.body.extend(inner),
                        None => preamble.extend(inner),
                    }
                    continue;
                }
                let Some((text, _)) = self.peek_text() else {
                    break;
                };
                if is_case_header(text) {
                    let Some(stmt) = self.take_stmt() else { break };
                    cases.push(self.case(&stmt));
                    continue;
                }
                if let Some(block) = self.item() {
                    match cases.last_mut() {
                        Some(case) => case.body.push(block),
                        None => preamble.push(block),
                    }
                }
            }
            self.expect_close();
        } else {
            // Indentation style (`case x` / `when 1` at the same level)
            while let Some((text, _)) = self.peek_text() {
                let kw = keyword(text);
                if !matches!(kw, "when" | "else" | "in") {
                    break;
                }
                let is_else = kw == "else";
                let Some(stmt) = self.take_stmt() else { break };
                let mut case = self.case(&stmt);
                if is_else && case.header.text == "else" {
                    case.header.text = "default".to_string();
                    case.default = true;
                }
                cases.push(case);
            }
            if cases.is_empty() {
                // `case` used as a plain word; re-read it as a statement.
                return None;
            }
        }

        Some(Block::Switch {
            header,
            preamble,
            cases,
        })
    }

    fn case(&mut self, stmt: &Stmt) -> Case {
        let (header, inline) = split_case_header(stmt);
        let mut body: Vec<Block> = inline
            .map(|stmt| {
                let terminal = is_terminal(&stmt.text);
                Block::Simple { stmt, terminal }
            })
            .into_iter()
            .collect();
        if self.peek_open() {
            body.extend(self.body(false));
        }
        let default = is_default_arm(&header.text);
        Case {
            header,
            body,
            default,
        }
    }
}

fn starts_with_word(text: &str, prefix: &str) -> bool {
    text.strip_prefix(prefix).is_some_and(|rest| {
        rest.is_empty() || !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_')
    })
}

fn is_continuation(text: &str) -> bool {
    let kw = keyword(text);
    kw == "else"
        || HANDLER_KEYWORDS.contains(&kw)
        || FINALLY_KEYWORDS.contains(&kw)
        || ELSE_IF_PREFIXES.iter().any(|p| starts_with_word(text, p))
}
