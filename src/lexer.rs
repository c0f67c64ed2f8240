use crate::token::{Keyword, Token};

/// The two supported G-code dialects.
///
/// The scanner is shared; dialects differ only in their keyword tables here.
/// The parsers differ in control flow and parameter syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// LinuxCNC-style G-code with o-code control flow and named parameters.
    LinuxCnc,
    /// Plain RS-274: blocks and numbered parameters only.
    Rs274,
}

/// A location in the source text.
///
/// `checksum` is an 8-bit XOR accumulated over every character consumed
/// since the last line break. It is a diagnostic fingerprint only and has
/// no effect on semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub tag: String,
    pub line: u32,
    pub column: u32,
    pub checksum: u8,
}

impl SourcePosition {
    pub fn new(tag: &str, line: u32, column: u32) -> Self {
        SourcePosition {
            tag: tag.to_string(),
            line,
            column,
            checksum: 0,
        }
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.tag, self.line, self.column)
    }
}

/// A token together with the position it was scanned at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: SourcePosition,
}

/// Scanner failure: an input character no lexical rule accepts, or a
/// construct that cannot be finished on its line.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{position}: {message}")]
pub struct LexicalError {
    pub position: SourcePosition,
    pub message: String,
}

impl LexicalError {
    fn unexpected(position: SourcePosition, ch: char) -> Self {
        LexicalError {
            position,
            message: format!("unexpected character '{}'", ch),
        }
    }
}

/// Line-oriented G-code scanner.
///
/// Within a line it skips whitespace and matches, in priority order:
/// float (`digits.digits`), integer, identifier (two or more leading
/// alphabetic characters), single-character operator, `;` comment, and
/// `(...)` comment. When a line is exhausted it emits a `Newline` token
/// carrying the finalized position (line number and rolling checksum)
/// before moving on.
pub struct Scanner<'s> {
    lines: std::str::Lines<'s>,
    buffer: Vec<char>,
    cursor: usize,
    position: SourcePosition,
    dialect: Dialect,
    done: bool,
}

impl<'s> Scanner<'s> {
    pub fn new(tag: &str, source: &'s str, dialect: Dialect) -> Self {
        let mut scanner = Scanner {
            lines: source.lines(),
            buffer: Vec::new(),
            cursor: 0,
            position: SourcePosition::new(tag, 0, 1),
            dialect,
            done: false,
        };
        scanner.next_line();
        scanner
    }

    /// True once every line has been fully consumed.
    pub fn finished(&self) -> bool {
        self.done
    }

    /// The position the next token would be scanned at.
    pub fn position(&self) -> &SourcePosition {
        &self.position
    }

    /// Scans the next token, or `None` at end of input.
    pub fn next(&mut self) -> Result<Option<Spanned>, LexicalError> {
        if self.done {
            return Ok(None);
        }
        self.skip_whitespace();

        if self.cursor >= self.buffer.len() {
            // Line exhausted: the newline token carries the finalized
            // position, including the whole-line checksum.
            let newline = Spanned {
                token: Token::Newline,
                position: self.position.clone(),
            };
            self.next_line();
            return Ok(Some(newline));
        }

        let position = self.position.clone();
        let ch = self.buffer[self.cursor];

        let token = if ch.is_ascii_digit() {
            self.read_number()?
        } else if self.at_identifier() {
            self.read_identifier()
        } else if ch.is_ascii_alphabetic() {
            self.consume(1);
            Token::Operator(ch.to_ascii_uppercase())
        } else if "+-*/%[]#=<>".contains(ch) {
            self.consume(1);
            Token::Operator(ch)
        } else if ch == ';' {
            self.read_line_comment()
        } else if ch == '(' {
            match self.read_braced_comment() {
                Some(token) => token,
                None => {
                    self.consume(1);
                    return Err(LexicalError {
                        position,
                        message: "unterminated comment".to_string(),
                    });
                }
            }
        } else {
            self.consume(1);
            return Err(LexicalError::unexpected(position, ch));
        };

        Ok(Some(Spanned { token, position }))
    }

    /// Scans the whole input into a token list terminated by `Token::End`.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexicalError> {
        let mut tokens = Vec::new();
        while let Some(spanned) = self.next()? {
            tokens.push(spanned);
        }
        tokens.push(Spanned {
            token: Token::End,
            position: self.position.clone(),
        });
        Ok(tokens)
    }

    // -- line and cursor handling --

    fn next_line(&mut self) {
        match self.lines.next() {
            Some(line) => {
                // `str::lines` keeps a trailing '\r' on CRLF input.
                self.buffer = line.strip_suffix('\r').unwrap_or(line).chars().collect();
                self.cursor = 0;
                self.position.line += 1;
                self.position.column = 1;
                self.position.checksum = 0;
            }
            None => {
                self.buffer.clear();
                self.cursor = 0;
                self.done = true;
            }
        }
    }

    /// Advances the cursor, folding every consumed character into the
    /// rolling checksum.
    fn consume(&mut self, count: usize) {
        for _ in 0..count {
            if let Some(&ch) = self.buffer.get(self.cursor) {
                let mut code = [0u8; 4];
                for byte in ch.encode_utf8(&mut code).bytes() {
                    self.position.checksum ^= byte;
                }
                self.cursor += 1;
                self.position.column += 1;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self
            .buffer
            .get(self.cursor)
            .map(|ch| ch.is_whitespace())
            .unwrap_or(false)
        {
            self.consume(1);
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.buffer.get(self.cursor + offset).copied()
    }

    // -- lexical rules --

    /// Identifiers start with at least two alphabetic or underscore
    /// characters; a single letter is always an operator (a word letter).
    fn at_identifier(&self) -> bool {
        let leading = |ch: Option<char>| {
            ch.map(|c| c.is_ascii_alphabetic() || c == '_')
                .unwrap_or(false)
        };
        leading(self.peek(0)) && leading(self.peek(1))
    }

    fn read_number(&mut self) -> Result<Token, LexicalError> {
        let mut digits = String::new();
        while let Some(ch) = self.peek(digits.len()) {
            if ch.is_ascii_digit() {
                digits.push(ch);
            } else {
                break;
            }
        }

        // Float only if a fractional part with digits follows.
        let after = self.peek(digits.len());
        let fraction_digit = self
            .peek(digits.len() + 1)
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false);
        if after == Some('.') && fraction_digit {
            let mut text = digits;
            text.push('.');
            while let Some(ch) = self.peek(text.len()) {
                if ch.is_ascii_digit() {
                    text.push(ch);
                } else {
                    break;
                }
            }
            // Digits around a single dot always parse; overlong input
            // saturates to infinity.
            let value: f64 = text.parse().map_err(|_| LexicalError {
                position: self.position.clone(),
                message: format!("invalid number '{}'", text),
            })?;
            self.consume(text.chars().count());
            Ok(Token::Float(value))
        } else {
            let value: i64 = digits.parse().map_err(|_| LexicalError {
                position: self.position.clone(),
                message: format!("integer literal '{}' out of range", digits),
            })?;
            self.consume(digits.chars().count());
            Ok(Token::Integer(value))
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.peek(text.chars().count()) {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                text.push(ch);
            } else {
                break;
            }
        }
        self.consume(text.chars().count());
        match keyword(&text, self.dialect) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Ident(text),
        }
    }

    fn read_line_comment(&mut self) -> Token {
        let text: String = self.buffer[self.cursor + 1..].iter().collect();
        self.consume(self.buffer.len() - self.cursor);
        Token::Comment {
            text,
            braced: false,
        }
    }

    /// `(...)` comments do not nest and must close on the same line.
    fn read_braced_comment(&mut self) -> Option<Token> {
        let mut text = String::new();
        let mut offset = 1;
        loop {
            match self.peek(offset) {
                Some(')') => break,
                Some(ch) => {
                    text.push(ch);
                    offset += 1;
                }
                None => return None,
            }
        }
        self.consume(offset + 1);
        Some(Token::Comment { text, braced: true })
    }
}

/// Per-dialect keyword table. Keywords are matched case-sensitively: the
/// word operators are uppercase, the o-code words lowercase.
fn keyword(text: &str, dialect: Dialect) -> Option<Keyword> {
    let shared = match text {
        "MOD" => Some(Keyword::Mod),
        "EQ" => Some(Keyword::Eq),
        "NE" => Some(Keyword::Ne),
        "GE" => Some(Keyword::Ge),
        "GT" => Some(Keyword::Gt),
        "LE" => Some(Keyword::Le),
        "LT" => Some(Keyword::Lt),
        "AND" => Some(Keyword::And),
        "OR" => Some(Keyword::Or),
        "XOR" => Some(Keyword::Xor),
        "NOT" => Some(Keyword::Not),
        _ => None,
    };
    if shared.is_some() || dialect == Dialect::Rs274 {
        return shared;
    }
    match text {
        "sub" => Some(Keyword::Sub),
        "endsub" => Some(Keyword::Endsub),
        "return" => Some(Keyword::Return),
        "call" => Some(Keyword::Call),
        "if" => Some(Keyword::If),
        "elseif" => Some(Keyword::Elseif),
        "else" => Some(Keyword::Else),
        "endif" => Some(Keyword::Endif),
        "while" => Some(Keyword::While),
        "endwhile" => Some(Keyword::Endwhile),
        "do" => Some(Keyword::Do),
        "repeat" => Some(Keyword::Repeat),
        "endrepeat" => Some(Keyword::Endrepeat),
        "break" => Some(Keyword::Break),
        "continue" => Some(Keyword::Continue),
        _ => None,
    }
}
