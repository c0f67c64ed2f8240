/// A single lexed G-code token.
///
/// Word letters (`G`, `X`, …) arrive as `Operator` tokens: the scanner does
/// not know whether a letter opens a word or belongs to an `o`-line, so that
/// distinction is left to the parser. Letters are normalized to uppercase.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal, e.g. `100`.
    Integer(i64),

    /// Float literal, e.g. `3.5`. The scanner only accepts the
    /// `digits.digits` form; `.5` and `5.` are not floats in G-code.
    Float(f64),

    /// A multi-character literal that is not a keyword, e.g. a named
    /// parameter or a function name.
    Ident(String),

    /// A reserved word from the active dialect's keyword table.
    Keyword(Keyword),

    /// A single-character operator, including bare word letters.
    Operator(char),

    /// A comment. `braced` distinguishes `(...)` from `;...`.
    Comment { text: String, braced: bool },

    /// End of a source line.
    Newline,

    /// End of input.
    End,
}

/// Reserved words. The comparison and logic operators are spelled as words
/// in G-code (`EQ`, `AND`, …); the LinuxCNC dialect adds the o-code control
/// flow set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // expression operators, shared by both dialects
    Mod,
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
    And,
    Or,
    Xor,
    Not,
    // LinuxCNC o-code control flow
    Sub,
    Endsub,
    Return,
    Call,
    If,
    Elseif,
    Else,
    Endif,
    While,
    Endwhile,
    Do,
    Repeat,
    Endrepeat,
    Break,
    Continue,
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Keyword::Mod => "MOD",
            Keyword::Eq => "EQ",
            Keyword::Ne => "NE",
            Keyword::Ge => "GE",
            Keyword::Gt => "GT",
            Keyword::Le => "LE",
            Keyword::Lt => "LT",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Xor => "XOR",
            Keyword::Not => "NOT",
            Keyword::Sub => "sub",
            Keyword::Endsub => "endsub",
            Keyword::Return => "return",
            Keyword::Call => "call",
            Keyword::If => "if",
            Keyword::Elseif => "elseif",
            Keyword::Else => "else",
            Keyword::Endif => "endif",
            Keyword::While => "while",
            Keyword::Endwhile => "endwhile",
            Keyword::Do => "do",
            Keyword::Repeat => "repeat",
            Keyword::Endrepeat => "endrepeat",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
        };
        f.write_str(text)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::Ident(name) => f.write_str(name),
            Token::Keyword(kw) => write!(f, "{}", kw),
            Token::Operator(ch) => write!(f, "{}", ch),
            Token::Comment { text, braced } => {
                if *braced {
                    write!(f, "({})", text)
                } else {
                    write!(f, ";{}", text)
                }
            }
            Token::Newline => f.write_str("<newline>"),
            Token::End => f.write_str("<end>"),
        }
    }
}
