//! Recursive-descent parsers for the two G-code dialects.
//!
//! Both parsers run over the same one-token-lookahead cursor and share the
//! expression grammar and block (word/assignment) parsing defined here.
//! `parser::linuxcnc` adds the o-code control-flow statements;
//! `parser::rs274` accepts plain blocks only.

pub mod linuxcnc;
pub mod rs274;

use crate::ast::{BinOp, Node, NodeKind, ParamId, Program, UnOp};
use crate::error::Error;
use crate::lexer::{Dialect, Scanner, SourcePosition, Spanned};
use crate::parser_error::ParseError;
use crate::runtime::value::Value;
use crate::token::{Keyword, Token};

/// Parses a complete program in the given dialect.
pub fn parse(tag: &str, source: &str, dialect: Dialect) -> Result<Program, Error> {
    let tokens = Scanner::new(tag, source, dialect).tokenize()?;
    let mut cursor = Cursor::new(tag, tokens, dialect);
    let program = match dialect {
        Dialect::LinuxCnc => linuxcnc::parse_program(&mut cursor)?,
        Dialect::Rs274 => rs274::parse_program(&mut cursor)?,
    };
    Ok(program)
}

/// Token cursor shared by the dialect parsers.
///
/// Comments are filtered out up front; newlines are kept because they
/// terminate blocks. The cursor also owns the node-id counter, so node
/// identity is monotone in construction order across the whole parse.
pub(crate) struct Cursor {
    pub(crate) tag: String,
    pub(crate) dialect: Dialect,
    tokens: Vec<Spanned>,
    pos: usize,
    next_id: u64,
}

impl Cursor {
    pub(crate) fn new(tag: &str, tokens: Vec<Spanned>, dialect: Dialect) -> Self {
        let tokens: Vec<Spanned> = tokens
            .into_iter()
            .filter(|s| !matches!(s.token, Token::Comment { .. }))
            .collect();
        Cursor {
            tag: tag.to_string(),
            dialect,
            tokens,
            pos: 0,
            next_id: 0,
        }
    }

    /// The current token. The token list always ends with `Token::End`, so
    /// this saturates there instead of running off the end.
    pub(crate) fn current(&self) -> &Spanned {
        let index = self.pos.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub(crate) fn advance(&mut self) -> Spanned {
        let spanned = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        spanned
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.pos
    }

    pub(crate) fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    pub(crate) fn position(&self) -> SourcePosition {
        self.current().position.clone()
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.position(), message)
    }

    pub(crate) fn node(&mut self, kind: NodeKind, position: SourcePosition) -> Node {
        let id = self.next_id;
        self.next_id += 1;
        Node { id, position, kind }
    }

    pub(crate) fn at_operator(&self, ch: char) -> bool {
        matches!(self.current().token, Token::Operator(c) if c == ch)
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.current().token, Token::End)
    }

    pub(crate) fn expect_operator(&mut self, ch: char) -> Result<(), ParseError> {
        if self.at_operator(ch) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found '{}'",
                ch,
                self.current().token
            )))
        }
    }

    /// Consumes the newline (or end of input) that terminates a statement.
    pub(crate) fn end_line(&mut self) -> Result<(), ParseError> {
        match self.current().token {
            Token::Newline => {
                self.advance();
                Ok(())
            }
            Token::End => Ok(()),
            ref other => Err(self.error(format!(
                "expected end of line, found '{}'",
                other
            ))),
        }
    }

    pub(crate) fn skip_blank_lines(&mut self) {
        while matches!(self.current().token, Token::Newline) {
            self.advance();
        }
    }

    // -- expression grammar, shared by both dialects --
    //
    //   expr  := cmp (AND|OR|XOR cmp)*
    //   cmp   := add (EQ|NE|LT|LE|GT|GE add)?      -- non-associative
    //   add   := mul (('+'|'-') mul)*
    //   mul   := unary (('*'|'/'|MOD) unary)*
    //   unary := ('-'|NOT) unary | primary

    pub(crate) fn parse_expr(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_cmp()?;
        loop {
            let op = match self.current().token {
                Token::Keyword(Keyword::And) => BinOp::And,
                Token::Keyword(Keyword::Or) => BinOp::Or,
                Token::Keyword(Keyword::Xor) => BinOp::Xor,
                _ => break,
            };
            let position = lhs.position.clone();
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = self.node(
                NodeKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                position,
            );
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Node, ParseError> {
        let lhs = self.parse_add()?;
        let op = match self.current().token {
            Token::Keyword(Keyword::Eq) => BinOp::Eq,
            Token::Keyword(Keyword::Ne) => BinOp::Ne,
            Token::Keyword(Keyword::Lt) => BinOp::Lt,
            Token::Keyword(Keyword::Le) => BinOp::Le,
            Token::Keyword(Keyword::Gt) => BinOp::Gt,
            Token::Keyword(Keyword::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        let position = lhs.position.clone();
        self.advance();
        // Comparisons do not chain; `[a LT b] LT c` needs the brackets.
        let rhs = self.parse_add()?;
        Ok(self.node(
            NodeKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            position,
        ))
    }

    fn parse_add(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.current().token {
                Token::Operator('+') => BinOp::Add,
                Token::Operator('-') => BinOp::Sub,
                _ => break,
            };
            let position = lhs.position.clone();
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = self.node(
                NodeKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                position,
            );
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current().token {
                Token::Operator('*') => BinOp::Mul,
                Token::Operator('/') => BinOp::Div,
                Token::Keyword(Keyword::Mod) => BinOp::Mod,
                _ => break,
            };
            let position = lhs.position.clone();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = self.node(
                NodeKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                position,
            );
        }
        Ok(lhs)
    }

    pub(crate) fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let position = self.position();
        let op = match self.current().token {
            Token::Operator('-') => Some(UnOp::Minus),
            Token::Keyword(Keyword::Not) => Some(UnOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.node(
                NodeKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                position,
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let position = self.position();
        match self.current().token.clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(self.node(NodeKind::Number(Value::Integer(n)), position))
            }
            Token::Float(n) => {
                self.advance();
                Ok(self.node(NodeKind::Number(Value::Float(n)), position))
            }
            Token::Operator('[') => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_operator(']')?;
                Ok(inner)
            }
            Token::Operator('#') => {
                self.advance();
                let id = self.parse_param_ref()?;
                Ok(self.node(NodeKind::VariableRef(id), position))
            }
            Token::Ident(name) => {
                self.advance();
                self.parse_function_call(name, position)
            }
            ref other => Err(self.error(format!("expected an expression, found '{}'", other))),
        }
    }

    /// `NAME[expr]`, plus the two-argument `ATAN[y]/[x]` form.
    fn parse_function_call(
        &mut self,
        name: String,
        position: SourcePosition,
    ) -> Result<Node, ParseError> {
        let name = name.to_ascii_uppercase();
        self.expect_operator('[')?;
        let first = self.parse_expr()?;
        self.expect_operator(']')?;
        let mut args = vec![first];
        if name == "ATAN" && self.at_operator('/') {
            self.advance();
            self.expect_operator('[')?;
            args.push(self.parse_expr()?);
            self.expect_operator(']')?;
        }
        Ok(self.node(NodeKind::FunctionCall { name, args }, position))
    }

    /// The reference form after `#`: a parameter number, a bare name, or
    /// the angle-bracketed `<name>` spelling.
    pub(crate) fn parse_param_ref(&mut self) -> Result<ParamId, ParseError> {
        match self.current().token.clone() {
            Token::Integer(n) => {
                if !(0..=u16::MAX as i64).contains(&n) {
                    return Err(self.error(format!("parameter number {} out of range", n)));
                }
                self.advance();
                Ok(ParamId::Numbered(n as u16))
            }
            Token::Ident(name) => {
                self.require_named_parameters()?;
                self.advance();
                Ok(ParamId::Named(name))
            }
            Token::Operator('<') => {
                self.require_named_parameters()?;
                self.advance();
                let name = match self.current().token.clone() {
                    Token::Ident(name) => name,
                    ref other => {
                        return Err(
                            self.error(format!("expected parameter name, found '{}'", other))
                        )
                    }
                };
                self.advance();
                self.expect_operator('>')?;
                Ok(ParamId::Named(name))
            }
            ref other => Err(self.error(format!(
                "expected parameter number or name, found '{}'",
                other
            ))),
        }
    }

    fn require_named_parameters(&self) -> Result<(), ParseError> {
        if self.dialect == Dialect::Rs274 {
            Err(self.error("named parameters are not supported in this dialect"))
        } else {
            Ok(())
        }
    }

    /// `[expr]` as required after control keywords and in call arguments.
    pub(crate) fn parse_bracketed(&mut self) -> Result<Node, ParseError> {
        self.expect_operator('[')?;
        let expr = self.parse_expr()?;
        self.expect_operator(']')?;
        Ok(expr)
    }

    // -- block parsing, shared by both dialects --

    /// Parses one block (source line) of words and parameter assignments,
    /// up to and including its terminating newline. Returns `None` for a
    /// line carrying nothing executable (e.g. only an `N` word).
    pub(crate) fn parse_block(&mut self) -> Result<Option<Node>, ParseError> {
        let position = self.position();
        let mut words: Vec<Node> = Vec::new();
        let mut assignments: Vec<Node> = Vec::new();
        let mut first = true;

        loop {
            match self.current().token {
                Token::Newline => {
                    self.advance();
                    break;
                }
                Token::End => break,
                Token::Operator('#') => {
                    let assign_pos = self.position();
                    self.advance();
                    let target = self.parse_param_ref()?;
                    self.expect_operator('=')?;
                    let value = self.parse_unary()?;
                    let node = self.node(
                        NodeKind::Assignment {
                            target,
                            value: Box::new(value),
                        },
                        assign_pos,
                    );
                    assignments.push(node);
                }
                Token::Operator(letter) if letter.is_ascii_uppercase() => {
                    let word_pos = self.position();
                    self.advance();
                    // Line numbers are accepted and ignored.
                    if letter == 'N' && first {
                        self.parse_unary()?;
                        first = false;
                        continue;
                    }
                    let value = self.parse_unary()?;
                    let node = self.node(
                        NodeKind::Word {
                            letter,
                            value: Box::new(value),
                        },
                        word_pos,
                    );
                    words.push(node);
                }
                ref other => {
                    return Err(self.error(format!(
                        "expected a word or parameter assignment, found '{}'",
                        other
                    )));
                }
            }
            first = false;
        }

        if words.is_empty() && assignments.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.node(
            NodeKind::Command {
                words,
                assignments,
            },
            position,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(source: &str) -> Program {
        parse("test", source, Dialect::LinuxCnc).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        match parse("test", source, Dialect::LinuxCnc) {
            Err(Error::Parse(e)) => e,
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    fn first_expr(program: &Program) -> &Node {
        match &program.body[0].kind {
            NodeKind::Command { assignments, .. } => match &assignments[0].kind {
                NodeKind::Assignment { value, .. } => value,
                other => panic!("expected assignment, got {:?}", other),
            },
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_block_words_and_assignment() {
        let program = parse_one("G1 X10 #1=5");
        match &program.body[0].kind {
            NodeKind::Command {
                words,
                assignments,
            } => {
                assert_eq!(words.len(), 2);
                assert_eq!(assignments.len(), 1);
                assert!(matches!(&words[0].kind, NodeKind::Word { letter: 'G', .. }));
                assert!(matches!(&words[1].kind, NodeKind::Word { letter: 'X', .. }));
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_line_number_word_is_ignored() {
        let program = parse_one("N10 G0 X1");
        match &program.body[0].kind {
            NodeKind::Command { words, .. } => assert_eq!(words.len(), 2),
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_line_number_only_line_produces_nothing() {
        let program = parse_one("N10\nG0 X1");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_expression_precedence() {
        // 1 + 2 * 3 parses as 1 + [2 * 3]
        let program = parse_one("#1=[1 + 2 * 3]");
        match &first_expr(&program).kind {
            NodeKind::Binary { op, rhs, .. } => {
                assert_eq!(*op, BinOp::Add);
                assert!(
                    matches!(&rhs.kind, NodeKind::Binary { op: BinOp::Mul, .. }),
                    "rhs = {:?}",
                    rhs.kind
                );
            }
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn test_logic_binds_weaker_than_comparison() {
        let program = parse_one("#1=[1 LT 2 AND 3 GT 2]");
        match &first_expr(&program).kind {
            NodeKind::Binary { op, lhs, rhs } => {
                assert_eq!(*op, BinOp::And);
                assert!(matches!(&lhs.kind, NodeKind::Binary { op: BinOp::Lt, .. }));
                assert!(matches!(&rhs.kind, NodeKind::Binary { op: BinOp::Gt, .. }));
            }
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn test_comparisons_do_not_chain() {
        let err = parse_err("#1=[1 LT 2 LT 3]");
        assert!(err.message.contains("expected"), "msg = {}", err.message);
    }

    #[test]
    fn test_unary_minus_and_not() {
        let program = parse_one("#1=[-2]\n#2=[NOT 0]");
        assert!(matches!(
            &first_expr(&program).kind,
            NodeKind::Unary {
                op: UnOp::Minus,
                ..
            }
        ));
    }

    #[test]
    fn test_numbered_and_named_references() {
        let program = parse_one("#1=#2\n#3=#<depth>");
        match &first_expr(&program).kind {
            NodeKind::VariableRef(ParamId::Numbered(2)) => {}
            other => panic!("expected numbered reference, got {:?}", other),
        }
    }

    #[test]
    fn test_parameter_number_out_of_range() {
        let err = parse_err("#99999=1");
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn test_function_call() {
        let program = parse_one("#1=SIN[30]");
        match &first_expr(&program).kind {
            NodeKind::FunctionCall { name, args } => {
                assert_eq!(name, "SIN");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_atan_two_argument_form() {
        let program = parse_one("#1=ATAN[1]/[2]");
        match &first_expr(&program).kind {
            NodeKind::FunctionCall { name, args } => {
                assert_eq!(name, "ATAN");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_word_value_forms() {
        let program = parse_one("G1 X-3.5 Y[1+2] Z#1 A SIN[0]");
        match &program.body[0].kind {
            NodeKind::Command { words, .. } => assert_eq!(words.len(), 5),
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_requires_equals() {
        let err = parse_err("#1 5");
        assert!(err.message.contains("'='"), "msg = {}", err.message);
    }

    #[test]
    fn test_unexpected_token_in_block() {
        let err = parse_err("G1 [2]");
        assert!(err.message.contains("expected a word"));
    }

    #[test]
    fn test_node_ids_are_unique_and_monotone() {
        let program = parse_one("G1 X1 Y2\nG0 Z3");
        let mut ids = Vec::new();
        fn collect(node: &Node, ids: &mut Vec<u64>) {
            ids.push(node.id);
            match &node.kind {
                NodeKind::Command {
                    words,
                    assignments,
                } => {
                    for n in words.iter().chain(assignments) {
                        collect(n, ids);
                    }
                }
                NodeKind::Word { value, .. } => collect(value, ids),
                _ => {}
            }
        }
        for node in &program.body {
            collect(node, &mut ids);
        }
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn test_error_positions_point_at_token() {
        let err = parse_err("G1 [2]");
        assert_eq!(err.position.line, 1);
        assert_eq!(err.position.column, 4);
    }
}
