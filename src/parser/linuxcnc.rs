//! LinuxCNC dialect: plain blocks plus o-code control flow.
//!
//! An o-line is `o<label>` followed by a control keyword. Labels are
//! numeric (`o100`) or named (`o<retract>`); every structured opener must
//! be closed by the same label, and the parser rejects `break`/`continue`
//! outside a loop, `return` outside a subroutine, and nested subroutine
//! definitions. Subroutine definitions are hoisted into the program's
//! procedure table.

use crate::ast::{CondArm, Node, NodeKind, Program};
use crate::parser_error::ParseError;
use crate::token::{Keyword, Token};

use super::Cursor;

/// Statement context: what `break`/`continue`/`return` may refer to.
#[derive(Clone, Copy, Default)]
struct Context {
    in_loop: bool,
    in_sub: bool,
}

pub(crate) fn parse_program(cursor: &mut Cursor) -> Result<Program, ParseError> {
    let mut body = Vec::new();
    let mut procedures = Vec::new();

    loop {
        cursor.skip_blank_lines();
        if cursor.at_end() {
            break;
        }
        if let Some(node) =
            parse_statement(cursor, Context::default(), &mut procedures)?
        {
            body.push(node);
        }
    }

    Ok(Program {
        tag: cursor.tag.clone(),
        body,
        procedures,
    })
}

/// Parses one statement. Returns `None` when the statement was hoisted
/// (a subroutine definition) or the line carried nothing executable.
fn parse_statement(
    cursor: &mut Cursor,
    ctx: Context,
    procedures: &mut Vec<Node>,
) -> Result<Option<Node>, ParseError> {
    if cursor.at_operator('O') {
        parse_o_statement(cursor, ctx, procedures)
    } else {
        cursor.parse_block()
    }
}

fn parse_o_statement(
    cursor: &mut Cursor,
    ctx: Context,
    procedures: &mut Vec<Node>,
) -> Result<Option<Node>, ParseError> {
    let position = cursor.position();
    cursor.advance(); // 'O'
    let label = parse_label(cursor)?;

    let keyword = match cursor.current().token {
        Token::Keyword(kw) => kw,
        ref other => {
            return Err(cursor.error(format!(
                "expected a control keyword after 'o{}', found '{}'",
                label, other
            )))
        }
    };
    cursor.advance();

    match keyword {
        Keyword::Sub => {
            if ctx.in_sub {
                return Err(ParseError::new(
                    position,
                    "subroutine definitions cannot be nested",
                ));
            }
            if ctx.in_loop {
                return Err(ParseError::new(
                    position,
                    "subroutine definitions must appear at the top level",
                ));
            }
            cursor.end_line()?;
            let sub_ctx = Context {
                in_loop: false,
                in_sub: true,
            };
            let (body, _) =
                parse_body(cursor, &label, &[Keyword::Endsub], sub_ctx, procedures)?;
            cursor.end_line()?;
            let node = cursor.node(
                NodeKind::ProcedureDefinition {
                    name: label,
                    body,
                },
                position,
            );
            procedures.push(node);
            Ok(None)
        }

        Keyword::Call => {
            let mut args = Vec::new();
            while cursor.at_operator('[') {
                args.push(cursor.parse_bracketed()?);
            }
            cursor.end_line()?;
            Ok(Some(cursor.node(
                NodeKind::ProcedureCall { name: label, args },
                position,
            )))
        }

        Keyword::If => {
            let condition = cursor.parse_bracketed()?;
            cursor.end_line()?;
            let mut arms = Vec::new();
            let mut otherwise = None;

            let (body, mut closer) = parse_body(
                cursor,
                &label,
                &[Keyword::Elseif, Keyword::Else, Keyword::Endif],
                ctx,
                procedures,
            )?;
            arms.push(CondArm { condition, body });

            while closer == Keyword::Elseif {
                let condition = cursor.parse_bracketed()?;
                cursor.end_line()?;
                let (body, next) = parse_body(
                    cursor,
                    &label,
                    &[Keyword::Elseif, Keyword::Else, Keyword::Endif],
                    ctx,
                    procedures,
                )?;
                arms.push(CondArm { condition, body });
                closer = next;
            }

            if closer == Keyword::Else {
                cursor.end_line()?;
                let (body, _) =
                    parse_body(cursor, &label, &[Keyword::Endif], ctx, procedures)?;
                otherwise = Some(body);
            }
            cursor.end_line()?;

            Ok(Some(labelled(
                cursor,
                label,
                NodeKind::Conditional { arms, otherwise },
                position,
            )))
        }

        Keyword::While => {
            let condition = cursor.parse_bracketed()?;
            cursor.end_line()?;
            let loop_ctx = Context {
                in_loop: true,
                ..ctx
            };
            let (body, _) =
                parse_body(cursor, &label, &[Keyword::Endwhile], loop_ctx, procedures)?;
            cursor.end_line()?;
            Ok(Some(labelled(
                cursor,
                label,
                NodeKind::While {
                    condition: Box::new(condition),
                    body,
                },
                position,
            )))
        }

        Keyword::Do => {
            cursor.end_line()?;
            let loop_ctx = Context {
                in_loop: true,
                ..ctx
            };
            let (body, _) =
                parse_body(cursor, &label, &[Keyword::While], loop_ctx, procedures)?;
            // The closing line is `o<label> while [condition]`.
            let condition = cursor.parse_bracketed()?;
            cursor.end_line()?;
            Ok(Some(labelled(
                cursor,
                label,
                NodeKind::DoWhile {
                    body,
                    condition: Box::new(condition),
                },
                position,
            )))
        }

        Keyword::Repeat => {
            let count = cursor.parse_bracketed()?;
            cursor.end_line()?;
            let loop_ctx = Context {
                in_loop: true,
                ..ctx
            };
            let (body, _) =
                parse_body(cursor, &label, &[Keyword::Endrepeat], loop_ctx, procedures)?;
            cursor.end_line()?;
            Ok(Some(labelled(
                cursor,
                label,
                NodeKind::Repeat {
                    count: Box::new(count),
                    body,
                },
                position,
            )))
        }

        Keyword::Break => {
            if !ctx.in_loop {
                return Err(ParseError::new(position, "'break' outside of a loop"));
            }
            cursor.end_line()?;
            Ok(Some(cursor.node(NodeKind::Break, position)))
        }

        Keyword::Continue => {
            if !ctx.in_loop {
                return Err(ParseError::new(position, "'continue' outside of a loop"));
            }
            cursor.end_line()?;
            Ok(Some(cursor.node(NodeKind::Continue, position)))
        }

        Keyword::Return => {
            if !ctx.in_sub {
                return Err(ParseError::new(
                    position,
                    "'return' outside of a subroutine",
                ));
            }
            cursor.end_line()?;
            Ok(Some(cursor.node(NodeKind::Return, position)))
        }

        other => Err(ParseError::new(
            position,
            format!("unmatched 'o{} {}'", label, other),
        )),
    }
}

/// The label after `o`: a number or `<name>`.
fn parse_label(cursor: &mut Cursor) -> Result<String, ParseError> {
    match cursor.current().token.clone() {
        Token::Integer(n) => {
            cursor.advance();
            Ok(n.to_string())
        }
        Token::Operator('<') => {
            cursor.advance();
            let name = match cursor.current().token.clone() {
                Token::Ident(name) => name,
                ref other => {
                    return Err(cursor.error(format!("expected label name, found '{}'", other)))
                }
            };
            cursor.advance();
            cursor.expect_operator('>')?;
            Ok(name)
        }
        ref other => Err(cursor.error(format!("expected o-code label, found '{}'", other))),
    }
}

/// Parses statements until an o-line with the given label and one of the
/// closer keywords. The closer keyword is consumed; the rest of its line
/// (condition or newline) is left for the caller. Returns the body and the
/// closer that ended it.
fn parse_body(
    cursor: &mut Cursor,
    label: &str,
    closers: &[Keyword],
    ctx: Context,
    procedures: &mut Vec<Node>,
) -> Result<(Vec<Node>, Keyword), ParseError> {
    let mut body = Vec::new();

    loop {
        cursor.skip_blank_lines();
        if cursor.at_end() {
            return Err(cursor.error(format!(
                "unexpected end of input inside 'o{}' (missing '{}'?)",
                label,
                closers[0]
            )));
        }

        if cursor.at_operator('O') {
            let checkpoint = cursor.checkpoint();
            let closer_position = cursor.position();
            cursor.advance();
            let found = parse_label(cursor)?;
            if let Token::Keyword(kw) = cursor.current().token {
                if closers.contains(&kw) {
                    if found != label {
                        return Err(ParseError::new(
                            closer_position,
                            format!(
                                "mismatched o-code label: 'o{} {}' closes 'o{}'",
                                found, kw, label
                            ),
                        ));
                    }
                    cursor.advance();
                    return Ok((body, kw));
                }
            }
            cursor.rewind(checkpoint);
        }

        if let Some(node) = parse_statement(cursor, ctx, procedures)? {
            body.push(node);
        }
    }
}

fn labelled(
    cursor: &mut Cursor,
    label: String,
    kind: NodeKind,
    position: crate::lexer::SourcePosition,
) -> Node {
    let inner = cursor.node(kind, position.clone());
    cursor.node(
        NodeKind::Labelled {
            label,
            body: Box::new(inner),
        },
        position,
    )
}
