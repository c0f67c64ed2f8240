//! Plain RS-274: a program is a sequence of blocks. No control flow, no
//! named parameters; `O` is an ordinary word letter here.

use crate::ast::Program;
use crate::parser_error::ParseError;

use super::Cursor;

pub(crate) fn parse_program(cursor: &mut Cursor) -> Result<Program, ParseError> {
    let mut body = Vec::new();

    loop {
        cursor.skip_blank_lines();
        if cursor.at_end() {
            break;
        }
        if let Some(node) = cursor.parse_block()? {
            body.push(node);
        }
    }

    Ok(Program {
        tag: cursor.tag.clone(),
        body,
        procedures: Vec::new(),
    })
}
