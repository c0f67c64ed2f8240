use serde::{Deserialize, Serialize};

/// A dynamically typed runtime value.
///
/// `None` is the value of an unbound parameter; numeric operations treat it
/// as zero. `Logical` is produced by comparisons and logic operators and is
/// coerced back to a number (0 or 1) where needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Integer(i64),
    Float(f64),
    String(String),
    Logical(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Logical(_) => "logical",
        }
    }

    /// Numeric view, or `None` for strings.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::None => Some(0.0),
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Logical(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(_) => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Logical(b) => write!(f, "{}", if *b { 1 } else { 0 }),
        }
    }
}

/// Failure of a value-level operation. The interpreter attaches the source
/// position; the constant folder treats any error as "do not fold".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("cannot {operation} a {operand} value")]
    Type {
        operation: &'static str,
        operand: &'static str,
    },
}

/// Comparison selector shared by the value layer, the translator's folder
/// and the interpreter's compare opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Logic operator selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

enum Num {
    Int(i64),
    Flt(f64),
}

fn numeric(value: &Value, operation: &'static str) -> Result<Num, ValueError> {
    match value {
        Value::None => Ok(Num::Int(0)),
        Value::Integer(n) => Ok(Num::Int(*n)),
        Value::Float(n) => Ok(Num::Flt(*n)),
        Value::Logical(b) => Ok(Num::Int(if *b { 1 } else { 0 })),
        Value::String(_) => Err(ValueError::Type {
            operation,
            operand: "string",
        }),
    }
}

/// True when the value is nonzero. Strings have no logical meaning.
pub fn truthy(value: &Value) -> Result<bool, ValueError> {
    match numeric(value, "test")? {
        Num::Int(n) => Ok(n != 0),
        Num::Flt(n) => Ok(n != 0.0),
    }
}

pub fn add(a: &Value, b: &Value) -> Result<Value, ValueError> {
    Ok(match (numeric(a, "add")?, numeric(b, "add")?) {
        (Num::Int(a), Num::Int(b)) => Value::Integer(a.wrapping_add(b)),
        (a, b) => Value::Float(widen(a) + widen(b)),
    })
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, ValueError> {
    Ok(match (numeric(a, "subtract")?, numeric(b, "subtract")?) {
        (Num::Int(a), Num::Int(b)) => Value::Integer(a.wrapping_sub(b)),
        (a, b) => Value::Float(widen(a) - widen(b)),
    })
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, ValueError> {
    Ok(match (numeric(a, "multiply")?, numeric(b, "multiply")?) {
        (Num::Int(a), Num::Int(b)) => Value::Integer(a.wrapping_mul(b)),
        (a, b) => Value::Float(widen(a) * widen(b)),
    })
}

/// Division always produces a float; a zero divisor of either kind traps.
pub fn div(a: &Value, b: &Value) -> Result<Value, ValueError> {
    let a = widen(numeric(a, "divide")?);
    let b = widen(numeric(b, "divide")?);
    if b == 0.0 {
        return Err(ValueError::DivisionByZero);
    }
    Ok(Value::Float(a / b))
}

/// Modulus stays integral for integer operands and follows the float
/// remainder semantics otherwise. A zero divisor traps like division.
pub fn modulo(a: &Value, b: &Value) -> Result<Value, ValueError> {
    match (numeric(a, "take modulus of")?, numeric(b, "take modulus of")?) {
        (Num::Int(a), Num::Int(b)) => {
            if b == 0 {
                Err(ValueError::DivisionByZero)
            } else {
                Ok(Value::Integer(a.wrapping_rem(b)))
            }
        }
        (a, b) => {
            let b = widen(b);
            if b == 0.0 {
                Err(ValueError::DivisionByZero)
            } else {
                Ok(Value::Float(widen(a) % b))
            }
        }
    }
}

pub fn neg(a: &Value) -> Result<Value, ValueError> {
    Ok(match numeric(a, "negate")? {
        Num::Int(n) => Value::Integer(n.wrapping_neg()),
        Num::Flt(n) => Value::Float(-n),
    })
}

pub fn not(a: &Value) -> Result<Value, ValueError> {
    Ok(Value::Logical(!truthy(a)?))
}

/// Comparisons use floating semantics across numeric kinds and push a
/// logical. Strings only support equality.
pub fn compare(cmp: Comparison, a: &Value, b: &Value) -> Result<Value, ValueError> {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        return match cmp {
            Comparison::Eq => Ok(Value::Logical(a == b)),
            Comparison::Ne => Ok(Value::Logical(a != b)),
            _ => Err(ValueError::Type {
                operation: "order",
                operand: "string",
            }),
        };
    }
    let a = widen(numeric(a, "compare")?);
    let b = widen(numeric(b, "compare")?);
    Ok(Value::Logical(match cmp {
        Comparison::Eq => a == b,
        Comparison::Ne => a != b,
        Comparison::Lt => a < b,
        Comparison::Le => a <= b,
        Comparison::Gt => a > b,
        Comparison::Ge => a >= b,
    }))
}

/// Logic operators coerce numbers by "nonzero is true".
pub fn logical(op: LogicOp, a: &Value, b: &Value) -> Result<Value, ValueError> {
    let a = truthy(a)?;
    let b = truthy(b)?;
    Ok(Value::Logical(match op {
        LogicOp::And => a && b,
        LogicOp::Or => a || b,
        LogicOp::Xor => a ^ b,
    }))
}

fn widen(n: Num) -> f64 {
    match n {
        Num::Int(n) => n as f64,
        Num::Flt(n) => n,
    }
}
