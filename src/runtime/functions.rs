use std::collections::HashMap;

use crate::runtime::value::{Value, ValueError};

/// A built-in function body. Arguments arrive in call order.
pub type NativeFn = fn(&[Value]) -> Result<Value, ValueError>;

struct Function {
    arity: usize,
    run: NativeFn,
}

/// The interpreter's function table, backing the `Invoke` instruction.
///
/// Pre-loaded with the standard numeric set; hosts can register more.
/// Angles are in degrees, as G-code programs expect.
pub struct FunctionTable {
    entries: HashMap<String, Function>,
}

impl FunctionTable {
    pub fn standard() -> Self {
        let mut table = FunctionTable {
            entries: HashMap::new(),
        };
        table.register("ABS", 1, |args| unary(args, f64::abs));
        table.register("ACOS", 1, |args| unary(args, |x| x.acos().to_degrees()));
        table.register("ASIN", 1, |args| unary(args, |x| x.asin().to_degrees()));
        table.register("COS", 1, |args| unary(args, |x| x.to_radians().cos()));
        table.register("EXP", 1, |args| unary(args, f64::exp));
        table.register("FIX", 1, |args| unary(args, f64::floor));
        table.register("FUP", 1, |args| unary(args, f64::ceil));
        table.register("ROUND", 1, |args| unary(args, f64::round));
        table.register("LN", 1, |args| unary(args, f64::ln));
        table.register("SIN", 1, |args| unary(args, |x| x.to_radians().sin()));
        table.register("SQRT", 1, |args| unary(args, f64::sqrt));
        table.register("TAN", 1, |args| unary(args, |x| x.to_radians().tan()));
        table.register("ATAN", 2, |args| {
            let y = number(&args[0])?;
            let x = number(&args[1])?;
            Ok(Value::Float(y.atan2(x).to_degrees()))
        });
        table
    }

    pub fn register(&mut self, name: &str, arity: usize, run: NativeFn) {
        self.entries
            .insert(name.to_string(), Function { arity, run });
    }

    pub fn get(&self, name: &str) -> Option<(usize, NativeFn)> {
        self.entries.get(name).map(|f| (f.arity, f.run))
    }
}

fn number(value: &Value) -> Result<f64, ValueError> {
    value.as_float().ok_or(ValueError::Type {
        operation: "apply a function to",
        operand: value.type_name(),
    })
}

fn unary(args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value, ValueError> {
    Ok(Value::Float(f(number(&args[0])?)))
}
