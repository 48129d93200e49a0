use std::{error::Error, fmt::Display};

use crate::ast::{BinaryVerb, TypeName};

/// A runtime problem inside one statement. These never escape execution:
/// the statement runner turns them into diagnostic output lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError(pub String);

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for RuntimeError {}

/// A MiniPar runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn zero_of(ty: TypeName) -> Value {
        match ty {
            TypeName::Inteiro => Value::Int(0),
            TypeName::Real => Value::Real(0.0),
            TypeName::StringType => Value::Str(String::new()),
            TypeName::Bool => Value::Bool(false),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Real(value) => *value != 0.0,
            Value::Str(value) => !value.is_empty(),
        }
    }

    pub fn as_index(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(value) => Ok(*value),
            Value::Real(value) => Ok(*value as i64),
            other => Err(RuntimeError(format!(
                "índice de array inválido: '{other}'"
            ))),
        }
    }

    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(value) => Ok(*value),
            Value::Real(value) => Ok(*value as i64),
            other => Err(RuntimeError(format!("valor não numérico: '{other}'"))),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn apply(verb: BinaryVerb, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
        match verb {
            BinaryVerb::Add => Value::add(lhs, rhs),
            BinaryVerb::Sub => Value::arithmetic(lhs, rhs, "-", |a, b| a - b, |a, b| a - b),
            BinaryVerb::Mul => Value::arithmetic(lhs, rhs, "*", |a, b| a * b, |a, b| a * b),
            BinaryVerb::Div => Value::div(lhs, rhs),
            _ => Value::compare(verb, lhs, rhs),
        }
    }

    fn add(lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
        if let (Value::Str(lhs), Value::Str(rhs)) = (&lhs, &rhs) {
            return Ok(Value::Str(format!("{lhs}{rhs}")));
        }
        Value::arithmetic(lhs, rhs, "+", |a, b| a + b, |a, b| a + b)
    }

    fn arithmetic(
        lhs: Value,
        rhs: Value,
        op: &str,
        int_op: impl Fn(i64, i64) -> i64,
        real_op: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, RuntimeError> {
        match (&lhs, &rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Real(real_op(a, b))),
                _ => Err(RuntimeError(format!(
                    "operação '{op}' inválida entre '{lhs}' e '{rhs}'"
                ))),
            },
        }
    }

    /// Division always produces a real; dividing by zero yields 0 instead of
    /// stopping execution.
    fn div(lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
        match (lhs.as_f64(), rhs.as_f64()) {
            (Some(_), Some(b)) if b == 0.0 => Ok(Value::Int(0)),
            (Some(a), Some(b)) => Ok(Value::Real(a / b)),
            _ => Err(RuntimeError(format!(
                "operação '/' inválida entre '{lhs}' e '{rhs}'"
            ))),
        }
    }

    fn compare(verb: BinaryVerb, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
        let ordering = match (&lhs, &rhs) {
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        };

        let Some(ordering) = ordering else {
            return Err(RuntimeError(format!(
                "comparação '{verb}' inválida entre '{lhs}' e '{rhs}'"
            )));
        };

        let result = match verb {
            BinaryVerb::Equal => ordering.is_eq(),
            BinaryVerb::NotEqual => !ordering.is_eq(),
            BinaryVerb::LessThan => ordering.is_lt(),
            BinaryVerb::GreaterThan => ordering.is_gt(),
            BinaryVerb::LessEqual => ordering.is_le(),
            BinaryVerb::GreaterEqual => ordering.is_ge(),
            _ => unreachable!("arithmetic verb in compare"),
        };

        Ok(Value::Bool(result))
    }

    pub fn negate(self) -> Result<Value, RuntimeError> {
        match self {
            Value::Int(value) => Ok(Value::Int(-value)),
            Value::Real(value) => Ok(Value::Real(-value)),
            other => Err(RuntimeError(format!(
                "operador '-' unário inválido para '{other}'"
            ))),
        }
    }
}

impl Display for Value {
    /// Output formatting of `escreva`: reals collapse to integers when
    /// integral, print four decimal places otherwise, and tiny magnitudes
    /// flush to `0.0000`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Real(value) => {
                if value.abs() < 1e-10 {
                    write!(f, "0.0000")
                } else if value.fract() == 0.0 {
                    write!(f, "{}", *value as i64)
                } else {
                    write!(f, "{value:.4}")
                }
            }
            Value::Str(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{}", if *value { "True" } else { "False" }),
        }
    }
}
