use std::fmt::Display;

use super::{BinaryVerb, Expression};

/// Declared type of a variable, array, parameter, or function result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Inteiro,
    Real,
    StringType,
    Bool,
}

impl Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TypeName::Inteiro => "INTEIRO",
            TypeName::Real => "REAL",
            TypeName::StringType => "STRING_TYPE",
            TypeName::Bool => "BOOL",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    SeqBlock(Vec<Statement>),
    ParBlock(Vec<Statement>),
    VarDecl {
        name: String,
        ty: TypeName,
    },
    ArrayDecl {
        name: String,
        ty: TypeName,
        dims: Vec<i64>,
    },
    Channel {
        name: String,
        endpoint1: String,
        endpoint2: String,
    },
    FuncDecl {
        name: String,
        params: Vec<Param>,
        ret: TypeName,
        body: Vec<Statement>,
    },
    Return(Expression),
    Assign {
        name: String,
        expr: Expression,
    },
    ArrayAssign {
        name: String,
        indices: Vec<Expression>,
        expr: Expression,
    },
    If {
        cond: Expression,
        then_block: Vec<Statement>,
        else_block: Option<Vec<Statement>>,
    },
    While {
        cond: Expression,
        body: Vec<Statement>,
    },
    For {
        var: String,
        lo: Expression,
        hi: Expression,
        body: Vec<Statement>,
    },
    Read(String),
    Write(Vec<Expression>),
    Send {
        channel: String,
        args: Vec<Expression>,
    },
    Receive {
        channel: String,
        vars: Vec<String>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

impl Statement {
    /// Whether this statement is `var = var + <something>`, the shape the
    /// loop repairs relocate.
    pub fn is_increment_of(&self, var: &str) -> bool {
        let Statement::Assign { name, expr } = self else {
            return false;
        };

        if name != var {
            return false;
        }

        let Expression::Binary { verb, lhs, .. } = expr else {
            return false;
        };

        *verb == BinaryVerb::Add && matches!(lhs.as_ref(), Expression::Id(lhs) if lhs == var)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Statement::SeqBlock(_) | Statement::ParBlock(_))
    }
}

/// A whole parsed MiniPar program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
}

impl Program {
    pub fn from_statements(body: Vec<Statement>) -> Self {
        Self { body }
    }
}
