//! Canonical source rendering of an AST.
//!
//! Every block gets its explicit terminator (`FIM_SE`, `FIM_ENQUANTO`), every
//! nested binary expression gets parentheses, so reparsing the rendered text
//! reproduces the tree.

use super::{Expression, Program, Statement};

pub fn to_source(program: &Program) -> String {
    let mut out = String::new();

    for statement in &program.body {
        emit_statement(statement, 0, &mut out);
    }

    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn emit_line(out: &mut String, level: usize, text: &str) {
    indent(out, level);
    out.push_str(text);
    out.push('\n');
}

fn emit_statement(statement: &Statement, level: usize, out: &mut String) {
    match statement {
        Statement::SeqBlock(body) => {
            emit_line(out, level, "SEQ :");
            for statement in body {
                emit_statement(statement, level + 1, out);
            }
        }
        Statement::ParBlock(body) => {
            emit_line(out, level, "PAR :");
            for statement in body {
                emit_statement(statement, level + 1, out);
            }
        }
        Statement::VarDecl { name, ty } => {
            let ty = type_source(ty);
            emit_line(out, level, &format!("DECLARE {name} : {ty}"));
        }
        Statement::ArrayDecl { name, ty, dims } => {
            let ty = type_source(ty);
            let dims: String = dims.iter().map(|d| format!(" [{d}]")).collect();
            emit_line(out, level, &format!("DECLARE {name} : {ty}{dims}"));
        }
        Statement::Channel {
            name,
            endpoint1,
            endpoint2,
        } => {
            emit_line(out, level, &format!("c_channel {name} {endpoint1} {endpoint2}"));
        }
        Statement::FuncDecl {
            name,
            params,
            ret,
            body,
        } => {
            let params = params
                .iter()
                .map(|p| format!("{} : {}", p.name, type_source(&p.ty)))
                .collect::<Vec<_>>()
                .join(" , ");
            let ret = type_source(ret);
            emit_line(out, level, &format!("DEF {name} ( {params} ) : {ret} :"));
            for statement in body {
                emit_statement(statement, level + 1, out);
            }
        }
        Statement::Return(expr) => {
            emit_line(out, level, &format!("RETURN {}", expr_source(expr)));
        }
        Statement::Assign { name, expr } => {
            emit_line(out, level, &format!("{name} = {}", expr_source(expr)));
        }
        Statement::ArrayAssign {
            name,
            indices,
            expr,
        } => {
            let indices: String = indices
                .iter()
                .map(|i| format!("[ {} ]", expr_source(i)))
                .collect();
            emit_line(out, level, &format!("{name} {indices} = {}", expr_source(expr)));
        }
        Statement::If {
            cond,
            then_block,
            else_block,
        } => {
            emit_line(out, level, &format!("SE {} ENTAO :", expr_source(cond)));
            for statement in then_block {
                emit_statement(statement, level + 1, out);
            }
            if let Some(else_block) = else_block {
                emit_line(out, level, "SENAO :");
                for statement in else_block {
                    emit_statement(statement, level + 1, out);
                }
            }
            emit_line(out, level, "FIM_SE");
        }
        Statement::While { cond, body } => {
            emit_line(out, level, &format!("ENQUANTO {} FACA :", expr_source(cond)));
            for statement in body {
                emit_statement(statement, level + 1, out);
            }
            emit_line(out, level, "FIM_ENQUANTO");
        }
        Statement::For { var, lo, hi, body } => {
            emit_line(
                out,
                level,
                &format!("PARA {var} EM {} .. {}", expr_source(lo), expr_source(hi)),
            );
            for statement in body {
                emit_statement(statement, level + 1, out);
            }
        }
        Statement::Read(name) => {
            emit_line(out, level, &format!("LEIA ( {name} )"));
        }
        Statement::Write(exprs) => {
            emit_line(out, level, &format!("ESCREVA ( {} )", expr_list(exprs)));
        }
        Statement::Send { channel, args } => {
            emit_line(out, level, &format!("{channel} . send ( {} )", expr_list(args)));
        }
        Statement::Receive { channel, vars } => {
            emit_line(
                out,
                level,
                &format!("{channel} . receive ( {} )", vars.join(" , ")),
            );
        }
        Statement::Call { name, args } => {
            emit_line(out, level, &format!("{name} ( {} )", expr_list(args)));
        }
    }
}

fn type_source(ty: &super::TypeName) -> &'static str {
    match ty {
        super::TypeName::Inteiro => "INTEIRO",
        super::TypeName::Real => "REAL",
        super::TypeName::StringType => "STRING",
        super::TypeName::Bool => "BOOL",
    }
}

fn expr_list(exprs: &[Expression]) -> String {
    exprs
        .iter()
        .map(expr_source)
        .collect::<Vec<_>>()
        .join(" , ")
}

fn expr_source(expr: &Expression) -> String {
    match expr {
        Expression::Int(value) => value.to_string(),
        Expression::Real(value) => {
            if value.fract() == 0.0 {
                format!("{value:.1}")
            } else {
                value.to_string()
            }
        }
        Expression::Str(value) => format!("\"{value}\""),
        Expression::Bool(true) => "verdadeiro".to_owned(),
        Expression::Bool(false) => "falso".to_owned(),
        Expression::Id(name) => name.clone(),
        Expression::ArrayRef { name, indices } => {
            let indices: String = indices
                .iter()
                .map(|i| format!(" [ {} ]", expr_source(i)))
                .collect();
            format!("{name}{indices}")
        }
        Expression::Binary { verb, lhs, rhs } => {
            format!("( {} {verb} {} )", expr_source(lhs), expr_source(rhs))
        }
        Expression::Unary { verb, expr } => format!("{verb} {}", expr_source(expr)),
        Expression::Call { name, args } => format!("{name} ( {} )", expr_list(args)),
    }
}
