//! Indented text rendering of an AST, the `ast` field of a compile result.

use super::{Expression, Program, Statement};

pub fn format_tree(program: &Program) -> String {
    let mut out = String::new();
    push_line(&mut out, 0, "programa_minipar");

    for statement in &program.body {
        fmt_statement(statement, 1, &mut out);
    }

    out
}

fn push_line(out: &mut String, level: usize, text: &str) {
    for _ in 0..level {
        out.push_str("  ");
    }
    out.push_str("- ");
    out.push_str(text);
    out.push('\n');
}

fn push_leaf(out: &mut String, level: usize, value: &str) {
    push_line(out, level, &format!("'{value}'"));
}

fn fmt_statement(statement: &Statement, level: usize, out: &mut String) {
    match statement {
        Statement::SeqBlock(body) => {
            push_line(out, level, "bloco_seq");
            for statement in body {
                fmt_statement(statement, level + 1, out);
            }
        }
        Statement::ParBlock(body) => {
            push_line(out, level, "bloco_par");
            for statement in body {
                fmt_statement(statement, level + 1, out);
            }
        }
        Statement::VarDecl { name, ty } => {
            push_line(out, level, "declaracao_var");
            push_leaf(out, level + 1, name);
            push_leaf(out, level + 1, &ty.to_string());
        }
        Statement::ArrayDecl { name, ty, dims } => {
            push_line(out, level, "declaracao_var_array");
            push_leaf(out, level + 1, name);
            push_leaf(out, level + 1, &ty.to_string());
            for dim in dims {
                push_leaf(out, level + 1, &dim.to_string());
            }
        }
        Statement::Channel {
            name,
            endpoint1,
            endpoint2,
        } => {
            push_line(out, level, "c_channel");
            push_leaf(out, level + 1, name);
            push_leaf(out, level + 1, endpoint1);
            push_leaf(out, level + 1, endpoint2);
        }
        Statement::FuncDecl {
            name,
            params,
            ret,
            body,
        } => {
            push_line(out, level, "declaracao_funcao");
            push_leaf(out, level + 1, name);
            for param in params {
                push_line(out, level + 1, "param");
                push_leaf(out, level + 2, &param.name);
                push_leaf(out, level + 2, &param.ty.to_string());
            }
            push_leaf(out, level + 1, &ret.to_string());
            for statement in body {
                fmt_statement(statement, level + 1, out);
            }
        }
        Statement::Return(expr) => {
            push_line(out, level, "return");
            fmt_expression(expr, level + 1, out);
        }
        Statement::Assign { name, expr } => {
            push_line(out, level, "atribuicao");
            push_leaf(out, level + 1, name);
            fmt_expression(expr, level + 1, out);
        }
        Statement::ArrayAssign {
            name,
            indices,
            expr,
        } => {
            push_line(out, level, "atribuicao_array");
            push_leaf(out, level + 1, name);
            for index in indices {
                fmt_expression(index, level + 1, out);
            }
            fmt_expression(expr, level + 1, out);
        }
        Statement::If {
            cond,
            then_block,
            else_block,
        } => {
            push_line(out, level, "se");
            fmt_expression(cond, level + 1, out);
            for statement in then_block {
                fmt_statement(statement, level + 1, out);
            }
            if let Some(else_block) = else_block {
                for statement in else_block {
                    fmt_statement(statement, level + 1, out);
                }
            }
        }
        Statement::While { cond, body } => {
            push_line(out, level, "enquanto");
            fmt_expression(cond, level + 1, out);
            for statement in body {
                fmt_statement(statement, level + 1, out);
            }
        }
        Statement::For { var, lo, hi, body } => {
            push_line(out, level, "para");
            push_leaf(out, level + 1, var);
            push_line(out, level + 1, "intervalo");
            fmt_expression(lo, level + 2, out);
            fmt_expression(hi, level + 2, out);
            for statement in body {
                fmt_statement(statement, level + 1, out);
            }
        }
        Statement::Read(name) => {
            push_line(out, level, "leia");
            push_leaf(out, level + 1, name);
        }
        Statement::Write(exprs) => {
            push_line(out, level, "escreva");
            for expr in exprs {
                fmt_expression(expr, level + 1, out);
            }
        }
        Statement::Send { channel, args } => {
            push_line(out, level, "send");
            push_leaf(out, level + 1, channel);
            for arg in args {
                fmt_expression(arg, level + 1, out);
            }
        }
        Statement::Receive { channel, vars } => {
            push_line(out, level, "receive");
            push_leaf(out, level + 1, channel);
            for var in vars {
                push_leaf(out, level + 1, var);
            }
        }
        Statement::Call { name, args } => {
            push_line(out, level, "chamada_funcao");
            push_leaf(out, level + 1, name);
            for arg in args {
                fmt_expression(arg, level + 1, out);
            }
        }
    }
}

fn fmt_expression(expr: &Expression, level: usize, out: &mut String) {
    match expr {
        Expression::Int(value) => {
            push_line(out, level, "num_inteiro");
            push_leaf(out, level + 1, &value.to_string());
        }
        Expression::Real(value) => {
            push_line(out, level, "num_real");
            push_leaf(out, level + 1, &value.to_string());
        }
        Expression::Str(value) => {
            push_line(out, level, "string");
            push_line(out, level + 1, &format!("\"{value}\""));
        }
        Expression::Bool(value) => {
            push_line(out, level, "boolean");
            push_leaf(out, level + 1, if *value { "True" } else { "False" });
        }
        Expression::Id(name) => {
            push_line(out, level, "id");
            push_leaf(out, level + 1, name);
        }
        Expression::ArrayRef { name, indices } => {
            push_line(out, level, "acesso_array");
            push_leaf(out, level + 1, name);
            for index in indices {
                fmt_expression(index, level + 1, out);
            }
        }
        Expression::Binary { verb, lhs, rhs } => {
            push_line(out, level, "binop");
            push_leaf(out, level + 1, &verb.to_string());
            fmt_expression(lhs, level + 1, out);
            fmt_expression(rhs, level + 1, out);
        }
        Expression::Unary { verb, expr } => {
            push_line(out, level, "unop");
            push_leaf(out, level + 1, &verb.to_string());
            fmt_expression(expr, level + 1, out);
        }
        Expression::Call { name, args } => {
            push_line(out, level, "chamada_funcao");
            push_leaf(out, level + 1, name);
            for arg in args {
                fmt_expression(arg, level + 1, out);
            }
        }
    }
}
