//! Structural post-passes applied while reducing the grammar.
//!
//! The greedy statement lists pull loop increments into inner `se` arms and
//! inner loops, and pull trailing program statements into `def` bodies. Both
//! relocations happen here, at parse time, so later passes see a body that
//! matches the writer's intent.

use log::debug;

use crate::ast::{Param, Statement};

/// Repair the body of a `while` whose control variable is `control_var`.
///
/// Two relocations, both conservative:
/// - an increment of `control_var` buried in a nested loop over a different
///   variable (or in `se` arms inside that loop) is moved to just after the
///   nested loop;
/// - when the body never assigns the control variable at its own level, an
///   increment hidden in a direct `se` arm is moved to the end of the body.
///
/// An increment that sits after a nested loop at the outer level is only
/// pulled in when no write follows it; the write marks the end of the loop
/// as the writer saw it.
pub fn relocate_loop_increments(
    control_var: Option<&str>,
    body: Vec<Statement>,
) -> Vec<Statement> {
    let Some(var) = control_var else {
        return body;
    };

    let mut body = relocate_from_nested_loops(var, body);

    // only loops that never touch their control variable at this level get
    // the conditional-arm extraction; a loop that pops the variable keeps
    // its conditional pushes where the writer put them
    let updates_control = body
        .iter()
        .any(|s| matches!(s, Statement::Assign { name, .. } if name == var));
    if !updates_control {
        let mut found = vec![];
        body = body
            .into_iter()
            .map(|statement| match statement {
                Statement::If {
                    cond,
                    then_block,
                    else_block,
                } => {
                    let (then_block, mut t) = extract_increments(then_block, var);
                    found.append(&mut t);
                    let else_block = else_block.map(|block| {
                        let (block, mut e) = extract_increments(block, var);
                        found.append(&mut e);
                        block
                    });
                    Statement::If {
                        cond,
                        then_block,
                        else_block,
                    }
                }
                other => other,
            })
            .collect();

        if let Some(increment) = found.into_iter().next() {
            debug!("relocating increment of '{var}' out of a conditional arm");
            body.push(increment);
        }
    }

    body
}

fn relocate_from_nested_loops(var: &str, body: Vec<Statement>) -> Vec<Statement> {
    let mut body = body;
    let mut result = vec![];
    let mut i = 0;

    while i < body.len() {
        let Statement::While {
            cond,
            body: inner_body,
        } = body[i].clone()
        else {
            result.push(body[i].clone());
            i += 1;
            continue;
        };

        let inner_var = cond.control_variable().map(str::to_owned);
        let mut inner_body = inner_body;
        let mut relocated = None;

        if inner_var.as_deref().is_some_and(|inner| inner != var) {
            // first look inside the nested loop, se arms included
            let (filtered, mut found) = extract_increments(inner_body, var);
            inner_body = filtered;
            if !found.is_empty() {
                relocated = Some(found.remove(0));
            }

            // then right after the nested loop at this level, stopping at
            // anything that anchors the loop boundary
            if relocated.is_none() {
                let mut j = i + 1;
                while j < body.len() {
                    let anchors = matches!(
                        body[j],
                        Statement::Write(_)
                            | Statement::If { .. }
                            | Statement::While { .. }
                            | Statement::Read(_)
                    );
                    if anchors {
                        break;
                    }

                    if body[j].is_increment_of(var) {
                        let write_follows = body[j + 1..]
                            .iter()
                            .any(|s| matches!(s, Statement::Write(_)));
                        if !write_follows {
                            relocated = Some(body.remove(j));
                        }
                        break;
                    }

                    j += 1;
                }
            }
        }

        // deeper nesting levels may hide more of them
        let inner_body = relocate_from_nested_loops(var, inner_body);

        result.push(Statement::While {
            cond,
            body: inner_body,
        });

        if let Some(increment) = relocated {
            debug!("relocating increment of '{var}' out of a nested loop");
            result.push(increment);
        }

        i += 1;
    }

    result
}

/// Remove every `var = var + k` from `body`, descending into `se` arms but
/// not into nested loops, which own their increments.
fn extract_increments(body: Vec<Statement>, var: &str) -> (Vec<Statement>, Vec<Statement>) {
    let mut filtered = vec![];
    let mut found = vec![];

    for statement in body {
        if statement.is_increment_of(var) {
            found.push(statement);
            continue;
        }

        match statement {
            Statement::If {
                cond,
                then_block,
                else_block,
            } => {
                let (then_block, mut t) = extract_increments(then_block, var);
                found.append(&mut t);
                let else_block = else_block.map(|block| {
                    let (block, mut e) = extract_increments(block, var);
                    found.append(&mut e);
                    block
                });
                filtered.push(Statement::If {
                    cond,
                    then_block,
                    else_block,
                });
            }
            other => filtered.push(other),
        }
    }

    (filtered, found)
}

/// Split a greedily parsed function body into the real body and the trailing
/// statements that belong to the enclosing list.
///
/// The cut point is the first nested function declaration, failing that the
/// first assignment to a non-parameter, then the first write, then the first
/// loop. When none of those markers exists the body ends right after its
/// first top-level `return`.
pub fn split_function_body(
    params: &[Param],
    body: Vec<Statement>,
) -> (Vec<Statement>, Vec<Statement>) {
    let mut first_func = None;
    let mut first_assign = None;
    let mut first_write = None;
    let mut first_while = None;

    for (i, statement) in body.iter().enumerate() {
        match statement {
            Statement::FuncDecl { .. } => {
                first_func = Some(i);
                break;
            }
            Statement::Assign { name, .. } if first_assign.is_none() => {
                if !params.iter().any(|p| &p.name == name) {
                    first_assign = Some(i);
                }
            }
            Statement::Write(_) if first_write.is_none() => first_write = Some(i),
            Statement::While { .. } if first_while.is_none() => first_while = Some(i),
            _ => {}
        }
    }

    let cut = first_func.or(first_assign).or(first_write).or(first_while);

    if let Some(cut) = cut {
        let mut body = body;
        let extras = body.split_off(cut);
        debug!("lifting {} trailing statement(s) out of a function body", extras.len());
        return (body, extras);
    }

    if let Some(ret) = body
        .iter()
        .position(|s| matches!(s, Statement::Return(_)))
    {
        if ret + 1 < body.len() {
            let mut body = body;
            let extras = body.split_off(ret + 1);
            return (body, extras);
        }
    }

    (body, vec![])
}
