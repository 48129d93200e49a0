//! Three-address code for MiniPar.
//!
//! Instructions print as the whitespace-delimited lines later consumed by the
//! ARMv7 generator: temporaries are `t1, t2, …`, labels `L1, L2, …`, both
//! from monotone counters. Code emitted inside a function body lands in that
//! function's buffer, everything else in the top-level buffer.
use std::{collections::HashMap, fmt::Display};

use crate::ast::{Expression, Program, Statement, TypeName, UnaryVerb};

#[derive(Debug, Clone, PartialEq)]
pub enum Tac {
    StartProgram,
    EndProgram,
    FuncBegin(String),
    FuncEnd(String),
    Param(String),
    Return(String),
    Label(String),
    Goto(String),
    IfGoto {
        cond: String,
        label: String,
    },
    Write(String),
    Read(String),
    PushParam(String),
    StringDef {
        label: String,
        value: String,
    },
    ChannelDef {
        name: String,
        endpoint1: String,
        endpoint2: String,
    },
    SendParam(String),
    Send {
        channel: String,
        count: usize,
    },
    Receive {
        channel: String,
        count: usize,
    },
    GetRecvParam {
        dest: String,
        index: usize,
    },
    ArrayAddr {
        dest: String,
        array: String,
        indices: Vec<String>,
    },
    ArrayStore {
        addr: String,
        value: String,
    },
    ArrayLoad {
        dest: String,
        addr: String,
    },
    Copy {
        dest: String,
        src: String,
    },
    CallAssign {
        dest: String,
        func: String,
        count: usize,
    },
    BinOp {
        dest: String,
        lhs: String,
        op: String,
        rhs: String,
    },
}

impl Display for Tac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tac::StartProgram => write!(f, "START_PROGRAM"),
            Tac::EndProgram => write!(f, "END_PROGRAM"),
            Tac::FuncBegin(name) => write!(f, "FUNC_BEGIN {name}"),
            Tac::FuncEnd(name) => write!(f, "FUNC_END {name}"),
            Tac::Param(name) => write!(f, "PARAM {name}"),
            Tac::Return(value) => write!(f, "RETURN {value}"),
            Tac::Label(label) => write!(f, "LABEL {label}"),
            Tac::Goto(label) => write!(f, "GOTO {label}"),
            Tac::IfGoto { cond, label } => write!(f, "IF_GOTO {cond} {label}"),
            Tac::Write(value) => write!(f, "WRITE {value}"),
            Tac::Read(name) => write!(f, "READ {name}"),
            Tac::PushParam(value) => write!(f, "PUSH_PARAM {value}"),
            Tac::StringDef { label, value } => write!(f, "STRING_DEF {label} \"{value}\""),
            Tac::ChannelDef {
                name,
                endpoint1,
                endpoint2,
            } => write!(f, "CHANNEL_DEF {name} {endpoint1} {endpoint2}"),
            Tac::SendParam(value) => write!(f, "SEND_PARAM {value}"),
            Tac::Send { channel, count } => write!(f, "SEND {channel} {count}"),
            Tac::Receive { channel, count } => write!(f, "RECEIVE {channel} {count}"),
            Tac::GetRecvParam { dest, index } => write!(f, "GET_RECV_PARAM {dest} {index}"),
            Tac::ArrayAddr {
                dest,
                array,
                indices,
            } => {
                write!(f, "{dest} = ARRAY_ADDR {array}")?;
                for index in indices {
                    write!(f, " {index}")?;
                }
                Ok(())
            }
            Tac::ArrayStore { addr, value } => write!(f, "ARRAY_STORE {addr} = {value}"),
            Tac::ArrayLoad { dest, addr } => write!(f, "{dest} = ARRAY_LOAD {addr}"),
            Tac::Copy { dest, src } => write!(f, "{dest} = {src}"),
            Tac::CallAssign { dest, func, count } => write!(f, "{dest} = CALL {func} {count}"),
            Tac::BinOp { dest, lhs, op, rhs } => write!(f, "{dest} = {lhs} {op} {rhs}"),
        }
    }
}

/// Size and element type of a declared array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInfo {
    pub dimensions: Vec<i64>,
    pub total_size: i64,
    pub ty: TypeName,
}

/// The generator's output: the top-level buffer, one buffer per function in
/// declaration order, and the variable bookkeeping the assembly pass needs.
#[derive(Debug, Default)]
pub struct TacProgram {
    pub code: Vec<Tac>,
    pub functions: Vec<(String, Vec<Tac>)>,
    pub declared_vars: Vec<String>,
    pub array_sizes: HashMap<String, ArrayInfo>,
}

impl TacProgram {
    /// Flat textual listing: the main buffer followed by each function's.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.code.iter().map(Tac::to_string).collect();
        for (_, code) in &self.functions {
            lines.extend(code.iter().map(Tac::to_string));
        }
        lines
    }
}

#[derive(Default)]
pub struct TacGenerator {
    program: TacProgram,
    current_function: Option<usize>,
    temp_count: usize,
    label_count: usize,
}

impl TacGenerator {
    pub fn generate(program: &Program) -> TacProgram {
        let mut generator = TacGenerator::default();

        generator.emit(Tac::StartProgram);
        for statement in &program.body {
            generator.visit_statement(statement);
        }
        generator.emit(Tac::EndProgram);

        generator.program
    }

    fn emit(&mut self, instruction: Tac) {
        match self.current_function {
            Some(index) => self.program.functions[index].1.push(instruction),
            None => self.program.code.push(instruction),
        }
    }

    fn new_temp(&mut self) -> String {
        self.temp_count += 1;
        format!("t{}", self.temp_count)
    }

    fn new_label(&mut self) -> String {
        self.label_count += 1;
        format!("L{}", self.label_count)
    }

    fn declare(&mut self, name: &str) {
        if !self.program.declared_vars.iter().any(|v| v == name) {
            self.program.declared_vars.push(name.to_owned());
        }
    }

    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::SeqBlock(body) | Statement::ParBlock(body) => {
                for statement in body {
                    self.visit_statement(statement);
                }
            }
            Statement::VarDecl { name, .. } => self.declare(name),
            Statement::ArrayDecl { name, ty, dims } => {
                self.declare(name);
                let total_size = dims.iter().product();
                self.program.array_sizes.insert(
                    name.clone(),
                    ArrayInfo {
                        dimensions: dims.clone(),
                        total_size,
                        ty: *ty,
                    },
                );
            }
            Statement::Channel {
                name,
                endpoint1,
                endpoint2,
            } => {
                self.declare(name);
                self.emit(Tac::ChannelDef {
                    name: name.clone(),
                    endpoint1: endpoint1.clone(),
                    endpoint2: endpoint2.clone(),
                });
            }
            Statement::FuncDecl {
                name, params, body, ..
            } => {
                self.program.functions.push((name.clone(), vec![]));
                self.current_function = Some(self.program.functions.len() - 1);

                self.emit(Tac::FuncBegin(name.clone()));
                for param in params {
                    self.emit(Tac::Param(param.name.clone()));
                    self.declare(&param.name);
                }

                for statement in body {
                    self.visit_statement(statement);
                }

                self.emit(Tac::FuncEnd(name.clone()));
                self.current_function = None;
            }
            Statement::Return(expr) => {
                let value = self.visit_expression(expr);
                self.emit(Tac::Return(value));
            }
            Statement::Assign { name, expr } => {
                let src = self.visit_expression(expr);
                self.declare(name);
                self.emit(Tac::Copy {
                    dest: name.clone(),
                    src,
                });
            }
            Statement::ArrayAssign {
                name,
                indices,
                expr,
            } => {
                let value = self.visit_expression(expr);
                let indices: Vec<String> =
                    indices.iter().map(|i| self.visit_expression(i)).collect();

                let addr = self.new_temp();
                self.emit(Tac::ArrayAddr {
                    dest: addr.clone(),
                    array: name.clone(),
                    indices,
                });
                self.emit(Tac::ArrayStore { addr, value });
            }
            Statement::If {
                cond,
                then_block,
                else_block,
            } => self.visit_if(cond, then_block, else_block.as_deref()),
            Statement::While { cond, body } => self.visit_while(cond, body),
            Statement::For { var, lo, hi, body } => self.visit_for(var, lo, hi, body),
            Statement::Read(name) => {
                self.declare(name);
                self.emit(Tac::Read(name.clone()));
            }
            Statement::Write(exprs) => {
                let results: Vec<String> =
                    exprs.iter().map(|e| self.visit_expression(e)).collect();
                for result in results {
                    self.emit(Tac::Write(result));
                }
            }
            Statement::Send { channel, args } => {
                let results: Vec<String> =
                    args.iter().map(|a| self.visit_expression(a)).collect();
                let count = results.len();
                for result in results {
                    self.emit(Tac::SendParam(result));
                }
                self.emit(Tac::Send {
                    channel: channel.clone(),
                    count,
                });
            }
            Statement::Receive { channel, vars } => {
                self.emit(Tac::Receive {
                    channel: channel.clone(),
                    count: vars.len(),
                });
                for (index, var) in vars.iter().enumerate() {
                    let temp = self.new_temp();
                    self.emit(Tac::GetRecvParam {
                        dest: temp.clone(),
                        index,
                    });
                    self.declare(var);
                    self.emit(Tac::Copy {
                        dest: var.clone(),
                        src: temp,
                    });
                }
            }
            Statement::Call { name, args } => {
                self.visit_call(name, args);
            }
        }
    }

    fn visit_if(
        &mut self,
        cond: &Expression,
        then_block: &[Statement],
        else_block: Option<&[Statement]>,
    ) {
        let cond_result = self.visit_expression(cond);

        let label_then = self.new_label();
        let label_else = self.new_label();
        let label_end = self.new_label();

        self.emit(Tac::IfGoto {
            cond: cond_result,
            label: label_then.clone(),
        });
        if else_block.is_some() {
            self.emit(Tac::Goto(label_else.clone()));
        } else {
            self.emit(Tac::Goto(label_end.clone()));
        }

        self.emit(Tac::Label(label_then));
        for statement in then_block {
            self.visit_statement(statement);
        }
        self.emit(Tac::Goto(label_end.clone()));

        if let Some(else_block) = else_block {
            self.emit(Tac::Label(label_else));
            for statement in else_block {
                self.visit_statement(statement);
            }
        }

        self.emit(Tac::Label(label_end));
    }

    fn visit_while(&mut self, cond: &Expression, body: &[Statement]) {
        let label_start = self.new_label();
        let label_body = self.new_label();
        let label_end = self.new_label();

        self.emit(Tac::Label(label_start.clone()));
        let cond_result = self.visit_expression(cond);

        self.emit(Tac::IfGoto {
            cond: cond_result,
            label: label_body.clone(),
        });
        self.emit(Tac::Goto(label_end.clone()));

        self.emit(Tac::Label(label_body));
        for statement in body {
            self.visit_statement(statement);
        }

        self.emit(Tac::Goto(label_start));
        self.emit(Tac::Label(label_end));
    }

    fn visit_for(&mut self, var: &str, lo: &Expression, hi: &Expression, body: &[Statement]) {
        let start_val = self.visit_expression(lo);
        let end_val = self.visit_expression(hi);

        let label_start = self.new_label();
        let label_body = self.new_label();
        let label_end = self.new_label();

        self.declare(var);
        self.emit(Tac::Copy {
            dest: var.to_owned(),
            src: start_val,
        });
        self.emit(Tac::Label(label_start.clone()));

        let cond = self.new_temp();
        self.emit(Tac::BinOp {
            dest: cond.clone(),
            lhs: var.to_owned(),
            op: "<=".to_owned(),
            rhs: end_val,
        });

        self.emit(Tac::IfGoto {
            cond,
            label: label_body.clone(),
        });
        self.emit(Tac::Goto(label_end.clone()));

        self.emit(Tac::Label(label_body));
        for statement in body {
            self.visit_statement(statement);
        }

        self.emit(Tac::BinOp {
            dest: var.to_owned(),
            lhs: var.to_owned(),
            op: "+".to_owned(),
            rhs: "1".to_owned(),
        });
        self.emit(Tac::Goto(label_start));
        self.emit(Tac::Label(label_end));
    }

    fn visit_call(&mut self, name: &str, args: &[Expression]) -> String {
        let results: Vec<String> = args.iter().map(|a| self.visit_expression(a)).collect();

        for result in results {
            self.emit(Tac::PushParam(result));
        }

        let dest = self.new_temp();
        self.emit(Tac::CallAssign {
            dest: dest.clone(),
            func: name.to_owned(),
            count: args.len(),
        });
        dest
    }

    fn visit_expression(&mut self, expr: &Expression) -> String {
        match expr {
            Expression::Int(value) => value.to_string(),
            Expression::Real(value) => format_real(*value),
            Expression::Str(value) => {
                let label = self.new_label();
                self.emit(Tac::StringDef {
                    label: label.clone(),
                    value: value.clone(),
                });
                label
            }
            Expression::Bool(value) => if *value { "1" } else { "0" }.to_owned(),
            Expression::Id(name) => {
                self.declare(name);
                name.clone()
            }
            Expression::ArrayRef { name, indices } => {
                let indices: Vec<String> =
                    indices.iter().map(|i| self.visit_expression(i)).collect();

                let addr = self.new_temp();
                let value = self.new_temp();
                self.emit(Tac::ArrayAddr {
                    dest: addr.clone(),
                    array: name.clone(),
                    indices,
                });
                self.emit(Tac::ArrayLoad {
                    dest: value.clone(),
                    addr,
                });
                value
            }
            Expression::Binary { verb, lhs, rhs } => {
                let lhs = self.visit_expression(lhs);
                let rhs = self.visit_expression(rhs);

                let dest = self.new_temp();
                self.emit(Tac::BinOp {
                    dest: dest.clone(),
                    lhs,
                    op: verb.to_string(),
                    rhs,
                });
                dest
            }
            Expression::Unary { verb, expr } => {
                let result = self.visit_expression(expr);
                let dest = self.new_temp();
                match verb {
                    UnaryVerb::Neg => self.emit(Tac::BinOp {
                        dest: dest.clone(),
                        lhs: "0".to_owned(),
                        op: "-".to_owned(),
                        rhs: result,
                    }),
                }
                dest
            }
            Expression::Call { name, args } => self.visit_call(name, args),
        }
    }
}

/// Real literals keep their decimal point in the textual TAC so the assembly
/// pass can tell them from integers.
fn format_real(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::Parser};
    use std::collections::HashSet;

    fn generate(source: &str) -> TacProgram {
        let (program, errors) = Parser::new(Lexer::new(source).lex()).parse();
        assert!(errors.is_empty(), "syntax errors: {errors:?}");
        TacGenerator::generate(&program.expect("no AST"))
    }

    /// Every label referenced by GOTO/IF_GOTO must be defined exactly once
    /// in the same buffer.
    fn assert_labels_closed(buffer: &[Tac]) {
        let mut defined = HashSet::new();
        for instruction in buffer {
            if let Tac::Label(label) = instruction {
                assert!(defined.insert(label.clone()), "label {label} defined twice");
            }
        }
        for instruction in buffer {
            let referenced = match instruction {
                Tac::Goto(label) => Some(label),
                Tac::IfGoto { label, .. } => Some(label),
                _ => None,
            };
            if let Some(label) = referenced {
                assert!(defined.contains(label), "label {label} undefined");
            }
        }
    }

    #[test]
    fn test_assignment_lowering() {
        let tac = generate("x = 10\ny = x + 5");

        assert_eq!(
            tac.lines(),
            vec![
                "START_PROGRAM",
                "x = 10",
                "t1 = x + 5",
                "y = t1",
                "END_PROGRAM",
            ]
        );
    }

    #[test]
    fn test_while_lowering_shape() {
        let tac = generate("ENQUANTO i < 3 FACA :\ni = i + 1\nFIM_ENQUANTO");

        assert_eq!(
            tac.lines(),
            vec![
                "START_PROGRAM",
                "LABEL L1",
                "t1 = i < 3",
                "IF_GOTO t1 L2",
                "GOTO L3",
                "LABEL L2",
                "t2 = i + 1",
                "i = t2",
                "GOTO L1",
                "LABEL L3",
                "END_PROGRAM",
            ]
        );
        assert_labels_closed(&tac.code);
    }

    #[test]
    fn test_if_else_lowering_shape() {
        let tac = generate("SE x < 1 ENTAO :\ny = 1\nSENAO :\ny = 2\nFIM_SE");

        assert_eq!(
            tac.lines(),
            vec![
                "START_PROGRAM",
                "t1 = x < 1",
                "IF_GOTO t1 L1",
                "GOTO L2",
                "LABEL L1",
                "y = 1",
                "GOTO L3",
                "LABEL L2",
                "y = 2",
                "LABEL L3",
                "END_PROGRAM",
            ]
        );
        assert_labels_closed(&tac.code);
    }

    #[test]
    fn test_for_lowering_counts_inclusive() {
        let tac = generate("PARA i EM 0 .. 3\ns = s + i");

        let lines = tac.lines();
        assert!(lines.contains(&"i = 0".to_owned()));
        assert!(lines.contains(&"t1 = i <= 3".to_owned()));
        assert!(lines.contains(&"i = i + 1".to_owned()));
        assert_labels_closed(&tac.code);
    }

    #[test]
    fn test_function_code_goes_to_its_own_buffer() {
        let tac = generate(
            "DEF soma ( a : INTEIRO , b : INTEIRO ) : INTEIRO :\n\
             RETURN a + b\n\
             x = soma ( 1 , 2 )",
        );

        assert_eq!(tac.functions.len(), 1);
        let (name, code) = &tac.functions[0];
        assert_eq!(name, "soma");
        assert_eq!(
            code.iter().map(Tac::to_string).collect::<Vec<_>>(),
            vec![
                "FUNC_BEGIN soma",
                "PARAM a",
                "PARAM b",
                "t1 = a + b",
                "RETURN t1",
                "FUNC_END soma",
            ]
        );

        // call site stays in the main buffer
        let main: Vec<String> = tac.code.iter().map(Tac::to_string).collect();
        assert!(main.contains(&"PUSH_PARAM 1".to_owned()));
        assert!(main.contains(&"PUSH_PARAM 2".to_owned()));
        assert!(main.contains(&"t2 = CALL soma 2".to_owned()));
    }

    #[test]
    fn test_array_assignment_lowering() {
        let tac = generate("DECLARE a : INTEIRO [4]\na[2] = 7");

        assert_eq!(
            tac.lines(),
            vec![
                "START_PROGRAM",
                "t1 = ARRAY_ADDR a 2",
                "ARRAY_STORE t1 = 7",
                "END_PROGRAM",
            ]
        );
        assert_eq!(tac.array_sizes["a"].total_size, 4);
    }

    #[test]
    fn test_array_access_lowering() {
        let tac = generate("DECLARE a : INTEIRO [4]\nx = a[1]");

        assert_eq!(
            tac.lines(),
            vec![
                "START_PROGRAM",
                "t1 = ARRAY_ADDR a 1",
                "t2 = ARRAY_LOAD t1",
                "x = t2",
                "END_PROGRAM",
            ]
        );
    }

    #[test]
    fn test_channel_lowering() {
        let tac = generate(
            "c_channel c e1 e2\n\
             c.send(\"+\", 10, 5)\n\
             c.receive(a, b)",
        );

        assert_eq!(
            tac.lines(),
            vec![
                "START_PROGRAM",
                "CHANNEL_DEF c e1 e2",
                "STRING_DEF L1 \"+\"",
                "SEND_PARAM L1",
                "SEND_PARAM 10",
                "SEND_PARAM 5",
                "SEND c 3",
                "RECEIVE c 2",
                "GET_RECV_PARAM t1 0",
                "a = t1",
                "GET_RECV_PARAM t2 1",
                "b = t2",
                "END_PROGRAM",
            ]
        );
    }

    #[test]
    fn test_string_literal_definition() {
        let tac = generate("ESCREVA(\"ola\")");

        assert_eq!(
            tac.lines(),
            vec![
                "START_PROGRAM",
                "STRING_DEF L1 \"ola\"",
                "WRITE L1",
                "END_PROGRAM",
            ]
        );
    }

    #[test]
    fn test_real_literals_keep_decimal_point() {
        let tac = generate("DECLARE r : REAL\nr = 2.0 + 0.5");

        assert!(tac.lines().contains(&"t1 = 2.0 + 0.5".to_owned()));
    }

    #[test]
    fn test_unary_minus_lowering() {
        let tac = generate("x = - y");

        assert!(tac.lines().contains(&"t1 = 0 - y".to_owned()));
    }

    #[test]
    fn test_nested_labels_stay_closed() {
        let tac = generate(
            "ENQUANTO i < 10 FACA :\n\
             SE i < 5 ENTAO :\n\
             x = 1\n\
             SENAO :\n\
             x = 2\n\
             FIM_SE\n\
             i = i + 1\n\
             FIM_ENQUANTO",
        );

        assert_labels_closed(&tac.code);
    }
}
