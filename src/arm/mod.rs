//! ARMv7 assembly generation from three-address code.
//!
//! The listing targets a bare-metal educational simulator: no libc, `_start`
//! entry, program exit as a `B .` infinite loop, and `WRITE`/`READ` lowered
//! to comment stubs. Every variable lives in a `[fp, #offset]` stack slot;
//! arrays occupy `total_size * 4` bytes. String and float literals collect
//! in a `.data` section, and a `.ltorg` every 25 processed instructions
//! keeps PC-relative literal loads in range. The target profile has no
//! `sdiv`, so division is an inline subtract loop with sign handling and a
//! divide-by-zero guard.
use std::collections::HashMap;

use crate::tac::{ArrayInfo, Tac, TacProgram};

/// Literal pool cadence, in processed TAC instructions.
const LTORG_INTERVAL: usize = 25;

pub struct ArmGenerator {
    text: Vec<String>,
    data: Vec<String>,
    declared_vars: Vec<String>,
    array_sizes: HashMap<String, ArrayInfo>,
    string_literals: HashMap<String, String>,
    float_literals: HashMap<String, String>,
    var_locations: HashMap<String, i64>,
    next_temp_offset: i64,
    param_reg_count: usize,
    div_counter: usize,
}

impl ArmGenerator {
    /// `declared_vars` is the union of every name any pass saw: TAC-declared
    /// variables, semantic symbols, and channel names.
    pub fn new(declared_vars: Vec<String>, array_sizes: HashMap<String, ArrayInfo>) -> Self {
        Self {
            text: vec![],
            data: vec![],
            declared_vars,
            array_sizes,
            string_literals: HashMap::new(),
            float_literals: HashMap::new(),
            var_locations: HashMap::new(),
            next_temp_offset: 0,
            param_reg_count: 0,
            div_counter: 0,
        }
    }

    pub fn generate(mut self, tac: &TacProgram) -> Vec<String> {
        let stack_size = self.assign_stack_slots();

        self.text.push("\n.global _start".to_owned());
        self.text.push("_start:".to_owned());
        self.text.push("    mov fp, sp".to_owned());
        if stack_size > 0 {
            self.text.push(format!("    sub sp, sp, #{stack_size}"));
        }

        self.process_block(&tac.code);

        if stack_size > 0 {
            self.text.push(format!("    add sp, sp, #{stack_size}"));
        }
        self.text.push("END:".to_owned());
        self.text.push("    B .".to_owned());

        for (name, code) in &tac.functions {
            self.text.push(format!("\n{name}:"));
            self.text.push("    push {fp, lr}".to_owned());
            self.text.push("    mov fp, sp".to_owned());
            self.process_block(code);
            self.text.push("    pop {fp, pc}".to_owned());
        }

        let mut listing = vec![".text".to_owned()];
        listing.append(&mut self.text);
        listing.push(String::new());
        listing.push(".ltorg".to_owned());
        listing.push(String::new());
        listing.push(".data".to_owned());
        listing.append(&mut self.data);

        listing
    }

    /// One pass over the declared variables: slots grow upward from
    /// `[fp, #-stack_size]`; temporaries are slotted below that region as
    /// they appear.
    fn assign_stack_slots(&mut self) -> i64 {
        let mut total = 0;
        for var in &self.declared_vars {
            total += match self.array_sizes.get(var) {
                Some(info) => info.total_size * 4,
                None => 4,
            };
        }

        let mut offset = -total;
        for var in self.declared_vars.clone() {
            let size = match self.array_sizes.get(&var) {
                Some(info) => info.total_size * 4,
                None => 4,
            };
            self.var_locations.insert(var, offset);
            offset += size;
        }

        self.next_temp_offset = -total - 4;
        total
    }

    fn location(&mut self, name: &str) -> i64 {
        if let Some(offset) = self.var_locations.get(name) {
            return *offset;
        }

        let offset = self.next_temp_offset;
        self.var_locations.insert(name.to_owned(), offset);
        self.next_temp_offset -= 4;
        offset
    }

    fn process_block(&mut self, block: &[Tac]) {
        self.param_reg_count = 0;

        for (count, instruction) in block.iter().enumerate() {
            if count > 0 && count % LTORG_INTERVAL == 0 {
                self.text.push("    .ltorg".to_owned());
            }

            self.process_instruction(instruction);
        }
    }

    fn process_instruction(&mut self, instruction: &Tac) {
        match instruction {
            Tac::StartProgram | Tac::EndProgram | Tac::FuncBegin(_) | Tac::Param(_) => {}
            Tac::StringDef { label, value } => self.add_string_literal(label, value),
            Tac::FuncEnd(name) => self.text.push(format!("    @ FUNC_END {name}")),
            Tac::Return(value) => {
                self.load_to_reg(value, "r0");
                self.text.push("    mov sp, fp".to_owned());
                self.text.push("    pop {fp, pc}  @ Return".to_owned());
            }
            Tac::Label(label) => self.text.push(format!("{label}:")),
            Tac::Goto(label) => self.text.push(format!("    b {label}")),
            Tac::IfGoto { cond, label } => {
                self.load_to_reg(cond, "r0");
                self.text.push("    cmp r0, #1".to_owned());
                self.text.push(format!("    beq {label}"));
            }
            Tac::Write(value) => {
                self.text.push(format!(
                    "    @ WRITE {value} - I/O removido para compatibilidade CPUlator"
                ));
                self.load_to_reg(value, "r0");
            }
            Tac::Read(name) => {
                self.text.push(format!(
                    "    @ READ {name} - I/O removido, inicializando com 0"
                ));
                let offset = self.location(name);
                self.text.push("    mov r0, #0".to_owned());
                self.text.push(format!("    str r0, [fp, #{offset}]"));
            }
            Tac::PushParam(value) => {
                if self.param_reg_count < 4 {
                    let reg = format!("r{}", self.param_reg_count);
                    self.load_to_reg(value, &reg);
                } else {
                    self.load_to_reg(value, "r4");
                    self.text.push("    push {r4}".to_owned());
                }
                self.param_reg_count += 1;
            }
            Tac::CallAssign { dest, func, count } => {
                self.text.push(format!("    bl {func}"));
                if *count > 4 {
                    let cleanup = (count - 4) * 4;
                    self.text.push(format!("    add sp, sp, #{cleanup}"));
                }
                self.param_reg_count = 0;
                self.store_from_reg(dest, "r0");
            }
            Tac::ArrayAddr {
                dest,
                array,
                indices,
            } => self.process_array_address(dest, array, indices),
            Tac::ArrayStore { addr, value } => {
                self.load_to_reg(addr, "r0");
                self.load_to_reg(value, "r1");
                self.text.push("    str r1, [r0]".to_owned());
            }
            Tac::ArrayLoad { dest, addr } => {
                self.load_to_reg(addr, "r0");
                self.text.push("    ldr r1, [r0]".to_owned());
                self.store_from_reg(dest, "r1");
            }
            Tac::Copy { dest, src } => {
                self.load_to_reg(src, "r0");
                self.store_from_reg(dest, "r0");
            }
            Tac::BinOp { dest, lhs, op, rhs } => {
                self.load_to_reg(lhs, "r0");
                self.load_to_reg(rhs, "r1");
                self.emit_operation(op);
                self.store_from_reg(dest, "r0");
            }
            other => {
                // channel plumbing has no assembly counterpart
                self.text.push(format!("    @ C3E não implementado: {other}"));
            }
        }
    }

    fn emit_operation(&mut self, op: &str) {
        match op {
            "+" => self.text.push("    add r0, r0, r1".to_owned()),
            "-" => self.text.push("    sub r0, r0, r1".to_owned()),
            "*" => self.text.push("    mul r0, r0, r1".to_owned()),
            "/" => self.emit_division(),
            "==" | "!=" | "<" | ">" | "<=" | ">=" => {
                self.text.push("    cmp r0, r1".to_owned());
                self.text.push("    mov r0, #0".to_owned());
                let suffixed = match op {
                    "==" => "    moveq r0, #1",
                    "!=" => "    movne r0, #1",
                    "<" => "    movlt r0, #1",
                    ">" => "    movgt r0, #1",
                    "<=" => "    movle r0, #1",
                    _ => "    movge r0, #1",
                };
                self.text.push(suffixed.to_owned());
            }
            _ => {}
        }
    }

    /// Software division: the target profile has no `sdiv`. Subtract loop on
    /// the magnitudes, sign fixed afterwards, divide-by-zero yields 0.
    fn emit_division(&mut self) {
        let id = self.div_counter;
        self.div_counter += 1;

        self.text.push("    push {r2, r3, lr}".to_owned());
        self.text.push("    cmp r1, #0".to_owned());
        self.text.push(format!("    beq div_zero_{id}"));
        self.text.push("    mov r2, #0".to_owned());
        self.text.push("    mov r3, #0".to_owned());
        self.text.push("    cmp r0, #0".to_owned());
        self.text.push("    rsblt r0, r0, #0".to_owned());
        self.text.push("    addlt r3, r3, #1".to_owned());
        self.text.push("    cmp r1, #0".to_owned());
        self.text.push("    rsblt r1, r1, #0".to_owned());
        self.text.push("    eorlt r3, r3, #1".to_owned());
        self.text.push(format!("div_loop_{id}:"));
        self.text.push("    cmp r0, r1".to_owned());
        self.text.push(format!("    blt div_done_{id}"));
        self.text.push("    sub r0, r0, r1".to_owned());
        self.text.push("    add r2, r2, #1".to_owned());
        self.text.push(format!("    b div_loop_{id}"));
        self.text.push(format!("div_done_{id}:"));
        self.text.push("    cmp r3, #0".to_owned());
        self.text.push(format!("    beq div_pos_{id}"));
        self.text.push("    rsb r2, r2, #0".to_owned());
        self.text.push(format!("div_pos_{id}:"));
        self.text.push("    mov r0, r2".to_owned());
        self.text.push("    pop {r2, r3, lr}".to_owned());
        self.text.push(format!("    b div_exit_{id}"));
        self.text.push(format!("div_zero_{id}:"));
        self.text.push("    mov r0, #0".to_owned());
        self.text.push("    pop {r2, r3, lr}".to_owned());
        self.text.push(format!("div_exit_{id}:"));
    }

    fn process_array_address(&mut self, dest: &str, array: &str, indices: &[String]) {
        let Some(info) = self.array_sizes.get(array).cloned() else {
            self.text
                .push(format!("    @ Erro: Array '{array}' não encontrado"));
            return;
        };

        self.load_to_reg(array, "r0");

        if indices.len() == 1 {
            self.load_to_reg(&indices[0], "r1");
            self.text.push("    lsl r1, r1, #2".to_owned());
            self.text.push("    add r0, r0, r1".to_owned());
        } else {
            // row-major linearization: ((i1 * d2) + i2) * d3 + ...
            self.load_to_reg(&indices[0], "r1");
            for (dim, index) in info.dimensions[1..].iter().zip(&indices[1..]) {
                self.text.push(format!("    mov r2, #{dim}"));
                self.text.push("    mul r1, r1, r2".to_owned());
                self.load_to_reg(index, "r2");
                self.text.push("    add r1, r1, r2".to_owned());
            }
            self.text.push("    lsl r1, r1, #2".to_owned());
            self.text.push("    add r0, r0, r1".to_owned());
        }

        self.store_from_reg(dest, "r0");
    }

    fn load_to_reg(&mut self, src: &str, reg: &str) {
        if src.parse::<i64>().is_ok() {
            self.text.push(format!("    mov {reg}, #{src}"));
            return;
        }

        if src.contains('.') && src.parse::<f64>().is_ok() {
            let label = self.add_float_literal(src);
            self.text.push(format!("    ldr {reg}, ={label}"));
            return;
        }

        if self.string_literals.contains_key(src) {
            self.text.push(format!("    ldr {reg}, ={src}"));
            return;
        }

        if self.array_sizes.contains_key(src) {
            // arrays load their base address, not a value
            let offset = self.location(src);
            if offset < 0 {
                let magnitude = -offset;
                self.text.push(format!("    sub {reg}, fp, #{magnitude}"));
            } else {
                self.text.push(format!("    add {reg}, fp, #{offset}"));
            }
            return;
        }

        let offset = self.location(src);
        self.text.push(format!("    ldr {reg}, [fp, #{offset}]"));
    }

    fn store_from_reg(&mut self, dest: &str, reg: &str) {
        let offset = self.location(dest);
        self.text.push(format!("    str {reg}, [fp, #{offset}]"));
    }

    fn add_string_literal(&mut self, label: &str, text: &str) {
        if !self.string_literals.contains_key(label) {
            self.string_literals
                .insert(label.to_owned(), text.to_owned());
            self.data.push(format!("{label}: .asciz \"{text}\""));
        }
    }

    fn add_float_literal(&mut self, value: &str) -> String {
        let label = format!("float_{}", value.replace('.', "_").replace('-', "n"));
        if !self.float_literals.contains_key(&label) {
            self.float_literals.insert(label.clone(), value.to_owned());
            self.data.push(format!("{label}: .float {value}"));
        }
        label
    }
}
