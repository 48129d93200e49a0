//! Semantic analysis for MiniPar.
//!
//! Walks the AST threading a symbol table, a channel table and a function
//! signature table. All problems are collected into an error list; the
//! analyzer never aborts and never mutates the AST. Entering a function or a
//! `para` loop clones the symbol table and restores it afterwards, which is
//! the scope discipline of the language: inner scopes see outer names, outer
//! scopes never see inner ones.
use std::{collections::HashMap, error::Error, fmt::Display};

use crate::ast::{BinaryVerb, Expression, Param, Program, Statement, TypeName, UnaryVerb};

/// Normalized type of a name or an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Inteiro,
    Real,
    StringType,
    Bool,
    Function,
    Error,
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Type::Inteiro => "INTEIRO",
            Type::Real => "REAL",
            Type::StringType => "STRING_TYPE",
            Type::Bool => "BOOL",
            Type::Function => "function",
            Type::Error => "error",
        })
    }
}

impl From<TypeName> for Type {
    fn from(value: TypeName) -> Self {
        match value {
            TypeName::Inteiro => Type::Inteiro,
            TypeName::Real => Type::Real,
            TypeName::StringType => Type::StringType,
            TypeName::Bool => Type::Bool,
        }
    }
}

impl Type {
    fn is_numeric(&self) -> bool {
        matches!(self, Type::Inteiro | Type::Real)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError(pub String);

impl Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for SemanticError {}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub params: Vec<Type>,
    pub return_type: Type,
}

/// Everything the analysis learned about a program; later phases read the
/// tables, callers gate on `errors`.
#[derive(Debug, Default)]
pub struct Analysis {
    pub errors: Vec<SemanticError>,
    pub symbols: HashMap<String, Type>,
    pub channels: HashMap<String, (String, String)>,
    pub functions: HashMap<String, FunctionSignature>,
    pub array_dims: HashMap<String, Vec<i64>>,
}

#[derive(Default)]
pub struct SemanticAnalyzer {
    symbol_table: HashMap<String, Type>,
    channel_table: HashMap<String, (String, String)>,
    function_table: HashMap<String, FunctionSignature>,
    array_dims: HashMap<String, Vec<i64>>,
    current_function: Option<Type>,
    errors: Vec<SemanticError>,
}

impl SemanticAnalyzer {
    pub fn analyze(program: &Program) -> Analysis {
        let mut analyzer = SemanticAnalyzer::default();

        for statement in &program.body {
            analyzer.check_statement(statement);
        }

        Analysis {
            errors: analyzer.errors,
            symbols: analyzer.symbol_table,
            channels: analyzer.channel_table,
            functions: analyzer.function_table,
            array_dims: analyzer.array_dims,
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(SemanticError(message.into()));
    }

    fn check_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::SeqBlock(body) | Statement::ParBlock(body) => {
                for statement in body {
                    self.check_statement(statement);
                }
            }
            Statement::VarDecl { name, ty } => self.check_var_decl(name, *ty),
            Statement::ArrayDecl { name, ty, dims } => self.check_array_decl(name, *ty, dims),
            Statement::Channel { name, .. } => self.check_channel(name, statement),
            Statement::FuncDecl {
                name,
                params,
                ret,
                body,
            } => self.check_func_decl(name, params, *ret, body),
            Statement::Return(expr) => self.check_return(expr),
            Statement::Assign { name, expr } => {
                self.check_assign(name, expr);
            }
            Statement::ArrayAssign {
                name,
                indices,
                expr,
            } => self.check_array_assign(name, indices, expr),
            Statement::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond_type = self.expression_type(cond);
                if cond_type != Type::Bool && cond_type != Type::Error {
                    self.error(format!(
                        "Erro Semântico: A condição do 'SE' deve ser 'BOOL', mas é '{cond_type}'."
                    ));
                }
                for statement in then_block {
                    self.check_statement(statement);
                }
                if let Some(else_block) = else_block {
                    for statement in else_block {
                        self.check_statement(statement);
                    }
                }
            }
            Statement::While { cond, body } => {
                let cond_type = self.expression_type(cond);
                if cond_type != Type::Bool && cond_type != Type::Error {
                    self.error(format!(
                        "Erro Semântico: A condição do 'ENQUANTO' deve ser 'BOOL', mas é '{cond_type}'."
                    ));
                }
                for statement in body {
                    self.check_statement(statement);
                }
            }
            Statement::For { var, lo, hi, body } => self.check_for(var, lo, hi, body),
            Statement::Read(name) => {
                if !self.symbol_table.contains_key(name) {
                    self.error(format!(
                        "Erro Semântico: Variável '{name}' não declarada (em 'leia')."
                    ));
                }
            }
            Statement::Write(exprs) => {
                for expr in exprs {
                    self.expression_type(expr);
                }
            }
            Statement::Send { channel, args } => {
                if !self.channel_table.contains_key(channel) {
                    self.error(format!(
                        "Erro Semântico: Canal '{channel}' não declarado."
                    ));
                }
                for arg in args {
                    self.expression_type(arg);
                }
            }
            Statement::Receive { channel, vars } => {
                if !self.channel_table.contains_key(channel) {
                    self.error(format!(
                        "Erro Semântico: Canal '{channel}' não declarado."
                    ));
                }
                for var in vars {
                    if !self.symbol_table.contains_key(var) {
                        self.error(format!(
                            "Erro Semântico: Variável '{var}' não declarada (em 'receive')."
                        ));
                    }
                }
            }
            Statement::Call { name, args } => {
                self.check_call(name, args);
            }
        }
    }

    fn check_var_decl(&mut self, name: &str, ty: TypeName) {
        if self.symbol_table.contains_key(name) {
            self.error(format!("Erro Semântico: Variável '{name}' já declarada."));
        } else {
            self.symbol_table.insert(name.to_owned(), ty.into());
        }
    }

    fn check_array_decl(&mut self, name: &str, ty: TypeName, dims: &[i64]) {
        if self.symbol_table.contains_key(name) {
            self.error(format!("Erro Semântico: Variável '{name}' já declarada."));
        } else {
            self.symbol_table.insert(name.to_owned(), ty.into());
            self.array_dims.insert(name.to_owned(), dims.to_vec());
        }
    }

    fn check_channel(&mut self, name: &str, statement: &Statement) {
        let Statement::Channel {
            endpoint1,
            endpoint2,
            ..
        } = statement
        else {
            return;
        };

        if self.channel_table.contains_key(name) {
            self.error(format!("Erro Semântico: Canal '{name}' já declarado."));
        } else {
            self.channel_table
                .insert(name.to_owned(), (endpoint1.clone(), endpoint2.clone()));
        }
    }

    fn check_func_decl(&mut self, name: &str, params: &[Param], ret: TypeName, body: &[Statement]) {
        if self.function_table.contains_key(name) {
            self.error(format!("Erro Semântico: Função '{name}' já declarada."));
            return;
        }

        let old_table = self.symbol_table.clone();
        self.symbol_table.insert(name.to_owned(), Type::Function);

        let mut param_types = vec![];
        let mut seen = std::collections::HashSet::new();

        for param in params {
            if !seen.insert(param.name.clone()) {
                self.error(format!(
                    "Erro Semântico: Parâmetro '{}' duplicado na função '{name}'.",
                    param.name
                ));
            }
            let ty: Type = param.ty.into();
            param_types.push(ty);
            self.symbol_table.insert(param.name.clone(), ty);
        }

        let return_type: Type = ret.into();

        // registered before the body so recursive calls resolve
        self.function_table.insert(
            name.to_owned(),
            FunctionSignature {
                params: param_types,
                return_type,
            },
        );

        let previous_function = self.current_function.replace(return_type);
        for statement in body {
            self.check_statement(statement);
        }
        self.current_function = previous_function;
        self.symbol_table = old_table;
    }

    fn check_return(&mut self, expr: &Expression) {
        let Some(expected) = self.current_function else {
            self.error("Erro Semântico: Comando 'return' encontrado fora de uma função.");
            return;
        };

        // returning a bare name or call must not implicitly declare it; an
        // unknown one is an undeclared-reference error and nothing else
        let actual = match expr {
            Expression::Id(name) => {
                if !self.symbol_table.contains_key(name) {
                    self.error(format!(
                        "Erro Semântico: Variável '{name}' não declarada."
                    ));
                    return;
                }
                self.symbol_table[name]
            }
            Expression::Call { name, args } => {
                if !self.function_table.contains_key(name) {
                    self.error(format!(
                        "Erro Semântico: Função '{name}' não declarada."
                    ));
                    return;
                }
                self.check_call(name, args)
            }
            other => self.expression_type(other),
        };

        let coerces = actual == expected || (expected == Type::Real && actual == Type::Inteiro);
        if !coerces && actual != Type::Error {
            self.error(format!(
                "Erro Semântico: Tipo de retorno da função ({actual}) não é compatível com o tipo esperado ({expected})."
            ));
        }
    }

    fn check_assign(&mut self, name: &str, expr: &Expression) -> Type {
        // first write declares the target as INTEIRO
        let var_type = *self
            .symbol_table
            .entry(name.to_owned())
            .or_insert(Type::Inteiro);

        let expr_type = self.expression_type(expr);

        if var_type != expr_type && expr_type != Type::Error {
            if var_type == Type::Real && expr_type == Type::Inteiro {
                return Type::Real;
            }
            self.error(format!(
                "Erro Semântico: Tipos incompatíveis. Não é possível atribuir '{expr_type}' à variável '{name}' (tipo '{var_type}')."
            ));
            return Type::Error;
        }

        var_type
    }

    fn check_array_assign(&mut self, name: &str, indices: &[Expression], expr: &Expression) {
        if !self.symbol_table.contains_key(name) {
            self.error(format!(
                "Erro Semântico: Variável '{name}' não foi declarada."
            ));
            self.expression_type(expr);
            return;
        }

        self.check_indices(name, indices);

        let var_type = self.symbol_table[name];
        let expr_type = self.expression_type(expr);

        if var_type != expr_type && expr_type != Type::Error {
            if var_type == Type::Real && expr_type == Type::Inteiro {
                return;
            }
            self.error(format!(
                "Erro Semântico: Tipos incompatíveis. Não é possível atribuir '{expr_type}' à variável '{name}' (tipo '{var_type}')."
            ));
        }
    }

    fn check_indices(&mut self, name: &str, indices: &[Expression]) {
        if let Some(dims) = self.array_dims.get(name) {
            if dims.len() != indices.len() {
                let expected = dims.len();
                let got = indices.len();
                self.error(format!(
                    "Erro Semântico: Array '{name}' espera {expected} índices, mas recebeu {got}."
                ));
            }
        }

        for index in indices {
            let index_type = self.expression_type(index);
            if index_type != Type::Inteiro && index_type != Type::Error {
                self.error(format!(
                    "Erro Semântico: Índice de array deve ser INTEIRO, mas é '{index_type}'."
                ));
            }
        }
    }

    fn check_for(&mut self, var: &str, lo: &Expression, hi: &Expression, body: &[Statement]) {
        let old_table = self.symbol_table.clone();

        if self.symbol_table.contains_key(var) {
            self.error(format!(
                "Erro Semântico: Variável de loop '{var}' já declarada no escopo."
            ));
        }
        self.symbol_table.insert(var.to_owned(), Type::Inteiro);

        for statement in body {
            self.check_statement(statement);
        }
        self.symbol_table = old_table;

        if self.expression_type(lo) != Type::Inteiro || self.expression_type(hi) != Type::Inteiro {
            self.error("Erro Semântico: Limites do loop 'PARA' devem ser 'INTEIRO'.");
        }
    }

    fn check_call(&mut self, name: &str, args: &[Expression]) -> Type {
        let Some(signature) = self.function_table.get(name).cloned() else {
            // arguments stay unvisited: one error for the missing function,
            // no cascade from whatever sits inside the call
            self.error(format!(
                "Erro Semântico: Função '{name}' não foi declarada."
            ));
            return Type::Error;
        };

        if args.len() != signature.params.len() {
            let expected = signature.params.len();
            let got = args.len();
            self.error(format!(
                "Erro Semântico: Função '{name}' espera {expected} argumentos, mas recebeu {got}."
            ));
            return signature.return_type;
        }

        for (i, (arg, expected)) in args.iter().zip(&signature.params).enumerate() {
            let arg_type = self.expression_type(arg);
            let coerces =
                arg_type == *expected || (*expected == Type::Real && arg_type == Type::Inteiro);
            if !coerces && arg_type != Type::Error {
                let position = i + 1;
                self.error(format!(
                    "Erro Semântico: Argumento {position} da função '{name}': esperava '{expected}', mas recebeu '{arg_type}'."
                ));
            }
        }

        signature.return_type
    }

    fn expression_type(&mut self, expr: &Expression) -> Type {
        match expr {
            Expression::Int(_) => Type::Inteiro,
            Expression::Real(_) => Type::Real,
            Expression::Str(_) => Type::StringType,
            Expression::Bool(_) => Type::Bool,
            Expression::Id(name) => {
                // undeclared reads install the name as INTEIRO
                *self
                    .symbol_table
                    .entry(name.clone())
                    .or_insert(Type::Inteiro)
            }
            Expression::ArrayRef { name, indices } => {
                if !self.symbol_table.contains_key(name) {
                    self.error(format!(
                        "Erro Semântico: Variável '{name}' não foi declarada."
                    ));
                    return Type::Error;
                }
                self.check_indices(name, indices);
                self.symbol_table[name]
            }
            Expression::Binary { verb, lhs, rhs } => {
                let left = self.expression_type(lhs);
                let right = self.expression_type(rhs);

                if left == Type::Error || right == Type::Error {
                    return Type::Error;
                }

                if verb.is_relational() {
                    if left.is_numeric() && right.is_numeric() {
                        return Type::Bool;
                    }
                    self.error(format!(
                        "Erro Semântico: Operação relacional '{verb}' entre tipos incompatíveis: '{left}' e '{right}'."
                    ));
                    return Type::Error;
                }

                if left.is_numeric() && right.is_numeric() {
                    if left == Type::Real || right == Type::Real || *verb == BinaryVerb::Div {
                        return Type::Real;
                    }
                    return Type::Inteiro;
                }

                self.error(format!(
                    "Erro Semântico: Operação '{verb}' entre tipos incompatíveis: '{left}' e '{right}'."
                ));
                Type::Error
            }
            Expression::Unary { verb, expr } => {
                let inner = self.expression_type(expr);
                match verb {
                    UnaryVerb::Neg => {
                        if inner.is_numeric() {
                            inner
                        } else {
                            if inner != Type::Error {
                                self.error(format!(
                                    "Erro Semântico: Operador '-' unário aplicado a tipo incompatível: '{inner}'."
                                ));
                            }
                            Type::Error
                        }
                    }
                }
            }
            Expression::Call { name, args } => self.check_call(name, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::Parser};

    fn analyze(source: &str) -> Analysis {
        let (program, errors) = Parser::new(Lexer::new(source).lex()).parse();
        assert!(errors.is_empty(), "syntax errors: {errors:?}");
        SemanticAnalyzer::analyze(&program.expect("no AST"))
    }

    fn messages(analysis: &Analysis) -> Vec<String> {
        analysis.errors.iter().map(|e| e.0.clone()).collect()
    }

    #[test]
    fn test_duplicate_declaration() {
        let analysis = analyze("DECLARE x : INTEIRO\nDECLARE x : REAL");

        assert_eq!(
            messages(&analysis),
            vec!["Erro Semântico: Variável 'x' já declarada."]
        );
    }

    #[test]
    fn test_integer_to_real_coercion_is_silent() {
        let analysis = analyze("DECLARE r : REAL\nr = 2");

        assert!(analysis.errors.is_empty());
    }

    #[test]
    fn test_real_to_integer_is_rejected() {
        let analysis = analyze("DECLARE x : INTEIRO\nx = 2.5");

        assert_eq!(analysis.errors.len(), 1);
        assert!(analysis.errors[0].0.contains("Tipos incompatíveis"));
    }

    #[test]
    fn test_implicit_first_write_declares_integer() {
        let analysis = analyze("x = 10");

        assert!(analysis.errors.is_empty());
        assert_eq!(analysis.symbols.get("x"), Some(&Type::Inteiro));
    }

    #[test]
    fn test_condition_must_be_bool() {
        let analysis = analyze("ENQUANTO 1 + 2 FACA :\nx = 1\nFIM_ENQUANTO");

        assert!(analysis.errors[0]
            .0
            .contains("A condição do 'ENQUANTO' deve ser 'BOOL'"));
    }

    #[test]
    fn test_array_rank_mismatch() {
        let analysis = analyze("DECLARE m : INTEIRO [2] [2]\nm[0] = 1");

        assert!(analysis.errors[0].0.contains("espera 2 índices"));
    }

    #[test]
    fn test_array_index_must_be_integer() {
        let analysis = analyze("DECLARE a : INTEIRO [4]\na[1.5] = 1");

        assert!(analysis
            .errors
            .iter()
            .any(|e| e.0.contains("Índice de array deve ser INTEIRO")));
    }

    #[test]
    fn test_function_arity_and_argument_types() {
        let analysis = analyze(
            "DEF soma ( a : INTEIRO , b : INTEIRO ) : INTEIRO :\n\
             RETURN a + b\n\
             x = soma ( 1 )",
        );

        assert!(analysis.errors[0]
            .0
            .contains("espera 2 argumentos, mas recebeu 1"));
    }

    #[test]
    fn test_return_outside_function() {
        let analysis = analyze("RETURN 1");

        assert!(analysis.errors[0]
            .0
            .contains("'return' encontrado fora de uma função"));
    }

    #[test]
    fn test_return_type_checked_against_signature() {
        let analysis = analyze(
            "DEF nome ( ) : INTEIRO :\n\
             RETURN \"abc\"",
        );

        assert!(analysis.errors[0].0.contains("Tipo de retorno"));
    }

    #[test]
    fn test_return_of_undeclared_identifier_is_flagged() {
        let analysis = analyze(
            "DEF f ( ) : INTEIRO :\n\
             RETURN zzz",
        );

        assert_eq!(
            messages(&analysis),
            vec!["Erro Semântico: Variável 'zzz' não declarada."]
        );
    }

    #[test]
    fn test_return_of_undeclared_function_call_is_flagged() {
        let analysis = analyze(
            "DEF f ( ) : INTEIRO :\n\
             RETURN g ( 1 )",
        );

        assert_eq!(
            messages(&analysis),
            vec!["Erro Semântico: Função 'g' não declarada."]
        );
    }

    #[test]
    fn test_undeclared_function_call_reports_once() {
        let analysis = analyze("DECLARE x : INTEIRO\nx = foo ( bar [ 1 ] )");

        // no cascade from the arguments of the missing function
        assert_eq!(
            messages(&analysis),
            vec!["Erro Semântico: Função 'foo' não foi declarada."]
        );
    }

    #[test]
    fn test_undeclared_channel() {
        let analysis = analyze("canal.send(\"+\", 1, 2, r)");

        assert!(analysis.errors[0]
            .0
            .contains("Canal 'canal' não declarado"));
    }

    #[test]
    fn test_function_scope_restored_after_body() {
        let analysis = analyze(
            "DEF dobro ( n : INTEIRO ) : INTEIRO :\n\
             RETURN n * 2\n\
             x = n",
        );

        // `n` leaks nowhere: outside the body it is implicitly INTEIRO again
        assert!(analysis.errors.is_empty());
        assert_eq!(analysis.symbols.get("n"), Some(&Type::Inteiro));
        assert_eq!(
            analysis.functions.get("dobro").map(|f| f.return_type),
            Some(Type::Inteiro)
        );
    }

    #[test]
    fn test_recursive_function_resolves_itself() {
        let analysis = analyze(
            "DEF fat ( n : INTEIRO ) : INTEIRO :\n\
             SE n <= 1 ENTAO :\n\
             RETURN 1\n\
             SENAO :\n\
             RETURN n * fat ( n - 1 )\n\
             FIM_SE",
        );

        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn test_division_always_types_real() {
        let analysis = analyze("DECLARE r : REAL\nr = 10 / 2");

        assert!(analysis.errors.is_empty());
    }
}
