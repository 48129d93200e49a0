//! The compile and execute drivers.
//!
//! `compile` runs lexer → parser → semantic → TAC → ARMv7 and packages the
//! intermediate artifacts for an external consumer; `execute` runs the same
//! front half and then interprets the AST. Each phase contributes its
//! errors and its best-effort output: lexical errors block parsing, syntax
//! errors allow a bounded retry, and TAC/assembly are only produced once
//! every earlier error list is empty.
use log::{debug, info};
use serde::Serialize;

use crate::{
    arm::ArmGenerator,
    ast::{format_tree, Program},
    interpreter::Interpreter,
    lexer::{Lexer, Token, TokenKind},
    parser::{ParseError, Parser},
    semantic::SemanticAnalyzer,
    tac::TacGenerator,
};

/// Parsing is retried after stripping `ERROR` tokens, at most this often.
const MAX_PARSE_ATTEMPTS: usize = 3;

/// Everything one compile produces, ready to serialize for a front-end.
#[derive(Debug, Default, Serialize)]
pub struct CompileResult {
    pub tokens: Vec<Token>,
    pub ast: String,
    pub tac: Vec<String>,
    pub asm: Vec<String>,
    pub errors: String,
}

#[derive(Debug, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: String,
}

pub fn compile(source: &str) -> CompileResult {
    compile_internal(source).0
}

pub fn execute(source: &str, input: &str) -> ExecutionResult {
    let (compiled, program) = compile_internal(source);

    match program {
        Some(program) if compiled.errors.is_empty() => {
            let mut interpreter = Interpreter::new();
            interpreter.set_input(input);
            interpreter.run(&program);

            ExecutionResult {
                success: true,
                output: interpreter.output(),
                error: String::new(),
            }
        }
        _ => ExecutionResult {
            success: false,
            output: String::new(),
            error: if compiled.errors.is_empty() {
                "Erro na Análise Sintática.".to_owned()
            } else {
                compiled.errors
            },
        },
    }
}

fn compile_internal(source: &str) -> (CompileResult, Option<Program>) {
    let tokens = Lexer::new(source).lex();

    let mut errors: Vec<String> = tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Error)
        .map(|token| {
            format!(
                "Erro Léxico: Caractere inesperado '{}' na linha {}",
                token.lexeme, token.line
            )
        })
        .collect();

    // lexical errors block parsing
    if !errors.is_empty() {
        let result = CompileResult {
            tokens,
            errors: errors.join("\n"),
            ..CompileResult::default()
        };
        return (result, None);
    }

    let (program, parse_errors) = parse_with_retries(tokens.clone());
    errors.extend(parse_errors.iter().map(ParseError::to_string));

    let Some(program) = program else {
        let result = CompileResult {
            tokens,
            ast: "Erro na Análise Sintática.".to_owned(),
            errors: errors.join("\n"),
            ..CompileResult::default()
        };
        return (result, None);
    };

    let ast = format_tree(&program);

    let analysis = SemanticAnalyzer::analyze(&program);
    errors.extend(analysis.errors.iter().map(|error| error.0.clone()));

    if !errors.is_empty() {
        let result = CompileResult {
            tokens,
            ast,
            errors: errors.join("\n"),
            ..CompileResult::default()
        };
        return (result, Some(program));
    }

    info!("front end clean, generating code");

    let tac = TacGenerator::generate(&program);

    // the assembly pass slots every name any phase saw; extras are sorted
    // so the frame layout is stable
    let mut all_vars = tac.declared_vars.clone();
    let mut extras: Vec<&String> = analysis
        .symbols
        .keys()
        .chain(analysis.channels.keys())
        .collect();
    extras.sort();
    for name in extras {
        if !all_vars.iter().any(|v| v == name) {
            all_vars.push(name.clone());
        }
    }

    let asm = ArmGenerator::new(all_vars, tac.array_sizes.clone()).generate(&tac);

    let result = CompileResult {
        tokens,
        ast,
        tac: tac.lines(),
        asm,
        errors: String::new(),
    };
    (result, Some(program))
}

/// Parse, retrying after stripping `ERROR` tokens. Retrying with an
/// unchanged stream cannot help, so the loop stops early in that case.
fn parse_with_retries(mut tokens: Vec<Token>) -> (Option<Program>, Vec<ParseError>) {
    let mut last = (None, vec![]);

    for attempt in 0..MAX_PARSE_ATTEMPTS {
        let (program, parse_errors) = Parser::new(tokens.clone()).parse();
        if parse_errors.is_empty() || program.is_some() {
            return (program, parse_errors);
        }
        last = (program, parse_errors);

        let stripped: Vec<Token> = tokens
            .iter()
            .filter(|token| token.kind != TokenKind::Error)
            .cloned()
            .collect();
        if stripped.len() == tokens.len() {
            break;
        }

        debug!("parse attempt {} after stripping error tokens", attempt + 2);
        tokens = stripped;
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_clean_program_produces_all_artifacts() {
        let result = compile("DECLARE x : INTEIRO\nx = 10\nESCREVA(x)");

        assert!(result.errors.is_empty());
        assert!(!result.tokens.is_empty());
        assert!(result.ast.starts_with("- programa_minipar"));
        assert_eq!(result.tac.first().map(String::as_str), Some("START_PROGRAM"));
        assert_eq!(result.asm.first().map(String::as_str), Some(".text"));
    }

    #[test]
    fn test_lex_errors_block_parsing() {
        let result = compile("x = $ 1");

        assert!(result
            .errors
            .contains("Erro Léxico: Caractere inesperado '$' na linha 1"));
        assert!(result.ast.is_empty());
        assert!(result.tac.is_empty());
        assert!(result.asm.is_empty());
        // the token listing still carries everything, error token included
        assert!(result
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Error));
    }

    #[test]
    fn test_semantic_errors_suppress_code_generation() {
        let result = compile("DECLARE x : INTEIRO\nDECLARE x : INTEIRO");

        assert!(result.errors.contains("já declarada"));
        assert!(!result.ast.is_empty());
        assert!(result.tac.is_empty());
        assert!(result.asm.is_empty());
    }

    #[test]
    fn test_execute_simple_program() {
        let result = execute("DECLARE x : INTEIRO\nDECLARE y : INTEIRO\nx = 10\ny = x + 5\nESCREVA(y)", "");

        assert!(result.success);
        assert_eq!(result.output, "15");
        assert!(result.error.is_empty());
    }

    #[test]
    fn test_execute_with_input_queue() {
        let result = execute("DECLARE x : INTEIRO\nLEIA(x)\nESCREVA(x * 2)", " 21 \n");

        assert!(result.success);
        assert_eq!(result.output, "42");
    }

    #[test]
    fn test_execute_refuses_broken_program() {
        let result = execute("ENQUANTO FACA", "");

        assert!(!result.success);
        assert!(result.output.is_empty());
        assert!(!result.error.is_empty());
    }

    #[test]
    fn test_results_serialize_to_json() {
        let compiled = compile("x = 1");
        let serialized = serde_json::to_string(&compiled).expect("serializable");

        assert!(serialized.contains("\"tokens\""));
        assert!(serialized.contains("\"asm\""));

        let executed = execute("ESCREVA(1)", "");
        let serialized = serde_json::to_string(&executed).expect("serializable");
        assert!(serialized.contains("\"success\":true"));
    }

    #[test]
    fn test_token_listing_format() {
        let result = compile("x = 1");

        assert_eq!(
            result.tokens[0].to_string(),
            "Tipo: ID, Valor: 'x', Linha: 1"
        );
    }
}
