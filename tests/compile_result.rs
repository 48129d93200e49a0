use std::{collections::HashSet, error::Error};

use minipar::pipeline;

const SOURCE: &str = "DECLARE total : INTEIRO\n\
                      total = 0\n\
                      i = 1\n\
                      ENQUANTO i <= 3 FACA :\n\
                      SE i == 2 ENTAO :\n\
                      total = total + 10\n\
                      SENAO :\n\
                      total = total + i\n\
                      FIM_SE\n\
                      i = i + 1\n\
                      FIM_ENQUANTO\n\
                      ESCREVA(total)";

#[test]
fn compile_produces_every_artifact() -> Result<(), Box<dyn Error>> {
    let result = pipeline::compile(SOURCE);

    assert!(result.errors.is_empty(), "{}", result.errors);
    assert!(!result.tokens.is_empty());
    assert!(result.ast.starts_with("- programa_minipar"));
    assert!(!result.tac.is_empty());
    assert!(!result.asm.is_empty());

    Ok(())
}

#[test]
fn tac_labels_are_closed() -> Result<(), Box<dyn Error>> {
    let result = pipeline::compile(SOURCE);

    let mut defined = HashSet::new();
    for line in &result.tac {
        if let Some(label) = line.strip_prefix("LABEL ") {
            assert!(defined.insert(label.to_owned()), "label {label} redefined");
        }
    }

    for line in &result.tac {
        let referenced = line.strip_prefix("GOTO ").or_else(|| {
            line.strip_prefix("IF_GOTO ")
                .and_then(|rest| rest.split_whitespace().nth(1))
        });
        if let Some(label) = referenced {
            assert!(defined.contains(label), "label {label} undefined");
        }
    }

    Ok(())
}

#[test]
fn assembly_stack_is_balanced() -> Result<(), Box<dyn Error>> {
    let result = pipeline::compile(SOURCE);

    let sub: Vec<&String> = result
        .asm
        .iter()
        .filter(|line| line.starts_with("    sub sp, sp, #"))
        .collect();
    let add: Vec<&String> = result
        .asm
        .iter()
        .filter(|line| line.starts_with("    add sp, sp, #"))
        .collect();

    assert_eq!(sub.len(), 1);
    assert_eq!(add.len(), 1);
    assert_eq!(
        sub[0].trim_start_matches("    sub sp, sp, #"),
        add[0].trim_start_matches("    add sp, sp, #")
    );

    Ok(())
}

#[test]
fn write_targets_are_all_known_to_the_symbol_table() -> Result<(), Box<dyn Error>> {
    use minipar::{lexer::Lexer, parser::Parser, semantic::SemanticAnalyzer};

    let (program, errors) = Parser::new(Lexer::new(SOURCE).lex()).parse();
    assert!(errors.is_empty(), "syntax errors: {errors:?}");
    let program = program.ok_or("no AST produced")?;

    let analysis = SemanticAnalyzer::analyze(&program);
    assert!(analysis.errors.is_empty());

    // every assignment target ended up declared, explicitly or implicitly
    for target in ["total", "i"] {
        assert!(analysis.symbols.contains_key(target), "missing {target}");
    }

    Ok(())
}

#[test]
fn interpreted_output_matches_the_lowered_control_flow() -> Result<(), Box<dyn Error>> {
    let result = pipeline::execute(SOURCE, "");

    assert!(result.success, "{}", result.error);
    // 1 + 10 + 3
    assert_eq!(result.output, "14");

    Ok(())
}
