use std::error::Error;

use minipar::pipeline;

#[test]
fn interpret_factorial_of_five() -> Result<(), Box<dyn Error>> {
    let source = "numero = 5\n\
                  fatorial = 1\n\
                  i = 1\n\
                  ENQUANTO i <= numero FACA :\n\
                  fatorial = fatorial * i\n\
                  i = i + 1\n\
                  FIM_ENQUANTO\n\
                  ESCREVA(fatorial)";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);
    assert_eq!(result.output, "120");

    Ok(())
}
