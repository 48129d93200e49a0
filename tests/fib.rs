use std::error::Error;

use minipar::pipeline;

#[test]
fn interpret_fibonacci_first_five() -> Result<(), Box<dyn Error>> {
    let source = "n = 5\n\
                  a = 0\n\
                  b = 1\n\
                  j = 0\n\
                  ENQUANTO j < n FACA :\n\
                  ESCREVA(a)\n\
                  proximo = a + b\n\
                  a = b\n\
                  b = proximo\n\
                  j = j + 1\n\
                  FIM_ENQUANTO";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);
    assert_eq!(result.output, "0\n1\n1\n2\n3");

    Ok(())
}

#[test]
fn interpret_recursive_fibonacci() -> Result<(), Box<dyn Error>> {
    let source = "DEF fib ( n : INTEIRO ) : INTEIRO :\n\
                  SE n <= 1 ENTAO :\n\
                  RETURN n\n\
                  SENAO :\n\
                  RETURN fib ( n - 1 ) + fib ( n - 2 )\n\
                  FIM_SE\n\
                  ESCREVA(fib(10))";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);
    assert_eq!(result.output, "55");

    Ok(())
}
