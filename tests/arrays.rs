use std::error::Error;

use minipar::pipeline;

#[test]
fn interpret_array_sum() -> Result<(), Box<dyn Error>> {
    let source = "DECLARE a : INTEIRO [4]\n\
                  a[0] = 1\n\
                  a[1] = 2\n\
                  a[2] = 3\n\
                  a[3] = 4\n\
                  s = 0\n\
                  i = 0\n\
                  ENQUANTO i < 4 FACA :\n\
                  s = s + a[i]\n\
                  i = i + 1\n\
                  FIM_ENQUANTO\n\
                  ESCREVA(s)";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);
    assert_eq!(result.output, "10");

    Ok(())
}

#[test]
fn array_writes_grow_the_backing_store() -> Result<(), Box<dyn Error>> {
    let source = "DECLARE a : INTEIRO [2]\n\
                  a[0] = 1\n\
                  a[7] = 5\n\
                  ESCREVA(a[7])\n\
                  ESCREVA(a[4])";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);
    // growth keeps interior holes zeroed
    assert_eq!(result.output, "5\n0");

    Ok(())
}
