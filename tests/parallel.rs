use std::error::Error;

use minipar::pipeline;

#[test]
fn interpret_parallel_two_writers() -> Result<(), Box<dyn Error>> {
    let source = "PAR\n\
                  SEQ :\n\
                  ESCREVA(\"A1\")\n\
                  ESCREVA(\"A2\")\n\
                  SEQ :\n\
                  ESCREVA(\"B1\")\n\
                  ESCREVA(\"B2\")";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);
    // post-join interleave is round-robin by worker index
    assert_eq!(result.output, "A1\nB1\nA2\nB2");

    Ok(())
}

#[test]
fn interpret_parallel_runs_are_deterministic() -> Result<(), Box<dyn Error>> {
    let source = "PAR\n\
                  SEQ :\n\
                  ESCREVA(\"A\")\n\
                  SEQ :\n\
                  ESCREVA(\"B\")\n\
                  SEQ :\n\
                  ESCREVA(\"C\")";

    let first = pipeline::execute(source, "").output;
    for _ in 0..10 {
        assert_eq!(pipeline::execute(source, "").output, first);
    }
    assert_eq!(first, "A\nB\nC");

    Ok(())
}
