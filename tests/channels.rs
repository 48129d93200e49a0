use std::error::Error;

use minipar::pipeline;

#[test]
fn interpret_channel_echo() -> Result<(), Box<dyn Error>> {
    let source = "c_channel canal computador_1 computador_2\n\
                  canal.send(\"+\", 10, 5, resultado)\n\
                  ESCREVA(resultado)";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);

    let lines: Vec<&str> = result.output.lines().collect();
    assert!(lines
        .iter()
        .any(|line| line.contains("Enviando solicitação: + 10 5")));
    assert!(lines
        .iter()
        .any(|line| line.contains("Resultado calculado: 15")));
    // the echoed result closes the trace
    assert_eq!(lines.last().copied(), Some("15"));

    Ok(())
}

#[test]
fn channel_division_by_zero_is_guarded() -> Result<(), Box<dyn Error>> {
    let source = "c_channel canal computador_1 computador_2\n\
                  canal.send(\"/\", 10, 0, resultado)\n\
                  ESCREVA(resultado)";

    let result = pipeline::execute(source, "");

    assert!(result.success, "{}", result.error);
    assert!(result.output.contains("Erro: Divisão por zero!"));
    assert_eq!(result.output.lines().last(), Some("0"));

    Ok(())
}

#[test]
fn channel_tac_carries_send_and_receive() -> Result<(), Box<dyn Error>> {
    let source = "c_channel canal computador_1 computador_2\n\
                  canal.send(\"+\", 10, 5)\n\
                  canal.receive(a, b)";

    let result = pipeline::compile(source);

    assert!(result.errors.is_empty(), "{}", result.errors);
    assert!(result
        .tac
        .contains(&"CHANNEL_DEF canal computador_1 computador_2".to_owned()));
    assert!(result.tac.contains(&"SEND canal 3".to_owned()));
    assert!(result.tac.contains(&"RECEIVE canal 2".to_owned()));
    assert!(result.tac.contains(&"GET_RECV_PARAM t1 0".to_owned()));

    Ok(())
}
