//! # minipar
//!
//! Command-line front end for the MiniPar compiler and interpreter: compile
//! a source file, inspect the intermediate artifacts, write the assembly
//! listing, or run the program directly.
mod cli;

use std::{error::Error, fs};

use cli::Cli;
use log::error;
use minipar::pipeline;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::init();

    simple_logger::init_with_level(args.verbosity.clone().into())?;

    let source = fs::read_to_string(&args.file)?;

    let compiled = pipeline::compile(&source);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&compiled)?);
        return Ok(());
    }

    if args.dump_tokens {
        for token in &compiled.tokens {
            println!("{token}");
        }
    }

    if args.dump_parsed {
        print!("{}", compiled.ast);
    }

    if args.dump_tac {
        for line in &compiled.tac {
            println!("{line}");
        }
    }

    if !compiled.errors.is_empty() {
        error!("{}", compiled.errors);
        std::process::exit(1);
    }

    if let Some(output) = &args.output {
        fs::write(output, compiled.asm.join("\n"))?;
    }

    if args.run {
        let input = match &args.input {
            Some(path) => fs::read_to_string(path)?,
            None => String::new(),
        };

        let result = pipeline::execute(&source, &input);
        if !result.output.is_empty() {
            println!("{}", result.output);
        }
        if !result.success {
            error!("{}", result.error);
            std::process::exit(1);
        }
    }

    Ok(())
}
