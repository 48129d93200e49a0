//! CLI argument parsing for the `minipar` binary.

use clap::{Parser, ValueEnum};

/// Compiler & interpreter for the MiniPar language.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The MiniPar source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// Run the program with the interpreter and print its output.
    #[arg(short, long)]
    pub run: bool,

    /// File whose lines feed the program's `leia` statements.
    #[arg(long)]
    pub input: Option<std::path::PathBuf>,

    /// Write the generated ARMv7 assembly to this path.
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// Print the token listing.
    #[arg(long)]
    pub dump_tokens: bool,

    /// Print the parsed AST.
    #[arg(long)]
    pub dump_parsed: bool,

    /// Print the three-address code.
    #[arg(long)]
    pub dump_tac: bool,

    /// Print the whole compile result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Log level of the `minipar` binary.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// Only critical errors.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Warnings too, e.g. loops stopped at the iteration cap.
    #[value(alias("1"))]
    Warn,

    /// General pipeline progress.
    #[value(alias("2"))]
    Info,

    /// Everything, repair decisions included.
    #[value(alias("3"))]
    Debug,

    /// Trace output.
    #[value(alias("4"))]
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
