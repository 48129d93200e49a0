use std::fmt::Display;

use serde::Serialize;

/// Closed set of terminals recognised by the scanner.
///
/// The `Display` names are the ones surfaced in the token listing of a
/// compile result, e.g. `Tipo: NUM_INTEIRO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Programa,
    FimPrograma,
    Declare,
    Inteiro,
    Real,
    StringType,
    Bool,
    CChannel,
    Se,
    Entao,
    Senao,
    FimSe,
    Enquanto,
    Faca,
    FimEnquanto,
    Leia,
    Escreva,
    Seq,
    Par,
    Send,
    Receive,
    Def,
    Return,
    Para,
    Em,
    Id,
    NumInteiro,
    NumReal,
    Str,
    Boolean,
    Atribuicao,
    OpSoma,
    OpSub,
    OpMult,
    OpDiv,
    OpRel,
    AbreParenteses,
    FechaParenteses,
    AbreChaves,
    FechaChaves,
    AbreColchete,
    FechaColchete,
    DoisPontos,
    Virgula,
    Ponto,
    Error,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Programa => "PROGRAMA",
            TokenKind::FimPrograma => "FIM_PROGRAMA",
            TokenKind::Declare => "DECLARE",
            TokenKind::Inteiro => "INTEIRO",
            TokenKind::Real => "REAL",
            TokenKind::StringType => "STRING_TYPE",
            TokenKind::Bool => "BOOL",
            TokenKind::CChannel => "C_CHANNEL",
            TokenKind::Se => "SE",
            TokenKind::Entao => "ENTAO",
            TokenKind::Senao => "SENAO",
            TokenKind::FimSe => "FIM_SE",
            TokenKind::Enquanto => "ENQUANTO",
            TokenKind::Faca => "FACA",
            TokenKind::FimEnquanto => "FIM_ENQUANTO",
            TokenKind::Leia => "LEIA",
            TokenKind::Escreva => "ESCREVA",
            TokenKind::Seq => "SEQ",
            TokenKind::Par => "PAR",
            TokenKind::Send => "SEND",
            TokenKind::Receive => "RECEIVE",
            TokenKind::Def => "DEF",
            TokenKind::Return => "RETURN",
            TokenKind::Para => "PARA",
            TokenKind::Em => "EM",
            TokenKind::Id => "ID",
            TokenKind::NumInteiro => "NUM_INTEIRO",
            TokenKind::NumReal => "NUM_REAL",
            TokenKind::Str => "STRING",
            TokenKind::Boolean => "BOOLEAN",
            TokenKind::Atribuicao => "ATRIBUICAO",
            TokenKind::OpSoma => "OP_SOMA",
            TokenKind::OpSub => "OP_SUB",
            TokenKind::OpMult => "OP_MULT",
            TokenKind::OpDiv => "OP_DIV",
            TokenKind::OpRel => "OP_REL",
            TokenKind::AbreParenteses => "ABRE_PARENTESES",
            TokenKind::FechaParenteses => "FECHA_PARENTESES",
            TokenKind::AbreChaves => "ABRE_CHAVES",
            TokenKind::FechaChaves => "FECHA_CHAVES",
            TokenKind::AbreColchete => "ABRE_COLCHETE",
            TokenKind::FechaColchete => "FECHA_COLCHETE",
            TokenKind::DoisPontos => "DOIS_PONTOS",
            TokenKind::Virgula => "VIRGULA",
            TokenKind::Ponto => "PONTO",
            TokenKind::Error => "ERROR",
        };

        f.write_str(name)
    }
}

/// A single scanned token: terminal kind, the exact source lexeme, and the
/// 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tipo: {}, Valor: '{}', Linha: {}",
            self.kind, self.lexeme, self.line
        )
    }
}
