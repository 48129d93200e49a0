//! Lexical analysis for MiniPar.
//!
//! A greedy longest-match scanner over the source characters. Keywords are
//! recognised after identifier matching by looking the lexeme up in a fixed
//! table; illegal characters become [`TokenKind::Error`] tokens so a single
//! pass can report every lexical problem at once.
mod token;

pub use token::*;

use std::{collections::HashMap, iter::Peekable, str::Chars};

use once_cell::sync::Lazy;

/// Keyword table, keyed by the lower-cased lexeme. Lookup happens after a
/// full identifier has been read, so `enquanto` never shadows an identifier
/// like `enquanto_x`.
static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("programa", TokenKind::Programa);
    m.insert("fim_programa", TokenKind::FimPrograma);
    m.insert("declare", TokenKind::Declare);
    m.insert("inteiro", TokenKind::Inteiro);
    m.insert("real", TokenKind::Real);
    m.insert("string", TokenKind::StringType);
    m.insert("bool", TokenKind::Bool);
    m.insert("c_channel", TokenKind::CChannel);
    m.insert("se", TokenKind::Se);
    m.insert("entao", TokenKind::Entao);
    m.insert("senao", TokenKind::Senao);
    m.insert("fim_se", TokenKind::FimSe);
    m.insert("enquanto", TokenKind::Enquanto);
    m.insert("faca", TokenKind::Faca);
    m.insert("fim_enquanto", TokenKind::FimEnquanto);
    m.insert("leia", TokenKind::Leia);
    m.insert("escreva", TokenKind::Escreva);
    m.insert("seq", TokenKind::Seq);
    m.insert("par", TokenKind::Par);
    m.insert("send", TokenKind::Send);
    m.insert("receive", TokenKind::Receive);
    m.insert("def", TokenKind::Def);
    m.insert("return", TokenKind::Return);
    m.insert("para", TokenKind::Para);
    m.insert("em", TokenKind::Em);
    m.insert("verdadeiro", TokenKind::Boolean);
    m.insert("falso", TokenKind::Boolean);
    m.insert("true", TokenKind::Boolean);
    m.insert("false", TokenKind::Boolean);

    m
});

/// Accepted spellings of the program-header keyword. These are matched
/// against the raw lexeme, not the lower-cased one.
const PROGRAM_ALIASES: [&str; 3] = ["program-minipar", "programa-miniPar", "programa_minipar"];

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    tokens: Vec<Token>,
    iterator: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: vec![],
            iterator: input.chars().peekable(),
            line: 1,
        }
    }

    /// Scan the whole input. Never fails: lexical problems are represented
    /// in-band as [`TokenKind::Error`] tokens.
    pub fn lex(mut self) -> Vec<Token> {
        while self.lex_one() {}
        self.tokens
    }

    fn peek(&mut self) -> Option<char> {
        self.iterator.peek().copied()
    }

    /// Character after the next one, without consuming anything.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.iterator.clone();
        ahead.next();
        ahead.next()
    }

    fn next(&mut self) -> Option<char> {
        let next = self.iterator.next();
        if next == Some('\n') {
            self.line += 1;
        }
        next
    }

    fn next_if(&mut self, func: impl FnOnce(char) -> bool) -> Option<char> {
        match self.peek() {
            Some(c) if func(c) => self.next(),
            _ => None,
        }
    }

    fn eat_whitespace_and_comments(&mut self) {
        loop {
            while self.next_if(|c| c.is_whitespace()).is_some() {}

            if self.peek() == Some('#') {
                while self.next_if(|c| c != '\n').is_some() {}
                continue;
            }

            break;
        }
    }

    /// Scan a single token. Returns `false` once the input is exhausted.
    fn lex_one(&mut self) -> bool {
        self.eat_whitespace_and_comments();

        let Some(next) = self.peek() else {
            return false;
        };

        match next {
            'a'..='z' | 'A'..='Z' | '_' => self.lex_word(),
            '0'..='9' => self.lex_number(false),
            '"' => self.lex_string(),
            '-' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.lex_number(true)
            }
            _ => self.lex_operator(),
        }

        true
    }

    fn lex_word(&mut self) {
        let line = self.line;
        let mut lexeme = String::new();

        while let Some(c) = self.next_if(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            lexeme.push(c);
        }

        if PROGRAM_ALIASES.contains(&lexeme.as_str()) {
            self.tokens.push(Token::new(TokenKind::Programa, lexeme, line));
            return;
        }

        let kind = KEYWORDS
            .get(lexeme.to_lowercase().as_str())
            .copied()
            .unwrap_or(TokenKind::Id);

        self.tokens.push(Token::new(kind, lexeme, line));
    }

    fn lex_number(&mut self, signed: bool) {
        let line = self.line;
        let mut lexeme = String::new();

        if signed {
            if let Some(sign) = self.next() {
                lexeme.push(sign);
            }
        }

        while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
            lexeme.push(c);
        }

        // A decimal point only belongs to the number when a digit follows;
        // otherwise `0..3` would swallow the range dots.
        let is_real = self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit());

        if is_real {
            if let Some(point) = self.next() {
                lexeme.push(point);
            }
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                lexeme.push(c);
            }
            self.tokens.push(Token::new(TokenKind::NumReal, lexeme, line));
        } else {
            self.tokens.push(Token::new(TokenKind::NumInteiro, lexeme, line));
        }
    }

    fn lex_string(&mut self) {
        let line = self.line;

        // opening quote
        self.next();

        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.next();
                    self.tokens.push(Token::new(TokenKind::Str, value, line));
                    return;
                }
                Some('\n') | None => {
                    // unterminated string: report the opening quote
                    self.tokens.push(Token::new(TokenKind::Error, "\"", line));
                    return;
                }
                Some(c) => {
                    value.push(c);
                    self.next();
                }
            }
        }
    }

    fn lex_operator(&mut self) {
        let line = self.line;
        let first = self.next().unwrap_or_default();

        let (kind, lexeme) = match first {
            '=' if self.peek() == Some('=') => {
                self.next();
                (TokenKind::OpRel, "==".to_owned())
            }
            '!' if self.peek() == Some('=') => {
                self.next();
                (TokenKind::OpRel, "!=".to_owned())
            }
            '<' if self.peek() == Some('=') => {
                self.next();
                (TokenKind::OpRel, "<=".to_owned())
            }
            '>' if self.peek() == Some('=') => {
                self.next();
                (TokenKind::OpRel, ">=".to_owned())
            }
            '<' => (TokenKind::OpRel, "<".to_owned()),
            '>' => (TokenKind::OpRel, ">".to_owned()),
            '=' => (TokenKind::Atribuicao, "=".to_owned()),
            '+' => (TokenKind::OpSoma, "+".to_owned()),
            '-' => (TokenKind::OpSub, "-".to_owned()),
            '*' => (TokenKind::OpMult, "*".to_owned()),
            '/' => (TokenKind::OpDiv, "/".to_owned()),
            '(' => (TokenKind::AbreParenteses, "(".to_owned()),
            ')' => (TokenKind::FechaParenteses, ")".to_owned()),
            '{' => (TokenKind::AbreChaves, "{".to_owned()),
            '}' => (TokenKind::FechaChaves, "}".to_owned()),
            '[' => (TokenKind::AbreColchete, "[".to_owned()),
            ']' => (TokenKind::FechaColchete, "]".to_owned()),
            ':' => (TokenKind::DoisPontos, ":".to_owned()),
            ',' => (TokenKind::Virgula, ",".to_owned()),
            '.' => (TokenKind::Ponto, ".".to_owned()),
            other => (TokenKind::Error, other.to_string()),
        };

        self.tokens.push(Token::new(kind, lexeme, line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).lex().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_identifier() {
        let tokens = Lexer::new("contador").lex();

        assert_eq!(
            vec![Token::new(TokenKind::Id, "contador", 1)],
            tokens
        );
    }

    #[test]
    fn test_lex_keyword_case_insensitive() {
        assert_eq!(vec![TokenKind::Enquanto], kinds("ENQUANTO"));
        assert_eq!(vec![TokenKind::Enquanto], kinds("enquanto"));
        assert_eq!(vec![TokenKind::Faca], kinds("FACA"));
    }

    #[test]
    fn test_lex_program_header_aliases() {
        for alias in ["program-minipar", "programa-miniPar", "programa_minipar"] {
            assert_eq!(vec![TokenKind::Programa], kinds(alias), "alias {alias}");
        }
    }

    #[test]
    fn test_lex_identifier_with_hyphen() {
        let tokens = Lexer::new("taxa-de-erro").lex();

        assert_eq!(vec![Token::new(TokenKind::Id, "taxa-de-erro", 1)], tokens);
    }

    #[test]
    fn test_lex_boolean_spellings() {
        assert_eq!(
            vec![
                TokenKind::Boolean,
                TokenKind::Boolean,
                TokenKind::Boolean,
                TokenKind::Boolean
            ],
            kinds("verdadeiro falso true false")
        );
    }

    #[test]
    fn test_lex_numbers() {
        let tokens = Lexer::new("42 -7 3.25").lex();

        assert_eq!(
            vec![
                Token::new(TokenKind::NumInteiro, "42", 1),
                Token::new(TokenKind::NumInteiro, "-7", 1),
                Token::new(TokenKind::NumReal, "3.25", 1),
            ],
            tokens
        );
    }

    #[test]
    fn test_lex_range_dots_are_not_a_real() {
        assert_eq!(
            vec![
                TokenKind::NumInteiro,
                TokenKind::Ponto,
                TokenKind::Ponto,
                TokenKind::NumInteiro
            ],
            kinds("0..3")
        );
    }

    #[test]
    fn test_lex_string_without_escapes() {
        let tokens = Lexer::new("\"ola mundo\"").lex();

        assert_eq!(vec![Token::new(TokenKind::Str, "ola mundo", 1)], tokens);
    }

    #[test]
    fn test_lex_relational_operators() {
        let tokens = Lexer::new("== != <= >= < >").lex();

        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(vec!["==", "!=", "<=", ">=", "<", ">"], lexemes);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::OpRel));
    }

    #[test]
    fn test_lex_error_token_keeps_scanning() {
        let tokens = Lexer::new("x $ y").lex();

        assert_eq!(
            vec![
                Token::new(TokenKind::Id, "x", 1),
                Token::new(TokenKind::Error, "$", 1),
                Token::new(TokenKind::Id, "y", 1),
            ],
            tokens
        );
    }

    #[test]
    fn test_lex_comments_and_lines() {
        let tokens = Lexer::new("x = 1 # comentario\ny = 2").lex();

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[3].line, 2);
        assert_eq!(tokens[3].lexeme, "y");
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn test_lex_whitespace_idempotence() {
        let compact: Vec<_> = Lexer::new("x=1 enquanto x<2 faca")
            .lex()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect();
        let spaced: Vec<_> = Lexer::new("  x =\t1\n# c\n  enquanto   x < 2   faca ")
            .lex()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect();

        assert_eq!(compact, spaced);
    }

    #[test]
    fn test_lex_channel_send_line() {
        assert_eq!(
            vec![
                TokenKind::Id,
                TokenKind::Ponto,
                TokenKind::Send,
                TokenKind::AbreParenteses,
                TokenKind::Str,
                TokenKind::Virgula,
                TokenKind::NumInteiro,
                TokenKind::Virgula,
                TokenKind::NumInteiro,
                TokenKind::Virgula,
                TokenKind::Id,
                TokenKind::FechaParenteses,
            ],
            kinds("calculadora.send(\"+\", 10, 5, resultado)")
        );
    }
}
