//! Recursive-descent parser for MiniPar.
//!
//! Expressions are precedence layered (relational < additive <
//! multiplicative < unary < primary). Loops carry a mandatory
//! `FIM_ENQUANTO`; `SE` bodies are greedy unless a `FIM_SE` closes them, and
//! the repair pass in [`repair`] relocates the increments that greediness
//! misplaces. Errors are collected, never thrown: the parser always returns
//! its best-effort AST together with everything it could not make sense of.
mod repair;

pub use repair::relocate_loop_increments;

use std::{error::Error, fmt::Display};

use crate::{
    ast::{BinaryVerb, Expression, Param, Program, Statement, TypeName, UnaryVerb},
    lexer::{Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    fn unexpected(token: &Token) -> ParseError {
        ParseError {
            message: format!(
                "Erro de Sintaxe: Token inesperado '{}' (Tipo: {}) na linha {}",
                token.lexeme, token.kind, token.line
            ),
            line: token.line,
        }
    }

    fn eof() -> ParseError {
        ParseError {
            message: "Erro de Sintaxe: Fim inesperado do arquivo.".to_owned(),
            line: 0,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ParseError {}

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            errors: vec![],
        }
    }

    /// Parse the token stream. The AST is `None` only when not a single
    /// statement could be recovered.
    pub fn parse(mut self) -> (Option<Program>, Vec<ParseError>) {
        if self.peek_kind() == Some(TokenKind::Programa) {
            self.next();
        }

        let mut body = vec![];

        loop {
            body.append(&mut self.statement_list(false));

            match self.peek() {
                None => break,
                Some(token) if token.kind == TokenKind::FimPrograma => {
                    self.next();
                }
                Some(token) => {
                    // stray block terminator at top level
                    let error = ParseError::unexpected(token);
                    self.errors.push(error);
                    self.next();
                }
            }
        }

        let program = if body.is_empty() && !self.errors.is_empty() {
            None
        } else {
            Some(Program::from_statements(body))
        };

        (program, self.errors)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.index + offset).map(|t| t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        match self.tokens.get(self.index) {
            Some(token) if token.kind == kind => {
                let token = token.clone();
                self.index += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::unexpected(token)),
            None => Err(ParseError::eof()),
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.next();
            return true;
        }
        false
    }

    /// Parse statements until a terminator. With `cut_blocks`, a `SEQ` or
    /// `PAR` keyword also ends the list, so consecutive blocks become
    /// siblings instead of nesting.
    fn statement_list(&mut self, cut_blocks: bool) -> Vec<Statement> {
        let mut statements = vec![];

        loop {
            let Some(token) = self.peek() else {
                break;
            };

            match token.kind {
                TokenKind::FimPrograma
                | TokenKind::FimEnquanto
                | TokenKind::FimSe
                | TokenKind::Senao => break,
                TokenKind::Seq | TokenKind::Par if cut_blocks => break,
                TokenKind::Def => {
                    match self.parse_function() {
                        Ok((function, mut extras)) => {
                            statements.push(function);
                            statements.append(&mut extras);
                        }
                        Err(error) => self.recover(error),
                    }
                    continue;
                }
                _ => {}
            }

            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => self.recover(error),
            }
        }

        statements
    }

    /// Record the error and skip one token so the list can resume; reporting
    /// continues until EOF.
    fn recover(&mut self, error: ParseError) {
        self.errors.push(error);
        self.next();
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        let Some(token) = self.peek() else {
            return Err(ParseError::eof());
        };

        match token.kind {
            TokenKind::Seq => {
                self.next();
                self.eat(TokenKind::DoisPontos);
                Ok(Statement::SeqBlock(self.statement_list(true)))
            }
            TokenKind::Par => {
                self.next();
                self.eat(TokenKind::DoisPontos);
                // block children of a PAR are parsed as its statements
                Ok(Statement::ParBlock(self.statement_list(false)))
            }
            TokenKind::Declare => self.parse_declaration(),
            TokenKind::CChannel => self.parse_channel(),
            TokenKind::Se => self.parse_if(),
            TokenKind::Enquanto => self.parse_while(),
            TokenKind::Para => self.parse_for(),
            TokenKind::Return => {
                self.next();
                Ok(Statement::Return(self.parse_expression()?))
            }
            TokenKind::Leia => {
                self.next();
                self.expect(TokenKind::AbreParenteses)?;
                let name = self.expect(TokenKind::Id)?.lexeme;
                self.expect(TokenKind::FechaParenteses)?;
                Ok(Statement::Read(name))
            }
            TokenKind::Escreva => {
                self.next();
                self.expect(TokenKind::AbreParenteses)?;
                let exprs = self.parse_expression_list()?;
                self.expect(TokenKind::FechaParenteses)?;
                Ok(Statement::Write(exprs))
            }
            TokenKind::Id => self.parse_id_statement(),
            _ => Err(ParseError::unexpected(token)),
        }
    }

    fn parse_declaration(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Declare)?;
        let name = self.expect(TokenKind::Id)?.lexeme;
        self.expect(TokenKind::DoisPontos)?;
        let ty = self.parse_type()?;

        let mut dims = vec![];
        while self.eat(TokenKind::AbreColchete) {
            let dim = self.expect(TokenKind::NumInteiro)?;
            dims.push(parse_int(&dim)?);
            self.expect(TokenKind::FechaColchete)?;
        }

        if dims.is_empty() {
            Ok(Statement::VarDecl { name, ty })
        } else {
            Ok(Statement::ArrayDecl { name, ty, dims })
        }
    }

    fn parse_type(&mut self) -> PResult<TypeName> {
        let Some(token) = self.peek() else {
            return Err(ParseError::eof());
        };

        let ty = match token.kind {
            TokenKind::Inteiro => TypeName::Inteiro,
            TokenKind::Real => TypeName::Real,
            TokenKind::StringType => TypeName::StringType,
            TokenKind::Bool => TypeName::Bool,
            _ => return Err(ParseError::unexpected(token)),
        };

        self.next();
        Ok(ty)
    }

    fn parse_channel(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::CChannel)?;
        let name = self.expect(TokenKind::Id)?.lexeme;
        let endpoint1 = self.expect(TokenKind::Id)?.lexeme;
        let endpoint2 = self.expect(TokenKind::Id)?.lexeme;

        Ok(Statement::Channel {
            name,
            endpoint1,
            endpoint2,
        })
    }

    fn parse_if(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Se)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Entao)?;
        self.eat(TokenKind::DoisPontos);

        let then_block = self.statement_list(true);

        let else_block = if self.eat(TokenKind::Senao) {
            self.eat(TokenKind::DoisPontos);
            Some(self.statement_list(true))
        } else {
            None
        };

        // the terminator is optional; without it the body stays greedy
        self.eat(TokenKind::FimSe);

        Ok(Statement::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Enquanto)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Faca)?;
        self.eat(TokenKind::DoisPontos);

        let body = self.statement_list(true);

        // mandatory: this is the cut point that keeps loop bodies
        // unambiguous
        if let Err(error) = self.expect(TokenKind::FimEnquanto) {
            self.errors.push(error);
        }

        let body = repair::relocate_loop_increments(cond.control_variable(), body);

        Ok(Statement::While { cond, body })
    }

    fn parse_for(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Para)?;
        let var = self.expect(TokenKind::Id)?.lexeme;
        self.expect(TokenKind::Em)?;

        let lo = self.expect(TokenKind::NumInteiro)?;
        self.expect(TokenKind::Ponto)?;
        self.expect(TokenKind::Ponto)?;
        let hi = self.expect(TokenKind::NumInteiro)?;

        let body = self.statement_list(true);

        Ok(Statement::For {
            var,
            lo: Expression::Int(parse_int(&lo)?),
            hi: Expression::Int(parse_int(&hi)?),
            body,
        })
    }

    fn parse_function(&mut self) -> PResult<(Statement, Vec<Statement>)> {
        self.expect(TokenKind::Def)?;
        let name = self.expect(TokenKind::Id)?.lexeme;
        self.expect(TokenKind::AbreParenteses)?;

        let mut params = vec![];
        if self.peek_kind() != Some(TokenKind::FechaParenteses) {
            loop {
                let name = self.expect(TokenKind::Id)?.lexeme;
                self.expect(TokenKind::DoisPontos)?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty });

                if !self.eat(TokenKind::Virgula) {
                    break;
                }
            }
        }
        self.expect(TokenKind::FechaParenteses)?;

        self.expect(TokenKind::DoisPontos)?;
        let ret = self.parse_type()?;
        self.expect(TokenKind::DoisPontos)?;

        let body = self.statement_list(true);
        let (body, extras) = repair::split_function_body(&params, body);

        Ok((
            Statement::FuncDecl {
                name,
                params,
                ret,
                body,
            },
            extras,
        ))
    }

    /// Statements that start with an identifier: assignment, array
    /// assignment, channel send/receive, or a bare call.
    fn parse_id_statement(&mut self) -> PResult<Statement> {
        match (self.peek_kind_at(1), self.peek_kind_at(2)) {
            (Some(TokenKind::Ponto), Some(TokenKind::Send)) => {
                let channel = self.expect(TokenKind::Id)?.lexeme;
                self.next();
                self.next();
                self.expect(TokenKind::AbreParenteses)?;
                let args = self.parse_expression_list()?;
                self.expect(TokenKind::FechaParenteses)?;
                Ok(Statement::Send { channel, args })
            }
            (Some(TokenKind::Ponto), Some(TokenKind::Receive)) => {
                let channel = self.expect(TokenKind::Id)?.lexeme;
                self.next();
                self.next();
                self.expect(TokenKind::AbreParenteses)?;
                let mut vars = vec![self.expect(TokenKind::Id)?.lexeme];
                while self.eat(TokenKind::Virgula) {
                    vars.push(self.expect(TokenKind::Id)?.lexeme);
                }
                self.expect(TokenKind::FechaParenteses)?;
                Ok(Statement::Receive { channel, vars })
            }
            (Some(TokenKind::Atribuicao), _) => {
                let name = self.expect(TokenKind::Id)?.lexeme;
                self.next();
                let expr = self.parse_expression()?;
                Ok(Statement::Assign { name, expr })
            }
            (Some(TokenKind::AbreColchete), _) => {
                let name = self.expect(TokenKind::Id)?.lexeme;
                let indices = self.parse_indices()?;
                self.expect(TokenKind::Atribuicao)?;
                let expr = self.parse_expression()?;
                Ok(Statement::ArrayAssign {
                    name,
                    indices,
                    expr,
                })
            }
            (Some(TokenKind::AbreParenteses), _) => {
                let name = self.expect(TokenKind::Id)?.lexeme;
                self.next();
                let args = if self.peek_kind() == Some(TokenKind::FechaParenteses) {
                    vec![]
                } else {
                    self.parse_expression_list()?
                };
                self.expect(TokenKind::FechaParenteses)?;
                Ok(Statement::Call { name, args })
            }
            _ => {
                let token = self.peek().cloned().unwrap_or_else(|| {
                    Token::new(TokenKind::Error, "", 0)
                });
                Err(ParseError::unexpected(&token))
            }
        }
    }

    fn parse_indices(&mut self) -> PResult<Vec<Expression>> {
        let mut indices = vec![];
        while self.eat(TokenKind::AbreColchete) {
            indices.push(self.parse_expression()?);
            self.expect(TokenKind::FechaColchete)?;
        }
        Ok(indices)
    }

    fn parse_expression_list(&mut self) -> PResult<Vec<Expression>> {
        let mut exprs = vec![self.parse_expression()?];
        while self.eat(TokenKind::Virgula) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    fn parse_expression(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_additive()?;

        while self.peek_kind() == Some(TokenKind::OpRel) {
            let Some(op) = self.next() else {
                return Err(ParseError::eof());
            };
            let verb = BinaryVerb::from_lexeme(&op.lexeme)
                .ok_or_else(|| ParseError::unexpected(&op))?;
            let rhs = self.parse_additive()?;
            lhs = Expression::Binary {
                verb,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_multiplicative()?;

        while matches!(
            self.peek_kind(),
            Some(TokenKind::OpSoma) | Some(TokenKind::OpSub)
        ) {
            let verb = if self.peek_kind() == Some(TokenKind::OpSoma) {
                BinaryVerb::Add
            } else {
                BinaryVerb::Sub
            };
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = Expression::Binary {
                verb,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_factor()?;

        while matches!(
            self.peek_kind(),
            Some(TokenKind::OpMult) | Some(TokenKind::OpDiv)
        ) {
            let verb = if self.peek_kind() == Some(TokenKind::OpMult) {
                BinaryVerb::Mul
            } else {
                BinaryVerb::Div
            };
            self.next();
            let rhs = self.parse_factor()?;
            lhs = Expression::Binary {
                verb,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_factor(&mut self) -> PResult<Expression> {
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::eof());
        };

        match token.kind {
            TokenKind::NumInteiro => {
                self.next();
                Ok(Expression::Int(parse_int(&token)?))
            }
            TokenKind::NumReal => {
                self.next();
                let value = token.lexeme.parse::<f64>().map_err(|_| ParseError {
                    message: format!(
                        "Erro de Sintaxe: Número real inválido '{}' na linha {}",
                        token.lexeme, token.line
                    ),
                    line: token.line,
                })?;
                Ok(Expression::Real(value))
            }
            TokenKind::Str => {
                self.next();
                Ok(Expression::Str(token.lexeme))
            }
            TokenKind::Boolean => {
                self.next();
                let value = matches!(
                    token.lexeme.to_lowercase().as_str(),
                    "verdadeiro" | "true"
                );
                Ok(Expression::Bool(value))
            }
            TokenKind::OpSub => {
                self.next();
                let expr = self.parse_factor()?;
                Ok(Expression::Unary {
                    verb: UnaryVerb::Neg,
                    expr: Box::new(expr),
                })
            }
            TokenKind::AbreParenteses => {
                self.next();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::FechaParenteses)?;
                Ok(expr)
            }
            TokenKind::Id => {
                self.next();
                match self.peek_kind() {
                    Some(TokenKind::AbreParenteses) => {
                        self.next();
                        let args = if self.peek_kind() == Some(TokenKind::FechaParenteses) {
                            vec![]
                        } else {
                            self.parse_expression_list()?
                        };
                        self.expect(TokenKind::FechaParenteses)?;
                        Ok(Expression::Call {
                            name: token.lexeme,
                            args,
                        })
                    }
                    Some(TokenKind::AbreColchete) => {
                        let indices = self.parse_indices()?;
                        Ok(Expression::ArrayRef {
                            name: token.lexeme,
                            indices,
                        })
                    }
                    _ => Ok(Expression::Id(token.lexeme)),
                }
            }
            _ => Err(ParseError::unexpected(&token)),
        }
    }
}

fn parse_int(token: &Token) -> PResult<i64> {
    token.lexeme.parse::<i64>().map_err(|_| ParseError {
        message: format!(
            "Erro de Sintaxe: Número inteiro inválido '{}' na linha {}",
            token.lexeme, token.line
        ),
        line: token.line,
    })
}
