// SPDX-License-Identifier: Unlicense
//! Recursive-descent parser with precedence climbing for binary operators.
//!
//! ```text
//! program     := function EOF | EOF
//! function    := FN IDENTIFIER '(' ')' '{' expression '}'
//! expression  := binary(0)
//! binary(p)   := primary { BINOP-with-precedence>=p primary-or-recurse }
//! primary     := NUMBER | '-' primary | '(' expression ')'
//! ```
use crate::ast::{self, BinaryOperator, Node, NodeId, UnaryOperator};
use crate::lexer::{LexError, Lexer, Position, Token, TokenKind};
use std::fmt;

/// How many `(` and unary `-` may enclose one another. Deeper input fails with
/// [`ParseError::NestingTooDeep`] instead of exhausting the stack.
pub const MAX_NESTING_DEPTH: usize = 256;

/// The token a syntax error was reported at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfFile => write!(f, "end of file at {}", self.position),
            _ => write!(f, "`{}` at {}", self.text, self.position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Lex(LexError),
    Arena(ast::ArenaError),
    /// A primary expression was expected.
    UnexpectedToken(Found),
    UnexpectedTrailingInput(Found),
    /// `opened_at` is `None` for a `)` that closes nothing.
    UnmatchedParenthesis {
        opened_at: Option<Position>,
        found: Found,
    },
    MalformedFunction {
        expected: &'static str,
        found: Found,
    },
    ExpectedOperator(Found),
    /// An integer literal that does not fit in `i64`.
    InvalidNumber(Found),
    NestingTooDeep {
        limit: usize,
        found: Found,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "lexing failed: {e}"),
            ParseError::Arena(e) => write!(f, "{e}"),
            ParseError::UnexpectedToken(found) => {
                write!(f, "expected a number, `-` or `(`, found {found}")
            }
            ParseError::UnexpectedTrailingInput(found) => {
                write!(f, "expected end of file after the function, found {found}")
            }
            ParseError::UnmatchedParenthesis {
                opened_at: Some(opened_at),
                found,
            } => write!(
                f,
                "unmatched parenthesis opened at {opened_at}: expected `)`, found {found}"
            ),
            ParseError::UnmatchedParenthesis {
                opened_at: None,
                found,
            } => write!(f, "unmatched parenthesis: {found} closes nothing"),
            ParseError::MalformedFunction { expected, found } => {
                write!(f, "malformed function: expected {expected}, found {found}")
            }
            ParseError::ExpectedOperator(found) => {
                write!(f, "expected a binary operator, found {found}")
            }
            ParseError::InvalidNumber(found) => {
                write!(f, "integer literal out of range, found {found}")
            }
            ParseError::NestingTooDeep { limit, found } => {
                write!(f, "expression nested deeper than {limit} levels, found {found}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(e) => Some(e),
            ParseError::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

impl From<ast::ArenaError> for ParseError {
    fn from(e: ast::ArenaError) -> Self {
        ParseError::Arena(e)
    }
}

/// Single-pass parser. It owns the lexer and fills a borrowed arena.
pub struct Parser<'src, 'a> {
    lexer: Lexer<'src>,
    arena: &'a mut ast::Arena<'src>,
    depth: usize,
}

impl<'src, 'a> Parser<'src, 'a> {
    pub fn new(lexer: Lexer<'src>, arena: &'a mut ast::Arena<'src>) -> Self {
        Self {
            lexer,
            arena,
            depth: 0,
        }
    }

    /// Parses a whole compilation unit.
    ///
    /// Returns `None` for an empty program. The first error aborts parsing;
    /// nodes allocated before it stay in the arena but are unreachable.
    pub fn parse(mut self) -> Result<Option<NodeId>, ParseError> {
        self.advance()?;
        if self.current().kind == TokenKind::EndOfFile {
            return Ok(None);
        }

        let root = self.parse_function()?;
        if self.current().kind != TokenKind::EndOfFile {
            return Err(ParseError::UnexpectedTrailingInput(self.found()));
        }
        Ok(Some(root))
    }

    fn current(&self) -> Token<'src> {
        self.lexer.current_token()
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        Ok(self.lexer.read_next_token()?)
    }

    fn alloc(&mut self, node: Node<'src>) -> Result<NodeId, ParseError> {
        Ok(self.arena.alloc(node)?)
    }

    fn position(&self) -> Position {
        Position::locate(self.lexer.source(), self.current().offset)
    }

    fn found(&self) -> Found {
        let token = self.current();
        Found {
            kind: token.kind,
            text: token.text.to_owned(),
            position: self.position(),
        }
    }

    fn at_expression_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::EndOfFile | TokenKind::CloseParenthesis | TokenKind::CloseBrace
        )
    }

    fn current_binary_operator(&self) -> Option<BinaryOperator> {
        BinaryOperator::from_token(self.current().kind)
    }

    /// Enters one more `(` or `-`. The caller leaves it by decrementing `depth`.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth == MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                found: self.found(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), ParseError> {
        if self.current().kind != kind {
            return Err(ParseError::MalformedFunction {
                expected,
                found: self.found(),
            });
        }
        self.advance()
    }

    fn parse_function(&mut self) -> Result<NodeId, ParseError> {
        self.expect(TokenKind::Function, "`fn`")?;

        let name = self.current();
        if name.kind != TokenKind::Identifier {
            return Err(ParseError::MalformedFunction {
                expected: "a function name",
                found: self.found(),
            });
        }
        self.advance()?;

        self.expect(TokenKind::OpenParenthesis, "`(`")?;
        self.expect(TokenKind::CloseParenthesis, "`)`")?;
        self.expect(TokenKind::OpenBrace, "`{`")?;
        if self.current().kind == TokenKind::CloseBrace {
            return Err(ParseError::MalformedFunction {
                expected: "an expression",
                found: self.found(),
            });
        }
        let body = self.parse_expression()?;
        if self.current().kind == TokenKind::CloseParenthesis {
            return Err(ParseError::UnmatchedParenthesis {
                opened_at: None,
                found: self.found(),
            });
        }
        self.expect(TokenKind::CloseBrace, "`}`")?;

        log::debug!("parsed function `{}`", name.text);
        self.alloc(Node::Function {
            name: name.text,
            body,
        })
    }

    fn parse_expression(&mut self) -> Result<NodeId, ParseError> {
        let left = self.parse_primary()?;
        self.parse_binary(0, left)
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let token = self.current();
        match token.kind {
            TokenKind::Number => {
                let value = token
                    .text
                    .parse::<i64>()
                    .map_err(|_| ParseError::InvalidNumber(self.found()))?;
                self.advance()?;
                self.alloc(Node::Number { value })
            }
            TokenKind::Minus => {
                self.descend()?;
                self.advance()?;
                let operand = self.parse_primary()?;
                self.depth -= 1;
                self.alloc(Node::UnaryOp {
                    operator: UnaryOperator::Negate,
                    operand,
                })
            }
            TokenKind::OpenParenthesis => self.parse_parenthesis(),
            _ => Err(ParseError::UnexpectedToken(self.found())),
        }
    }

    fn parse_parenthesis(&mut self) -> Result<NodeId, ParseError> {
        self.descend()?;
        let opened_at = self.position();
        self.advance()?;
        let inner = self.parse_expression()?;
        if self.current().kind != TokenKind::CloseParenthesis {
            return Err(ParseError::UnmatchedParenthesis {
                opened_at: Some(opened_at),
                found: self.found(),
            });
        }
        self.advance()?;
        self.depth -= 1;
        Ok(inner)
    }

    /// Folds operators of precedence `floor` or higher into `left`.
    ///
    /// An operator below the floor is left unconsumed for the caller.
    fn parse_binary(&mut self, floor: u8, mut left: NodeId) -> Result<NodeId, ParseError> {
        loop {
            if self.at_expression_end() {
                return Ok(left);
            }
            let operator = match self.current_binary_operator() {
                Some(operator) => operator,
                None => return Err(ParseError::ExpectedOperator(self.found())),
            };
            let precedence = operator.precedence();
            if precedence < floor {
                return Ok(left);
            }
            self.advance()?;

            let mut right = self.parse_primary()?;
            if let Some(next) = self.current_binary_operator() {
                if next.precedence() > precedence {
                    right = self.parse_binary(precedence + 1, right)?;
                }
            }

            left = self.alloc(Node::BinaryOp {
                operator,
                left,
                right,
            })?;
        }
    }
}

/// Parses `source` into a fresh arena.
pub fn parse(source: &str) -> Result<(ast::Arena<'_>, Option<NodeId>), ParseError> {
    let mut arena = ast::Arena::new();
    let root = Parser::new(Lexer::new(source), &mut arena).parse()?;
    log::debug!(
        "parsed {} AST nodes in {} chunk(s)",
        arena.len(),
        arena.chunk_count()
    );
    Ok((arena, root))
}
