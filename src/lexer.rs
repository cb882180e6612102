// SPDX-License-Identifier: Unlicense
use std::fmt;

/// Reserved word that opens a function declaration.
pub const FUNCTION_KEYWORD: &str = "fn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EndOfFile,
    Identifier,
    Number,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    OpenParenthesis,
    CloseParenthesis,
    OpenBrace,
    CloseBrace,
    Function,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::EndOfFile => "end of file",
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Asterisk => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::OpenParenthesis => "`(`",
            TokenKind::CloseParenthesis => "`)`",
            TokenKind::OpenBrace => "`{`",
            TokenKind::CloseBrace => "`}`",
            TokenKind::Function => "`fn`",
        };
        f.write_str(s)
    }
}

/// A token borrowed from the source buffer.
///
/// `offset` is the byte offset of `text` in the source. The end-of-file token
/// has empty text and sits at the end of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub offset: usize,
}

impl<'src> Token<'src> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// 1-based line and column of a byte offset, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn locate(source: &str, offset: usize) -> Self {
        let before = &source[..offset.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnrecognizedCharacter { character: char, position: Position },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnrecognizedCharacter {
                character,
                position,
            } => write!(f, "unrecognized character {character:?} at {position}"),
        }
    }
}

impl std::error::Error for LexError {}

/// On-demand lexer holding a single token of lookahead.
///
/// Nothing is read until the first call to [`Lexer::read_next_token`]; before
/// that, the current token is an empty end-of-file placeholder at offset 0.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    current: Token<'src>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            offset: 0,
            current: Token {
                kind: TokenKind::EndOfFile,
                text: "",
                offset: 0,
            },
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn remaining_input(&self) -> &'src str {
        &self.source[self.offset..]
    }

    pub fn current_token(&self) -> Token<'src> {
        self.current
    }

    /// Replaces the current token with the next one in the source.
    ///
    /// Once the end of input is reached, every call yields end-of-file again
    /// without moving. On error the lexer state is left untouched.
    pub fn read_next_token(&mut self) -> Result<(), LexError> {
        let rest = self.remaining_input();
        let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
        let start = self.offset + (rest.len() - trimmed.len());

        let kind = match trimmed.chars().next() {
            None => TokenKind::EndOfFile,
            Some(c) if c.is_ascii_alphabetic() || c == '_' => TokenKind::Identifier,
            Some(c) if c.is_ascii_digit() => TokenKind::Number,
            Some('+') => TokenKind::Plus,
            Some('-') => TokenKind::Minus,
            Some('*') => TokenKind::Asterisk,
            Some('/') => TokenKind::Slash,
            Some('%') => TokenKind::Percent,
            Some('(') => TokenKind::OpenParenthesis,
            Some(')') => TokenKind::CloseParenthesis,
            Some('{') => TokenKind::OpenBrace,
            Some('}') => TokenKind::CloseBrace,
            Some(character) => {
                return Err(LexError::UnrecognizedCharacter {
                    character,
                    position: Position::locate(self.source, start),
                })
            }
        };

        let len = match kind {
            TokenKind::EndOfFile => 0,
            TokenKind::Identifier => {
                scan_while(trimmed, |c| c.is_ascii_alphanumeric() || c == '_')
            }
            TokenKind::Number => scan_while(trimmed, |c| c.is_ascii_digit()),
            _ => 1,
        };
        let text = &trimmed[..len];
        let kind = if kind == TokenKind::Identifier && text == FUNCTION_KEYWORD {
            TokenKind::Function
        } else {
            kind
        };

        self.current = Token {
            kind,
            text,
            offset: start,
        };
        self.offset = start + len;
        log::trace!("token {:?} {:?} at byte {}", kind, text, start);
        Ok(())
    }

    /// Lexes the whole source, end-of-file token included.
    pub fn tokenize(source: &'src str) -> Result<Vec<Token<'src>>, LexError> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            lexer.read_next_token()?;
            let token = lexer.current_token();
            tokens.push(token);
            if token.kind == TokenKind::EndOfFile {
                return Ok(tokens);
            }
        }
    }
}

/// Byte length of the longest ASCII prefix of `input` matching `accept`.
fn scan_while(input: &str, accept: impl Fn(char) -> bool) -> usize {
    input.find(|c: char| !accept(c)).unwrap_or(input.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert, prop_assert_eq, proptest};

    fn kinds(source: &str) -> Result<Vec<TokenKind>, LexError> {
        Ok(Lexer::tokenize(source)?.iter().map(|t| t.kind).collect())
    }

    #[test]
    fn lexer_should_classify_function_declaration() -> Result<(), LexError> {
        use TokenKind::*;
        assert_eq!(
            kinds("fn main() { 1 + 2 * 3 / 4 % 5 - 6 }")?,
            vec![
                Function,
                Identifier,
                OpenParenthesis,
                CloseParenthesis,
                OpenBrace,
                Number,
                Plus,
                Number,
                Asterisk,
                Number,
                Slash,
                Number,
                Percent,
                Number,
                Minus,
                Number,
                CloseBrace,
                EndOfFile,
            ]
        );
        Ok(())
    }

    #[test]
    fn lexer_should_scan_maximal_runs() -> Result<(), LexError> {
        let tokens = Lexer::tokenize("fn_x _a1 fn 007")?;
        let texts: Vec<_> = tokens.iter().map(|t| (t.kind, t.text)).collect();
        assert_eq!(
            texts,
            vec![
                (TokenKind::Identifier, "fn_x"),
                (TokenKind::Identifier, "_a1"),
                (TokenKind::Function, "fn"),
                (TokenKind::Number, "007"),
                (TokenKind::EndOfFile, ""),
            ]
        );
        Ok(())
    }

    #[test]
    fn lexer_should_split_number_followed_by_letters() -> Result<(), LexError> {
        let tokens = Lexer::tokenize("12ab")?;
        assert_eq!(tokens[0].text, "12");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text, "ab");
        Ok(())
    }

    #[test]
    fn lexer_should_yield_eof_for_empty_input() -> Result<(), LexError> {
        let mut lexer = Lexer::new("");
        lexer.read_next_token()?;
        assert_eq!(lexer.current_token().kind, TokenKind::EndOfFile);
        assert_eq!(lexer.current_token().text, "");
        Ok(())
    }

    #[test]
    fn lexer_should_repeat_eof_without_moving() -> Result<(), LexError> {
        let mut lexer = Lexer::new("42  \n");
        lexer.read_next_token()?;
        assert_eq!(lexer.current_token().kind, TokenKind::Number);
        lexer.read_next_token()?;
        let eof = lexer.current_token();
        assert_eq!(eof.kind, TokenKind::EndOfFile);
        assert_eq!(eof.offset, 5);
        for _ in 0..3 {
            lexer.read_next_token()?;
            assert_eq!(lexer.current_token(), eof);
            assert_eq!(lexer.remaining_input(), "");
        }
        Ok(())
    }

    #[test]
    fn lexer_should_reject_unknown_character() {
        let mut lexer = Lexer::new("fn f() {\n  1 # 2 }");
        let mut result = Ok(());
        while result.is_ok() && lexer.current_token().text != "1" {
            result = lexer.read_next_token();
        }
        assert_eq!(
            lexer.read_next_token(),
            Err(LexError::UnrecognizedCharacter {
                character: '#',
                position: Position { line: 2, column: 5 },
            })
        );
        // state is untouched by the failure
        assert_eq!(lexer.current_token().text, "1");
        assert_eq!(lexer.remaining_input(), " # 2 }");
    }

    #[test]
    fn lexer_should_reject_non_ascii_letters() {
        assert!(matches!(
            Lexer::tokenize("fn é() { 1 }"),
            Err(LexError::UnrecognizedCharacter { character: 'é', .. })
        ));
    }

    #[test]
    fn position_should_count_chars_per_line() {
        let source = "ab\ncd€f";
        assert_eq!(Position::locate(source, 0), Position { line: 1, column: 1 });
        assert_eq!(Position::locate(source, 3), Position { line: 2, column: 1 });
        assert_eq!(Position::locate(source, 8), Position { line: 2, column: 4 });
    }

    proptest! {
        #[test]
        fn tokens_and_whitespace_reconstruct_source(s in r"[a-z_0-9+*/%(){} \t\n-]*") {
            let tokens = Lexer::tokenize(&s).unwrap();
            let mut rebuilt = String::new();
            let mut cursor = 0;
            for token in &tokens {
                let gap = &s[cursor..token.offset];
                prop_assert!(gap.chars().all(|c| c.is_ascii_whitespace()));
                rebuilt.push_str(gap);
                rebuilt.push_str(token.text);
                cursor = token.end();
            }
            prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfFile));
            prop_assert_eq!(rebuilt, s);
        }
    }
}
