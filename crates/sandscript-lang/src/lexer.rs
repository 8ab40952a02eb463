//! Lexer for the script language.
//!
//! Newlines are significant statement separators at nesting depth zero and
//! suppressed inside parentheses, brackets, braces, and map literals.

use crate::parser::ParseError;
use crate::token::{Tok, Token};

const DEF_KEYWORDS: &[&str] = &[
    "def",
    "defp",
    "defmodule",
    "defmacro",
    "defmacrop",
    "defstruct",
    "defprotocol",
    "defimpl",
];

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    out: Vec<Token>,
}

/// Tokenize `source`, returning the token stream terminated by `Eof`.
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lx = Lexer {
        src: source.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
        depth: 0,
        out: Vec::new(),
    };
    lx.run()?;
    Ok(lx.out)
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                b' ' | b'\t' | b'\r' => {
                    self.bump();
                }
                b'\n' => {
                    self.bump();
                    if self.depth == 0 && !matches!(self.out.last().map(|t| &t.tok), Some(Tok::Newline) | None)
                    {
                        self.out.push(Token::new(Tok::Newline, line, column));
                    }
                }
                b'#' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                b'0'..=b'9' => self.number(line, column)?,
                b'"' => self.string(line, column)?,
                b':' => self.symbol(line, column)?,
                b'a'..=b'z' | b'_' => self.ident(line, column),
                b'A'..=b'Z' => self.upper_ident(line, column),
                _ => self.operator(line, column)?,
            }
        }
        let (line, column) = (self.line, self.column);
        self.out.push(Token::new(Tok::Eof, line, column));
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> u8 {
        let c = self.src[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn push(&mut self, tok: Tok, line: u32, column: u32) {
        match tok {
            Tok::LParen | Tok::LBracket | Tok::LBrace | Tok::MapOpen => self.depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.out.push(Token::new(tok, line, column));
    }

    fn number(&mut self, line: u32, column: u32) -> Result<(), ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9') | Some(b'_')) {
            self.bump();
        }
        // `1..5` must not lex the first dot as a decimal point.
        let mut is_float = false;
        if self.peek() == Some(b'.')
            && matches!(self.peek_at(1), Some(b'0'..=b'9'))
            && self.peek_at(1) != Some(b'.')
        {
            is_float = true;
            self.bump();
            while matches!(self.peek(), Some(b'0'..=b'9') | Some(b'_')) {
                self.bump();
            }
        }
        let text: String = std::str::from_utf8(&self.src[start..self.pos])
            .unwrap_or_default()
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let tok = if is_float {
            Tok::Float(text.parse::<f64>().map_err(|_| ParseError::at(line, column, format!("invalid float literal `{text}`")))?)
        } else {
            Tok::Int(text.parse::<i64>().map_err(|_| ParseError::at(line, column, format!("invalid integer literal `{text}`")))?)
        };
        self.push(tok, line, column);
        Ok(())
    }

    fn string(&mut self, line: u32, column: u32) -> Result<(), ParseError> {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::at(line, column, "unterminated string literal".to_string())),
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    let esc = self
                        .peek()
                        .ok_or_else(|| ParseError::at(line, column, "unterminated string escape".to_string()))?;
                    self.bump();
                    match esc {
                        b'n' => text.push('\n'),
                        b't' => text.push('\t'),
                        b'r' => text.push('\r'),
                        b'\\' => text.push('\\'),
                        b'"' => text.push('"'),
                        b'\'' => text.push('\''),
                        b'0' => text.push('\0'),
                        other => {
                            return Err(ParseError::at(
                                self.line,
                                self.column,
                                format!("unknown string escape `\\{}`", other as char),
                            ))
                        }
                    }
                }
                Some(_) => {
                    let start = self.pos;
                    while !matches!(self.peek(), None | Some(b'"') | Some(b'\\')) {
                        self.bump();
                    }
                    text.push_str(std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default());
                }
            }
        }
        self.push(Tok::Str(text), line, column);
        Ok(())
    }

    fn symbol(&mut self, line: u32, column: u32) -> Result<(), ParseError> {
        self.bump(); // `:`
        if !matches!(self.peek(), Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'_')) {
            return Err(ParseError::at(line, column, "expected symbol name after `:`".to_string()));
        }
        let name = self.ident_text();
        self.push(Tok::Sym(name), line, column);
        Ok(())
    }

    fn ident_text(&mut self) -> String {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'0'..=b'9') | Some(b'_')
        ) {
            self.bump();
        }
        if matches!(self.peek(), Some(b'!') | Some(b'?')) {
            self.bump();
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .unwrap_or_default()
            .to_string()
    }

    fn ident(&mut self, line: u32, column: u32) {
        let name = self.ident_text();
        // `name:` glued to a colon (but not `::`) is a keyword key.
        if self.peek() == Some(b':') && self.peek_at(1) != Some(b':') {
            self.bump();
            self.push(Tok::KeyIdent(name), line, column);
            return;
        }
        let tok = match name.as_str() {
            "fn" => Tok::KwFn,
            "end" => Tok::KwEnd,
            "do" => Tok::KwDo,
            "if" => Tok::KwIf,
            "else" => Tok::KwElse,
            "nil" => Tok::KwNil,
            "true" => Tok::KwTrue,
            "false" => Tok::KwFalse,
            "and" => Tok::KwAnd,
            "or" => Tok::KwOr,
            "not" => Tok::KwNot,
            "import" => Tok::KwImport,
            "require" => Tok::KwRequire,
            "alias" => Tok::KwAlias,
            "receive" => Tok::KwReceive,
            _ if DEF_KEYWORDS.contains(&name.as_str()) => Tok::KwDef(name),
            _ => Tok::Ident(name),
        };
        self.push(tok, line, column);
    }

    fn upper_ident(&mut self, line: u32, column: u32) {
        let name = self.ident_text();
        self.push(Tok::UpIdent(name), line, column);
    }

    fn operator(&mut self, line: u32, column: u32) -> Result<(), ParseError> {
        let c = self.bump();
        let next = self.peek();
        let tok = match (c, next) {
            (b'=', Some(b'=')) => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    Tok::EqEqEq
                } else {
                    Tok::EqEq
                }
            }
            (b'=', Some(b'>')) => {
                self.bump();
                Tok::FatArrow
            }
            (b'=', _) => Tok::Assign,
            (b'!', Some(b'=')) => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    Tok::NotEqEq
                } else {
                    Tok::NotEq
                }
            }
            (b'!', _) => Tok::Bang,
            (b'<', Some(b'=')) => {
                self.bump();
                Tok::Le
            }
            (b'<', Some(b'>')) => {
                self.bump();
                Tok::Concat
            }
            (b'<', _) => Tok::Lt,
            (b'>', Some(b'=')) => {
                self.bump();
                Tok::Ge
            }
            (b'>', _) => Tok::Gt,
            (b'&', Some(b'&')) => {
                self.bump();
                Tok::AndAnd
            }
            (b'&', _) => Tok::Amp,
            (b'|', Some(b'|')) => {
                self.bump();
                Tok::OrOr
            }
            (b'|', Some(b'>')) => {
                self.bump();
                Tok::PipeOp
            }
            (b'+', Some(b'+')) => {
                self.bump();
                Tok::PlusPlus
            }
            (b'+', _) => Tok::Plus,
            (b'-', Some(b'-')) => {
                self.bump();
                Tok::MinusMinus
            }
            (b'-', Some(b'>')) => {
                self.bump();
                Tok::Arrow
            }
            (b'-', _) => Tok::Minus,
            (b'*', _) => Tok::Star,
            (b'/', _) => Tok::Slash,
            (b'.', Some(b'.')) => {
                self.bump();
                Tok::DotDot
            }
            (b'.', _) => Tok::Dot,
            (b',', _) => Tok::Comma,
            (b';', _) => Tok::Semi,
            (b'(', _) => Tok::LParen,
            (b')', _) => Tok::RParen,
            (b'[', _) => Tok::LBracket,
            (b']', _) => Tok::RBracket,
            (b'{', _) => Tok::LBrace,
            (b'}', _) => Tok::RBrace,
            (b'%', Some(b'{')) => {
                self.bump();
                Tok::MapOpen
            }
            (other, _) => {
                return Err(ParseError::at(
                    line,
                    column,
                    format!("unexpected character `{}`", other as char),
                ))
            }
        };
        self.push(tok, line, column);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Tok;

    fn toks(source: &str) -> Vec<Tok> {
        lex(source).expect("lex").into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn test_lex_arithmetic() {
        assert_eq!(
            toks("1 + 2"),
            vec![Tok::Int(1), Tok::Plus, Tok::Int(2), Tok::Eof]
        );
    }

    #[test]
    fn test_lex_remote_call_with_symbol() {
        assert_eq!(
            toks("File.read!(:ok)"),
            vec![
                Tok::UpIdent("File".into()),
                Tok::Dot,
                Tok::Ident("read!".into()),
                Tok::LParen,
                Tok::Sym("ok".into()),
                Tok::RParen,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_capture_and_invoke() {
        assert_eq!(
            toks("f = &apply/3; f.(1)"),
            vec![
                Tok::Ident("f".into()),
                Tok::Assign,
                Tok::Amp,
                Tok::Ident("apply".into()),
                Tok::Slash,
                Tok::Int(3),
                Tok::Semi,
                Tok::Ident("f".into()),
                Tok::Dot,
                Tok::LParen,
                Tok::Int(1),
                Tok::RParen,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_range_is_not_float() {
        assert_eq!(
            toks("1..5"),
            vec![Tok::Int(1), Tok::DotDot, Tok::Int(5), Tok::Eof]
        );
    }

    #[test]
    fn test_newlines_suppressed_inside_brackets() {
        let tokens = toks("[1,\n2]\n3");
        assert_eq!(
            tokens,
            vec![
                Tok::LBracket,
                Tok::Int(1),
                Tok::Comma,
                Tok::Int(2),
                Tok::RBracket,
                Tok::Newline,
                Tok::Int(3),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_key() {
        assert_eq!(
            toks("alias Foo, as: Bar"),
            vec![
                Tok::KwAlias,
                Tok::UpIdent("Foo".into()),
                Tok::Comma,
                Tok::KeyIdent("as".into()),
                Tok::UpIdent("Bar".into()),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_errors() {
        assert!(lex("\"oops").is_err());
    }
}
