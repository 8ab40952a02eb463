//! Recursive-descent parser for the script language.
//!
//! The sandbox consumes parsing through the [`ScriptParser`] trait so the
//! front end stays swappable; [`DefaultParser`] is the bundled
//! implementation. Binary and unary operators are desugared into
//! core-library calls at parse time, which keeps the analyzer's authorization
//! surface uniform: everything that executes is a call node.

use crate::ast::{DefKind, Expr, Form, ModulePath, Program};
use crate::lexer::lex;
use crate::token::{Tok, Token};

/// Parse failure with source location and the offending token.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    pub fn at(line: u32, column: u32, message: String) -> Self {
        Self { line, column, message }
    }
}

/// External-parser seam: the sandbox only ever sees this trait.
pub trait ScriptParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Program, ParseError>;
}

/// The bundled recursive-descent parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParser;

impl ScriptParser for DefaultParser {
    fn parse(&self, source: &str) -> Result<Program, ParseError> {
        let tokens = lex(source)?;
        Parser { toks: tokens, pos: 0 }.parse_program()
    }
}

struct Parser {
    toks: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.toks[self.pos.min(self.toks.len() - 1)].tok
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        let idx = (self.pos + offset).min(self.toks.len() - 1);
        &self.toks[idx].tok
    }

    fn here(&self) -> (u32, u32) {
        let t = &self.toks[self.pos.min(self.toks.len() - 1)];
        (t.line, t.column)
    }

    fn advance(&mut self) -> Token {
        let t = self.toks[self.pos.min(self.toks.len() - 1)].clone();
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let (line, column) = self.here();
        ParseError::at(
            line,
            column,
            format!("expected {expected}, found {}", self.peek().describe()),
        )
    }

    fn expect(&mut self, tok: Tok, expected: &str) -> Result<Token, ParseError> {
        if *self.peek() == tok {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Tok::Newline | Tok::Semi) {
            self.advance();
        }
    }

    fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        self.skip_separators();
        while !matches!(self.peek(), Tok::Eof) {
            body.push(self.parse_stmt()?);
            match self.peek() {
                Tok::Newline | Tok::Semi => self.skip_separators(),
                Tok::Eof => break,
                _ => return Err(self.unexpected("end of expression")),
            }
        }
        Ok(Program::new(body))
    }

    fn parse_stmt(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Tok::KwAlias => self.parse_alias(),
            Tok::KwImport => {
                self.advance();
                let path = self.parse_module_path()?;
                Ok(Expr::Form(Form::Import { path }))
            }
            Tok::KwRequire => {
                self.advance();
                let path = self.parse_module_path()?;
                Ok(Expr::Form(Form::Require { path }))
            }
            Tok::KwReceive => self.parse_receive(),
            Tok::KwDef(_) => self.parse_definition(),
            Tok::Ident(_) if *self.peek_at(1) == Tok::Assign => {
                let name = match self.advance().tok {
                    Tok::Ident(name) => name,
                    _ => unreachable!("guarded by match arm"),
                };
                self.advance(); // `=`
                let value = self.parse_expr(0)?;
                Ok(Expr::Assign { name, value: Box::new(value) })
            }
            _ => self.parse_expr(0),
        }
    }

    fn parse_alias(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // `alias`
        let path = self.parse_module_path()?;
        let mut as_name = None;
        if *self.peek() == Tok::Comma {
            self.advance();
            match self.advance().tok {
                Tok::KeyIdent(key) if key == "as" => {}
                _ => return Err(self.unexpected("`as:` after alias path")),
            }
            match self.advance().tok {
                Tok::UpIdent(name) => as_name = Some(name),
                _ => return Err(self.unexpected("module name after `as:`")),
            }
        }
        Ok(Expr::Form(Form::Alias { path, as_name, injected: false }))
    }

    fn parse_module_path(&mut self) -> Result<ModulePath, ParseError> {
        let mut segments = Vec::new();
        match self.advance().tok {
            Tok::UpIdent(seg) => segments.push(seg),
            _ => return Err(self.unexpected("module name")),
        }
        while *self.peek() == Tok::Dot && matches!(self.peek_at(1), Tok::UpIdent(_)) {
            self.advance();
            match self.advance().tok {
                Tok::UpIdent(seg) => segments.push(seg),
                _ => unreachable!("guarded by matches! above"),
            }
        }
        Ok(ModulePath(segments))
    }

    /// Consume a `receive do … end` block, producing only the form marker —
    /// the analyzer rejects it before anything would evaluate the body.
    fn parse_receive(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // `receive`
        self.skip_separators();
        self.expect(Tok::KwDo, "`do` after receive")?;
        self.skim_block_body()?;
        Ok(Expr::Form(Form::Receive))
    }

    fn parse_definition(&mut self) -> Result<Expr, ParseError> {
        let keyword = match self.advance().tok {
            Tok::KwDef(kw) => kw,
            _ => unreachable!("guarded by caller"),
        };
        let kind = match keyword.as_str() {
            "def" | "defp" => DefKind::Function,
            "defmacro" | "defmacrop" => DefKind::Macro,
            "defmodule" => DefKind::Module,
            "defstruct" => DefKind::Struct,
            "defprotocol" => DefKind::Protocol,
            _ => DefKind::Impl,
        };
        if kind == DefKind::Struct {
            // `defstruct [:a, :b]` has no do-block; consume to end of statement.
            while !matches!(self.peek(), Tok::Newline | Tok::Semi | Tok::Eof) {
                self.advance();
            }
            return Ok(Expr::Form(Form::Definition { kind }));
        }
        // Consume the head (name, args) up to the do-block, then the block.
        loop {
            match self.peek() {
                Tok::KwDo => {
                    self.advance();
                    break;
                }
                Tok::Eof => return Err(self.unexpected(&format!("`do` block after {keyword}"))),
                _ => {
                    self.advance();
                }
            }
        }
        self.skim_block_body()?;
        Ok(Expr::Form(Form::Definition { kind }))
    }

    /// Consume tokens until the `end` matching an already-consumed opener,
    /// balancing nested `do`/`fn` blocks.
    fn skim_block_body(&mut self) -> Result<(), ParseError> {
        let mut depth = 1u32;
        loop {
            match self.peek() {
                Tok::Eof => return Err(self.unexpected("`end`")),
                Tok::KwDo | Tok::KwFn => {
                    depth += 1;
                    self.advance();
                }
                Tok::KwEnd => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((l_bp, r_bp)) = binary_binding_power(self.peek()) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            let op = self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = combine_binary(&op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Tok::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                // Constant-fold negative literals so `-2` is a literal, not a call.
                Ok(match operand {
                    Expr::Int { value } => Expr::Int { value: -value },
                    Expr::Float { value } => Expr::Float { value: -value },
                    other => Expr::LocalCall { name: "-".into(), args: vec![other] },
                })
            }
            Tok::Bang | Tok::KwNot => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::LocalCall { name: "not".into(), args: vec![operand] })
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        while *self.peek() == Tok::Dot && *self.peek_at(1) == Tok::LParen {
            self.advance(); // `.`
            self.advance(); // `(`
            let args = self.parse_args_until(Tok::RParen)?;
            expr = Expr::Invoke { target: Box::new(expr), args };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Tok::Int(value) => {
                self.advance();
                Ok(Expr::Int { value })
            }
            Tok::Float(value) => {
                self.advance();
                Ok(Expr::Float { value })
            }
            Tok::Str(value) => {
                self.advance();
                Ok(Expr::Str { value })
            }
            Tok::Sym(name) => {
                self.advance();
                Ok(Expr::Symbol { name })
            }
            Tok::KwNil => {
                self.advance();
                Ok(Expr::Nil)
            }
            Tok::KwTrue => {
                self.advance();
                Ok(Expr::Bool { value: true })
            }
            Tok::KwFalse => {
                self.advance();
                Ok(Expr::Bool { value: false })
            }
            Tok::LParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(Tok::RParen, "`)`")?;
                Ok(inner)
            }
            Tok::LBracket => {
                self.advance();
                let items = self.parse_args_until(Tok::RBracket)?;
                Ok(Expr::List { items })
            }
            Tok::LBrace => {
                self.advance();
                let items = self.parse_args_until(Tok::RBrace)?;
                Ok(Expr::Tuple { items })
            }
            Tok::MapOpen => {
                self.advance();
                self.parse_map_literal()
            }
            Tok::KwFn => self.parse_lambda(),
            Tok::KwIf => self.parse_if(),
            Tok::Amp => self.parse_capture(),
            Tok::Ident(name) => {
                self.advance();
                if *self.peek() == Tok::LParen {
                    self.advance();
                    let args = self.parse_args_until(Tok::RParen)?;
                    Ok(Expr::LocalCall { name, args })
                } else {
                    Ok(Expr::Var { name })
                }
            }
            Tok::UpIdent(_) => self.parse_remote_call(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_args_until(&mut self, close: Tok) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if *self.peek() == close {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(0)?);
            match self.peek() {
                Tok::Comma => {
                    self.advance();
                }
                t if *t == close => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.unexpected("`,` or closing delimiter")),
            }
        }
    }

    fn parse_map_literal(&mut self) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        if *self.peek() == Tok::RBrace {
            self.advance();
            return Ok(Expr::MapLit { entries });
        }
        loop {
            if let Tok::KeyIdent(key) = self.peek().clone() {
                // `%{name: value}` shorthand for a symbol key.
                self.advance();
                let value = self.parse_expr(0)?;
                entries.push((Expr::Symbol { name: key }, value));
            } else {
                let key = self.parse_expr(0)?;
                self.expect(Tok::FatArrow, "`=>` in map literal")?;
                let value = self.parse_expr(0)?;
                entries.push((key, value));
            }
            match self.peek() {
                Tok::Comma => {
                    self.advance();
                }
                Tok::RBrace => {
                    self.advance();
                    return Ok(Expr::MapLit { entries });
                }
                _ => return Err(self.unexpected("`,` or `}` in map literal")),
            }
        }
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // `fn`
        let mut params = Vec::new();
        while let Tok::Ident(name) = self.peek().clone() {
            self.advance();
            params.push(name);
            if *self.peek() == Tok::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Tok::Arrow, "`->` in fn")?;
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            if *self.peek() == Tok::KwEnd {
                self.advance();
                break;
            }
            if *self.peek() == Tok::Eof {
                return Err(self.unexpected("`end`"));
            }
            body.push(self.parse_stmt()?);
            match self.peek() {
                Tok::Newline | Tok::Semi => {}
                Tok::KwEnd => {}
                _ => return Err(self.unexpected("`end` or end of expression")),
            }
        }
        if body.is_empty() {
            return Err(self.unexpected("fn body"));
        }
        Ok(Expr::Lambda { params, body })
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // `if`
        let cond = self.parse_expr(0)?;
        self.expect(Tok::KwDo, "`do` after if condition")?;
        let mut then_body = Vec::new();
        let mut else_body = Vec::new();
        let mut in_else = false;
        loop {
            self.skip_separators();
            match self.peek() {
                Tok::KwEnd => {
                    self.advance();
                    break;
                }
                Tok::KwElse if !in_else => {
                    self.advance();
                    in_else = true;
                    continue;
                }
                Tok::Eof => return Err(self.unexpected("`end`")),
                _ => {}
            }
            let stmt = self.parse_stmt()?;
            if in_else {
                else_body.push(stmt);
            } else {
                then_body.push(stmt);
            }
            match self.peek() {
                Tok::Newline | Tok::Semi | Tok::KwEnd | Tok::KwElse => {}
                _ => return Err(self.unexpected("`end` or end of expression")),
            }
        }
        if then_body.is_empty() {
            return Err(self.unexpected("if body"));
        }
        Ok(Expr::If {
            cond: Box::new(cond),
            then_body,
            else_body,
        })
    }

    fn parse_capture(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // `&`
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.advance();
                let arity = self.parse_capture_arity()?;
                Ok(Expr::CaptureLocal { name, arity })
            }
            Tok::UpIdent(_) => {
                let module = self.parse_module_path()?;
                self.expect(Tok::Dot, "`.` in capture")?;
                let function = match self.advance().tok {
                    Tok::Ident(name) => name,
                    _ => return Err(self.unexpected("function name in capture")),
                };
                let arity = self.parse_capture_arity()?;
                Ok(Expr::CaptureRemote { module, function, arity })
            }
            _ => Err(self.unexpected("function reference after `&`")),
        }
    }

    fn parse_capture_arity(&mut self) -> Result<u8, ParseError> {
        self.expect(Tok::Slash, "`/arity` in capture")?;
        match self.advance().tok {
            Tok::Int(n) if (0..=255).contains(&n) => Ok(n as u8),
            _ => Err(self.unexpected("capture arity")),
        }
    }

    fn parse_remote_call(&mut self) -> Result<Expr, ParseError> {
        let module = self.parse_module_path()?;
        if *self.peek() != Tok::Dot || !matches!(self.peek_at(1), Tok::Ident(_)) {
            return Ok(Expr::ModuleRef { module });
        }
        self.advance(); // `.`
        let function = match self.advance().tok {
            Tok::Ident(name) => name,
            _ => unreachable!("guarded by matches! above"),
        };
        let args = if *self.peek() == Tok::LParen {
            self.advance();
            self.parse_args_until(Tok::RParen)?
        } else {
            Vec::new()
        };
        Ok(Expr::RemoteCall { module, function, args })
    }
}

/// Left/right binding powers; higher binds tighter.
fn binary_binding_power(tok: &Tok) -> Option<(u8, u8)> {
    let bp = match tok {
        Tok::OrOr | Tok::KwOr => (10, 11),
        Tok::AndAnd | Tok::KwAnd => (20, 21),
        Tok::EqEq | Tok::NotEq | Tok::EqEqEq | Tok::NotEqEq | Tok::Lt | Tok::Gt | Tok::Le | Tok::Ge => {
            (30, 31)
        }
        Tok::PipeOp => (40, 41),
        Tok::DotDot => (50, 51),
        Tok::PlusPlus | Tok::MinusMinus | Tok::Concat => (60, 61),
        Tok::Plus | Tok::Minus => (70, 71),
        Tok::Star | Tok::Slash => (80, 81),
        _ => return None,
    };
    Some(bp)
}

fn combine_binary(op: &Token, lhs: Expr, rhs: Expr) -> Result<Expr, ParseError> {
    let name = match &op.tok {
        Tok::OrOr | Tok::KwOr => "or",
        Tok::AndAnd | Tok::KwAnd => "and",
        Tok::EqEq => "==",
        Tok::NotEq => "!=",
        Tok::EqEqEq => "===",
        Tok::NotEqEq => "!==",
        Tok::Lt => "<",
        Tok::Gt => ">",
        Tok::Le => "<=",
        Tok::Ge => ">=",
        Tok::PlusPlus => "++",
        Tok::MinusMinus => "--",
        Tok::Concat => "<>",
        Tok::Plus => "+",
        Tok::Minus => "-",
        Tok::Star => "*",
        Tok::Slash => "/",
        Tok::DotDot => {
            return Ok(Expr::RemoteCall {
                module: ModulePath::single("Range"),
                function: "new".into(),
                args: vec![lhs, rhs],
            })
        }
        Tok::PipeOp => return pipe_into(op, lhs, rhs),
        _ => {
            return Err(ParseError::at(
                op.line,
                op.column,
                format!("{} is not a binary operator", op.tok.describe()),
            ))
        }
    };
    Ok(Expr::LocalCall { name: name.into(), args: vec![lhs, rhs] })
}

/// `a |> f(b)` rewrites to `f(a, b)` — the piped value becomes the first
/// argument of the right-hand call.
fn pipe_into(op: &Token, lhs: Expr, rhs: Expr) -> Result<Expr, ParseError> {
    match rhs {
        Expr::LocalCall { name, mut args } => {
            args.insert(0, lhs);
            Ok(Expr::LocalCall { name, args })
        }
        Expr::RemoteCall { module, function, mut args } => {
            args.insert(0, lhs);
            Ok(Expr::RemoteCall { module, function, args })
        }
        Expr::Invoke { target, mut args } => {
            args.insert(0, lhs);
            Ok(Expr::Invoke { target, args })
        }
        Expr::Var { name } => Ok(Expr::LocalCall { name, args: vec![lhs] }),
        _ => Err(ParseError::at(
            op.line,
            op.column,
            "right side of |> must be a call".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        DefaultParser.parse(source).expect("parse")
    }

    #[test]
    fn test_parse_arithmetic_desugars_to_local_call() {
        let program = parse("1 + 2");
        assert_eq!(
            program.body,
            vec![Expr::LocalCall {
                name: "+".into(),
                args: vec![Expr::Int { value: 1 }, Expr::Int { value: 2 }],
            }]
        );
    }

    #[test]
    fn test_parse_precedence() {
        let program = parse("1 + 2 * 3");
        let Expr::LocalCall { name, args } = &program.body[0] else {
            panic!("expected call");
        };
        assert_eq!(name, "+");
        assert_eq!(args[0], Expr::Int { value: 1 });
        assert!(matches!(&args[1], Expr::LocalCall { name, .. } if name == "*"));
    }

    #[test]
    fn test_parse_remote_call() {
        let program = parse("String.upcase(\"abc\")");
        assert_eq!(
            program.body,
            vec![Expr::RemoteCall {
                module: ModulePath::single("String"),
                function: "upcase".into(),
                args: vec![Expr::Str { value: "abc".into() }],
            }]
        );
    }

    #[test]
    fn test_parse_remote_call_without_parens() {
        let program = parse("Date.utc_today");
        assert_eq!(
            program.body,
            vec![Expr::RemoteCall {
                module: ModulePath::single("Date"),
                function: "utc_today".into(),
                args: vec![],
            }]
        );
    }

    #[test]
    fn test_parse_capture_then_invoke() {
        let program = parse("f = &apply/3; f.(File, :read!, [\"/etc/passwd\"])");
        assert_eq!(program.body.len(), 2);
        assert_eq!(
            program.body[0],
            Expr::Assign {
                name: "f".into(),
                value: Box::new(Expr::CaptureLocal { name: "apply".into(), arity: 3 }),
            }
        );
        let Expr::Invoke { args, .. } = &program.body[1] else {
            panic!("expected invoke");
        };
        assert_eq!(args[0], Expr::ModuleRef { module: ModulePath::single("File") });
        assert_eq!(args[1], Expr::Symbol { name: "read!".into() });
    }

    #[test]
    fn test_parse_lambda_self_application() {
        let program = parse("loop = fn f -> f.(f) end; loop.(loop)");
        assert_eq!(program.body.len(), 2);
        let Expr::Assign { value, .. } = &program.body[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(**value, Expr::Lambda { .. }));
    }

    #[test]
    fn test_parse_pipe() {
        let program = parse("[1, 2] |> Enum.sum()");
        assert_eq!(
            program.body,
            vec![Expr::RemoteCall {
                module: ModulePath::single("Enum"),
                function: "sum".into(),
                args: vec![Expr::List {
                    items: vec![Expr::Int { value: 1 }, Expr::Int { value: 2 }],
                }],
            }]
        );
    }

    #[test]
    fn test_parse_map_literal_both_key_styles() {
        let program = parse("%{count: 1, \"k\" => 2}");
        let Expr::MapLit { entries } = &program.body[0] else {
            panic!("expected map literal");
        };
        assert_eq!(entries[0].0, Expr::Symbol { name: "count".into() });
        assert_eq!(entries[1].0, Expr::Str { value: "k".into() });
    }

    #[test]
    fn test_parse_range_desugars() {
        let program = parse("1..5");
        assert_eq!(
            program.body,
            vec![Expr::RemoteCall {
                module: ModulePath::single("Range"),
                function: "new".into(),
                args: vec![Expr::Int { value: 1 }, Expr::Int { value: 5 }],
            }]
        );
    }

    #[test]
    fn test_parse_alias_forms() {
        let program = parse("alias Agent.Tools.Search, as: S");
        assert_eq!(
            program.body,
            vec![Expr::Form(Form::Alias {
                path: ModulePath(vec!["Agent".into(), "Tools".into(), "Search".into()]),
                as_name: Some("S".into()),
                injected: false,
            })]
        );
    }

    #[test]
    fn test_parse_receive_block_marker() {
        let program = parse("receive do\nx -> x\nend");
        assert_eq!(program.body, vec![Expr::Form(Form::Receive)]);
    }

    #[test]
    fn test_parse_defmodule_marker() {
        let program = parse("defmodule Evil do\ndef f do\n1\nend\nend");
        assert_eq!(
            program.body,
            vec![Expr::Form(Form::Definition { kind: DefKind::Module })]
        );
    }

    #[test]
    fn test_parse_error_carries_location() {
        let err = DefaultParser.parse("1 +").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("expected"));
    }

    #[test]
    fn test_parse_if_else() {
        let program = parse("if x > 1 do\n:big\nelse\n:small\nend");
        let Expr::If { cond, then_body, else_body } = &program.body[0] else {
            panic!("expected if");
        };
        assert!(matches!(**cond, Expr::LocalCall { .. }));
        assert_eq!(then_body[0], Expr::Symbol { name: "big".into() });
        assert_eq!(else_body[0], Expr::Symbol { name: "small".into() });
    }

    #[test]
    fn test_parse_if_without_else() {
        let program = parse("if true do 1 end");
        let Expr::If { else_body, .. } = &program.body[0] else {
            panic!("expected if");
        };
        assert!(else_body.is_empty());
    }

    #[test]
    fn test_unary_minus_folds_literals() {
        let program = parse("-3");
        assert_eq!(program.body, vec![Expr::Int { value: -3 }]);
    }

    #[test]
    fn test_short_circuit_ops_parse_as_calls() {
        let program = parse("true and false");
        assert!(matches!(
            &program.body[0],
            Expr::LocalCall { name, .. } if name == "and"
        ));
    }
}
