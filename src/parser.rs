use crate::ast::{BinaryOp, Expr, Program, Stmt, TableEntries, UnaryOp};
use crate::error::{ErrorKind, ScriptError, Span};
use crate::lexer::{Lexer, Literal, Token, TokenKind};
use crate::value::Value;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

const COMPARISON_OPS: [BinaryOp; 5] = [
    BinaryOp::Equal,
    BinaryOp::LessEqual,
    BinaryOp::GreaterEqual,
    BinaryOp::Less,
    BinaryOp::Greater,
];
const SUM_OPS: [BinaryOp; 2] = [BinaryOp::Add, BinaryOp::Subtract];
const PRODUCT_OPS: [BinaryOp; 2] = [BinaryOp::Multiply, BinaryOp::Divide];

/// Recursive-descent parser pulling tokens from a [`Lexer`] on demand.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self { lexer }
    }

    pub fn from_source(source: &str) -> Self {
        Self::new(Lexer::new(source))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        Ok(Self::new(Lexer::from_path(path)?))
    }

    /// Parses the whole input. The first error aborts parsing.
    pub fn parse(&mut self) -> Result<Program, ScriptError> {
        let mut statements = Vec::new();

        while self.lexer.peek()?.kind != TokenKind::EndOfInput {
            statements.push(self.statement()?);
        }
        self.lexer.expect_kind(TokenKind::EndOfInput)?;

        debug!(statements = statements.len(), "parsed program");
        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        let token = self.lexer.peek()?.clone();

        match (token.kind, token.text.as_str()) {
            (TokenKind::Identifier, _) => {
                let stmt = self.assignment()?;
                self.end_of_statement()?;
                Ok(stmt)
            }
            (TokenKind::Keyword, "output") => {
                self.lexer.next_token()?;
                let expr = self.expression()?;
                let semicolon = self.end_of_statement()?;
                Ok(Stmt::Output {
                    expr,
                    span: token.span.to(&semicolon.span),
                })
            }
            (TokenKind::Keyword, "if") => {
                let (condition, body, span) = self.guarded_block("if")?;
                Ok(Stmt::If {
                    condition,
                    body,
                    span,
                })
            }
            (TokenKind::Keyword, "while") => {
                let (condition, body, span) = self.guarded_block("while")?;
                Ok(Stmt::While {
                    condition,
                    body,
                    span,
                })
            }
            _ => Err(ScriptError::syntax(
                token.span,
                format!(
                    "Expected statement, found {} at {}",
                    token.describe(),
                    token.position
                ),
            )
            .with_help(
                "Statements are assignments ('x = 1;'), 'output expr;', 'if (...) { ... }' or 'while (...) { ... }'.",
            )),
        }
    }

    fn end_of_statement(&mut self) -> Result<Token, ScriptError> {
        self.expect_with_help(";", "Assignments and 'output' statements end with ';'.")
    }

    /// `keyword '(' expression ')' '{' statement* '}'`, shared by `if` and `while`.
    fn guarded_block(
        &mut self,
        keyword: &str,
    ) -> Result<(Expr, Vec<Stmt>, Span), ScriptError> {
        let start = self.lexer.expect(Some(keyword), Some(TokenKind::Keyword))?;
        let help = format!(
            "'{}' needs a parenthesized condition and a braced body: {} (x < 3) {{ ... }}",
            keyword, keyword
        );

        self.expect_with_help("(", &help)?;
        let condition = self.expression()?;
        self.expect_with_help(")", &help)?;
        self.expect_with_help("{", &help)?;
        let body = self.block()?;
        let close = self.expect_with_help("}", "Blocks must be closed with '}'.")?;

        Ok((condition, body, start.span.to(&close.span)))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut statements = Vec::new();

        loop {
            let next = self.lexer.peek()?;
            if next.is(TokenKind::Control, "}") || next.kind == TokenKind::EndOfInput {
                break;
            }
            statements.push(self.statement()?);
        }

        Ok(statements)
    }

    fn assignment(&mut self) -> Result<Stmt, ScriptError> {
        let name = self.lexer.expect_kind(TokenKind::Identifier)?;
        self.lexer.expect_text("=")?;
        let value = self.expression()?;

        Ok(Stmt::Assignment {
            span: name.span.to(value.span()),
            name: name.text,
            value,
        })
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        let key = self.conditional()?;

        if !self.lexer.peek()?.is(TokenKind::Keyword, "on") {
            return Ok(key);
        }
        self.lexer.next_token()?;

        let table = if self.lexer.peek()?.kind == TokenKind::Identifier {
            let name = self.lexer.next_token()?;
            Expr::Identifier {
                name: name.text,
                span: name.span,
            }
        } else {
            self.table()?
        };

        Ok(Expr::Lookup {
            span: key.span().to(table.span()),
            key: Box::new(key),
            table: Box::new(table),
        })
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.sum()?;

        while let Some(operator) = self.match_operator(&COMPARISON_OPS)? {
            let right = self.sum()?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn sum(&mut self) -> Result<Expr, ScriptError> {
        if self.lexer.peek()?.is(TokenKind::Control, "[") {
            return self.table();
        }

        let mut expr = self.product()?;

        while let Some(operator) = self.match_operator(&SUM_OPS)? {
            let right = self.product()?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn product(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.unary()?;

        while let Some(operator) = self.match_operator(&PRODUCT_OPS)? {
            let right = self.unary()?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.lexer.peek()?.is(TokenKind::Control, "-") {
            let minus = self.lexer.next_token()?;
            let operand = self.unary()?;

            return Ok(Expr::Unary {
                span: minus.span.to(operand.span()),
                operator: UnaryOp::Negate,
                operand: Box::new(operand),
            });
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.lexer.next_token()?;

        match token.kind {
            TokenKind::Constant => {
                let span = token.span;
                Ok(Expr::Constant {
                    value: Self::constant_value(token)?,
                    span,
                })
            }
            TokenKind::Identifier => Ok(Expr::Identifier {
                name: token.text,
                span: token.span,
            }),
            TokenKind::DieLiteral => self.die(token),
            TokenKind::Control if token.text == "(" => {
                let expr = self.expression()?;
                self.expect_with_help(
                    ")",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'.",
                )?;
                Ok(expr)
            }
            _ => {
                let help = match (token.kind, token.text.as_str()) {
                    (TokenKind::EndOfInput, _) => {
                        "Reached end of input while expecting an expression."
                    }
                    (TokenKind::Control, ")") => {
                        "Found ')' without matching '('. Check for unbalanced parentheses."
                    }
                    (TokenKind::Keyword, _) => "Keywords cannot be used as values.",
                    _ => "Expected a constant, variable, die roll or parenthesized expression here.",
                };

                Err(ScriptError::syntax(
                    token.span,
                    format!(
                        "Expected expression, found {} at {}",
                        token.describe(),
                        token.position
                    ),
                )
                .with_help(help))
            }
        }
    }

    fn die(&mut self, token: Token) -> Result<Expr, ScriptError> {
        let help = "Dice are written NdM: roll N dice with M faces each, e.g. 2d6.";
        let (count, faces) = token.text.split_once('d').unwrap_or((token.text.as_str(), ""));

        if faces.is_empty() {
            return Err(ScriptError::syntax(
                token.span,
                format!("Die literal '{}' is missing its number of faces", token.text),
            )
            .with_help(help));
        }

        let too_large = || {
            ScriptError::syntax(
                token.span,
                format!("Die literal '{}' is too large", token.text),
            )
        };
        let count = count.parse::<u32>().map_err(|_| too_large())?;
        let faces = faces.parse::<u32>().map_err(|_| too_large())?;

        if faces == 0 {
            return Err(ScriptError::syntax(
                token.span,
                format!("Die literal '{}' must have at least one face", token.text),
            )
            .with_help(help));
        }

        Ok(Expr::Die {
            count,
            faces,
            span: token.span,
        })
    }

    fn table(&mut self) -> Result<Expr, ScriptError> {
        let open = self.lexer.expect_text("[")?;
        let mut entries = TableEntries::new();

        while self.lexer.peek()?.kind == TokenKind::Constant {
            let key_token = self.lexer.next_token()?;
            let (span, found) = (
                key_token.span,
                format!("{} at {}", key_token.describe(), key_token.position),
            );
            let key = match Self::constant_value(key_token)? {
                Value::Integer(key) => key,
                _ => {
                    return Err(ScriptError::syntax(
                        span,
                        format!("Table keys must be integer constants, found {}", found),
                    ));
                }
            };

            self.expect_with_help(":", "Table entries are written 'key: expression,'.")?;
            let value = self.expression()?;
            self.expect_with_help(
                ",",
                "Every table entry, including the last one, must end with ','.",
            )?;

            // Duplicate keys: the later entry replaces the earlier one.
            entries.insert(key, value);
        }

        let close = self.expect_with_help(
            "]",
            "Table literals look like [1: \"a\", 2: 1d6, ] and are closed with ']'.",
        )?;

        Ok(Expr::Table {
            entries: Rc::new(entries),
            span: open.span.to(&close.span),
        })
    }

    /// Value of a `Constant` token. Quoted text made only of ASCII digits
    /// is read as an integer, so `"5"` and `5` are the same constant.
    fn constant_value(token: Token) -> Result<Value, ScriptError> {
        match token.literal {
            Some(Literal::Integer(n)) => Ok(Value::Integer(n)),
            Some(Literal::Text(text))
                if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) =>
            {
                text.parse::<i64>().map(Value::Integer).map_err(|_| {
                    ScriptError::syntax(
                        token.span,
                        format!("Numeric constant \"{}\" does not fit in an integer", text),
                    )
                })
            }
            Some(Literal::Text(text)) => Ok(Value::Text(text)),
            None => Ok(Value::Text(token.text)),
        }
    }

    fn match_operator(&mut self, accepted: &[BinaryOp]) -> Result<Option<BinaryOp>, ScriptError> {
        let next = self.lexer.peek()?;
        if next.kind != TokenKind::Control {
            return Ok(None);
        }

        match BinaryOp::from_symbol(&next.text) {
            Some(operator) if accepted.contains(&operator) => {
                self.lexer.next_token()?;
                Ok(Some(operator))
            }
            _ => Ok(None),
        }
    }

    fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
        Expr::Binary {
            span: left.span().to(right.span()),
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    fn expect_with_help(&mut self, text: &str, help: &str) -> Result<Token, ScriptError> {
        self.lexer
            .expect_text(text)
            .map_err(|error| match error.kind {
                ErrorKind::Syntax => error.with_help(help),
                _ => error,
            })
    }
}
