use crate::error::{ScriptError, Span};
use std::fmt;
use std::path::Path;
use tracing::trace;

const KEYWORDS: [&str; 4] = ["output", "on", "if", "while"];

const CONTROL: [char; 17] = [
    '(', ')', '+', '-', '*', '/', '<', '>', '=', ',', '.', ';', ':', '[', ']', '{', '}',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EndOfInput,
    Identifier,
    Control,
    Constant,
    DieLiteral,
    Keyword,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenKind::EndOfInput => "end of input",
            TokenKind::Identifier => "identifier",
            TokenKind::Control => "control",
            TokenKind::Constant => "constant",
            TokenKind::DieLiteral => "die literal",
            TokenKind::Keyword => "keyword",
        };
        write!(f, "{}", name)
    }
}

/// Decoded value of a `Constant` token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Text(String),
}

/// Line (1-based) and column of the cursor. The column counts characters
/// consumed on the current line, so it resets to 0 after a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A token as produced by the lexer. For string constants `text` holds the
/// unescaped contents without quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub literal: Option<Literal>,
    pub span: Span,
    /// Cursor position once the token has been fully consumed.
    pub position: Position,
}

impl Token {
    /// How the token is quoted in error messages.
    pub fn describe(&self) -> String {
        match (self.kind, &self.literal) {
            (TokenKind::EndOfInput, _) => "end of input".to_string(),
            (_, Some(Literal::Text(text))) => format!("\"{}\"", text.escape_default()),
            _ => format!("'{}'", self.text),
        }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

/// Pull-based lexer with a single token of lookahead.
pub struct Lexer {
    chars: Vec<char>,
    current: usize,
    line: usize,
    column: usize,
    lookahead: Option<Token>,
}

/// Reads a whole script. The file handle is released before lexing starts.
pub fn read_source(path: &Path) -> Result<String, ScriptError> {
    std::fs::read_to_string(path)
        .map_err(|e| ScriptError::io(format!("Error reading file '{}': {}", path.display(), e)))
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            current: 0,
            line: 1,
            column: 0,
            lookahead: None,
        }
    }

    /// Reads the whole file up front; the handle is closed before this returns.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        Ok(Self::new(&read_source(path.as_ref())?))
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Result<Token, ScriptError> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.scan_token(),
        }
    }

    /// Returns the next token without consuming it. Repeated calls return the
    /// same token until `next_token` is called.
    pub fn peek(&mut self) -> Result<&Token, ScriptError> {
        let token = match self.lookahead.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        let token: &Token = self.lookahead.insert(token);
        Ok(token)
    }

    /// Consumes the next token, failing unless it has the given text and/or kind.
    pub fn expect(
        &mut self,
        text: Option<&str>,
        kind: Option<TokenKind>,
    ) -> Result<Token, ScriptError> {
        let token = self.next_token()?;

        if let Some(kind) = kind {
            if token.kind != kind {
                return Err(ScriptError::syntax(
                    token.span,
                    format!(
                        "Expected {} but found {} ({}) at {}",
                        kind,
                        token.describe(),
                        token.kind,
                        token.position
                    ),
                ));
            }
        }

        if let Some(text) = text {
            // String constants never satisfy a punctuation or keyword constraint.
            let is_text = matches!(token.literal, Some(Literal::Text(_)));
            if token.text != text || is_text || token.kind == TokenKind::EndOfInput {
                return Err(ScriptError::syntax(
                    token.span,
                    format!(
                        "Expected '{}' but found {} at {}",
                        text,
                        token.describe(),
                        token.position
                    ),
                ));
            }
        }

        Ok(token)
    }

    pub fn expect_text(&mut self, text: &str) -> Result<Token, ScriptError> {
        self.expect(Some(text), None)
    }

    pub fn expect_kind(&mut self, kind: TokenKind) -> Result<Token, ScriptError> {
        self.expect(None, Some(kind))
    }

    fn scan_token(&mut self) -> Result<Token, ScriptError> {
        // '\r' is skipped too so CRLF sources behave like LF ones.
        while matches!(self.peek_char(), Some(' ' | '\t' | '\n' | '\r')) {
            self.advance();
        }

        let start = self.current;
        let token = match self.peek_char() {
            None => self.make_token(TokenKind::EndOfInput, String::new(), None, start),
            Some(c) if c.is_ascii_digit() => self.number(start)?,
            Some('"') => self.string(start)?,
            Some(c) if c.is_alphabetic() || c == '_' => self.identifier(start),
            Some(c) if CONTROL.contains(&c) => self.control(start),
            Some(c) => {
                self.advance();
                return Err(ScriptError::lexical(
                    Span::single(start),
                    format!("Unexpected character '{}' at {}", c, self.position()),
                ));
            }
        };

        trace!(kind = %token.kind, text = %token.text, "scanned token");
        Ok(token)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn lexeme(&self, start: usize) -> String {
        self.chars[start..self.current].iter().collect()
    }

    fn consume_digits(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, ScriptError> {
        self.consume_digits();

        if self.peek_char() == Some('d') {
            self.advance();
            self.consume_digits();
            let text = self.lexeme(start);
            return Ok(self.make_token(TokenKind::DieLiteral, text, None, start));
        }

        let text = self.lexeme(start);
        let value = text.parse::<i64>().map_err(|_| {
            ScriptError::lexical(
                Span::new(start, self.current),
                format!("Invalid integer: {}", text),
            )
        })?;
        Ok(self.make_token(TokenKind::Constant, text, Some(Literal::Integer(value)), start))
    }

    fn string(&mut self, start: usize) -> Result<Token, ScriptError> {
        // Opening quote
        self.advance();
        let mut content = String::new();

        loop {
            match self.advance() {
                None => return Err(self.unterminated_string(start)),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('"') => content.push('"'),
                    Some('n') => content.push('\n'),
                    Some('t') => content.push('\t'),
                    Some('\\') => content.push('\\'),
                    // Unknown escapes are dropped.
                    Some(_) => {}
                    None => return Err(self.unterminated_string(start)),
                },
                Some(c) => content.push(c),
            }
        }

        let literal = Some(Literal::Text(content.clone()));
        Ok(self.make_token(TokenKind::Constant, content, literal, start))
    }

    fn unterminated_string(&self, start: usize) -> ScriptError {
        ScriptError::lexical(
            Span::new(start, self.current),
            "Unterminated string".to_string(),
        )
        .with_help("Close the string literal with a '\"'.")
    }

    fn identifier(&mut self, start: usize) -> Token {
        while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = self.lexeme(start);
        let kind = if KEYWORDS.contains(&text.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.make_token(kind, text, None, start)
    }

    fn control(&mut self, start: usize) -> Token {
        let first = self.advance();
        let text = match (first, self.peek_char()) {
            (Some('='), Some('='))
            | (Some('<'), Some('='))
            | (Some('<'), Some('<'))
            | (Some('>'), Some('>'))
            | (Some('>'), Some('=')) => {
                self.advance();
                self.lexeme(start)
            }
            _ => self.lexeme(start),
        };
        self.make_token(TokenKind::Control, text, None, start)
    }

    fn make_token(
        &self,
        kind: TokenKind,
        text: String,
        literal: Option<Literal>,
        start: usize,
    ) -> Token {
        Token {
            kind,
            text,
            literal,
            span: Span::new(start, self.current.max(start + 1)),
            position: self.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            let done = token.kind == TokenKind::EndOfInput;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn kinds_and_text(source: &str) -> Vec<(TokenKind, String)> {
        tokens(source)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn empty_input_is_end_of_input() {
        let mut lexer = Lexer::new("  \n\t ");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::EndOfInput);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::EndOfInput);
    }

    #[test]
    fn numbers_and_dice() {
        let toks = tokens("42 3d6 0d4");
        assert_eq!(toks[0].kind, TokenKind::Constant);
        assert_eq!(toks[0].literal, Some(Literal::Integer(42)));
        assert_eq!(toks[1].kind, TokenKind::DieLiteral);
        assert_eq!(toks[1].text, "3d6");
        assert_eq!(toks[2].text, "0d4");
    }

    #[test]
    fn digits_followed_by_other_letters_split() {
        assert_eq!(
            kinds_and_text("12x"),
            vec![
                (TokenKind::Constant, "12".to_string()),
                (TokenKind::Identifier, "x".to_string()),
                (TokenKind::EndOfInput, String::new()),
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds_and_text("output on if while outputs _x1"),
            vec![
                (TokenKind::Keyword, "output".to_string()),
                (TokenKind::Keyword, "on".to_string()),
                (TokenKind::Keyword, "if".to_string()),
                (TokenKind::Keyword, "while".to_string()),
                (TokenKind::Identifier, "outputs".to_string()),
                (TokenKind::Identifier, "_x1".to_string()),
                (TokenKind::EndOfInput, String::new()),
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        let texts: Vec<String> = tokens("== <= << >> >= < > = ;")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(
            texts,
            vec!["==", "<=", "<<", ">>", ">=", "<", ">", "=", ";", ""]
        );
    }

    #[test]
    fn string_escapes() {
        let toks = tokens(r#""a\nb" "q\"t\t\\" "x\zy""#);
        assert_eq!(toks[0].literal, Some(Literal::Text("a\nb".to_string())));
        assert_eq!(toks[1].literal, Some(Literal::Text("q\"t\t\\".to_string())));
        // Unknown escape contributes nothing.
        assert_eq!(toks[2].literal, Some(Literal::Text("xy".to_string())));
    }

    #[test]
    fn unterminated_string_fails() {
        let mut lexer = Lexer::new("\"never closed");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert_eq!(err.message, "Unterminated string");

        let mut lexer = Lexer::new("\"trailing\\");
        assert_eq!(lexer.next_token().unwrap_err().kind, ErrorKind::Lexical);
    }

    #[test]
    fn unknown_character_fails() {
        let mut lexer = Lexer::new("x = 1 @ 2;");
        for _ in 0..3 {
            lexer.next_token().unwrap();
        }
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert!(err.message.contains("'@'"));
    }

    #[test]
    fn integer_overflow_fails() {
        let mut lexer = Lexer::new("99999999999999999999");
        assert_eq!(lexer.next_token().unwrap_err().kind, ErrorKind::Lexical);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("a b");
        assert_eq!(lexer.peek().unwrap().text, "a");
        assert_eq!(lexer.peek().unwrap().text, "a");
        assert_eq!(lexer.next_token().unwrap().text, "a");
        assert_eq!(lexer.peek().unwrap().text, "b");
        assert_eq!(lexer.next_token().unwrap().text, "b");
    }

    #[test]
    fn positions_are_recorded_after_the_token() {
        let toks = tokens("ab\n  cd");
        assert_eq!(toks[0].position, Position { line: 1, column: 2 });
        assert_eq!(toks[1].position, Position { line: 2, column: 4 });
        assert_eq!(toks[1].span, Span::new(5, 7));
    }

    #[test]
    fn expect_reports_mismatch_with_position() {
        let mut lexer = Lexer::new("x\n y");
        lexer.expect_kind(TokenKind::Identifier).unwrap();
        let err = lexer.expect_text(";").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.message, "Expected ';' but found 'y' at line 2, column 2");

        let mut lexer = Lexer::new("42");
        let err = lexer.expect_kind(TokenKind::Identifier).unwrap_err();
        assert!(err.message.starts_with("Expected identifier but found '42' (constant)"));
    }

    #[test]
    fn expect_checks_text_and_kind_together() {
        let mut lexer = Lexer::new("if");
        let token = lexer.expect(Some("if"), Some(TokenKind::Keyword)).unwrap();
        assert!(token.is(TokenKind::Keyword, "if"));
    }
}
