use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;

/// Half-open range of character offsets into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(&self, other: &Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    UndefinedVariable,
    KeyNotFound,
    Arithmetic,
    TypeMismatch,
    Io,
}

impl ErrorKind {
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::Lexical => "Lexical Error",
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::UndefinedVariable => "Undefined Variable",
            ErrorKind::KeyNotFound => "Key Not Found",
            ErrorKind::Arithmetic => "Arithmetic Error",
            ErrorKind::TypeMismatch => "Type Mismatch",
            ErrorKind::Io => "I/O Error",
        }
    }

    fn color(&self) -> Color {
        match self {
            ErrorKind::Lexical => Color::Red,
            ErrorKind::Syntax => Color::Yellow,
            ErrorKind::Io => Color::Blue,
            _ => Color::Magenta,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn lexical(span: Span, message: String) -> Self {
        Self::new(ErrorKind::Lexical, span, message)
    }

    pub fn syntax(span: Span, message: String) -> Self {
        Self::new(ErrorKind::Syntax, span, message)
    }

    pub fn undefined_variable(span: Span, name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            span,
            format!("Undefined variable '{}'", name),
        )
        .with_help(format!("Assign a value first, e.g. '{} = 0;'", name))
    }

    pub fn key_not_found(span: Span, key: i64) -> Self {
        Self::new(
            ErrorKind::KeyNotFound,
            span,
            format!("No table entry for key {}", key),
        )
    }

    pub fn arithmetic(span: Span, message: String) -> Self {
        Self::new(ErrorKind::Arithmetic, span, message)
    }

    pub fn type_mismatch(span: Span, message: String) -> Self {
        Self::new(ErrorKind::TypeMismatch, span, message)
    }

    /// I/O failures have no meaningful location in the script.
    pub fn io(message: String) -> Self {
        Self::new(ErrorKind::Io, Span::new(0, 0), message)
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");
        let color = self.kind.color();

        // Clamp to the source so a span at end of input still renders.
        let len = source.chars().count();
        let start = self.span.start.min(len);
        let end = self.span.end.min(len).max(start);

        let mut report_builder = Report::build(ReportKind::Error, filename, start)
            .with_message(format!("{}: {}", self.kind.title().fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        if report_builder
            .finish()
            .eprint((filename, Source::from(source)))
            .is_err()
        {
            eprintln!("{}: {}", self.kind.title(), self);
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScriptError {}
