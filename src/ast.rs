use crate::error::Span;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Table literal entries: integer key to an unevaluated expression.
pub type TableEntries = BTreeMap<i64, Expr>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assignment {
        name: String,
        value: Expr,
        span: Span,
    },
    Output {
        expr: Expr,
        span: Span,
    },
    If {
        condition: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Assignment { span, .. } => span,
            Stmt::Output { span, .. } => span,
            Stmt::If { span, .. } => span,
            Stmt::While { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer or text literal.
    Constant {
        value: Value,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    /// Shared so that evaluating the literal hands out the same entries
    /// without copying their subtrees.
    Table {
        entries: Rc<TableEntries>,
        span: Span,
    },
    /// `key on table`
    Lookup {
        key: Box<Expr>,
        table: Box<Expr>,
        span: Span,
    },
    /// `NdM` dice roll
    Die {
        count: u32,
        faces: u32,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Constant { span, .. } => span,
            Expr::Identifier { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Unary { span, .. } => span,
            Expr::Table { span, .. } => span,
            Expr::Lookup { span, .. } => span,
            Expr::Die { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Subtract),
            "*" => Some(BinaryOp::Multiply),
            "/" => Some(BinaryOp::Divide),
            "==" => Some(BinaryOp::Equal),
            "<" => Some(BinaryOp::Less),
            "<=" => Some(BinaryOp::LessEqual),
            ">" => Some(BinaryOp::Greater),
            ">=" => Some(BinaryOp::GreaterEqual),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
}

/// Writes a string literal the way it would appear in source.
pub(crate) fn write_text_literal(f: &mut fmt::Formatter, text: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in text.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

pub(crate) fn write_table(f: &mut fmt::Formatter, entries: &TableEntries) -> fmt::Result {
    write!(f, "[")?;
    for (key, expr) in entries {
        write!(f, "{}: {}, ", key, expr)?;
    }
    write!(f, "]")
}

/// Source-like rendering; binary and lookup expressions are parenthesized so
/// the output parses back to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Constant {
                value: Value::Text(text),
                ..
            } => write_text_literal(f, text),
            Expr::Constant { value, .. } => write!(f, "{}", value),
            Expr::Identifier { name, .. } => write!(f, "{}", name),
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Unary { operand, .. } => write!(f, "-{}", operand),
            Expr::Table { entries, .. } => write_table(f, entries),
            Expr::Lookup { key, table, .. } => write!(f, "({} on {})", key, table),
            Expr::Die { count, faces, .. } => write!(f, "{}d{}", count, faces),
        }
    }
}
