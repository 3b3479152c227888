use crate::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
use crate::error::{ScriptError, Span};
use crate::value::Value;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::{debug, trace};

/// Variable bindings for one program run. Blocks do not open new scopes.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Creates the binding if absent, otherwise overwrites it.
    pub fn assign(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Tree-walking evaluator. Holds the output sink for `output` statements and
/// the random source for dice; all variable state lives in the [`Context`]
/// passed to each call.
pub struct Evaluator<W: Write = io::Stdout> {
    output: W,
    rng: Box<dyn RngCore>,
}

impl Evaluator<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Evaluator<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Evaluator<W> {
    pub fn with_output(output: W) -> Self {
        Self {
            output,
            rng: Box::new(StdRng::from_entropy()),
        }
    }

    pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Reproducible dice rolls.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn evaluate_program(
        &mut self,
        program: &Program,
        context: &mut Context,
    ) -> Result<(), ScriptError> {
        debug!(statements = program.statements.len(), "evaluating program");
        let result = self.execute_block(&program.statements, context);

        // Output written before a failure stays written.
        self.output
            .flush()
            .map_err(|e| ScriptError::io(format!("Error writing output: {}", e)))?;
        result
    }

    pub fn execute_statement(
        &mut self,
        stmt: &Stmt,
        context: &mut Context,
    ) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Assignment { name, value, .. } => {
                let value = self.evaluate_expression(value, context)?;
                trace!(name = %name, value = %value, "assign");
                context.assign(name, value);
                Ok(())
            }
            Stmt::Output { expr, .. } => {
                let value = self.evaluate_expression(expr, context)?;
                writeln!(self.output, "{}", value)
                    .map_err(|e| ScriptError::io(format!("Error writing output: {}", e)))
            }
            Stmt::If {
                condition, body, ..
            } => {
                if self.condition(condition, context)? {
                    self.execute_block(body, context)?;
                }
                Ok(())
            }
            Stmt::While {
                condition, body, ..
            } => {
                while self.condition(condition, context)? {
                    self.execute_block(body, context)?;
                }
                Ok(())
            }
        }
    }

    fn execute_block(&mut self, statements: &[Stmt], context: &mut Context) -> Result<(), ScriptError> {
        for statement in statements {
            self.execute_statement(statement, context)?;
        }
        Ok(())
    }

    fn condition(&mut self, condition: &Expr, context: &mut Context) -> Result<bool, ScriptError> {
        match self.evaluate_expression(condition, context)? {
            Value::Integer(n) => Ok(n != 0),
            other => Err(ScriptError::type_mismatch(
                *condition.span(),
                format!("Condition must be an integer, got {}", other.type_name()),
            )
            .with_help("Comparisons such as 'x < 3' evaluate to 1 or 0.")),
        }
    }

    pub fn evaluate_expression(
        &mut self,
        expr: &Expr,
        context: &mut Context,
    ) -> Result<Value, ScriptError> {
        match expr {
            Expr::Constant { value, .. } => Ok(value.clone()),
            Expr::Identifier { name, span } => context
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::undefined_variable(*span, name)),
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_val = self.evaluate_expression(left, context)?;
                let right_val = self.evaluate_expression(right, context)?;
                self.evaluate_binary_op(*operator, left_val, right_val, span)
            }
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand_val = self.evaluate_expression(operand, context)?;
                self.evaluate_unary_op(*operator, operand_val, span)
            }
            Expr::Table { entries, .. } => Ok(Value::Table(entries.clone())),
            Expr::Lookup { key, table, span } => self.lookup(key, table, span, context),
            Expr::Die {
                count,
                faces,
                span,
            } => self.roll(*count, *faces, span),
        }
    }

    fn lookup(
        &mut self,
        key: &Expr,
        table: &Expr,
        span: &Span,
        context: &mut Context,
    ) -> Result<Value, ScriptError> {
        let key_val = self.evaluate_expression(key, context)?;
        let table_val = self.evaluate_expression(table, context)?;

        let key_int = match key_val {
            Value::Integer(n) => n,
            other => {
                return Err(ScriptError::type_mismatch(
                    *key.span(),
                    format!("Table keys are integers, got {}", other.type_name()),
                ))
            }
        };
        let entries = match table_val {
            Value::Table(entries) => entries,
            other => {
                return Err(ScriptError::type_mismatch(
                    *table.span(),
                    format!("Cannot look up a key in {}", other.type_name()),
                )
                .with_help("The expression after 'on' must be a table."))
            }
        };

        let entry = entries.get(&key_int).ok_or_else(|| {
            let keys: Vec<String> = entries.keys().map(|k| k.to_string()).collect();
            let help = if keys.is_empty() {
                "The table is empty.".to_string()
            } else {
                format!("Available keys: {}", keys.join(", "))
            };
            ScriptError::key_not_found(*span, key_int).with_help(help)
        })?;

        trace!(key = key_int, entry = %entry, "table lookup");
        // Evaluated now, in the current context; dice inside re-roll every time.
        self.evaluate_expression(entry, context)
    }

    fn roll(&mut self, count: u32, faces: u32, span: &Span) -> Result<Value, ScriptError> {
        let mut total: i64 = 0;
        for _ in 0..count {
            let face = self.rng.gen_range(1..=faces);
            total = total
                .checked_add(i64::from(face))
                .ok_or_else(|| Self::overflow(span))?;
        }

        trace!(count, faces, total, "rolled dice");
        Ok(Value::Integer(total))
    }

    fn evaluate_binary_op(
        &self,
        operator: BinaryOp,
        left: Value,
        right: Value,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        match operator {
            BinaryOp::Add => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => l
                    .checked_add(r)
                    .map(Value::Integer)
                    .ok_or_else(|| Self::overflow(span)),
                (Value::Text(l), Value::Text(r)) => Ok(Value::Text(l + &r)),
                (l, r) => Err(Self::operand_mismatch("add", &l, &r, span)),
            },
            BinaryOp::Subtract => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => l
                    .checked_sub(r)
                    .map(Value::Integer)
                    .ok_or_else(|| Self::overflow(span)),
                (l, r) => Err(Self::operand_mismatch("subtract", &l, &r, span)),
            },
            BinaryOp::Multiply => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => l
                    .checked_mul(r)
                    .map(Value::Integer)
                    .ok_or_else(|| Self::overflow(span)),
                (l, r) => Err(Self::operand_mismatch("multiply", &l, &r, span)),
            },
            BinaryOp::Divide => match (left, right) {
                (Value::Integer(_), Value::Integer(0)) => Err(ScriptError::arithmetic(
                    *span,
                    "Division by zero".to_string(),
                )),
                // Truncates toward zero.
                (Value::Integer(l), Value::Integer(r)) => l
                    .checked_div(r)
                    .map(Value::Integer)
                    .ok_or_else(|| Self::overflow(span)),
                (l, r) => Err(Self::operand_mismatch("divide", &l, &r, span)),
            },
            BinaryOp::Equal => match (&left, &right) {
                (Value::Table(_), _) | (_, Value::Table(_)) => {
                    Err(Self::operand_mismatch("compare", &left, &right, span))
                }
                // Integer vs text is simply unequal.
                _ => Ok(Value::from(left == right)),
            },
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let ordering = match (&left, &right) {
                    (Value::Integer(l), Value::Integer(r)) => l.cmp(r),
                    (Value::Text(l), Value::Text(r)) => l.cmp(r),
                    _ => return Err(Self::operand_mismatch("compare", &left, &right, span)),
                };
                let result = match operator {
                    BinaryOp::Less => ordering == Ordering::Less,
                    BinaryOp::LessEqual => ordering != Ordering::Greater,
                    BinaryOp::Greater => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::from(result))
            }
        }
    }

    fn evaluate_unary_op(
        &self,
        operator: UnaryOp,
        operand: Value,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        match operator {
            UnaryOp::Negate => match operand {
                Value::Integer(n) => n
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| Self::overflow(span)),
                other => Err(ScriptError::type_mismatch(
                    *span,
                    format!("Cannot negate {}", other.type_name()),
                )),
            },
        }
    }

    fn overflow(span: &Span) -> ScriptError {
        ScriptError::arithmetic(*span, "Integer overflow".to_string())
    }

    fn operand_mismatch(verb: &str, left: &Value, right: &Value, span: &Span) -> ScriptError {
        ScriptError::type_mismatch(
            *span,
            format!(
                "Cannot {} {} and {}",
                verb,
                left.type_name(),
                right.type_name()
            ),
        )
    }
}
