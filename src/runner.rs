use crate::error::ScriptError;
use crate::evaluator::{Context, Evaluator};
use crate::lexer::read_source;
use crate::parser::Parser;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Settings shared by file runs and the interactive session.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Seed for the dice roller; entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Parse only, do not evaluate.
    pub check_only: bool,
}

impl RunOptions {
    pub fn evaluator(&self) -> Evaluator {
        let evaluator = Evaluator::new();
        match self.seed {
            Some(seed) => evaluator.with_seed(seed),
            None => evaluator,
        }
    }

    /// Runs `source` the way these options ask: parse only under
    /// `check_only`, otherwise parse and evaluate.
    pub fn execute<W: Write>(
        &self,
        source: &str,
        evaluator: &mut Evaluator<W>,
        context: &mut Context,
    ) -> Result<(), ScriptError> {
        if self.check_only {
            let program = Parser::from_source(source).parse()?;
            info!(statements = program.statements.len(), "syntax ok");
            Ok(())
        } else {
            execute(source, evaluator, context)
        }
    }
}

/// Parses `source` completely, then evaluates it against `context`.
/// Nothing is evaluated if parsing fails.
pub fn execute<W: Write>(
    source: &str,
    evaluator: &mut Evaluator<W>,
    context: &mut Context,
) -> Result<(), ScriptError> {
    let program = Parser::from_source(source).parse()?;
    evaluator.evaluate_program(&program, context)
}

/// Runs a script, reporting any error against the source before returning it.
pub fn run(
    source: &str,
    filename: Option<&str>,
    options: &RunOptions,
) -> Result<Context, ScriptError> {
    let mut context = Context::new();

    let mut evaluator = options.evaluator();

    match options.execute(source, &mut evaluator, &mut context) {
        Ok(()) => {
            debug!(bindings = context.len(), "run finished");
            Ok(context)
        }
        Err(error) => {
            error.report(source, filename);
            Err(error)
        }
    }
}

/// Runs the script at `path`. The source is kept so errors can be
/// reported against it, which is why this does not go through
/// `Parser::from_path`.
pub fn run_file(path: &Path, options: &RunOptions) -> Result<Context, ScriptError> {
    let filename = path.display().to_string();
    let source = read_source(path).map_err(|error| {
        error.report("", Some(&filename));
        error
    })?;

    run(&source, Some(&filename), options)
}
