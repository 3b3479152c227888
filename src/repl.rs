use crate::evaluator::Context;
use crate::runner::RunOptions;
use std::io::{self, Write};

/// Interactive session. Each line is a complete program (statements end
/// with ';'); bindings persist between lines. Under `--check` lines are
/// only parsed.
pub fn start(mut context: Context, options: &RunOptions) {
    println!("rollscript interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let mut evaluator = options.evaluator();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }

                if let Err(error) = options.execute(line, &mut evaluator, &mut context) {
                    error.report(line, None);
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}
