mod builtin;
mod environment;
mod error;
mod eval;
mod output;
mod prelude;
mod value;

use std::rc::{Rc, Weak};

use tracing::debug;

pub use builtin::{builtin_names, lookup_builtin, Builtin, BuiltinFn};
pub use environment::Environment;
pub use error::RuntimeError;
pub use output::{CaptureOutput, Output, WriteOutput};
pub use prelude::load_prelude;
pub use value::{Function, HashKey, HashObject, HashPair, Value, ValueKind, FALSE, NULL, TRUE};

use crate::parser::{parse, SyntaxErrors};
use crate::scanner::Scanner;

pub struct Interpreter {
    global_env: Rc<Environment>,
    // Every scope opened for a call. Closures stored in their own scope form reference cycles,
    // which pruning and drop break by clearing the scope
    scopes: Vec<Weak<Environment>>,
    prune_at: usize,
    output: Box<dyn Output>,
}

const MIN_PRUNE_AT: usize = 256;

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(WriteOutput::stdout())
    }

    pub fn with_output(output: impl Output + 'static) -> Interpreter {
        Interpreter {
            global_env: Environment::new_global(),
            scopes: Vec::new(),
            prune_at: MIN_PRUNE_AT,
            output: Box::new(output),
        }
    }

    pub fn global_env(&self) -> &Rc<Environment> {
        &self.global_env
    }

    /// Parses and evaluates `code` in the global environment. Nothing is evaluated if parsing failed
    pub fn eval_source(&mut self, code: &str) -> Result<Option<Value>, SyntaxErrors> {
        let (program, errors) = parse(Scanner::new(code));
        if !errors.is_empty() {
            debug!(count = errors.len(), "not evaluating program with syntax errors");
            return Err(SyntaxErrors(errors));
        }
        Ok(self.eval_program(&program))
    }

    pub(crate) fn write_line(&mut self, line: &str) {
        self.output.write_line(line);
    }

    pub(crate) fn open_scope(&mut self, outer: &Rc<Environment>) -> Rc<Environment> {
        let scope = Environment::enclosed(outer);
        if self.scopes.len() >= self.prune_at {
            self.prune_scopes();
            self.prune_at = (self.scopes.len() * 2).max(MIN_PRUNE_AT);
            debug!(live = self.scopes.len(), "pruned dead scopes");
        }
        self.scopes.push(Rc::downgrade(&scope));
        scope
    }

    // Drops dead scopes and clears the ones kept alive only by closures they hold themselves.
    // Clearing one scope can release its parent, so repeat until nothing changes
    fn prune_scopes(&mut self) {
        loop {
            let mut cleared = 0;
            self.scopes.retain(|weak| {
                let Some(scope) = weak.upgrade() else {
                    return false;
                };
                // Discount the handle just upgraded
                if Rc::strong_count(&scope) - 1 == scope.internal_references() {
                    scope.clear();
                    cleared += 1;
                    return false;
                }
                true
            });
            if cleared == 0 {
                break;
            }
            debug!(cleared, "cleared unreachable closure scopes");
        }
    }

    #[cfg(test)]
    fn live_scopes(&self) -> usize {
        self.scopes.iter().filter(|scope| scope.strong_count() > 0).count()
    }

    #[cfg(test)]
    fn tracked_scopes(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        let live: Vec<_> = self.scopes.drain(..).filter_map(|scope| scope.upgrade()).collect();
        debug!(scopes = live.len(), "clearing environments");
        for scope in &live {
            scope.clear();
        }
        self.global_env.clear();
    }
}
