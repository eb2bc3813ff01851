//! Evaluation engine.
//!
//! Executes a lowered [`Program`] block by block and instruction by
//! instruction. Module initializers run first, once each and dependencies
//! first; then the entry function runs with the caller's arguments. Calls
//! between interpreted functions recurse on the host stack, which grows on
//! demand, bounded by [`InterpConfig::max_call_depth`].
//!
//! Any failure unwinds every active frame and surfaces as an
//! [`InterpError`]. There is no way to catch it inside the program.

mod function;
mod place;
mod rvalue;

use tracing::{info, warn};

use crate::builtins::{self, Builtins};
use crate::console::Console;
use crate::error::InterpError;
use crate::ir::{FuncRef, GlobalId, Program};
use crate::memory::ThreadMemory;
use crate::value::Value;
use function::{Context, invoke_fn};

/// Environment variable overriding [`InterpConfig::max_call_depth`].
pub const MAX_CALL_DEPTH_VAR: &str = "TEAL_MAX_CALL_DEPTH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpConfig {
    /// Frames allowed on the call stack at once.
    pub max_call_depth: usize,
}

impl Default for InterpConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1_000,
        }
    }
}

impl InterpConfig {
    /// Defaults, overridden by `TEAL_MAX_CALL_DEPTH` when it is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_CALL_DEPTH_VAR) {
            match raw.trim().parse() {
                Ok(depth) => config.max_call_depth = depth,
                Err(e) => warn!("Ignoring {}={:?}: {}", MAX_CALL_DEPTH_VAR, raw, e),
            }
        }
        config
    }
}

/// Outcome of a successful evaluation.
#[derive(Debug, Clone)]
pub struct EvalResult {
    return_value: Value,
    globals: Vec<Value>,
}

impl EvalResult {
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    pub fn into_return_value(self) -> Value {
        self.return_value
    }

    /// Final value of a global. Globals never assigned are null.
    pub fn global(&self, global: GlobalId) -> Option<&Value> {
        self.globals.get(global.index())
    }

    pub fn global_by_name(&self, program: &Program, module: &str, name: &str) -> Option<&Value> {
        self.global(program.global_id(module, name)?)
    }

    pub fn globals(&self) -> &[Value] {
        &self.globals
    }
}

/// Evaluates one program.
///
/// By default it uses the process-wide standard builtins, standard streams
/// and [`InterpConfig::default`].
pub struct Interpreter<'p> {
    program: &'p Program,
    builtins: Option<&'p Builtins>,
    console: Console,
    config: InterpConfig,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            builtins: None,
            console: Console::stdio(),
            config: InterpConfig::default(),
        }
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_config(mut self, config: InterpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_builtins(mut self, builtins: &'p Builtins) -> Self {
        self.builtins = Some(builtins);
        self
    }

    /// Run every module initializer, then the entry function with `args`.
    pub fn eval(&mut self, args: Vec<Value>) -> Result<EvalResult, InterpError> {
        let builtins = match self.builtins {
            Some(builtins) => builtins,
            None => builtins::standard()?,
        };
        let program = self.program;
        let entry = program.entry();
        let entry_fn = program
            .function(entry)
            .ok_or_else(|| InterpError::UnknownFunction {
                callee: program.describe(entry),
            })?;
        if args.len() != entry_fn.arity() {
            return Err(InterpError::Arity {
                callee: program.describe(entry),
                expected: entry_fn.arity(),
                actual: args.len(),
            });
        }

        info!("Evaluating {} with {} argument(s)", program.describe(entry), args.len());
        let mut memory = ThreadMemory::new(program.globals().len(), self.config.max_call_depth);
        let mut ctx = Context {
            program,
            builtins,
            console: &mut self.console,
        };

        for module_idx in program.init_order() {
            let Some(module) = program.module(*module_idx) else {
                continue;
            };
            if let Some(index) = module.init() {
                info!("Initializing module {}", module.id());
                let init = FuncRef {
                    module: *module_idx,
                    index,
                };
                invoke_fn(init, vec![], &mut memory, &mut ctx)?;
            }
        }

        let return_value = invoke_fn(entry, args, &mut memory, &mut ctx)?;
        info!("Program returned {}", return_value);
        Ok(EvalResult {
            return_value,
            globals: memory.statics.into_values(),
        })
    }
}

impl Program {
    /// Evaluate with the standard builtins and standard streams.
    pub fn eval(&self, args: Vec<Value>) -> Result<EvalResult, InterpError> {
        Interpreter::new(self)
            .with_config(InterpConfig::from_env())
            .eval(args)
    }
}
