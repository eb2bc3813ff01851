//! Teal IR and interpreter.
//!
//! The back end of the Teal teaching language: a validated program tree
//! ([`ast`]) is lowered ([`lower`]) into block-structured IR ([`ir`]) and
//! executed by a tree-walking interpreter ([`interpreter`]) that calls into a
//! registry of dynamically type-checked builtin operations ([`builtins`]).
//!
//! # Examples
//! ```no_run
//! use teal_ir::{Value, demos};
//!
//! let program = demos::find("sum_rec").unwrap().lower()?;
//! let result = program.eval(vec![Value::Int(20)])?;
//! assert_eq!(result.return_value(), &Value::Int(210));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod ast;
pub mod builtins;
pub mod console;
pub mod demos;
pub mod error;
pub mod interpreter;
pub mod ir;
pub mod lower;
mod memory;
pub mod value;

pub use console::{Console, SharedBuffer};
pub use error::{Error, InterpError, LinkageError, LowerError, StructuralError};
pub use interpreter::{EvalResult, InterpConfig, Interpreter};
pub use lower::LowerOptions;
pub use value::{ArrayRef, Value, ValueKind};

/// Lower `program` and evaluate it with `args`, using the standard builtins
/// and standard streams.
pub fn run(program: &ast::Program, args: Vec<Value>) -> Result<EvalResult, Error> {
    let ir = lower::lower(program, &LowerOptions::default())?;
    Ok(ir.eval(args)?)
}

/// Interpret a command-line argument: an integer if it parses as one, a
/// string otherwise.
pub fn parse_arg(arg: &str) -> Value {
    match arg.parse::<i64>() {
        Ok(i) => Value::Int(i),
        Err(_) => Value::from(arg),
    }
}
