//! IR pretty-printer.
//!
//! Renders programs and functions as text for diagnostics. The format is
//! deterministic (modules, functions and blocks in index order, instructions
//! in block order) but it is not meant to be parsed back.

use std::fmt::{self, Write};

use crate::ir::block::BlockId;
use crate::ir::function::Function;
use crate::ir::insn::{Callee, Insn, Operand};
use crate::ir::program::{FuncRef, GlobalId, Program};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Append each instruction's source location as `!file,l:c,l:c`.
    pub source_locations: bool,
}

/// Display adapter returned by [`Program::dump`].
pub struct ProgramDump<'a> {
    program: &'a Program,
    options: PrintOptions,
}

/// Display adapter returned by [`Function::dump`].
pub struct FunctionDump<'a> {
    function: &'a Function,
    program: Option<&'a Program>,
    options: PrintOptions,
}

impl Program {
    pub fn dump(&self, options: PrintOptions) -> ProgramDump<'_> {
        ProgramDump {
            program: self,
            options,
        }
    }
}

impl Function {
    /// Dump a single function. With a program at hand, calls and globals are
    /// printed by name instead of by index.
    pub fn dump<'a>(&'a self, program: Option<&'a Program>, options: PrintOptions) -> FunctionDump<'a> {
        FunctionDump {
            function: self,
            program,
            options,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.dump(PrintOptions::default()), f)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.dump(None, PrintOptions::default()), f)
    }
}

impl fmt::Display for ProgramDump<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program;
        writeln!(out, "// entry: {}", program.describe(program.entry()))?;
        for module in program.modules() {
            writeln!(out, "\nmodule {}", module.id())?;
            for import in module.imports() {
                if let Some(imported) = program.module(*import) {
                    writeln!(out, "  import {}", imported.id())?;
                }
            }
            for global in module.globals() {
                writeln!(out, "  global {}", program.describe_global(*global))?;
            }
            for (index, function) in module.functions().iter().enumerate() {
                if module.init() == Some(index as u32) {
                    writeln!(out, "\n  // module initializer")?;
                } else {
                    writeln!(out)?;
                }
                write_function(out, function, Some(program), self.options)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for FunctionDump<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_function(out, self.function, self.program, self.options)
    }
}

fn write_function(
    out: &mut impl Write,
    func: &Function,
    program: Option<&Program>,
    options: PrintOptions,
) -> fmt::Result {
    write!(out, "  fun {}(", func.name())?;
    for (i, param) in func.params().iter().enumerate() {
        if i > 0 {
            write!(out, ", ")?;
        }
        write!(out, "%{i} {param}")?;
    }
    writeln!(out, ") [locals: {}] {{", func.num_locals())?;

    for block in func.blocks() {
        write!(out, "  {}", block.id())?;
        if let Some(name) = block.name() {
            write!(out, " ({name})")?;
        }
        write!(out, ":")?;
        write_edges(out, "preds", block.predecessors())?;
        write_edges(out, "succs", block.successors())?;
        writeln!(out)?;

        for id in block.insns() {
            let Ok(insn) = func.insn(*id) else {
                writeln!(out, "    <missing {id}>")?;
                continue;
            };
            write!(out, "    ")?;
            write_insn(out, insn, program)?;
            if options.source_locations {
                if let Ok(location) = func.location(*id) {
                    write!(out, "  {}", location.annotation())?;
                }
            }
            writeln!(out)?;
        }
    }
    writeln!(out, "  }}")
}

fn write_edges(out: &mut impl Write, label: &str, blocks: &[BlockId]) -> fmt::Result {
    if blocks.is_empty() {
        return Ok(());
    }
    write!(out, " ; {label}:")?;
    for block in blocks {
        write!(out, " {block}")?;
    }
    Ok(())
}

fn write_insn(out: &mut impl Write, insn: &Insn, program: Option<&Program>) -> fmt::Result {
    match insn {
        Insn::Copy { dst, src } => write!(out, "{dst} = {src}"),
        Insn::NewArray { dst, size } => write!(out, "{dst} = newarray {size}"),
        Insn::LoadArray { dst, array, index } => write!(out, "{dst} = {array}[{index}]"),
        Insn::StoreArray {
            array,
            index,
            value,
        } => write!(out, "{array}[{index}] = {value}"),
        Insn::LoadGlobal { dst, global } => {
            write!(out, "{dst} = load {}", global_name(*global, program))
        }
        Insn::StoreGlobal { global, src } => {
            write!(out, "store {}, {src}", global_name(*global, program))
        }
        Insn::Call { dst, callee, args } => {
            if let Some(dst) = dst {
                write!(out, "{dst} = ")?;
            }
            match callee {
                Callee::Function(func) => write!(out, "call {}", function_name(*func, program))?,
                Callee::Builtin(name) => write!(out, "call builtin {name}")?,
            }
            write_args(out, args)
        }
        Insn::BinOp { dst, op, lhs, rhs } => write!(out, "{dst} = {lhs} {} {rhs}", op.symbol()),
        Insn::Jump { target } => write!(out, "jump {target}"),
        Insn::Branch {
            cond,
            then_target,
            else_target,
        } => write!(out, "branch {cond}, {then_target}, {else_target}"),
        Insn::Return { value } => write!(out, "return {value}"),
    }
}

fn write_args(out: &mut impl Write, args: &[Operand]) -> fmt::Result {
    write!(out, "(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(out, ", ")?;
        }
        write!(out, "{arg}")?;
    }
    write!(out, ")")
}

fn global_name(global: GlobalId, program: Option<&Program>) -> String {
    match program {
        Some(p) => format!("@{}", p.describe_global(global)),
        None => global.to_string(),
    }
}

fn function_name(func: FuncRef, program: Option<&Program>) -> String {
    match program {
        Some(p) => p.describe(func),
        None => format!("fn{}.{}", func.module.0, func.index),
    }
}
