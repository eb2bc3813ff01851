use tracing::{debug, info};

use crate::builtins::Builtins;
use crate::console::Console;
use crate::error::InterpError;
use crate::ir::{BlockId, FuncRef, Function, Insn, Program};
use crate::memory::ThreadMemory;
use crate::memory::stack::Stack;
use crate::value::Value;

/// Host stack that must be left before entering another interpreted call.
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each host stack segment added once the red zone is reached.
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

/// What every frame of one evaluation shares.
pub struct Context<'a> {
    pub program: &'a Program,
    pub builtins: &'a Builtins,
    pub console: &'a mut Console,
}

/// Call `func` with `args` in a new frame and run it to completion.
pub fn invoke_fn(
    func: FuncRef,
    args: Vec<Value>,
    memory: &mut ThreadMemory,
    ctx: &mut Context<'_>,
) -> Result<Value, InterpError> {
    let program = ctx.program;
    let function = program
        .function(func)
        .ok_or_else(|| InterpError::UnknownFunction {
            callee: program.describe(func),
        })?;
    if args.len() != function.arity() {
        return Err(InterpError::Arity {
            callee: program.describe(func),
            expected: function.arity(),
            actual: args.len(),
        });
    }

    info!("Starting interpretation of {}", program.describe(func));
    // Interpreted calls recurse on the host stack; only the call depth limit
    // may end a deep recursion.
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
        Stack::with_stack_frame(memory, func, function.num_locals(), args, |memory| {
            FnInterpreter::new(function, memory, ctx).run()
        })
    })
}

/// Executes one call: the frame on top of the stack is this call's frame.
pub struct FnInterpreter<'a, 'm, 'c> {
    pub(super) function: &'a Function,
    pub(super) memory: &'m mut ThreadMemory,
    pub(super) ctx: &'m mut Context<'c>,
    current_block: BlockId,
}

impl<'a, 'm, 'c> FnInterpreter<'a, 'm, 'c> {
    pub fn new(
        function: &'a Function,
        memory: &'m mut ThreadMemory,
        ctx: &'m mut Context<'c>,
    ) -> Self {
        Self {
            function,
            memory,
            ctx,
            current_block: function.entry(),
        }
    }

    pub fn run(&mut self) -> Result<Value, InterpError> {
        let function = self.function;
        loop {
            let block = function
                .block(self.current_block)
                .map_err(|e| InterpError::internal(e.to_string()))?;
            debug!("Executing block {}", self.current_block);

            let mut next = None;
            for id in block.insns() {
                let insn = function
                    .insn(*id)
                    .map_err(|e| InterpError::internal(e.to_string()))?;
                if insn.is_terminator() {
                    next = Some(self.execute_terminator(insn)?);
                    break;
                }
                self.execute_insn(insn)?;
            }

            match next {
                Some(ControlFlow::Continue(target)) => self.current_block = target,
                Some(ControlFlow::Return(value)) => {
                    debug!("Function {} returned {}", function.name(), value);
                    return Ok(value);
                }
                None => {
                    return Err(InterpError::internal(format!(
                        "fell off the end of block {} in {}",
                        self.current_block,
                        function.name()
                    )));
                }
            }
        }
    }

    fn execute_insn(&mut self, insn: &Insn) -> Result<(), InterpError> {
        debug!("Executing instruction: {:?}", insn);

        match insn {
            Insn::Copy { dst, src } => {
                let value = self.evaluate_operand(src)?;
                self.write_local(*dst, value)
            }
            Insn::NewArray { dst, size } => {
                let array = self.evaluate_new_array(size)?;
                self.write_local(*dst, array)
            }
            Insn::LoadArray { dst, array, index } => {
                let value = self.evaluate_load_array(array, index)?;
                self.write_local(*dst, value)
            }
            Insn::StoreArray {
                array,
                index,
                value,
            } => self.evaluate_store_array(array, index, value),
            Insn::LoadGlobal { dst, global } => {
                let value = self.read_global(*global)?;
                self.write_local(*dst, value)
            }
            Insn::StoreGlobal { global, src } => {
                let value = self.evaluate_operand(src)?;
                self.write_global(*global, value)
            }
            Insn::Call { dst, callee, args } => {
                let value = self.evaluate_call(callee, args)?;
                match dst {
                    Some(dst) => self.write_local(*dst, value),
                    None => Ok(()),
                }
            }
            Insn::BinOp { dst, op, lhs, rhs } => {
                let value = self.evaluate_binop(*op, lhs, rhs)?;
                self.write_local(*dst, value)
            }
            Insn::Jump { .. } | Insn::Branch { .. } | Insn::Return { .. } => Err(
                InterpError::internal(format!("terminator {insn:?} executed as an instruction")),
            ),
        }
    }

    fn execute_terminator(&mut self, insn: &Insn) -> Result<ControlFlow, InterpError> {
        debug!("Executing terminator: {:?}", insn);

        match insn {
            Insn::Jump { target } => Ok(ControlFlow::Continue(*target)),
            Insn::Branch {
                cond,
                then_target,
                else_target,
            } => match self.evaluate_operand(cond)? {
                Value::Int(0) => Ok(ControlFlow::Continue(*else_target)),
                Value::Int(_) => Ok(ControlFlow::Continue(*then_target)),
                other => Err(InterpError::InvalidCondition {
                    found: other.kind(),
                }),
            },
            Insn::Return { value } => Ok(ControlFlow::Return(self.evaluate_operand(value)?)),
            other => Err(InterpError::internal(format!(
                "{other:?} is not a terminator"
            ))),
        }
    }
}

#[derive(Debug)]
pub enum ControlFlow {
    Continue(BlockId),
    Return(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::ir::{BinOp, Builder, Local, ProgramBuilder};

    fn single(function: Function) -> Program {
        let mut pb = ProgramBuilder::new();
        let m = pb.add_module("main");
        let entry = pb.declare_function(m, function).unwrap();
        pb.finish(entry).unwrap()
    }

    fn run(program: &Program, args: Vec<Value>) -> Result<Value, InterpError> {
        let (mut console, _) = Console::buffered("");
        let mut ctx = Context {
            program,
            builtins: builtins::standard().unwrap(),
            console: &mut console,
        };
        let mut memory = ThreadMemory::new(program.globals().len(), 64);
        invoke_fn(program.entry(), args, &mut memory, &mut ctx)
    }

    #[test]
    fn test_loop_counts_down() {
        // n = arg; acc = 0; while n > 0 { acc = acc + n; n = n - 1 }; return acc
        let mut f = Function::new("main", vec!["n".into()]);
        {
            let mut b = Builder::new(&mut f);
            let n = Local(0);
            let acc = b.temp();
            let cond_bb = b.create_block("while.cond");
            let body_bb = b.create_block("while.body");
            let exit_bb = b.create_block("while.exit");
            b.copy(acc, 0_i64).unwrap();
            b.jump(cond_bb).unwrap();

            b.switch_to(cond_bb);
            let c = b.binop(BinOp::Gt, n, 0_i64).unwrap();
            b.branch(c, body_bb, exit_bb).unwrap();

            b.switch_to(body_bb);
            let sum = b.binop(BinOp::Add, acc, n).unwrap();
            b.copy(acc, sum).unwrap();
            let dec = b.binop(BinOp::Sub, n, 1_i64).unwrap();
            b.copy(n, dec).unwrap();
            b.jump(cond_bb).unwrap();

            b.switch_to(exit_bb);
            b.ret(acc).unwrap();
        }
        let program = single(f);
        assert_eq!(run(&program, vec![Value::Int(4)]).unwrap(), Value::Int(10));
    }

    #[test]
    fn test_branch_requires_int() {
        let mut f = Function::new("main", vec!["c".into()]);
        {
            let mut b = Builder::new(&mut f);
            let yes = b.create_block("yes");
            b.branch(Local(0), yes, yes).unwrap();
            b.switch_to(yes);
            b.ret(1_i64).unwrap();
        }
        let program = single(f);
        assert_eq!(run(&program, vec![Value::Int(7)]).unwrap(), Value::Int(1));
        assert!(matches!(
            run(&program, vec![Value::from("yes")]),
            Err(InterpError::InvalidCondition { .. })
        ));
    }

    #[test]
    fn test_entry_arity_checked() {
        let mut f = Function::new("main", vec![]);
        Builder::new(&mut f).ret(0_i64).unwrap();
        let program = single(f);
        assert!(matches!(
            run(&program, vec![Value::Null]),
            Err(InterpError::Arity {
                expected: 0,
                actual: 1,
                ..
            })
        ));
    }
}
