//! Lowering from the validated tree to IR.
//!
//! Lowering runs in two passes. The first walks the import graph from the
//! root module, depth first, visiting each module once however many import
//! paths reach it, and declares every global and function signature. The
//! second lowers function bodies, so calls may target any declared function
//! in any module, including mutually recursive ones.
//!
//! Global initializers of a module are collected into one synthesized
//! initializer function that the interpreter runs before the entry point.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast;
use crate::error::LowerError;
use crate::ir::{
    Builder, Callee, FuncRef, Function, GlobalId, Local, ModuleIdx, Operand, Program,
    ProgramBuilder, SourceLocation,
};

/// Name of the synthesized per-module initializer.
pub const INIT_FUNCTION: &str = "<init>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerOptions {
    /// Function of the root module that evaluation starts from.
    pub entry: String,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            entry: "main".to_owned(),
        }
    }
}

/// Every declared function and global, keyed by `(module, name)`.
#[derive(Default)]
struct Symbols {
    functions: HashMap<(String, String), FuncRef>,
    globals: HashMap<(String, String), GlobalId>,
}

impl Symbols {
    fn function(&self, module: &str, name: &str) -> Result<FuncRef, LowerError> {
        self.functions
            .get(&(module.to_owned(), name.to_owned()))
            .copied()
            .ok_or_else(|| LowerError::UnknownFunction {
                module: module.to_owned(),
                name: name.to_owned(),
            })
    }

    fn global(&self, module: &str, name: &str) -> Result<GlobalId, LowerError> {
        self.globals
            .get(&(module.to_owned(), name.to_owned()))
            .copied()
            .ok_or_else(|| LowerError::UnknownGlobal {
                module: module.to_owned(),
                name: name.to_owned(),
            })
    }
}

/// Lower `program` to IR, starting at `options.entry` in the root module.
pub fn lower(program: &ast::Program, options: &LowerOptions) -> Result<Program, LowerError> {
    let order = reachable_modules(program)?;
    let mut pb = ProgramBuilder::new();
    let mut symbols = Symbols::default();

    for (id, _) in &order {
        pb.add_module(id.as_str());
    }
    let mut inits = Vec::new();
    for (id, module) in &order {
        debug!("Declaring module {}", id);
        let idx = module_idx(&pb, id)?;
        for import in &module.imports {
            let imported = module_idx(&pb, import)?;
            pb.add_import(idx, imported)?;
        }
        for global in &module.globals {
            let gid = pb.add_global(idx, &global.name)?;
            symbols.globals.insert((id.clone(), global.name.clone()), gid);
        }
        for func in &module.functions {
            let fref = pb.declare_function(idx, Function::new(&func.name, func.params.clone()))?;
            symbols.functions.insert((id.clone(), func.name.clone()), fref);
        }
        if module.globals.iter().any(|g| g.init.is_some()) {
            let fref = pb.declare_function(idx, Function::new(INIT_FUNCTION, vec![]))?;
            pb.set_init(fref)?;
            inits.push((id.as_str(), *module, fref));
        }
    }

    for (id, module) in &order {
        for func in &module.functions {
            debug!("Lowering function {}::{}", id, func.name);
            let fref = symbols.function(id, &func.name)?;
            let lowered = FnLowerer::lower_function(&symbols, id, func)?;
            replace_function(&mut pb, fref, lowered);
        }
    }
    for (id, module, fref) in inits {
        debug!("Lowering initializer of {}", id);
        let lowered = FnLowerer::lower_init(&symbols, id, module)?;
        replace_function(&mut pb, fref, lowered);
    }

    let entry = symbols
        .function(&program.root, &options.entry)
        .map_err(|_| LowerError::MissingEntry {
            module: program.root.clone(),
            name: options.entry.clone(),
        })?;
    Ok(pb.finish(entry)?)
}

fn module_idx(pb: &ProgramBuilder, id: &str) -> Result<ModuleIdx, LowerError> {
    pb.module_idx(id).ok_or_else(|| LowerError::UnknownModule {
        module: id.to_owned(),
    })
}

fn replace_function(pb: &mut ProgramBuilder, fref: FuncRef, lowered: Function) {
    if let Some(slot) = pb.function_mut(fref) {
        *slot = lowered;
    }
}

/// Modules reachable from the root, each once, in depth-first preorder.
fn reachable_modules(program: &ast::Program) -> Result<Vec<(String, &ast::Module)>, LowerError> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut pending = vec![program.root.clone()];
    while let Some(id) = pending.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let module = program
            .modules
            .get(&id)
            .ok_or_else(|| LowerError::UnknownModule { module: id.clone() })?;
        // Reversed so the first import is visited first.
        pending.extend(module.imports.iter().rev().cloned());
        order.push((id, module));
    }
    Ok(order)
}

struct FnLowerer<'a, 'f> {
    symbols: &'a Symbols,
    builder: Builder<'f>,
    scopes: Vec<HashMap<String, Local>>,
}

impl<'a, 'f> FnLowerer<'a, 'f> {
    fn lower_function(
        symbols: &'a Symbols,
        module: &str,
        def: &ast::FunctionDef,
    ) -> Result<Function, LowerError> {
        let mut function = Function::new(&def.name, def.params.clone());
        let params = def
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), Local(i as u32)))
            .collect();
        {
            let mut lowerer = FnLowerer {
                symbols,
                builder: Builder::new(&mut function),
                scopes: vec![params],
            };
            lowerer.lower_body(&def.body)?;
            lowerer.finish()?;
        }
        debug!(
            "Lowered {}::{} into {} block(s)",
            module,
            def.name,
            function.blocks().len()
        );
        Ok(function)
    }

    fn lower_init(
        symbols: &'a Symbols,
        module_id: &str,
        module: &ast::Module,
    ) -> Result<Function, LowerError> {
        let mut function = Function::new(INIT_FUNCTION, vec![]);
        {
            let mut lowerer = FnLowerer {
                symbols,
                builder: Builder::new(&mut function),
                scopes: vec![HashMap::new()],
            };
            for global in &module.globals {
                let Some(init) = &global.init else { continue };
                lowerer.builder.set_location(global.location.clone());
                let value = lowerer.lower_expr(init)?;
                let gid = symbols.global(module_id, &global.name)?;
                lowerer.builder.store_global(gid, value)?;
            }
            lowerer.finish()?;
        }
        Ok(function)
    }

    /// Close the last block with `return null` if control can reach its end.
    fn finish(&mut self) -> Result<(), LowerError> {
        if !self.builder.is_terminated() {
            self.builder.set_location(SourceLocation::Builtin);
            self.builder.ret(Operand::null())?;
        }
        Ok(())
    }

    fn lookup_local(&self, name: &str) -> Result<Local, LowerError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .ok_or_else(|| LowerError::UnknownLocal {
                function: self.builder.function().name().to_owned(),
                name: name.to_owned(),
            })
    }

    fn lower_body(&mut self, body: &[ast::Stmt]) -> Result<(), LowerError> {
        for stmt in body {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_scoped(&mut self, body: &[ast::Stmt]) -> Result<(), LowerError> {
        self.scopes.push(HashMap::new());
        let result = self.lower_body(body);
        self.scopes.pop();
        result
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> Result<(), LowerError> {
        if self.builder.is_terminated() {
            // Code after a return; keep it in a block of its own.
            let dead = self.builder.create_block("unreachable");
            self.builder.switch_to(dead);
        }

        match stmt {
            ast::Stmt::VarDecl { name, init } => {
                let value = match init {
                    Some(expr) => self.lower_expr(expr)?,
                    None => Operand::null(),
                };
                let local = self.builder.temp();
                self.builder.copy(local, value)?;
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), local);
                }
            }
            ast::Stmt::Assign { var, value } => {
                let value = self.lower_expr(value)?;
                match var {
                    ast::Var::Local(name) => {
                        let local = self.lookup_local(name)?;
                        self.builder.copy(local, value)?;
                    }
                    ast::Var::Global { module, name } => {
                        let gid = self.symbols.global(module, name)?;
                        self.builder.store_global(gid, value)?;
                    }
                }
            }
            ast::Stmt::AssignIndex {
                array,
                index,
                value,
            } => {
                let array = self.lower_expr(array)?;
                let index = self.lower_expr(index)?;
                let value = self.lower_expr(value)?;
                self.builder.store_array(array, index, value)?;
            }
            ast::Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond = self.lower_expr(cond)?;
                let then_bb = self.builder.create_block("if.then");
                let else_bb = self.builder.create_block("if.else");
                let join_bb = self.builder.create_block("if.end");
                self.builder.branch(cond, then_bb, else_bb)?;

                for (bb, body) in [(then_bb, then_body), (else_bb, else_body)] {
                    self.builder.switch_to(bb);
                    self.lower_scoped(body)?;
                    if !self.builder.is_terminated() {
                        self.builder.jump(join_bb)?;
                    }
                }
                self.builder.switch_to(join_bb);
            }
            ast::Stmt::While { cond, body } => {
                let cond_bb = self.builder.create_block("while.cond");
                let body_bb = self.builder.create_block("while.body");
                let exit_bb = self.builder.create_block("while.end");
                self.builder.jump(cond_bb)?;

                self.builder.switch_to(cond_bb);
                let cond = self.lower_expr(cond)?;
                self.builder.branch(cond, body_bb, exit_bb)?;

                self.builder.switch_to(body_bb);
                self.lower_scoped(body)?;
                if !self.builder.is_terminated() {
                    self.builder.jump(cond_bb)?;
                }
                self.builder.switch_to(exit_bb);
            }
            ast::Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.lower_expr(expr)?,
                    None => Operand::null(),
                };
                self.builder.ret(value)?;
            }
            ast::Stmt::Expr(expr) => {
                self.lower_expr(expr)?;
            }
            ast::Stmt::Located { location, stmt } => {
                let previous = self.builder.set_location(location.clone());
                let result = self.lower_stmt(stmt);
                self.builder.set_location(previous);
                result?;
            }
        }
        Ok(())
    }

    fn lower_expr(&mut self, expr: &ast::Expr) -> Result<Operand, LowerError> {
        let operand = match expr {
            ast::Expr::Int(value) => Operand::from(*value),
            ast::Expr::Str(value) => Operand::from(value.as_str()),
            ast::Expr::Null => Operand::null(),
            ast::Expr::Var(ast::Var::Local(name)) => self.lookup_local(name)?.into(),
            ast::Expr::Var(ast::Var::Global { module, name }) => {
                let gid = self.symbols.global(module, name)?;
                self.builder.load_global(gid)?.into()
            }
            ast::Expr::Call { target, args } => {
                let callee = match target {
                    ast::Target::Function { module, name } => {
                        Callee::Function(self.symbols.function(module, name)?)
                    }
                    ast::Target::Builtin(name) => Callee::Builtin(name.clone()),
                };
                let args = args
                    .iter()
                    .map(|arg| self.lower_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.builder.call(callee, args)?.into()
            }
            ast::Expr::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                self.builder.binop(*op, lhs, rhs)?.into()
            }
            ast::Expr::ArrayLit(elems) => {
                let array = self.builder.new_array(elems.len() as i64)?;
                for (i, elem) in elems.iter().enumerate() {
                    let value = self.lower_expr(elem)?;
                    self.builder.store_array(array, i as i64, value)?;
                }
                array.into()
            }
            ast::Expr::NewArray(size) => {
                let size = self.lower_expr(size)?;
                self.builder.new_array(size)?.into()
            }
            ast::Expr::Index { array, index } => {
                let array = self.lower_expr(array)?;
                let index = self.lower_expr(index)?;
                self.builder.load_array(array, index)?.into()
            }
        };
        Ok(operand)
    }
}
