use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::StructuralError;
use crate::ir::function::Function;

/// Identity of a source module, such as `lib.math`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub String);

impl ModuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        ModuleId(value.to_owned())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a module in [`Program::modules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleIdx(pub u32);

impl ModuleIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slot of a global variable in the program-wide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(pub u32);

impl GlobalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Reference to a function: its module and its position in that module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef {
    pub module: ModuleIdx,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDecl {
    pub name: String,
    pub module: ModuleIdx,
}

/// The functions and globals one source module contributes.
#[derive(Debug, Clone)]
pub struct Module {
    id: ModuleId,
    functions: Vec<Function>,
    globals: Vec<GlobalId>,
    imports: Vec<ModuleIdx>,
    init: Option<u32>,
}

impl Module {
    fn new(id: ModuleId) -> Self {
        Self {
            id,
            functions: Vec::new(),
            globals: Vec::new(),
            imports: Vec::new(),
            init: None,
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn globals(&self) -> &[GlobalId] {
        &self.globals
    }

    pub fn imports(&self) -> &[ModuleIdx] {
        &self.imports
    }

    /// Index of the function holding the module's global initializers.
    pub fn init(&self) -> Option<u32> {
        self.init
    }
}

/// A lowered program: every reachable module exactly once, the global table
/// and the entry function.
#[derive(Debug, Clone)]
pub struct Program {
    modules: Vec<Module>,
    globals: Vec<GlobalDecl>,
    entry: FuncRef,
    init_order: Vec<ModuleIdx>,
}

impl Program {
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, idx: ModuleIdx) -> Option<&Module> {
        self.modules.get(idx.index())
    }

    pub fn module_by_id(&self, id: &str) -> Option<(ModuleIdx, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .find(|(_, m)| m.id.as_str() == id)
            .map(|(i, m)| (ModuleIdx(i as u32), m))
    }

    pub fn globals(&self) -> &[GlobalDecl] {
        &self.globals
    }

    pub fn global(&self, id: GlobalId) -> Option<&GlobalDecl> {
        self.globals.get(id.index())
    }

    pub fn global_id(&self, module: &str, name: &str) -> Option<GlobalId> {
        let (_, m) = self.module_by_id(module)?;
        m.globals
            .iter()
            .copied()
            .find(|g| self.globals[g.index()].name == name)
    }

    pub fn entry(&self) -> FuncRef {
        self.entry
    }

    pub fn entry_function(&self) -> Option<&Function> {
        self.function(self.entry)
    }

    pub fn function(&self, func: FuncRef) -> Option<&Function> {
        self.module(func.module)?.functions.get(func.index as usize)
    }

    pub fn function_ref(&self, module: &str, name: &str) -> Option<FuncRef> {
        let (idx, m) = self.module_by_id(module)?;
        m.functions
            .iter()
            .position(|f| f.name() == name)
            .map(|index| FuncRef {
                module: idx,
                index: index as u32,
            })
    }

    /// Modules ordered so that every module comes after the modules it
    /// imports. Module initializers run in this order.
    pub fn init_order(&self) -> &[ModuleIdx] {
        &self.init_order
    }

    /// `module::name` of a function, for messages and dumps.
    pub fn describe(&self, func: FuncRef) -> String {
        match (self.module(func.module), self.function(func)) {
            (Some(m), Some(f)) => format!("{}::{}", m.id, f.name()),
            _ => format!("<function {}.{}>", func.module.0, func.index),
        }
    }

    /// `module::name` of a global, for messages and dumps.
    pub fn describe_global(&self, global: GlobalId) -> String {
        match self.global(global) {
            Some(decl) => match self.module(decl.module) {
                Some(m) => format!("{}::{}", m.id, decl.name),
                None => decl.name.clone(),
            },
            None => global.to_string(),
        }
    }
}

/// Incremental construction of a [`Program`].
///
/// Adding a module or a global that already exists returns the existing
/// handle, so a module reached through several import paths is built once.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    modules: Vec<Module>,
    globals: Vec<GlobalDecl>,
    module_index: HashMap<ModuleId, ModuleIdx>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the module `id`, creating it on first use.
    pub fn add_module(&mut self, id: impl Into<ModuleId>) -> ModuleIdx {
        let id = id.into();
        if let Some(idx) = self.module_index.get(&id) {
            return *idx;
        }
        let idx = ModuleIdx(self.modules.len() as u32);
        debug!("Adding module {} as #{}", id, idx.0);
        self.module_index.insert(id.clone(), idx);
        self.modules.push(Module::new(id));
        idx
    }

    pub fn module_idx(&self, id: &str) -> Option<ModuleIdx> {
        self.module_index.get(&ModuleId::from(id)).copied()
    }

    fn module_mut(&mut self, idx: ModuleIdx) -> Result<&mut Module, StructuralError> {
        self.modules
            .get_mut(idx.index())
            .ok_or(StructuralError::UnknownModule { module: idx })
    }

    pub fn add_import(
        &mut self,
        module: ModuleIdx,
        imported: ModuleIdx,
    ) -> Result<(), StructuralError> {
        if imported.index() >= self.modules.len() {
            return Err(StructuralError::UnknownModule { module: imported });
        }
        let imports = &mut self.module_mut(module)?.imports;
        if !imports.contains(&imported) {
            imports.push(imported);
        }
        Ok(())
    }

    /// Slot of global `name` in `module`, allocating it on first use.
    pub fn add_global(&mut self, module: ModuleIdx, name: &str) -> Result<GlobalId, StructuralError> {
        self.module_mut(module)?;
        if let Some(existing) = self.global(module, name) {
            return Ok(existing);
        }
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(GlobalDecl {
            name: name.to_owned(),
            module,
        });
        self.module_mut(module)?.globals.push(id);
        Ok(id)
    }

    pub fn global(&self, module: ModuleIdx, name: &str) -> Option<GlobalId> {
        self.modules
            .get(module.index())?
            .globals
            .iter()
            .copied()
            .find(|g| self.globals[g.index()].name == name)
    }

    /// Add a function to `module`. Names are unique within a module.
    pub fn declare_function(
        &mut self,
        module: ModuleIdx,
        function: Function,
    ) -> Result<FuncRef, StructuralError> {
        let m = self.module_mut(module)?;
        if m.functions.iter().any(|f| f.name() == function.name()) {
            return Err(StructuralError::DuplicateFunction {
                module: m.id.to_string(),
                name: function.name().to_owned(),
            });
        }
        m.functions.push(function);
        Ok(FuncRef {
            module,
            index: (m.functions.len() - 1) as u32,
        })
    }

    pub fn function(&self, module: ModuleIdx, name: &str) -> Option<FuncRef> {
        self.modules
            .get(module.index())?
            .functions
            .iter()
            .position(|f| f.name() == name)
            .map(|index| FuncRef {
                module,
                index: index as u32,
            })
    }

    pub fn function_mut(&mut self, func: FuncRef) -> Option<&mut Function> {
        self.modules
            .get_mut(func.module.index())?
            .functions
            .get_mut(func.index as usize)
    }

    /// Mark `func` as the initializer of its module.
    pub fn set_init(&mut self, func: FuncRef) -> Result<(), StructuralError> {
        self.module_mut(func.module)?.init = Some(func.index);
        Ok(())
    }

    /// Verify every function and freeze the program.
    pub fn finish(self, entry: FuncRef) -> Result<Program, StructuralError> {
        let entry_exists = self
            .modules
            .get(entry.module.index())
            .is_some_and(|m| (entry.index as usize) < m.functions.len());
        if !entry_exists {
            return Err(StructuralError::MissingEntry {
                entry: format!("{}.{}", entry.module.0, entry.index),
            });
        }
        for function in self.modules.iter().flat_map(|m| &m.functions) {
            function.verify()?;
        }
        let init_order = dependency_order(&self.modules);
        Ok(Program {
            modules: self.modules,
            globals: self.globals,
            entry,
            init_order,
        })
    }
}

/// Post-order walk over the import graph. Cycles are cut at the first
/// revisit.
fn dependency_order(modules: &[Module]) -> Vec<ModuleIdx> {
    fn visit(idx: ModuleIdx, modules: &[Module], seen: &mut [bool], order: &mut Vec<ModuleIdx>) {
        if std::mem::replace(&mut seen[idx.index()], true) {
            return;
        }
        for import in &modules[idx.index()].imports {
            visit(*import, modules, seen, order);
        }
        order.push(idx);
    }

    let mut seen = vec![false; modules.len()];
    let mut order = Vec::with_capacity(modules.len());
    for i in 0..modules.len() {
        visit(ModuleIdx(i as u32), modules, &mut seen, &mut order);
    }
    order
}
