//! Symbol table and scope management for Quill.
//!
//! Scopes form a parent-linked chain; name lookup walks from the current
//! scope to the global one. A separate type registry maps type names to
//! semantic types, pre-populated with the built-in seed. Function scopes
//! carry the expected return type and whether a `return` was seen.

use std::collections::HashMap;

use crate::frontend::source::SourceLocation;
use crate::frontend::types::{
    bool_type, char_type, f32_type, f64_type, i16_type, i32_type, i64_type, i8_type, string_type,
    u16_type, u32_type, u64_type, u8_type, unknown_type, void_type, Ty, TyRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Type,
    Trait,
    Module,
    EnumVariant,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: TyRef,
    pub is_mutable: bool,
    pub is_public: bool,
    pub is_initialized: bool,
    pub location: SourceLocation,
    /// Generic parameter names, for functions.
    pub type_params: Vec<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: TyRef) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            is_mutable: false,
            is_public: false,
            is_initialized: false,
            location: SourceLocation::default(),
            type_params: Vec::new(),
        }
    }

    pub fn mutable(mut self, flag: bool) -> Self {
        self.is_mutable = flag;
        self
    }

    pub fn public(mut self, flag: bool) -> Self {
        self.is_public = flag;
        self
    }

    pub fn initialized(mut self) -> Self {
        self.is_initialized = true;
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_type_params(mut self, params: Vec<String>) -> Self {
        self.type_params = params;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Block,
    Loop,
    Struct,
    Class,
    Trait,
    Impl,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<usize>,
    symbols: HashMap<String, Symbol>,
    /// Expected return type, on function scopes.
    pub expected_return_type: Option<TyRef>,
    /// Whether a `return` statement was seen, on function scopes.
    pub saw_return: bool,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<usize>) -> Self {
        Self {
            kind,
            parent,
            symbols: HashMap::new(),
            expected_return_type: None,
            saw_return: false,
        }
    }
}

pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
    type_registry: HashMap<String, TyRef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            scopes: vec![Scope::new(ScopeKind::Global, None)],
            current: 0,
            type_registry: HashMap::new(),
        };
        table.seed_builtins();
        table
    }

    fn seed_builtins(&mut self) {
        self.register_type("void", void_type());
        self.register_type("bool", bool_type());
        self.register_type("i8", i8_type());
        self.register_type("i16", i16_type());
        self.register_type("i32", i32_type());
        self.register_type("i64", i64_type());
        self.register_type("u8", u8_type());
        self.register_type("u16", u16_type());
        self.register_type("u32", u32_type());
        self.register_type("u64", u64_type());
        self.register_type("f32", f32_type());
        self.register_type("f64", f64_type());
        self.register_type("char", char_type());
        self.register_type("str", string_type());

        // print(any) -> void
        let print_ty = std::rc::Rc::new(Ty::Function {
            params: vec![unknown_type()],
            ret: void_type(),
            is_async: false,
        });
        self.define(Symbol::new("print", SymbolKind::Function, print_ty).initialized());

        // len(any) -> i64
        let len_ty = std::rc::Rc::new(Ty::Function {
            params: vec![unknown_type()],
            ret: i64_type(),
            is_async: false,
        });
        self.define(Symbol::new("len", SymbolKind::Function, len_ty).initialized());

        // range(i64, i64) -> List[i64]  (list as a stand-in for an iterator)
        let range_ty = std::rc::Rc::new(Ty::Function {
            params: vec![i64_type(), i64_type()],
            ret: std::rc::Rc::new(Ty::List { element: i64_type() }),
            is_async: false,
        });
        self.define(Symbol::new("range", SymbolKind::Function, range_ty).initialized());

        // type(any) -> str
        let type_ty = std::rc::Rc::new(Ty::Function {
            params: vec![unknown_type()],
            ret: string_type(),
            is_async: false,
        });
        self.define(Symbol::new("type", SymbolKind::Function, type_ty).initialized());
    }

    // ========================================================================
    // Scope management
    // ========================================================================

    pub fn enter_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind, Some(self.current)));
        self.current = self.scopes.len() - 1;
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    pub fn current_scope_kind(&self) -> ScopeKind {
        self.scopes[self.current].kind
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    /// Define a symbol in the current scope. Returns `false` if the name is
    /// already bound in this scope (redefinition).
    pub fn define(&mut self, symbol: Symbol) -> bool {
        let scope = &mut self.scopes[self.current];
        if scope.symbols.contains_key(&symbol.name) {
            return false;
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        true
    }

    /// Look up a name through the scope chain.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut index = self.current;
        loop {
            if let Some(symbol) = self.scopes[index].symbols.get(name) {
                return Some(symbol);
            }
            index = self.scopes[index].parent?;
        }
    }

    /// Look up a name in the current scope only.
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes[self.current].symbols.get(name)
    }

    /// Mark the nearest binding of `name` as initialized.
    pub fn mark_initialized(&mut self, name: &str) {
        let mut index = self.current;
        loop {
            if let Some(symbol) = self.scopes[index].symbols.get_mut(name) {
                symbol.is_initialized = true;
                return;
            }
            match self.scopes[index].parent {
                Some(parent) => index = parent,
                None => return,
            }
        }
    }

    // ========================================================================
    // Type registry
    // ========================================================================

    pub fn register_type(&mut self, name: impl Into<String>, ty: TyRef) {
        self.type_registry.insert(name.into(), ty);
    }

    pub fn lookup_type(&self, name: &str) -> Option<TyRef> {
        self.type_registry.get(name).cloned()
    }

    // ========================================================================
    // Context queries
    // ========================================================================

    /// Whether the current position is inside a loop, by walking ancestor
    /// scopes.
    pub fn in_loop(&self) -> bool {
        let mut index = self.current;
        loop {
            if self.scopes[index].kind == ScopeKind::Loop {
                return true;
            }
            match self.scopes[index].parent {
                Some(parent) => index = parent,
                None => return false,
            }
        }
    }

    /// Whether the current position is inside a function.
    pub fn in_function(&self) -> bool {
        self.function_scope().is_some()
    }

    /// Expected return type of the enclosing function, if any.
    pub fn current_return_type(&self) -> Option<TyRef> {
        self.function_scope()
            .and_then(|index| self.scopes[index].expected_return_type.clone())
    }

    /// Set the expected return type on the current (function) scope.
    pub fn set_return_type(&mut self, ty: TyRef) {
        self.scopes[self.current].expected_return_type = Some(ty);
    }

    /// Record that the enclosing function saw a `return` statement.
    pub fn set_saw_return(&mut self) {
        if let Some(index) = self.function_scope() {
            self.scopes[index].saw_return = true;
        }
    }

    /// Whether the enclosing function saw a `return` statement.
    pub fn saw_return(&self) -> bool {
        self.function_scope()
            .map(|index| self.scopes[index].saw_return)
            .unwrap_or(false)
    }

    fn function_scope(&self) -> Option<usize> {
        let mut index = self.current;
        loop {
            if self.scopes[index].kind == ScopeKind::Function {
                return Some(index);
            }
            index = self.scopes[index].parent?;
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_seeded() {
        let table = SymbolTable::new();
        assert!(table.lookup("print").is_some());
        assert!(table.lookup("len").is_some());
        assert!(table.lookup("range").is_some());
        assert!(table.lookup("type").is_some());
        assert!(table.lookup_type("i64").is_some());
        assert!(table.lookup_type("str").is_some());
        assert!(table.lookup_type("NoSuchType").is_none());
    }

    #[test]
    fn scope_chain_lookup() {
        let mut table = SymbolTable::new();
        assert!(table.define(Symbol::new("x", SymbolKind::Variable, i64_type())));

        table.enter_scope(ScopeKind::Function);
        assert!(table.lookup("x").is_some());

        assert!(table.define(Symbol::new("y", SymbolKind::Variable, i64_type())));
        assert!(table.lookup("y").is_some());
        assert!(table.lookup_local("x").is_none());

        table.exit_scope();
        assert!(table.lookup("x").is_some());
        assert!(table.lookup("y").is_none());
    }

    #[test]
    fn redefinition_in_same_scope_fails() {
        let mut table = SymbolTable::new();
        assert!(table.define(Symbol::new("x", SymbolKind::Variable, i64_type())));
        assert!(!table.define(Symbol::new("x", SymbolKind::Variable, bool_type())));

        // Shadowing in a child scope is fine.
        table.enter_scope(ScopeKind::Block);
        assert!(table.define(Symbol::new("x", SymbolKind::Variable, bool_type())));
    }

    #[test]
    fn loop_and_function_queries() {
        let mut table = SymbolTable::new();
        assert!(!table.in_loop());
        assert!(!table.in_function());

        table.enter_scope(ScopeKind::Function);
        table.set_return_type(i64_type());
        assert!(table.in_function());
        assert!(!table.in_loop());

        table.enter_scope(ScopeKind::Loop);
        table.enter_scope(ScopeKind::Block);
        assert!(table.in_loop());
        assert!(table.in_function());
        assert!(table.current_return_type().is_some());

        assert!(!table.saw_return());
        table.set_saw_return();
        assert!(table.saw_return());

        table.exit_scope();
        table.exit_scope();
        table.exit_scope();
        assert!(!table.in_loop());
    }

    #[test]
    fn mark_initialized_reaches_outer_scopes() {
        let mut table = SymbolTable::new();
        table.define(Symbol::new("x", SymbolKind::Variable, i64_type()).mutable(true));
        table.enter_scope(ScopeKind::Block);
        table.mark_initialized("x");
        table.exit_scope();
        assert!(table.lookup("x").map(|s| s.is_initialized).unwrap_or(false));
    }
}
