//! Type checker for the Quill programming language.
//!
//! Runs two passes over the AST and populates a [`SymbolTable`] with
//! resolved type information:
//!
//! 1. **Register**: every `struct`/`class`/`enum`/`trait` gets an empty named
//!    shell in the type registry, so bodies may reference peer types by
//!    forward reference.
//! 2. **Check**: declarations are validated in source order; statements and
//!    expressions are inferred bottom-up.
//!
//! Errors are accumulated, never fatal: unresolved types become `?` and
//! subsequent checks against them are suppressed to avoid cascades.

mod check_decl;
mod check_expr;
mod check_stmt;
mod collect;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::rc::Rc;

use crate::frontend::ast::{self, Program, Spanned};
use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::source::SourceLocation;
use crate::frontend::symbols::{SymbolKind, SymbolTable};
use crate::frontend::types::{i64_type, unknown_type, InferVar, Ty, TyRef};

pub struct TypeChecker {
    pub(crate) symbols: SymbolTable,
    pub(crate) errors: Vec<Diagnostic>,
    /// Generic parameter names currently in scope for type resolution.
    pub(crate) generic_context: Vec<String>,
    /// The enclosing user type while checking methods; resolves `self`/`Self`.
    pub(crate) current_self_type: Option<TyRef>,
    /// Recorded `impl Trait for Type` relationships.
    pub(crate) trait_impls: Vec<(String, String)>,
    next_infer_id: usize,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            errors: Vec::new(),
            generic_context: Vec::new(),
            current_self_type: None,
            trait_impls: Vec::new(),
            next_infer_id: 0,
        }
    }

    /// Check an entire program, populating the symbol table.
    #[tracing::instrument(skip_all, fields(file = %program.filename, decls = program.declarations.len()))]
    pub fn check(&mut self, program: &Program) {
        for decl in &program.declarations {
            self.collect_declaration(decl);
        }
        for decl in &program.declarations {
            self.check_declaration(decl);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Read-only view of the populated symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// `impl Trait for Type` pairs recorded during checking.
    pub fn trait_impls(&self) -> &[(String, String)] {
        &self.trait_impls
    }

    pub(crate) fn error(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.errors.push(Diagnostic::new(message, location));
    }

    pub(crate) fn fresh_infer(&mut self) -> TyRef {
        let id = self.next_infer_id;
        self.next_infer_id += 1;
        Rc::new(Ty::Infer(RefCell::new(InferVar { id, resolved: None })))
    }

    /// Element type produced by iterating a value: lists and arrays yield
    /// their element type, anything else (ranges included) yields `i64`.
    pub(crate) fn iterable_element_type(&self, iterable: &TyRef) -> TyRef {
        match iterable.as_ref() {
            Ty::List { element } => element.clone(),
            Ty::Array { element, .. } => element.clone(),
            _ => i64_type(),
        }
    }

    // ========================================================================
    // Type resolution: syntactic references to semantic types
    // ========================================================================

    pub(crate) fn resolve_type(&self, ty: &Spanned<ast::TypeRef>) -> TyRef {
        self.resolve_type_node(&ty.node)
    }

    fn resolve_type_node(&self, ty: &ast::TypeRef) -> TyRef {
        match ty {
            ast::TypeRef::Simple(name) => self.resolve_simple_type(name),
            ast::TypeRef::Generic(name, args) => {
                let args: Vec<TyRef> = args.iter().map(|a| self.resolve_type(a)).collect();
                self.resolve_generic_type(name, args)
            }
            ast::TypeRef::Array { element, size } => Rc::new(Ty::Array {
                element: self.resolve_type(element),
                size: *size,
            }),
            ast::TypeRef::Tuple(elements) => Rc::new(Ty::Tuple {
                elements: elements.iter().map(|e| self.resolve_type(e)).collect(),
            }),
            ast::TypeRef::Function { params, ret } => Rc::new(Ty::Function {
                params: params.iter().map(|p| self.resolve_type(p)).collect(),
                ret: self.resolve_type(ret),
                is_async: false,
            }),
            ast::TypeRef::Reference { inner, is_mutable } => Rc::new(Ty::Reference {
                inner: self.resolve_type(inner),
                is_mutable: *is_mutable,
            }),
        }
    }

    fn resolve_simple_type(&self, name: &str) -> TyRef {
        if name == "Self" {
            return self.current_self_type.clone().unwrap_or_else(unknown_type);
        }
        if self.generic_context.iter().any(|p| p == name) {
            return Rc::new(Ty::Generic { name: name.to_string(), constraints: Vec::new() });
        }
        if let Some(ty) = self.symbols.lookup_type(name) {
            return ty;
        }
        // A type bound as a scope symbol still counts for naming purposes.
        if let Some(symbol) = self.symbols.lookup(name) {
            if matches!(symbol.kind, SymbolKind::Type | SymbolKind::Trait) {
                return symbol.ty.clone();
            }
        }
        unknown_type()
    }

    /// Built-in generic applications construct the corresponding composite
    /// directly; anything else falls back to the registry.
    fn resolve_generic_type(&self, name: &str, args: Vec<TyRef>) -> TyRef {
        match (name, args.len()) {
            ("List", 1) => Rc::new(Ty::List { element: args[0].clone() }),
            ("Dict", 2) => Rc::new(Ty::Dict { key: args[0].clone(), value: args[1].clone() }),
            ("Optional", 1) => Rc::new(Ty::Optional { inner: args[0].clone() }),
            ("Result", 2) => Rc::new(Ty::Result { ok: args[0].clone(), err: args[1].clone() }),
            _ => self.symbols.lookup_type(name).unwrap_or_else(unknown_type),
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience entry point: check a program and return its diagnostics.
pub fn check(program: &Program) -> Result<(), Vec<Diagnostic>> {
    let mut checker = TypeChecker::new();
    checker.check(program);
    if checker.has_errors() {
        Err(checker.errors().to_vec())
    } else {
        Ok(())
    }
}
