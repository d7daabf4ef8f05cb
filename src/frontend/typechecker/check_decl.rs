//! Second pass: check declarations and fill the registered type shells.

use std::rc::Rc;

use crate::frontend::ast::*;
use crate::frontend::source::Span;
use crate::frontend::symbols::{ScopeKind, Symbol, SymbolKind};
use crate::frontend::types::{is_assignable, void_type, FieldTy, Ty, TyRef, VariantTy};

use super::TypeChecker;

impl TypeChecker {
    pub(crate) fn check_declaration(&mut self, decl: &Spanned<Decl>) {
        match &decl.node {
            Decl::Function(func) => {
                self.check_function(func, decl.span);
            }
            Decl::Struct(s) => self.check_struct(s, decl.span),
            Decl::Class(c) => self.check_class(c, decl.span),
            Decl::Trait(t) => self.check_trait(t),
            Decl::Impl(i) => self.check_impl(i, decl.span),
            Decl::Enum(e) => self.check_enum(e),
            Decl::TypeAlias(alias) => self.check_type_alias(alias),
            Decl::Import(_) => {
                // Recorded in the AST; cross-file resolution is not part of
                // the front-end core.
            }
        }
    }

    /// Check a function or method. The signature is resolved and bound before
    /// the body is checked, so recursion works; returns the function type so
    /// trait declarations can collect signatures.
    pub(crate) fn check_function(&mut self, func: &FnDecl, span: Span) -> TyRef {
        let saved_generics = self.generic_context.len();
        self.generic_context.extend(func.type_params.iter().cloned());

        let param_types: Vec<TyRef> =
            func.params.iter().map(|p| self.resolve_type(&p.ty)).collect();
        let return_type = func
            .return_type
            .as_ref()
            .map(|t| self.resolve_type(t))
            .unwrap_or_else(void_type);

        let fn_type: TyRef = Rc::new(Ty::Function {
            params: param_types.clone(),
            ret: return_type.clone(),
            is_async: func.is_async,
        });

        let symbol = Symbol::new(func.name.as_str(), SymbolKind::Function, fn_type.clone())
            .public(func.is_public)
            .initialized()
            .at(span.start)
            .with_type_params(func.type_params.clone());
        if !self.symbols.define(symbol) {
            self.error(format!("Redefinition of '{}'", func.name), span.start);
        }

        self.symbols.enter_scope(ScopeKind::Function);
        self.symbols.set_return_type(return_type.clone());

        // Generic parameters stay nameable inside the body.
        for param in &func.type_params {
            let placeholder: TyRef =
                Rc::new(Ty::Generic { name: param.clone(), constraints: Vec::new() });
            self.symbols.define(Symbol::new(param.as_str(), SymbolKind::Type, placeholder));
        }

        // Methods of a user type see the enclosing value as `self`.
        if let Some(self_ty) = self.current_self_type.clone() {
            self.symbols
                .define(Symbol::new("self", SymbolKind::Parameter, self_ty).initialized());
        }

        for (param, ty) in func.params.iter().zip(&param_types) {
            let param_symbol = Symbol::new(param.name.as_str(), SymbolKind::Parameter, ty.clone())
                .mutable(param.is_mutable)
                .initialized()
                .at(param.ty.span.start);
            if !self.symbols.define(param_symbol) {
                self.error(format!("Redefinition of '{}'", param.name), param.ty.span.start);
            }
            if let Some(default) = &param.default {
                let default_ty = self.check_expr(default);
                if !is_assignable(&default_ty, ty) {
                    self.error(
                        format!("Type mismatch: expected {}, got {}", ty, default_ty),
                        default.span.start,
                    );
                }
            }
        }

        if let Some(body) = &func.body {
            self.check_block(body);
            if !return_type.is_void() && !return_type.is_unknown() && !self.symbols.saw_return() {
                self.error(format!("Function '{}' must return a value", func.name), span.start);
            }
        }

        self.symbols.exit_scope();
        self.generic_context.truncate(saved_generics);
        fn_type
    }

    fn check_struct(&mut self, decl: &StructDecl, _span: Span) {
        let Some(ty) = self.symbols.lookup_type(&decl.name) else {
            return;
        };

        let saved_generics = self.generic_context.len();
        self.generic_context.extend(decl.type_params.iter().cloned());
        self.symbols.enter_scope(ScopeKind::Struct);

        // Fields are resolved in order, then installed into the shell in one
        // step so no borrow is held while defaults are checked.
        let mut fields = Vec::new();
        for field in &decl.fields {
            let field_ty = self.resolve_type(&field.node.ty);
            if let Some(default) = &field.node.default {
                let default_ty = self.check_expr(default);
                if !is_assignable(&default_ty, &field_ty) {
                    self.error(
                        format!("Type mismatch: expected {}, got {}", field_ty, default_ty),
                        default.span.start,
                    );
                }
            }
            fields.push(FieldTy {
                name: field.node.name.clone(),
                ty: field_ty,
                is_public: field.node.is_public,
            });
        }

        if let Ty::Struct(cell) = ty.as_ref() {
            let mut shell = cell.borrow_mut();
            shell.type_params = decl.type_params.clone();
            shell.fields = fields;
        }

        let saved_self = std::mem::replace(&mut self.current_self_type, Some(ty.clone()));
        for method in &decl.methods {
            self.check_function(&method.node, method.span);
        }
        self.current_self_type = saved_self;

        self.symbols.exit_scope();
        self.generic_context.truncate(saved_generics);
    }

    fn check_class(&mut self, decl: &ClassDecl, span: Span) {
        let Some(ty) = self.symbols.lookup_type(&decl.name) else {
            return;
        };

        if let Some(base) = &decl.base_class {
            if self.symbols.lookup_type(base).is_none() {
                self.error(format!("Undefined symbol '{}'", base), span.start);
            }
        }

        let saved_generics = self.generic_context.len();
        self.generic_context.extend(decl.type_params.iter().cloned());
        self.symbols.enter_scope(ScopeKind::Class);

        let mut fields = Vec::new();
        for field in &decl.fields {
            let field_ty = self.resolve_type(&field.node.ty);
            if let Some(default) = &field.node.default {
                let default_ty = self.check_expr(default);
                if !is_assignable(&default_ty, &field_ty) {
                    self.error(
                        format!("Type mismatch: expected {}, got {}", field_ty, default_ty),
                        default.span.start,
                    );
                }
            }
            fields.push(FieldTy {
                name: field.node.name.clone(),
                ty: field_ty,
                is_public: field.node.is_public,
            });
        }

        if let Ty::Class(cell) = ty.as_ref() {
            let mut shell = cell.borrow_mut();
            shell.type_params = decl.type_params.clone();
            shell.base_class = decl.base_class.clone();
            shell.fields = fields;
        }

        let saved_self = std::mem::replace(&mut self.current_self_type, Some(ty.clone()));
        for method in &decl.methods {
            self.check_function(&method.node, method.span);
        }
        self.current_self_type = saved_self;

        self.symbols.exit_scope();
        self.generic_context.truncate(saved_generics);
    }

    fn check_trait(&mut self, decl: &TraitDecl) {
        let Some(ty) = self.symbols.lookup_type(&decl.name) else {
            return;
        };

        let saved_generics = self.generic_context.len();
        self.generic_context.extend(decl.type_params.iter().cloned());
        self.symbols.enter_scope(ScopeKind::Trait);

        let mut signatures = Vec::new();
        for method in &decl.methods {
            let method_ty = self.check_function(&method.node, method.span);
            signatures.push((method.node.name.clone(), method_ty));
        }

        if let Ty::Trait(cell) = ty.as_ref() {
            let mut shell = cell.borrow_mut();
            shell.type_params = decl.type_params.clone();
            shell.methods = signatures;
        }

        self.symbols.exit_scope();
        self.generic_context.truncate(saved_generics);
    }

    fn check_impl(&mut self, decl: &ImplDecl, span: Span) {
        let self_ty = self.symbols.lookup_type(&decl.type_name);
        if self_ty.is_none() {
            self.error(format!("Undefined symbol '{}'", decl.type_name), span.start);
        }

        if let Some(trait_name) = &decl.trait_name {
            if self.symbols.lookup_type(trait_name).is_none() {
                self.error(format!("Undefined symbol '{}'", trait_name), span.start);
            }
            // The implementation relationship is recorded; no further
            // semantic check beyond method checking.
            self.trait_impls.push((trait_name.clone(), decl.type_name.clone()));
        }

        self.symbols.enter_scope(ScopeKind::Impl);
        let saved_self = std::mem::replace(&mut self.current_self_type, self_ty);
        for method in &decl.methods {
            self.check_function(&method.node, method.span);
        }
        self.current_self_type = saved_self;
        self.symbols.exit_scope();
    }

    fn check_enum(&mut self, decl: &EnumDecl) {
        let Some(ty) = self.symbols.lookup_type(&decl.name) else {
            return;
        };

        let saved_generics = self.generic_context.len();
        self.generic_context.extend(decl.type_params.iter().cloned());

        let mut variants = Vec::new();
        for variant in &decl.variants {
            let fields: Vec<TyRef> =
                variant.node.fields.iter().map(|f| self.resolve_type(f)).collect();

            // Each variant gets a constructor: `Enum::Variant : fn(fields) -> Enum`.
            let ctor_type: TyRef = Rc::new(Ty::Function {
                params: fields.clone(),
                ret: ty.clone(),
                is_async: false,
            });
            let ctor_name = format!("{}::{}", decl.name, variant.node.name);
            let ctor = Symbol::new(ctor_name.as_str(), SymbolKind::EnumVariant, ctor_type)
                .initialized()
                .at(variant.span.start);
            if !self.symbols.define(ctor) {
                self.error(format!("Redefinition of '{}'", ctor_name), variant.span.start);
            }

            variants.push(VariantTy { name: variant.node.name.clone(), fields });
        }

        if let Ty::Enum(cell) = ty.as_ref() {
            let mut shell = cell.borrow_mut();
            shell.type_params = decl.type_params.clone();
            shell.variants = variants;
        }

        self.generic_context.truncate(saved_generics);
    }

    fn check_type_alias(&mut self, decl: &TypeAliasDecl) {
        let aliased = self.resolve_type(&decl.aliased);
        self.symbols.register_type(decl.name.as_str(), aliased);
    }
}
