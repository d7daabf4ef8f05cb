//! First pass: register named type shells.
//!
//! Each `struct`/`class`/`enum`/`trait` gets an empty record in the type
//! registry. Bodies are filled in the second pass; a lookup during pass 2
//! always finds at least a shell, which is legal for naming purposes.

use std::cell::RefCell;
use std::rc::Rc;

use crate::frontend::ast::{Decl, Spanned};
use crate::frontend::types::{ClassTy, EnumTy, StructTy, TraitTy, Ty};

use super::TypeChecker;

impl TypeChecker {
    pub(crate) fn collect_declaration(&mut self, decl: &Spanned<Decl>) {
        match &decl.node {
            Decl::Struct(s) => {
                let shell = Rc::new(Ty::Struct(RefCell::new(StructTy {
                    name: s.name.clone(),
                    fields: Vec::new(),
                    type_params: Vec::new(),
                })));
                self.symbols.register_type(s.name.as_str(), shell);
            }
            Decl::Class(c) => {
                let shell = Rc::new(Ty::Class(RefCell::new(ClassTy {
                    name: c.name.clone(),
                    fields: Vec::new(),
                    base_class: None,
                    type_params: Vec::new(),
                })));
                self.symbols.register_type(c.name.as_str(), shell);
            }
            Decl::Enum(e) => {
                let shell = Rc::new(Ty::Enum(RefCell::new(EnumTy {
                    name: e.name.clone(),
                    variants: Vec::new(),
                    type_params: Vec::new(),
                })));
                self.symbols.register_type(e.name.as_str(), shell);
            }
            Decl::Trait(t) => {
                let shell = Rc::new(Ty::Trait(RefCell::new(TraitTy {
                    name: t.name.clone(),
                    methods: Vec::new(),
                    type_params: Vec::new(),
                })));
                self.symbols.register_type(t.name.as_str(), shell);
            }
            _ => {}
        }
    }
}
