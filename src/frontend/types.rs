//! Semantic types for Quill analysis.
//!
//! Distinct from the syntactic type references in [`crate::frontend::ast`]:
//! these are the types the checker computes and compares. Primitives are
//! canonical singletons, so two references to the same primitive are equal by
//! identity; user-defined types are records behind shared-ownership handles
//! whose bodies are filled in after registration, which is what lets peer
//! types forward-reference each other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type TyRef = Rc<Ty>;

#[derive(Debug)]
pub enum Ty {
    // Primitives
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    Str,
    /// The type of expressions that never produce a value.
    Never,
    /// Unresolved or erroneous; checks against it are suppressed.
    Unknown,

    // Composites
    Array { element: TyRef, size: Option<usize> },
    List { element: TyRef },
    Dict { key: TyRef, value: TyRef },
    Tuple { elements: Vec<TyRef> },
    Function { params: Vec<TyRef>, ret: TyRef, is_async: bool },
    Reference { inner: TyRef, is_mutable: bool },
    Optional { inner: TyRef },
    Result { ok: TyRef, err: TyRef },

    // User-defined, filled in by the second analysis pass
    Struct(RefCell<StructTy>),
    Class(RefCell<ClassTy>),
    Enum(RefCell<EnumTy>),
    Trait(RefCell<TraitTy>),

    /// Unresolved generic parameter, named in its declaration.
    Generic { name: String, constraints: Vec<String> },
    /// Anonymous placeholder to be resolved by unification.
    Infer(RefCell<InferVar>),
}

#[derive(Debug, Clone)]
pub struct FieldTy {
    pub name: String,
    pub ty: TyRef,
    pub is_public: bool,
}

#[derive(Debug)]
pub struct StructTy {
    pub name: String,
    pub fields: Vec<FieldTy>,
    pub type_params: Vec<String>,
}

#[derive(Debug)]
pub struct ClassTy {
    pub name: String,
    pub fields: Vec<FieldTy>,
    pub base_class: Option<String>,
    pub type_params: Vec<String>,
}

#[derive(Debug)]
pub struct VariantTy {
    pub name: String,
    pub fields: Vec<TyRef>,
}

#[derive(Debug)]
pub struct EnumTy {
    pub name: String,
    pub variants: Vec<VariantTy>,
    pub type_params: Vec<String>,
}

#[derive(Debug)]
pub struct TraitTy {
    pub name: String,
    /// Method name and signature pairs.
    pub methods: Vec<(String, TyRef)>,
    pub type_params: Vec<String>,
}

#[derive(Debug)]
pub struct InferVar {
    pub id: usize,
    pub resolved: Option<TyRef>,
}

// ============================================================================
// Canonical primitive singletons
// ============================================================================

macro_rules! primitive_singleton {
    ($name:ident, $variant:ident) => {
        pub fn $name() -> TyRef {
            thread_local! {
                static SINGLETON: TyRef = Rc::new(Ty::$variant);
            }
            SINGLETON.with(|ty| Rc::clone(ty))
        }
    };
}

primitive_singleton!(void_type, Void);
primitive_singleton!(bool_type, Bool);
primitive_singleton!(i8_type, I8);
primitive_singleton!(i16_type, I16);
primitive_singleton!(i32_type, I32);
primitive_singleton!(i64_type, I64);
primitive_singleton!(u8_type, U8);
primitive_singleton!(u16_type, U16);
primitive_singleton!(u32_type, U32);
primitive_singleton!(u64_type, U64);
primitive_singleton!(f32_type, F32);
primitive_singleton!(f64_type, F64);
primitive_singleton!(char_type, Char);
primitive_singleton!(string_type, Str);
primitive_singleton!(never_type, Never);
primitive_singleton!(unknown_type, Unknown);

impl Ty {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Ty::I8 | Ty::I16 | Ty::I32 | Ty::I64 | Ty::U8 | Ty::U16 | Ty::U32 | Ty::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Ty::F32 | Ty::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Void)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    /// Name of a user-defined type, if this is one.
    pub fn user_name(&self) -> Option<String> {
        match self {
            Ty::Struct(s) => Some(s.borrow().name.clone()),
            Ty::Class(c) => Some(c.borrow().name.clone()),
            Ty::Enum(e) => Some(e.borrow().name.clone()),
            Ty::Trait(t) => Some(t.borrow().name.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// Type utilities
// ============================================================================

/// Structural/nominal equality. Primitives compare by kind, composites
/// recursively, user-defined types by name, inference variables by identity.
pub fn type_equals(a: &TyRef, b: &TyRef) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    match (a.as_ref(), b.as_ref()) {
        (Ty::Void, Ty::Void)
        | (Ty::Bool, Ty::Bool)
        | (Ty::I8, Ty::I8)
        | (Ty::I16, Ty::I16)
        | (Ty::I32, Ty::I32)
        | (Ty::I64, Ty::I64)
        | (Ty::U8, Ty::U8)
        | (Ty::U16, Ty::U16)
        | (Ty::U32, Ty::U32)
        | (Ty::U64, Ty::U64)
        | (Ty::F32, Ty::F32)
        | (Ty::F64, Ty::F64)
        | (Ty::Char, Ty::Char)
        | (Ty::Str, Ty::Str)
        | (Ty::Never, Ty::Never)
        | (Ty::Unknown, Ty::Unknown) => true,

        (
            Ty::Array { element: e1, size: s1 },
            Ty::Array { element: e2, size: s2 },
        ) => s1 == s2 && type_equals(e1, e2),
        (Ty::List { element: e1 }, Ty::List { element: e2 }) => type_equals(e1, e2),
        (
            Ty::Dict { key: k1, value: v1 },
            Ty::Dict { key: k2, value: v2 },
        ) => type_equals(k1, k2) && type_equals(v1, v2),
        (Ty::Tuple { elements: e1 }, Ty::Tuple { elements: e2 }) => {
            e1.len() == e2.len() && e1.iter().zip(e2).all(|(x, y)| type_equals(x, y))
        }
        (
            Ty::Function { params: p1, ret: r1, is_async: a1 },
            Ty::Function { params: p2, ret: r2, is_async: a2 },
        ) => {
            a1 == a2
                && p1.len() == p2.len()
                && p1.iter().zip(p2).all(|(x, y)| type_equals(x, y))
                && type_equals(r1, r2)
        }
        (
            Ty::Reference { inner: i1, is_mutable: m1 },
            Ty::Reference { inner: i2, is_mutable: m2 },
        ) => m1 == m2 && type_equals(i1, i2),
        (Ty::Optional { inner: i1 }, Ty::Optional { inner: i2 }) => type_equals(i1, i2),
        (Ty::Result { ok: o1, err: e1 }, Ty::Result { ok: o2, err: e2 }) => {
            type_equals(o1, o2) && type_equals(e1, e2)
        }

        (Ty::Struct(s1), Ty::Struct(s2)) => s1.borrow().name == s2.borrow().name,
        (Ty::Class(c1), Ty::Class(c2)) => c1.borrow().name == c2.borrow().name,
        (Ty::Enum(e1), Ty::Enum(e2)) => e1.borrow().name == e2.borrow().name,
        (Ty::Trait(t1), Ty::Trait(t2)) => t1.borrow().name == t2.borrow().name,

        (Ty::Generic { name: n1, .. }, Ty::Generic { name: n2, .. }) => n1 == n2,
        (Ty::Infer(v1), Ty::Infer(v2)) => v1.borrow().id == v2.borrow().id,

        _ => false,
    }
}

/// Directed compatibility: can a value of `from` be used where `to` is
/// required? Used for arguments, initializers, and return values.
pub fn is_assignable(from: &TyRef, to: &TyRef) -> bool {
    if type_equals(from, to) {
        return true;
    }

    // `never` flows into anything; unresolved types suppress further checks.
    match from.as_ref() {
        Ty::Never | Ty::Unknown | Ty::Generic { .. } | Ty::Infer(_) => return true,
        _ => {}
    }
    if matches!(to.as_ref(), Ty::Unknown | Ty::Generic { .. } | Ty::Infer(_)) {
        return true;
    }

    // Numeric widening.
    if from.is_integer() && to.is_integer() {
        return true;
    }
    if from.is_integer() && to.is_float() {
        return true;
    }

    // `T` may be used where `T?` is expected.
    if let Ty::Optional { inner } = to.as_ref() {
        return is_assignable(from, inner);
    }

    // `T` may be used where `&T` is expected; `&mut T` requires exact match.
    if let Ty::Reference { inner, is_mutable } = to.as_ref() {
        if *is_mutable {
            return type_equals(from, inner);
        }
        return is_assignable(from, inner);
    }

    false
}

/// Minimum common supertype of two types under numeric widening, used for
/// binary-operator result typing and literal aggregation.
pub fn common_type(a: &TyRef, b: &TyRef) -> TyRef {
    if type_equals(a, b) {
        return a.clone();
    }

    if a.is_float() || b.is_float() {
        if matches!(a.as_ref(), Ty::F64) || matches!(b.as_ref(), Ty::F64) {
            return f64_type();
        }
        return f32_type();
    }

    if a.is_integer() && b.is_integer() {
        return i64_type();
    }

    unknown_type()
}

/// Rewrite `ty`, replacing named generic parameters with the mapped types.
/// Descends into composites; user-defined types are shared as-is.
pub fn substitute(ty: &TyRef, substitutions: &HashMap<String, TyRef>) -> TyRef {
    match ty.as_ref() {
        Ty::Generic { name, .. } => substitutions.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Ty::Array { element, size } => Rc::new(Ty::Array {
            element: substitute(element, substitutions),
            size: *size,
        }),
        Ty::List { element } => Rc::new(Ty::List { element: substitute(element, substitutions) }),
        Ty::Dict { key, value } => Rc::new(Ty::Dict {
            key: substitute(key, substitutions),
            value: substitute(value, substitutions),
        }),
        Ty::Tuple { elements } => Rc::new(Ty::Tuple {
            elements: elements.iter().map(|e| substitute(e, substitutions)).collect(),
        }),
        Ty::Function { params, ret, is_async } => Rc::new(Ty::Function {
            params: params.iter().map(|p| substitute(p, substitutions)).collect(),
            ret: substitute(ret, substitutions),
            is_async: *is_async,
        }),
        Ty::Reference { inner, is_mutable } => Rc::new(Ty::Reference {
            inner: substitute(inner, substitutions),
            is_mutable: *is_mutable,
        }),
        Ty::Optional { inner } => Rc::new(Ty::Optional { inner: substitute(inner, substitutions) }),
        Ty::Result { ok, err } => Rc::new(Ty::Result {
            ok: substitute(ok, substitutions),
            err: substitute(err, substitutions),
        }),
        _ => ty.clone(),
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => write!(f, "void"),
            Ty::Bool => write!(f, "bool"),
            Ty::I8 => write!(f, "i8"),
            Ty::I16 => write!(f, "i16"),
            Ty::I32 => write!(f, "i32"),
            Ty::I64 => write!(f, "i64"),
            Ty::U8 => write!(f, "u8"),
            Ty::U16 => write!(f, "u16"),
            Ty::U32 => write!(f, "u32"),
            Ty::U64 => write!(f, "u64"),
            Ty::F32 => write!(f, "f32"),
            Ty::F64 => write!(f, "f64"),
            Ty::Char => write!(f, "char"),
            Ty::Str => write!(f, "str"),
            Ty::Never => write!(f, "never"),
            Ty::Unknown => write!(f, "?"),
            Ty::Array { element, size: Some(n) } => write!(f, "[{}; {}]", element, n),
            Ty::Array { element, size: None } => write!(f, "[{}]", element),
            Ty::List { element } => write!(f, "List[{}]", element),
            Ty::Dict { key, value } => write!(f, "Dict[{}, {}]", key, value),
            Ty::Tuple { elements } => {
                write!(f, "(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Ty::Function { params, ret, is_async } => {
                if *is_async {
                    write!(f, "async ")?;
                }
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Ty::Reference { inner, is_mutable: true } => write!(f, "&mut {}", inner),
            Ty::Reference { inner, is_mutable: false } => write!(f, "&{}", inner),
            Ty::Optional { inner } => write!(f, "{}?", inner),
            Ty::Result { ok, err } => write!(f, "Result[{}, {}]", ok, err),
            Ty::Struct(s) => write!(f, "{}", s.borrow().name),
            Ty::Class(c) => write!(f, "{}", c.borrow().name),
            Ty::Enum(e) => write!(f, "{}", e.borrow().name),
            Ty::Trait(t) => write!(f, "{}", t.borrow().name),
            Ty::Generic { name, .. } => write!(f, "{}", name),
            Ty::Infer(v) => {
                let var = v.borrow();
                match &var.resolved {
                    Some(ty) => write!(f, "{}", ty),
                    None => write!(f, "t{}", var.id),
                }
            }
        }
    }
}
