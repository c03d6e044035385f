////////////////////////////////////////////////////////////////////////////////
// This file is part of "Per Aspera", a dynamic invocation engine for         //
// embeddable scripting languages.                                            //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/per-aspera/blob/master/EULA.md             //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2025 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::OnceCell;

use crate::{
    report::{debug_unreachable, system_panic},
    runtime::{
        thunk::{HostFn, Thunk},
        Engine,
        FnDecl,
        FnKind,
        Ident,
        Signature,
        TypeDecl,
        TypeKey,
        TypeMeta,
    },
};

// One host callable indexed by the catalog: the immutable signature
// descriptor, the underlying implementation, and the lazily compiled thunk.
pub(crate) struct Callable {
    signature: Arc<Signature>,
    host: HostFn,
    thunk: OnceCell<Arc<Thunk>>,
}

impl Callable {
    #[inline(always)]
    fn new(signature: Signature, host: HostFn) -> Self {
        Self {
            signature: Arc::new(signature),
            host,
            thunk: OnceCell::new(),
        }
    }

    #[inline(always)]
    pub(crate) fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    // Returns the compiled thunk of this callable, compiling it on first
    // use. Callers racing through the first use may compile the thunk more
    // than once; exactly one result is retained, and the others are
    // discarded. Compilation is deterministic, so every competitor observes
    // a behaviorally identical adapter.
    pub(crate) fn thunk(&self) -> &Arc<Thunk> {
        if let Some(thunk) = self.thunk.get() {
            return thunk;
        }

        let compiled = Arc::new(Thunk::compile(self.signature.clone(), self.host.clone()));

        let _ = self.thunk.set(compiled);

        match self.thunk.get() {
            Some(thunk) => thunk,

            // Safety: The slot has just been initialized and is never
            //         cleared.
            None => unsafe { debug_unreachable!("Empty thunk slot after initialization.") },
        }
    }
}

// A group of overloads sharing one script-facing name within one namespace
// of one type.
pub(crate) struct OverloadSet {
    overloads: Vec<Arc<Callable>>,
}

impl OverloadSet {
    #[inline(always)]
    fn new(callable: Arc<Callable>) -> Self {
        Self {
            overloads: vec![callable],
        }
    }

    // Disambiguates the overloads by the number of supplied arguments.
    //
    // An unspecified arity returns the sole overload when exactly one
    // exists, and the first declared overload otherwise.
    pub(crate) fn by_arity(&self, arity: Option<usize>) -> Option<&Arc<Callable>> {
        let arity = match arity {
            None => return self.overloads.first(),
            Some(arity) => arity,
        };

        self.overloads.iter().find(|callable| {
            let signature = callable.signature();

            arity >= signature.min_params()
                && (signature.is_variadic() || arity <= signature.max_params())
        })
    }
}

// The directly declared, script-visible callables of one type, split by the
// visibility class the resolver may request.
#[derive(Default)]
pub(crate) struct TypeDecls {
    methods: AHashMap<Ident, Arc<OverloadSet>>,
    getters: AHashMap<Ident, Arc<OverloadSet>>,
    setters: AHashMap<Ident, Arc<OverloadSet>>,
}

impl TypeDecls {
    #[inline(always)]
    pub(crate) fn namespace(&self, kind: FnKind) -> &AHashMap<Ident, Arc<OverloadSet>> {
        match kind {
            FnKind::Function => &self.methods,
            FnKind::Getter => &self.getters,
            FnKind::Setter => &self.setters,
        }
    }

    #[inline(always)]
    fn namespace_mut(&mut self, kind: FnKind) -> &mut AHashMap<Ident, Arc<OverloadSet>> {
        match kind {
            FnKind::Function => &mut self.methods,
            FnKind::Getter => &mut self.getters,
            FnKind::Setter => &mut self.setters,
        }
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &Ident> {
        self.methods
            .keys()
            .chain(self.getters.keys())
            .chain(self.setters.keys())
    }
}

/// A frozen index of the host-exposed surface: the registered types and
/// their callables.
///
/// The catalog is assembled once through the [CatalogBuilder] during the
/// host startup and never changes during a run. It is the only source of
/// callables for the [resolution engine](crate::runtime::Engine).
pub struct Catalog {
    types: Box<[TypeMeta]>,
    type_names: AHashMap<Ident, TypeKey>,
    decls: Box<[TypeDecls]>,
    globals: AHashMap<Ident, Arc<OverloadSet>>,
    reverse: AHashMap<Ident, Vec<(Option<TypeKey>, Arc<Callable>)>>,
}

impl Catalog {
    /// Returns the metadata of a registered type.
    ///
    /// ## Panics
    ///
    /// Panics if the key was issued by another catalog.
    #[inline(always)]
    pub fn type_meta(&self, key: TypeKey) -> &TypeMeta {
        match self.types.get(key.0 as usize) {
            Some(meta) => meta,
            None => system_panic!("Type key {key:?} does not belong to this catalog."),
        }
    }

    /// Looks up a registered type by its case-insensitive name.
    #[inline(always)]
    pub fn type_of(&self, name: &str) -> Option<TypeKey> {
        self.type_names.get(&Ident::from(name)).copied()
    }

    /// Enumerates the metadata of all registered types.
    #[inline(always)]
    pub fn types(&self) -> impl Iterator<Item = &TypeMeta> {
        self.types.iter()
    }

    #[inline(always)]
    pub(crate) fn decls(&self, key: TypeKey) -> &TypeDecls {
        match self.decls.get(key.0 as usize) {
            Some(decls) => decls,
            None => system_panic!("Type key {key:?} does not belong to this catalog."),
        }
    }

    #[inline(always)]
    pub(crate) fn globals(&self) -> &AHashMap<Ident, Arc<OverloadSet>> {
        &self.globals
    }

    #[inline(always)]
    pub(crate) fn reverse(&self, name: &Ident) -> &[(Option<TypeKey>, Arc<Callable>)] {
        match self.reverse.get(name) {
            Some(entries) => entries,
            None => &[],
        }
    }
}

/// An assembler of the host-exposed surface.
///
/// The host registers its [types](TypeDecl) and
/// [callables](crate::runtime::FnDecl) during startup, then
/// [finishes](Self::finish) the builder into a ready
/// [Engine](crate::runtime::Engine).
///
/// ```
/// use std::sync::Arc;
///
/// use per_aspera::runtime::{Cell, CatalogBuilder, FnDecl, Param, ScriptTy};
///
/// let mut builder = CatalogBuilder::new();
///
/// builder.declare(
///     FnDecl::function("Double")
///         .param(Param::required("x", ScriptTy::Int))
///         .ret(ScriptTy::Int),
///     Arc::new(|_receiver, frame| match frame {
///         [Cell::Int(x)] => Ok(Cell::Int(*x * 2)),
///         _ => Ok(Cell::nil()),
///     }),
/// );
///
/// let engine = builder.finish();
///
/// let double = engine.resolve_global("double", Some(1)).unwrap();
///
/// assert_eq!(double.call(vec![Cell::Int(21)]), Ok(Cell::Int(42)));
/// ```
#[derive(Default)]
pub struct CatalogBuilder {
    types: Vec<TypeMeta>,
    type_names: AHashMap<Ident, TypeKey>,
    decls: Vec<TypeDecls>,
    globals: AHashMap<Ident, Arc<OverloadSet>>,
    reverse: AHashMap<Ident, Vec<(Option<TypeKey>, Arc<Callable>)>>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a host type and returns its catalog handle.
    ///
    /// ## Panics
    ///
    /// Panics if a type with the same (case-insensitive) name has already
    /// been registered, or if the parent handle belongs to another catalog.
    /// Both are programming errors in the host surface.
    pub fn define(&mut self, decl: TypeDecl) -> TypeKey {
        let TypeDecl {
            name,
            parent,
            surface,
            doc,
        } = decl;

        if let Some(previous) = self.type_names.get(&name) {
            let previous = &self.types[previous.0 as usize].name;

            panic!("Type {name} already declared as {previous}.");
        }

        if let Some(parent) = parent {
            if parent.0 as usize >= self.types.len() {
                panic!("Parent key {parent:?} of type {name} does not belong to this catalog.");
            }
        }

        let key = TypeKey(self.types.len() as u32);

        self.types.push(TypeMeta {
            key,
            name: name.clone(),
            parent,
            surface,
            doc,
        });

        self.decls.push(TypeDecls::default());

        if self.type_names.insert(name, key).is_some() {
            // Safety: Uniqueness checked above.
            unsafe { debug_unreachable!("Duplicate type name entry.") }
        }

        key
    }

    /// Registers a host callable with its underlying implementation.
    ///
    /// Hidden declarations are never indexed. Malformed declarations (an
    /// inconsistent optional/variadic parameter ordering, a setter without a
    /// value slot) are reported through the `log` facade and skipped; they
    /// never reach the catalog index.
    pub fn declare(&mut self, decl: FnDecl, body: HostFn) {
        if decl.hidden {
            log::trace!("Skipping hidden declaration {}.", decl.name);

            return;
        }

        let builtin = match decl.owner {
            Some(owner) => {
                if owner.0 as usize >= self.types.len() {
                    panic!(
                        "Owner key {owner:?} of callable {} does not belong to this catalog.",
                        decl.name,
                    );
                }

                self.types[owner.0 as usize].surface.is_library()
            }

            None => decl.library,
        };

        let kind = decl.kind;
        let owner = decl.owner;

        let signature = match Signature::analyze(decl, builtin) {
            Ok(signature) => signature,

            Err(error) => {
                log::warn!("Skipping catalog entry: {error}");

                return;
            }
        };

        let name = signature.name().clone();
        let callable = Arc::new(Callable::new(signature, body));

        self.reverse
            .entry(name.clone())
            .or_default()
            .push((owner, callable.clone()));

        let namespace = match owner {
            Some(owner) => self.decls[owner.0 as usize].namespace_mut(kind),
            None => &mut self.globals,
        };

        match namespace.get_mut(&name) {
            Some(set) => {
                let set = match Arc::get_mut(set) {
                    Some(set) => set,

                    // Safety: Builder overload sets are not shared until
                    //         the catalog is frozen.
                    None => unsafe { debug_unreachable!("Shared overload set in builder.") },
                };

                set.overloads.push(callable);
            }

            None => {
                let _ = namespace.insert(name, Arc::new(OverloadSet::new(callable)));
            }
        }
    }

    /// Freezes the registered surface and returns a ready resolution
    /// engine.
    pub fn finish(self) -> Engine {
        let catalog = Catalog {
            types: self.types.into_boxed_slice(),
            type_names: self.type_names,
            decls: self.decls.into_boxed_slice(),
            globals: self.globals,
            reverse: self.reverse,
        };

        log::trace!(
            "Catalog frozen: {} type(s), {} global name(s).",
            catalog.types.len(),
            catalog.globals.len(),
        );

        Engine::new(catalog)
    }
}
