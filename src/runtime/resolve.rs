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

use std::sync::{Arc, RwLock};

use ahash::AHashMap;

use crate::runtime::{
    catalog::OverloadSet,
    Catalog,
    Closeness,
    FnKind,
    Ident,
    ScriptFn,
    StringEstimation,
    TypeKey,
};

/// The resolution engine of the host surface.
///
/// The engine owns a frozen [Catalog] and memoizes name lookups over the
/// registered type hierarchy. It is the passed-in context object of the
/// whole invocation machinery: independent engines (e.g., in tests) never
/// share state.
///
/// Lookups are case-insensitive. A failed lookup is not an error: the
/// `resolve` family returns [None], and the caller decides whether that is a
/// script-level error.
///
/// The engine may be shared between threads. Resolution over an already
/// indexed name is a plain read; two threads racing to resolve the same
/// fresh name may both walk the hierarchy, but only one result is retained
/// in the memo, and the walk itself is idempotent.
pub struct Engine {
    catalog: Catalog,
    memo: RwLock<AHashMap<MemoKey, Option<Arc<OverloadSet>>>>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    ty: TypeKey,
    kind: MemoKind,
    name: Ident,
}

// FnKind is not hashable by design; the memo keeps its own discriminant.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum MemoKind {
    Method,
    Getter,
    Setter,
}

impl From<FnKind> for MemoKind {
    #[inline(always)]
    fn from(kind: FnKind) -> Self {
        match kind {
            FnKind::Function => Self::Method,
            FnKind::Getter => Self::Getter,
            FnKind::Setter => Self::Setter,
        }
    }
}

impl Engine {
    #[inline(always)]
    pub(crate) fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            memo: RwLock::new(AHashMap::new()),
        }
    }

    /// Grants access to the frozen catalog of the host surface.
    #[inline(always)]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Finds a method of `ty` (instance or static) by its case-insensitive
    /// `name`, walking the inheritance chain of the type.
    ///
    /// The `arity` disambiguates between overloads sharing the name: the
    /// resolved overload accepts exactly `arity` arguments. An unspecified
    /// arity resolves to the unique overload, or the first declared one.
    #[inline(always)]
    pub fn resolve(&self, ty: TypeKey, name: &str, arity: Option<usize>) -> Option<ScriptFn> {
        self.resolve_member(ty, FnKind::Function, name, arity)
    }

    /// Finds a property read accessor of `ty` by its case-insensitive
    /// `name`, walking the inheritance chain of the type.
    #[inline(always)]
    pub fn resolve_getter(&self, ty: TypeKey, name: &str, arity: Option<usize>) -> Option<ScriptFn> {
        self.resolve_member(ty, FnKind::Getter, name, arity)
    }

    /// Finds a property write accessor of `ty` by its case-insensitive
    /// `name`, walking the inheritance chain of the type.
    #[inline(always)]
    pub fn resolve_setter(&self, ty: TypeKey, name: &str, arity: Option<usize>) -> Option<ScriptFn> {
        self.resolve_member(ty, FnKind::Setter, name, arity)
    }

    /// Finds a free function of the top-level surface by its
    /// case-insensitive `name`.
    ///
    /// When the flat global table has no match, the lookup falls back to the
    /// reverse name index: a static method of any registered type declared
    /// under the requested name resolves as a global.
    pub fn resolve_global(&self, name: &str, arity: Option<usize>) -> Option<ScriptFn> {
        let name = Ident::from(name);

        if let Some(set) = self.catalog.globals().get(&name) {
            if let Some(callable) = set.by_arity(arity) {
                return Some(ScriptFn::from_callable(callable.clone()));
            }
        }

        for (owner, callable) in self.catalog.reverse(&name) {
            if owner.is_none() {
                continue;
            }

            let signature = callable.signature();

            if !signature.is_static() {
                continue;
            }

            let accepts = match arity {
                None => true,

                Some(arity) => {
                    arity >= signature.min_params()
                        && (signature.is_variadic() || arity <= signature.max_params())
                }
            };

            if accepts {
                return Some(ScriptFn::from_callable(callable.clone()));
            }
        }

        None
    }

    /// Suggests the closest member name declared along the inheritance chain
    /// of `ty`, for "unknown member" diagnostics.
    ///
    /// Returns [None] when nothing sufficiently close is found.
    pub fn closest_member(&self, ty: TypeKey, name: &str) -> Option<Ident> {
        let mut best: Option<(Closeness, Ident)> = None;

        for key in self.chain(ty) {
            for candidate in self.catalog.decls(key).names() {
                let closeness = candidate.as_str().estimate(name);

                if closeness < Closeness::half() {
                    continue;
                }

                match &best {
                    Some((previous, _)) if *previous >= closeness => (),
                    _ => best = Some((closeness, candidate.clone())),
                }
            }
        }

        let (_, name) = best?;

        Some(name)
    }

    fn resolve_member(
        &self,
        ty: TypeKey,
        kind: FnKind,
        name: &str,
        arity: Option<usize>,
    ) -> Option<ScriptFn> {
        let set = self.find(ty, kind, name)?;

        let callable = set.by_arity(arity)?;

        Some(ScriptFn::from_callable(callable.clone()))
    }

    // The memoized hierarchy walk.
    //
    // The memo is append-only: entries are never invalidated during a run
    // because the underlying catalog is frozen. Missing-name outcomes are
    // memoized too, so a leaf type with nothing to find pays the walk at
    // most once.
    fn find(&self, ty: TypeKey, kind: FnKind, name: &str) -> Option<Arc<OverloadSet>> {
        let key = MemoKey {
            ty,
            kind: kind.into(),
            name: Ident::from(name),
        };

        {
            let memo = self
                .memo
                .read()
                .unwrap_or_else(|poison| poison.into_inner());

            if let Some(found) = memo.get(&key) {
                return found.clone();
            }
        }

        log::trace!("Indexing lookup of {name} on {ty:?}.");

        let mut found = None;

        for current in self.chain(ty) {
            if let Some(set) = self.catalog.decls(current).namespace(kind).get(&key.name) {
                found = Some(set.clone());

                break;
            }
        }

        let mut memo = self
            .memo
            .write()
            .unwrap_or_else(|poison| poison.into_inner());

        // Two walkers may race to this point; the first insertion wins and
        // the duplicates are discarded, never mixed.
        memo.entry(key).or_insert_with(|| found).clone()
    }

    // Iterates the inheritance chain of `ty`, starting at `ty` itself.
    //
    // The chain never crosses into the host-internal surface unless the
    // starting type itself belongs to it.
    fn chain(&self, ty: TypeKey) -> TypeChain<'_> {
        TypeChain {
            catalog: &self.catalog,
            next: Some(ty),
            host_visible: self.catalog.type_meta(ty).surface().is_host(),
        }
    }
}

struct TypeChain<'a> {
    catalog: &'a Catalog,
    next: Option<TypeKey>,
    host_visible: bool,
}

impl<'a> Iterator for TypeChain<'a> {
    type Item = TypeKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        let parent = self.catalog.type_meta(current).parent();

        self.next = match parent {
            Some(parent) if self.host_visible => Some(parent),

            Some(parent) => match self.catalog.type_meta(parent).surface().is_host() {
                true => None,
                false => Some(parent),
            },

            None => None,
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::runtime::{
        Cell,
        CatalogBuilder,
        Engine,
        FnDecl,
        HostFn,
        Ident,
        Param,
        ScriptTy,
        Surface,
        TypeDecl,
        TypeKey,
    };

    fn answer(value: i64) -> HostFn {
        Arc::new(move |_receiver, _frame| Ok(Cell::Int(value)))
    }

    struct Fixture {
        engine: Engine,
        base: TypeKey,
        derived: TypeKey,
        hidden_root: TypeKey,
    }

    fn fixture() -> Fixture {
        let mut builder = CatalogBuilder::new();

        let hidden_root = builder.define(TypeDecl::new("__Root").surface(Surface::Host));

        let base = builder.define(
            TypeDecl::new("Base")
                .parent(hidden_root)
                .surface(Surface::Library),
        );

        let derived = builder.define(TypeDecl::new("Derived").parent(base));

        builder.declare(
            FnDecl::method(base, "Greet").ret(ScriptTy::Int),
            answer(1),
        );

        builder.declare(
            FnDecl::method(derived, "Greet").ret(ScriptTy::Int),
            answer(2),
        );

        builder.declare(
            FnDecl::method(hidden_root, "Secret").ret(ScriptTy::Int),
            answer(3),
        );

        builder.declare(
            FnDecl::method(base, "Overloaded")
                .param(Param::required("a", ScriptTy::Int))
                .ret(ScriptTy::Int),
            answer(10),
        );

        builder.declare(
            FnDecl::method(base, "Overloaded")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::required("b", ScriptTy::Int))
                .ret(ScriptTy::Int),
            answer(20),
        );

        Fixture {
            engine: builder.finish(),
            base,
            derived,
            hidden_root,
        }
    }

    #[test]
    fn test_resolution_case_insensitivity() {
        let fixture = fixture();

        let upper = fixture.engine.resolve(fixture.base, "GREET", Some(0));
        let lower = fixture.engine.resolve(fixture.base, "greet", Some(0));

        assert!(upper.is_some());
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_nearest_declaration_wins() {
        let fixture = fixture();

        let derived = match fixture.engine.resolve(fixture.derived, "Greet", None) {
            Some(function) => function,
            None => panic!("Greet not resolved on Derived"),
        };

        let base = match fixture.engine.resolve(fixture.base, "Greet", None) {
            Some(function) => function,
            None => panic!("Greet not resolved on Base"),
        };

        assert_ne!(derived, base);
    }

    #[test]
    fn test_inherited_member() {
        let fixture = fixture();

        let inherited = fixture
            .engine
            .resolve(fixture.derived, "Overloaded", Some(2));

        assert!(inherited.is_some());
    }

    #[test]
    fn test_overload_arity_disambiguation() {
        let fixture = fixture();

        let unary = fixture.engine.resolve(fixture.base, "Overloaded", Some(1));
        let binary = fixture.engine.resolve(fixture.base, "Overloaded", Some(2));

        assert!(unary.is_some());
        assert!(binary.is_some());
        assert_ne!(unary, binary);

        // Receiver plus one argument dispatches to the unary overload.
        let receiver = Cell::Int(0);

        assert_eq!(
            unary.and_then(|f| f.call(vec![receiver, Cell::Int(5)]).ok()),
            Some(Cell::Int(10)),
        );
    }

    #[test]
    fn test_walk_stops_at_host_boundary() {
        let fixture = fixture();

        // `Secret` lives on the host-internal root; lookups starting below
        // the boundary never see it.
        assert!(fixture.engine.resolve(fixture.derived, "Secret", None).is_none());
        assert!(fixture.engine.resolve(fixture.base, "Secret", None).is_none());

        // A lookup starting inside the host surface does.
        assert!(fixture
            .engine
            .resolve(fixture.hidden_root, "Secret", None)
            .is_some());
    }

    #[test]
    fn test_missing_name_is_not_an_error() {
        let fixture = fixture();

        assert!(fixture.engine.resolve(fixture.derived, "Vanish", None).is_none());

        // The memoized miss is stable.
        assert!(fixture.engine.resolve(fixture.derived, "Vanish", None).is_none());
    }

    #[test]
    fn test_closest_member_suggestion() {
        let fixture = fixture();

        assert_eq!(
            fixture.engine.closest_member(fixture.derived, "Greed"),
            Some(Ident::from("Greet")),
        );

        assert_eq!(fixture.engine.closest_member(fixture.derived, "zzz"), None);
    }
}
