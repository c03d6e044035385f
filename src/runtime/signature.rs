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

use std::fmt::{Display, Formatter};

use crate::runtime::{
    error::SignatureDefect,
    Cell,
    Ident,
    RuntimeError,
    RuntimeResult,
    ScriptTy,
    TypeKey,
};

/// A kind of a host-exposed callable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FnKind {
    /// An ordinary function or method.
    Function,

    /// A property read accessor. Indexed properties receive their keys as
    /// ordinary parameters.
    Getter,

    /// A property write accessor. The final formal parameter is the assigned
    /// value; an element setter additionally receives its keys packed into a
    /// sequence at the second-to-last slot.
    Setter,
}

/// A dispatch mode of a host-exposed callable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dispatch {
    /// The callable does not receive an instance of its declaring type.
    Static,

    /// The callable receives an instance of its declaring type.
    Instance,
}

/// A description of one formal parameter of a host-exposed callable.
///
/// The [Display] implementation renders the parameter the way it would
/// appear in a signature: `x: int`, `&out`, `...rest`.
#[derive(Clone, Debug)]
pub struct Param {
    name: Option<Ident>,
    ty: ScriptTy,
    optional: bool,
    variadic: bool,
    by_ref: bool,
    default: Option<Cell>,
}

impl Display for Param {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        if self.variadic {
            formatter.write_str("...")?;
        }

        if self.by_ref {
            formatter.write_str("&")?;
        }

        match &self.name {
            Some(name) => Display::fmt(name, formatter)?,
            None => formatter.write_str("_")?,
        }

        if self.optional {
            formatter.write_str("?")?;
        }

        if !self.ty.is_dynamic() && !self.variadic {
            formatter.write_fmt(format_args!(": {}", self.ty))?;
        }

        Ok(())
    }
}

impl Param {
    /// Describes a required parameter.
    #[inline(always)]
    pub fn required(name: impl Into<Ident>, ty: ScriptTy) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            optional: false,
            variadic: false,
            by_ref: false,
            default: None,
        }
    }

    /// Describes an optional parameter with a precomputed boxed default.
    ///
    /// A callable omitting this parameter at the call site receives the
    /// `default` value in the corresponding slot.
    #[inline(always)]
    pub fn optional(name: impl Into<Ident>, ty: ScriptTy, default: Cell) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            optional: true,
            variadic: false,
            by_ref: false,
            default: Some(default),
        }
    }

    /// Describes a variadic ("rest") parameter that absorbs any excess
    /// trailing arguments into one sequence.
    #[inline(always)]
    pub fn variadic(name: impl Into<Ident>) -> Self {
        Self {
            name: Some(name.into()),
            ty: ScriptTy::Seq,
            optional: false,
            variadic: false,
            by_ref: false,
            default: None,
        }
        .into_variadic()
    }

    /// Marks the parameter as a mutable out/in-out slot.
    ///
    /// The engine writes the post-call value of a by-ref slot back into the
    /// caller's [reference cell](crate::runtime::RefSlot).
    #[inline(always)]
    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    #[inline(always)]
    fn into_variadic(mut self) -> Self {
        self.variadic = true;
        self.ty = ScriptTy::Seq;
        self
    }

    /// Returns the name of the parameter, if the parameter has a name.
    #[inline(always)]
    pub fn name(&self) -> Option<&Ident> {
        self.name.as_ref()
    }

    /// Returns the static type of the parameter slot.
    #[inline(always)]
    pub fn ty(&self) -> ScriptTy {
        self.ty
    }

    /// Returns true if the parameter may be omitted at the call site.
    #[inline(always)]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns true if the parameter absorbs excess trailing arguments.
    #[inline(always)]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Returns true if the parameter is a mutable out/in-out slot.
    #[inline(always)]
    pub fn is_by_ref(&self) -> bool {
        self.by_ref
    }

    /// Returns the precomputed default of an optional parameter.
    #[inline(always)]
    pub fn default(&self) -> Option<&Cell> {
        self.default.as_ref()
    }
}

/// A registration record of one host-exposed callable.
///
/// The host surface declares its functions, methods, and property accessors
/// by feeding these records into the
/// [CatalogBuilder](crate::runtime::CatalogBuilder). The builder analyzes
/// each record into an immutable [Signature] descriptor.
#[derive(Clone)]
pub struct FnDecl {
    pub(crate) name: Ident,
    pub(crate) script_name: Option<Ident>,
    pub(crate) owner: Option<TypeKey>,
    pub(crate) kind: FnKind,
    pub(crate) dispatch: Dispatch,
    pub(crate) params: Vec<Param>,
    pub(crate) ret: ScriptTy,
    pub(crate) hidden: bool,
    pub(crate) library: bool,
    pub(crate) doc: Option<&'static str>,
}

impl FnDecl {
    /// Starts the declaration of a free function without a declaring type.
    #[inline]
    pub fn function(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            script_name: None,
            owner: None,
            kind: FnKind::Function,
            dispatch: Dispatch::Static,
            params: Vec::new(),
            ret: ScriptTy::Nil,
            hidden: false,
            library: false,
            doc: None,
        }
    }

    /// Starts the declaration of an instance method of `owner`.
    #[inline]
    pub fn method(owner: TypeKey, name: impl Into<Ident>) -> Self {
        let mut decl = Self::function(name);

        decl.owner = Some(owner);
        decl.dispatch = Dispatch::Instance;

        decl
    }

    /// Starts the declaration of a static method of `owner`.
    #[inline]
    pub fn static_method(owner: TypeKey, name: impl Into<Ident>) -> Self {
        let mut decl = Self::function(name);

        decl.owner = Some(owner);

        decl
    }

    /// Starts the declaration of a property read accessor of `owner`.
    ///
    /// Indexed properties declare their keys as ordinary parameters of the
    /// getter.
    #[inline]
    pub fn getter(owner: TypeKey, name: impl Into<Ident>) -> Self {
        let mut decl = Self::method(owner, name);

        decl.kind = FnKind::Getter;

        decl
    }

    /// Starts the declaration of a property write accessor of `owner`.
    ///
    /// The final formal parameter of a setter is the assigned value. An
    /// element setter additionally declares a variadic (or trailing
    /// sequence-typed) keys parameter right before the value.
    #[inline]
    pub fn setter(owner: TypeKey, name: impl Into<Ident>) -> Self {
        let mut decl = Self::method(owner, name);

        decl.kind = FnKind::Setter;

        decl
    }

    /// Overrides the script-facing name of the callable.
    ///
    /// The host-level identifier remains available through
    /// [Signature::host_name].
    #[inline(always)]
    pub fn script_name(mut self, name: impl Into<Ident>) -> Self {
        self.script_name = Some(name.into());
        self
    }

    /// Appends a formal parameter to the declaration.
    #[inline(always)]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Declares the type of the returned object. The default is
    /// [Nil](ScriptTy::Nil), denoting a callable that does not return a
    /// value.
    #[inline(always)]
    pub fn ret(mut self, ty: ScriptTy) -> Self {
        self.ret = ty;
        self
    }

    /// Hides the callable from scripts. Hidden callables are never indexed
    /// by the catalog.
    #[inline(always)]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Marks an ownerless callable as part of the host's standard library
    /// surface. Member callables inherit this property from their declaring
    /// type instead.
    #[inline(always)]
    pub fn library(mut self) -> Self {
        self.library = true;
        self
    }

    /// Attaches documentation to the callable.
    #[inline(always)]
    pub fn doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }
}

/// A precomputed calling-shape descriptor of one host-exposed callable.
///
/// The descriptor is created once, when the callable is first declared to
/// the catalog, and never changes afterwards. It records the arity bounds,
/// the position of the variadic slot, the soft-optional slots with their
/// precomputed defaults, and the by-ref slots of the callable.
///
/// The [Display] implementation renders a canonical, user-facing view of the
/// signature, such as `fn foo(x: int, y?: str) -> float`.
#[derive(Debug)]
pub struct Signature {
    name: Ident,
    host_name: Ident,
    owner: Option<TypeKey>,
    kind: FnKind,
    dispatch: Dispatch,
    params: Box<[Param]>,
    ret: ScriptTy,
    min_params: usize,
    max_params: usize,
    variadic_index: Option<usize>,
    is_indexer_setter: bool,
    soft_optional: Box<[bool]>,
    by_ref_slots: Box<[usize]>,
    builtin: bool,
    doc: Option<&'static str>,
}

impl Display for Signature {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("fn {}", self.name))?;

        formatter.write_str("(")?;

        let mut is_first = true;

        for param in self.params.iter() {
            match is_first {
                true => is_first = false,
                false => formatter.write_str(", ")?,
            }

            Display::fmt(param, formatter)?;
        }

        formatter.write_str(")")?;

        if !self.ret.is_nil() {
            formatter.write_fmt(format_args!(" -> {}", self.ret))?;
        }

        Ok(())
    }
}

impl Signature {
    // Analyzes one host declaration into an immutable descriptor.
    //
    // The scan is a single left-to-right pass over the formal parameters.
    // Malformed declarations never reach the catalog index.
    pub(crate) fn analyze(decl: FnDecl, builtin: bool) -> RuntimeResult<Self> {
        let FnDecl {
            name: host_name,
            script_name,
            owner,
            kind,
            dispatch,
            mut params,
            ret,
            hidden: _,
            library: _,
            doc,
        } = decl;

        let name = script_name.unwrap_or_else(|| host_name.clone());
        let total = params.len();

        if kind == FnKind::Setter && total == 0 {
            return Err(RuntimeError::MalformedSignature {
                function: name,
                defect: SignatureDefect::SetterWithoutValue,
            });
        }

        // An element setter may mark its keys implicitly: a trailing
        // sequence-typed parameter at the second-to-last position.
        if kind == FnKind::Setter && total >= 2 {
            let keys = &mut params[total - 2];

            if !keys.variadic && keys.ty == ScriptTy::Seq && !keys.optional {
                keys.variadic = true;
            }
        }

        let mut min_params = 0;
        let mut variadic_index = None;
        let mut seen_optional = false;
        let mut soft_optional = vec![false; total];
        let mut by_ref_slots = Vec::new();

        for (index, param) in params.iter().enumerate() {
            if param.by_ref {
                by_ref_slots.push(index);
            }

            if param.variadic {
                if variadic_index.is_some() {
                    return Err(RuntimeError::MalformedSignature {
                        function: name,
                        defect: SignatureDefect::DuplicateVariadic { index },
                    });
                }

                let well_placed = match kind {
                    FnKind::Setter => index + 2 == total,
                    _ => index + 1 == total,
                };

                if !well_placed {
                    return Err(RuntimeError::MalformedSignature {
                        function: name,
                        defect: SignatureDefect::MisplacedVariadic { index },
                    });
                }

                variadic_index = Some(index);
                continue;
            }

            match param.optional {
                true => {
                    seen_optional = true;
                    soft_optional[index] = true;
                }

                false => {
                    // The value slot of an element setter legitimately
                    // follows the variadic keys slot.
                    if seen_optional && variadic_index != Some(index.wrapping_sub(1)) {
                        return Err(RuntimeError::MalformedSignature {
                            function: name,
                            defect: SignatureDefect::RequiredAfterOptional { index },
                        });
                    }

                    min_params += 1;
                }
            }
        }

        // Script call sites may omit the assigned value of a setter, so the
        // trailing value slot is soft-optional regardless of its declared
        // optionality.
        if kind == FnKind::Setter {
            let value = total - 1;

            if !soft_optional[value] {
                soft_optional[value] = true;
                min_params -= 1;
            }
        }

        let max_params = match variadic_index {
            Some(_) => total - 1,
            None => total,
        };

        let is_indexer_setter =
            kind == FnKind::Setter && total >= 2 && variadic_index == Some(total - 2);

        Ok(Self {
            name,
            host_name,
            owner,
            kind,
            dispatch,
            params: params.into_boxed_slice(),
            ret,
            min_params,
            max_params,
            variadic_index,
            is_indexer_setter,
            soft_optional: soft_optional.into_boxed_slice(),
            by_ref_slots: by_ref_slots.into_boxed_slice(),
            builtin,
            doc,
        })
    }

    /// Returns the script-facing name of the callable.
    #[inline(always)]
    pub fn name(&self) -> &Ident {
        &self.name
    }

    /// Returns the host-level identifier of the callable, which may differ
    /// from the script-facing [name](Self::name).
    #[inline(always)]
    pub fn host_name(&self) -> &Ident {
        &self.host_name
    }

    /// Returns the declaring type of the callable, if the callable is a
    /// member of a type.
    #[inline(always)]
    pub fn owner(&self) -> Option<TypeKey> {
        self.owner
    }

    /// Returns the kind of the callable.
    #[inline(always)]
    pub fn kind(&self) -> FnKind {
        self.kind
    }

    /// Returns the formal parameter count, including the variadic and the
    /// setter value slots.
    #[inline(always)]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Returns the minimal number of arguments the callable accepts.
    #[inline(always)]
    pub fn min_params(&self) -> usize {
        self.min_params
    }

    /// Returns the maximal number of fixed arguments the callable accepts.
    ///
    /// The variadic slot, if present, is excluded: a variadic callable
    /// accepts any number of arguments at or above
    /// [min_params](Self::min_params).
    #[inline(always)]
    pub fn max_params(&self) -> usize {
        self.max_params
    }

    /// Returns the index of the formal slot that absorbs excess trailing
    /// arguments, if the callable is variadic.
    #[inline(always)]
    pub fn variadic_index(&self) -> Option<usize> {
        self.variadic_index
    }

    /// Returns true if the callable has a variadic slot.
    #[inline(always)]
    pub fn is_variadic(&self) -> bool {
        self.variadic_index.is_some()
    }

    /// Returns true if the callable is a "set element" shape: the variadic
    /// slot holds the element keys, and one extra trailing slot holds the
    /// assigned value.
    #[inline(always)]
    pub fn is_indexer_setter(&self) -> bool {
        self.is_indexer_setter
    }

    /// Returns true if the callable is dispatched without an instance.
    #[inline(always)]
    pub fn is_static(&self) -> bool {
        matches!(self.dispatch, Dispatch::Static)
    }

    /// Returns true if the callable receives an instance of its declaring
    /// type.
    #[inline(always)]
    pub fn is_instance(&self) -> bool {
        matches!(self.dispatch, Dispatch::Instance)
    }

    /// Returns true if the callable is a property write accessor.
    #[inline(always)]
    pub fn is_setter(&self) -> bool {
        matches!(self.kind, FnKind::Setter)
    }

    /// Returns true if the callable is a property accessor of either
    /// direction.
    #[inline(always)]
    pub fn is_property(&self) -> bool {
        matches!(self.kind, FnKind::Getter | FnKind::Setter)
    }

    /// Returns true if the callable was declared inside the host's own
    /// standard surface rather than by the user program.
    #[inline(always)]
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Returns true if the formal slot `index` may be omitted at the call
    /// site.
    #[inline(always)]
    pub fn is_optional(&self, index: usize) -> bool {
        self.soft_optional.get(index).copied().unwrap_or(false)
    }

    /// Returns true if the formal slot `index` is a mutable out/in-out slot.
    #[inline(always)]
    pub fn is_by_ref(&self, index: usize) -> bool {
        self.by_ref_slots.binary_search(&index).is_ok()
    }

    /// Returns the indices of the mutable out/in-out slots, in slot order.
    #[inline(always)]
    pub fn by_ref_slots(&self) -> &[usize] {
        &self.by_ref_slots
    }

    /// Returns the description of the formal parameter at `index`.
    #[inline(always)]
    pub fn param(&self, index: usize) -> Option<&Param> {
        self.params.get(index)
    }

    /// Returns the descriptions of all formal parameters.
    #[inline(always)]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the type of the returned object. [Nil](ScriptTy::Nil) denotes
    /// a callable that does not return a value.
    #[inline(always)]
    pub fn ret(&self) -> ScriptTy {
        self.ret
    }

    /// Returns true if any formal slot may be omitted at the call site.
    #[inline(always)]
    pub fn has_optional(&self) -> bool {
        self.is_variadic() || self.min_params != self.max_params
    }

    /// Returns the documentation of the callable, if available.
    #[inline(always)]
    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        error::SignatureDefect,
        Cell,
        FnDecl,
        Ident,
        Param,
        RuntimeError,
        ScriptTy,
        Signature,
        TypeKey,
    };

    fn analyze(decl: FnDecl) -> Signature {
        match Signature::analyze(decl, false) {
            Ok(signature) => signature,
            Err(error) => panic!("unexpected analysis failure: {error}"),
        }
    }

    #[test]
    fn test_plain_function_shape() {
        let signature = analyze(
            FnDecl::function("Add")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::required("b", ScriptTy::Int))
                .ret(ScriptTy::Int),
        );

        assert_eq!(signature.min_params(), 2);
        assert_eq!(signature.max_params(), 2);
        assert_eq!(signature.arity(), 2);
        assert!(!signature.is_variadic());
        assert!(!signature.has_optional());
        assert!(signature.min_params() <= signature.max_params());
    }

    #[test]
    fn test_optional_shape() {
        let signature = analyze(
            FnDecl::function("Round")
                .param(Param::required("x", ScriptTy::Float))
                .param(Param::optional("digits", ScriptTy::Int, Cell::Int(0)))
                .ret(ScriptTy::Float),
        );

        assert_eq!(signature.min_params(), 1);
        assert_eq!(signature.max_params(), 2);
        assert!(!signature.is_optional(0));
        assert!(signature.is_optional(1));
        assert!(signature.has_optional());
    }

    #[test]
    fn test_variadic_shape() {
        let signature = analyze(
            FnDecl::function("Max")
                .param(Param::required("first", ScriptTy::Float))
                .param(Param::variadic("rest"))
                .ret(ScriptTy::Float),
        );

        assert_eq!(signature.min_params(), 1);
        assert_eq!(signature.max_params(), 1);
        assert_eq!(signature.arity(), 2);
        assert_eq!(signature.variadic_index(), Some(1));
        assert!(!signature.is_indexer_setter());
    }

    #[test]
    fn test_indexer_setter_shape() {
        let owner = TypeKey(0);

        let signature = analyze(
            FnDecl::setter(owner, "Item")
                .param(Param::variadic("keys"))
                .param(Param::required("value", ScriptTy::Any)),
        );

        assert!(signature.is_indexer_setter());
        assert!(signature.is_setter());
        assert_eq!(signature.variadic_index(), Some(0));

        // The assigned value is soft-optional regardless of its declaration.
        assert!(signature.is_optional(1));
        assert_eq!(signature.min_params(), 0);
        assert_eq!(signature.max_params(), 1);
    }

    #[test]
    fn test_implicit_indexer_keys() {
        let owner = TypeKey(0);

        let signature = analyze(
            FnDecl::setter(owner, "Item")
                .param(Param::required("keys", ScriptTy::Seq))
                .param(Param::required("value", ScriptTy::Any)),
        );

        assert!(signature.is_indexer_setter());
        assert_eq!(signature.variadic_index(), Some(0));
    }

    #[test]
    fn test_plain_setter_decrements_minimum() {
        let owner = TypeKey(0);

        let signature = analyze(
            FnDecl::setter(owner, "Title").param(Param::required("value", ScriptTy::Str)),
        );

        assert_eq!(signature.min_params(), 0);
        assert_eq!(signature.max_params(), 1);
        assert!(signature.is_optional(0));
    }

    #[test]
    fn test_zero_parameter_setter_rejected() {
        let owner = TypeKey(0);

        let result = Signature::analyze(FnDecl::setter(owner, "Title"), false);

        assert!(matches!(
            result,
            Err(RuntimeError::MalformedSignature {
                defect: SignatureDefect::SetterWithoutValue,
                ..
            }),
        ));
    }

    #[test]
    fn test_misplaced_variadic_rejected() {
        let result = Signature::analyze(
            FnDecl::function("Bad")
                .param(Param::variadic("rest"))
                .param(Param::required("x", ScriptTy::Int)),
            false,
        );

        assert!(matches!(
            result,
            Err(RuntimeError::MalformedSignature {
                defect: SignatureDefect::MisplacedVariadic { index: 0 },
                ..
            }),
        ));
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let result = Signature::analyze(
            FnDecl::function("Bad")
                .param(Param::optional("x", ScriptTy::Int, Cell::Int(0)))
                .param(Param::required("y", ScriptTy::Int)),
            false,
        );

        assert!(matches!(
            result,
            Err(RuntimeError::MalformedSignature {
                defect: SignatureDefect::RequiredAfterOptional { index: 1 },
                ..
            }),
        ));
    }

    #[test]
    fn test_script_name_override() {
        let signature = analyze(FnDecl::function("host_sqrt_v2").script_name("Sqrt"));

        assert_eq!(signature.name(), &Ident::from("Sqrt"));
        assert_eq!(signature.host_name(), &Ident::from("host_sqrt_v2"));
    }

    #[test]
    fn test_signature_display() {
        let signature = analyze(
            FnDecl::function("Round")
                .param(Param::required("x", ScriptTy::Float))
                .param(Param::optional("digits", ScriptTy::Int, Cell::Int(0)))
                .ret(ScriptTy::Float),
        );

        assert_eq!(
            format!("{signature}"),
            "fn Round(x: float, digits?: int) -> float",
        );
    }
}
