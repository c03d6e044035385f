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

use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::runtime::{
    catalog::Callable,
    Cell,
    Ident,
    RuntimeError,
    RuntimeResult,
    Signature,
};

/// A first-class callable value of the script environment.
///
/// A ScriptFn wraps one resolved host callable — its [Signature] descriptor,
/// its compiled thunk, and an optional bound receiver — into an ordinary
/// value that scripts can store, pass around, and invoke independently of
/// the call-site syntax it was resolved from.
///
/// The object is immutable and cheap to [Clone]; clones share the underlying
/// callable. Two ScriptFn values are [equal](PartialEq) if and only if they
/// wrap the same underlying callable, regardless of their receivers.
#[derive(Clone)]
pub struct ScriptFn {
    callable: Arc<Callable>,
    receiver: Option<Box<Cell>>,
}

impl Debug for ScriptFn {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&format_args!("{}", self.signature()), formatter)
    }
}

impl PartialEq for ScriptFn {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callable, &other.callable)
    }
}

impl Eq for ScriptFn {}

impl Hash for ScriptFn {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.callable).hash(state)
    }
}

impl ScriptFn {
    #[inline(always)]
    pub(crate) fn from_callable(callable: Arc<Callable>) -> Self {
        Self {
            callable,
            receiver: None,
        }
    }

    /// Returns the signature descriptor of the underlying callable.
    #[inline(always)]
    pub fn signature(&self) -> &Signature {
        self.callable.signature()
    }

    /// Returns the script-facing name of the callable.
    #[inline(always)]
    pub fn name(&self) -> &Ident {
        self.signature().name()
    }

    /// Returns true if the callable was declared inside the host's own
    /// standard surface rather than by the user program.
    #[inline(always)]
    pub fn is_builtin(&self) -> bool {
        self.signature().is_builtin()
    }

    /// Returns the minimal number of arguments the callable accepts.
    #[inline(always)]
    pub fn min_params(&self) -> usize {
        self.signature().min_params()
    }

    /// Returns the maximal number of fixed arguments the callable accepts,
    /// excluding the variadic slot.
    #[inline(always)]
    pub fn max_params(&self) -> usize {
        self.signature().max_params()
    }

    /// Returns true if the callable absorbs excess trailing arguments.
    #[inline(always)]
    pub fn is_variadic(&self) -> bool {
        self.signature().is_variadic()
    }

    /// Returns true if the formal slot `index` may be omitted at the call
    /// site.
    #[inline(always)]
    pub fn is_optional(&self, index: usize) -> bool {
        self.signature().is_optional(index)
    }

    /// Returns true if the formal slot `index` is a mutable out/in-out slot.
    #[inline(always)]
    pub fn is_by_ref(&self, index: usize) -> bool {
        self.signature().is_by_ref(index)
    }

    /// Returns the receiver instance captured by this value, if any.
    #[inline(always)]
    pub fn receiver(&self) -> Option<&Cell> {
        self.receiver.as_deref()
    }

    /// Returns a new callable value with the receiver instance captured.
    ///
    /// A value that already captured a receiver is returned unchanged: the
    /// first capture wins.
    #[inline]
    pub fn bind_receiver(&self, receiver: Cell) -> Self {
        if self.receiver.is_some() {
            return self.clone();
        }

        Self {
            callable: self.callable.clone(),
            receiver: Some(Box::new(receiver)),
        }
    }

    /// Invokes the callable by value.
    ///
    /// Reference cells in argument positions are read through; nothing is
    /// written back. Use [call_with_refs](Self::call_with_refs) for the
    /// by-ref protocol.
    #[inline(always)]
    pub fn call(&self, args: Vec<Cell>) -> RuntimeResult<Cell> {
        self.callable
            .thunk()
            .invoke(self.receiver.as_deref().cloned(), args)
    }

    /// Invokes the callable, writing the post-call values of the by-ref
    /// slots back into the caller's [reference cells](crate::runtime::RefSlot),
    /// in slot order.
    ///
    /// The write-back happens even if the callable never touched a given
    /// by-ref slot: the slot then receives its own unchanged value.
    #[inline(always)]
    pub fn call_with_refs(&self, args: Vec<Cell>) -> RuntimeResult<Cell> {
        self.callable
            .thunk()
            .invoke_with_refs(self.receiver.as_deref().cloned(), args)
    }

    /// Produces a partially applied callable with the leading argument
    /// slots pre-filled by `args`.
    ///
    /// A nil argument leaves a hole: the slot stays empty and is filled by a
    /// later [bind](BoundScriptFn::bind) or by the arguments of the eventual
    /// call.
    ///
    /// Binding does not mutate this value; the produced
    /// [BoundScriptFn] references the same underlying callable.
    pub fn bind(&self, args: Vec<Cell>) -> RuntimeResult<BoundScriptFn> {
        let bound = args
            .into_iter()
            .map(|cell| match cell {
                Cell::Nil => None,
                cell => Some(cell),
            })
            .collect::<Vec<_>>();

        let (min_params, max_params) = derive_bounds(self.signature(), &bound)?;

        Ok(BoundScriptFn {
            function: self.clone(),
            bound: Arc::from(bound),
            min_params,
            max_params,
        })
    }
}

/// A partially applied first-class callable value.
///
/// A BoundScriptFn extends a [ScriptFn] with a fixed array of pre-supplied
/// argument slots, some of which may be empty holes. Invoking the value
/// fills the holes with the call arguments left-to-right and appends the
/// remaining call arguments after the bound slots.
///
/// The arity bounds of the value reflect how many holes remain:
/// [min_params](Self::min_params) and [max_params](Self::max_params) shrink
/// as slots get filled.
///
/// Like [ScriptFn], the object is immutable, cheap to [Clone], and
/// [equal](PartialEq) to another callable value if and only if both wrap the
/// same underlying callable.
#[derive(Clone)]
pub struct BoundScriptFn {
    function: ScriptFn,
    bound: Arc<[Option<Cell>]>,
    min_params: usize,
    max_params: usize,
}

impl Debug for BoundScriptFn {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let filled = self.bound.iter().filter(|slot| slot.is_some()).count();

        formatter.write_fmt(format_args!(
            "{:?} bound({filled}/{})",
            self.function,
            self.bound.len(),
        ))
    }
}

impl PartialEq for BoundScriptFn {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.function.eq(&other.function)
    }
}

impl Eq for BoundScriptFn {}

impl BoundScriptFn {
    /// Returns the underlying plain callable value.
    #[inline(always)]
    pub fn function(&self) -> &ScriptFn {
        &self.function
    }

    /// Returns the signature descriptor of the underlying callable.
    #[inline(always)]
    pub fn signature(&self) -> &Signature {
        self.function.signature()
    }

    /// Returns the script-facing name of the underlying callable.
    #[inline(always)]
    pub fn name(&self) -> &Ident {
        self.function.name()
    }

    /// Returns the pre-supplied argument slots. [None] slots are holes.
    #[inline(always)]
    pub fn bound_args(&self) -> &[Option<Cell>] {
        &self.bound
    }

    /// Returns the minimal number of call arguments this value still
    /// requires.
    #[inline(always)]
    pub fn min_params(&self) -> usize {
        self.min_params
    }

    /// Returns the maximal number of fixed call arguments this value still
    /// accepts, excluding the variadic slot of the underlying callable.
    #[inline(always)]
    pub fn max_params(&self) -> usize {
        self.max_params
    }

    /// Produces a new partially applied value on top of this one.
    ///
    /// The new arguments fill the first empty holes left-to-right; the
    /// leftover arguments are appended after the last formerly bound slot. A
    /// nil argument skips a hole, leaving it empty.
    pub fn bind(&self, args: Vec<Cell>) -> RuntimeResult<BoundScriptFn> {
        let mut bound = self.bound.to_vec();
        let mut supply = args.into_iter();

        for slot in bound.iter_mut() {
            if slot.is_some() {
                continue;
            }

            match supply.next() {
                None => break,

                Some(Cell::Nil) => (),

                Some(cell) => *slot = Some(cell),
            }
        }

        for cell in supply {
            bound.push(match cell {
                Cell::Nil => None,
                cell => Some(cell),
            });
        }

        let (min_params, max_params) = derive_bounds(self.signature(), &bound)?;

        Ok(BoundScriptFn {
            function: self.function.clone(),
            bound: Arc::from(bound),
            min_params,
            max_params,
        })
    }

    /// Invokes the underlying callable with the bound slots merged with the
    /// call `args`. See [ScriptFn::call].
    #[inline(always)]
    pub fn call(&self, args: Vec<Cell>) -> RuntimeResult<Cell> {
        self.function.call(self.assemble(args))
    }

    /// Invokes the underlying callable with the by-ref write-back protocol.
    /// See [ScriptFn::call_with_refs].
    #[inline(always)]
    pub fn call_with_refs(&self, args: Vec<Cell>) -> RuntimeResult<Cell> {
        self.function.call_with_refs(self.assemble(args))
    }

    // Merges the bound slots with the call arguments: holes are filled
    // left-to-right, and the remaining arguments follow the bound slots. An
    // unfilled hole turns into a nil argument, reading as an omitted slot
    // downstream.
    fn assemble(&self, args: Vec<Cell>) -> Vec<Cell> {
        let mut merged = Vec::with_capacity(self.bound.len() + args.len());
        let mut supply = args.into_iter();

        for slot in self.bound.iter() {
            match slot {
                Some(cell) => merged.push(cell.clone()),
                None => merged.push(supply.next().unwrap_or(Cell::Nil)),
            }
        }

        merged.extend(supply);

        merged
    }
}

// Re-derives the remaining arity bounds of a partially applied callable.
//
// Every filled slot within the signature's minimum reduces the remaining
// minimum by one (down to zero); every filled slot within the maximum
// reduces the remaining maximum by one. Occupying more slots than a
// non-variadic callable can ever accept is a hard error at bind time.
fn derive_bounds(
    signature: &Signature,
    bound: &[Option<Cell>],
) -> RuntimeResult<(usize, usize)> {
    let occupied = match bound.iter().rposition(|slot| slot.is_some()) {
        Some(last) => last + 1,
        None => 0,
    };

    // The leading argument position of an instance callable is the implicit
    // receiver; it occupies one slot ahead of the formal frame.
    let shift = match signature.is_instance() {
        true => 1,
        false => 0,
    };

    let capacity = signature.max_params() + shift;

    if !signature.is_variadic() && occupied > capacity {
        return Err(RuntimeError::BindOverflow {
            function: signature.name().clone(),
            capacity,
            bound: occupied,
        });
    }

    let filled_below_min = bound
        .iter()
        .skip(shift)
        .take(signature.min_params())
        .filter(|slot| slot.is_some())
        .count();

    let filled_below_max = bound
        .iter()
        .skip(shift)
        .take(signature.max_params())
        .filter(|slot| slot.is_some())
        .count();

    let min_params = signature.min_params() - filled_below_min;
    let max_params = signature.max_params().saturating_sub(filled_below_max);

    Ok((min_params, max_params))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::runtime::{
        Cell,
        CatalogBuilder,
        FnDecl,
        Param,
        RefSlot,
        RuntimeError,
        ScriptFn,
        ScriptTy,
        TypeDecl,
    };

    // A three-parameter probe returning its frame as a sequence.
    fn probe() -> ScriptFn {
        let mut builder = CatalogBuilder::new();

        builder.declare(
            FnDecl::function("Probe")
                .param(Param::required("a", ScriptTy::Any))
                .param(Param::required("b", ScriptTy::Any))
                .param(Param::required("c", ScriptTy::Any))
                .ret(ScriptTy::Seq),
            Arc::new(|_receiver, frame| Ok(Cell::from(frame.to_vec()))),
        );

        match builder.finish().resolve_global("Probe", None) {
            Some(function) => function,
            None => panic!("Probe not resolved"),
        }
    }

    #[test]
    fn test_bind_composition() {
        let f = probe();

        let composed = f
            .bind(vec![Cell::Int(1)])
            .and_then(|f| f.bind(vec![Cell::Int(2)]))
            .and_then(|f| f.call(vec![Cell::Int(3)]));

        let direct = f.call(vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)]);

        assert_eq!(composed, direct);
    }

    #[test]
    fn test_sparse_bind_holes() {
        let f = probe();

        let sparse = f
            .bind(vec![Cell::nil(), Cell::Int(2), Cell::nil()])
            .and_then(|f| f.call(vec![Cell::Int(1), Cell::Int(3)]));

        let direct = f.call(vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)]);

        assert_eq!(sparse, direct);
    }

    #[test]
    fn test_bind_adjusts_bounds() {
        let f = probe();

        assert_eq!(f.min_params(), 3);
        assert_eq!(f.max_params(), 3);

        let bound = match f.bind(vec![Cell::nil(), Cell::Int(2)]) {
            Ok(bound) => bound,
            Err(error) => panic!("bind failed: {error}"),
        };

        assert_eq!(bound.min_params(), 2);
        assert_eq!(bound.max_params(), 2);
    }

    #[test]
    fn test_bind_overflow() {
        let f = probe();

        let result = f.bind(vec![
            Cell::Int(1),
            Cell::Int(2),
            Cell::Int(3),
            Cell::Int(4),
        ]);

        assert!(matches!(
            result,
            Err(RuntimeError::BindOverflow {
                capacity: 3,
                bound: 4,
                ..
            }),
        ));
    }

    #[test]
    fn test_unfilled_hole_is_missing_argument() {
        let f = probe();

        let result = f
            .bind(vec![Cell::nil(), Cell::Int(2), Cell::Int(3)])
            .and_then(|f| f.call(Vec::new()));

        assert!(matches!(
            result,
            Err(RuntimeError::MissingArgument { param: 0, .. }),
        ));
    }

    #[test]
    fn test_function_equality_ignores_receiver() {
        let f = probe();
        let bound = f.bind_receiver(Cell::give("receiver"));

        assert_eq!(f, bound);

        let other = probe();

        assert_ne!(f, other);
    }

    #[test]
    fn test_by_ref_write_back() {
        let mut builder = CatalogBuilder::new();

        builder.declare(
            FnDecl::function("DivMod")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::required("b", ScriptTy::Int))
                .param(Param::required("quot", ScriptTy::Any).by_ref())
                .param(Param::required("rem", ScriptTy::Any).by_ref())
                .ret(ScriptTy::Bool),
            Arc::new(|_receiver, frame| match frame {
                [Cell::Int(a), Cell::Int(b), quot, rem] => {
                    let (a, b) = (*a, *b);

                    *quot = Cell::Int(a / b);
                    *rem = Cell::Int(a % b);

                    Ok(Cell::Bool(true))
                }

                _ => Ok(Cell::Bool(false)),
            }),
        );

        let engine = builder.finish();

        let div_mod = match engine.resolve_global("DivMod", Some(4)) {
            Some(function) => function,
            None => panic!("DivMod not resolved"),
        };

        let quot = RefSlot::new(Cell::Int(-1));
        let rem = RefSlot::new(Cell::Int(-1));

        let result = div_mod.call_with_refs(vec![
            Cell::Int(17),
            Cell::Int(5),
            Cell::Ref(quot.clone()),
            Cell::Ref(rem.clone()),
        ]);

        assert_eq!(result, Ok(Cell::Bool(true)));
        assert_eq!(quot.get(), Cell::Int(3));
        assert_eq!(rem.get(), Cell::Int(2));
    }

    #[test]
    fn test_untouched_by_ref_slot_still_written_back() {
        let mut builder = CatalogBuilder::new();

        builder.declare(
            FnDecl::function("Inert")
                .param(Param::required("out", ScriptTy::Any).by_ref())
                .ret(ScriptTy::Bool),
            Arc::new(|_receiver, _frame| Ok(Cell::Bool(true))),
        );

        let engine = builder.finish();

        let inert = match engine.resolve_global("Inert", None) {
            Some(function) => function,
            None => panic!("Inert not resolved"),
        };

        let out = RefSlot::new(Cell::Int(9));

        let result = inert.call_with_refs(vec![Cell::Ref(out.clone())]);

        assert_eq!(result, Ok(Cell::Bool(true)));
        assert_eq!(out.get(), Cell::Int(9));
    }

    #[test]
    fn test_by_value_call_ignores_write_back() {
        let mut builder = CatalogBuilder::new();

        builder.declare(
            FnDecl::function("Bump")
                .param(Param::required("out", ScriptTy::Any).by_ref())
                .ret(ScriptTy::Bool),
            Arc::new(|_receiver, frame| {
                frame[0] = Cell::Int(100);

                Ok(Cell::Bool(true))
            }),
        );

        let engine = builder.finish();

        let bump = match engine.resolve_global("Bump", None) {
            Some(function) => function,
            None => panic!("Bump not resolved"),
        };

        let out = RefSlot::new(Cell::Int(1));

        let result = bump.call(vec![Cell::Ref(out.clone())]);

        assert_eq!(result, Ok(Cell::Bool(true)));
        assert_eq!(out.get(), Cell::Int(1));
    }

    #[test]
    fn test_receiver_capture() {
        let mut builder = CatalogBuilder::new();

        let widget = builder.define(TypeDecl::new("Widget"));

        builder.declare(
            FnDecl::method(widget, "Receiver").ret(ScriptTy::Any),
            Arc::new(|receiver, _frame| Ok(receiver.unwrap_or(Cell::Nil))),
        );

        let engine = builder.finish();

        let method = match engine.resolve(widget, "Receiver", Some(0)) {
            Some(function) => function,
            None => panic!("Receiver not resolved"),
        };

        let captured = method.bind_receiver(Cell::give("instance"));

        assert_eq!(captured.call(Vec::new()), Ok(Cell::give("instance")));
        assert!(method.receiver().is_none());
    }
}
