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

use std::{mem::take, sync::Arc};

use crate::runtime::{coercion::narrow, Cell, RefSlot, RuntimeError, RuntimeResult, Signature};

/// The underlying implementation of a host callable.
///
/// The function receives an optional receiver instance and the fully
/// assembled formal frame: one narrowed value per formal slot, with the
/// variadic slot packed into a sequence and the omitted soft-optional slots
/// substituted by their defaults. Mutations of the frame are observable by
/// the engine and feed the by-ref write-back protocol.
pub type HostFn = Arc<dyn Fn(Option<Cell>, &mut [Cell]) -> RuntimeResult<Cell> + Send + Sync>;

// A compiled `(receiver, args) -> result` adapter of one signature
// descriptor.
//
// The adapter is a pure value: compiled once per descriptor, cached, and
// invoked concurrently without synchronization. Compilation precomputes the
// shape-dependent decisions so that steady-state dispatch performs no
// per-call signature analysis beyond plain slot iteration.
pub(crate) struct Thunk {
    signature: Arc<Signature>,
    host: HostFn,
    fast: bool,
}

impl Thunk {
    pub(crate) fn compile(signature: Arc<Signature>, host: HostFn) -> Self {
        // The common case of the whole engine: one parameter, no receiver
        // splicing, no packing. It must not pay for the general machinery.
        let fast = signature.arity() == 1
            && signature.is_static()
            && !signature.is_setter()
            && !signature.is_variadic();

        Self {
            signature,
            host,
            fast,
        }
    }

    #[inline(always)]
    pub(crate) fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    // Invokes the callable by value. Reference cells in argument positions
    // are read through; nothing is written back.
    #[inline(always)]
    pub(crate) fn invoke(&self, receiver: Option<Cell>, args: Vec<Cell>) -> RuntimeResult<Cell> {
        self.enter(receiver, args, false)
    }

    // Invokes the callable, writing the post-call values of the by-ref
    // slots back into the caller's reference cells, in slot order.
    #[inline(always)]
    pub(crate) fn invoke_with_refs(
        &self,
        receiver: Option<Cell>,
        args: Vec<Cell>,
    ) -> RuntimeResult<Cell> {
        self.enter(receiver, args, true)
    }

    fn enter(
        &self,
        receiver: Option<Cell>,
        mut args: Vec<Cell>,
        write_back: bool,
    ) -> RuntimeResult<Cell> {
        if self.fast && receiver.is_none() && args.len() == 1 && !args[0].is_nil() {
            return self.dispatch(None, args, write_back);
        }

        let signature = self.signature.as_ref();

        // Trailing nils do not count toward the number of supplied
        // arguments. This lets callers pass a maximally sized argument
        // array without tracking an exact count.
        while matches!(args.last(), Some(Cell::Nil)) {
            let _ = args.pop();
        }

        let receiver = match (signature.is_instance(), receiver) {
            (true, None) => {
                if args.is_empty() {
                    return Err(self.arity_mismatch(0));
                }

                Some(args.remove(0))
            }

            (false, Some(receiver)) => {
                args.insert(0, receiver);

                None
            }

            (_, receiver) => receiver,
        };

        let provided = args.len();

        if provided < signature.min_params() {
            return Err(self.arity_mismatch(provided));
        }

        if !signature.is_variadic() && provided > signature.max_params() {
            return Err(self.arity_mismatch(provided));
        }

        let total = signature.arity();

        match signature.variadic_index() {
            Some(keys) if signature.is_indexer_setter() => {
                // The element setter frame is `[..fixed.., keys, value]`:
                // the value is the last supplied argument, and the keys are
                // everything between the fixed prefix and the value.
                if args.len() > keys {
                    let value = match args.pop() {
                        Some(value) => value,
                        None => Cell::nil(),
                    };

                    let tail = args.drain(keys..).collect::<Vec<_>>();

                    args.push(Cell::from(tail));
                    args.push(value);
                }
            }

            Some(index) => {
                if args.len() > total {
                    let tail = args.drain(index..).collect::<Vec<_>>();

                    args.push(Cell::from(tail));
                } else if args.len() == total && !matches!(args[index], Cell::Seq(_)) {
                    let lone = take(&mut args[index]);

                    args[index] = Cell::from(vec![lone]);
                }
            }

            None => (),
        }

        while args.len() < total {
            args.push(Cell::nil());
        }

        self.dispatch(receiver, args, write_back)
    }

    // The shape-dependent inner core: per-slot narrowing, default
    // substitution, dispatch to the underlying callable, and return-type
    // normalization.
    fn dispatch(
        &self,
        receiver: Option<Cell>,
        mut frame: Vec<Cell>,
        write_back: bool,
    ) -> RuntimeResult<Cell> {
        let signature = self.signature.as_ref();
        let function = signature.name();

        let mut write_backs: Vec<(usize, RefSlot)> = Vec::new();

        for index in 0..frame.len() {
            let supplied = take(&mut frame[index]);

            // A reference cell always counts as a present argument, even
            // when it currently holds nil: by-ref output slots start empty.
            let (supplied, was_ref) = match supplied {
                Cell::Ref(slot) => {
                    if write_back && signature.is_by_ref(index) {
                        write_backs.push((index, slot.clone()));
                    }

                    (slot.get(), true)
                }

                other => (other, false),
            };

            frame[index] = match supplied {
                Cell::Nil if was_ref => Cell::Nil,

                Cell::Nil => {
                    if signature.variadic_index() == Some(index) {
                        Cell::from(Vec::new())
                    } else if signature.is_optional(index) {
                        match signature.param(index).and_then(|param| param.default()) {
                            Some(default) => default.clone(),
                            None => Cell::nil(),
                        }
                    } else {
                        return Err(RuntimeError::MissingArgument {
                            function: function.clone(),
                            param: index,
                            param_name: signature
                                .param(index)
                                .and_then(|param| param.name())
                                .cloned(),
                        });
                    }
                }

                value => narrow(function, index, signature.params()[index].ty(), value)?,
            };
        }

        let result = (self.host)(receiver, &mut frame)?;

        for (index, slot) in write_backs {
            slot.set(frame[index].clone());
        }

        match signature.ret().is_nil() {
            true => Ok(Cell::nil()),
            false => Ok(result),
        }
    }

    #[inline(never)]
    #[cold]
    fn arity_mismatch(&self, arguments: usize) -> RuntimeError {
        let signature = self.signature.as_ref();

        RuntimeError::ArityMismatch {
            function: signature.name().clone(),
            min_params: signature.min_params(),
            max_params: match signature.is_variadic() {
                true => None,
                false => Some(signature.max_params()),
            },
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::runtime::{
        thunk::{HostFn, Thunk},
        Cell,
        FnDecl,
        Param,
        RuntimeError,
        ScriptTy,
        Signature,
        TypeKey,
    };

    // A host body that reflects its assembled frame back as a sequence.
    fn reflect() -> HostFn {
        Arc::new(|_receiver, frame| Ok(Cell::from(frame.to_vec())))
    }

    fn compile(decl: FnDecl) -> Thunk {
        let signature = match Signature::analyze(decl, false) {
            Ok(signature) => signature,
            Err(error) => panic!("unexpected analysis failure: {error}"),
        };

        Thunk::compile(Arc::new(signature), reflect())
    }

    fn frame_of(result: Cell) -> Vec<Cell> {
        match result {
            Cell::Seq(values) => values.to_vec(),
            other => panic!("not a frame: {other:?}"),
        }
    }

    fn seq(values: Vec<Cell>) -> Cell {
        Cell::from(values)
    }

    #[test]
    fn test_trailing_nil_insensitivity() {
        let thunk = compile(
            FnDecl::function("Probe")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::required("b", ScriptTy::Int))
                .ret(ScriptTy::Seq),
        );

        let plain = thunk.invoke(None, vec![Cell::Int(1), Cell::Int(2)]);

        let padded = thunk.invoke(
            None,
            vec![Cell::Int(1), Cell::Int(2), Cell::nil(), Cell::nil()],
        );

        assert_eq!(plain, padded);
    }

    #[test]
    fn test_arity_round_trip() {
        let thunk = compile(
            FnDecl::function("Probe")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::optional("b", ScriptTy::Int, Cell::Int(7)))
                .ret(ScriptTy::Seq),
        );

        let signature = thunk.signature();

        assert!(signature.min_params() <= signature.max_params());

        let minimal = thunk.invoke(None, vec![Cell::Int(1)]);
        let maximal = thunk.invoke(None, vec![Cell::Int(1), Cell::Int(2)]);

        assert!(!matches!(minimal, Err(RuntimeError::ArityMismatch { .. })));
        assert!(!matches!(maximal, Err(RuntimeError::ArityMismatch { .. })));

        // The omitted soft-optional slot receives its precomputed default.
        assert_eq!(minimal, Ok(seq(vec![Cell::Int(1), Cell::Int(7)])));
    }

    #[test]
    fn test_arity_overflow() {
        let thunk = compile(
            FnDecl::function("Probe")
                .param(Param::required("a", ScriptTy::Int))
                .ret(ScriptTy::Seq),
        );

        let result = thunk.invoke(None, vec![Cell::Int(1), Cell::Int(2)]);

        assert!(matches!(
            result,
            Err(RuntimeError::ArityMismatch { arguments: 2, .. }),
        ));
    }

    #[test]
    fn test_variadic_packing() {
        let thunk = compile(
            FnDecl::function("Gather")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::variadic("rest"))
                .ret(ScriptTy::Seq),
        );

        let gathered = thunk.invoke(
            None,
            vec![Cell::Int(1), Cell::Int(2), Cell::Int(3), Cell::Int(4)],
        );

        assert_eq!(
            gathered,
            Ok(seq(vec![
                Cell::Int(1),
                seq(vec![Cell::Int(2), Cell::Int(3), Cell::Int(4)]),
            ])),
        );

        let empty = thunk.invoke(None, vec![Cell::Int(1)]);

        assert_eq!(
            empty,
            Ok(seq(vec![Cell::Int(1), seq(Vec::new())])),
        );

        let lone = thunk.invoke(None, vec![Cell::Int(1), Cell::Int(2)]);

        assert_eq!(
            lone,
            Ok(seq(vec![Cell::Int(1), seq(vec![Cell::Int(2)])])),
        );
    }

    #[test]
    fn test_variadic_sequence_passes_through() {
        let thunk = compile(
            FnDecl::function("Gather")
                .param(Param::variadic("rest"))
                .ret(ScriptTy::Seq),
        );

        let packed = seq(vec![Cell::Int(5), Cell::Int(6)]);

        let result = thunk.invoke(None, vec![packed.clone()]);

        assert_eq!(result, Ok(seq(vec![packed])));
    }

    #[test]
    fn test_indexer_setter_packing() {
        let owner = TypeKey(0);

        let thunk = compile(
            FnDecl::setter(owner, "Item")
                .param(Param::variadic("keys"))
                .param(Param::required("value", ScriptTy::Any))
                .ret(ScriptTy::Seq),
        );

        let receiver = Cell::Int(0);

        let two_keys = thunk.invoke(
            Some(receiver.clone()),
            vec![Cell::Int(1), Cell::Int(2), Cell::give("v")],
        );

        assert_eq!(
            two_keys,
            Ok(seq(vec![
                seq(vec![Cell::Int(1), Cell::Int(2)]),
                Cell::give("v"),
            ])),
        );

        let no_keys = thunk.invoke(Some(receiver), vec![Cell::give("v")]);

        assert_eq!(
            no_keys,
            Ok(seq(vec![seq(Vec::new()), Cell::give("v")])),
        );
    }

    #[test]
    fn test_receiver_splicing() {
        let thunk = compile(
            FnDecl::method(TypeKey(0), "Probe")
                .param(Param::required("a", ScriptTy::Int))
                .ret(ScriptTy::Seq),
        );

        // Without an explicit receiver, the leading argument is consumed as
        // the receiver.
        let spliced = thunk.invoke(None, vec![Cell::give("self"), Cell::Int(1)]);

        assert_eq!(spliced, Ok(seq(vec![Cell::Int(1)])));

        // With an explicit receiver, all arguments stay in place.
        let explicit = thunk.invoke(Some(Cell::give("self")), vec![Cell::Int(1)]);

        assert_eq!(explicit, spliced);
    }

    #[test]
    fn test_free_function_receives_prepended_context() {
        let thunk = compile(
            FnDecl::function("Probe")
                .param(Param::required("ctx", ScriptTy::Any))
                .param(Param::required("a", ScriptTy::Int))
                .ret(ScriptTy::Seq),
        );

        let result = thunk.invoke(Some(Cell::give("ctx")), vec![Cell::Int(1)]);

        assert_eq!(result, Ok(seq(vec![Cell::give("ctx"), Cell::Int(1)])));
    }

    #[test]
    fn test_unit_return_normalization() {
        let thunk = compile(
            FnDecl::function("Silent").param(Param::required("a", ScriptTy::Int)),
        );

        let result = thunk.invoke(None, vec![Cell::Int(1)]);

        assert_eq!(result, Ok(Cell::nil()));
    }

    #[test]
    fn test_idempotent_compilation() {
        let signature = match Signature::analyze(
            FnDecl::function("Probe")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::variadic("rest"))
                .ret(ScriptTy::Seq),
            false,
        ) {
            Ok(signature) => Arc::new(signature),
            Err(error) => panic!("unexpected analysis failure: {error}"),
        };

        // Two racing compilations of the same descriptor must behave
        // identically for all valid inputs.
        let first = Thunk::compile(signature.clone(), reflect());
        let second = Thunk::compile(signature, reflect());

        let args = vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)];

        assert_eq!(
            first.invoke(None, args.clone()),
            second.invoke(None, args),
        );
    }

    #[test]
    fn test_middle_nil_is_omission() {
        let thunk = compile(
            FnDecl::function("Probe")
                .param(Param::required("a", ScriptTy::Int))
                .param(Param::required("b", ScriptTy::Int))
                .ret(ScriptTy::Seq),
        );

        let result = thunk.invoke(None, vec![Cell::nil(), Cell::Int(2)]);

        assert!(matches!(
            result,
            Err(RuntimeError::MissingArgument { param: 0, .. }),
        ));
    }
}
