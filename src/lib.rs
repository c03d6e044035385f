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

//! # Per Aspera
//!
//! A dynamic invocation engine for embeddable scripting languages.
//!
//! Per Aspera lets a dynamically typed interpreter call into a large,
//! statically typed host surface — functions, instance and static methods,
//! simple and indexed properties — by name and argument count, without the
//! interpreter knowing ahead of time which overload, arity, or parameter
//! shape it will hit.
//!
//! The engine consists of four tightly coupled pieces:
//!
//!  1. A [Signature](crate::runtime::Signature) descriptor per host
//!     callable, precomputing its arity bounds, variadic slot, soft-optional
//!     slots, and by-ref slots.
//!  2. A call thunk per descriptor — a uniform `(receiver, args) -> result`
//!     adapter compiled once and cached, handling argument-count validation,
//!     receiver splicing, variadic packing, default substitution, and
//!     return normalization.
//!  3. A resolution [Engine](crate::runtime::Engine) that finds the right
//!     callable for a dynamic call site by case-insensitive name and arity,
//!     walking the type hierarchy of the receiver, and memoizing the walks.
//!  4. First-class callable values — [ScriptFn](crate::runtime::ScriptFn)
//!     and [BoundScriptFn](crate::runtime::BoundScriptFn) — that scripts
//!     store, pass, partially apply, and invoke as ordinary values.
//!
//! The host surface is registered explicitly during startup:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use per_aspera::{
//!     exports,
//!     runtime::{Cell, CatalogBuilder, FnDecl, Param, ScriptTy},
//! };
//!
//! let mut builder = CatalogBuilder::new();
//!
//! // The built-in library surface: Any, Str, List, and the numeric
//! // top-level functions.
//! let std_types = exports::install(&mut builder);
//!
//! // A host function of the user program.
//! builder.declare(
//!     FnDecl::function("Greet")
//!         .param(Param::required("name", ScriptTy::Str))
//!         .ret(ScriptTy::Str),
//!     Arc::new(|_receiver, frame| match frame {
//!         [Cell::Str(name)] => Ok(Cell::give(format!("Hello, {name}!"))),
//!         _ => Ok(Cell::nil()),
//!     }),
//! );
//!
//! let engine = builder.finish();
//!
//! // The interpreter resolves and invokes by name and arity.
//! let greet = engine.resolve_global("greet", Some(1)).unwrap();
//!
//! assert_eq!(
//!     greet.call(vec![Cell::give("world")]),
//!     Ok(Cell::give("Hello, world!")),
//! );
//!
//! // Callables are first-class values supporting partial application.
//! let substr = engine.resolve(std_types.string, "SubStr", None).unwrap();
//!
//! let tail = substr
//!     .bind(vec![Cell::give("per aspera"), Cell::Int(4)])
//!     .unwrap();
//!
//! assert_eq!(tail.call(vec![]), Ok(Cell::give("aspera")));
//! ```
//!
//! The lexer, parser, and compiler of the scripting language, as well as any
//! GUI or OS binding layers, are external collaborators: they consume the
//! engine through the [runtime] API surface and do not participate in its
//! internal design.

mod report;

/// The built-in library surface registered on top of the invocation core.
pub mod exports;

/// The invocation core: boxed values, signature descriptors, the resolution
/// engine, and first-class callable values.
pub mod runtime;
