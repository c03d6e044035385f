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

mod catalog;
mod cell;
mod closeness;
mod coercion;
mod error;
mod function;
mod ident;
mod resolve;
mod signature;
mod thunk;
mod ty;

pub use crate::runtime::{
    catalog::{Catalog, CatalogBuilder},
    cell::{Cell, RefSlot, ScriptObject},
    closeness::{Closeness, StringEstimation},
    error::{NumberCastCause, RuntimeError, RuntimeResult, SignatureDefect},
    function::{BoundScriptFn, ScriptFn},
    ident::Ident,
    resolve::Engine,
    signature::{Dispatch, FnDecl, FnKind, Param, Signature},
    thunk::HostFn,
    ty::{ScriptTy, Surface, TypeDecl, TypeKey, TypeMeta},
};
