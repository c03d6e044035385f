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

//! The built-in library surface of the engine.
//!
//! The [install] function registers a small standard surface on top of which
//! the embedder declares the user program types: the root `Any` type, the
//! `Str` string type, the `List` container type, and a handful of top-level
//! numeric functions.
//!
//! Everything registered here belongs to the [library
//! surface](crate::runtime::Surface::Library): member resolution treats
//! these types as built-in, and scripts observe their callables with the
//! `is_builtin` introspection flag set.

mod list;
mod number;
mod string;

use crate::runtime::{CatalogBuilder, Surface, TypeDecl, TypeKey};

pub use crate::exports::list::List;

/// The catalog handles of the built-in library types.
#[derive(Clone, Copy, Debug)]
pub struct StdTypes {
    /// The root type of the hierarchy. Every other built-in type derives
    /// from it.
    pub any: TypeKey,

    /// The string type. Instances are [Str cells](crate::runtime::Cell::Str).
    pub string: TypeKey,

    /// The container type. Instances are [List] host objects.
    pub list: TypeKey,
}

/// Registers the built-in library surface and returns the handles of its
/// types.
pub fn install(builder: &mut CatalogBuilder) -> StdTypes {
    let any = builder.define(
        TypeDecl::new("Any")
            .surface(Surface::Library)
            .doc("The root of the built-in type hierarchy."),
    );

    let string = builder.define(
        TypeDecl::new("Str")
            .parent(any)
            .surface(Surface::Library)
            .doc("A string of text."),
    );

    let list = builder.define(
        TypeDecl::new("List")
            .parent(any)
            .surface(Surface::Library)
            .doc("A growable sequence of values."),
    );

    number::install(builder);
    string::install(builder, string);
    list::install(builder, list);

    StdTypes { any, string, list }
}
