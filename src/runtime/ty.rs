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

use std::fmt::{Debug, Display, Formatter};

use crate::runtime::Ident;

/// A handle of a host type registered in the [Catalog](crate::runtime::Catalog).
///
/// The handle is cheap to copy and is only meaningful within the catalog
/// that issued it. Using a key of one catalog against another catalog is a
/// host programming error.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TypeKey(pub(crate) u32);

impl Debug for TypeKey {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("TypeKey({})", self.0))
    }
}

/// A declaration surface of a host type.
///
/// The resolution machinery distinguishes the standard surface of the host
/// (the built-in library), the types declared by the user program on top of
/// it, and the types of the host process itself that are not exposed to
/// scripts.
///
/// Member resolution walks the inheritance chain through [Library](Surface::Library)
/// and [Program](Surface::Program) types freely, but it does not cross into
/// the [Host](Surface::Host) surface unless the lookup started there.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Surface {
    /// The host's own standard library surface.
    Library,

    /// A type declared by the user program.
    Program,

    /// An internal type of the host process, hidden from ordinary lookups.
    Host,
}

impl Surface {
    /// Returns true if the type belongs to the host's standard library.
    #[inline(always)]
    pub fn is_library(self) -> bool {
        matches!(self, Self::Library)
    }

    /// Returns true if the type was declared by the user program.
    #[inline(always)]
    pub fn is_program(self) -> bool {
        matches!(self, Self::Program)
    }

    /// Returns true if the type belongs to the host process internals.
    #[inline(always)]
    pub fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }
}

/// An introspection metadata of a host type registered in the
/// [Catalog](crate::runtime::Catalog).
///
/// The [Display] implementation prints the user-facing name of the type.
pub struct TypeMeta {
    pub(crate) key: TypeKey,
    pub(crate) name: Ident,
    pub(crate) parent: Option<TypeKey>,
    pub(crate) surface: Surface,
    pub(crate) doc: Option<&'static str>,
}

impl Debug for TypeMeta {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TypeMeta")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("surface", &self.surface)
            .finish()
    }
}

impl Display for TypeMeta {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.name, formatter)
    }
}

impl PartialEq for TypeMeta {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.key.eq(&other.key)
    }
}

impl Eq for TypeMeta {}

impl TypeMeta {
    /// Returns the catalog handle of this type.
    #[inline(always)]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Returns the user-facing name of the type.
    #[inline(always)]
    pub fn name(&self) -> &Ident {
        &self.name
    }

    /// Returns the handle of the parent type, if the type has one.
    #[inline(always)]
    pub fn parent(&self) -> Option<TypeKey> {
        self.parent
    }

    /// Returns the declaration surface of the type.
    #[inline(always)]
    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Returns true if the type belongs to the host's standard library
    /// surface.
    #[inline(always)]
    pub fn is_builtin(&self) -> bool {
        self.surface.is_library()
    }

    /// Returns the documentation of the type, if available.
    #[inline(always)]
    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

/// A registration record of one host type.
///
/// The host surface declares its types by feeding these records into the
/// [CatalogBuilder](crate::runtime::CatalogBuilder) before any callables of
/// the type are declared.
#[derive(Clone)]
pub struct TypeDecl {
    pub(crate) name: Ident,
    pub(crate) parent: Option<TypeKey>,
    pub(crate) surface: Surface,
    pub(crate) doc: Option<&'static str>,
}

impl TypeDecl {
    /// Starts the declaration of a user program type without a parent.
    #[inline]
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            surface: Surface::Program,
            doc: None,
        }
    }

    /// Declares the parent type. Member resolution walks from the type to
    /// its parent when the type itself does not declare the requested
    /// member.
    #[inline(always)]
    pub fn parent(mut self, parent: TypeKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declares the surface the type belongs to. The default is
    /// [Program](Surface::Program).
    #[inline(always)]
    pub fn surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    /// Attaches documentation to the type.
    #[inline(always)]
    pub fn doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }
}

/// A static type of a formal parameter or a returned object, as the Script
/// Engine sees it.
///
/// Dynamic [Cells](crate::runtime::Cell) are narrowed to these types when the
/// engine assembles arguments of an underlying host function, and widened
/// back when the function returns.
///
/// The [Display] implementation prints the user-facing name of the type tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ScriptTy {
    /// A placeholder of a value that passes through without narrowing.
    Any,

    /// The unit type of inaccessible data. As a return type, it denotes a
    /// function that does not return a value.
    Nil,

    /// A boolean flag.
    Bool,

    /// A signed machine integer.
    Int,

    /// A double-precision float.
    Float,

    /// A string of text.
    Str,

    /// A sequence of dynamic values. Variadic parameters receive their
    /// excess arguments packed into this type.
    Seq,

    /// A plain or bound callable value.
    Fn,

    /// An instance of a host type registered in the catalog.
    Object,
}

impl Display for ScriptTy {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::Nil => "nil",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Seq => "seq",
            Self::Fn => "fn",
            Self::Object => "object",
        };

        formatter.write_str(name)
    }
}

impl ScriptTy {
    /// Returns true if this tag is the [Nil](Self::Nil) type.
    #[inline(always)]
    pub fn is_nil(self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns true if this tag is the [Any](Self::Any) placeholder.
    #[inline(always)]
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::Any)
    }
}
