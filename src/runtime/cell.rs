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
    any::Any,
    fmt::{Debug, Formatter},
    sync::{Arc, RwLock},
};

use compact_str::CompactString;

use crate::runtime::{BoundScriptFn, ScriptFn, ScriptTy, TypeKey};

/// An instance of a host type held by the script environment.
///
/// Host objects are opaque to the engine: the invocation machinery only needs
/// to know the object's [catalog type](Self::ty); everything else is
/// downcast by the host function that receives the object.
pub trait ScriptObject: Debug + Send + Sync + 'static {
    /// Returns the catalog handle of the object's type.
    fn ty(&self) -> TypeKey;

    /// Grants access to the underlying Rust value for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A single boxed value of the script environment.
///
/// All arguments and results of dynamic invocations pass through this
/// representation. The Cell is cheap to clone: compound payloads (sequences,
/// host objects, callables, reference slots) are shared behind [Arc].
///
/// The [Default] Cell is [Nil](Cell::Nil), representing an absent value. In
/// argument positions, a trailing run of Nil cells does not count toward the
/// number of supplied arguments, and a Nil in the middle of an argument list
/// reads as "this argument was omitted".
#[derive(Clone, Default)]
pub enum Cell {
    /// An absent value.
    #[default]
    Nil,

    /// A boolean flag.
    Bool(bool),

    /// A signed machine integer.
    Int(i64),

    /// A double-precision float.
    Float(f64),

    /// A string of text.
    Str(CompactString),

    /// A sequence of values. Variadic arguments are packed into this variant.
    Seq(Arc<[Cell]>),

    /// An instance of a host type registered in the catalog.
    Object(Arc<dyn ScriptObject>),

    /// A first-class callable value.
    Fn(ScriptFn),

    /// A partially applied callable value.
    BoundFn(BoundScriptFn),

    /// A by-reference argument slot. See [RefSlot].
    Ref(RefSlot),
}

impl Debug for Cell {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nil => formatter.write_str("nil"),
            Self::Bool(value) => Debug::fmt(value, formatter),
            Self::Int(value) => Debug::fmt(value, formatter),
            Self::Float(value) => Debug::fmt(value, formatter),
            Self::Str(value) => Debug::fmt(value, formatter),
            Self::Seq(values) => formatter.debug_list().entries(values.iter()).finish(),
            Self::Object(object) => Debug::fmt(object, formatter),
            Self::Fn(function) => Debug::fmt(function, formatter),
            Self::BoundFn(function) => Debug::fmt(function, formatter),
            Self::Ref(slot) => formatter.write_fmt(format_args!("&{:?}", slot.get())),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(this), Self::Bool(other)) => this.eq(other),
            (Self::Int(this), Self::Int(other)) => this.eq(other),
            (Self::Float(this), Self::Float(other)) => this.eq(other),
            (Self::Str(this), Self::Str(other)) => this.eq(other),
            (Self::Seq(this), Self::Seq(other)) => this.eq(other),
            (Self::Object(this), Self::Object(other)) => Arc::ptr_eq(this, other),
            (Self::Fn(this), Self::Fn(other)) => this.eq(other),
            (Self::BoundFn(this), Self::BoundFn(other)) => this.eq(other),
            (Self::Ref(this), Self::Ref(other)) => this.ptr_eq(other),
            _ => false,
        }
    }
}

impl From<bool> for Cell {
    #[inline(always)]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Cell {
    #[inline(always)]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Cell {
    #[inline(always)]
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Cell {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Self::Str(CompactString::new(value))
    }
}

impl From<String> for Cell {
    #[inline(always)]
    fn from(value: String) -> Self {
        Self::Str(CompactString::from(value))
    }
}

impl From<Vec<Cell>> for Cell {
    #[inline(always)]
    fn from(values: Vec<Cell>) -> Self {
        Self::Seq(Arc::from(values))
    }
}

impl Cell {
    /// Returns an absent value.
    #[inline(always)]
    pub const fn nil() -> Self {
        Self::Nil
    }

    /// A convenient constructor that boxes `data` into a Cell.
    #[inline(always)]
    pub fn give(data: impl Into<Cell>) -> Self {
        data.into()
    }

    /// Boxes an instance of a host type.
    #[inline(always)]
    pub fn give_object(object: impl ScriptObject) -> Self {
        Self::Object(Arc::new(object))
    }

    /// Returns true if the Cell represents an absent value.
    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns the [static type tag](ScriptTy) of the boxed value.
    ///
    /// For a [reference slot](Cell::Ref), returns the tag of the value
    /// currently held by the slot.
    pub fn ty(&self) -> ScriptTy {
        match self {
            Self::Nil => ScriptTy::Nil,
            Self::Bool(_) => ScriptTy::Bool,
            Self::Int(_) => ScriptTy::Int,
            Self::Float(_) => ScriptTy::Float,
            Self::Str(_) => ScriptTy::Str,
            Self::Seq(_) => ScriptTy::Seq,
            Self::Object(_) => ScriptTy::Object,
            Self::Fn(_) | Self::BoundFn(_) => ScriptTy::Fn,
            Self::Ref(slot) => slot.get().ty(),
        }
    }

    /// If the Cell is a [reference slot](Cell::Ref), returns a copy of the
    /// value currently held by the slot; otherwise returns the Cell itself.
    #[inline]
    pub fn read_through(self) -> Self {
        match self {
            Self::Ref(slot) => slot.get(),
            other => other,
        }
    }
}

/// A by-reference argument cell.
///
/// When a formal parameter of a host callable is declared by-ref, the caller
/// passes a RefSlot in the corresponding argument position. The engine reads
/// the slot's current value before the invocation, and after the callable
/// returns, writes the (possibly mutated) post-call argument back into the
/// slot — even if the callable never touched it.
///
/// The slot is shared: clones of a RefSlot observe each other's writes.
#[derive(Clone)]
pub struct RefSlot {
    inner: Arc<RwLock<Cell>>,
}

impl Debug for RefSlot {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("RefSlot({:?})", self.get()))
    }
}

impl Default for RefSlot {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Cell::nil())
    }
}

impl RefSlot {
    /// Creates a new slot holding `value`.
    #[inline(always)]
    pub fn new(value: Cell) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Returns a copy of the value currently held by the slot.
    #[inline]
    pub fn get(&self) -> Cell {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poison| poison.into_inner());

        guard.clone()
    }

    /// Replaces the value held by the slot.
    #[inline]
    pub fn set(&self, value: Cell) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poison| poison.into_inner());

        *guard = value;
    }

    /// Returns true if both objects refer to the same underlying slot.
    #[inline(always)]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{Cell, RefSlot};

    #[test]
    fn test_cell_defaults_to_nil() {
        assert!(Cell::default().is_nil());
        assert_eq!(Cell::nil(), Cell::default());
    }

    #[test]
    fn test_ref_slot_sharing() {
        let slot = RefSlot::new(Cell::Int(10));
        let alias = slot.clone();

        slot.set(Cell::Int(20));

        assert_eq!(alias.get(), Cell::Int(20));
        assert!(slot.ptr_eq(&alias));
    }

    #[test]
    fn test_read_through() {
        let slot = RefSlot::new(Cell::give("text"));

        assert_eq!(Cell::Ref(slot).read_through(), Cell::give("text"));
        assert_eq!(Cell::Int(5).read_through(), Cell::Int(5));
    }
}
