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

use crate::runtime::{
    Cell,
    CatalogBuilder,
    FnDecl,
    Ident,
    Param,
    RuntimeError,
    RuntimeResult,
    ScriptObject,
    ScriptTy,
    TypeKey,
};

/// A growable container of the built-in library surface.
///
/// The container is shared: clones of the boxed instance observe each
/// other's mutations. Scripts reach the elements through the indexed `Item`
/// property; nested lists are addressed by supplying several keys at once.
pub struct List {
    ty: TypeKey,
    items: RwLock<Vec<Cell>>,
}

impl Debug for List {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.debug_list().entries(self.items().iter()).finish()
    }
}

impl ScriptObject for List {
    #[inline(always)]
    fn ty(&self) -> TypeKey {
        self.ty
    }

    #[inline(always)]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl List {
    /// Creates a new container of the catalog type `ty` with the initial
    /// `items`.
    #[inline(always)]
    pub fn new(ty: TypeKey, items: Vec<Cell>) -> Self {
        Self {
            ty,
            items: RwLock::new(items),
        }
    }

    /// Returns a snapshot of the elements.
    #[inline]
    pub fn items(&self) -> Vec<Cell> {
        let guard = self
            .items
            .read()
            .unwrap_or_else(|poison| poison.into_inner());

        guard.clone()
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        let guard = self
            .items
            .read()
            .unwrap_or_else(|poison| poison.into_inner());

        guard.len()
    }

    /// Returns true if the container has no elements.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<Cell> {
        let guard = self
            .items
            .read()
            .unwrap_or_else(|poison| poison.into_inner());

        guard.get(index).cloned()
    }

    fn set(&self, index: usize, value: Cell) -> bool {
        let mut guard = self
            .items
            .write()
            .unwrap_or_else(|poison| poison.into_inner());

        match guard.get_mut(index) {
            Some(slot) => {
                *slot = value;

                true
            }

            None => false,
        }
    }

    fn push(&self, items: &[Cell]) -> usize {
        let mut guard = self
            .items
            .write()
            .unwrap_or_else(|poison| poison.into_inner());

        guard.extend(items.iter().cloned());

        guard.len()
    }

    fn pop(&self) -> Cell {
        let mut guard = self
            .items
            .write()
            .unwrap_or_else(|poison| poison.into_inner());

        guard.pop().unwrap_or(Cell::Nil)
    }
}

// Members of the built-in `List` type.
pub(super) fn install(builder: &mut CatalogBuilder, list: TypeKey) {
    builder.declare(
        FnDecl::function("List")
            .library()
            .doc("Creates a new list holding the supplied items.")
            .param(Param::variadic("items"))
            .ret(ScriptTy::Object),
        Arc::new(move |_receiver, frame| {
            let items = match frame {
                [Cell::Seq(items)] => items.to_vec(),
                _ => Vec::new(),
            };

            Ok(Cell::give_object(List::new(list, items)))
        }),
    );

    builder.declare(
        FnDecl::getter(list, "Length")
            .doc("The number of elements in the list.")
            .ret(ScriptTy::Int),
        Arc::new(|receiver, _frame| {
            let object = receive("Length", receiver)?;
            let this = as_list(&object)?;

            Ok(Cell::Int(this.len() as i64))
        }),
    );

    builder.declare(
        FnDecl::method(list, "Push")
            .doc("Appends the supplied items and returns the new length.")
            .param(Param::variadic("items"))
            .ret(ScriptTy::Int),
        Arc::new(|receiver, frame| {
            let object = receive("Push", receiver)?;
            let this = as_list(&object)?;

            let pushed = match frame {
                [Cell::Seq(items)] => this.push(items),
                _ => this.len(),
            };

            Ok(Cell::Int(pushed as i64))
        }),
    );

    builder.declare(
        FnDecl::method(list, "Pop")
            .doc("Removes and returns the last element, or nil if the list \
                is empty.")
            .ret(ScriptTy::Any),
        Arc::new(|receiver, _frame| {
            let object = receive("Pop", receiver)?;
            let this = as_list(&object)?;

            Ok(this.pop())
        }),
    );

    builder.declare(
        FnDecl::getter(list, "Item")
            .doc("Reads an element. Several keys address nested lists.")
            .param(Param::variadic("keys"))
            .ret(ScriptTy::Any),
        Arc::new(|receiver, frame| {
            let object = receive("Item", receiver)?;

            let [Cell::Seq(keys)] = frame else {
                return Ok(Cell::nil());
            };

            let (last, prefix) = match keys.split_last() {
                Some(split) => split,
                None => return Err(no_keys("Item")),
            };

            let target = descend(object, prefix)?;
            let target = as_list(&target)?;
            let index = index_of(target, last)?;

            match target.get(index) {
                Some(value) => Ok(value),

                // `index_of` validated the bounds, but a concurrent shrink
                // may outrun this read.
                None => Err(out_of_bounds(index, target.len())),
            }
        }),
    );

    builder.declare(
        FnDecl::setter(list, "Item")
            .doc("Writes an element. Several keys address nested lists.")
            .param(Param::variadic("keys"))
            .param(Param::required("value", ScriptTy::Any)),
        Arc::new(|receiver, frame| {
            let object = receive("Item", receiver)?;

            let [Cell::Seq(keys), value] = frame else {
                return Ok(Cell::nil());
            };

            let (last, prefix) = match keys.split_last() {
                Some(split) => split,
                None => return Err(no_keys("Item")),
            };

            let target = descend(object, prefix)?;
            let target = as_list(&target)?;
            let index = index_of(target, last)?;

            match target.set(index, value.clone()) {
                true => Ok(Cell::nil()),
                false => Err(out_of_bounds(index, target.len())),
            }
        }),
    );
}

// Follows the key prefix through nested lists, starting at `start`.
fn descend(
    start: Arc<dyn ScriptObject>,
    prefix: &[Cell],
) -> RuntimeResult<Arc<dyn ScriptObject>> {
    let mut current = start;

    for key in prefix {
        let list = as_list(&current)?;
        let index = index_of(list, key)?;

        let next = match list.get(index) {
            Some(Cell::Object(object)) => object,

            Some(other) => {
                return Err(RuntimeError::HostFailure {
                    function: Ident::from("Item"),
                    message: CompactString::new(format!(
                        "element {index} is '{}', not a nested list",
                        other.ty(),
                    )),
                });
            }

            None => return Err(out_of_bounds(index, list.len())),
        };

        current = next;
    }

    Ok(current)
}

fn as_list(object: &Arc<dyn ScriptObject>) -> RuntimeResult<&List> {
    match object.as_any().downcast_ref::<List>() {
        Some(list) => Ok(list),

        None => Err(RuntimeError::HostFailure {
            function: Ident::from("Item"),
            message: CompactString::new("the receiver is not a list"),
        }),
    }
}

fn index_of(list: &List, key: &Cell) -> RuntimeResult<usize> {
    let index = match key {
        Cell::Int(index) => *index,

        other => {
            return Err(RuntimeError::HostFailure {
                function: Ident::from("Item"),
                message: CompactString::new(format!("'{}' is not an index", other.ty())),
            });
        }
    };

    if index < 0 || index as usize >= list.len() {
        return Err(out_of_bounds(index.max(0) as usize, list.len()));
    }

    Ok(index as usize)
}

fn out_of_bounds(index: usize, length: usize) -> RuntimeError {
    RuntimeError::HostFailure {
        function: Ident::from("Item"),
        message: CompactString::new(format!("index {index} out of 0..{length} bounds")),
    }
}

fn no_keys(function: &'static str) -> RuntimeError {
    RuntimeError::HostFailure {
        function: Ident::from(function),
        message: CompactString::new("at least one key required"),
    }
}

fn receive(
    function: &'static str,
    receiver: Option<Cell>,
) -> RuntimeResult<Arc<dyn ScriptObject>> {
    match receiver {
        Some(Cell::Object(object)) => Ok(object),

        other => Err(RuntimeError::TypeMismatch {
            function: Ident::from(function),
            param: 0,
            expected: ScriptTy::Object,
            provided: match other {
                Some(cell) => cell.ty(),
                None => ScriptTy::Nil,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        exports,
        runtime::{Cell, CatalogBuilder, Engine, RuntimeError, TypeKey},
    };

    fn engine() -> (Engine, TypeKey) {
        let mut builder = CatalogBuilder::new();

        let types = exports::install(&mut builder);

        (builder.finish(), types.list)
    }

    fn new_list(engine: &Engine, items: Vec<Cell>) -> Cell {
        let constructor = engine.resolve_global("List", None).unwrap();

        constructor.call(items).unwrap()
    }

    #[test]
    fn test_push_and_length() {
        let (engine, list) = engine();

        let instance = new_list(&engine, vec![Cell::Int(1)]);

        let push = engine.resolve(list, "Push", None).unwrap();
        let length = engine.resolve_getter(list, "Length", None).unwrap();

        assert_eq!(
            push.call(vec![instance.clone(), Cell::Int(2), Cell::Int(3)]),
            Ok(Cell::Int(3)),
        );

        assert_eq!(length.call(vec![instance]), Ok(Cell::Int(3)));
    }

    #[test]
    fn test_item_round_trip() {
        let (engine, list) = engine();

        let instance = new_list(&engine, vec![Cell::Int(10), Cell::Int(20)]);

        let getter = engine.resolve_getter(list, "Item", None).unwrap();
        let setter = engine.resolve_setter(list, "Item", None).unwrap();

        assert_eq!(
            getter.call(vec![instance.clone(), Cell::Int(1)]),
            Ok(Cell::Int(20)),
        );

        let written = setter.call(vec![instance.clone(), Cell::Int(1), Cell::give("new")]);

        assert_eq!(written, Ok(Cell::nil()));

        assert_eq!(
            getter.call(vec![instance, Cell::Int(1)]),
            Ok(Cell::give("new")),
        );
    }

    #[test]
    fn test_nested_item_keys() {
        let (engine, list) = engine();

        let inner = new_list(&engine, vec![Cell::give("deep")]);
        let outer = new_list(&engine, vec![Cell::Int(0), inner]);

        let getter = engine.resolve_getter(list, "Item", None).unwrap();
        let setter = engine.resolve_setter(list, "Item", None).unwrap();

        assert_eq!(
            getter.call(vec![outer.clone(), Cell::Int(1), Cell::Int(0)]),
            Ok(Cell::give("deep")),
        );

        let written = setter.call(vec![
            outer.clone(),
            Cell::Int(1),
            Cell::Int(0),
            Cell::give("deeper"),
        ]);

        assert_eq!(written, Ok(Cell::nil()));

        assert_eq!(
            getter.call(vec![outer, Cell::Int(1), Cell::Int(0)]),
            Ok(Cell::give("deeper")),
        );
    }

    #[test]
    fn test_item_requires_keys() {
        let (engine, list) = engine();

        let instance = new_list(&engine, vec![Cell::Int(1)]);

        let getter = engine.resolve_getter(list, "Item", None).unwrap();

        let result = getter.call(vec![instance]);

        assert!(matches!(result, Err(RuntimeError::HostFailure { .. })));
    }

    #[test]
    fn test_item_out_of_bounds() {
        let (engine, list) = engine();

        let instance = new_list(&engine, vec![Cell::Int(1)]);

        let getter = engine.resolve_getter(list, "Item", None).unwrap();

        let result = getter.call(vec![instance, Cell::Int(5)]);

        assert!(matches!(result, Err(RuntimeError::HostFailure { .. })));
    }

    #[test]
    fn test_pop() {
        let (engine, list) = engine();

        let instance = new_list(&engine, vec![Cell::Int(1)]);

        let pop = engine.resolve(list, "Pop", None).unwrap();

        assert_eq!(pop.call(vec![instance.clone()]), Ok(Cell::Int(1)));
        assert_eq!(pop.call(vec![instance]), Ok(Cell::nil()));
    }
}
