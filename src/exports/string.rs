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

use std::sync::Arc;

use compact_str::{CompactString, ToCompactString};

use crate::runtime::{
    Cell,
    CatalogBuilder,
    FnDecl,
    Ident,
    Param,
    RuntimeError,
    RuntimeResult,
    ScriptTy,
    TypeKey,
};

// Members of the built-in `Str` type. Instances are plain
// [Str cells](Cell::Str); the receiver of every instance member below is
// expected to hold one.
pub(super) fn install(builder: &mut CatalogBuilder, string: TypeKey) {
    builder.declare(
        FnDecl::getter(string, "Length")
            .doc("The number of characters in the string.")
            .ret(ScriptTy::Int),
        Arc::new(|receiver, _frame| {
            let this = receive("Length", receiver)?;

            Ok(Cell::Int(this.chars().count() as i64))
        }),
    );

    builder.declare(
        FnDecl::method(string, "SubStr")
            .doc("Extracts a substring starting at the zero-based character \
                position. A negative length extends to the end of the string.")
            .param(Param::required("start", ScriptTy::Int))
            .param(Param::optional("length", ScriptTy::Int, Cell::Int(-1)))
            .ret(ScriptTy::Str),
        Arc::new(|receiver, frame| {
            let this = receive("SubStr", receiver)?;

            let [Cell::Int(start), Cell::Int(length)] = frame else {
                return Ok(Cell::nil());
            };

            let start = (*start).max(0) as usize;

            let tail = this.chars().skip(start);

            let result = match *length < 0 {
                true => tail.collect::<CompactString>(),
                false => tail.take(*length as usize).collect::<CompactString>(),
            };

            Ok(Cell::Str(result))
        }),
    );

    builder.declare(
        FnDecl::method(string, "Repeat")
            .doc("Repeats the string the specified number of times.")
            .param(Param::required("count", ScriptTy::Int))
            .ret(ScriptTy::Str),
        Arc::new(|receiver, frame| {
            let this = receive("Repeat", receiver)?;

            let [Cell::Int(count)] = frame else {
                return Ok(Cell::nil());
            };

            let count = (*count).max(0) as usize;

            Ok(Cell::Str(this.repeat(count).into()))
        }),
    );

    builder.declare(
        FnDecl::static_method(string, "Concat")
            .doc("Concatenates the supplied parts into one string. Numbers \
                are formatted in their canonical decimal form.")
            .param(Param::variadic("parts"))
            .ret(ScriptTy::Str),
        Arc::new(|_receiver, frame| {
            let [Cell::Seq(parts)] = frame else {
                return Ok(Cell::nil());
            };

            let mut result = CompactString::default();

            for part in parts.iter() {
                match part {
                    Cell::Str(string) => result.push_str(string),
                    Cell::Int(number) => result.push_str(&number.to_compact_string()),
                    Cell::Float(number) => result.push_str(&number.to_compact_string()),
                    Cell::Bool(flag) => result.push_str(&flag.to_compact_string()),

                    other => {
                        return Err(RuntimeError::HostFailure {
                            function: Ident::from("Concat"),
                            message: CompactString::new(format!(
                                "'{}' does not concatenate",
                                other.ty(),
                            )),
                        });
                    }
                }
            }

            Ok(Cell::Str(result))
        }),
    );
}

fn receive(function: &'static str, receiver: Option<Cell>) -> RuntimeResult<CompactString> {
    match receiver {
        Some(Cell::Str(string)) => Ok(string),

        other => Err(RuntimeError::TypeMismatch {
            function: Ident::from(function),
            param: 0,
            expected: ScriptTy::Str,
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
        runtime::{Cell, CatalogBuilder, Engine, TypeKey},
    };

    fn engine() -> (Engine, TypeKey) {
        let mut builder = CatalogBuilder::new();

        let types = exports::install(&mut builder);

        (builder.finish(), types.string)
    }

    #[test]
    fn test_length_getter() {
        let (engine, string) = engine();

        let length = engine.resolve_getter(string, "length", None).unwrap();

        assert!(length.signature().is_property());

        // The receiver splices from the leading argument.
        assert_eq!(length.call(vec![Cell::give("stella")]), Ok(Cell::Int(6)));
    }

    #[test]
    fn test_sub_str() {
        let (engine, string) = engine();

        let sub_str = engine.resolve(string, "SubStr", None).unwrap();

        let receiver = Cell::give("per aspera");

        assert_eq!(
            sub_str.call(vec![receiver.clone(), Cell::Int(4), Cell::Int(3)]),
            Ok(Cell::give("asp")),
        );

        // The omitted length extends to the end of the string.
        assert_eq!(
            sub_str.call(vec![receiver, Cell::Int(4)]),
            Ok(Cell::give("aspera")),
        );
    }

    #[test]
    fn test_concat_static() {
        let (engine, string) = engine();

        let concat = engine.resolve(string, "Concat", None).unwrap();

        assert!(concat.signature().is_static());

        assert_eq!(
            concat.call(vec![Cell::give("n = "), Cell::Int(9), Cell::give("!")]),
            Ok(Cell::give("n = 9!")),
        );
    }

    #[test]
    fn test_repeat_resolves_through_global_fallback() {
        let (engine, _) = engine();

        // `Concat` is a static member of `Str`; the reverse index makes it
        // callable as a top-level function as well.
        let concat = engine.resolve_global("Concat", Some(2)).unwrap();

        assert_eq!(
            concat.call(vec![Cell::give("a"), Cell::give("b")]),
            Ok(Cell::give("ab")),
        );
    }
}
