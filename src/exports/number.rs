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

use compact_str::CompactString;

use crate::runtime::{
    Cell,
    CatalogBuilder,
    FnDecl,
    Ident,
    Param,
    RuntimeError,
    RuntimeResult,
    ScriptTy,
};

// Top-level numeric functions of the library surface.
pub(super) fn install(builder: &mut CatalogBuilder) {
    builder.declare(
        FnDecl::function("Abs")
            .library()
            .doc("Returns the absolute value of a number.")
            .param(Param::required("x", ScriptTy::Float))
            .ret(ScriptTy::Float),
        Arc::new(|_receiver, frame| match frame {
            [Cell::Float(x)] => Ok(Cell::Float(x.abs())),
            _ => Ok(Cell::nil()),
        }),
    );

    builder.declare(
        FnDecl::function("Min")
            .library()
            .doc("Returns the smallest of the supplied numbers.")
            .param(Param::required("first", ScriptTy::Float))
            .param(Param::variadic("rest"))
            .ret(ScriptTy::Float),
        Arc::new(|_receiver, frame| fold_numbers("Min", frame, f64::min)),
    );

    builder.declare(
        FnDecl::function("Max")
            .library()
            .doc("Returns the largest of the supplied numbers.")
            .param(Param::required("first", ScriptTy::Float))
            .param(Param::variadic("rest"))
            .ret(ScriptTy::Float),
        Arc::new(|_receiver, frame| fold_numbers("Max", frame, f64::max)),
    );

    builder.declare(
        FnDecl::function("Round")
            .library()
            .doc("Rounds a number to the specified number of decimal digits.")
            .param(Param::required("x", ScriptTy::Float))
            .param(Param::optional("digits", ScriptTy::Int, Cell::Int(0)))
            .ret(ScriptTy::Float),
        Arc::new(|_receiver, frame| match frame {
            [Cell::Float(x), Cell::Int(digits)] => {
                let scale = 10f64.powi(*digits as i32);

                Ok(Cell::Float((*x * scale).round() / scale))
            }

            _ => Ok(Cell::nil()),
        }),
    );

    builder.declare(
        FnDecl::function("DivMod")
            .library()
            .doc("Divides two integers, storing the quotient and the remainder \
                into the by-ref output slots.")
            .param(Param::required("a", ScriptTy::Int))
            .param(Param::required("b", ScriptTy::Int))
            .param(Param::required("quot", ScriptTy::Any).by_ref())
            .param(Param::required("rem", ScriptTy::Any).by_ref()),
        Arc::new(|_receiver, frame| match frame {
            [Cell::Int(a), Cell::Int(b), quot, rem] => {
                let (a, b) = (*a, *b);

                if b == 0 {
                    return Err(RuntimeError::HostFailure {
                        function: Ident::from("DivMod"),
                        message: CompactString::new("division by zero"),
                    });
                }

                *quot = Cell::Int(a / b);
                *rem = Cell::Int(a % b);

                Ok(Cell::nil())
            }

            _ => Ok(Cell::nil()),
        }),
    );
}

fn fold_numbers(
    function: &'static str,
    frame: &mut [Cell],
    fold: fn(f64, f64) -> f64,
) -> RuntimeResult<Cell> {
    let [Cell::Float(first), Cell::Seq(rest)] = frame else {
        return Ok(Cell::nil());
    };

    let mut result = *first;

    for cell in rest.iter() {
        let number = match cell {
            Cell::Int(number) => *number as f64,
            Cell::Float(number) => *number,

            other => {
                return Err(RuntimeError::HostFailure {
                    function: Ident::from(function),
                    message: CompactString::new(format!(
                        "'{}' is not a number",
                        other.ty(),
                    )),
                });
            }
        };

        result = fold(result, number);
    }

    Ok(Cell::Float(result))
}

#[cfg(test)]
mod tests {
    use crate::{
        exports,
        runtime::{Cell, CatalogBuilder, Engine, RefSlot, RuntimeError},
    };

    fn engine() -> Engine {
        let mut builder = CatalogBuilder::new();

        let _ = exports::install(&mut builder);

        builder.finish()
    }

    #[test]
    fn test_abs() {
        let engine = engine();

        let abs = engine.resolve_global("abs", Some(1)).unwrap();

        assert!(abs.is_builtin());
        assert_eq!(abs.call(vec![Cell::Float(-2.5)]), Ok(Cell::Float(2.5)));

        // Integer arguments narrow to the float slot.
        assert_eq!(abs.call(vec![Cell::Int(-3)]), Ok(Cell::Float(3.0)));
    }

    #[test]
    fn test_min_max_variadic() {
        let engine = engine();

        let min = engine.resolve_global("Min", Some(3)).unwrap();
        let max = engine.resolve_global("Max", Some(3)).unwrap();

        let args = vec![Cell::Float(3.0), Cell::Int(1), Cell::Float(2.0)];

        assert_eq!(min.call(args.clone()), Ok(Cell::Float(1.0)));
        assert_eq!(max.call(args), Ok(Cell::Float(3.0)));

        // A single argument packs an empty rest sequence.
        assert_eq!(min.call(vec![Cell::Float(4.0)]), Ok(Cell::Float(4.0)));
    }

    #[test]
    fn test_round_default_digits() {
        let engine = engine();

        let round = engine.resolve_global("Round", None).unwrap();

        assert_eq!(round.call(vec![Cell::Float(2.71828)]), Ok(Cell::Float(3.0)));

        assert_eq!(
            round.call(vec![Cell::Float(2.71828), Cell::Int(2)]),
            Ok(Cell::Float(2.72)),
        );
    }

    #[test]
    fn test_div_mod_by_ref() {
        let engine = engine();

        let div_mod = engine.resolve_global("DivMod", Some(4)).unwrap();

        let quot = RefSlot::new(Cell::nil());
        let rem = RefSlot::new(Cell::nil());

        let result = div_mod.call_with_refs(vec![
            Cell::Int(17),
            Cell::Int(5),
            Cell::Ref(quot.clone()),
            Cell::Ref(rem.clone()),
        ]);

        assert_eq!(result, Ok(Cell::nil()));
        assert_eq!(quot.get(), Cell::Int(3));
        assert_eq!(rem.get(), Cell::Int(2));
    }

    #[test]
    fn test_div_mod_by_zero() {
        let engine = engine();

        let div_mod = engine.resolve_global("DivMod", Some(4)).unwrap();

        let quot = RefSlot::new(Cell::nil());
        let rem = RefSlot::new(Cell::nil());

        let result = div_mod.call_with_refs(vec![
            Cell::Int(17),
            Cell::Int(0),
            Cell::Ref(quot),
            Cell::Ref(rem),
        ]);

        assert!(matches!(result, Err(RuntimeError::HostFailure { .. })));
    }
}
