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

use compact_str::ToCompactString;

use crate::runtime::{Cell, Ident, NumberCastCause, RuntimeError, RuntimeResult, ScriptTy};

// Narrows a dynamic argument to the static type of a formal parameter slot.
//
// Coercion failures are hard errors at call time; the engine never defaults
// a value that failed to narrow.
pub(crate) fn narrow(
    function: &Ident,
    param: usize,
    expected: ScriptTy,
    value: Cell,
) -> RuntimeResult<Cell> {
    let provided = value.ty();

    let mismatch = |provided: ScriptTy| RuntimeError::TypeMismatch {
        function: function.clone(),
        param,
        expected,
        provided,
    };

    match expected {
        ScriptTy::Any => Ok(value),

        ScriptTy::Int => match value {
            Cell::Int(_) => Ok(value),

            Cell::Bool(flag) => Ok(Cell::Int(flag as i64)),

            Cell::Float(number) => match cast::i64(number) {
                Ok(number) => Ok(Cell::Int(number)),

                Err(cause) => Err(RuntimeError::NumberCast {
                    function: function.clone(),
                    param,
                    from: ScriptTy::Float,
                    to: ScriptTy::Int,
                    cause: cast_cause(cause),
                }),
            },

            Cell::Str(string) => match string.trim().parse::<i64>() {
                Ok(number) => Ok(Cell::Int(number)),

                Err(_) => Err(RuntimeError::PrimitiveParse {
                    function: function.clone(),
                    param,
                    to: ScriptTy::Int,
                    input: string,
                }),
            },

            other => Err(mismatch(other.ty())),
        },

        ScriptTy::Float => match value {
            Cell::Float(_) => Ok(value),

            Cell::Int(number) => Ok(Cell::Float(cast::f64(number))),

            Cell::Str(string) => match string.trim().parse::<f64>() {
                Ok(number) => Ok(Cell::Float(number)),

                Err(_) => Err(RuntimeError::PrimitiveParse {
                    function: function.clone(),
                    param,
                    to: ScriptTy::Float,
                    input: string,
                }),
            },

            other => Err(mismatch(other.ty())),
        },

        ScriptTy::Str => match value {
            Cell::Str(_) => Ok(value),
            Cell::Int(number) => Ok(Cell::Str(number.to_compact_string())),
            Cell::Float(number) => Ok(Cell::Str(number.to_compact_string())),
            other => Err(mismatch(other.ty())),
        },

        ScriptTy::Bool => match value {
            Cell::Bool(_) => Ok(value),
            Cell::Int(number) => Ok(Cell::Bool(number != 0)),
            other => Err(mismatch(other.ty())),
        },

        ScriptTy::Seq => match value {
            Cell::Seq(_) => Ok(value),
            other => Err(mismatch(other.ty())),
        },

        ScriptTy::Fn => match value {
            Cell::Fn(_) | Cell::BoundFn(_) => Ok(value),
            other => Err(mismatch(other.ty())),
        },

        ScriptTy::Object => match value {
            Cell::Object(_) => Ok(value),
            other => Err(mismatch(other.ty())),
        },

        ScriptTy::Nil => Err(mismatch(provided)),
    }
}

#[inline(always)]
fn cast_cause(error: cast::Error) -> NumberCastCause {
    match error {
        cast::Error::Infinite => NumberCastCause::Infinite,
        cast::Error::NaN => NumberCastCause::NAN,
        cast::Error::Overflow => NumberCastCause::Overflow,
        cast::Error::Underflow => NumberCastCause::Underflow,
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        coercion::narrow,
        Cell,
        Ident,
        NumberCastCause,
        RuntimeError,
        ScriptTy,
    };

    fn function() -> Ident {
        Ident::from("Probe")
    }

    #[test]
    fn test_numeric_narrowing() {
        assert_eq!(
            narrow(&function(), 0, ScriptTy::Int, Cell::Float(3.0)),
            Ok(Cell::Int(3)),
        );

        assert_eq!(
            narrow(&function(), 0, ScriptTy::Float, Cell::Int(3)),
            Ok(Cell::Float(3.0)),
        );
    }

    #[test]
    fn test_string_parsing() {
        assert_eq!(
            narrow(&function(), 0, ScriptTy::Int, Cell::give(" 42 ")),
            Ok(Cell::Int(42)),
        );

        let result = narrow(&function(), 1, ScriptTy::Int, Cell::give("forty two"));

        assert!(matches!(
            result,
            Err(RuntimeError::PrimitiveParse { param: 1, .. }),
        ));
    }

    #[test]
    fn test_nan_never_narrows_to_int() {
        let result = narrow(&function(), 0, ScriptTy::Int, Cell::Float(f64::NAN));

        assert!(matches!(
            result,
            Err(RuntimeError::NumberCast {
                cause: NumberCastCause::NAN,
                ..
            }),
        ));
    }

    #[test]
    fn test_sequences_do_not_cross_kinds() {
        let result = narrow(&function(), 0, ScriptTy::Seq, Cell::give("text"));

        assert!(matches!(result, Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_dynamic_slot_passes_through() {
        let seq = Cell::from(vec![Cell::Int(1), Cell::Int(2)]);

        assert_eq!(
            narrow(&function(), 0, ScriptTy::Any, seq.clone()),
            Ok(seq),
        );
    }
}
