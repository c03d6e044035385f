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
    error::Error as StdError,
    fmt::{Debug, Display, Formatter},
    result::Result as StdResult,
};

use compact_str::CompactString;

use crate::runtime::{Ident, ScriptTy};

/// A result of a runtime API call, which can either be a normal value or a
/// [RuntimeError].
pub type RuntimeResult<T> = StdResult<T, RuntimeError>;

/// Represents any error that may occur during a dynamic invocation.
///
/// Every variant carries the script-facing name of the callable involved and
/// enough arity or typing detail for the interpreter to render a useful
/// script-level message.
///
/// The engine returns these errors synchronously to the immediate caller and
/// never retries on its own behalf.
#[derive(Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum RuntimeError {
    /// The script attempts to call a function with an incorrect number of
    /// arguments, either too few or too many.
    ArityMismatch {
        /// The script-facing name of the callable.
        function: Ident,

        /// The minimal number of arguments the callable accepts.
        min_params: usize,

        /// The maximal number of arguments the callable accepts, or None if
        /// the callable is variadic.
        max_params: Option<usize>,

        /// The actual number of arguments that were supplied.
        arguments: usize,
    },

    /// A required parameter slot received no value and has no default.
    ///
    /// This error can surface even after the coarse arity check has passed,
    /// for example when a partially applied callable is invoked with an
    /// unfilled hole in the middle of its bound arguments.
    MissingArgument {
        /// The script-facing name of the callable.
        function: Ident,

        /// The zero-based index of the unfilled formal slot.
        param: usize,

        /// The name of the unfilled formal parameter, if the parameter has a
        /// name.
        param_name: Option<Ident>,
    },

    /// A supplied value cannot be narrowed to the static type of the formal
    /// parameter slot.
    TypeMismatch {
        /// The script-facing name of the callable.
        function: Ident,

        /// The zero-based index of the formal slot.
        param: usize,

        /// The static type of the formal slot.
        expected: ScriptTy,

        /// The actual type of the supplied value.
        provided: ScriptTy,
    },

    /// A numeric argument cannot be represented in the numeric type of the
    /// formal parameter slot.
    NumberCast {
        /// The script-facing name of the callable.
        function: Ident,

        /// The zero-based index of the formal slot.
        param: usize,

        /// The numeric type of the supplied value.
        from: ScriptTy,

        /// The numeric type of the formal slot.
        to: ScriptTy,

        /// The reason why the cast is not possible.
        cause: NumberCastCause,
    },

    /// A string argument cannot be parsed into the primitive type of the
    /// formal parameter slot.
    PrimitiveParse {
        /// The script-facing name of the callable.
        function: Ident,

        /// The zero-based index of the formal slot.
        param: usize,

        /// The primitive type into which the string was supposed to be
        /// parsed.
        to: ScriptTy,

        /// The string that failed to parse.
        input: CompactString,
    },

    /// A host callable has an inconsistent formal parameter list: a required
    /// parameter after an optional one, a misplaced variadic slot, or a
    /// setter without a value slot.
    ///
    /// This is a programming error in the host surface, not a script error.
    /// The catalog loader reports the entry and skips it.
    MalformedSignature {
        /// The script-facing name of the callable.
        function: Ident,

        /// The specific defect of the parameter list.
        defect: SignatureDefect,
    },

    /// The underlying host callable reported a failure of its own.
    ///
    /// The engine does not interpret the failure; it propagates the message
    /// synchronously to the caller.
    HostFailure {
        /// The script-facing name of the callable.
        function: Ident,

        /// The host-provided description of the failure.
        message: CompactString,
    },

    /// Binding supplies more fixed arguments than the callable can ever
    /// accept.
    BindOverflow {
        /// The script-facing name of the callable.
        function: Ident,

        /// The maximal number of fixed argument slots of the callable.
        capacity: usize,

        /// The number of slots the binding attempted to occupy.
        bound: usize,
    },
}

impl Display for RuntimeError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArityMismatch {
                function,
                min_params,
                max_params,
                arguments,
            } => {
                let expected = match max_params {
                    Some(max) if max == min_params => format!("{min_params}"),
                    Some(max) => format!("{min_params} to {max}"),
                    None => format!("at least {min_params}"),
                };

                formatter.write_fmt(format_args!(
                    "'{function}' expects {expected} argument(s), but {arguments} provided",
                ))
            }

            Self::MissingArgument {
                function,
                param,
                param_name,
            } => match param_name {
                Some(name) => formatter.write_fmt(format_args!(
                    "missing required argument '{name}' of '{function}'",
                )),

                None => formatter.write_fmt(format_args!(
                    "missing required argument #{param} of '{function}'",
                )),
            },

            Self::TypeMismatch {
                function,
                param,
                expected,
                provided,
            } => formatter.write_fmt(format_args!(
                "argument #{param} of '{function}' expects '{expected}', \
                but '{provided}' provided",
            )),

            Self::NumberCast {
                function,
                param,
                from,
                to,
                cause,
            } => formatter.write_fmt(format_args!(
                "argument #{param} of '{function}' cannot be cast from \
                '{from}' to '{to}': {cause}",
            )),

            Self::PrimitiveParse {
                function,
                param,
                to,
                input,
            } => formatter.write_fmt(format_args!(
                "argument #{param} of '{function}': string {input:?} does \
                not parse as '{to}'",
            )),

            Self::MalformedSignature { function, defect } => formatter.write_fmt(format_args!(
                "malformed host signature of '{function}': {defect}",
            )),

            Self::HostFailure { function, message } => {
                formatter.write_fmt(format_args!("'{function}' failed: {message}"))
            }

            Self::BindOverflow {
                function,
                capacity,
                bound,
            } => formatter.write_fmt(format_args!(
                "cannot bind {bound} argument(s) to '{function}' that \
                accepts at most {capacity}",
            )),
        }
    }
}

impl StdError for RuntimeError {}

impl RuntimeError {
    /// Returns the script-facing name of the callable involved in the error.
    #[inline(always)]
    pub fn function(&self) -> &Ident {
        match self {
            Self::ArityMismatch { function, .. } => function,
            Self::MissingArgument { function, .. } => function,
            Self::TypeMismatch { function, .. } => function,
            Self::NumberCast { function, .. } => function,
            Self::PrimitiveParse { function, .. } => function,
            Self::MalformedSignature { function, .. } => function,
            Self::HostFailure { function, .. } => function,
            Self::BindOverflow { function, .. } => function,
        }
    }
}

/// A reason why a numeric value cannot be represented in the requested
/// numeric type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NumberCastCause {
    /// The value is positive or negative infinity.
    Infinite,

    /// The value is not a number.
    NAN,

    /// The value is greater than the maximum of the requested type.
    Overflow,

    /// The value is less than the minimum of the requested type.
    Underflow,
}

impl Display for NumberCastCause {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Infinite => formatter.write_str("the value is infinite"),
            Self::NAN => formatter.write_str("the value is not a number"),
            Self::Overflow => formatter.write_str("the value is too big"),
            Self::Underflow => formatter.write_str("the value is too small"),
        }
    }
}

/// A specific inconsistency of a host callable's formal parameter list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignatureDefect {
    /// A required parameter follows an optional parameter.
    RequiredAfterOptional {
        /// The zero-based index of the misplaced required parameter.
        index: usize,
    },

    /// A variadic parameter is declared anywhere but the last formal slot
    /// (or the second-to-last slot of an element setter).
    MisplacedVariadic {
        /// The zero-based index of the misplaced variadic parameter.
        index: usize,
    },

    /// More than one parameter is declared variadic.
    DuplicateVariadic {
        /// The zero-based index of the second variadic parameter.
        index: usize,
    },

    /// A setter is declared without any formal parameters.
    SetterWithoutValue,
}

impl Display for SignatureDefect {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequiredAfterOptional { index } => formatter.write_fmt(format_args!(
                "required parameter #{index} follows an optional parameter",
            )),

            Self::MisplacedVariadic { index } => {
                formatter.write_fmt(format_args!("variadic parameter #{index} is not trailing"))
            }

            Self::DuplicateVariadic { index } => {
                formatter.write_fmt(format_args!("duplicate variadic parameter #{index}"))
            }

            Self::SetterWithoutValue => formatter.write_str("a setter requires a value parameter"),
        }
    }
}
