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

// Reports of internal inconsistencies in the engine.
//
// Reaching any of these reports is a bug in Per Aspera itself, never an error
// in the host surface or in the script code.

use std::fmt::Arguments;

macro_rules! system_panic {
    ($($args:tt)*) => {
        $crate::report::panic_report(::std::format_args!($($args)*))
    };
}

pub(crate) use system_panic;

// In debug builds, panics with the provided message; in production builds,
// informs the optimizer that this point is never reachable.
//
// Safety: the caller must guarantee that the marked branch is unreachable.
macro_rules! debug_unreachable {
    ($($args:tt)*) => {
        $crate::report::unreachable_report(::std::format_args!($($args)*))
    };
}

pub(crate) use debug_unreachable;

#[inline(never)]
#[cold]
pub(crate) fn panic_report(message: Arguments<'_>) -> ! {
    panic!(
        "Per Aspera internal error. This is a bug.\n\
        If you see this message, please open an issue:\n\
        https://github.com/Eliah-Lakhin/per-aspera/issues\n\n{message}",
    )
}

// Safety: the call site must be unreachable.
#[inline(always)]
pub(crate) unsafe fn unreachable_report(message: Arguments<'_>) -> ! {
    #[cfg(debug_assertions)]
    {
        panic_report(message)
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = message;

        // Safety: upheld by the caller.
        unsafe { ::std::hint::unreachable_unchecked() }
    }
}
