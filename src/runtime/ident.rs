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
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

use compact_str::CompactString;

/// An identifier within the host surface or the Script code:
/// `let identifier = 10;`.
///
/// Script identifiers are compared without regard to ASCII letter case:
/// `MsgBox`, `msgbox`, and `MSGBOX` denote the same name. The [PartialEq],
/// [Hash], and [Ord] implementations of this object all follow this rule, so
/// an Ident can be used directly as a key of a case-insensitive index.
///
/// The object holds a copy of the identifier's string as it was spelled at
/// the declaration site. You can retrieve this canonical spelling using the
/// [Display], [Debug], and [AsRef<str>](AsRef) implementations.
#[derive(Clone)]
pub struct Ident {
    string: CompactString,
}

impl Debug for Ident {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.string, formatter)
    }
}

impl Display for Ident {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.string, formatter)
    }
}

impl AsRef<str> for Ident {
    #[inline(always)]
    fn as_ref(&self) -> &str {
        self.string.as_ref()
    }
}

impl From<&str> for Ident {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Self {
            string: CompactString::new(value),
        }
    }
}

impl From<String> for Ident {
    #[inline(always)]
    fn from(value: String) -> Self {
        Self {
            string: CompactString::from(value),
        }
    }
}

impl From<CompactString> for Ident {
    #[inline(always)]
    fn from(value: CompactString) -> Self {
        Self { string: value }
    }
}

impl PartialEq for Ident {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.string.eq_ignore_ascii_case(&other.string)
    }
}

impl Eq for Ident {}

impl PartialEq<str> for Ident {
    #[inline(always)]
    fn eq(&self, other: &str) -> bool {
        self.string.eq_ignore_ascii_case(other)
    }
}

impl Hash for Ident {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.string.as_bytes() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

impl PartialOrd for Ident {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ident {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        let this = self.string.bytes().map(|byte| byte.to_ascii_lowercase());
        let other = other.string.bytes().map(|byte| byte.to_ascii_lowercase());

        this.cmp(other)
    }
}

impl Ident {
    /// Returns the canonical spelling of the identifier, as it appeared at
    /// the declaration site.
    #[inline(always)]
    pub fn as_str(&self) -> &str {
        self.string.as_str()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use crate::runtime::Ident;

    #[test]
    fn test_ident_case_insensitivity() {
        let lower = Ident::from("msgbox");
        let mixed = Ident::from("MsgBox");

        assert_eq!(lower, mixed);
        assert_eq!(mixed, *"MSGBOX");

        let mut hasher_1 = DefaultHasher::new();
        let mut hasher_2 = DefaultHasher::new();

        lower.hash(&mut hasher_1);
        mixed.hash(&mut hasher_2);

        assert_eq!(hasher_1.finish(), hasher_2.finish());
    }

    #[test]
    fn test_ident_keeps_spelling() {
        let ident = Ident::from("MsgBox");

        assert_eq!(ident.as_str(), "MsgBox");
        assert_eq!(format!("{ident}"), "MsgBox");
    }
}
