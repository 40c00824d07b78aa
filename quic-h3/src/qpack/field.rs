// SPDX-License-Identifier: Apache-2.0

use alloc::{string::String, vec::Vec};

/// One decoded header field: a name/value pair, independent of how it was
/// represented on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderField {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.value).ok()
    }
}

impl From<(&str, &str)> for HeaderField {
    fn from((name, value): (&str, &str)) -> Self {
        Self::new(String::from(name), String::from(value))
    }
}
