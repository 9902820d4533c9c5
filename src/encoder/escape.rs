//! Escaping of reserved characters in feature names.
//!
//! Downstream classifier formats reserve some characters (`=` by default).
//! Each reserved character is replaced by `%U` followed by its code point in
//! at least four uppercase hex digits, so `a=b` becomes `a%U003Db`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Characters escaped when no configuration says otherwise.
pub const DEFAULT_RESERVED: [char; 1] = ['='];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEscaper {
    reserved: Vec<char>,
}

impl NameEscaper {
    pub fn new(reserved: Vec<char>) -> Self {
        NameEscaper { reserved }
    }

    pub fn reserved(&self) -> &[char] {
        &self.reserved
    }

    pub fn escape<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if !name.contains(self.reserved.as_slice()) {
            return Cow::Borrowed(name);
        }

        let mut escaped = String::with_capacity(name.len() + 8);
        for c in name.chars() {
            if self.reserved.contains(&c) {
                escaped.push_str(&format!("%U{:04X}", c as u32));
            } else {
                escaped.push(c);
            }
        }
        Cow::Owned(escaped)
    }
}

impl Default for NameEscaper {
    fn default() -> Self {
        NameEscaper::new(DEFAULT_RESERVED.to_vec())
    }
}
