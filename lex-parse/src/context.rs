use std::cell::RefCell;

use string_interner::{backend::StringBackend, symbol::SymbolU16, StringInterner};

pub type InternedString = SymbolU16;

/// Shared string storage for one compilation unit. Token text is interned
/// here so tokens stay small and copyable.
#[derive(Debug)]
pub struct Context {
    strings: RefCell<StringInterner<StringBackend<InternedString>>>,
}

impl Default for Context {
    fn default() -> Self {
        Context { strings: RefCell::new(StringInterner::new()) }
    }
}

impl Context {
    pub fn new() -> Context {
        Context { strings: StringInterner::new().into() }
    }

    pub fn get_string(&self, string: &str) -> InternedString {
        self.strings.borrow_mut().get_or_intern(string)
    }

    /// Resolves a symbol previously produced by `get_string`. Unknown
    /// symbols resolve to the empty string.
    pub fn resolve_string(&self, string: InternedString) -> String {
        self.strings
            .borrow()
            .resolve(string)
            .map(String::from)
            .unwrap_or_default()
    }
}
