//! String interning for attribution keys
//!
//! Function names, call chains and partition tags are interned once and then
//! handled as small integer ids, so table lookups on the hot path hash a
//! `u32` rather than a string.

use lasso::{Spur, ThreadedRodeo};

/// Interned string id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

/// Process-wide, thread-safe interning table
#[derive(Debug, Default)]
pub struct SymbolTable(ThreadedRodeo);

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `name`, interning it on first sight
    pub fn intern(&self, name: &str) -> Symbol {
        Symbol(self.0.get_or_intern(name))
    }

    /// Look up `name` without interning it
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.0.get(name).map(Symbol)
    }

    /// The string behind an id
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.0.resolve(&symbol.0)
    }

    /// Number of distinct strings interned so far
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
