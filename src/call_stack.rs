//! Live function call chain of one thread
//!
//! Each entry carries the interned chain "callee caller grandcaller ...", built
//! once at call time by prefixing the callee to its caller's chain. Attribution
//! then keys on a single symbol instead of walking the stack per sample.

use crate::symbols::{Symbol, SymbolTable};

/// Attribution key in effect before any function has been entered
pub const NO_FUNCTION: &str = "-";

/// Attribution key in effect after the outermost function has returned
pub const EMPTY_STACK: &str = "[EMPTY]";

/// One live call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry {
    /// The bare function name
    pub function: Symbol,
    /// The function followed by all of its live ancestors, innermost first
    pub chain: Symbol,
}

#[derive(Debug, Default)]
pub struct CallStack {
    entries: Vec<StackEntry>,
    scratch: String,
    max_depth: usize,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `name` and return its interned name and ancestor chain
    pub fn push_function(&mut self, symbols: &SymbolTable, name: &str) -> StackEntry {
        let function = symbols.intern(name);

        let chain = match self.entries.last() {
            None => function,
            Some(caller) => {
                self.scratch.clear();
                self.scratch.push_str(name);
                self.scratch.push(' ');
                self.scratch.push_str(symbols.resolve(caller.chain));
                symbols.intern(&self.scratch)
            }
        };

        let entry = StackEntry { function, chain };
        self.entries.push(entry);
        self.max_depth = self.max_depth.max(self.entries.len());
        entry
    }

    /// Pop the innermost call and return the new innermost chain, if any
    pub fn pop_function(&mut self) -> Option<Symbol> {
        self.entries.pop();
        self.entries.last().map(|entry| entry.chain)
    }

    /// The innermost live call
    pub fn top(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Deepest the stack has ever been
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}
