//! Compile-time name resolution across nested function scopes.
//!
//! The table is a stack of scopes rather than a chain of pointer-linked
//! tables: the compiler pushes a scope when it enters a function literal and
//! pops it on the way out, and `resolve` walks the stack outward. Central
//! ownership keeps borrows simple, the same trade the VM's namespace storage
//! makes at runtime.

use ahash::AHashMap;

/// Which storage a resolved name lives in. The scope decides which load
/// instruction the compiler emits for the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Slot in the VM's globals array.
    Global,
    /// Slot in the current frame's local region.
    Local,
    /// Index into the fixed builtin table.
    Builtin,
    /// Index into the enclosing closure's free-variable array.
    Free,
    /// The current function's own name; loads resolve to the running closure
    /// itself, which is what makes `let f = fn() { f() }` O(1).
    Function,
}

/// A resolved binding: its name, storage kind, and dense index within that
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

#[derive(Debug, Default)]
struct Scope {
    store: AHashMap<String, Symbol>,
    /// Count of Global/Local definitions; indices are dense 0..n-1 in
    /// definition order.
    num_definitions: usize,
    /// Symbols captured from enclosing scopes, in capture order. A symbol's
    /// position here is its `Free` index.
    free_symbols: Vec<Symbol>,
}

/// Data handed back when a scope is popped: what the compiler needs to build
/// the `CompiledFunction` and emit the capture loads.
#[derive(Debug)]
pub struct LeftScope {
    pub free_symbols: Vec<Symbol>,
    pub num_definitions: usize,
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates a table holding only the global scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// True while no function scope is open.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Number of definitions in the innermost scope.
    #[must_use]
    pub fn num_definitions(&self) -> usize {
        self.current().num_definitions
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pops the innermost scope. Panics if asked to pop the global scope,
    /// which would indicate a compiler scope-tracking bug.
    pub fn pop_scope(&mut self) -> LeftScope {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        let scope = self.scopes.pop().expect("scope stack is never empty");
        LeftScope {
            free_symbols: scope.free_symbols,
            num_definitions: scope.num_definitions,
        }
    }

    /// Defines `name` in the innermost scope, as Global at the top level and
    /// Local inside a function.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.is_global() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let current = self.current_mut();
        let symbol = Symbol {
            name: name.to_owned(),
            scope,
            index: current.num_definitions,
        };
        current.num_definitions += 1;
        current.store.insert(name.to_owned(), symbol.clone());
        symbol
    }

    /// Registers a builtin at its fixed table index. Only meaningful on the
    /// global scope, where the compiler seeds the table at construction.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_owned(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.scopes[0].store.insert(name.to_owned(), symbol.clone());
        symbol
    }

    /// Binds the enclosing function literal's own name inside its body scope.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_owned(),
            scope: SymbolScope::Function,
            index: 0,
        };
        self.current_mut().store.insert(name.to_owned(), symbol.clone());
        symbol
    }

    /// Resolves `name`, promoting captures as needed.
    ///
    /// A hit in the innermost scope, or a Global/Builtin hit anywhere, is
    /// returned as-is. A Local (or already-Free) hit in an outer function
    /// scope is copied into the free list of every scope between the
    /// definition and the reference, so capture chains across arbitrary
    /// nesting depth.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        let (depth, mut symbol) = self
            .scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, scope)| scope.store.get(name).map(|s| (depth, s.clone())))?;

        if depth + 1 == self.scopes.len()
            || matches!(symbol.scope, SymbolScope::Global | SymbolScope::Builtin)
        {
            return Some(symbol);
        }

        for inner in depth + 1..self.scopes.len() {
            symbol = self.define_free(inner, symbol);
        }
        Some(symbol)
    }

    /// Records `original` as captured by `scopes[scope_index]` and returns
    /// the Free symbol the capturing scope refers to it by.
    fn define_free(&mut self, scope_index: usize, original: Symbol) -> Symbol {
        let scope = &mut self.scopes[scope_index];
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: scope.free_symbols.len(),
        };
        scope.free_symbols.push(original);
        scope.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    fn current(&self) -> &Scope {
        self.scopes.last().expect("scope stack is never empty")
    }

    fn current_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }
}
