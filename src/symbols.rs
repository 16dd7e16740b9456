//! Method identities and the resolver/tie-break collaborator traits
//!
//! The profile store and the comparator never own method identities. They
//! hold opaque `MethodId`s issued by a `SymbolTable`, which maps a textual
//! method signature (e.g. `Lfoo;.bar:()V`) to an identity in the target
//! binary. `MethodIndex` is an in-memory reference implementation for the
//! CLI and tests; real consumers resolve against their own method universe.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Opaque identity for a method in the target binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u32);

impl MethodId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Read-only resolver from method signature text to `MethodId`.
pub trait SymbolTable {
    /// Resolve a signature. `None` when the name is not yet known.
    fn resolve(&self, name: &str) -> Option<MethodId>;

    /// Deobfuscated display name, used for whitelist substring matching.
    fn display_name(&self, id: MethodId) -> &str;
}

/// Deterministic strict total order over methods, used only to break
/// sort-key ties.
pub trait IdentityOrder {
    fn compare(&self, a: MethodId, b: MethodId) -> Ordering;
}

/// Tie-break by numeric id (insertion order in a `MethodIndex`).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdOrder;

impl IdentityOrder for IdOrder {
    fn compare(&self, a: MethodId, b: MethodId) -> Ordering {
        a.cmp(&b)
    }
}

/// In-memory interning symbol table.
///
/// Ids are dense and issued in insertion order. Lookups by id expect ids
/// issued by this index.
#[derive(Debug, Default)]
pub struct MethodIndex {
    by_name: HashMap<String, MethodId>,
    names: Vec<String>,
    display: Vec<String>,
}

impl MethodIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a signature, reusing the existing id on repeat insertion. The
    /// display name defaults to the signature itself.
    pub fn insert(&mut self, name: &str) -> MethodId {
        self.insert_with_display(name, name)
    }

    /// Intern with a separate deobfuscated display name.
    pub fn insert_with_display(&mut self, name: &str, display: &str) -> MethodId {
        if let Some(&id) = self.by_name.get(name) {
            self.display[id.0 as usize] = display.to_string();
            return id;
        }
        let id = MethodId(self.names.len() as u32);
        self.by_name.insert(name.to_string(), id);
        self.names.push(name.to_string());
        self.display.push(display.to_string());
        id
    }

    /// Signature text for an interned id.
    pub fn name(&self, id: MethodId) -> &str {
        &self.names[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All interned ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = MethodId> {
        (0..self.names.len() as u32).map(MethodId)
    }
}

impl SymbolTable for MethodIndex {
    fn resolve(&self, name: &str) -> Option<MethodId> {
        self.by_name.get(name).copied()
    }

    fn display_name(&self, id: MethodId) -> &str {
        &self.display[id.0 as usize]
    }
}
