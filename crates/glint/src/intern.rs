use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// Global name interner
// ---------------------------------------------------------------------------

struct NameTable {
    lookup: HashMap<&'static str, Name>,
    entries: Vec<&'static str>,
}

static NAMES: OnceLock<RwLock<NameTable>> = OnceLock::new();

fn names() -> &'static RwLock<NameTable> {
    NAMES.get_or_init(|| {
        RwLock::new(NameTable {
            lookup: HashMap::new(),
            entries: Vec::new(),
        })
    })
}

/// A compact, `Copy`-able handle to an interned identifier string.
///
/// Two `Name`s compare equal iff they refer to the same interned string,
/// so identifier comparison is O(1). Interned strings are leaked and live
/// for the rest of the process, which is what lets symbol tables hand out
/// names that outlive any particular program tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(u32);

impl Name {
    /// Intern `text`, returning the canonical handle for it.
    pub fn new(text: &str) -> Self {
        {
            let table = names().read();
            if let Some(&name) = table.lookup.get(text) {
                return name;
            }
        }
        let mut table = names().write();
        // Re-check: another thread may have interned it between the locks.
        if let Some(&name) = table.lookup.get(text) {
            return name;
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let name = Name(table.entries.len() as u32);
        table.entries.push(leaked);
        table.lookup.insert(leaked, name);
        name
    }

    /// Resolve the handle back to its string.
    #[inline]
    pub fn as_str(self) -> &'static str {
        names().read().entries[self.0 as usize]
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// ---------------------------------------------------------------------------
// Typed arena indices
// ---------------------------------------------------------------------------

/// A typed index into a program's expression arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed index into a program's statement arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(u32);

impl StmtId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed index into the symbol arena's variable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(u32);

impl VarId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed index into the symbol arena's scope storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed index into a program's function-declaration storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(u32);

impl FunctionId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed index into the context's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
