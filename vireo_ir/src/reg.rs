//! Virtual registers, physical-register interning, and union-find.
//!
//! Every function owns a [`RegFile`] arena seeded with the fixed-role MIPS
//! registers; virtual registers are appended behind them. Phi coalescing
//! merges registers through union-find, so a register's observable identity
//! is always taken from its root: two handles name the same value exactly
//! when they are equal or share a root ([`RegFile::alias`]).

use std::collections::BTreeSet;

use crate::mem::MemRef;

/// Handle to a register in a function's register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegId(pub(crate) u32);

impl RegId {
    /// Raw arena index; doubles as the register's numeric id.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Fixed-role MIPS registers, in the order they are seeded into a
/// [`RegFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialReg {
    Zero,
    At,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    K0,
    K1,
    Gp,
    Sp,
    Fp,
    Ra,
    S8,
}

const SPECIAL_NAMES: [&str; 15] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "k0", "k1", "gp", "sp", "fp", "ra", "s8",
];

/// Register identity: a numeric id until coloring, a fixed textual name
/// once a physical register is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegIdent {
    Virtual(u32),
    Physical(&'static str),
}

/// A register in the file: union-find links, interference neighbors, and
/// allocation state.
#[derive(Debug)]
pub struct VirtReg {
    /// Union-find parent; roots point at themselves.
    pub(crate) parent: RegId,
    /// Size of the union rooted here, for union-by-size merging.
    pub(crate) union_size: u32,
    /// Interference-web neighbors. Held as roots so coalesced registers
    /// share one conflict set.
    pub neighbors: BTreeSet<RegId>,
    pub ident: RegIdent,
    /// Whether a physical register has been assigned.
    pub allocated: bool,
    /// Whether this register has been demoted to a stack slot.
    pub spilled: bool,
    /// Rescue slot when this register's caller-saved color is live across
    /// a call.
    pub overlap_slot: Option<MemRef>,
}

/// Per-function register arena.
#[derive(Debug)]
pub struct RegFile {
    regs: Vec<VirtReg>,
}

impl RegFile {
    /// A fresh file with the fixed-role registers interned at the front.
    pub(crate) fn new() -> Self {
        let mut file = Self { regs: Vec::new() };
        for name in SPECIAL_NAMES {
            file.physical(name);
        }
        file
    }

    /// Mint a fresh unallocated virtual register.
    pub fn create(&mut self) -> RegId {
        let id = RegId(self.regs.len() as u32);
        self.regs.push(VirtReg {
            parent: id,
            union_size: 1,
            neighbors: BTreeSet::new(),
            ident: RegIdent::Virtual(id.0),
            allocated: false,
            spilled: false,
            overlap_slot: None,
        });
        id
    }

    /// Mint a register born with a physical name. Acts as a fixed
    /// constraint: it is never recolored.
    pub fn physical(&mut self, name: &'static str) -> RegId {
        let id = RegId(self.regs.len() as u32);
        self.regs.push(VirtReg {
            parent: id,
            union_size: 1,
            neighbors: BTreeSet::new(),
            ident: RegIdent::Physical(name),
            allocated: true,
            spilled: false,
            overlap_slot: None,
        });
        id
    }

    /// Handle of a fixed-role register.
    pub fn special(&self, reg: SpecialReg) -> RegId {
        RegId(reg as u32)
    }

    pub fn get(&self, r: RegId) -> &VirtReg {
        &self.regs[r.0 as usize]
    }

    pub fn get_mut(&mut self, r: RegId) -> &mut VirtReg {
        &mut self.regs[r.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    /// Iterate every register with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (RegId, &VirtReg)> {
        self.regs.iter().enumerate().map(|(i, r)| (RegId(i as u32), r))
    }

    /// Union-find root without path compression, for shared-borrow contexts.
    pub fn root(&self, r: RegId) -> RegId {
        let mut cur = r;
        while self.regs[cur.0 as usize].parent != cur {
            cur = self.regs[cur.0 as usize].parent;
        }
        cur
    }

    /// Union-find root with path compression.
    pub fn find(&mut self, r: RegId) -> RegId {
        let root = self.root(r);
        let mut cur = r;
        while self.regs[cur.0 as usize].parent != root {
            let next = self.regs[cur.0 as usize].parent;
            self.regs[cur.0 as usize].parent = root;
            cur = next;
        }
        root
    }

    /// Merge the equivalence classes of `a` and `b`, union by size.
    pub fn unite(&mut self, a: RegId, b: RegId) {
        let mut x = self.find(a);
        let mut y = self.find(b);
        if x == y {
            return;
        }
        if self.get(x).union_size < self.get(y).union_size {
            std::mem::swap(&mut x, &mut y);
        }
        self.get_mut(y).parent = x;
        let merged = self.get(y).union_size;
        self.get_mut(x).union_size += merged;
    }

    /// Detach `r` from its equivalence class and drop its conflict set.
    /// The allocator resets every representative this way before a spill
    /// retry rebuilds the web.
    pub fn reset_class(&mut self, r: RegId) {
        let reg = self.get_mut(r);
        reg.neighbors.clear();
        reg.union_size = 1;
        reg.parent = r;
    }

    /// Whether two handles name the same value: same id or same root.
    pub fn alias(&self, a: RegId, b: RegId) -> bool {
        a == b || self.root(a) == self.root(b)
    }

    /// The printable name of a register, resolved through its root.
    pub fn name(&self, r: RegId) -> String {
        match self.get(self.root(r)).ident {
            RegIdent::Physical(name) => format!("${name}"),
            RegIdent::Virtual(n) => format!("$undef<{n}>"),
        }
    }
}
