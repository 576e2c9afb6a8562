//! Functions, basic blocks, and the builder façade.
//!
//! A function owns its blocks in a single vector; successor edges are
//! [`BlockRef`] handles, so loops cost nothing. Building happens through a
//! cursor block: append methods mint the destination register and push the
//! instruction at the cursor, branch helpers create and link successor
//! blocks. Explicit `j` instructions are only emitted when the cursor is not
//! the most recently created block, since blocks are laid out in creation
//! order and otherwise fall through.

use std::collections::HashMap;

use crate::data::{Data, DataLabel, DataPayload};
use crate::instruction::{
    BinaryImmOp, BinaryOp, CallInst, CmpBranchOp, Inst, JumpOp, MemoryOp, TernaryOp, UnaryImmOp,
    UnaryOp, ZeroBranchOp,
};
use crate::mem::{MemFile, MemRef, MemoryLocation, SlotStatus};
use crate::module::FuncDecl;
use crate::reg::{RegFile, RegId, SpecialReg};

/// Handle to a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef(pub(crate) u32);

impl BlockRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A labeled sequence of instructions with up to two successor edges.
#[derive(Debug)]
pub struct Block {
    pub label: String,
    /// Reentrant-DFS guard shared by every pass; each pass restores it on
    /// unwind.
    pub visited: bool,
    pub instructions: Vec<Inst>,
    pub out_edges: Vec<BlockRef>,
    /// Last position at which a register is used within this block;
    /// `instructions.len()` means live through the end. Filled by the
    /// liveness pass.
    pub lives: HashMap<RegId, usize>,
}

/// A function under construction or allocation.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    /// Number of inbound arguments.
    pub argc: usize,
    pub regs: RegFile,
    pub mems: MemFile,
    pub blocks: Vec<Block>,
    cursor: Option<BlockRef>,
    /// Block-label counter.
    count: u32,
    /// Reserved word for the saved return address.
    pub ra_slot: MemoryLocation,
    /// Reserved word for the PIC restore area (`.cprestore`).
    pub pic_slot: MemoryLocation,
    /// Reserved word for the saved frame pointer.
    pub fp_slot: MemoryLocation,
    pub data_blocks: Vec<Data>,
    /// Whether any call site exists.
    pub has_sub: bool,
    /// Maximum callee argc seen at call sites.
    pub sub_argc: usize,
    /// Count of distinct callee-saved colors in use, set by the allocator.
    pub save_regs: usize,
    pub stack_size: usize,
    /// Set once frame layout has run; guards re-finalization.
    pub allocated: bool,
}

impl Function {
    /// Frame alignment in bytes.
    pub const PADDING: usize = 8;
    pub const MASK: usize = Self::PADDING - 1;
    /// Reserved outgoing area beyond the marshalled arguments.
    pub const EXTRA_STACK: usize = 16;

    pub fn new(name: impl Into<String>, argc: usize) -> Self {
        let regs = RegFile::new();
        let sp = regs.special(SpecialReg::Sp);
        let reserved = |id: u32| MemoryLocation {
            identifier: id,
            base: sp,
            size: 4,
            offset: 0,
            status: SlotStatus::Undetermined,
        };
        Self {
            name: name.into(),
            argc,
            regs,
            mems: MemFile::new(3),
            blocks: Vec::new(),
            cursor: None,
            count: 0,
            ra_slot: reserved(0),
            pic_slot: reserved(1),
            fp_slot: reserved(2),
            data_blocks: Vec::new(),
            has_sub: false,
            sub_argc: 0,
            save_regs: 0,
            stack_size: 0,
            allocated: false,
        }
    }

    /// A cloneable descriptor usable as a call target (including self-calls).
    pub fn decl(&self) -> FuncDecl {
        FuncDecl {
            name: self.name.clone(),
            argc: self.argc,
        }
    }

    /// Handle of a fixed-role register.
    pub fn special(&self, reg: SpecialReg) -> RegId {
        self.regs.special(reg)
    }

    pub fn block(&self, r: BlockRef) -> &Block {
        &self.blocks[r.index()]
    }

    pub fn block_mut(&mut self, r: BlockRef) -> &mut Block {
        &mut self.blocks[r.index()]
    }

    /// The block new instructions are appended to.
    pub fn cursor(&self) -> Option<BlockRef> {
        self.cursor
    }

    pub fn switch_to(&mut self, target: BlockRef) {
        self.cursor = Some(target);
    }

    /// Create the entry block and point the cursor at it.
    pub fn entry(&mut self) -> BlockRef {
        let block = self.fresh_block();
        self.cursor = Some(block);
        block
    }

    /// The CFG root, if any block exists.
    pub fn entry_block(&self) -> Option<BlockRef> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(BlockRef(0))
        }
    }

    /// Clear the per-block liveness scratch and DFS flags.
    pub fn clear_liveness(&mut self) {
        for block in &mut self.blocks {
            block.visited = false;
            block.lives.clear();
        }
    }

    fn next_name(&mut self) -> String {
        let n = self.count;
        self.count += 1;
        format!(".L{}_{}", self.name, n)
    }

    fn fresh_block(&mut self) -> BlockRef {
        let label = self.next_name();
        let r = BlockRef(self.blocks.len() as u32);
        self.blocks.push(Block {
            label,
            visited: false,
            instructions: Vec::new(),
            out_edges: Vec::new(),
            lives: HashMap::new(),
        });
        r
    }

    fn cursor_ref(&self) -> BlockRef {
        self.cursor
            .expect("entry() must be called before emitting instructions")
    }

    fn push(&mut self, inst: Inst) {
        let cursor = self.cursor_ref();
        self.blocks[cursor.index()].instructions.push(inst);
    }

    // ── Straight-line instructions ──

    /// Three-register arithmetic; mints and returns the destination.
    pub fn ternary(&mut self, op: TernaryOp, op0: RegId, op1: RegId) -> RegId {
        let lhs = self.regs.create();
        self.push(Inst::Ternary { op, lhs, op0, op1 });
        lhs
    }

    /// Register-immediate arithmetic; mints and returns the destination.
    pub fn binary_imm(&mut self, op: BinaryImmOp, rhs: RegId, imm: i64) -> RegId {
        let lhs = self.regs.create();
        self.push(Inst::BinaryImm { op, lhs, rhs, imm });
        lhs
    }

    /// Two-register operation; mints and returns the destination.
    pub fn binary(&mut self, op: BinaryOp, rhs: RegId) -> RegId {
        let lhs = self.regs.create();
        self.push(Inst::Binary { op, lhs, rhs });
        lhs
    }

    /// Immediate load (`li`/`lui`); mints and returns the destination.
    pub fn unary_imm(&mut self, op: UnaryImmOp, imm: i64) -> RegId {
        let target = self.regs.create();
        self.push(Inst::UnaryImm { op, target, imm });
        target
    }

    /// Word load from a stack slot.
    pub fn load(&mut self, loc: MemRef) -> RegId {
        let target = self.regs.create();
        self.push(Inst::Memory { op: MemoryOp::Lw, target, loc });
        target
    }

    /// Word store to a stack slot.
    pub fn store(&mut self, src: RegId, loc: MemRef) {
        self.push(Inst::Memory { op: MemoryOp::Sw, target: src, loc });
    }

    /// Register-indexed word load.
    pub fn array_load(&mut self, index: RegId, loc: MemRef) -> RegId {
        let target = self.regs.create();
        self.push(Inst::ArrayAccess { op: MemoryOp::Lw, target, index, loc });
        target
    }

    /// Register-indexed word store.
    pub fn array_store(&mut self, src: RegId, index: RegId, loc: MemRef) {
        self.push(Inst::ArrayAccess { op: MemoryOp::Sw, target: src, index, loc });
    }

    /// Load the address of a stack slot.
    pub fn stack_addr(&mut self, loc: MemRef) -> RegId {
        let target = self.regs.create();
        self.push(Inst::StackAddr { target, loc });
        target
    }

    /// Load the address of a data label.
    pub fn load_addr(&mut self, data: &DataLabel) -> RegId {
        let target = self.regs.create();
        self.push(Inst::LoadAddr { target, label: data.0.clone() });
        target
    }

    pub fn jr(&mut self, target: RegId) {
        self.push(Inst::Unary { op: UnaryOp::Jr, target });
    }

    pub fn syscall(&mut self) {
        self.push(Inst::Syscall);
    }

    /// Append a literal pass-through line.
    pub fn text(&mut self, line: impl Into<String>) {
        self.push(Inst::Text(line.into()));
    }

    /// Join the lifetimes of two registers across a control-flow merge.
    pub fn add_phi(&mut self, x: RegId, y: RegId) {
        self.push(Inst::Phi(x, y));
    }

    /// Copy `reg` into a fixed-role register.
    pub fn assign_special(&mut self, special: SpecialReg, reg: RegId) {
        let dst = self.regs.special(special);
        self.push(Inst::Binary { op: BinaryOp::Move, lhs: dst, rhs: reg });
    }

    /// Load an immediate into a fixed-role register.
    pub fn assign_special_imm(&mut self, special: SpecialReg, imm: i64) {
        let dst = self.regs.special(special);
        let zero = self.regs.special(SpecialReg::Zero);
        self.push(Inst::BinaryImm { op: BinaryImmOp::Addi, lhs: dst, rhs: zero, imm });
    }

    /// Jump to the epilogue and return.
    pub fn add_ret(&mut self) {
        let line = format!("j .L{}_epilogue", self.name);
        self.push(Inst::Text(line));
    }

    // ── Branching ──

    /// Two-operand conditional branch. Creates the fallthrough and target
    /// blocks, returns `(fallthrough, target)`, and moves the cursor to the
    /// fallthrough block.
    pub fn branch_cmp(&mut self, op: CmpBranchOp, op0: RegId, op1: RegId) -> (BlockRef, BlockRef) {
        let cursor = self.cursor_ref();
        let needs_jump = cursor.index() != self.blocks.len() - 1;
        let next = self.fresh_block();
        let target = self.fresh_block();
        let cur = &mut self.blocks[cursor.index()];
        cur.instructions.push(Inst::CmpBranch { op, op0, op1, target });
        cur.out_edges.push(next);
        cur.out_edges.push(target);
        if needs_jump {
            cur.instructions.push(Inst::Unconditional { op: JumpOp::J, target: next });
        }
        self.cursor = Some(next);
        (next, target)
    }

    /// Single-operand conditional branch against zero; same block protocol
    /// as [`Function::branch_cmp`].
    pub fn branch_zero(&mut self, op: ZeroBranchOp, check: RegId) -> (BlockRef, BlockRef) {
        let cursor = self.cursor_ref();
        let needs_jump = cursor.index() != self.blocks.len() - 1;
        let next = self.fresh_block();
        let target = self.fresh_block();
        let cur = &mut self.blocks[cursor.index()];
        cur.instructions.push(Inst::ZeroBranch { op, check, target });
        cur.out_edges.push(next);
        cur.out_edges.push(target);
        if needs_jump {
            cur.instructions.push(Inst::Unconditional { op: JumpOp::J, target: next });
        }
        self.cursor = Some(next);
        (next, target)
    }

    /// Conditional branch to an existing block (loop back-edges). Creates
    /// and returns the fallthrough block.
    pub fn branch_cmp_to(&mut self, op: CmpBranchOp, op0: RegId, op1: RegId, target: BlockRef) -> BlockRef {
        let cursor = self.cursor_ref();
        let next = self.fresh_block();
        let cur = &mut self.blocks[cursor.index()];
        cur.instructions.push(Inst::CmpBranch { op, op0, op1, target });
        cur.out_edges.push(next);
        cur.out_edges.push(target);
        self.cursor = Some(next);
        next
    }

    /// Zero-compare branch to an existing block; same protocol as
    /// [`Function::branch_cmp_to`].
    pub fn branch_zero_to(&mut self, op: ZeroBranchOp, check: RegId, target: BlockRef) -> BlockRef {
        let cursor = self.cursor_ref();
        let next = self.fresh_block();
        let cur = &mut self.blocks[cursor.index()];
        cur.instructions.push(Inst::ZeroBranch { op, check, target });
        cur.out_edges.push(next);
        cur.out_edges.push(target);
        self.cursor = Some(next);
        next
    }

    /// Unconditional jump to an existing block; the cursor follows it.
    pub fn jump_to(&mut self, target: BlockRef) {
        let cursor = self.cursor_ref();
        let cur = &mut self.blocks[cursor.index()];
        cur.instructions.push(Inst::Unconditional { op: JumpOp::J, target });
        cur.out_edges.push(target);
        self.cursor = Some(target);
    }

    /// Start a new block reachable from the cursor, jumping explicitly only
    /// when the cursor cannot fall through to it.
    pub fn new_section(&mut self) -> BlockRef {
        let cursor = self.cursor_ref();
        let falls_through = cursor.index() == self.blocks.len() - 1;
        let node = self.fresh_block();
        let cur = &mut self.blocks[cursor.index()];
        if !falls_through {
            cur.instructions.push(Inst::Unconditional { op: JumpOp::J, target: node });
        }
        cur.out_edges.push(node);
        self.cursor = Some(node);
        node
    }

    /// Merge two arms into a fresh block; the most recently created arm
    /// falls through, the other jumps.
    pub fn join(&mut self, x: BlockRef, y: BlockRef) -> BlockRef {
        let last = BlockRef((self.blocks.len() - 1) as u32);
        let node = self.fresh_block();
        for pred in [x, y] {
            let blk = &mut self.blocks[pred.index()];
            if pred != last {
                blk.instructions.push(Inst::Unconditional { op: JumpOp::J, target: node });
            }
            blk.out_edges.push(node);
        }
        self.cursor = Some(node);
        node
    }

    // ── Calls ──

    /// Call returning a value in a fresh register.
    pub fn call(&mut self, callee: &FuncDecl, args: Vec<RegId>) -> RegId {
        let ret = self.regs.create();
        self.push_call(callee, args, Some(ret));
        ret
    }

    /// Call with no return register.
    pub fn call_void(&mut self, callee: &FuncDecl, args: Vec<RegId>) {
        self.push_call(callee, args, None);
    }

    fn push_call(&mut self, callee: &FuncDecl, args: Vec<RegId>, ret: Option<RegId>) {
        self.has_sub = true;
        self.sub_argc = self.sub_argc.max(callee.argc);
        self.push(Inst::Call(Box::new(CallInst {
            callee: callee.clone(),
            args,
            ret,
            overlap_temp: Default::default(),
            scanned: false,
        })));
    }

    // ── Memory ──

    /// A fresh frame slot, placed later by frame layout.
    pub fn new_memory(&mut self, size: usize) -> MemRef {
        let sp = self.regs.special(SpecialReg::Sp);
        self.mems.push(sp, size, 0, SlotStatus::Undetermined)
    }

    /// A slot with a caller-supplied offset off an arbitrary base.
    pub fn new_static_mem(&mut self, size: usize, base: RegId, offset: usize) -> MemRef {
        self.mems.push(base, size, offset, SlotStatus::Static)
    }

    /// The slot of an inbound argument.
    pub fn argument(&mut self, index: usize) -> MemRef {
        let fp = self.regs.special(SpecialReg::Fp);
        self.mems.push(fp, 4, index, SlotStatus::Argument)
    }

    /// Base offset of the callee-saved save area.
    pub fn save_area_base(&self) -> usize {
        let base = 4 * self.sub_argc + Self::EXTRA_STACK;
        (base + Self::MASK) & !Self::MASK
    }

    /// Attach a data section to this function.
    pub fn create_data(&mut self, read_only: bool, payload: DataPayload) -> DataLabel {
        let data = Data::new(read_only, payload);
        let label = data.handle();
        self.data_blocks.push(data);
        label
    }
}
