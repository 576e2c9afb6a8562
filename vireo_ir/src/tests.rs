//! Unit tests for the IR value model and builder.

use crate::data::DataPayload;
use crate::function::Function;
use crate::instruction::{BinaryImmOp, CmpBranchOp, Inst, TernaryOp};
use crate::mem::SlotStatus;
use crate::module::{FuncDecl, Module};
use crate::reg::SpecialReg;

fn render(f: &Function) -> String {
    let mut out = Vec::new();
    f.output(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

// --- Register file ---

#[test]
fn specials_are_interned_with_names() {
    let f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    let sp = f.special(SpecialReg::Sp);
    assert_eq!(f.regs.name(zero), "$zero");
    assert_eq!(f.regs.name(sp), "$sp");
    assert!(f.regs.get(zero).allocated);
}

#[test]
fn fresh_registers_render_as_undef() {
    let mut f = Function::new("t", 0);
    let r = f.regs.create();
    let name = f.regs.name(r);
    assert!(name.starts_with("$undef<"), "got {name}");
}

#[test]
fn unite_merges_classes() {
    let mut f = Function::new("t", 0);
    let a = f.regs.create();
    let b = f.regs.create();
    let c = f.regs.create();
    assert!(!f.regs.alias(a, b));
    f.regs.unite(a, b);
    assert!(f.regs.alias(a, b));
    assert!(!f.regs.alias(a, c));
    f.regs.unite(b, c);
    assert!(f.regs.alias(a, c));
    let root = f.regs.find(a);
    assert_eq!(f.regs.find(b), root);
    assert_eq!(f.regs.find(c), root);
}

// --- Instructions ---

#[test]
fn ternary_defines_and_mentions() {
    let mut f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let a = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let b = f.binary_imm(BinaryImmOp::Addi, zero, 2);
    let c = f.ternary(TernaryOp::Add, a, b);
    let inst = f.blocks[0].instructions.last().unwrap().clone();
    assert_eq!(inst.def(), Some(c));
    assert!(inst.uses(&f.regs, &f.mems, a));
    assert!(inst.uses(&f.regs, &f.mems, b));
    assert!(inst.uses(&f.regs, &f.mems, c));
    let other = f.regs.create();
    assert!(!inst.uses(&f.regs, &f.mems, other));
}

#[test]
fn uses_sees_through_union() {
    let mut f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let a = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let b = f.regs.create();
    f.regs.unite(a, b);
    let inst = f.blocks[0].instructions[0].clone();
    assert!(inst.uses(&f.regs, &f.mems, b));
}

#[test]
fn replace_rewrites_operands() {
    let mut f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let a = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let c = f.ternary(TernaryOp::Add, a, a);
    let fresh = f.regs.create();
    let mut inst = f.blocks[0].instructions[1].clone();
    inst.replace(&f.regs, &mut f.mems, a, fresh);
    match inst {
        Inst::Ternary { op0, op1, lhs, .. } => {
            assert_eq!(op0, fresh);
            assert_eq!(op1, fresh);
            assert_eq!(lhs, c);
        }
        other => panic!("unexpected instruction {other:?}"),
    }
}

#[test]
fn phi_mentions_nothing() {
    let mut f = Function::new("t", 0);
    f.entry();
    let a = f.regs.create();
    let b = f.regs.create();
    f.add_phi(a, b);
    let inst = f.blocks[0].instructions[0].clone();
    assert!(!inst.uses(&f.regs, &f.mems, a));
    assert_eq!(inst.def(), None);
}

// --- Builder ---

#[test]
fn branch_links_two_successors() {
    let mut f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let r = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let (next, target) = f.branch_cmp(CmpBranchOp::Beq, r, zero);
    assert_eq!(f.blocks.len(), 3);
    assert_eq!(f.blocks[0].out_edges, vec![next, target]);
    assert_eq!(f.cursor(), Some(next));
    // The fallthrough block comes right after the branching block, so no
    // explicit jump is needed.
    assert!(matches!(
        f.blocks[0].instructions.last(),
        Some(Inst::CmpBranch { .. })
    ));
}

#[test]
fn branch_from_interior_block_emits_jump() {
    let mut f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    let entry = f.entry();
    let r = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let (a, _b) = f.branch_cmp(CmpBranchOp::Beq, r, zero);
    // Build in arm a, then return to the entry block and branch again: the
    // entry can no longer fall through.
    f.switch_to(a);
    f.binary_imm(BinaryImmOp::Addi, zero, 2);
    f.switch_to(entry);
    let _ = f.branch_cmp(CmpBranchOp::Beq, r, zero);
    assert!(matches!(
        f.blocks[entry.index()].instructions.last(),
        Some(Inst::Unconditional { .. })
    ));
}

#[test]
fn join_merges_arms() {
    let mut f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let r = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let (a, b) = f.branch_cmp(CmpBranchOp::Beq, r, zero);
    f.binary_imm(BinaryImmOp::Addi, zero, 2);
    f.switch_to(b);
    f.binary_imm(BinaryImmOp::Addi, zero, 3);
    let merged = f.join(a, b);
    assert!(f.blocks[a.index()].out_edges.contains(&merged));
    assert!(f.blocks[b.index()].out_edges.contains(&merged));
    // b was created last, so it falls through while a jumps.
    assert!(matches!(
        f.blocks[a.index()].instructions.last(),
        Some(Inst::Unconditional { .. })
    ));
    assert!(matches!(
        f.blocks[b.index()].instructions.last(),
        Some(Inst::BinaryImm { .. })
    ));
}

#[test]
fn call_tracks_callee_shape() {
    let mut f = Function::new("t", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let decl = FuncDecl::new("printf", 2);
    let arg = f.binary_imm(BinaryImmOp::Addi, zero, 7);
    let ret = f.call(&decl, vec![arg]);
    assert!(f.has_sub);
    assert_eq!(f.sub_argc, 2);
    match f.blocks[0].instructions.last() {
        Some(Inst::Call(call)) => {
            assert_eq!(call.ret, Some(ret));
            assert_eq!(call.args, vec![arg]);
            assert!(!call.scanned);
        }
        other => panic!("unexpected instruction {other:?}"),
    }
}

#[test]
fn block_labels_follow_function_name() {
    let mut f = Function::new("main", 0);
    f.entry();
    f.new_section();
    assert_eq!(f.blocks[0].label, ".Lmain_0");
    assert_eq!(f.blocks[1].label, ".Lmain_1");
}

// --- Memory ---

#[test]
fn argument_slot_addresses_through_fp() {
    let mut f = Function::new("t", 2);
    let arg = f.argument(1);
    f.stack_size = 40;
    let slot = f.mems.get(arg).clone();
    assert_eq!(slot.status, SlotStatus::Argument);
    assert_eq!(f.mem_name(&slot), "44($fp)");
}

#[test]
fn undetermined_slot_renders_placeholder() {
    let mut f = Function::new("t", 0);
    let m = f.new_memory(4);
    let name = f.mem_name(&f.mems.get(m).clone());
    assert!(name.starts_with("unallocated<"), "got {name}");
}

#[test]
fn static_slot_keeps_caller_offset() {
    let mut f = Function::new("t", 0);
    let base = f.special(SpecialReg::Gp);
    let m = f.new_static_mem(8, base, 12);
    assert_eq!(f.mem_name(&f.mems.get(m).clone()), "12($gp)");
}

// --- Rendering ---

#[test]
fn unallocated_function_prints_pseudo_calls() {
    let mut m = Module::new("demo");
    let printf = m.create_extern("printf", 1);
    let f = m.create_function("main", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let arg = f.binary_imm(BinaryImmOp::Addi, zero, 7);
    f.call_void(&printf, vec![arg]);
    f.add_ret();
    let text = render(f);
    assert!(text.contains("call printf("), "got:\n{text}");
    assert!(text.contains("j .Lmain_epilogue"), "got:\n{text}");
    assert!(!text.contains(".cpload"), "unallocated body has no prologue");
}

#[test]
fn data_sections_escape_strings() {
    let mut m = Module::new("demo");
    let label = m.create_data(true, DataPayload::Asciiz(vec!["hi\n\"x\"".into()]));
    let mut out = Vec::new();
    m.output(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(".rdata"));
    assert!(text.contains(&format!("{}:", label.0)));
    assert!(text.contains("\t.asciiz \"hi\\n\\\"x\\\"\""), "got:\n{text}");
}

#[test]
fn array_access_expands_through_at() {
    let mut f = Function::new("t", 0);
    let base = f.special(SpecialReg::Gp);
    let arr = f.new_static_mem(16, base, 8);
    f.entry();
    let zero = f.special(SpecialReg::Zero);
    let idx = f.binary_imm(BinaryImmOp::Addi, zero, 4);
    f.array_load(idx, arr);
    let text = render(&f);
    assert!(text.contains("\taddu $at, $gp, "), "got:\n{text}");
    assert!(text.contains(", 8($at)"), "got:\n{text}");
}

#[test]
fn stack_addr_renders_as_addiu() {
    let mut f = Function::new("t", 0);
    let slot = f.new_memory(4);
    f.entry();
    f.stack_addr(slot);
    f.mems.get_mut(slot).status = SlotStatus::Assigned;
    f.mems.get_mut(slot).offset = 24;
    let text = render(&f);
    assert!(text.contains(", $sp, 24"), "got:\n{text}");
}

#[test]
fn misc_instructions_render() {
    let mut f = Function::new("t", 0);
    f.entry();
    let ra = f.special(SpecialReg::Ra);
    let x = f.unary_imm(crate::instruction::UnaryImmOp::Li, 42);
    f.add_phi(x, x);
    f.syscall();
    f.jr(ra);
    let text = render(&f);
    assert!(text.contains("li $undef<"), "got:\n{text}");
    assert!(text.contains("\t# phi node\n"));
    assert!(text.contains("\tsyscall\n"));
    assert!(text.contains("\tjr $ra\n"));
}

// --- Verifier ---

#[test]
fn verify_accepts_well_formed_ir() {
    let mut m = Module::new("demo");
    let printf = m.create_extern("printf", 2);
    let f = m.create_function("main", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let a = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let (x, y) = f.branch_cmp(CmpBranchOp::Beq, a, zero);
    f.binary_imm(BinaryImmOp::Addi, zero, 2);
    f.switch_to(y);
    f.binary_imm(BinaryImmOp::Addi, zero, 3);
    f.join(x, y);
    f.call_void(&printf, vec![a]);
    f.add_ret();
    let result = m.verify();
    assert!(result.is_ok(), "{result}");
}

#[test]
fn verify_flags_unlinked_branch_target() {
    let mut f = Function::new("t", 0);
    let entry = f.entry();
    let other = f.new_section();
    // Forge a branch into the entry block without recording the edge.
    f.blocks[other.index()]
        .instructions
        .push(Inst::Unconditional { op: crate::instruction::JumpOp::J, target: entry });
    let result = f.verify();
    assert!(!result.is_ok());
    assert!(result.errors[0].message.contains("not a successor edge"), "{result}");
}

#[test]
fn verify_flags_overlong_argument_list() {
    let mut m = Module::new("demo");
    let ext = m.create_extern("one_arg", 1);
    let f = m.create_function("main", 0);
    let zero = f.special(SpecialReg::Zero);
    f.entry();
    let a = f.binary_imm(BinaryImmOp::Addi, zero, 1);
    let b = f.binary_imm(BinaryImmOp::Addi, zero, 2);
    f.call_void(&ext, vec![a, b]);
    let result = m.verify();
    assert!(!result.is_ok());
    assert!(result.errors[0].message.contains("arguments"), "{result}");
}

#[test]
fn verify_flags_duplicate_function_names() {
    let mut m = Module::new("demo");
    m.create_function("main", 0);
    m.create_function("main", 0);
    let result = m.verify();
    assert!(!result.is_ok());
    assert!(result.errors[0].message.contains("duplicate"), "{result}");
}

#[test]
fn word_data_aligns_to_two() {
    let mut m = Module::new("demo");
    m.create_data(false, DataPayload::Word(vec![1, 2, 3]));
    let mut out = Vec::new();
    m.output(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("\t.data"));
    assert!(text.contains("\t.align 2"));
    assert!(text.contains("\t.word 1 2 3"));
}
