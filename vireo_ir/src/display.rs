//! Textual assembly rendering.
//!
//! Rendering is read-only over the IR: registers resolve through their
//! union-find roots, memory locations print their final offsets, and call
//! pseudo-instructions expand into the full save/marshal/`jal`/reload
//! sequence once the overlap scan has seen them. An overlap register whose
//! slot was never assigned renders as a commented error line; emission
//! continues.

use std::io::{self, Write};

use crate::data::{Data, DataPayload};
use crate::function::Function;
use crate::instruction::{CallInst, Inst};
use crate::mem::{MemoryLocation, SlotStatus};
use crate::module::Module;

/// C-style escaping for `' " ? \ a b f n r t v`.
pub fn escaped(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '?' => out.push_str("\\?"),
            '\\' => out.push_str("\\\\"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            _ => out.push(ch),
        }
    }
    out
}

impl Function {
    /// Render a memory location relative to this function's frame.
    pub fn mem_name(&self, loc: &MemoryLocation) -> String {
        match loc.status {
            SlotStatus::Assigned | SlotStatus::Static => {
                format!("{}({})", loc.offset, self.regs.name(loc.base))
            }
            SlotStatus::Argument => {
                format!("{}({})", 4 * loc.offset + self.stack_size, self.regs.name(loc.base))
            }
            SlotStatus::Undetermined => format!("unallocated<{}>", loc.identifier),
        }
    }

    fn write_inst<W: Write>(&self, out: &mut W, inst: &Inst) -> io::Result<()> {
        let regs = &self.regs;
        match inst {
            Inst::Ternary { op, lhs, op0, op1 } => writeln!(
                out,
                "\t{} {}, {}, {}",
                op.mnemonic(),
                regs.name(*lhs),
                regs.name(*op0),
                regs.name(*op1)
            ),
            Inst::BinaryImm { op, lhs, rhs, imm } => writeln!(
                out,
                "\t{} {}, {}, {}",
                op.mnemonic(),
                regs.name(*lhs),
                regs.name(*rhs),
                imm
            ),
            Inst::Binary { op, lhs, rhs } => writeln!(
                out,
                "\t{} {}, {}",
                op.mnemonic(),
                regs.name(*lhs),
                regs.name(*rhs)
            ),
            Inst::Unary { op, target } => {
                writeln!(out, "\t{} {}", op.mnemonic(), regs.name(*target))
            }
            Inst::UnaryImm { op, target, imm } => {
                writeln!(out, "\t{} {}, {}", op.mnemonic(), regs.name(*target), imm)
            }
            Inst::Memory { op, target, loc } => writeln!(
                out,
                "\t{} {}, {}",
                op.mnemonic(),
                regs.name(*target),
                self.mem_name(self.mems.get(*loc))
            ),
            Inst::ArrayAccess { op, target, index, loc } => {
                let slot = self.mems.get(*loc);
                writeln!(out, "\taddu $at, {}, {}", regs.name(slot.base), regs.name(*index))?;
                writeln!(out, "\t{} {}, {}($at)", op.mnemonic(), regs.name(*target), slot.offset)
            }
            Inst::StackAddr { target, loc } => {
                let slot = self.mems.get(*loc);
                writeln!(
                    out,
                    "\taddiu {}, {}, {}",
                    regs.name(*target),
                    regs.name(slot.base),
                    slot.offset
                )
            }
            Inst::LoadAddr { target, label } => {
                writeln!(out, "\tla {}, {}", regs.name(*target), label)
            }
            Inst::Unconditional { op, target } => {
                writeln!(out, "\t{} {}", op.mnemonic(), self.blocks[target.index()].label)
            }
            Inst::ZeroBranch { op, check, target } => writeln!(
                out,
                "\t{} {}, {}",
                op.mnemonic(),
                regs.name(*check),
                self.blocks[target.index()].label
            ),
            Inst::CmpBranch { op, op0, op1, target } => writeln!(
                out,
                "\t{} {}, {}, {}",
                op.mnemonic(),
                regs.name(*op0),
                regs.name(*op1),
                self.blocks[target.index()].label
            ),
            Inst::Phi(..) => writeln!(out, "\t# phi node"),
            Inst::Call(call) => self.write_call(out, call),
            Inst::Syscall => writeln!(out, "\tsyscall"),
            Inst::Text(line) => writeln!(out, "\t{line}"),
        }
    }

    fn write_call<W: Write>(&self, out: &mut W, call: &CallInst) -> io::Result<()> {
        let regs = &self.regs;
        if !call.scanned {
            let args: Vec<String> = call.args.iter().map(|&a| regs.name(a)).collect();
            return match call.ret {
                Some(ret) => writeln!(
                    out,
                    "\t{} = call {}({})",
                    regs.name(ret),
                    call.callee.name,
                    args.join(", ")
                ),
                None => writeln!(out, "\tcall {}({})", call.callee.name, args.join(", ")),
            };
        }

        writeln!(out, "\t# start calling {}", call.callee.name)?;
        for &k in &call.overlap_temp {
            match regs.get(regs.root(k)).overlap_slot {
                Some(slot) => writeln!(
                    out,
                    "\tsw {}, {}",
                    regs.name(k),
                    self.mem_name(self.mems.get(slot))
                )?,
                None => writeln!(
                    out,
                    "\tsw {}, undef # error: overlap location is not assigned",
                    regs.name(k)
                )?,
            }
        }
        writeln!(out, "\tsw $ra, {}", self.mem_name(&self.ra_slot))?;
        for (i, &arg) in call.args.iter().enumerate() {
            writeln!(out, "\tsw {}, {}($sp)", regs.name(arg), i * 4)?;
        }
        for i in 0..call.args.len().min(4) {
            writeln!(out, "\tlw $a{}, {}($sp)", i, i * 4)?;
        }
        writeln!(out, "\tjal {}", call.callee.name)?;
        writeln!(out, "\tlw $ra, {}", self.mem_name(&self.ra_slot))?;
        for &k in &call.overlap_temp {
            match regs.get(regs.root(k)).overlap_slot {
                Some(slot) => writeln!(
                    out,
                    "\tlw {}, {}",
                    regs.name(k),
                    self.mem_name(self.mems.get(slot))
                )?,
                None => writeln!(
                    out,
                    "\tlw {}, undef # error: overlap location is not assigned",
                    regs.name(k)
                )?,
            }
        }
        if let Some(ret) = call.ret {
            writeln!(out, "\tmove {}, $v0", regs.name(ret))?;
        }
        writeln!(out, "\t# end calling {}", call.callee.name)
    }

    /// Serialize the whole function: preamble, prologue, body, epilogue.
    pub fn output<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\t.text")?;
        writeln!(out, "\t.globl {}", self.name)?;
        writeln!(out, "\t.ent {}", self.name)?;
        writeln!(out, "{}:", self.name)?;
        if self.allocated {
            writeln!(out, "\t.set noreorder")?;
            writeln!(out, "\t.frame $sp, {}, $ra", self.stack_size)?;
            writeln!(out, "\t.cpload $t9")?;
            writeln!(out, "\t.set reorder")?;
            writeln!(out, "\taddiu $sp, $sp, -{}", self.stack_size)?;
            writeln!(out, "\t.cprestore {}", self.pic_slot.offset)?;
            if self.has_sub {
                writeln!(out, "\tsw $ra, {}", self.mem_name(&self.ra_slot))?;
            }
            let base = self.save_area_base();
            for i in 0..self.save_regs {
                writeln!(out, "\tsw $s{}, {}($sp)", i, base + 4 * i)?;
            }
            writeln!(out, "\tsw $fp, {}", self.mem_name(&self.fp_slot))?;
            writeln!(out, "\tmove $fp, $sp")?;
        }
        for block in &self.blocks {
            writeln!(out, "{}:", block.label)?;
            for inst in &block.instructions {
                self.write_inst(out, inst)?;
            }
        }
        writeln!(out, ".L{}_epilogue:", self.name)?;
        if self.allocated {
            writeln!(out, "\tmove $sp, $fp")?;
            writeln!(out, "\tlw $fp, {}", self.mem_name(&self.fp_slot))?;
            let base = self.save_area_base();
            for i in 0..self.save_regs {
                writeln!(out, "\tlw $s{}, {}($sp)", i, base + 4 * i)?;
            }
            if self.has_sub {
                writeln!(out, "\tlw $ra, {}", self.mem_name(&self.ra_slot))?;
            }
            writeln!(out, "\taddiu $sp, $sp, {}", self.stack_size)?;
        }
        writeln!(out, "\tjr $ra")?;
        writeln!(out, "\t.end {}", self.name)?;
        Ok(())
    }
}

impl Data {
    /// Emit the section header, alignment, label, and values.
    pub fn output<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\t{}", if self.read_only { ".rdata" } else { ".data" })?;
        if self.align() > 0 {
            writeln!(out, "\t.align {}", self.align())?;
        }
        writeln!(out, "{}:", self.label)?;
        let values: Vec<String> = match &self.payload {
            DataPayload::Byte(v) => v
                .iter()
                .map(|&b| format!("'{}'", escaped(&(b as char).to_string())))
                .collect(),
            DataPayload::Ascii(v) | DataPayload::Asciiz(v) => {
                v.iter().map(|s| format!("\"{}\"", escaped(s))).collect()
            }
            DataPayload::Word(v) => v.iter().map(|x| x.to_string()).collect(),
            DataPayload::Hword(v) => v.iter().map(|x| x.to_string()).collect(),
            DataPayload::Space(v) => v.iter().map(|x| x.to_string()).collect(),
        };
        writeln!(out, "\t{} {}", self.type_label(), values.join(" "))
    }
}

impl Module {
    /// Serialize global data, then every function with its data blocks.
    pub fn output<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for data in &self.data {
            data.output(out)?;
        }
        for func in &self.functions {
            for data in &func.data_blocks {
                data.output(out)?;
            }
            func.output(out)?;
        }
        Ok(())
    }
}
