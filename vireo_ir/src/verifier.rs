//! IR verifier: structural integrity checks.
//!
//! Collects all errors rather than stopping at the first one. The passes
//! themselves treat ill-formed IR as a programmer bug and panic mid-flight;
//! the verifier exists so embedders can diagnose a malformed build up front.
//! Entry points: [`Module::verify`] and [`Function::verify`].

use std::collections::HashSet;
use std::fmt;

use crate::function::Function;
use crate::instruction::Inst;
use crate::module::Module;

/// Location context for a verification error.
#[derive(Debug, Clone)]
pub enum Location {
    Module,
    Function(String),
    Block(String, String),
    Instruction(String, String, usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Module => write!(f, "module"),
            Location::Function(name) => write!(f, "func {name}"),
            Location::Block(name, label) => write!(f, "func {name}, block {label}"),
            Location::Instruction(name, label, idx) => {
                write!(f, "func {name}, block {label}, inst {idx}")
            }
        }
    }
}

/// A single verification error.
#[derive(Debug, Clone)]
pub struct VerifyError {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.location, self.message)
    }
}

/// Collected verification results.
#[derive(Debug, Default)]
pub struct VerifyResult {
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, location: Location, message: impl Into<String>) {
        self.errors.push(VerifyError {
            location,
            message: message.into(),
        });
    }
}

impl fmt::Display for VerifyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "verification passed");
        }
        writeln!(f, "verification failed with {} error(s):", self.errors.len())?;
        for e in &self.errors {
            writeln!(f, "  {e}")?;
        }
        Ok(())
    }
}

impl Function {
    /// Check structural integrity: every handle in range, at most two
    /// successors per block, and every branch target recorded as an edge.
    pub fn verify(&self) -> VerifyResult {
        let mut result = VerifyResult::default();
        self.verify_into(&mut result);
        result
    }

    fn verify_into(&self, result: &mut VerifyResult) {
        let reg_count = self.regs.len() as u32;
        let mem_count = self.mems.len() as u32;
        let block_count = self.blocks.len();

        for block in &self.blocks {
            if block.out_edges.len() > 2 {
                result.error(
                    Location::Block(self.name.clone(), block.label.clone()),
                    format!("{} successor edges, at most 2 allowed", block.out_edges.len()),
                );
            }
            for &e in &block.out_edges {
                if e.index() >= block_count {
                    result.error(
                        Location::Block(self.name.clone(), block.label.clone()),
                        format!("successor {} out of range", e.index()),
                    );
                }
            }

            let edges: HashSet<usize> = block.out_edges.iter().map(|e| e.index()).collect();
            for (idx, inst) in block.instructions.iter().enumerate() {
                let at = || Location::Instruction(self.name.clone(), block.label.clone(), idx);

                // Slot bounds come first: operand enumeration reads through
                // the slot to find its base register.
                let mut slot_ok = true;
                match inst {
                    Inst::Memory { loc, .. }
                    | Inst::ArrayAccess { loc, .. }
                    | Inst::StackAddr { loc, .. } => {
                        if loc.index() >= mem_count {
                            result.error(at(), format!("memory slot {} out of range", loc.index()));
                            slot_ok = false;
                        }
                    }
                    Inst::Call(call) => {
                        if call.args.len() > call.callee.argc {
                            result.error(
                                at(),
                                format!(
                                    "{} arguments passed to {}, which takes {}",
                                    call.args.len(),
                                    call.callee.name,
                                    call.callee.argc
                                ),
                            );
                        }
                    }
                    _ => {}
                }

                if slot_ok {
                    let mut operands = Vec::new();
                    inst.reads(&self.mems, &mut operands);
                    if let Some(d) = inst.def() {
                        operands.push(d);
                    }
                    if let Inst::Phi(x, y) = inst {
                        operands.push(*x);
                        operands.push(*y);
                    }
                    for r in operands {
                        if r.index() >= reg_count {
                            result.error(at(), format!("register {} out of range", r.index()));
                        }
                    }
                }

                if let Some(target) = inst.branch_target() {
                    if target.index() >= block_count {
                        result.error(at(), format!("branch target {} out of range", target.index()));
                    } else if !edges.contains(&target.index()) {
                        result.error(
                            at(),
                            format!(
                                "branch target {} is not a successor edge",
                                self.blocks[target.index()].label
                            ),
                        );
                    }
                }
            }
        }
    }
}

impl Module {
    /// Verify every function, plus module-level name uniqueness.
    pub fn verify(&self) -> VerifyResult {
        let mut result = VerifyResult::default();
        let mut names = HashSet::new();
        for func in &self.functions {
            if !names.insert(func.name.as_str()) {
                result.error(
                    Location::Module,
                    format!("duplicate function name {}", func.name),
                );
            }
        }
        for ext in &self.externs {
            if names.contains(ext.name.as_str()) {
                result.error(
                    Location::Module,
                    format!("extern {} shadows a defined function", ext.name),
                );
            }
        }
        for func in &self.functions {
            func.verify_into(&mut result);
        }
        result
    }
}
