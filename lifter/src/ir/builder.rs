//! Per-instruction statement builder.
//!
//! The builder is a growable, append-only buffer of statements plus the
//! allocator for temporaries and labels. One builder serves exactly one
//! instruction translation; appended order is the emitted order and is
//! never rearranged.

use crate::ir::expr::{Expr, Var};
use crate::ir::stmt::{Label, SideEffect, Stmt};

#[derive(Debug, Default)]
pub struct StmtBuilder {
    stmts: Vec<Stmt>,
    next_tmp: u32,
    next_label: u32,
}

impl StmtBuilder {
    /// Creates a builder with an expected statement-count hint.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stmts: Vec::with_capacity(capacity),
            next_tmp: 0,
            next_label: 0,
        }
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    /// A fresh temporary of the given width, unique within this builder.
    pub fn tmp_var(&mut self, width: u32) -> Var {
        let id = self.next_tmp;
        self.next_tmp += 1;
        Var::Tmp { id, width }
    }

    /// A fresh label; the symbolic name is only for readability.
    pub fn new_label(&mut self, name: &str) -> Label {
        let id = self.next_label;
        self.next_label += 1;
        Label {
            name: name.to_owned(),
            id,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Converts the buffer into the immutable emitted sequence.
    #[must_use]
    pub fn finish(self) -> Vec<Stmt> {
        self.stmts
    }

    pub fn put(&mut self, dst: Var, src: Expr) {
        self.push(Stmt::Put { dst, src });
    }

    pub fn store(&mut self, addr: Expr, value: Expr) {
        self.push(Stmt::Store { addr, value });
    }

    pub fn lmark(&mut self, label: Label) {
        self.push(Stmt::LMark(label));
    }

    pub fn jmp(&mut self, label: Label) {
        self.push(Stmt::Jmp(label));
    }

    pub fn cjmp(&mut self, cond: Expr, taken: Label, not_taken: Label) {
        self.push(Stmt::CJmp {
            cond,
            taken,
            not_taken,
        });
    }

    pub fn inter_jmp(&mut self, pc: Var, target: Expr) {
        self.push(Stmt::InterJmp { pc, target });
    }

    pub fn side_effect(&mut self, kind: SideEffect) {
        self.push(Stmt::SideEffect(kind));
    }

    pub fn is_mark(&mut self, addr: u64, len: u32) {
        self.push(Stmt::ISMark { addr, len });
    }

    pub fn ie_mark(&mut self, addr: u64) {
        self.push(Stmt::IEMark { addr });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::register::Register;
    use crate::ir::expr::{num_u32, var};
    use pretty_assertions::assert_eq;

    #[test]
    fn appends_preserve_order() {
        let mut bld = StmtBuilder::with_capacity(4);
        bld.is_mark(0x1000, 4);
        bld.put(Var::Reg(Register::R0), num_u32(5));
        bld.ie_mark(0x1004);
        let stmts = bld.finish();
        assert_eq!(
            stmts,
            vec![
                Stmt::ISMark {
                    addr: 0x1000,
                    len: 4
                },
                Stmt::Put {
                    dst: Var::Reg(Register::R0),
                    src: num_u32(5)
                },
                Stmt::IEMark { addr: 0x1004 },
            ]
        );
    }

    #[test]
    fn temporaries_and_labels_are_unique() {
        let mut bld = StmtBuilder::with_capacity(0);
        let t0 = bld.tmp_var(32);
        let t1 = bld.tmp_var(1);
        assert_eq!(t0, Var::Tmp { id: 0, width: 32 });
        assert_eq!(t1, Var::Tmp { id: 1, width: 1 });

        let l0 = bld.new_label("pass");
        let l1 = bld.new_label("pass");
        assert_ne!(l0, l1);
        assert_eq!(l0.to_string(), "pass_0");
        assert_eq!(l1.to_string(), "pass_1");
    }

    #[test]
    fn independent_builders_do_not_share_ids() {
        let mut a = StmtBuilder::with_capacity(0);
        let mut b = StmtBuilder::with_capacity(0);
        assert_eq!(a.tmp_var(32), b.tmp_var(32));
    }

    #[test]
    fn conditional_skeleton() {
        let mut bld = StmtBuilder::with_capacity(8);
        let pass = bld.new_label("pass");
        let fail = bld.new_label("fail");
        bld.cjmp(var(Register::R0).eq(num_u32(0)), pass.clone(), fail.clone());
        bld.lmark(pass);
        bld.put(Var::Reg(Register::R1), num_u32(1));
        bld.lmark(fail);
        let stmts = bld.finish();
        assert_eq!(stmts.len(), 4);
        assert!(matches!(stmts[0], Stmt::CJmp { .. }));
        assert!(matches!(stmts[3], Stmt::LMark(_)));
    }
}
