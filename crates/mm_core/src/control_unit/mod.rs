//! Control-unit family: one shared fetch/advance-PC skeleton, one implementation per
//! instruction-layout variant.

mod mm0;
mod mm1;
mod mm2;
mod mm3;

pub use mm0::Mm0;
pub use mm1::Mm1;
pub use mm2::Mm2;
pub use mm3::Mm3;

use mm_util::Cell;

use crate::alu::{flag, Alu, Comparison, HaltReason};
use crate::opcode::Opcode;
use crate::ram::Ram;
use crate::register::{RegisterMemory, RegisterName};

/// One variant of the control-unit family. Only decode/load/execute/write-back differ
/// between variants; fetch and the run loop are shared (see [`step`] and [`run`]).
pub trait ControlUnit {
    /// Width of one fetched instruction, in bits. Always a multiple of `word_bits()`.
    fn ir_bits(&self) -> u32;

    fn word_bits(&self) -> u32;

    /// Decode and run one already-fetched instruction word through write-back.
    fn execute(
        &self,
        ir: Cell,
        rf: &mut RegisterMemory,
        ram: &mut Ram,
        alu: &Alu,
    ) -> Result<(), HaltReason>;
}

/// Fetch, advance `PC`, and run one variant's decode/execute/write-back. A no-op once
/// `FLAGS.HALT` is set. Returns the reason if this step is the one that halted.
pub fn step(
    cu: &dyn ControlUnit,
    rf: &mut RegisterMemory,
    ram: &mut Ram,
    alu: &Alu,
) -> Option<HaltReason> {
    if alu.is_halted(rf) {
        return None;
    }

    let pc = rf.fetch(RegisterName::Pc).value();
    let ir = match ram.fetch(pc, cu.ir_bits()) {
        Ok(ir) => ir,
        Err(reason) => {
            alu.halt(rf);
            return Some(reason);
        }
    };

    rf.put(RegisterName::Ir, ir);

    let words = (cu.ir_bits() / cu.word_bits()) as u64;
    let pc_width = rf.width_of(RegisterName::Pc);
    rf.put(RegisterName::Pc, Cell::new(pc_width, pc.wrapping_add(words)));

    match cu.execute(ir, rf, ram, alu) {
        Ok(()) => None,
        Err(reason) => {
            alu.halt(rf);
            debug!("halting at pc={pc:#x}: {reason}");
            Some(reason)
        }
    }
}

/// Step until `FLAGS.HALT` is set, returning the reason for the halt.
pub fn run(cu: &dyn ControlUnit, rf: &mut RegisterMemory, ram: &mut Ram, alu: &Alu) -> Option<HaltReason> {
    let mut reason = None;
    while !alu.is_halted(rf) {
        if let Some(r) = step(cu, rf, ram, alu) {
            reason = Some(r);
        }
    }
    reason
}

/// Run the arithmetic family opcode against `R1`/`R2` already staged in `rf`, per the
/// `AluRegisters` binding the ALU was built with.
fn apply_arithmetic(op: Opcode, rf: &mut RegisterMemory, alu: &Alu) -> Result<(), HaltReason> {
    match op {
        Opcode::Add => Ok(alu.add(rf)),
        Opcode::Sub => Ok(alu.sub(rf)),
        Opcode::Umul => Ok(alu.umul(rf)),
        Opcode::Smul => Ok(alu.smul(rf)),
        Opcode::Udiv => alu.udiv(rf),
        Opcode::Umod => alu.umod(rf),
        Opcode::Sdiv => alu.sdiv(rf),
        Opcode::Smod => alu.smod(rf),
        _ => unreachable!("{op} is not an arithmetic opcode"),
    }
}

/// Run a jump family opcode, given `FLAGS`/`ADDR` already staged by the caller's load
/// phase. `jneq` is decoded directly from `ZF` since it's the one jump that isn't a
/// strict-or-equal ordering relation.
fn apply_jump(op: Opcode, rf: &mut RegisterMemory, alu: &Alu) {
    match op {
        Opcode::Jump => alu.jump(rf),
        Opcode::Jeq => alu.cond_jump(rf, false, Comparison::Equal, false),
        Opcode::Jneq => {
            if alu.flags(rf) & flag::ZF == 0 {
                alu.jump(rf);
            }
        }
        Opcode::Sjl => alu.cond_jump(rf, true, Comparison::Less, false),
        Opcode::Sjgeq => alu.cond_jump(rf, true, Comparison::Greater, true),
        Opcode::Sjleq => alu.cond_jump(rf, true, Comparison::Less, true),
        Opcode::Sjg => alu.cond_jump(rf, true, Comparison::Greater, false),
        Opcode::Ujl => alu.cond_jump(rf, false, Comparison::Less, false),
        Opcode::Ujgeq => alu.cond_jump(rf, false, Comparison::Greater, true),
        Opcode::Ujleq => alu.cond_jump(rf, false, Comparison::Less, true),
        Opcode::Ujg => alu.cond_jump(rf, false, Comparison::Greater, false),
        _ => unreachable!("{op} is not a jump opcode"),
    }
}

/// Decode an opcode word: low byte is the opcode, the rest must be zero.
fn decode_opcode(op_word: Cell) -> Result<Opcode, HaltReason> {
    if op_word.width() > 8 && op_word.slice(8, op_word.width()).value() != 0 {
        return Err(HaltReason::ReservedBits);
    }
    Opcode::decode(op_word.slice(0, 8.min(op_word.width())).value()).ok_or(HaltReason::UnknownOpcode)
}
