//! Arithmetic/logic unit: one primitive operation per call, always ending in a
//! `set_flags` update.

use mm_util::{numeric, Cell};

use crate::register::{RegisterMemory, RegisterName};

/// Bit positions inside the `FLAGS` register. Kept as a single integer with named bits
/// rather than a struct of booleans, so `set_flags` has one place to update them all.
pub mod flag {
    pub const ZF: u64 = 1 << 0;
    pub const SF: u64 = 1 << 1;
    pub const CF: u64 = 1 << 2;
    pub const OF: u64 = 1 << 3;
    pub const HALT: u64 = 1 << 4;
}

/// Why the machine halted. Attached to the control unit rather than the raw `FLAGS`
/// bit, so the printer/debugger can explain a halt without guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HaltReason {
    #[error("halt instruction")]
    Halted,
    #[error("unknown opcode")]
    UnknownOpcode,
    #[error("reserved bits must be zero")]
    ReservedBits,
    #[error("division by zero")]
    DivisionByZero,
    #[error("reading dirty memory")]
    ReadingDirtyMemory,
}

/// Which concrete [`RegisterName`] plays each of the ALU's logical roles for a given
/// control unit. `S` and `RES` may name the same register on machines that only ever
/// produce a single-word result.
#[derive(Debug, Clone, Copy)]
pub struct AluRegisters {
    pub r1: RegisterName,
    pub r2: RegisterName,
    pub s: RegisterName,
    pub res: RegisterName,
}

/// Relation tested by a conditional jump, decoded from the flags left by a prior `sub`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    Less,
    Greater,
}

/// Executes one primitive arithmetic/logic/comparison operation per call. Holds no
/// register state of its own -- every call borrows the [`RegisterMemory`] it should
/// read and write for the duration of the call.
pub struct Alu {
    regs: AluRegisters,
    width: u32,
}

impl Alu {
    pub fn new(regs: AluRegisters, width: u32) -> Self {
        Self { regs, width }
    }

    pub fn registers(&self) -> AluRegisters {
        self.regs
    }

    /// Apply the set-flags rule: given the raw signed/unsigned mathematical results of
    /// the last op, derive `ZF`/`SF`/`CF`/`OF` and store them in `FLAGS`. This is the
    /// one place flag semantics live.
    fn set_flags(&self, rf: &mut RegisterMemory, result: numeric::WideResult) {
        let w = self.width as i128;
        let modulus = 1_i128 << self.width;
        let wrapped = result.unsigned.rem_euclid(modulus);

        let zf = wrapped == 0;
        let sf = (wrapped >> (self.width - 1)) & 1 == 1;
        let cf = result.unsigned < 0 || result.unsigned >= modulus;
        let of = result.signed < -(1_i128 << (w - 1)) || result.signed >= (1_i128 << (w - 1));

        let mut bits = 0_u64;
        if zf {
            bits |= flag::ZF;
        }
        if sf {
            bits |= flag::SF;
        }
        if cf {
            bits |= flag::CF;
        }
        if of {
            bits |= flag::OF;
        }
        self.put_flags(rf, bits);
    }

    fn put_flags(&self, rf: &mut RegisterMemory, bits: u64) {
        let width = rf.width_of(RegisterName::Flags);
        rf.put(RegisterName::Flags, Cell::new(width, bits));
    }

    pub fn flags(&self, rf: &RegisterMemory) -> u64 {
        rf.fetch(RegisterName::Flags).value()
    }

    pub fn is_halted(&self, rf: &RegisterMemory) -> bool {
        self.flags(rf) & flag::HALT != 0
    }

    /// Set the `HALT` bit without disturbing the other flags, recording why.
    pub fn halt(&self, rf: &mut RegisterMemory) {
        let bits = self.flags(rf) | flag::HALT;
        self.put_flags(rf, bits);
    }

    fn operands(&self, rf: &RegisterMemory) -> (Cell, Cell) {
        (rf.fetch(self.regs.r1), rf.fetch(self.regs.r2))
    }

    pub fn add(&self, rf: &mut RegisterMemory) {
        let (a, b) = self.operands(rf);
        let result = numeric::add(a, b);
        rf.put(self.regs.s, result.reduce(self.width));
        self.set_flags(rf, result);
    }

    pub fn sub(&self, rf: &mut RegisterMemory) {
        let (a, b) = self.operands(rf);
        let result = numeric::sub(a, b);
        rf.put(self.regs.s, result.reduce(self.width));
        self.set_flags(rf, result);
    }

    /// `sub` without writing `S` back -- used for the `comp` idiom.
    pub fn compare(&self, rf: &mut RegisterMemory) {
        let (a, b) = self.operands(rf);
        let result = numeric::sub(a, b);
        self.set_flags(rf, result);
    }

    pub fn umul(&self, rf: &mut RegisterMemory) {
        let (a, b) = self.operands(rf);
        let result = numeric::umul(a, b);
        rf.put(self.regs.s, result.reduce(self.width));
        self.set_flags(rf, result);
    }

    pub fn smul(&self, rf: &mut RegisterMemory) {
        let (a, b) = self.operands(rf);
        let result = numeric::smul(a, b);
        rf.put(self.regs.s, result.reduce(self.width));
        self.set_flags(rf, result);
    }

    /// Unsigned division. Writes the quotient to `S` and the remainder to `RES`
    /// (the dword write-back pair). Halts with [`HaltReason::DivisionByZero`] and
    /// leaves `S`/`RES` unspecified if the divisor is zero.
    pub fn udiv(&self, rf: &mut RegisterMemory) -> Result<(), HaltReason> {
        let (a, b) = self.operands(rf);
        let Some(q) = numeric::udiv(a, b) else {
            self.halt(rf);
            return Err(HaltReason::DivisionByZero);
        };
        let r = numeric::umod(a, b).expect("checked divisor above");
        rf.put(self.regs.s, q.reduce(self.width));
        rf.put(self.regs.res, r.reduce(self.width));
        self.set_flags(rf, q);
        Ok(())
    }

    /// Unsigned remainder only, written to `S`.
    pub fn umod(&self, rf: &mut RegisterMemory) -> Result<(), HaltReason> {
        let (a, b) = self.operands(rf);
        let Some(result) = numeric::umod(a, b) else {
            self.halt(rf);
            return Err(HaltReason::DivisionByZero);
        };
        rf.put(self.regs.s, result.reduce(self.width));
        self.set_flags(rf, result);
        Ok(())
    }

    /// Signed division, truncating toward zero. Writes the quotient to `S` and the
    /// remainder to `RES`.
    pub fn sdiv(&self, rf: &mut RegisterMemory) -> Result<(), HaltReason> {
        let (a, b) = self.operands(rf);
        let Some(q) = numeric::sdiv(a, b) else {
            self.halt(rf);
            return Err(HaltReason::DivisionByZero);
        };
        let r = numeric::smod(a, b).expect("checked divisor above");
        rf.put(self.regs.s, q.reduce(self.width));
        rf.put(self.regs.res, r.reduce(self.width));
        self.set_flags(rf, q);
        Ok(())
    }

    /// Signed remainder only, written to `S`. Takes the sign of the dividend.
    pub fn smod(&self, rf: &mut RegisterMemory) -> Result<(), HaltReason> {
        let (a, b) = self.operands(rf);
        let Some(result) = numeric::smod(a, b) else {
            self.halt(rf);
            return Err(HaltReason::DivisionByZero);
        };
        rf.put(self.regs.s, result.reduce(self.width));
        self.set_flags(rf, result);
        Ok(())
    }

    /// Unconditional jump: copy the target staged in `ADDR` by the control unit's load
    /// phase straight into `PC`. `ADDR` is a fixed register name, not part of the
    /// `AluRegisters` binding, since every variant stages jump targets the same way.
    pub fn jump(&self, rf: &mut RegisterMemory) {
        let target = rf.fetch(RegisterName::Addr);
        let pc_width = rf.width_of(RegisterName::Pc);
        rf.put(RegisterName::Pc, target.resize(pc_width));
    }

    /// Inspect the flags left by a prior `sub`/`compare` and, if the predicate holds,
    /// copy the staged target register into `PC`.
    ///
    /// `LESS`/`GREATER` with `equal = true` also fire on equality.
    pub fn cond_jump(&self, rf: &mut RegisterMemory, signed: bool, comparison: Comparison, equal: bool) {
        let bits = self.flags(rf);
        let zf = bits & flag::ZF != 0;
        let sf = bits & flag::SF != 0;
        let cf = bits & flag::CF != 0;
        let of = bits & flag::OF != 0;

        let strict = match (comparison, signed) {
            (Comparison::Equal, _) => zf,
            (Comparison::Less, false) => cf,
            (Comparison::Less, true) => sf != of,
            (Comparison::Greater, false) => !cf && !zf,
            (Comparison::Greater, true) => sf == of && !zf,
        };

        let should_jump = match comparison {
            Comparison::Equal => strict,
            Comparison::Less | Comparison::Greater => strict || (equal && zf),
        };

        if should_jump {
            self.jump(rf);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const WIDTH: u32 = 8;

    fn alu_and_registers() -> (Alu, RegisterMemory) {
        let regs = AluRegisters {
            r1: RegisterName::R1,
            r2: RegisterName::R2,
            s: RegisterName::S,
            res: RegisterName::Res,
        };
        let rf = RegisterMemory::new(&[
            (RegisterName::R1, WIDTH),
            (RegisterName::R2, WIDTH),
            (RegisterName::S, WIDTH),
            (RegisterName::Res, WIDTH),
            (RegisterName::Flags, WIDTH),
            (RegisterName::Pc, WIDTH),
            (RegisterName::Addr, WIDTH),
        ]);
        (Alu::new(regs, WIDTH), rf)
    }

    #[test]
    fn add_sets_zero_flag() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, 0));
        rf.put(RegisterName::R2, Cell::new(WIDTH, 0));
        alu.add(&mut rf);
        assert_eq!(rf.fetch(RegisterName::S).value(), 0);
        assert_eq!(alu.flags(&rf), flag::ZF);
    }

    #[test]
    fn add_reports_carry_and_zero_on_wraparound() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, 200));
        rf.put(RegisterName::R2, Cell::new(WIDTH, 56));
        alu.add(&mut rf);
        assert_eq!(rf.fetch(RegisterName::S).value(), 0);
        assert_eq!(alu.flags(&rf), flag::ZF | flag::CF);
    }

    #[test]
    fn sub_of_equal_operands_is_always_zero() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, 77));
        rf.put(RegisterName::R2, Cell::new(WIDTH, 77));
        alu.sub(&mut rf);
        assert_eq!(rf.fetch(RegisterName::S).value(), 0);
        assert_eq!(alu.flags(&rf), flag::ZF);
    }

    #[test]
    fn division_by_zero_halts() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, 10));
        rf.put(RegisterName::R2, Cell::new(WIDTH, 0));
        let err = alu.sdiv(&mut rf).unwrap_err();
        assert_eq!(err, HaltReason::DivisionByZero);
        assert!(alu.is_halted(&rf));
    }

    #[test]
    fn smod_takes_sign_of_dividend() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, (-27_i32 as u8) as u64));
        rf.put(RegisterName::R2, Cell::new(WIDTH, 5));
        alu.smod(&mut rf).unwrap();
        assert_eq!(rf.fetch(RegisterName::S).value(), (-2_i32 as u8) as u64);
        assert_eq!(alu.flags(&rf), flag::SF | flag::CF);
    }

    #[test]
    fn cond_jump_signed_less_than() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, (-3_i32 as u8) as u64));
        rf.put(RegisterName::R2, Cell::new(WIDTH, 5));
        alu.sub(&mut rf);

        rf.put(RegisterName::Addr, Cell::new(WIDTH, 0x40));
        rf.put(RegisterName::Pc, Cell::new(WIDTH, 0));
        alu.cond_jump(&mut rf, true, Comparison::Less, false);
        assert_eq!(rf.fetch(RegisterName::Pc).value(), 0x40);
    }

    #[test]
    fn cond_jump_does_not_fire_when_predicate_is_false() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, 5));
        rf.put(RegisterName::R2, Cell::new(WIDTH, (-3_i32 as u8) as u64));
        alu.sub(&mut rf);

        rf.put(RegisterName::Addr, Cell::new(WIDTH, 0x40));
        rf.put(RegisterName::Pc, Cell::new(WIDTH, 0));
        alu.cond_jump(&mut rf, true, Comparison::Less, false);
        assert_eq!(rf.fetch(RegisterName::Pc).value(), 0);
    }

    #[test]
    fn halt_is_idempotent_on_other_flags() {
        let (alu, mut rf) = alu_and_registers();
        rf.put(RegisterName::R1, Cell::new(WIDTH, 5));
        rf.put(RegisterName::R2, Cell::new(WIDTH, 5));
        alu.sub(&mut rf);
        assert_eq!(alu.flags(&rf), flag::ZF);
        alu.halt(&mut rf);
        assert_eq!(alu.flags(&rf), flag::ZF | flag::HALT);
    }
}
