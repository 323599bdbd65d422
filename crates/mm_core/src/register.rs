//! Named register file shared by the ALU and the control unit.

use std::collections::HashMap;
use std::fmt;

use mm_util::Cell;

/// The machine's named registers.
///
/// Not every control unit variant uses every member: `ADDR` only matters to the
/// variants that stage a jump target before handing it to the ALU, and `SP` only
/// exists on the stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterName {
    /// Program counter / instruction pointer.
    Pc,
    /// Instruction register, holds the currently decoded instruction word.
    Ir,
    /// Flags register (`ZF`, `SF`, `CF`, `OF`, `HALT`).
    Flags,
    /// Staging register for a jump target, loaded before a jump is executed.
    Addr,
    /// First ALU operand / accumulator.
    R1,
    /// Second ALU operand.
    R2,
    /// Primary ALU result.
    S,
    /// Secondary ALU result, used by the dword-producing arithmetic ops.
    Res,
    /// Stack pointer, used only by the stack machine.
    Sp,
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RegisterName::Pc => "PC",
            RegisterName::Ir => "IR",
            RegisterName::Flags => "FLAGS",
            RegisterName::Addr => "ADDR",
            RegisterName::R1 => "R1",
            RegisterName::R2 => "R2",
            RegisterName::S => "S",
            RegisterName::Res => "RES",
            RegisterName::Sp => "SP",
        };
        f.write_str(name)
    }
}

/// A mapping from [`RegisterName`] to [`Cell`], each with its own fixed width set at
/// construction. Lives exactly as long as the owning CPU.
pub struct RegisterMemory {
    cells: HashMap<RegisterName, Cell>,
}

impl RegisterMemory {
    /// Build a register file from `(name, width)` pairs, every register starting at zero.
    pub fn new(widths: &[(RegisterName, u32)]) -> Self {
        let cells = widths
            .iter()
            .map(|&(name, width)| (name, Cell::zero(width)))
            .collect();
        Self { cells }
    }

    /// Read a register's current value.
    ///
    /// # Panics
    ///
    /// Panics if `name` wasn't declared for this register file.
    pub fn fetch(&self, name: RegisterName) -> Cell {
        *self
            .cells
            .get(&name)
            .unwrap_or_else(|| panic!("register {name} not present in this register file"))
    }

    /// Write a register. `value` must match the register's declared width.
    ///
    /// # Panics
    ///
    /// Panics if `name` wasn't declared, or if `value.width()` disagrees with it.
    pub fn put(&mut self, name: RegisterName, value: Cell) {
        let slot = self
            .cells
            .get_mut(&name)
            .unwrap_or_else(|| panic!("register {name} not present in this register file"));
        assert_eq!(
            slot.width(),
            value.width(),
            "width mismatch writing register {name}: expected {}, got {}",
            slot.width(),
            value.width(),
        );
        *slot = value;
    }

    pub fn width_of(&self, name: RegisterName) -> u32 {
        self.fetch(name).width()
    }
}
