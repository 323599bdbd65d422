pub mod bit;
pub mod cell;
pub mod numeric;

pub use bit::{Bit, BitSet};
pub use cell::Cell;
