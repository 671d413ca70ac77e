//! Identifiers shared by every compiler stage

/// Basic block identifier, unique within one function
pub type BlockId = u32;

/// Register slot index inside a block.
///
/// Slots `0..argument_count` are block arguments, slot `argument_count + i`
/// is the output of the instruction at index `i`.
pub type SlotId = u32;

/// Word size the IR integer semantics are defined for
pub const INT_BITS: u32 = 32;
