pub mod handle_table;
pub mod slot_arena;

pub use handle_table::{ChainNode, HandleTable};
pub use slot_arena::{SlotArena, SlotId};
