pub mod cursor;
pub mod keyset;

pub use cursor::{CursorError, Position};
pub use keyset::{Direction, Keyed, Limits, Page, PageQuery, PageRequest};
