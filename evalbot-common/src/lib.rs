pub mod messages;
pub mod timefmt;
pub mod types;

pub use messages::*;
pub use timefmt::*;
pub use types::*;
