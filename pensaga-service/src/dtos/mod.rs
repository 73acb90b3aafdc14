pub mod generation;
pub mod payments;

pub use generation::*;
pub use payments::*;
