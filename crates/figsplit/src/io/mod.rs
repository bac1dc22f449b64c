pub mod export;
pub mod naming;

pub use export::*;
pub use naming::*;
