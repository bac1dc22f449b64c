pub mod binarize;
pub mod components;
pub mod crop;
pub mod filtering;

pub use binarize::*;
pub use components::*;
pub use crop::*;
pub use filtering::*;
