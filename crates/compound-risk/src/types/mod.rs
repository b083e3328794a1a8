pub mod health;
pub mod market;
pub mod numeric;
pub mod position;

pub use health::*;
pub use market::*;
pub use position::*;
