pub mod actions;
pub mod historical;
pub mod interest;
pub mod market;
pub mod risk;
pub mod session;
pub mod stress;
