pub mod aggregate;
pub mod risk;
pub mod suggest;
