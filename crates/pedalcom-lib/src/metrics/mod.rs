pub mod energy;
pub mod power;
