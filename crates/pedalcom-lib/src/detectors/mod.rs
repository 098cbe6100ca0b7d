pub mod crank;
