pub mod export;
pub mod kinematics;
pub mod text;
