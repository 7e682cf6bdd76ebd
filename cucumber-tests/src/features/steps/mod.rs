// Administration path
pub mod matrix_steps;

// Authorization path
pub mod gate_steps;
