pub mod applications;
pub mod terms;
