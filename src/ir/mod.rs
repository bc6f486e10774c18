pub mod circuit;
pub mod walk;
