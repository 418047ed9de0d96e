//! Model files and class vocabularies

pub mod classes;
pub mod manager;

pub use manager::ModelManager;
