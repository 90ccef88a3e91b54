pub mod color;
pub mod models;
pub mod settings;
