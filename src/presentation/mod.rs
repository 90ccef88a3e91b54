pub mod app;
pub mod components;
pub mod inputs;
pub mod screens;
pub mod theme;
