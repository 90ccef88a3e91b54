pub mod connect;
pub mod control;
