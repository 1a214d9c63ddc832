pub mod config;
pub mod messages;
pub mod motion;
pub mod motor;
pub mod runtime;
pub mod sim;
pub mod surface;
