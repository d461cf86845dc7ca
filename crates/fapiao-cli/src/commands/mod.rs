pub mod batch;
pub mod config;
pub mod layout;
pub mod process;
