pub mod cli;
pub mod registry;
pub mod store;
