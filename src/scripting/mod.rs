pub mod condition;
pub mod reader;
pub mod rule;
pub mod store;
