pub mod cooldown;
pub mod payload;
pub mod presentation;
pub mod resolver;
pub mod session;
