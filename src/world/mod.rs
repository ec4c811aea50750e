pub mod aim;
pub mod grid;
pub mod pose;
pub mod position;
pub mod raycast;
pub mod time;
pub mod view;
