pub mod bounding_box;
pub mod clock;
pub mod config;
pub mod constants;
pub mod frame;
