pub mod attendance;
pub mod capture;
pub mod detection;
pub mod identity;
pub mod notification;
pub mod pipeline;
pub mod shared;
