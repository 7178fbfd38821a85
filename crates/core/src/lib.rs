pub mod alerting;
pub mod detection;
pub mod pipeline;
pub mod recognition;
pub mod shared;
pub mod video;
