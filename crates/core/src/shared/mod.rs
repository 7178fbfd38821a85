pub mod config;
pub mod constants;
pub mod frame;
pub mod imaging;
pub mod label_font;
pub mod model_resolver;
pub mod region;
