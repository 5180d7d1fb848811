pub mod bounding_box;
pub mod config_resolver;
pub mod constants;
pub mod frame;
pub mod video_metadata;
