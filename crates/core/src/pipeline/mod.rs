pub mod face_compositor;
pub mod face_gallery;
pub mod infrastructure;
pub mod pipeline_logger;
pub mod scan_faces_use_case;
