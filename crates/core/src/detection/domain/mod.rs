pub mod detected_face;
pub mod detection_config;
pub mod face_detector;
pub mod frame_scanner;
pub mod randomness;
pub mod region_grower;
pub mod skin_classifier;
