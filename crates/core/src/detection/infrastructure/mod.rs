pub mod interval_detector;
pub mod skin_scan_detector;
pub mod system_entropy;
