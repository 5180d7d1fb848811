pub mod threaded_scan_executor;
