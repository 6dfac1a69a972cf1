pub mod attempt_service;
pub mod grading_service;
pub mod metrics_service;
pub mod progress_service;
