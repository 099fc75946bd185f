use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("scan_requests_total", "Total number of scan requests").unwrap();
    pub static ref ADMISSIONS_DENIED: Counter =
        register_counter!("scan_admissions_denied_total", "Scan requests rejected by the rate limiter").unwrap();
    pub static ref EXTRACTIONS_TOTAL: Counter =
        register_counter!("scan_extractions_total", "Images extracted successfully").unwrap();
    pub static ref EXTRACTION_FAILURES: Counter =
        register_counter!("scan_extraction_failures_total", "Images whose extraction failed").unwrap();
    pub static ref BATCH_SIZE: Histogram = register_histogram!(
        "scan_batch_size",
        "Number of images per batch",
        vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .unwrap();
    pub static ref BATCH_LATENCY: Histogram = register_histogram!(
        "scan_batch_latency_seconds",
        "Batch latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge =
        register_gauge!("scan_rate_limit_keys", "Current number of tracked rate limit keys").unwrap();
}
