use prometheus::{Encoder, TextEncoder};

use crate::error::Error;

pub async fn metrics_handler() -> Result<String, Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| Error::Internal {
            message: format!("Failed to encode metrics: {e}"),
        })?;
    String::from_utf8(buffer).map_err(|e| Error::Internal {
        message: format!("Metrics are not valid utf-8: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::REQUEST_TOTAL;

    #[tokio::test]
    async fn exposes_registered_counters() {
        REQUEST_TOTAL.inc();
        let text = metrics_handler().await.unwrap();
        assert!(text.contains("scan_requests_total"));
    }
}
