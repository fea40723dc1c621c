use crate::crawler::PageResult;
use serde::Serialize;

/// Aggregate statistics over a batch of page results.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub total_pages: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage in `[0, 100]`; zero for an empty batch.
    pub success_rate: f64,
}

impl CrawlStats {
    pub fn from_results(results: &[PageResult]) -> Self {
        let total_pages = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let failed = total_pages - successful;
        let success_rate = if total_pages == 0 {
            0.0
        } else {
            successful as f64 / total_pages as f64 * 100.0
        };
        Self {
            total_pages,
            successful,
            failed,
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(url: &str, success: bool) -> PageResult {
        PageResult {
            url: url.to_string(),
            fetched_at: Utc::now(),
            success,
            content: success.then(|| "<html></html>".to_string()),
            error: (!success).then(|| "connection reset".to_string()),
        }
    }

    #[test]
    fn test_counts_and_rate() {
        let results = vec![
            result("https://a.test/", true),
            result("https://a.test/b", true),
            result("https://a.test/c", false),
            result("https://a.test/d", true),
        ];
        let stats = CrawlStats::from_results(&results);
        assert_eq!(stats.total_pages, 4);
        assert_eq!(stats.successful, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.success_rate, 75.0);
    }

    #[test]
    fn test_empty_batch() {
        let stats = CrawlStats::from_results(&[]);
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.success_rate, 0.0);
    }
}
