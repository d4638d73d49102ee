use std::sync::OnceLock;

pub const MAX_SCAN_CONCURRENCY: usize = 32;

const SCAN_CONCURRENCY_ENV: &str = "SYNAPSE_SCAN_CONCURRENCY";

static ENV_SCAN_CONCURRENCY: OnceLock<Option<usize>> = OnceLock::new();

fn default_scan_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).clamp(1, 16)
}

fn parse_scan_concurrency(raw: Option<&str>) -> Option<usize> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .map(|v| v.clamp(1, MAX_SCAN_CONCURRENCY))
}

fn scan_concurrency_from_env() -> Option<usize> {
    *ENV_SCAN_CONCURRENCY.get_or_init(|| {
        let raw = std::env::var(SCAN_CONCURRENCY_ENV).ok();
        parse_scan_concurrency(raw.as_deref())
    })
}

/// Fan-out window for per-file scans: the environment wins over the
/// configured value, which wins over a CPU-based default.
pub fn scan_concurrency(configured: Option<usize>) -> usize {
    scan_concurrency_from_env()
        .or_else(|| configured.map(|v| v.clamp(1, MAX_SCAN_CONCURRENCY)))
        .unwrap_or_else(default_scan_concurrency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scan_concurrency_ignores_noise_and_clamps() {
        assert_eq!(parse_scan_concurrency(None), None);
        assert_eq!(parse_scan_concurrency(Some("")), None);
        assert_eq!(parse_scan_concurrency(Some("   ")), None);
        assert_eq!(parse_scan_concurrency(Some("abc")), None);
        assert_eq!(parse_scan_concurrency(Some("2")), Some(2));
        assert_eq!(parse_scan_concurrency(Some(" 5 ")), Some(5));
        assert_eq!(parse_scan_concurrency(Some("0")), Some(1));
        assert_eq!(
            parse_scan_concurrency(Some("999")),
            Some(MAX_SCAN_CONCURRENCY)
        );
    }

    #[test]
    fn default_window_is_bounded() {
        let value = default_scan_concurrency();
        assert!((1..=MAX_SCAN_CONCURRENCY).contains(&value));
    }
}
