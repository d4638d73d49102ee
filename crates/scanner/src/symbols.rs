use crate::config::ScannerConfig;
use crate::error::Result;
use crate::strategy::StrategyRegistry;
use crate::types::ScanSummary;
use std::path::Path;

/// Symbol/reference scanner: path + raw text in, [`ScanSummary`] out.
///
/// Never fails on input: missing, oversized, binary or unsupported files all
/// produce an empty summary.
#[derive(Clone)]
pub struct SymbolScanner {
    config: ScannerConfig,
    registry: StrategyRegistry,
}

impl SymbolScanner {
    /// Scanner with the built-in language strategies
    pub fn new(config: ScannerConfig) -> Result<Self> {
        Self::with_registry(config, StrategyRegistry::builtin()?)
    }

    pub fn with_registry(config: ScannerConfig, registry: StrategyRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Scan already-loaded text; `path` selects the strategy by extension
    pub fn scan_str(&self, path: &str, text: &str) -> ScanSummary {
        if text.len() as u64 > self.config.max_file_bytes {
            log::debug!("Skipping oversized file {path} ({} bytes)", text.len());
            return ScanSummary::default();
        }
        if text.contains('\0') {
            log::debug!("Skipping binary content in {path}");
            return ScanSummary::default();
        }

        let Some(strategy) = self.registry.for_path(path) else {
            return ScanSummary::default();
        };
        if !self.config.allows_language(strategy.language().as_str()) {
            return ScanSummary::default();
        }

        strategy.extract(text)
    }

    /// Scan raw bytes; invalid UTF-8 counts as binary
    pub fn scan_bytes(&self, path: &str, bytes: &[u8]) -> ScanSummary {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.scan_str(path, text),
            Err(_) => {
                log::debug!("Skipping non UTF-8 file {path}");
                ScanSummary::default()
            }
        }
    }

    /// Read and scan a file from disk
    pub fn scan_file(&self, path: impl AsRef<Path>) -> ScanSummary {
        let path = path.as_ref();
        let display = path.to_string_lossy();

        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.max_file_bytes => {
                log::debug!("Skipping oversized file {display} ({} bytes)", meta.len());
                return ScanSummary::default();
            }
            Ok(_) => {}
            Err(err) => {
                log::debug!("Cannot stat {display}: {err}");
                return ScanSummary::default();
            }
        }

        match std::fs::read(path) {
            Ok(bytes) => self.scan_bytes(&display, &bytes),
            Err(err) => {
                log::debug!("Cannot read {display}: {err}");
                ScanSummary::default()
            }
        }
    }
}
