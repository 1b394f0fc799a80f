//! Cache path utilities - uses ~/.cache/deprisk/http/ by default

use std::path::PathBuf;

/// Default directory for HTTP response records.
/// Uses ~/.cache/deprisk/http on Unix, %LOCALAPPDATA%/deprisk/http on Windows.
pub fn default_cache_dir() -> PathBuf {
    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    } else {
        dirs::cache_dir().unwrap_or_else(|| {
            // Fallback to ~/.cache
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    };

    base.join("deprisk").join("http")
}
