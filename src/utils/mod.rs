//! Utility functions for the EPG combiner
//!
//! - URL normalization for configured source entries
//! - XMLTV datetime parsing
//! - Gzip detection and decompression for compressed feeds
//! - The streaming XMLTV parser

pub mod decompression;
pub mod time;
pub mod xmltv_parser;

/// Normalize a URL by ensuring it has a proper scheme (http:// or https://)
/// If the URL already has a scheme, it returns it unchanged.
/// If the URL lacks a scheme, it prepends "http://"
pub fn normalize_url_scheme(url: &str) -> String {
    let trimmed_url = url.trim_end_matches('/');

    if trimmed_url.starts_with("http://") || trimmed_url.starts_with("https://") {
        trimmed_url.to_string()
    } else {
        format!("http://{}", trimmed_url)
    }
}
