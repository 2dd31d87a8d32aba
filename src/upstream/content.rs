//! Response content checks applied before any body byte is read.

use crate::upstream::types::{ProxyError, ProxyResult};

/// Validate a `Content-Type` header and return its lowercased media type.
///
/// Only `image/*` is accepted, and SVG is refused because it can carry script.
pub fn check_content_type(header: Option<&str>) -> ProxyResult<String> {
    let raw = header.unwrap_or_default();
    let essence = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() {
        return Err(ProxyError::UnsupportedContentType("<missing>".to_string()));
    }

    let Some(subtype) = essence.strip_prefix("image/") else {
        return Err(ProxyError::UnsupportedContentType(essence));
    };

    let valid_token = !subtype.is_empty()
        && subtype
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b));
    if !valid_token || subtype.starts_with("svg") {
        return Err(ProxyError::UnsupportedContentType(essence));
    }

    Ok(essence)
}

/// Reject a declared length above the limit.
pub fn check_declared_length(declared: Option<u64>, limit: u64) -> ProxyResult<()> {
    match declared {
        Some(len) if len > limit => Err(ProxyError::BodyTooLarge { limit }),
        _ => Ok(()),
    }
}
