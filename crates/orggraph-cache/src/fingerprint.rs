use orggraph_core::AnalyticsRequest;
use sha2::{Digest, Sha256};

/// Cache key for an analytics request: `operation:algorithm:hash16`.
///
/// The hash covers the canonicalized request (stable field ordering), so
/// equal requests always produce identical keys. The readable prefix keeps
/// substring invalidation (`invalidate("centrality")`) useful.
pub fn request_fingerprint(request: &AnalyticsRequest) -> String {
    let canonical = request.canonical_string();
    let digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
    format!(
        "{}:{}:{}",
        request.operation,
        request.algorithm,
        &digest[..16]
    )
}
