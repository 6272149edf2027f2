//! Client identification from proxy-forwarded headers.

use axum::http::HeaderMap;

/// Bucket shared by every request that carries no forwarded address.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Derive the rate-limit key for a request.
///
/// The gateway sits behind a trusted proxy, so the left-most
/// `X-Forwarded-For` entry is the original client. `X-Real-IP` is the
/// fallback, then the shared anonymous bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let real_ip = || {
        headers
            .get(X_REAL_IP)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_first_forwarded_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("1.2.3.4, 10.0.0.1, 10.0.0.2"),
        );
        headers.insert(X_REAL_IP, HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_key(&headers), "1.2.3.4");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(" "));
        headers.insert(X_REAL_IP, HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_key(&headers), "9.9.9.9");
    }

    #[test]
    fn test_anonymous_bucket() {
        assert_eq!(client_key(&HeaderMap::new()), ANONYMOUS_CLIENT);
    }
}
