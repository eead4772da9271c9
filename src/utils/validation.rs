use crate::utils::error::{MockError, Result};
use std::net::SocketAddr;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(MockError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_socket_addr(field_name: &str, addr: &str) -> Result<SocketAddr> {
    addr.parse::<SocketAddr>()
        .map_err(|e| MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: addr.to_string(),
            reason: format!("Invalid socket address: {}", e),
        })
}

pub fn validate_route_path(field_name: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Route path must start with '/'".to_string(),
        });
    }

    if path.contains(char::is_whitespace) {
        return Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Route path cannot contain whitespace".to_string(),
        });
    }

    // 路由只做字面比對，不接受 axum 的捕獲語法
    if path.contains(['{', '}']) || path.split('/').any(|s| s.starts_with([':', '*'])) {
        return Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Route paths are matched literally; captures and wildcards are not supported"
                .to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN is out of range too
    if !(value >= min && value <= max) {
        return Err(MockError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("base_url", "https://example.com").is_ok());
        assert!(validate_url("base_url", "http://localhost:3000").is_ok());
        assert!(validate_url("base_url", "").is_err());
        assert!(validate_url("base_url", "invalid-url").is_err());
        assert!(validate_url("base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_socket_addr() {
        assert!(validate_socket_addr("server.bind", "127.0.0.1:3000").is_ok());
        assert!(validate_socket_addr("server.bind", "0.0.0.0:0").is_ok());
        assert!(validate_socket_addr("server.bind", "localhost").is_err());
    }

    #[test]
    fn test_validate_route_path() {
        assert!(validate_route_path("path", "/t/200").is_ok());
        assert!(validate_route_path("path", "t/200").is_err());
        assert!(validate_route_path("path", "/t/ 200").is_err());
        assert!(validate_route_path("path", "/t/{id}").is_err());
        assert!(validate_route_path("path", "/t/:id").is_err());
        assert!(validate_route_path("path", "/t/*rest").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("rate", 0.1, 0.0, 1.0).is_ok());
        assert!(validate_range("rate", 1.5, 0.0, 1.0).is_err());
        assert!(validate_range("rate", f64::NAN, 0.0, 1.0).is_err());
        assert!(validate_range("status", 500u16, 100, 599).is_ok());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("trials", 50, 1).is_ok());
        assert!(validate_positive_number("trials", 0, 1).is_err());
    }
}
