//! Field checks shared by request bodies. Each returns the 422 to send back.

use std::net::IpAddr;

use crate::error::ApiError;

pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min {
        return Err(ApiError::invalid_field(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    if len > max {
        return Err(ApiError::invalid_field(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

pub fn min_length(field: &str, value: &str, min: usize) -> Result<(), ApiError> {
    length(field, value, min, usize::MAX)
}

pub fn non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid_field(field, "must not be empty"));
    }
    Ok(())
}

pub fn range(field: &str, value: i32, min: i32, max: i32) -> Result<(), ApiError> {
    if !(min..=max).contains(&value) {
        return Err(ApiError::invalid_field(
            field,
            format!("must be between {min} and {max}"),
        ));
    }
    Ok(())
}

pub fn ip_address(field: &str, value: &str) -> Result<(), ApiError> {
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| ApiError::invalid_field(field, "must be a valid IPv4 or IPv6 address"))
}

pub const EMAIL_MAX: usize = 255;

/// `local@domain` with no whitespace, at most `EMAIL_MAX` characters. The
/// domain needs no dot so `admin@localhost` passes.
pub fn email(field: &str, value: &str) -> Result<(), ApiError> {
    length(field, value, 1, EMAIL_MAX)?;
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::invalid_field(field, "must be a valid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counts_characters() {
        assert!(length("name", "", 1, 100).is_err());
        assert!(length("name", "gw", 1, 100).is_ok());
        assert!(length("name", &"x".repeat(101), 1, 100).is_err());
        assert!(length("username", "äbc", 3, 50).is_ok());
    }

    #[test]
    fn ip_addresses() {
        assert!(ip_address("ip_address", "192.168.1.1").is_ok());
        assert!(ip_address("ip_address", "fe80::1").is_ok());
        assert!(ip_address("ip_address", "999.1.1.1").is_err());
        assert!(ip_address("ip_address", "gateway.local").is_err());
    }

    #[test]
    fn emails() {
        assert!(email("email", "ops@example.com").is_ok());
        assert!(email("email", "admin@localhost").is_ok());
        assert!(email("email", "nobody").is_err());
        assert!(email("email", "@example.com").is_err());
        assert!(email("email", "a b@example.com").is_err());
        assert!(email("email", "a@b@c").is_err());
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(email("email", &long).is_err());
    }

    #[test]
    fn ranges() {
        assert!(range("interval_hours", 720, 1, 720).is_ok());
        assert!(range("interval_hours", 0, 1, 720).is_err());
    }
}
