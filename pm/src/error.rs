// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PmError {
    // Reserve info or claimed-reserve lookup failed upstream
    ExternalRead(String),
    // AddFloat tried to retire more value than was outstanding
    InsufficientPending,
    // Operation attempted after the monitor was stopped
    Shutdown,
    // Uncategorized error
    Generic(String),
}

impl PmError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            PmError::ExternalRead(_) => "external_read",
            PmError::InsufficientPending => "insufficient_pending",
            PmError::Shutdown => "shutdown",
            PmError::Generic(_) => "generic",
        }
    }
}

pub type PmResult<T> = Result<T, PmError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that error_type values are valid Prometheus label values
    /// (lowercase, underscores only, no spaces or special chars)
    #[test]
    fn test_error_type_valid_prometheus_labels() {
        let errors_to_test = vec![
            PmError::ExternalRead("test".to_string()),
            PmError::InsufficientPending,
            PmError::Shutdown,
            PmError::Generic("test".to_string()),
        ];

        for error in errors_to_test {
            let error_type = error.error_type();

            assert!(!error_type.is_empty(), "error_type should not be empty");

            for c in error_type.chars() {
                assert!(
                    c.is_ascii_lowercase() || c == '_',
                    "error_type '{}' contains invalid character '{}' for Prometheus label",
                    error_type,
                    c
                );
            }

            assert!(
                !error_type.starts_with('_'),
                "error_type '{}' should not start with underscore",
                error_type
            );
            assert!(
                !error_type.ends_with('_'),
                "error_type '{}' should not end with underscore",
                error_type
            );
        }
    }

    /// Test that error_type is consistent regardless of payload content
    #[test]
    fn test_error_type_payload_independence() {
        let err1 = PmError::ExternalRead("short".to_string());
        let err2 = PmError::ExternalRead("a much longer upstream failure message".to_string());
        assert_eq!(err1.error_type(), err2.error_type());

        let err3 = PmError::Generic("error 1".to_string());
        let err4 = PmError::Generic("completely different error".to_string());
        assert_eq!(err3.error_type(), err4.error_type());
    }
}
