#![allow(clippy::collapsible_if)]

use std::net::SocketAddr;

use crate::config::models::ServerConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration, reporting every problem at once
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        // Blank means "not configured", which is allowed.
        if let Some(url) = config.worker_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                if let Err(e) = Self::validate_url(url, "worker_url") {
                    errors.push(e);
                }
            }
        }

        for (field, secs) in [
            ("health_timeout_secs", config.health_timeout_secs),
            ("proxy_timeout_secs", config.proxy_timeout_secs),
        ] {
            if secs == 0 {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }
        }

        if config.static_files.root.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "static_files.root".to_string(),
            });
        }
        if config.static_files.index_file.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "static_files.index_file".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Validate HTTP URL format
    fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
        match url::Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: format!(
                            "URL scheme must be 'http' or 'https', got '{}'",
                            url.scheme()
                        ),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "URL must have a valid host".to_string(),
                    });
                }

                if url.query().is_some() || url.fragment().is_some() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "Worker base URL must not carry a query or fragment".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: format!("Invalid URL format: {e}"),
            }),
        }
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
