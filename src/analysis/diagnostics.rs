//! Connection failure diagnostics.
//!
//! Turns raw driver failure text into one of a fixed set of categories with a
//! remediation block. Library preconditions are checked first; failure text is
//! then matched against [`RULES`] top to bottom and the first hit wins.

use crate::config::FirebirdConfig;
use crate::database::Preconditions;
use crate::error::DatabaseError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    FdbLibraryError,
    ClientLibraryError,
    DependencyError,
    NetworkError,
    AuthenticationError,
    DatabaseError,
    UnknownError,
}

/// Echo of the connection target with the password masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionContext {
    pub dsn: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub charset: String,
}

impl ConnectionContext {
    pub fn from_config(config: &FirebirdConfig) -> Self {
        Self {
            dsn: config.dsn(),
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            user: config.user.clone(),
            password: "***".into(),
            charset: config.charset.clone(),
        }
    }
}

/// Outcome of a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub connected: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_search_path: Option<String>,
    pub context: ConnectionContext,
}

impl DiagnosticResult {
    pub fn connected(version: impl Into<String>, context: ConnectionContext) -> Self {
        Self {
            connected: true,
            error_category: None,
            message: None,
            version: Some(version.into()),
            library_path: None,
            library_search_path: None,
            context,
        }
    }

    fn failed(category: ErrorCategory, message: String, context: &ConnectionContext) -> Self {
        Self {
            connected: false,
            error_category: Some(category),
            message: Some(message),
            version: None,
            library_path: None,
            library_search_path: None,
            context: context.clone(),
        }
    }
}

/// One ordered classification rule.
pub struct DiagnosticRule {
    pub name: &'static str,
    pub category: ErrorCategory,
    matches: fn(&str) -> bool,
    remediation: fn(&ConnectionContext) -> String,
}

impl DiagnosticRule {
    /// Test the rule against already lower-cased failure text.
    pub fn matches(&self, lowered: &str) -> bool {
        (self.matches)(lowered)
    }

    pub fn remediation(&self, context: &ConnectionContext) -> String {
        (self.remediation)(context)
    }
}

/// Failure text rules in priority order.
pub static RULES: [DiagnosticRule; 5] = [
    DiagnosticRule {
        name: "client_library_runtime",
        category: ErrorCategory::ClientLibraryError,
        matches: |t| t.contains("could not be determined"),
        remediation: |_| {
            "💡 FIREBIRD CLIENT ISSUE: Client library found but not properly configured\n\
             • Check that libfbclient.so matches the server version\n\
             • Verify LD_LIBRARY_PATH includes the Firebird lib directory\n\
             • Set FIREBIRD_CLIENT_LIBRARY to the exact library path"
                .to_string()
        },
    },
    DiagnosticRule {
        name: "missing_dependency",
        category: ErrorCategory::DependencyError,
        matches: |t| t.contains("libtommath") || t.contains("libtomcrypt"),
        remediation: |_| {
            "💡 DEPENDENCY ISSUE: Missing required Firebird dependencies\n\
             • libtommath.so.0 or libtomcrypt.so.0 not found\n\
             • The Firebird client installation is incomplete\n\
             • Install the libtommath and libtomcrypt packages"
                .to_string()
        },
    },
    DiagnosticRule {
        name: "network",
        category: ErrorCategory::NetworkError,
        matches: |t| t.contains("network error") || t.contains("connection refused"),
        remediation: |ctx| {
            format!(
                "💡 NETWORK ISSUE: Cannot reach {}:{}\n\
                 • Check if Firebird server is running and accessible\n\
                 • Verify firewall rules allow connections\n\
                 • Confirm host and port are correct",
                ctx.host, ctx.port
            )
        },
    },
    DiagnosticRule {
        name: "authentication",
        category: ErrorCategory::AuthenticationError,
        matches: |t| t.contains("login") || t.contains("password") || t.contains("authentication"),
        remediation: |ctx| {
            format!(
                "💡 AUTHENTICATION ISSUE: Invalid credentials\n\
                 • Check username: {}\n\
                 • Verify password in FIREBIRD_PASSWORD environment variable\n\
                 • Ensure user exists in Firebird security database",
                ctx.user
            )
        },
    },
    DiagnosticRule {
        name: "database_missing",
        category: ErrorCategory::DatabaseError,
        matches: |t| t.contains("database") && t.contains("not found"),
        remediation: |ctx| {
            format!(
                "💡 DATABASE ISSUE: Database file not found\n\
                 • Check database path: {}\n\
                 • Verify database file exists on Firebird server\n\
                 • Check file permissions on server",
                ctx.database
            )
        },
    },
];

const UNKNOWN_REMEDIATION: &str = "💡 UNRECOGNIZED ERROR\n\
     • Run the server_status tool for library and configuration details\n\
     • Check the Firebird server log for the matching entry";

/// Report a failed library precondition, if any.
///
/// A missing driver takes priority over a missing client library.
pub fn check_preconditions(
    preconditions: &Preconditions,
    context: &ConnectionContext,
) -> Option<DiagnosticResult> {
    if !preconditions.driver_available {
        let message = format!(
            "{}\n\n💡 DRIVER ISSUE: This build has no Firebird driver\n\
             • Rebuild with `--features firebird`",
            DatabaseError::DriverUnavailable
        );
        return Some(DiagnosticResult::failed(
            ErrorCategory::FdbLibraryError,
            message,
            context,
        ));
    }

    if preconditions.client_library.is_none() {
        let message = format!(
            "{}\n\n💡 FIREBIRD CLIENT ISSUE: Client libraries missing\n\
             • Check if /opt/firebird/lib/ contains libfbclient.so\n\
             • Check LD_LIBRARY_PATH configuration\n\
             • Set FIREBIRD_CLIENT_LIBRARY to the library path",
            DatabaseError::ClientLibraryUnavailable
        );
        let mut result =
            DiagnosticResult::failed(ErrorCategory::ClientLibraryError, message, context);
        result.library_search_path = preconditions.search_path.clone();
        return Some(result);
    }

    None
}

/// Classify failure text from a connection attempt that passed its preconditions.
pub fn classify_failure(failure: &str, context: &ConnectionContext) -> DiagnosticResult {
    let lowered = failure.to_lowercase();
    let (category, remediation) = RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| (rule.category, rule.remediation(context)))
        .unwrap_or((ErrorCategory::UnknownError, UNKNOWN_REMEDIATION.to_string()));

    DiagnosticResult::failed(category, format!("{}\n\n{}", failure, remediation), context)
}

/// Full classification: preconditions first, then the failure text.
pub fn classify(
    failure: &str,
    preconditions: &Preconditions,
    context: &ConnectionContext,
) -> DiagnosticResult {
    check_preconditions(preconditions, context)
        .unwrap_or_else(|| classify_failure(failure, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn context() -> ConnectionContext {
        ConnectionContext::from_config(&FirebirdConfig::default())
    }

    fn ready() -> Preconditions {
        Preconditions {
            driver_available: true,
            client_library: Some(PathBuf::from("/opt/firebird/lib/libfbclient.so")),
            search_path: None,
        }
    }

    fn category(text: &str) -> ErrorCategory {
        classify(text, &ready(), &context()).error_category.unwrap()
    }

    #[test]
    fn test_rule_categories() {
        assert_eq!(
            category("The location of Firebird Client Library could not be determined."),
            ErrorCategory::ClientLibraryError
        );
        assert_eq!(
            category("libtommath.so.0: cannot open shared object file"),
            ErrorCategory::DependencyError
        );
        assert_eq!(
            category("Unable to complete network request to host \"db\". Network error"),
            ErrorCategory::NetworkError
        );
        assert_eq!(category("Connection refused"), ErrorCategory::NetworkError);
        assert_eq!(category("login failed"), ErrorCategory::AuthenticationError);
        assert_eq!(
            category("Your user name and password are not defined"),
            ErrorCategory::AuthenticationError
        );
        assert_eq!(category("database X not found"), ErrorCategory::DatabaseError);
        assert_eq!(category("something odd happened"), ErrorCategory::UnknownError);
    }

    #[test]
    fn test_first_match_wins() {
        // Matches both the network and the authentication rule.
        assert_eq!(
            category("network error during login"),
            ErrorCategory::NetworkError
        );
        // Matches both the client library and the database rule.
        assert_eq!(
            category("database path could not be determined, file not found"),
            ErrorCategory::ClientLibraryError
        );
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "client_library_runtime",
                "missing_dependency",
                "network",
                "authentication",
                "database_missing"
            ]
        );
    }

    #[test]
    fn test_message_keeps_original_text() {
        let result = classify("Connection refused", &ready(), &context());
        let message = result.message.unwrap();
        assert!(message.starts_with("Connection refused"));
        assert!(message.contains("localhost:3050"));
        assert!(!result.connected);
    }

    #[test]
    fn test_context_masks_password() {
        let result = classify("login failed", &ready(), &context());
        assert_eq!(result.context.password, "***");
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("masterkey"));
        assert!(json.contains("\"type\":\"authentication_error\""));
    }

    #[test]
    fn test_missing_driver_takes_priority() {
        let preconditions = Preconditions {
            driver_available: false,
            client_library: None,
            search_path: None,
        };
        let result = classify("login failed", &preconditions, &context());
        assert_eq!(result.error_category, Some(ErrorCategory::FdbLibraryError));
    }

    #[test]
    fn test_missing_client_library() {
        let preconditions = Preconditions {
            driver_available: true,
            client_library: None,
            search_path: Some("/usr/local/lib".into()),
        };
        let result = classify("Connection refused", &preconditions, &context());
        assert_eq!(result.error_category, Some(ErrorCategory::ClientLibraryError));
        assert!(result.message.unwrap().contains("LD_LIBRARY_PATH"));
        assert_eq!(result.library_search_path.as_deref(), Some("/usr/local/lib"));
    }

    #[test]
    fn test_client_library_remediations_differ() {
        let missing = check_preconditions(
            &Preconditions {
                driver_available: true,
                client_library: None,
                search_path: None,
            },
            &context(),
        )
        .unwrap();
        let runtime = classify("could not be determined", &ready(), &context());
        assert_eq!(missing.error_category, runtime.error_category);
        assert_ne!(missing.message, runtime.message);
    }

    proptest! {
        #[test]
        fn missing_driver_ignores_failure_text(text in "\\PC{0,64}", has_client in any::<bool>()) {
            let preconditions = Preconditions {
                driver_available: false,
                client_library: has_client.then(|| PathBuf::from("/usr/lib/libfbclient.so")),
                search_path: None,
            };
            let result = classify(&text, &preconditions, &context());
            prop_assert_eq!(result.error_category, Some(ErrorCategory::FdbLibraryError));
        }

        #[test]
        fn exactly_one_category_is_assigned(text in "\\PC{0,64}") {
            let result = classify(&text, &ready(), &context());
            prop_assert!(result.error_category.is_some());
            prop_assert!(!result.connected);
        }
    }
}
