use serde::Serialize;

/// Stable, user-facing categories for opaque remote driver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    ObjectNotFound,
    PermissionDenied,
    ConnectionUnreachable,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

/// Ordered (signal, category) table. First match wins; matching ignores case.
/// Message codes come from DB2 for i, SQLSTATEs from the ODBC layer.
const SIGNALS: &[(&str, ErrorCategory)] = &[
    ("SQL0204", ErrorCategory::ObjectNotFound),
    ("42704", ErrorCategory::ObjectNotFound),
    ("SQL0443", ErrorCategory::PermissionDenied),
    ("SQL0551", ErrorCategory::PermissionDenied),
    ("42501", ErrorCategory::PermissionDenied),
    ("not authorized", ErrorCategory::PermissionDenied),
    ("authorization", ErrorCategory::PermissionDenied),
    ("Connection refused", ErrorCategory::ConnectionUnreachable),
    ("Communications link failure", ErrorCategory::ConnectionUnreachable),
    ("I/O error", ErrorCategory::ConnectionUnreachable),
    ("08001", ErrorCategory::ConnectionUnreachable),
    ("08S01", ErrorCategory::ConnectionUnreachable),
];

pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn category(raw: &str) -> ErrorCategory {
        let haystack = raw.to_lowercase();
        SIGNALS
            .iter()
            .find(|(signal, _)| haystack.contains(&signal.to_lowercase()))
            .map(|(_, category)| *category)
            .unwrap_or(ErrorCategory::Unclassified)
    }

    pub fn classify(raw: &str) -> ClassifiedError {
        let category = Self::category(raw);
        let message = match category {
            ErrorCategory::ObjectNotFound => {
                "SQL0204: Object not found (check LIBRARY/TABLE and permissions).".to_string()
            }
            ErrorCategory::PermissionDenied => "Insufficient permissions to read the object.".to_string(),
            ErrorCategory::ConnectionUnreachable => {
                "Could not connect to the IBM i host (host/port/VPN).".to_string()
            }
            ErrorCategory::Unclassified => raw.to_string(),
        };
        ClassifiedError { category, message }
    }
}
