// Domain error taxonomy shared by the query layer and the HTTP handlers

/// Every failure the domain model can surface to a caller. The presentation
/// layer relies on the variants being distinguishable so it can render
/// field-specific messages for validation, conflict messages for uniqueness,
/// and a generic message for storage failures.
#[derive(Debug)]
pub enum DomainError {
    /// A required field is missing/empty or a value fails a domain rule.
    /// Carries the offending field so forms can point at it.
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    /// A uniqueness constraint (username, role name, non-null serial number)
    /// was violated, either pre-write or at commit under concurrency.
    Uniqueness { constraint: String },
    /// Malformed argument to a narrow operation, rejected at the call site
    /// (e.g. an empty plaintext password handed to the hasher).
    InvalidInput(&'static str),
    /// An attempt to modify an immutable audit record.
    ImmutableRecord,
    /// Storage or connectivity failure; any mid-transaction work was rolled
    /// back before this is surfaced.
    Storage(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::Validation { field, reason } => {
                write!(f, "validation failed on {}: {}", field, reason)
            }
            DomainError::Uniqueness { constraint } => {
                write!(f, "uniqueness violation: {}", constraint)
            }
            DomainError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            DomainError::ImmutableRecord => {
                write!(f, "attempted to modify an immutable audit record")
            }
            DomainError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

impl DomainError {
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::Validation { .. } | DomainError::InvalidInput(_) => 400,
            DomainError::Uniqueness { .. } | DomainError::ImmutableRecord => 409,
            DomainError::Storage(_) => 500,
        }
    }

    /// Machine-readable discriminant for JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "validation",
            DomainError::Uniqueness { .. } => "conflict",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::ImmutableRecord => "immutable",
            DomainError::Storage(_) => "storage",
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            DomainError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<diesel::result::Error> for DomainError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                // The security_logs BEFORE UPDATE trigger aborts with a
                // message naming the immutability rule.
                if message.contains("immutable") {
                    return DomainError::ImmutableRecord;
                }
                match kind {
                    DatabaseErrorKind::UniqueViolation => {
                        DomainError::Uniqueness { constraint: message }
                    }
                    DatabaseErrorKind::ForeignKeyViolation => DomainError::Validation {
                        field: "reference",
                        reason: "referenced row does not exist",
                    },
                    _ => DomainError::Storage(message),
                }
            }
            other => DomainError::Storage(other.to_string()),
        }
    }
}
