// Per-entity validation, invoked by the query layer before every write
use crate::db::models::*;
use crate::error::DomainError;

/// Field-presence rules for an entity, checked before the row reaches the
/// storage layer. A violation aborts the operation with no partial write.
pub trait Validate {
    fn validate(&self) -> Result<(), DomainError>;
}

fn require(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation {
            field,
            reason: "must not be empty",
        });
    }
    Ok(())
}

impl Validate for Product {
    fn validate(&self) -> Result<(), DomainError> {
        require("name", &self.name)
    }
}

impl Validate for LicenseType {
    fn validate(&self) -> Result<(), DomainError> {
        require("type_name", &self.type_name)
    }
}

impl Validate for Role {
    fn validate(&self) -> Result<(), DomainError> {
        require("role_name", &self.role_name)
    }
}

impl Validate for Device {
    fn validate(&self) -> Result<(), DomainError> {
        require("device_name", &self.device_name)?;
        // A serial number is optional, but an empty string is not a serial.
        if let Some(serial) = &self.serial_number {
            require("serial_number", serial)?;
        }
        Ok(())
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), DomainError> {
        require("username", &self.username)?;
        require("password_digest", &self.password_digest)
    }
}

impl Validate for UserCredential {
    fn validate(&self) -> Result<(), DomainError> {
        require("password_hash", &self.password_hash)
    }
}

impl Validate for UserRole {
    fn validate(&self) -> Result<(), DomainError> {
        require("user_id", &self.user_id)?;
        require("role_id", &self.role_id)
    }
}

impl Validate for License {
    fn validate(&self) -> Result<(), DomainError> {
        require("license_name", &self.license_name)?;
        require("product_id", &self.product_id)?;
        require("license_type_id", &self.license_type_id)
    }
}

impl Validate for LicenseAssignment {
    fn validate(&self) -> Result<(), DomainError> {
        require("license_id", &self.license_id)?;
        require("user_id", &self.user_id)?;
        require("device_id", &self.device_id)
    }
}

impl Validate for LicenseUse {
    fn validate(&self) -> Result<(), DomainError> {
        require("assignment_id", &self.assignment_id)
    }
}

impl Validate for AssignmentLog {
    fn validate(&self) -> Result<(), DomainError> {
        require("assignment_id", &self.assignment_id)?;
        require("action", &self.action)?;
        require("actor", &self.actor)
    }
}

impl Validate for SecurityLog {
    fn validate(&self) -> Result<(), DomainError> {
        require("user_id", &self.user_id)?;
        require("username", &self.username)?;
        require("action", &self.action)?;
        require("object", &self.object)
    }
}
