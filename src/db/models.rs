// Database models for the licenserv schema
use diesel::prelude::*;
use serde::Serialize;

use super::schema::*;

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = products)]
pub struct Product {
    pub product_id: String, // UUID
    pub name: String,       // Catalog name, listings are ordered by it
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = license_types)]
pub struct LicenseType {
    pub license_type_id: String, // UUID
    pub type_name: String,       // e.g. "Per-Seat", "Site"
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = roles)]
pub struct Role {
    pub role_id: String,   // UUID
    pub role_name: String, // Unique
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = devices)]
pub struct Device {
    pub device_id: String,             // UUID
    pub device_name: String,
    pub serial_number: Option<String>, // Unique when present
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = users)]
pub struct User {
    pub user_id: String,  // UUID
    pub username: String, // Unique
    #[serde(skip_serializing)]
    pub password_digest: String, // bcrypt hash, mirrors the credential row
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = user_credentials)]
pub struct UserCredential {
    pub user_id: String, // 1:1 with users
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash, never the plaintext
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = user_roles)]
pub struct UserRole {
    pub user_id: String,
    pub role_id: String,
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = licenses)]
pub struct License {
    pub license_id: String,      // UUID
    pub license_name: String,
    pub product_id: String,      // FK -> products
    pub license_type_id: String, // FK -> license_types
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = license_assignments)]
pub struct LicenseAssignment {
    pub assignment_id: String, // UUID
    pub license_id: String,    // FK -> licenses
    pub user_id: String,       // FK -> users
    pub device_id: String,     // FK -> devices
    pub created_at: i64,       // Unix timestamp
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = license_uses)]
pub struct LicenseUse {
    pub use_id: String,        // UUID
    pub assignment_id: String, // FK -> license_assignments
    pub used_at: i64,          // Unix timestamp
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = assignment_logs)]
pub struct AssignmentLog {
    pub log_id: String,        // UUID
    pub assignment_id: String, // FK -> license_assignments
    pub logged_at: i64,        // Caller-specified Unix timestamp
    pub action: String,        // "assigned", "terminated", ...
    pub actor: String,         // Who performed the action
}

#[derive(Insertable, Queryable, Serialize, Clone, Debug)]
#[diesel(table_name = security_logs)]
pub struct SecurityLog {
    pub event_id: String,        // UUID
    pub user_id: String,         // Denormalized, not an FK: outlives the user
    pub username: String,        // Denormalized for the same reason
    pub logged_at: i64,          // Unix timestamp
    pub action: String,
    pub object: String,          // What the action touched
    pub details: Option<String>, // Free-form context
}

// Eager-loaded views returned by the listing queries: one call hands the
// presentation layer the full joined graph.

#[derive(Serialize, Clone, Debug)]
pub struct UserWithAccess {
    pub user: User,
    pub credential: Option<UserCredential>,
    pub roles: Vec<Role>,
}

#[derive(Serialize, Clone, Debug)]
pub struct LicenseDetail {
    pub license: License,
    pub product: Product,
    pub license_type: LicenseType,
}

#[derive(Serialize, Clone, Debug)]
pub struct AssignmentDetail {
    pub assignment: LicenseAssignment,
    pub license: License,
    pub user: User,
    pub device: Device,
}

#[derive(Serialize, Clone, Debug)]
pub struct AssignmentLogDetail {
    pub log: AssignmentLog,
    pub assignment: LicenseAssignment,
}
