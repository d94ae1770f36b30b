// Database query functions for all tables
use chrono::Utc;
use diesel::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::credential;
use crate::db::validate::Validate;
use crate::db::{schema::*, DbPool};
use crate::db::{
    AssignmentDetail, AssignmentLog, AssignmentLogDetail, Device, License, LicenseAssignment,
    LicenseDetail, LicenseType, LicenseUse, Product, Role, SecurityLog, User, UserCredential,
    UserRole, UserWithAccess,
};
use crate::error::DomainError;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ==================== PRODUCT QUERIES ====================

pub fn create_product(db: &DbPool, name: &str) -> Result<Product, DomainError> {
    use diesel::insert_into;

    let product = Product {
        product_id: new_id(),
        name: name.to_string(),
    };
    product.validate()?;

    let mut conn = db.lock().unwrap();
    insert_into(products::table)
        .values(&product)
        .execute(&mut *conn)?;

    Ok(product)
}

pub fn list_products(db: &DbPool) -> Result<Vec<Product>, DomainError> {
    let mut conn = db.lock().unwrap();
    let results = products::table
        .order(products::name.asc())
        .load::<Product>(&mut *conn)?;

    Ok(results)
}

// ==================== LICENSE TYPE QUERIES ====================

pub fn create_license_type(db: &DbPool, type_name: &str) -> Result<LicenseType, DomainError> {
    use diesel::insert_into;

    let license_type = LicenseType {
        license_type_id: new_id(),
        type_name: type_name.to_string(),
    };
    license_type.validate()?;

    let mut conn = db.lock().unwrap();
    insert_into(license_types::table)
        .values(&license_type)
        .execute(&mut *conn)?;

    Ok(license_type)
}

pub fn list_license_types(db: &DbPool) -> Result<Vec<LicenseType>, DomainError> {
    let mut conn = db.lock().unwrap();
    let results = license_types::table
        .order(license_types::type_name.asc())
        .load::<LicenseType>(&mut *conn)?;

    Ok(results)
}

// ==================== ROLE QUERIES ====================

pub fn create_role(db: &DbPool, role_name: &str) -> Result<Role, DomainError> {
    use diesel::insert_into;

    let role = Role {
        role_id: new_id(),
        role_name: role_name.to_string(),
    };
    role.validate()?;

    let mut conn = db.lock().unwrap();
    // Pre-write check; the UNIQUE constraint still catches concurrent racers.
    let taken = roles::table
        .filter(roles::role_name.eq(role_name))
        .first::<Role>(&mut *conn)
        .optional()?
        .is_some();
    if taken {
        return Err(DomainError::Uniqueness {
            constraint: "roles.role_name".to_string(),
        });
    }

    insert_into(roles::table)
        .values(&role)
        .execute(&mut *conn)?;

    Ok(role)
}

pub fn list_roles(db: &DbPool) -> Result<Vec<Role>, DomainError> {
    let mut conn = db.lock().unwrap();
    let results = roles::table
        .order(roles::role_name.asc())
        .load::<Role>(&mut *conn)?;

    Ok(results)
}

// ==================== DEVICE QUERIES ====================

pub fn create_device(
    db: &DbPool,
    device_name: &str,
    serial_number: Option<&str>,
) -> Result<Device, DomainError> {
    use diesel::insert_into;

    let device = Device {
        device_id: new_id(),
        device_name: device_name.to_string(),
        serial_number: serial_number.map(|s| s.to_string()),
    };
    device.validate()?;

    let mut conn = db.lock().unwrap();
    if let Some(serial) = serial_number {
        let taken = devices::table
            .filter(devices::serial_number.eq(serial))
            .first::<Device>(&mut *conn)
            .optional()?
            .is_some();
        if taken {
            return Err(DomainError::Uniqueness {
                constraint: "devices.serial_number".to_string(),
            });
        }
    }

    insert_into(devices::table)
        .values(&device)
        .execute(&mut *conn)?;

    Ok(device)
}

pub fn list_devices(db: &DbPool) -> Result<Vec<Device>, DomainError> {
    let mut conn = db.lock().unwrap();
    let results = devices::table
        .order(devices::device_name.asc())
        .load::<Device>(&mut *conn)?;

    Ok(results)
}

// ==================== USER QUERIES ====================

/// Create a user and its credential row in one transaction. The plaintext is
/// hashed up front and never stored.
pub fn create_user(
    db: &DbPool,
    username: &str,
    password_plaintext: &str,
) -> Result<User, DomainError> {
    use diesel::insert_into;

    let hash = credential::hash_password(password_plaintext)?;
    let user = User {
        user_id: new_id(),
        username: username.to_string(),
        password_digest: hash.clone(),
    };
    user.validate()?;

    let cred = UserCredential {
        user_id: user.user_id.clone(),
        password_hash: hash,
    };
    cred.validate()?;

    let mut conn = db.lock().unwrap();
    let taken = users::table
        .filter(users::username.eq(username))
        .first::<User>(&mut *conn)
        .optional()?
        .is_some();
    if taken {
        return Err(DomainError::Uniqueness {
            constraint: "users.username".to_string(),
        });
    }

    conn.transaction::<_, DomainError, _>(|conn| {
        insert_into(users::table).values(&user).execute(conn)?;
        insert_into(user_credentials::table)
            .values(&cred)
            .execute(conn)?;
        Ok(())
    })?;

    tracing::info!("User created: {}", user.username);
    Ok(user)
}

pub fn get_user_by_username(db: &DbPool, username: &str) -> Result<Option<User>, DomainError> {
    let mut conn = db.lock().unwrap();
    let result = users::table
        .filter(users::username.eq(username))
        .first::<User>(&mut *conn)
        .optional()?;

    Ok(result)
}

/// Users with their credential and roles, ordered by username. One joined
/// query for the credential, one grouped query for the many-to-many roles.
pub fn list_users_with_access(db: &DbPool) -> Result<Vec<UserWithAccess>, DomainError> {
    let mut conn = db.lock().unwrap();
    let rows = users::table
        .left_join(user_credentials::table)
        .order(users::username.asc())
        .load::<(User, Option<UserCredential>)>(&mut *conn)?;

    let role_rows = user_roles::table
        .inner_join(roles::table)
        .load::<(UserRole, Role)>(&mut *conn)?;

    let mut roles_by_user: HashMap<String, Vec<Role>> = HashMap::new();
    for (membership, role) in role_rows {
        roles_by_user
            .entry(membership.user_id)
            .or_default()
            .push(role);
    }

    Ok(rows
        .into_iter()
        .map(|(user, cred)| {
            let roles = roles_by_user.remove(&user.user_id).unwrap_or_default();
            UserWithAccess {
                user,
                credential: cred,
                roles,
            }
        })
        .collect())
}

/// Profile self-update path. Only fields on the allow-list can be changed;
/// anything else is rejected before any write.
pub fn update_user_field(
    db: &DbPool,
    user_id: &str,
    field: &str,
    value: &str,
) -> Result<(), DomainError> {
    match field {
        "username" => {
            if value.trim().is_empty() {
                return Err(DomainError::Validation {
                    field: "username",
                    reason: "must not be empty",
                });
            }
            let mut conn = db.lock().unwrap();
            let taken = users::table
                .filter(users::username.eq(value))
                .filter(users::user_id.ne(user_id))
                .first::<User>(&mut *conn)
                .optional()?
                .is_some();
            if taken {
                return Err(DomainError::Uniqueness {
                    constraint: "users.username".to_string(),
                });
            }
            let updated = diesel::update(users::table.find(user_id))
                .set(users::username.eq(value))
                .execute(&mut *conn)?;
            if updated == 0 {
                return Err(DomainError::Validation {
                    field: "user_id",
                    reason: "no such user",
                });
            }
            Ok(())
        }
        "password" => {
            // Digest and credential row must stay in lockstep.
            let hash = credential::hash_password(value)?;
            let mut conn = db.lock().unwrap();
            conn.transaction::<_, DomainError, _>(|conn| {
                let updated = diesel::update(users::table.find(user_id))
                    .set(users::password_digest.eq(&hash))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(DomainError::Validation {
                        field: "user_id",
                        reason: "no such user",
                    });
                }
                diesel::update(user_credentials::table.find(user_id))
                    .set(user_credentials::password_hash.eq(&hash))
                    .execute(conn)?;
                Ok(())
            })
        }
        _ => Err(DomainError::Validation {
            field: "field",
            reason: "not an updatable field",
        }),
    }
}

pub fn assign_role(db: &DbPool, user_id: &str, role_id: &str) -> Result<UserRole, DomainError> {
    use diesel::insert_into;

    let membership = UserRole {
        user_id: user_id.to_string(),
        role_id: role_id.to_string(),
    };
    membership.validate()?;

    let mut conn = db.lock().unwrap();
    insert_into(user_roles::table)
        .values(&membership)
        .execute(&mut *conn)?;

    Ok(membership)
}

// ==================== AUTHENTICATION ====================

/// Compare a candidate plaintext against the stored credential. Unknown user,
/// missing credential, wrong password and a corrupted stored hash all come
/// back as a plain `false`; only storage failures are errors.
pub fn authenticate(db: &DbPool, username: &str, candidate: &str) -> Result<bool, DomainError> {
    let mut conn = db.lock().unwrap();
    let row = users::table
        .inner_join(user_credentials::table)
        .filter(users::username.eq(username))
        .first::<(User, UserCredential)>(&mut *conn)
        .optional()?;

    Ok(match row {
        Some((_, cred)) => cred.password().verify(candidate),
        None => false,
    })
}

// ==================== LICENSE QUERIES ====================

pub fn create_license(
    db: &DbPool,
    license_name: &str,
    product_id: &str,
    license_type_id: &str,
) -> Result<License, DomainError> {
    use diesel::insert_into;

    let license = License {
        license_id: new_id(),
        license_name: license_name.to_string(),
        product_id: product_id.to_string(),
        license_type_id: license_type_id.to_string(),
    };
    license.validate()?;

    let mut conn = db.lock().unwrap();
    insert_into(licenses::table)
        .values(&license)
        .execute(&mut *conn)?;

    Ok(license)
}

/// Licenses with their product and license type in a single joined query,
/// ordered by license name.
pub fn list_licenses_detailed(db: &DbPool) -> Result<Vec<LicenseDetail>, DomainError> {
    let mut conn = db.lock().unwrap();
    let rows = licenses::table
        .inner_join(products::table)
        .inner_join(license_types::table)
        .order(licenses::license_name.asc())
        .load::<(License, Product, LicenseType)>(&mut *conn)?;

    Ok(rows
        .into_iter()
        .map(|(license, product, license_type)| LicenseDetail {
            license,
            product,
            license_type,
        })
        .collect())
}

// ==================== ASSIGNMENT QUERIES ====================

/// Bind a license to a user and device. The assignment row and its audit log
/// row are written in one transaction: if the log write fails, the assignment
/// is rolled back so no state change goes unaudited.
pub fn create_license_assignment(
    db: &DbPool,
    license_id: &str,
    user_id: &str,
    device_id: &str,
    action: &str,
    actor: &str,
) -> Result<(LicenseAssignment, AssignmentLog), DomainError> {
    use diesel::insert_into;

    let now = Utc::now().timestamp();
    let assignment = LicenseAssignment {
        assignment_id: new_id(),
        license_id: license_id.to_string(),
        user_id: user_id.to_string(),
        device_id: device_id.to_string(),
        created_at: now,
    };
    assignment.validate()?;

    let log = AssignmentLog {
        log_id: new_id(),
        assignment_id: assignment.assignment_id.clone(),
        logged_at: now,
        action: action.to_string(),
        actor: actor.to_string(),
    };

    let mut conn = db.lock().unwrap();
    conn.transaction::<_, DomainError, _>(|conn| {
        insert_into(license_assignments::table)
            .values(&assignment)
            .execute(conn)?;
        // Validated inside the transaction: a bad log rolls the assignment back.
        log.validate()?;
        insert_into(assignment_logs::table)
            .values(&log)
            .execute(conn)?;
        Ok(())
    })?;

    tracing::info!(
        "License {} assigned to user {} on device {} by {}",
        license_id,
        user_id,
        device_id,
        actor
    );
    Ok((assignment, log))
}

/// Termination is a logged action, not a silent delete: the assignment row is
/// retained so the audit trail stays joinable.
pub fn terminate_license_assignment(
    db: &DbPool,
    assignment_id: &str,
    action: &str,
    actor: &str,
) -> Result<AssignmentLog, DomainError> {
    use diesel::insert_into;

    let mut conn = db.lock().unwrap();
    let assignment = license_assignments::table
        .find(assignment_id)
        .first::<LicenseAssignment>(&mut *conn)
        .optional()?;
    if assignment.is_none() {
        return Err(DomainError::Validation {
            field: "assignment_id",
            reason: "no such assignment",
        });
    }

    let log = AssignmentLog {
        log_id: new_id(),
        assignment_id: assignment_id.to_string(),
        logged_at: Utc::now().timestamp(),
        action: action.to_string(),
        actor: actor.to_string(),
    };
    log.validate()?;

    insert_into(assignment_logs::table)
        .values(&log)
        .execute(&mut *conn)?;

    tracing::info!("Assignment {} terminated by {}", assignment_id, actor);
    Ok(log)
}

/// Append a usage event under an assignment. No parent state transition.
pub fn record_license_use(db: &DbPool, assignment_id: &str) -> Result<LicenseUse, DomainError> {
    use diesel::insert_into;

    let usage = LicenseUse {
        use_id: new_id(),
        assignment_id: assignment_id.to_string(),
        used_at: Utc::now().timestamp(),
    };
    usage.validate()?;

    let mut conn = db.lock().unwrap();
    insert_into(license_uses::table)
        .values(&usage)
        .execute(&mut *conn)?;

    Ok(usage)
}

/// Assignments with license, user and device in a single joined query,
/// ordered by assignment id.
pub fn list_assignments_detailed(db: &DbPool) -> Result<Vec<AssignmentDetail>, DomainError> {
    let mut conn = db.lock().unwrap();
    let rows = license_assignments::table
        .inner_join(licenses::table)
        .inner_join(users::table)
        .inner_join(devices::table)
        .order(license_assignments::assignment_id.asc())
        .load::<(LicenseAssignment, License, User, Device)>(&mut *conn)?;

    Ok(rows
        .into_iter()
        .map(|(assignment, license, user, device)| AssignmentDetail {
            assignment,
            license,
            user,
            device,
        })
        .collect())
}

/// Audit trail with the assignment each entry belongs to, most recent first.
pub fn list_assignment_logs_desc(db: &DbPool) -> Result<Vec<AssignmentLogDetail>, DomainError> {
    let mut conn = db.lock().unwrap();
    let rows = assignment_logs::table
        .inner_join(license_assignments::table)
        .order(assignment_logs::logged_at.desc())
        .load::<(AssignmentLog, LicenseAssignment)>(&mut *conn)?;

    Ok(rows
        .into_iter()
        .map(|(log, assignment)| AssignmentLogDetail { log, assignment })
        .collect())
}

// ==================== SECURITY LOG QUERIES ====================

/// Record one immutable security event. Identity is denormalized into the row
/// so the fact outlives the user it describes.
pub fn record_security_event(
    db: &DbPool,
    user_id: &str,
    username: &str,
    action: &str,
    object: &str,
    logged_at: i64,
    details: Option<&str>,
) -> Result<SecurityLog, DomainError> {
    use diesel::insert_into;

    let event = SecurityLog {
        event_id: new_id(),
        user_id: user_id.to_string(),
        username: username.to_string(),
        logged_at,
        action: action.to_string(),
        object: object.to_string(),
        details: details.map(|d| d.to_string()),
    };
    event.validate()?;

    let mut conn = db.lock().unwrap();
    insert_into(security_logs::table)
        .values(&event)
        .execute(&mut *conn)?;

    Ok(event)
}

/// Security log rows are write-once. Any update attempt is rejected here, and
/// the BEFORE UPDATE trigger rejects anything that bypasses this function.
pub fn update_security_event(
    _db: &DbPool,
    _event_id: &str,
    _field: &str,
    _value: &str,
) -> Result<(), DomainError> {
    Err(DomainError::ImmutableRecord)
}

pub fn list_security_events_desc(db: &DbPool) -> Result<Vec<SecurityLog>, DomainError> {
    let mut conn = db.lock().unwrap();
    let results = security_logs::table
        .order(security_logs::logged_at.desc())
        .load::<SecurityLog>(&mut *conn)?;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::{init_db, run_migrations};
    use diesel::insert_into;

    fn test_db() -> DbPool {
        let db = init_db(":memory:").unwrap();
        run_migrations(&db).unwrap();
        db
    }

    fn seed_catalog(db: &DbPool) -> (Product, LicenseType, License, User, Device) {
        let product = create_product(db, "Office Suite").unwrap();
        let license_type = create_license_type(db, "Per-Seat").unwrap();
        let license = create_license(
            db,
            "Office-2024",
            &product.product_id,
            &license_type.license_type_id,
        )
        .unwrap();
        let user = create_user(db, "alice", "Str0ngPass!").unwrap();
        let device = create_device(db, "alice-laptop", None).unwrap();
        (product, license_type, license, user, device)
    }

    #[test]
    fn validation_failure_leaves_no_row() {
        let db = test_db();
        let err = create_product(&db, "").unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "name", .. }));
        assert!(list_products(&db).unwrap().is_empty());
    }

    #[test]
    fn duplicate_username_is_a_uniqueness_violation() {
        let db = test_db();
        create_user(&db, "alice", "Str0ngPass!").unwrap();
        let err = create_user(&db, "alice", "OtherPass!").unwrap_err();
        assert!(matches!(err, DomainError::Uniqueness { .. }));
    }

    #[test]
    fn storage_constraint_maps_to_uniqueness() {
        // Bypass the pre-write check to exercise the constraint mapping
        // (the path a concurrent racer would take).
        let db = test_db();
        create_user(&db, "alice", "Str0ngPass!").unwrap();
        let clone = User {
            user_id: new_id(),
            username: "alice".to_string(),
            password_digest: "digest".to_string(),
        };
        let mut conn = db.lock().unwrap();
        let err: DomainError = insert_into(users::table)
            .values(&clone)
            .execute(&mut *conn)
            .unwrap_err()
            .into();
        assert!(matches!(err, DomainError::Uniqueness { .. }));
    }

    #[test]
    fn serial_numbers_are_nullable_unique() {
        let db = test_db();
        create_device(&db, "laptop-1", Some("SN-001")).unwrap();
        let err = create_device(&db, "laptop-2", Some("SN-001")).unwrap_err();
        assert!(matches!(err, DomainError::Uniqueness { .. }));

        // Any number of devices without a serial is fine.
        create_device(&db, "kiosk-1", None).unwrap();
        create_device(&db, "kiosk-2", None).unwrap();
        assert_eq!(list_devices(&db).unwrap().len(), 3);
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let db = test_db();
        let err = create_license(&db, "Office-2024", "no-such-product", "no-such-type").unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "reference",
                ..
            }
        ));
    }

    #[test]
    fn assignment_and_log_are_all_or_nothing() {
        let db = test_db();
        let (_, _, license, user, device) = seed_catalog(&db);

        // Empty action fails the log validation inside the transaction: the
        // already-inserted assignment must be rolled back with it.
        let err = create_license_assignment(
            &db,
            &license.license_id,
            &user.user_id,
            &device.device_id,
            "",
            "admin",
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "action", .. }));
        assert!(list_assignments_detailed(&db).unwrap().is_empty());
        assert!(list_assignment_logs_desc(&db).unwrap().is_empty());

        // The happy path produces exactly one of each.
        create_license_assignment(
            &db,
            &license.license_id,
            &user.user_id,
            &device.device_id,
            "assigned",
            "admin",
        )
        .unwrap();
        assert_eq!(list_assignments_detailed(&db).unwrap().len(), 1);
        assert_eq!(list_assignment_logs_desc(&db).unwrap().len(), 1);
    }

    #[test]
    fn termination_is_logged_and_keeps_the_assignment() {
        let db = test_db();
        let (_, _, license, user, device) = seed_catalog(&db);
        let (assignment, _) = create_license_assignment(
            &db,
            &license.license_id,
            &user.user_id,
            &device.device_id,
            "assigned",
            "admin",
        )
        .unwrap();

        terminate_license_assignment(&db, &assignment.assignment_id, "terminated", "admin")
            .unwrap();

        let logs = list_assignment_logs_desc(&db).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(list_assignments_detailed(&db).unwrap().len(), 1);

        let err =
            terminate_license_assignment(&db, "no-such-assignment", "terminated", "admin")
                .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "assignment_id",
                ..
            }
        ));
    }

    #[test]
    fn license_uses_accumulate_without_parent_changes() {
        let db = test_db();
        let (_, _, license, user, device) = seed_catalog(&db);
        let (assignment, _) = create_license_assignment(
            &db,
            &license.license_id,
            &user.user_id,
            &device.device_id,
            "assigned",
            "admin",
        )
        .unwrap();

        record_license_use(&db, &assignment.assignment_id).unwrap();
        record_license_use(&db, &assignment.assignment_id).unwrap();
        assert_eq!(list_assignments_detailed(&db).unwrap().len(), 1);
    }

    #[test]
    fn assignment_logs_come_back_most_recent_first() {
        let db = test_db();
        let (_, _, license, user, device) = seed_catalog(&db);
        let (assignment, _) = create_license_assignment(
            &db,
            &license.license_id,
            &user.user_id,
            &device.device_id,
            "assigned",
            "admin",
        )
        .unwrap();

        // Insert extra log rows with shuffled timestamps.
        let mut conn = db.lock().unwrap();
        for ts in [42, 7, 99, 7] {
            let log = AssignmentLog {
                log_id: new_id(),
                assignment_id: assignment.assignment_id.clone(),
                logged_at: ts,
                action: "audited".to_string(),
                actor: "admin".to_string(),
            };
            insert_into(assignment_logs::table)
                .values(&log)
                .execute(&mut *conn)
                .unwrap();
        }
        drop(conn);

        let logs = list_assignment_logs_desc(&db).unwrap();
        assert_eq!(logs.len(), 5);
        for pair in logs.windows(2) {
            assert!(pair[0].log.logged_at >= pair[1].log.logged_at);
        }
    }

    #[test]
    fn security_events_reject_any_update() {
        let db = test_db();
        let event =
            record_security_event(&db, "u1", "alice", "login", "session", 1000, None).unwrap();

        let err = update_security_event(&db, &event.event_id, "action", "tampered").unwrap_err();
        assert!(matches!(err, DomainError::ImmutableRecord));

        // A raw UPDATE that bypasses the guard hits the trigger instead.
        let mut conn = db.lock().unwrap();
        let raw: DomainError = diesel::update(security_logs::table.find(&event.event_id))
            .set(security_logs::action.eq("tampered"))
            .execute(&mut *conn)
            .unwrap_err()
            .into();
        assert!(matches!(raw, DomainError::ImmutableRecord));
        drop(conn);

        let rows = list_security_events_desc(&db).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "login");
    }

    #[test]
    fn security_events_require_every_identity_field() {
        let db = test_db();
        let err = record_security_event(&db, "u1", "", "login", "session", 1000, None).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "username",
                ..
            }
        ));
        assert!(list_security_events_desc(&db).unwrap().is_empty());
    }

    #[test]
    fn profile_update_allow_list() {
        let db = test_db();
        let user = create_user(&db, "alice", "Str0ngPass!").unwrap();

        let err = update_user_field(&db, &user.user_id, "role", "admin").unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "field", .. }));

        update_user_field(&db, &user.user_id, "username", "alice2").unwrap();
        assert!(get_user_by_username(&db, "alice2").unwrap().is_some());

        update_user_field(&db, &user.user_id, "password", "N3wPass!").unwrap();
        assert!(authenticate(&db, "alice2", "N3wPass!").unwrap());
        assert!(!authenticate(&db, "alice2", "Str0ngPass!").unwrap());
    }

    #[test]
    fn username_update_respects_uniqueness() {
        let db = test_db();
        create_user(&db, "alice", "Str0ngPass!").unwrap();
        let bob = create_user(&db, "bob", "Str0ngPass!").unwrap();

        let err = update_user_field(&db, &bob.user_id, "username", "alice").unwrap_err();
        assert!(matches!(err, DomainError::Uniqueness { .. }));
    }

    #[test]
    fn duplicate_role_membership_is_rejected() {
        let db = test_db();
        let user = create_user(&db, "alice", "Str0ngPass!").unwrap();
        let role = create_role(&db, "auditor").unwrap();

        assign_role(&db, &user.user_id, &role.role_id).unwrap();
        let err = assign_role(&db, &user.user_id, &role.role_id).unwrap_err();
        assert!(matches!(err, DomainError::Uniqueness { .. }));
    }

    #[test]
    fn users_list_carries_roles_and_credential() {
        let db = test_db();
        let user = create_user(&db, "alice", "Str0ngPass!").unwrap();
        let role = create_role(&db, "auditor").unwrap();
        assign_role(&db, &user.user_id, &role.role_id).unwrap();
        create_user(&db, "bob", "Str0ngPass!").unwrap();

        let listed = list_users_with_access(&db).unwrap();
        assert_eq!(listed.len(), 2);
        // Ordered by username.
        assert_eq!(listed[0].user.username, "alice");
        assert!(listed[0].credential.is_some());
        assert_eq!(listed[0].roles.len(), 1);
        assert_eq!(listed[0].roles[0].role_name, "auditor");
        assert!(listed[1].roles.is_empty());
    }

    #[test]
    fn authentication_never_errors_on_bad_data() {
        let db = test_db();
        let user = create_user(&db, "alice", "Str0ngPass!").unwrap();
        assert!(authenticate(&db, "alice", "Str0ngPass!").unwrap());
        assert!(!authenticate(&db, "alice", "wrong").unwrap());
        assert!(!authenticate(&db, "nobody", "Str0ngPass!").unwrap());

        // Corrupt the stored hash: authentication degrades to "not
        // authenticated", never an error.
        let mut conn = db.lock().unwrap();
        diesel::update(user_credentials::table.find(&user.user_id))
            .set(user_credentials::password_hash.eq("not-a-bcrypt-hash"))
            .execute(&mut *conn)
            .unwrap();
        drop(conn);
        assert!(!authenticate(&db, "alice", "Str0ngPass!").unwrap());
    }
}
