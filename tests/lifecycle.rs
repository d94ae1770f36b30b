// End-to-end assignment lifecycle against an in-memory database
use licenserv::db::{self, DbPool};

fn test_db() -> DbPool {
    let db = db::init_db(":memory:").unwrap();
    db::run_migrations(&db).unwrap();
    db
}

#[test]
fn full_assignment_lifecycle() {
    let db = test_db();

    let product = db::create_product(&db, "Office Suite").unwrap();
    let license_type = db::create_license_type(&db, "Per-Seat").unwrap();
    let license = db::create_license(
        &db,
        "Office-2024",
        &product.product_id,
        &license_type.license_type_id,
    )
    .unwrap();
    let alice = db::create_user(&db, "alice", "Str0ngPass!").unwrap();
    let laptop = db::create_device(&db, "alice-laptop", None).unwrap();

    let (assignment, log) = db::create_license_assignment(
        &db,
        &license.license_id,
        &alice.user_id,
        &laptop.device_id,
        "assigned",
        "admin",
    )
    .unwrap();

    assert_eq!(assignment.license_id, license.license_id);
    assert_eq!(assignment.user_id, alice.user_id);
    assert_eq!(assignment.device_id, laptop.device_id);
    assert_eq!(log.assignment_id, assignment.assignment_id);
    assert_eq!(log.action, "assigned");

    // One call returns the full joined graph.
    let listed = db::list_assignments_detailed(&db).unwrap();
    assert_eq!(listed.len(), 1);
    let detail = &listed[0];
    assert_eq!(detail.assignment.assignment_id, assignment.assignment_id);
    assert_eq!(detail.license.license_name, "Office-2024");
    assert_eq!(detail.user.username, "alice");
    assert_eq!(detail.device.device_name, "alice-laptop");

    let logs = db::list_assignment_logs_desc(&db).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].log.action, "assigned");
    assert_eq!(logs[0].assignment.assignment_id, assignment.assignment_id);

    // Licenses listing carries product and type in the same round trip.
    let licenses = db::list_licenses_detailed(&db).unwrap();
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].product.name, "Office Suite");
    assert_eq!(licenses[0].license_type.type_name, "Per-Seat");

    // Usage accumulates, and alice can log in with the original password.
    db::record_license_use(&db, &assignment.assignment_id).unwrap();
    assert!(db::authenticate(&db, "alice", "Str0ngPass!").unwrap());
    assert!(!db::authenticate(&db, "alice", "wrong").unwrap());
}

#[test]
fn listings_follow_their_ordering_contracts() {
    let db = test_db();

    for name in ["Zephyr", "Atlas", "Meridian"] {
        db::create_product(&db, name).unwrap();
    }
    let products = db::list_products(&db).unwrap();
    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Atlas", "Meridian", "Zephyr"]);

    for name in ["carol", "alice", "bob"] {
        db::create_user(&db, name, "Str0ngPass!").unwrap();
    }
    let users = db::list_users_with_access(&db).unwrap();
    let usernames: Vec<&str> = users.iter().map(|u| u.user.username.as_str()).collect();
    assert_eq!(usernames, vec!["alice", "bob", "carol"]);
}
