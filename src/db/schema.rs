// Diesel schema definition for the licenserv database
use diesel::allow_tables_to_appear_in_same_query;
use diesel::joinable;
use diesel::table;

table! {
    products (product_id) {
        product_id -> Text,
        name -> Text,
    }
}

table! {
    license_types (license_type_id) {
        license_type_id -> Text,
        type_name -> Text,
    }
}

table! {
    roles (role_id) {
        role_id -> Text,
        role_name -> Text,
    }
}

table! {
    devices (device_id) {
        device_id -> Text,
        device_name -> Text,
        serial_number -> Nullable<Text>,
    }
}

table! {
    users (user_id) {
        user_id -> Text,
        username -> Text,
        password_digest -> Text,
    }
}

table! {
    user_credentials (user_id) {
        user_id -> Text,
        password_hash -> Text,
    }
}

table! {
    user_roles (user_id, role_id) {
        user_id -> Text,
        role_id -> Text,
    }
}

table! {
    licenses (license_id) {
        license_id -> Text,
        license_name -> Text,
        product_id -> Text,
        license_type_id -> Text,
    }
}

table! {
    license_assignments (assignment_id) {
        assignment_id -> Text,
        license_id -> Text,
        user_id -> Text,
        device_id -> Text,
        created_at -> BigInt,
    }
}

table! {
    license_uses (use_id) {
        use_id -> Text,
        assignment_id -> Text,
        used_at -> BigInt,
    }
}

table! {
    assignment_logs (log_id) {
        log_id -> Text,
        assignment_id -> Text,
        logged_at -> BigInt,
        action -> Text,
        actor -> Text,
    }
}

table! {
    security_logs (event_id) {
        event_id -> Text,
        user_id -> Text,
        username -> Text,
        logged_at -> BigInt,
        action -> Text,
        object -> Text,
        details -> Nullable<Text>,
    }
}

// Foreign key relationships
joinable!(user_credentials -> users (user_id));
joinable!(user_roles -> users (user_id));
joinable!(user_roles -> roles (role_id));
joinable!(licenses -> products (product_id));
joinable!(licenses -> license_types (license_type_id));
joinable!(license_assignments -> licenses (license_id));
joinable!(license_assignments -> users (user_id));
joinable!(license_assignments -> devices (device_id));
joinable!(license_uses -> license_assignments (assignment_id));
joinable!(assignment_logs -> license_assignments (assignment_id));
// security_logs denormalizes user identity on purpose: no joinable! here, a
// log row must stay readable after its user is changed or removed.

allow_tables_to_appear_in_same_query!(
    products,
    license_types,
    roles,
    devices,
    users,
    user_credentials,
    user_roles,
    licenses,
    license_assignments,
    license_uses,
    assignment_logs,
    security_logs,
);
