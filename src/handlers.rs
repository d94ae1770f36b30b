use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::db::{self, DbPool};
use crate::error::DomainError;

/// Translate a domain error into an HTTP response: status from the error
/// class, JSON body with a machine-readable kind (and the field, for
/// validation errors) so callers can render specific messages.
fn error_response(err: DomainError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = serde_json::json!({
        "kind": err.kind(),
        "error": err.to_string(),
    });
    if let Some(field) = err.field() {
        body["field"] = serde_json::json!(field);
    }
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    HttpResponse::build(status).json(body)
}

fn list_response<T: serde::Serialize>(result: Result<Vec<T>, DomainError>) -> HttpResponse {
    match result {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(e) => error_response(e),
    }
}

// ==================== LISTING ====================

pub async fn list_products(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_products(&db))
}

pub async fn list_license_types(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_license_types(&db))
}

pub async fn list_roles(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_roles(&db))
}

pub async fn list_devices(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_devices(&db))
}

pub async fn list_users(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_users_with_access(&db))
}

pub async fn list_licenses(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_licenses_detailed(&db))
}

pub async fn list_assignments(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_assignments_detailed(&db))
}

pub async fn list_assignment_logs(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_assignment_logs_desc(&db))
}

pub async fn list_security_events(db: web::Data<DbPool>) -> HttpResponse {
    list_response(db::list_security_events_desc(&db))
}

// ==================== MASTER RECORDS ====================

#[derive(Deserialize)]
pub struct NameRequest {
    pub name: String,
}

pub async fn create_product(db: web::Data<DbPool>, req: web::Json<NameRequest>) -> HttpResponse {
    match db::create_product(&db, &req.name) {
        Ok(product) => HttpResponse::Created().json(product),
        Err(e) => error_response(e),
    }
}

pub async fn create_license_type(
    db: web::Data<DbPool>,
    req: web::Json<NameRequest>,
) -> HttpResponse {
    match db::create_license_type(&db, &req.name) {
        Ok(license_type) => HttpResponse::Created().json(license_type),
        Err(e) => error_response(e),
    }
}

pub async fn create_role(db: web::Data<DbPool>, req: web::Json<NameRequest>) -> HttpResponse {
    match db::create_role(&db, &req.name) {
        Ok(role) => HttpResponse::Created().json(role),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct CreateDeviceRequest {
    pub device_name: String,
    pub serial_number: Option<String>,
}

pub async fn create_device(
    db: web::Data<DbPool>,
    req: web::Json<CreateDeviceRequest>,
) -> HttpResponse {
    match db::create_device(&db, &req.device_name, req.serial_number.as_deref()) {
        Ok(device) => HttpResponse::Created().json(device),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct CreateLicenseRequest {
    pub license_name: String,
    pub product_id: String,
    pub license_type_id: String,
}

pub async fn create_license(
    db: web::Data<DbPool>,
    req: web::Json<CreateLicenseRequest>,
) -> HttpResponse {
    match db::create_license(&db, &req.license_name, &req.product_id, &req.license_type_id) {
        Ok(license) => HttpResponse::Created().json(license),
        Err(e) => error_response(e),
    }
}

// ==================== USERS & AUTH ====================

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

pub async fn create_user(
    db: web::Data<DbPool>,
    req: web::Json<CreateUserRequest>,
) -> HttpResponse {
    match db::create_user(&db, &req.username, &req.password) {
        Ok(user) => HttpResponse::Created().json(user),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub field: String,
    pub value: String,
}

/// Profile form update path: the query layer enforces the field allow-list.
pub async fn update_profile(
    db: web::Data<DbPool>,
    user_id: web::Path<String>,
    req: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    match db::update_user_field(&db, &user_id, &req.field, &req.value) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "updated"})),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct AddRoleRequest {
    pub role_id: String,
}

pub async fn add_role(
    db: web::Data<DbPool>,
    user_id: web::Path<String>,
    req: web::Json<AddRoleRequest>,
) -> HttpResponse {
    match db::assign_role(&db, &user_id, &req.role_id) {
        Ok(membership) => HttpResponse::Created().json(membership),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Session flow around this lives in the caller; the handler only reports
/// authenticated or not, and leaves a security event on success.
pub async fn login(db: web::Data<DbPool>, req: web::Json<LoginRequest>) -> HttpResponse {
    match db::authenticate(&db, &req.username, &req.password) {
        Ok(true) => {
            if let Ok(Some(user)) = db::get_user_by_username(&db, &req.username) {
                if let Err(e) = db::record_security_event(
                    &db,
                    &user.user_id,
                    &user.username,
                    "login",
                    "session",
                    Utc::now().timestamp(),
                    None,
                ) {
                    tracing::error!("Failed to record login event: {}", e);
                }
            }
            tracing::info!("User authenticated: {}", req.username);
            HttpResponse::Ok().json(serde_json::json!({"status": "authenticated"}))
        }
        Ok(false) => {
            tracing::warn!("Failed login attempt for {}", req.username);
            HttpResponse::Unauthorized().json(serde_json::json!({"status": "invalid credentials"}))
        }
        Err(e) => error_response(e),
    }
}

// ==================== ASSIGNMENTS ====================

#[derive(Deserialize)]
pub struct CreateAssignmentRequest {
    pub license_id: String,
    pub user_id: String,
    pub device_id: String,
    pub action: String,
    pub actor: String,
}

pub async fn create_assignment(
    db: web::Data<DbPool>,
    req: web::Json<CreateAssignmentRequest>,
) -> HttpResponse {
    match db::create_license_assignment(
        &db,
        &req.license_id,
        &req.user_id,
        &req.device_id,
        &req.action,
        &req.actor,
    ) {
        Ok((assignment, log)) => HttpResponse::Created()
            .json(serde_json::json!({"assignment": assignment, "log": log})),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct TerminateAssignmentRequest {
    pub action: Option<String>,
    pub actor: String,
}

pub async fn terminate_assignment(
    db: web::Data<DbPool>,
    assignment_id: web::Path<String>,
    req: web::Json<TerminateAssignmentRequest>,
) -> HttpResponse {
    let action = req.action.as_deref().unwrap_or("terminated");
    match db::terminate_license_assignment(&db, &assignment_id, action, &req.actor) {
        Ok(log) => HttpResponse::Created().json(log),
        Err(e) => error_response(e),
    }
}

pub async fn record_use(db: web::Data<DbPool>, assignment_id: web::Path<String>) -> HttpResponse {
    match db::record_license_use(&db, &assignment_id) {
        Ok(usage) => HttpResponse::Created().json(usage),
        Err(e) => error_response(e),
    }
}

// ==================== SECURITY EVENTS ====================

#[derive(Deserialize)]
pub struct SecurityEventRequest {
    pub user_id: String,
    pub username: String,
    pub action: String,
    pub object: String,
    pub logged_at: Option<i64>,
    pub details: Option<String>,
}

pub async fn record_security_event(
    db: web::Data<DbPool>,
    req: web::Json<SecurityEventRequest>,
) -> HttpResponse {
    let logged_at = req.logged_at.unwrap_or_else(|| Utc::now().timestamp());
    match db::record_security_event(
        &db,
        &req.user_id,
        &req.username,
        &req.action,
        &req.object,
        logged_at,
        req.details.as_deref(),
    ) {
        Ok(event) => HttpResponse::Created().json(event),
        Err(e) => error_response(e),
    }
}
