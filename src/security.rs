//! Authentication audit trail.
//!
//! Events go to the `security` tracing target, which `main` routes to an
//! append-only file. Passwords are never passed in here.

use tracing::{info, warn};
use uuid::Uuid;

pub const SECURITY_TARGET: &str = "security";

pub fn login_succeeded(user_id: Uuid, email: &str, client: &str) {
    info!(target: "security", event = "login", outcome = "success", %user_id, email, client);
}

pub fn login_failed(email: &str, client: &str) {
    warn!(target: "security", event = "login", outcome = "failure", email, client);
}

pub fn registered(user_id: Uuid, email: &str, client: &str) {
    info!(target: "security", event = "register", outcome = "success", %user_id, email, client);
}

pub fn logged_out(user_id: Uuid, client: &str) {
    info!(target: "security", event = "logout", outcome = "success", %user_id, client);
}

pub fn reset_requested(email: &str, known: bool, client: &str) {
    info!(target: "security", event = "reset_request", known, email, client);
}

pub fn reset_completed(user_id: Uuid, client: &str) {
    info!(target: "security", event = "reset", outcome = "success", %user_id, client);
}

pub fn reset_rejected(client: &str) {
    warn!(target: "security", event = "reset", outcome = "invalid_token", client);
}

pub fn rate_limited(bucket: &str, client: &str) {
    warn!(target: "security", event = "rate_limit", bucket, client);
}
