//! Translation of sqlx errors into the domain error taxonomy.

use vidshare_core::error::CoreError;

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Classify a sqlx error as a [`CoreError`].
///
/// Unique constraint violations on constraints named `uq_*` become
/// [`CoreError::Conflict`]; everything else is an internal error.
pub fn classify(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return CoreError::Conflict(conflict_message(constraint));
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(format!("Database error: {err}"))
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "uq_users_username" | "uq_users_email" => {
            "User with email or username already exists".to_string()
        }
        other => format!("Duplicate value violates unique constraint: {other}"),
    }
}
