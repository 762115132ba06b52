pub mod api;
pub mod config;
pub mod core_state;
pub mod models;
pub mod db;
pub mod workflow;
pub mod incidents;
pub mod actions;
pub mod risks;
pub mod indicators;
pub mod dashboard;

use std::sync::Arc;

use chrono::Local;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::models::enums::StaffRole;
use crate::models::{generate_salt, hash_password, Staff};

/// Initialise logging, prepare the database, and serve the API.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let db_path = config::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let core = Arc::new(core_state::CoreState::with_db_path(db_path));

    // Open once up front: runs migrations and fails fast on a bad path
    let conn = core.open_db()?;
    ensure_bootstrap_admin(&conn)?;
    drop(conn);

    api::server::serve(core, config::bind_addr()).await?;
    Ok(())
}

/// Create the initial admin account on a fresh database.
///
/// The generated password is printed once to the log; the operator is
/// expected to replace it.
fn ensure_bootstrap_admin(conn: &rusqlite::Connection) -> Result<(), db::DatabaseError> {
    if db::count_active_admins(conn)? > 0 {
        return Ok(());
    }

    let password = api::types::generate_token();
    let salt = generate_salt();
    let admin = Staff {
        id: Uuid::new_v4(),
        badge: "admin".into(),
        name: "Bootstrap Administrator".into(),
        role: StaffRole::Admin,
        password_hash: hash_password(&salt, &password),
        password_salt: salt,
        active: true,
        created_at: Local::now().naive_local(),
    };
    db::insert_staff(conn, &admin)?;
    tracing::warn!("Created bootstrap admin (badge 'admin', password '{password}') — change it");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn bootstrap_admin_created_once() {
        let conn = open_memory_database().unwrap();
        ensure_bootstrap_admin(&conn).unwrap();
        assert_eq!(db::count_active_admins(&conn).unwrap(), 1);

        // Second run is a no-op
        ensure_bootstrap_admin(&conn).unwrap();
        assert_eq!(db::count_active_admins(&conn).unwrap(), 1);

        let admin = db::get_staff_by_badge(&conn, "admin").unwrap().unwrap();
        assert_eq!(admin.role, StaffRole::Admin);
    }
}
