//! Idempotent startup bootstrap: both roles and the default admin account.

use taskforge_core::auth;
use taskforge_core::{ROLE_ADMIN, ROLE_USER};
use taskforge_store::{Database, User};

use crate::config::ServerConfig;

pub fn run(db: &Database, config: &ServerConfig) -> anyhow::Result<()> {
    for role in [ROLE_ADMIN, ROLE_USER] {
        if db.find_role_by_name(role)?.is_none() {
            db.insert_role(role)?;
            tracing::info!(role, "seeded role");
        }
    }

    if db.username_exists(&config.admin_username)? {
        return Ok(());
    }

    let admin_id = db.insert_user(&User {
        id: 0,
        first_name: "Admin".to_string(),
        last_name: String::new(),
        username: config.admin_username.clone(),
        email: config.admin_email.clone(),
        password_hash: auth::hash_password(&config.admin_password)
            .map_err(|e| anyhow::anyhow!("hashing admin password: {e}"))?,
        created_at: chrono::Utc::now(),
    })?;

    for role in [ROLE_ADMIN, ROLE_USER] {
        let role = db
            .find_role_by_name(role)?
            .ok_or_else(|| anyhow::anyhow!("role {role} missing after seeding"))?;
        db.assign_role(admin_id, role.id)?;
    }

    tracing::info!(username = %config.admin_username, "seeded admin account");
    Ok(())
}
