use anyhow::Context;
use tracing::{debug, info};

use crate::{
    config::BootstrapAdmin,
    store::Store,
    users::{
        dto::{RoleInput, UserInput},
        repo_types::RoleType,
        services::create_user,
    },
};

/// Creates the first admin if it does not exist yet. Every user-creating mutation requires an
/// authenticated staff member, so without this there is no way in.
pub async fn ensure_admin(store: &dyn Store, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    let email = admin.email.trim().to_lowercase();
    if store
        .find_user_by_email(&email)
        .await
        .context("look up bootstrap admin")?
        .is_some()
    {
        debug!(email = %email, "bootstrap admin already present");
        return Ok(());
    }

    let input = UserInput {
        id: "admin".into(),
        first_name: "System".into(),
        last_name: "Administrator".into(),
        middle_initial: None,
        email,
        password: admin.password.clone(),
        role: Some(RoleInput { kind: RoleType::Admin, section_id: None }),
    };
    let user = create_user(store, input, None)
        .await
        .map_err(|e| anyhow::anyhow!("create bootstrap admin: {e}"))?;
    info!(user_id = %user.internal_id, "bootstrap admin created");
    Ok(())
}
