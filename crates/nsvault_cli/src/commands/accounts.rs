//! Account commands.

use crate::Format;
use nsvault_core::{
    AccountManager, AccountView, AuthFailure, AuthOutcome, EnvAdminIdentity, NamespaceRegistry,
};
use std::sync::Arc;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Opens the account manager over the accounts namespace.
pub async fn open(
    registry: &NamespaceRegistry,
) -> Result<AccountManager, Box<dyn std::error::Error>> {
    Ok(AccountManager::open(registry, Arc::new(EnvAdminIdentity)).await?)
}

/// Prints every account.
pub async fn list(manager: &AccountManager, sensitive: bool, format: Format) -> CommandResult {
    let accounts = manager.list_accounts(sensitive).await?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&accounts)?),
        Format::Text => {
            println!("{:<24} {:<6} {:<9} API KEY", "USERNAME", "ADMIN", "DISABLED");
            for view in &accounts {
                let key = match view {
                    AccountView::Full(account) => account.api_key.as_deref().unwrap_or("-"),
                    AccountView::Summary(_) => "<hidden>",
                };
                println!(
                    "{:<24} {:<6} {:<9} {}",
                    view.username(),
                    view.is_admin(),
                    view.is_disabled(),
                    key
                );
            }
        }
    }
    Ok(())
}

/// Creates or overwrites an account.
pub async fn upsert(
    manager: &AccountManager,
    username: &str,
    password: &str,
    is_admin: bool,
    disabled: bool,
) -> CommandResult {
    let account = manager
        .upsert_account(username, password, is_admin, disabled)
        .await?;
    println!("Saved account {}", account.username);
    if let Some(key) = account.api_key {
        println!("API key: {key}");
    }
    Ok(())
}

/// Removes an account.
pub async fn remove(manager: &AccountManager, username: &str) -> CommandResult {
    if manager.remove_account(username).await? {
        println!("Removed account {username}");
    } else {
        println!("No account named {username}");
    }
    Ok(())
}

/// Enables or disables an account.
pub async fn set_disabled(manager: &AccountManager, username: &str, disabled: bool) -> CommandResult {
    if !manager.set_disabled(username, disabled).await? {
        return Err(format!("No account named {username}").into());
    }
    let state = if disabled { "disabled" } else { "enabled" };
    println!("Account {username} {state}");
    Ok(())
}

/// Issues a new API key.
pub async fn refresh_key(manager: &AccountManager, username: &str) -> CommandResult {
    let key = manager.refresh_api_key(username).await?;
    println!("API key: {key}");
    Ok(())
}

/// Checks credentials; fails the command if they are refused.
pub async fn authenticate(manager: &AccountManager, username: &str, password: &str) -> CommandResult {
    match manager.authenticate(username, password).await? {
        AuthOutcome::Success { created: true } => {
            println!("Authenticated {username} (new account created)");
            Ok(())
        }
        AuthOutcome::Success { created: false } => {
            println!("Authenticated {username}");
            Ok(())
        }
        AuthOutcome::Failure(AuthFailure::Disabled) => {
            Err(format!("Account {username} is disabled").into())
        }
        AuthOutcome::Failure(AuthFailure::PasswordMismatch) => {
            Err(format!("Wrong password for {username}").into())
        }
        AuthOutcome::Failure(AuthFailure::EmptyUsername) => Err("Username is empty".into()),
    }
}
