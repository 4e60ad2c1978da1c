//! Integration tests for account management.

use nsvault_core::{
    hash_password, AccountManager, AccountSettings, AccountView, AuthFailure, AuthOutcome,
    CoreError, KeySource, Namespace, NamespaceRegistry, StaticAdminIdentity, StorageConfig,
    ACCOUNTS_CONFIG_KEY,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tempfile::tempdir;

async fn manager(username: &str, password: &str) -> AccountManager {
    let registry = NamespaceRegistry::in_memory();
    AccountManager::open(&registry, Arc::new(StaticAdminIdentity::new(username, password)))
        .await
        .unwrap()
}

async fn seed(manager: &AccountManager, accounts: Value) {
    manager
        .adapter()
        .set_config(ACCOUNTS_CONFIG_KEY, accounts)
        .await
        .unwrap();
}

async fn stored(manager: &AccountManager) -> Value {
    manager
        .adapter()
        .get_config(ACCOUNTS_CONFIG_KEY)
        .await
        .unwrap()
        .unwrap_or(Value::Null)
}

struct FixedKeySource(&'static str);

impl KeySource for FixedKeySource {
    fn draw(&self) -> String {
        self.0.to_string()
    }
}

#[tokio::test]
async fn empty_store_gets_canonical_admin() {
    let manager = manager("admin", "s3cret").await;
    let accounts = manager.ensure_default_account().await.unwrap();

    assert_eq!(accounts.len(), 1);
    let admin = &accounts[0];
    assert_eq!(admin.username, "admin");
    assert_eq!(admin.password_hash, hash_password("s3cret"));
    assert!(admin.is_admin);
    assert!(!admin.disabled);
    assert!(admin.created_at > 0);
    assert_eq!(admin.api_key.as_ref().map(String::len), Some(32));

    let persisted = stored(&manager).await;
    assert_eq!(persisted.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn existing_username_is_promoted() {
    let manager = manager("admin", "s3cret").await;
    seed(
        &manager,
        json!([
            { "username": "admin", "password_hash": "stale", "is_admin": false },
            { "username": "bob", "password_hash": hash_password("pw"), "is_admin": false }
        ]),
    )
    .await;

    let accounts = manager.ensure_default_account().await.unwrap();
    assert_eq!(accounts.len(), 2);

    let admin = accounts.iter().find(|a| a.username == "admin").unwrap();
    assert!(admin.is_admin);
    assert_eq!(admin.password_hash, hash_password("s3cret"));
    assert!(!accounts.iter().find(|a| a.username == "bob").unwrap().is_admin);
}

#[tokio::test]
async fn flagged_admin_is_renamed() {
    let manager = manager("root", "pw2").await;
    seed(
        &manager,
        json!([
            { "username": "admin", "password_hash": hash_password("pwd"), "is_admin": true, "disabled": true },
            { "username": "bob", "password_hash": hash_password("pw"), "is_admin": false }
        ]),
    )
    .await;

    let accounts = manager.ensure_default_account().await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].username, "root");
    assert!(accounts[0].is_admin);
    assert!(!accounts[0].disabled);
    assert_eq!(accounts[0].password_hash, hash_password("pw2"));
}

#[tokio::test]
async fn username_match_wins_over_stale_flag() {
    let manager = manager("admin", "s3cret").await;
    seed(
        &manager,
        json!([
            { "username": "old-admin", "password_hash": "x", "is_admin": true },
            { "username": "admin", "password_hash": "y", "is_admin": false },
            { "username": "other", "password_hash": "z", "is_admin": true }
        ]),
    )
    .await;

    let accounts = manager.ensure_default_account().await.unwrap();
    assert_eq!(accounts.len(), 3);

    let admins: Vec<_> = accounts.iter().filter(|a| a.is_admin).collect();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].username, "admin");
    assert_eq!(
        accounts.iter().filter(|a| a.username == "admin").count(),
        1
    );
}

#[tokio::test]
async fn missing_admin_is_appended() {
    let manager = manager("admin", "pwd").await;
    seed(
        &manager,
        json!([{ "username": "carol", "password_hash": "h", "is_admin": false }]),
    )
    .await;

    let accounts = manager.ensure_default_account().await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[1].username, "admin");
    assert!(accounts[1].is_admin);
}

#[tokio::test]
async fn duplicate_keys_are_repaired() {
    let manager = manager("admin", "pwd").await;
    seed(
        &manager,
        json!([
            { "username": "admin", "password_hash": "h", "is_admin": true, "api_key": "shared" },
            { "username": "bob", "password_hash": "h", "api_key": "shared" },
            { "username": "carol", "password_hash": "h" }
        ]),
    )
    .await;

    let accounts = manager.ensure_default_account().await.unwrap();
    assert_eq!(accounts[0].api_key.as_deref(), Some("shared"));

    let keys: HashSet<_> = accounts.iter().filter_map(|a| a.api_key.clone()).collect();
    assert_eq!(keys.len(), 3);
}

#[tokio::test]
async fn healthy_list_is_not_rewritten() {
    let manager = manager("admin", "pwd").await;
    let first = manager.ensure_default_account().await.unwrap();
    let second = manager.ensure_default_account().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn authenticate_signs_up_unknown_users() {
    let manager = manager("admin", "pwd").await;

    let outcome = manager.authenticate("newuser", "pw1").await.unwrap();
    assert_eq!(outcome, AuthOutcome::Success { created: true });

    let account = manager.get_account("newuser").await.unwrap().unwrap();
    assert!(!account.is_admin);
    assert!(!account.disabled);
    assert_eq!(account.password_hash, hash_password("pw1"));
    assert!(account.api_key.is_some());
    assert_eq!(account.last_login, None);

    let outcome = manager.authenticate("newuser", "pw1").await.unwrap();
    assert_eq!(outcome, AuthOutcome::Success { created: false });
    let outcome = manager.authenticate("newuser", "wrong").await.unwrap();
    assert_eq!(outcome, AuthOutcome::Failure(AuthFailure::PasswordMismatch));
}

#[tokio::test]
async fn empty_username_is_refused_without_sign_up() {
    let manager = manager("admin", "pwd").await;

    let outcome = manager.authenticate("", "pw").await.unwrap();
    assert_eq!(outcome, AuthOutcome::Failure(AuthFailure::EmptyUsername));

    assert!(manager.get_account("").await.unwrap().is_none());
    let usernames: Vec<String> = manager
        .list_accounts(true)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.username().to_string())
        .collect();
    assert_eq!(usernames, vec!["admin"]);
}

#[tokio::test]
async fn disabled_beats_password_mismatch() {
    let manager = manager("admin", "pwd").await;
    manager.upsert_account("dave", "pw", false, true).await.unwrap();

    for password in ["pw", "wrong"] {
        let outcome = manager.authenticate("dave", password).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Failure(AuthFailure::Disabled));
    }

    assert!(manager.set_disabled("dave", false).await.unwrap());
    assert!(manager.authenticate("dave", "pw").await.unwrap().is_success());
    assert!(!manager.set_disabled("nobody", true).await.unwrap());
}

#[tokio::test]
async fn upsert_overwrites_in_place() {
    let manager = manager("admin", "pwd").await;

    let first = manager.upsert_account("bob", "one", false, false).await.unwrap();
    let second = manager.upsert_account("bob", "two", false, false).await.unwrap();

    assert_eq!(second.password_hash, hash_password("two"));
    assert_eq!(second.api_key, first.api_key);
    assert_eq!(second.created_at, first.created_at);

    let accounts = manager.list_accounts(true).await.unwrap();
    assert_eq!(accounts.iter().filter(|a| a.username() == "bob").count(), 1);
}

#[tokio::test]
async fn remove_keeps_at_least_one_account() {
    let manager = manager("admin", "pwd").await;
    manager.ensure_default_account().await.unwrap();
    let before = stored(&manager).await;

    let err = manager.remove_account("admin").await.unwrap_err();
    assert!(matches!(err, CoreError::LastAccount));
    assert!(!err.is_internal());
    assert_eq!(stored(&manager).await, before);

    manager.upsert_account("bob", "pw", false, false).await.unwrap();
    assert!(manager.remove_account("bob").await.unwrap());
    assert!(!manager.remove_account("bob").await.unwrap());
}

#[tokio::test]
async fn removed_admin_is_restored() {
    let manager = manager("admin", "pwd").await;
    manager.upsert_account("bob", "pw", false, false).await.unwrap();

    assert!(manager.remove_account("admin").await.unwrap());
    assert!(manager.is_admin("admin").await.unwrap());
    assert!(!manager.is_admin("bob").await.unwrap());
    assert!(!manager.is_admin("nobody").await.unwrap());
}

#[tokio::test]
async fn lookup_by_api_key() {
    let manager = manager("admin", "pwd").await;
    let bob = manager.upsert_account("bob", "pw", false, false).await.unwrap();
    let key = bob.api_key.clone().unwrap();

    let found = manager.get_account_by_api_key(&key).await.unwrap().unwrap();
    assert_eq!(found.username, "bob");
    assert_eq!(manager.get_account_api_key("bob").await.unwrap(), Some(key.clone()));
    assert_eq!(manager.get_account_by_api_key("").await.unwrap(), None);

    manager.set_disabled("bob", true).await.unwrap();
    assert_eq!(manager.get_account_by_api_key(&key).await.unwrap(), None);
    assert!(manager.is_disabled("bob").await.unwrap());
}

#[tokio::test]
async fn refresh_api_key_replaces_key() {
    let manager = manager("admin", "pwd").await;
    let bob = manager.upsert_account("bob", "pw", false, false).await.unwrap();

    let fresh = manager.refresh_api_key("bob").await.unwrap();
    assert_ne!(Some(fresh.clone()), bob.api_key);
    assert_eq!(manager.get_account_api_key("bob").await.unwrap(), Some(fresh));

    let err = manager.refresh_api_key("nobody").await.unwrap_err();
    assert!(matches!(err, CoreError::AccountNotFound { .. }));
}

#[tokio::test]
async fn keys_disabled() {
    let manager = manager("admin", "pwd")
        .await
        .with_settings(AccountSettings::default().api_keys_enabled(false));

    let accounts = manager.ensure_default_account().await.unwrap();
    assert_eq!(accounts[0].api_key, None);

    let bob = manager.upsert_account("bob", "pw", false, false).await.unwrap();
    assert_eq!(bob.api_key, None);

    let err = manager.refresh_api_key("bob").await.unwrap_err();
    assert!(matches!(err, CoreError::ApiKeysDisabled));
}

#[tokio::test]
async fn key_exhaustion_is_internal() {
    let manager = manager("admin", "pwd")
        .await
        .with_key_source(Arc::new(FixedKeySource("always-the-same")))
        .with_settings(AccountSettings::default().max_key_attempts(3));

    manager.ensure_default_account().await.unwrap();
    let err = manager.upsert_account("bob", "pw", false, false).await.unwrap_err();

    assert!(matches!(err, CoreError::KeySpaceExhausted { attempts: 3 }));
    assert!(err.is_internal());
    assert_eq!(manager.get_account("bob").await.unwrap(), None);
}

#[tokio::test]
async fn timestamps_are_stamped() {
    let manager = manager("admin", "pwd").await;
    manager.upsert_account("bob", "pw", false, false).await.unwrap();

    manager.update_last_login("bob").await.unwrap();
    manager.update_last_call("bob").await.unwrap();
    manager.update_last_login("").await.unwrap();
    manager.update_last_call("ghost").await.unwrap();

    let bob = manager.get_account("bob").await.unwrap().unwrap();
    assert!(bob.last_login.is_some());
    assert!(bob.last_call.is_some());
    assert!(manager.get_account("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn listing_hides_secrets() {
    let manager = manager("admin", "pwd").await;
    manager.upsert_account("bob", "pw", false, false).await.unwrap();

    let views = manager.list_accounts(false).await.unwrap();
    assert!(views.iter().all(|v| matches!(v, AccountView::Summary(_))));

    let full = manager.list_accounts(true).await.unwrap();
    assert!(full.iter().all(|v| matches!(v, AccountView::Full(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_are_not_lost() {
    let manager = Arc::new(manager("admin", "pwd").await);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .upsert_account(&format!("user-{i}"), "pw", false, false)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let accounts = manager.ensure_default_account().await.unwrap();
    assert_eq!(accounts.len(), 21);
    let keys: HashSet<_> = accounts.iter().filter_map(|a| a.api_key.clone()).collect();
    assert_eq!(keys.len(), 21);
}

#[tokio::test]
async fn accounts_persist_in_file_backend() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::default().data_dir(dir.path());
    let admin = Arc::new(StaticAdminIdentity::new("admin", "pwd"));

    let registry = NamespaceRegistry::with_config(config.clone());
    let manager = AccountManager::open(&registry, admin.clone()).await.unwrap();
    manager.upsert_account("bob", "pw", false, false).await.unwrap();
    registry.close_all().await.unwrap();

    assert!(dir.path().join("accounts").join("config.json").exists());

    let registry = NamespaceRegistry::with_config(config);
    let manager = AccountManager::open(&registry, admin).await.unwrap();
    let bob = manager.get_account("bob").await.unwrap().unwrap();
    assert_eq!(bob.password_hash, hash_password("pw"));
    assert_eq!(manager.adapter().namespace(), &Namespace::accounts());
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn seeded_accounts() -> impl Strategy<Value = BTreeMap<String, (bool, bool, Option<String>)>> {
    prop::collection::btree_map(
        "[a-f]{1,2}",
        (any::<bool>(), any::<bool>(), prop::option::of("k[0-3]")),
        0..8,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn self_heal_yields_one_matching_admin_and_unique_keys(
        seeded in seeded_accounts(),
        admin_name in "[a-f]{1,2}",
    ) {
        block_on(async {
            let manager = manager(&admin_name, "secret").await;
            let records: Vec<Value> = seeded
                .iter()
                .map(|(name, (is_admin, disabled, key))| json!({
                    "username": name,
                    "password_hash": "h",
                    "is_admin": is_admin,
                    "disabled": disabled,
                    "api_key": key,
                }))
                .collect();
            seed(&manager, Value::Array(records)).await;

            let accounts = manager.ensure_default_account().await.unwrap();

            let admins: Vec<_> = accounts.iter().filter(|a| a.is_admin).collect();
            assert_eq!(admins.len(), 1);
            assert_eq!(admins[0].username, admin_name);
            assert_eq!(admins[0].password_hash, hash_password("secret"));
            assert!(!admins[0].disabled);

            let names: HashSet<_> = accounts.iter().map(|a| a.username.as_str()).collect();
            assert_eq!(names.len(), accounts.len());

            let keys: HashSet<_> = accounts.iter().filter_map(|a| a.api_key.as_deref()).collect();
            assert_eq!(keys.len(), accounts.len());

            let expected = seeded.len() + usize::from(!seeded.contains_key(&admin_name) && !seeded.values().any(|(is_admin, _, _)| *is_admin));
            assert_eq!(accounts.len(), expected.max(1));
        });
    }

    #[test]
    fn keys_stay_unique_across_operations(
        users in prop::collection::vec("[a-e]{1,2}", 1..12),
    ) {
        block_on(async {
            let manager = manager("admin", "pwd").await;
            for (i, user) in users.iter().enumerate() {
                if i % 2 == 0 {
                    manager.upsert_account(user, "pw", false, false).await.unwrap();
                } else {
                    manager.authenticate(user, "pw").await.unwrap();
                }
            }

            let accounts = manager.ensure_default_account().await.unwrap();
            let keys: HashSet<_> = accounts.iter().filter_map(|a| a.api_key.as_deref()).collect();
            assert_eq!(keys.len(), accounts.len());
        });
    }

    #[test]
    fn summaries_never_leak_secrets(
        users in prop::collection::btree_set("[a-z]{1,6}", 0..6),
    ) {
        block_on(async {
            let manager = manager("admin", "pwd").await;
            for user in &users {
                manager.upsert_account(user, "pw", false, false).await.unwrap();
            }

            let views = manager.list_accounts(false).await.unwrap();
            let rendered = serde_json::to_value(&views).unwrap();
            for entry in rendered.as_array().unwrap() {
                assert!(entry.get("password_hash").is_none());
                assert!(entry.get("api_key").is_none());
            }
        });
    }
}
