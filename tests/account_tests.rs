//! Registration, login, bearer authentication and moderation.

mod support;

use chrono::Utc;
use kastia::adapter::outbound::identity::jwt::sign_hs256;
use kastia::domain::{AuditAction, BanState, Permission};
use kastia::error::{AccessError, Error, ErrorKind};
use kastia::testkit::domain::{binary_market, buy};
use kastia::testkit::world::{EXTERNAL_SECRET, PASSWORD};
use kastia::testkit::TestWorld;
use rust_decimal_macros::dec;
use serde_json::json;
use support::assertions::{assert_kind, audit_of};

#[tokio::test]
async fn register_creates_profile_with_defaults() {
    let world = TestWorld::new("account-register");
    let account = world
        .services
        .accounts
        .register("dana", "dana@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(account.user.username, "dana");
    assert!(!account.user.is_superuser);
    assert!(!account.profile.is_banned());

    assert_kind(
        world
            .services
            .accounts
            .register("dana", "other@example.com", PASSWORD)
            .await,
        ErrorKind::Conflict,
    );
    assert_kind(
        world.services.accounts.register("erin", "erin@example.com", "short").await,
        ErrorKind::Validation,
    );
}

#[tokio::test]
async fn login_issues_a_stable_token_that_authenticates() {
    let world = TestWorld::new("account-login");
    let actor = world.user("frank").await;

    let first = world.token("frank").await;
    let second = world.token("frank").await;
    assert_eq!(first, second);
    assert_eq!(first.len(), world.config.auth.token_length);

    let resolved = world
        .services
        .accounts
        .authenticate(&first, Some("10.0.0.7".into()))
        .await
        .unwrap();
    assert_eq!(resolved.user_id, actor.user_id);
    assert_eq!(resolved.ip_address.as_deref(), Some("10.0.0.7"));

    assert_kind(
        world.services.accounts.login("frank", "wrong-password").await,
        ErrorKind::AuthenticationFailed,
    );
    assert_kind(
        world.services.accounts.login("nobody", PASSWORD).await,
        ErrorKind::AuthenticationFailed,
    );
    assert_kind(
        world.services.accounts.authenticate("bogus", None).await,
        ErrorKind::AuthenticationFailed,
    );
}

#[tokio::test]
async fn banned_users_cannot_log_in_or_act() {
    let world = TestWorld::new("account-ban");
    let moderator = world.user_with("mod", &[Permission::BanUser]).await;
    let admin = world.admin("root").await;
    let target = world.user("grace").await;
    let token = world.token("grace").await;

    let profile = world
        .services
        .accounts
        .ban(&moderator, target.user_id, Some("Spam".into()))
        .await
        .unwrap();
    match &profile.ban {
        BanState::Banned {
            reason, banned_by, ..
        } => {
            assert_eq!(reason.as_deref(), Some("Spam"));
            assert_eq!(*banned_by, Some(moderator.user_id));
        }
        BanState::Active => panic!("expected a ban"),
    }

    let err = world.services.accounts.login("grace", PASSWORD).await.unwrap_err();
    match err {
        Error::Access(AccessError::UserBanned { reason }) => {
            assert_eq!(reason.as_deref(), Some("Spam"));
        }
        other => panic!("expected UserBanned, got {other}"),
    }
    assert_kind(
        world.services.accounts.authenticate(&token, None).await,
        ErrorKind::PermissionDenied,
    );

    // A stale actor snapshot is still refused by the services.
    let market = world
        .services
        .markets
        .create(&moderator, binary_market("Banned trade"))
        .await
        .unwrap();
    let stale = world.refresh(&target).await;
    assert!(stale.is_banned);
    assert_kind(
        world
            .services
            .ledger
            .record_trade(&stale, buy(&market, "Yes", dec!(1), dec!(0.5)))
            .await,
        ErrorKind::PermissionDenied,
    );

    let entries = audit_of(&world, &admin, AuditAction::BanUser).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target, "User: grace");
    assert_eq!(entries[0].details.as_deref(), Some("Reason: Spam"));

    world
        .services
        .accounts
        .unban(&moderator, target.user_id)
        .await
        .unwrap();
    world.services.accounts.login("grace", PASSWORD).await.unwrap();
    assert_eq!(audit_of(&world, &admin, AuditAction::UnbanUser).await.len(), 1);
}

#[tokio::test]
async fn moderation_rules() {
    let world = TestWorld::new("account-moderation");
    let moderator = world.user_with("mod", &[Permission::BanUser]).await;
    let plain = world.user("plain").await;

    assert_kind(
        world.services.accounts.ban(&plain, moderator.user_id, None).await,
        ErrorKind::PermissionDenied,
    );
    assert_kind(
        world.services.accounts.ban(&moderator, moderator.user_id, None).await,
        ErrorKind::Validation,
    );
    assert_kind(
        world
            .services
            .accounts
            .ban(&moderator, kastia::domain::UserId::new(9_999), None)
            .await,
        ErrorKind::NotFound,
    );
}

#[tokio::test]
async fn change_password_requires_the_old_one() {
    let world = TestWorld::new("account-password");
    let actor = world.user("henry").await;
    let accounts = &world.services.accounts;

    assert_kind(
        accounts.change_password(&actor, "wrong-password", "brand-new-pass").await,
        ErrorKind::Validation,
    );
    assert_kind(
        accounts.change_password(&actor, PASSWORD, "tiny").await,
        ErrorKind::Validation,
    );
    accounts
        .change_password(&actor, PASSWORD, "brand-new-pass")
        .await
        .unwrap();
    assert_kind(accounts.login("henry", PASSWORD).await, ErrorKind::AuthenticationFailed);
    accounts.login("henry", "brand-new-pass").await.unwrap();
}

#[tokio::test]
async fn external_tokens_provision_users() {
    let world = TestWorld::with_external_tokens("account-external");
    let claims = json!({
        "sub": "ext-1",
        "email": "ivy@example.com",
        "aud": "authenticated",
        "exp": Utc::now().timestamp() + 600,
    });
    let token = sign_hs256(EXTERNAL_SECRET.as_bytes(), &claims).unwrap();

    let actor = world.services.accounts.authenticate(&token, None).await.unwrap();
    assert_eq!(actor.username, "ivy");
    assert!(!actor.is_superuser);

    // Same email maps to the same user.
    let again = world.services.accounts.authenticate(&token, None).await.unwrap();
    assert_eq!(again.user_id, actor.user_id);

    let mut admin_claims = claims.clone();
    admin_claims["user_metadata"] = json!({"role": "admin"});
    let admin_token = sign_hs256(EXTERNAL_SECRET.as_bytes(), &admin_claims).unwrap();
    let admin = world
        .services
        .accounts
        .authenticate(&admin_token, None)
        .await
        .unwrap();
    assert_eq!(admin.user_id, actor.user_id);
    assert!(admin.is_superuser);

    let forged = sign_hs256(b"not-the-secret", &claims).unwrap();
    assert_kind(
        world.services.accounts.authenticate(&forged, None).await,
        ErrorKind::AuthenticationFailed,
    );
}

#[tokio::test]
async fn external_tokens_cannot_take_over_local_accounts() {
    let world = TestWorld::with_external_tokens("account-external-takeover");
    let (local, _) = world
        .services
        .accounts
        .create_admin("admin", "admin@kastia.com", PASSWORD)
        .await
        .unwrap();
    let claims = json!({
        "sub": "ext-2",
        "email": "admin@other.domain",
        "aud": "authenticated",
        "exp": Utc::now().timestamp() + 600,
    });
    let token = sign_hs256(EXTERNAL_SECRET.as_bytes(), &claims).unwrap();

    assert_kind(
        world.services.accounts.authenticate(&token, None).await,
        ErrorKind::AuthenticationFailed,
    );
    let session = world.services.accounts.login("admin", PASSWORD).await.unwrap();
    assert_eq!(session.account.user.id, local.user.id);
    assert_eq!(session.account.user.email, "admin@kastia.com");
}

#[tokio::test]
async fn create_admin_is_idempotent() {
    let world = TestWorld::new("account-create-admin");
    let accounts = &world.services.accounts;

    let (account, created) = accounts
        .create_admin("admin", "admin@kastia.com", PASSWORD)
        .await
        .unwrap();
    assert!(created);
    assert!(account.user.is_superuser);

    let (again, created) = accounts
        .create_admin("admin", "admin@kastia.com", "another-password")
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.user.id, account.user.id);

    let session = accounts.login("admin", PASSWORD).await.unwrap();
    let actor = accounts.authenticate(&session.token, None).await.unwrap();
    assert!(actor.has_role("Admin"));
}

#[tokio::test]
async fn grant_role_confers_permissions() {
    let world = TestWorld::new("account-grant");
    let actor = world.user("judy").await;
    let accounts = &world.services.accounts;

    let roles = accounts.setup_roles().await.unwrap();
    assert!(roles.contains(&"Compliance"));

    accounts.grant_role("judy", "Compliance").await.unwrap();
    let refreshed = world.refresh(&actor).await;
    assert!(refreshed.has_permission(Permission::BanUser));
    assert!(refreshed.has_permission(Permission::ViewAuditLog));

    assert_kind(accounts.grant_role("judy", "Nonexistent").await, ErrorKind::NotFound);
    assert_kind(accounts.grant_role("ghost", "Compliance").await, ErrorKind::NotFound);
}
