//! Registration, login, bearer authentication and user moderation.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::application::authorization::{Action, AuthorizationEngine, Resource};
use crate::domain::actor::default_role_groups;
use crate::domain::{
    Account, Actor, AuditAction, DomainError, NewAuditEntry, NewUser, Profile, UserId,
    ADMIN_ROLE_GROUP,
};
use crate::error::{AccessError, Error, Result};
use crate::port::outbound::identity::{ExternalTokenVerifier, PasswordHasher};
use crate::port::outbound::store::AccountStore;

/// Shortest password accepted at registration or on change.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Length of freshly issued opaque tokens.
pub const DEFAULT_TOKEN_LENGTH: usize = 40;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub account: Account,
}

/// Account use cases.
#[derive(Clone)]
pub struct AccountService<A> {
    store: A,
    hasher: Arc<dyn PasswordHasher>,
    external: Option<Arc<dyn ExternalTokenVerifier>>,
    token_length: usize,
    authz: AuthorizationEngine,
}

impl<A: AccountStore> AccountService<A> {
    pub fn new(store: A, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            store,
            hasher,
            external: None,
            token_length: DEFAULT_TOKEN_LENGTH,
            authz: AuthorizationEngine,
        }
    }

    /// Accept bearer tokens from an external identity provider.
    #[must_use]
    pub fn with_external_verifier(mut self, verifier: Arc<dyn ExternalTokenVerifier>) -> Self {
        self.external = Some(verifier);
        self
    }

    #[must_use]
    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    fn check_password_strength(password: &str) -> Result<()> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::InvalidValue {
                field: "password",
                reason: format!("must be at least {MIN_PASSWORD_LEN} characters"),
            }
            .into());
        }
        Ok(())
    }

    fn fresh_token(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.token_length)
            .map(char::from)
            .collect()
    }

    /// Create a user and its profile in one transaction.
    ///
    /// # Errors
    /// Validation errors, or `AlreadyExists` for a taken username.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Account> {
        Self::check_password_strength(password)?;
        let hash = self.hasher.hash(password)?;
        let account = self
            .store
            .create_user(&NewUser::try_new(username, email, hash)?)
            .await?;
        info!(user_id = %account.user.id, username = %account.user.username, "User registered");
        Ok(account)
    }

    /// Verify credentials and hand out the user's token.
    ///
    /// Banned users are rejected after their password has been checked, so the
    /// ban is never revealed to someone who does not know the password.
    ///
    /// # Errors
    /// `AuthenticationFailed` for bad credentials or inactive users,
    /// `UserBanned` for banned users.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let invalid = || Error::authentication_failed("invalid credentials");
        let credentials = self.store.credentials(username).await?.ok_or_else(invalid)?;
        if !self.hasher.verify(password, &credentials.password_hash) {
            warn!(username = %username, "Login failed");
            return Err(invalid());
        }
        if !credentials.user.is_active {
            return Err(Error::authentication_failed("user inactive or deleted"));
        }

        let account = self
            .store
            .account(credentials.user.id)
            .await?
            .ok_or_else(|| Error::not_found("user", credentials.user.id))?;
        if account.profile.is_banned() {
            warn!(user_id = %account.user.id, "Login rejected: user is banned");
            return Err(AccessError::UserBanned {
                reason: account.profile.ban.reason().map(str::to_string),
            }
            .into());
        }

        let token = self
            .store
            .issue_token(account.user.id, &self.fresh_token())
            .await?;
        info!(user_id = %account.user.id, "User logged in");
        Ok(Session { token, account })
    }

    fn looks_like_jwt(token: &str) -> bool {
        token.matches('.').count() == 2
    }

    /// Resolve a bearer token to an [`Actor`].
    ///
    /// Three-segment tokens go to the external verifier when one is
    /// configured; everything else is looked up as a local opaque token.
    ///
    /// # Errors
    /// `AuthenticationFailed` for unknown, expired or invalid tokens and for
    /// inactive users; `UserBanned` for banned users.
    pub async fn authenticate(&self, token: &str, ip: Option<String>) -> Result<Actor> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::authentication_failed("missing token"));
        }

        let user_id = match &self.external {
            Some(verifier) if Self::looks_like_jwt(token) => {
                let identity = verifier.verify(token)?;
                let user_id = self.store.provision_external(&identity).await?;
                debug!(user_id = %user_id, admin = identity.is_admin, "External token accepted");
                user_id
            }
            _ => self
                .store
                .token_owner(token)
                .await?
                .ok_or_else(|| Error::authentication_failed("invalid token"))?,
        };

        let account = self
            .store
            .account(user_id)
            .await?
            .ok_or_else(|| Error::authentication_failed("user inactive or deleted"))?;
        if !account.user.is_active {
            return Err(Error::authentication_failed("user inactive or deleted"));
        }
        if account.profile.is_banned() {
            return Err(AccessError::UserBanned {
                reason: account.profile.ban.reason().map(str::to_string),
            }
            .into());
        }

        let actor = self
            .store
            .actor(user_id)
            .await?
            .ok_or_else(|| Error::authentication_failed("user inactive or deleted"))?;
        Ok(actor.with_ip(ip))
    }

    /// The caller's user and profile.
    ///
    /// # Errors
    /// `NotFound` if the account vanished.
    pub async fn me(&self, actor: &Actor) -> Result<Account> {
        self.store
            .account(actor.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", actor.user_id))
    }

    /// Replace the caller's password after checking the old one.
    ///
    /// # Errors
    /// A validation error for a wrong old password or a weak new one.
    pub async fn change_password(&self, actor: &Actor, old: &str, new: &str) -> Result<()> {
        let credentials = self
            .store
            .credentials(&actor.username)
            .await?
            .ok_or_else(|| Error::not_found("user", actor.user_id))?;
        if !self.hasher.verify(old, &credentials.password_hash) {
            return Err(DomainError::InvalidValue {
                field: "old_password",
                reason: "wrong password".into(),
            }
            .into());
        }
        Self::check_password_strength(new)?;
        let hash = self.hasher.hash(new)?;
        self.store.set_password(actor.user_id, &hash).await?;
        info!(user_id = %actor.user_id, "Password changed");
        Ok(())
    }

    async fn moderation_target(&self, actor: &Actor, target: UserId) -> Result<Account> {
        if !self.authz.can(actor, Action::BanUser, Resource::System) {
            warn!(actor = %actor.user_id, target = %target, "Moderation denied");
            return Err(Error::permission_denied(
                "you do not have permission to ban users",
            ));
        }
        let account = self
            .store
            .account(target)
            .await?
            .ok_or_else(|| Error::not_found("user", target))?;
        if target == actor.user_id {
            return Err(DomainError::InvalidValue {
                field: "user_id",
                reason: "you cannot ban yourself".into(),
            }
            .into());
        }
        Ok(account)
    }

    /// Ban a user.
    ///
    /// # Errors
    /// `PermissionDenied`, `NotFound`, or a validation error for a self-ban.
    pub async fn ban(&self, actor: &Actor, target: UserId, reason: Option<String>) -> Result<Profile> {
        let account = self.moderation_target(actor, target).await?;
        let reason = reason.filter(|r| !r.trim().is_empty());
        let mut audit = NewAuditEntry::by(
            actor,
            AuditAction::BanUser,
            format!("User: {}", account.user.username),
        );
        if let Some(reason) = &reason {
            audit = audit.details(format!("Reason: {reason}"));
        }
        let profile = self
            .store
            .ban(target, actor.user_id, reason.as_deref(), audit)
            .await?;
        info!(target = %target, banned_by = %actor.user_id, "User banned");
        Ok(profile)
    }

    /// Lift a ban.
    ///
    /// # Errors
    /// `PermissionDenied`, `NotFound`, or a validation error for a self-unban.
    pub async fn unban(&self, actor: &Actor, target: UserId) -> Result<Profile> {
        let account = self.moderation_target(actor, target).await?;
        let audit = NewAuditEntry::by(
            actor,
            AuditAction::UnbanUser,
            format!("User: {}", account.user.username),
        );
        let profile = self.store.unban(target, audit).await?;
        info!(target = %target, unbanned_by = %actor.user_id, "User unbanned");
        Ok(profile)
    }

    /// Create a superuser with profile, or return the existing one.
    ///
    /// # Errors
    /// Validation or storage errors.
    pub async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(Account, bool)> {
        if let Some(existing) = self.store.credentials(username).await? {
            let account = self
                .store
                .account(existing.user.id)
                .await?
                .ok_or_else(|| Error::not_found("user", existing.user.id))?;
            info!(username = %username, "Admin user already exists");
            return Ok((account, false));
        }
        Self::check_password_strength(password)?;
        let hash = self.hasher.hash(password)?;
        let account = self
            .store
            .create_user(&NewUser::try_new(username, email, hash)?.superuser())
            .await?;
        self.store.ensure_role_groups(&default_role_groups()).await?;
        self.store.assign_role(account.user.id, ADMIN_ROLE_GROUP).await?;
        info!(user_id = %account.user.id, username = %username, "Admin user created");
        Ok((account, true))
    }

    /// Seed the standard role groups and their permissions.
    ///
    /// # Errors
    /// Storage errors.
    pub async fn setup_roles(&self) -> Result<Vec<&'static str>> {
        let groups = default_role_groups();
        self.store.ensure_role_groups(&groups).await?;
        let names: Vec<&'static str> = groups.iter().map(|(name, _)| *name).collect();
        info!(count = names.len(), "Role groups ready");
        Ok(names)
    }

    /// Put a user into a role group by username.
    ///
    /// # Errors
    /// `NotFound` for an unknown user or role group.
    pub async fn grant_role(&self, username: &str, role: &str) -> Result<()> {
        let credentials = self
            .store
            .credentials(username)
            .await?
            .ok_or_else(|| Error::not_found("user", username))?;
        self.store.assign_role(credentials.user.id, role).await?;
        info!(username = %username, role = %role, "Role granted");
        Ok(())
    }
}
