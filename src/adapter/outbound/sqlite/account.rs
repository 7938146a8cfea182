//! SQLite account store: users, profiles, tokens, role groups and grants.

use std::collections::BTreeSet;

use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;
use tracing::{debug, warn};

use crate::adapter::outbound::sqlite::audit;
use crate::adapter::outbound::sqlite::database::connection::{with_conn, DbPool};
use crate::adapter::outbound::sqlite::database::model::{
    now_rfc3339, AuthTokenRow, NewProfileRow, NewUserRow, ProfileRow, UserRow,
};
use crate::adapter::outbound::sqlite::database::schema::{
    auth_tokens, group_admins, group_members, market_groups, profiles, role_group_permissions,
    role_groups, user_permissions, user_role_groups, users,
};
use crate::domain::user::username_from_email;
use crate::domain::{
    Account, Actor, GroupId, NewAuditEntry, NewUser, Permission, Profile, Role, User, UserId,
    ADMIN_ROLE_GROUP,
};
use crate::error::{Error, Result, StateError};
use crate::port::outbound::store::{AccountStore, Credentials, ExternalIdentity};

/// Password hash that no hasher will ever verify.
pub const UNUSABLE_PASSWORD: &str = "!";

/// SQLite-backed account store.
#[derive(Clone)]
pub struct SqliteAccountStore {
    pool: DbPool,
}

impl SqliteAccountStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn insert_user(conn: &mut SqliteConnection, user: &NewUser) -> Result<UserRow> {
    let row = NewUserRow {
        username: user.username(),
        email: user.email(),
        password_hash: user.password_hash(),
        is_superuser: user.is_superuser(),
        is_staff: user.is_staff(),
        is_active: true,
        created_at: now_rfc3339(),
    };
    let inserted = diesel::insert_into(users::table)
        .values(&row)
        .returning(UserRow::as_returning())
        .get_result(conn);

    let user_row = match inserted {
        Ok(row) => row,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(StateError::AlreadyExists(format!("user {}", user.username())).into())
        }
        Err(e) => return Err(e.into()),
    };

    let role = if user.is_superuser() {
        Role::Admin
    } else {
        Role::User
    };
    diesel::insert_into(profiles::table)
        .values(&NewProfileRow {
            user_id: user_row.id,
            role: role.as_str().to_string(),
            joined_date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        })
        .execute(conn)?;

    Ok(user_row)
}

fn load_account(conn: &mut SqliteConnection, user_id: i32) -> Result<Option<Account>> {
    let row: Option<(UserRow, ProfileRow)> = users::table
        .inner_join(profiles::table)
        .filter(users::id.eq(user_id))
        .select((UserRow::as_select(), ProfileRow::as_select()))
        .first(conn)
        .optional()?;

    row.map(|(user, profile)| {
        Ok(Account {
            user: User::try_from(user)?,
            profile: Profile::try_from(profile)?,
        })
    })
    .transpose()
}

fn load_profile(conn: &mut SqliteConnection, user_id: i32) -> Result<Profile> {
    let row: ProfileRow = profiles::table
        .find(user_id)
        .select(ProfileRow::as_select())
        .first(conn)?;
    Profile::try_from(row)
}

fn ensure_role_group(conn: &mut SqliteConnection, name: &str) -> Result<i32> {
    diesel::insert_or_ignore_into(role_groups::table)
        .values(role_groups::name.eq(name))
        .execute(conn)?;
    let id = role_groups::table
        .filter(role_groups::name.eq(name))
        .select(role_groups::id)
        .first(conn)?;
    Ok(id)
}

fn add_to_role_group(conn: &mut SqliteConnection, user_id: i32, role_group_id: i32) -> Result<()> {
    diesel::insert_or_ignore_into(user_role_groups::table)
        .values((
            user_role_groups::user_id.eq(user_id),
            user_role_groups::role_group_id.eq(role_group_id),
        ))
        .execute(conn)?;
    Ok(())
}

fn parse_permissions(codenames: Vec<String>) -> BTreeSet<Permission> {
    codenames
        .into_iter()
        .filter_map(|code| match code.parse::<Permission>() {
            Ok(permission) => Some(permission),
            Err(_) => {
                warn!(codename = %code, "Ignoring unknown permission codename");
                None
            }
        })
        .collect()
}

fn load_actor(conn: &mut SqliteConnection, user_id: i32) -> Result<Option<Actor>> {
    let Some(account) = load_account(conn, user_id)? else {
        return Ok(None);
    };

    let roles: Vec<(i32, String)> = user_role_groups::table
        .inner_join(role_groups::table)
        .filter(user_role_groups::user_id.eq(user_id))
        .select((role_groups::id, role_groups::name))
        .load(conn)?;
    let role_ids: Vec<i32> = roles.iter().map(|(id, _)| *id).collect();

    let mut codenames: Vec<String> = role_group_permissions::table
        .filter(role_group_permissions::role_group_id.eq_any(role_ids))
        .select(role_group_permissions::codename)
        .load(conn)?;
    codenames.extend(
        user_permissions::table
            .filter(user_permissions::user_id.eq(user_id))
            .select(user_permissions::codename)
            .load::<String>(conn)?,
    );

    let mut groups: Vec<i32> = market_groups::table
        .filter(market_groups::owner_id.eq(user_id))
        .select(market_groups::id)
        .load(conn)?;
    groups.extend(
        group_admins::table
            .filter(group_admins::user_id.eq(user_id))
            .select(group_admins::group_id)
            .load::<i32>(conn)?,
    );
    groups.extend(
        group_members::table
            .filter(group_members::user_id.eq(user_id))
            .select(group_members::group_id)
            .load::<i32>(conn)?,
    );

    let mut actor = Actor::new(account.user.id, account.user.username);
    actor.is_superuser = account.user.is_superuser;
    actor.is_staff = account.user.is_staff;
    actor.is_banned = account.profile.is_banned();
    actor.roles = roles.into_iter().map(|(_, name)| name).collect();
    actor.permissions = parse_permissions(codenames);
    actor.groups = groups.into_iter().map(GroupId::new).collect();
    Ok(Some(actor))
}

impl AccountStore for SqliteAccountStore {
    async fn create_user(&self, user: &NewUser) -> Result<Account> {
        let user = user.clone();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let row = insert_user(conn, &user)?;
                load_account(conn, row.id)?.ok_or_else(|| Error::not_found("user", row.id))
            })
        })
        .await
    }

    async fn credentials(&self, username: &str) -> Result<Option<Credentials>> {
        let username = username.to_string();
        with_conn(&self.pool, move |conn| {
            let row: Option<UserRow> = users::table
                .filter(users::username.eq(&username))
                .select(UserRow::as_select())
                .first(conn)
                .optional()?;
            row.map(|row| {
                let password_hash = row.password_hash.clone();
                Ok(Credentials {
                    user: User::try_from(row)?,
                    password_hash,
                })
            })
            .transpose()
        })
        .await
    }

    async fn account(&self, user_id: UserId) -> Result<Option<Account>> {
        with_conn(&self.pool, move |conn| load_account(conn, user_id.value())).await
    }

    async fn actor(&self, user_id: UserId) -> Result<Option<Actor>> {
        with_conn(&self.pool, move |conn| load_actor(conn, user_id.value())).await
    }

    async fn set_password(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        let password_hash = password_hash.to_string();
        with_conn(&self.pool, move |conn| {
            let updated = diesel::update(users::table.find(user_id.value()))
                .set(users::password_hash.eq(&password_hash))
                .execute(conn)?;
            if updated == 0 {
                return Err(Error::not_found("user", user_id));
            }
            Ok(())
        })
        .await
    }

    async fn issue_token(&self, user_id: UserId, candidate: &str) -> Result<String> {
        let candidate = candidate.to_string();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let existing: Option<String> = auth_tokens::table
                    .filter(auth_tokens::user_id.eq(user_id.value()))
                    .select(auth_tokens::key)
                    .first(conn)
                    .optional()?;
                if let Some(key) = existing {
                    return Ok(key);
                }
                diesel::insert_into(auth_tokens::table)
                    .values(&AuthTokenRow {
                        key: candidate.clone(),
                        user_id: user_id.value(),
                        created_at: now_rfc3339(),
                    })
                    .execute(conn)?;
                debug!(user_id = %user_id, "Issued auth token");
                Ok(candidate)
            })
        })
        .await
    }

    async fn token_owner(&self, key: &str) -> Result<Option<UserId>> {
        let key = key.to_string();
        with_conn(&self.pool, move |conn| {
            let owner: Option<i32> = auth_tokens::table
                .find(&key)
                .select(auth_tokens::user_id)
                .first(conn)
                .optional()?;
            Ok(owner.map(UserId::new))
        })
        .await
    }

    async fn provision_external(&self, identity: &ExternalIdentity) -> Result<UserId> {
        let identity = identity.clone();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let username = username_from_email(&identity.email).to_string();
                let existing: Option<(i32, String)> = users::table
                    .filter(users::username.eq(&username))
                    .select((users::id, users::password_hash))
                    .first(conn)
                    .optional()?;

                let user_id = match existing {
                    // Local accounts sign in with their password only.
                    Some((id, hash)) if hash != UNUSABLE_PASSWORD => {
                        warn!(user_id = id, subject = %identity.subject, "External token matches a local account");
                        return Err(Error::authentication_failed(
                            "external identity conflicts with a local account",
                        ));
                    }
                    Some((id, _)) => {
                        diesel::update(users::table.find(id))
                            .set(users::email.eq(&identity.email))
                            .execute(conn)?;
                        id
                    }
                    None => {
                        let new_user =
                            NewUser::try_new(&username, &identity.email, UNUSABLE_PASSWORD)?;
                        let row = insert_user(conn, &new_user)?;
                        debug!(username = %username, subject = %identity.subject, "Provisioned external user");
                        row.id
                    }
                };

                if identity.is_admin {
                    diesel::update(users::table.find(user_id))
                        .set((users::is_staff.eq(true), users::is_superuser.eq(true)))
                        .execute(conn)?;
                    let admin_group = ensure_role_group(conn, ADMIN_ROLE_GROUP)?;
                    add_to_role_group(conn, user_id, admin_group)?;
                }
                Ok(UserId::new(user_id))
            })
        })
        .await
    }

    async fn ban(
        &self,
        target: UserId,
        banned_by: UserId,
        reason: Option<&str>,
        audit: NewAuditEntry,
    ) -> Result<Profile> {
        let reason = reason.map(str::to_string);
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let updated = diesel::update(profiles::table.find(target.value()))
                    .set((
                        profiles::is_banned.eq(true),
                        profiles::ban_reason.eq(reason.as_deref()),
                        profiles::banned_at.eq(Some(now_rfc3339())),
                        profiles::banned_by.eq(Some(banned_by.value())),
                    ))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(Error::not_found("user", target));
                }
                audit::append(conn, audit)?;
                load_profile(conn, target.value())
            })
        })
        .await
    }

    async fn unban(&self, target: UserId, audit: NewAuditEntry) -> Result<Profile> {
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let updated = diesel::update(profiles::table.find(target.value()))
                    .set((
                        profiles::is_banned.eq(false),
                        profiles::ban_reason.eq(None::<String>),
                        profiles::banned_at.eq(None::<String>),
                        profiles::banned_by.eq(None::<i32>),
                    ))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(Error::not_found("user", target));
                }
                audit::append(conn, audit)?;
                load_profile(conn, target.value())
            })
        })
        .await
    }

    async fn ensure_role_groups(&self, groups: &[(&'static str, Vec<Permission>)]) -> Result<()> {
        let groups = groups.to_vec();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                for (name, permissions) in &groups {
                    let id = ensure_role_group(conn, name)?;
                    for permission in permissions {
                        diesel::insert_or_ignore_into(role_group_permissions::table)
                            .values((
                                role_group_permissions::role_group_id.eq(id),
                                role_group_permissions::codename.eq(permission.codename()),
                            ))
                            .execute(conn)?;
                    }
                    debug!(role_group = %name, permissions = permissions.len(), "Role group ready");
                }
                Ok(())
            })
        })
        .await
    }

    async fn assign_role(&self, user_id: UserId, role: &str) -> Result<()> {
        let role = role.to_string();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let role_group_id: i32 = role_groups::table
                    .filter(role_groups::name.eq(&role))
                    .select(role_groups::id)
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| Error::not_found("role group", &role))?;
                let exists: i64 = users::table
                    .find(user_id.value())
                    .count()
                    .get_result(conn)?;
                if exists == 0 {
                    return Err(Error::not_found("user", user_id));
                }
                add_to_role_group(conn, user_id.value(), role_group_id)
            })
        })
        .await
    }

    async fn grant_permission(&self, user_id: UserId, permission: Permission) -> Result<()> {
        with_conn(&self.pool, move |conn| {
            diesel::insert_or_ignore_into(user_permissions::table)
                .values((
                    user_permissions::user_id.eq(user_id.value()),
                    user_permissions::codename.eq(permission.codename()),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}
