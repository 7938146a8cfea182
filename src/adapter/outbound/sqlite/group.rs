//! SQLite group store: membership join tables, access requests and market links.

use std::collections::BTreeSet;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;
use tracing::debug;

use crate::adapter::outbound::sqlite::audit;
use crate::adapter::outbound::sqlite::database::connection::{with_conn, DbPool};
use crate::adapter::outbound::sqlite::database::model::{
    now_rfc3339, parse_column, parse_timestamp, AccessRequestRow, GroupMarketRow, GroupRow,
    NewAccessRequestRow, NewGroupMarketRow, NewGroupRow,
};
use crate::adapter::outbound::sqlite::database::schema::{
    group_access_requests, group_admins, group_markets, group_members, market_groups, markets,
    users,
};
use crate::domain::{
    AccessDecision, AccessRequest, AccessRequestId, AccessRequestStatus, Group, GroupDetail,
    GroupId, GroupMarket, MarketId, MemberInfo, NewAuditEntry, NewGroup, Privacy, Roster, UserId,
};
use crate::error::{Error, Result, StateError};
use crate::port::outbound::store::GroupStore;

/// SQLite-backed group store.
#[derive(Clone)]
pub struct SqliteGroupStore {
    pool: DbPool,
}

impl SqliteGroupStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_group(conn: &mut SqliteConnection, id: i32) -> Result<Option<Group>> {
    market_groups::table
        .find(id)
        .select(GroupRow::as_select())
        .first(conn)
        .optional()?
        .map(Group::try_from)
        .transpose()
}

fn load_roster(conn: &mut SqliteConnection, id: i32) -> Result<Roster> {
    let owner: Option<i32> = market_groups::table
        .find(id)
        .select(market_groups::owner_id)
        .first(conn)
        .optional()?;
    let admins: Vec<i32> = group_admins::table
        .filter(group_admins::group_id.eq(id))
        .select(group_admins::user_id)
        .load(conn)?;
    let members: Vec<i32> = group_members::table
        .filter(group_members::group_id.eq(id))
        .select(group_members::user_id)
        .load(conn)?;

    Ok(Roster {
        owner: owner.map(UserId::new),
        admins: admins.into_iter().map(UserId::new).collect(),
        members: members.into_iter().map(UserId::new).collect(),
    })
}

fn member_infos(conn: &mut SqliteConnection, ids: &BTreeSet<UserId>) -> Result<Vec<MemberInfo>> {
    let ids: Vec<i32> = ids.iter().map(|id| id.value()).collect();
    let rows: Vec<(i32, String, String)> = users::table
        .filter(users::id.eq_any(ids))
        .select((users::id, users::username, users::email))
        .order(users::username.asc())
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|(id, username, email)| MemberInfo {
            id: UserId::new(id),
            username,
            email,
        })
        .collect())
}

fn load_group_markets(conn: &mut SqliteConnection, id: i32) -> Result<Vec<GroupMarket>> {
    let rows: Vec<(GroupMarketRow, String, String)> = group_markets::table
        .inner_join(markets::table)
        .filter(group_markets::group_id.eq(id))
        .select((GroupMarketRow::as_select(), markets::title, markets::status))
        .order(group_markets::id.asc())
        .load(conn)?;
    rows.into_iter()
        .map(|(row, title, status)| to_group_market(row, title, &status))
        .collect()
}

fn to_group_market(row: GroupMarketRow, title: String, status: &str) -> Result<GroupMarket> {
    Ok(GroupMarket {
        group_id: GroupId::new(row.group_id),
        market_id: MarketId::new(row.market_id),
        market_title: title,
        market_status: parse_column("markets.status", status)?,
        created_at: parse_timestamp("group_markets.created_at", &row.created_at)?,
    })
}

fn load_request(conn: &mut SqliteConnection, id: i32) -> Result<Option<AccessRequest>> {
    group_access_requests::table
        .inner_join(users::table)
        .filter(group_access_requests::id.eq(id))
        .select((AccessRequestRow::as_select(), users::username))
        .first::<(AccessRequestRow, String)>(conn)
        .optional()?
        .map(|(row, username)| row.into_request(username))
        .transpose()
}

fn memberships_of(conn: &mut SqliteConnection, user_id: i32) -> Result<Vec<i32>> {
    let mut ids: Vec<i32> = market_groups::table
        .filter(market_groups::owner_id.eq(user_id))
        .select(market_groups::id)
        .load(conn)?;
    ids.extend(
        group_admins::table
            .filter(group_admins::user_id.eq(user_id))
            .select(group_admins::group_id)
            .load::<i32>(conn)?,
    );
    ids.extend(
        group_members::table
            .filter(group_members::user_id.eq(user_id))
            .select(group_members::group_id)
            .load::<i32>(conn)?,
    );
    Ok(ids)
}

impl GroupStore for SqliteGroupStore {
    async fn create_group(&self, owner: UserId, group: &NewGroup, audit: NewAuditEntry) -> Result<Group> {
        let group = group.clone();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let now = now_rfc3339();
                let row: GroupRow = diesel::insert_into(market_groups::table)
                    .values(&NewGroupRow {
                        name: &group.name,
                        description: &group.description,
                        category: &group.category,
                        privacy: group.privacy.as_str(),
                        owner_id: owner.value(),
                        created_at: now.clone(),
                        updated_at: now,
                    })
                    .returning(GroupRow::as_returning())
                    .get_result(conn)?;
                audit::append(conn, audit)?;
                debug!(group_id = row.id, owner = %owner, "Inserted group");
                Group::try_from(row)
            })
        })
        .await
    }

    async fn group(&self, id: GroupId) -> Result<Option<Group>> {
        with_conn(&self.pool, move |conn| load_group(conn, id.value())).await
    }

    async fn roster(&self, id: GroupId) -> Result<Roster> {
        with_conn(&self.pool, move |conn| load_roster(conn, id.value())).await
    }

    async fn group_detail(&self, id: GroupId) -> Result<Option<GroupDetail>> {
        with_conn(&self.pool, move |conn| {
            let Some(group) = load_group(conn, id.value())? else {
                return Ok(None);
            };
            let roster = load_roster(conn, id.value())?;
            let owner = member_infos(conn, &BTreeSet::from([group.owner_id]))?
                .into_iter()
                .next()
                .ok_or_else(|| Error::not_found("user", group.owner_id))?;
            let admins = member_infos(conn, &roster.admins)?;
            let members = member_infos(conn, &roster.members)?;
            let linked = load_group_markets(conn, id.value())?;

            Ok(Some(GroupDetail {
                group,
                owner,
                admins,
                members,
                markets: linked,
                roster,
            }))
        })
        .await
    }

    async fn groups_visible_to(&self, viewer: Option<UserId>) -> Result<Vec<Group>> {
        with_conn(&self.pool, move |conn| {
            let public = market_groups::privacy.eq(Privacy::Public.as_str());
            let rows: Vec<GroupRow> = match viewer {
                None => market_groups::table
                    .filter(public)
                    .select(GroupRow::as_select())
                    .order((market_groups::created_at.desc(), market_groups::id.desc()))
                    .load(conn)?,
                Some(user) => {
                    let ids = memberships_of(conn, user.value())?;
                    market_groups::table
                        .filter(public.or(market_groups::id.eq_any(ids)))
                        .select(GroupRow::as_select())
                        .order((market_groups::created_at.desc(), market_groups::id.desc()))
                        .load(conn)?
                }
            };
            rows.into_iter().map(Group::try_from).collect()
        })
        .await
    }

    async fn access_request(&self, id: AccessRequestId) -> Result<Option<AccessRequest>> {
        with_conn(&self.pool, move |conn| load_request(conn, id.value())).await
    }

    async fn access_request_for(&self, group: GroupId, user: UserId) -> Result<Option<AccessRequest>> {
        with_conn(&self.pool, move |conn| {
            let id: Option<i32> = group_access_requests::table
                .filter(group_access_requests::group_id.eq(group.value()))
                .filter(group_access_requests::user_id.eq(user.value()))
                .select(group_access_requests::id)
                .first(conn)
                .optional()?;
            match id {
                Some(id) => load_request(conn, id),
                None => Ok(None),
            }
        })
        .await
    }

    async fn create_access_request(
        &self,
        group: GroupId,
        user: UserId,
        message: &str,
        audit: NewAuditEntry,
    ) -> Result<AccessRequest> {
        let message = message.to_string();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let inserted = diesel::insert_into(group_access_requests::table)
                    .values(&NewAccessRequestRow {
                        group_id: group.value(),
                        user_id: user.value(),
                        status: AccessRequestStatus::Pending.as_str(),
                        message: &message,
                        requested_at: now_rfc3339(),
                    })
                    .returning(group_access_requests::id)
                    .get_result::<i32>(conn);
                let id = match inserted {
                    Ok(id) => id,
                    Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                        return Err(StateError::DuplicateRequest.into())
                    }
                    Err(e) => return Err(e.into()),
                };
                audit::append(conn, audit)?;
                load_request(conn, id)?.ok_or_else(|| Error::not_found("access request", id))
            })
        })
        .await
    }

    async fn decide_access_request(
        &self,
        id: AccessRequestId,
        decision: AccessDecision,
        responder: UserId,
        audit: NewAuditEntry,
    ) -> Result<AccessRequest> {
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let updated = diesel::update(
                    group_access_requests::table
                        .filter(group_access_requests::id.eq(id.value()))
                        .filter(
                            group_access_requests::status
                                .eq(AccessRequestStatus::Pending.as_str()),
                        ),
                )
                .set((
                    group_access_requests::status.eq(decision.target_status().as_str()),
                    group_access_requests::responded_at.eq(Some(now_rfc3339())),
                    group_access_requests::responded_by.eq(Some(responder.value())),
                ))
                .execute(conn)?;

                let request = load_request(conn, id.value())?
                    .ok_or_else(|| Error::not_found("access request", id))?;
                if updated == 0 {
                    return Err(StateError::InvalidState(format!(
                        "access request {id} is already {}",
                        request.status
                    ))
                    .into());
                }

                if decision == AccessDecision::Approve {
                    diesel::insert_or_ignore_into(group_members::table)
                        .values((
                            group_members::group_id.eq(request.group_id.value()),
                            group_members::user_id.eq(request.user_id.value()),
                        ))
                        .execute(conn)?;
                }
                audit::append(conn, audit)?;
                Ok(request)
            })
        })
        .await
    }

    async fn pending_requests(&self, group: GroupId) -> Result<Vec<AccessRequest>> {
        with_conn(&self.pool, move |conn| {
            let rows: Vec<(AccessRequestRow, String)> = group_access_requests::table
                .inner_join(users::table)
                .filter(group_access_requests::group_id.eq(group.value()))
                .filter(group_access_requests::status.eq(AccessRequestStatus::Pending.as_str()))
                .select((AccessRequestRow::as_select(), users::username))
                .order(group_access_requests::requested_at.asc())
                .load(conn)?;
            rows.into_iter()
                .map(|(row, username)| row.into_request(username))
                .collect()
        })
        .await
    }

    async fn link_market(&self, group: GroupId, market: MarketId, audit: NewAuditEntry) -> Result<GroupMarket> {
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let inserted = diesel::insert_into(group_markets::table)
                    .values(&NewGroupMarketRow {
                        group_id: group.value(),
                        market_id: market.value(),
                        created_at: now_rfc3339(),
                    })
                    .returning(GroupMarketRow::as_returning())
                    .get_result(conn);
                let row = match inserted {
                    Ok(row) => row,
                    Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                        return Err(StateError::AlreadyExists(format!(
                            "market {market} in group {group}"
                        ))
                        .into())
                    }
                    Err(e) => return Err(e.into()),
                };
                let (title, status): (String, String) = markets::table
                    .find(market.value())
                    .select((markets::title, markets::status))
                    .first(conn)?;
                audit::append(conn, audit)?;
                to_group_market(row, title, &status)
            })
        })
        .await
    }

    async fn unlink_market(&self, group: GroupId, market: MarketId, audit: NewAuditEntry) -> Result<()> {
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let deleted = diesel::delete(
                    group_markets::table
                        .filter(group_markets::group_id.eq(group.value()))
                        .filter(group_markets::market_id.eq(market.value())),
                )
                .execute(conn)?;
                if deleted == 0 {
                    return Err(Error::not_found(
                        "group market link",
                        format!("market {market} in group {group}"),
                    ));
                }
                audit::append(conn, audit)?;
                Ok(())
            })
        })
        .await
    }

    async fn add_admin(&self, group: GroupId, user: UserId, audit: NewAuditEntry) -> Result<()> {
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                diesel::insert_or_ignore_into(group_admins::table)
                    .values((
                        group_admins::group_id.eq(group.value()),
                        group_admins::user_id.eq(user.value()),
                    ))
                    .execute(conn)?;
                audit::append(conn, audit)?;
                Ok(())
            })
        })
        .await
    }
}

