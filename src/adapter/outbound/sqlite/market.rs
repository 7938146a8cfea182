//! SQLite market store.
//!
//! Terminal transitions are a single `UPDATE ... WHERE status = 'OPEN'` inside
//! an immediate transaction, so two racing resolvers cannot both succeed.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use tracing::debug;

use crate::adapter::outbound::sqlite::audit;
use crate::adapter::outbound::sqlite::database::connection::{with_conn, DbPool};
use crate::adapter::outbound::sqlite::database::model::{
    now_rfc3339, parse_decimal, parse_timestamp, MarketRow, NewMarketRow, NewOutcomeRow,
    OutcomeRow,
};
use crate::adapter::outbound::sqlite::database::schema::{group_markets, market_groups, markets, outcomes};
use crate::domain::{
    GroupId, Market, MarketFilter, MarketId, MarketStatus, NewAuditEntry, NewMarket, Outcome,
    Privacy, UserId,
};
use crate::error::{Error, Result, StateError};
use crate::port::outbound::store::{MarketStore, MarketTransition};

/// SQLite-backed market store.
#[derive(Clone)]
pub struct SqliteMarketStore {
    pool: DbPool,
}

impl SqliteMarketStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn assemble(row: MarketRow, outcome_rows: Vec<OutcomeRow>) -> Result<Market> {
    Ok(Market {
        id: MarketId::new(row.id),
        state: row.state()?,
        category: row.category()?,
        volume: parse_decimal("markets.volume", &row.volume)?,
        end_date: parse_timestamp("markets.end_date", &row.end_date)?,
        created_at: parse_timestamp("markets.created_at", &row.created_at)?,
        created_by: row.created_by.map(UserId::new),
        change_24h: row.change_24h,
        title: row.title,
        description: row.description,
        image_url: row.image_url,
        outcomes: outcome_rows.into_iter().map(Outcome::from).collect(),
    })
}

pub(crate) fn load_market(conn: &mut SqliteConnection, id: i32) -> Result<Option<Market>> {
    let Some(row) = markets::table
        .find(id)
        .select(MarketRow::as_select())
        .first(conn)
        .optional()?
    else {
        return Ok(None);
    };
    let outcome_rows = OutcomeRow::belonging_to(&row)
        .select(OutcomeRow::as_select())
        .order(outcomes::id.asc())
        .load(conn)?;
    assemble(row, outcome_rows).map(Some)
}

fn current_status(conn: &mut SqliteConnection, id: i32) -> Result<Option<String>> {
    Ok(markets::table
        .find(id)
        .select(markets::status)
        .first(conn)
        .optional()?)
}

impl MarketStore for SqliteMarketStore {
    async fn create_market(
        &self,
        created_by: UserId,
        market: &NewMarket,
        audit: NewAuditEntry,
    ) -> Result<Market> {
        let market = market.clone();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let id: i32 = diesel::insert_into(markets::table)
                    .values(&NewMarketRow {
                        title: &market.title,
                        description: &market.description,
                        image_url: market.image_url.as_deref(),
                        category: market.category.as_str(),
                        status: MarketStatus::Open.as_str(),
                        volume: Decimal::ZERO.to_string(),
                        end_date: market.end_date.to_rfc3339(),
                        created_by: Some(created_by.value()),
                        created_at: now_rfc3339(),
                    })
                    .returning(markets::id)
                    .get_result(conn)?;

                let outcome_rows: Vec<NewOutcomeRow<'_>> = market
                    .outcomes
                    .iter()
                    .map(|o| NewOutcomeRow {
                        market_id: id,
                        label: &o.label,
                        probability: o.probability,
                    })
                    .collect();
                diesel::insert_into(outcomes::table)
                    .values(&outcome_rows)
                    .execute(conn)?;

                let audit = NewAuditEntry {
                    target: format!("Market: {id} - {}", market.title),
                    ..audit
                };
                audit::append(conn, audit)?;
                debug!(market_id = id, outcomes = outcome_rows.len(), "Inserted market");

                load_market(conn, id)?.ok_or_else(|| Error::not_found("market", id))
            })
        })
        .await
    }

    async fn market(&self, id: MarketId) -> Result<Option<Market>> {
        with_conn(&self.pool, move |conn| load_market(conn, id.value())).await
    }

    async fn markets(&self, filter: MarketFilter) -> Result<Vec<Market>> {
        with_conn(&self.pool, move |conn| {
            let mut query = markets::table.select(MarketRow::as_select()).into_boxed();
            if let Some(status) = filter.status {
                query = query.filter(markets::status.eq(status.as_str()));
            }
            if let Some(category) = filter.category {
                query = query.filter(markets::category.eq(category.as_str()));
            }
            let rows: Vec<MarketRow> = query
                .order((markets::created_at.desc(), markets::id.desc()))
                .load(conn)?;

            let grouped = OutcomeRow::belonging_to(&rows)
                .select(OutcomeRow::as_select())
                .order(outcomes::id.asc())
                .load(conn)?
                .grouped_by(&rows);

            rows.into_iter()
                .zip(grouped)
                .map(|(row, outcome_rows)| assemble(row, outcome_rows))
                .collect()
        })
        .await
    }

    async fn transition_market(
        &self,
        id: MarketId,
        transition: MarketTransition,
        audit: NewAuditEntry,
    ) -> Result<Market> {
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let open = markets::table
                    .filter(markets::id.eq(id.value()))
                    .filter(markets::status.eq(MarketStatus::Open.as_str()));

                let updated = match transition {
                    MarketTransition::Resolve {
                        winner,
                        resolved_by,
                    } => diesel::update(open)
                        .set((
                            markets::status.eq(MarketStatus::Resolved.as_str()),
                            markets::winner_id.eq(Some(winner.value())),
                            markets::resolved_by.eq(Some(resolved_by.value())),
                        ))
                        .execute(conn)?,
                    MarketTransition::Cancel => diesel::update(open)
                        .set(markets::status.eq(MarketStatus::Cancelled.as_str()))
                        .execute(conn)?,
                };

                if updated == 0 {
                    return match current_status(conn, id.value())? {
                        None => Err(Error::not_found("market", id)),
                        Some(status) => Err(StateError::InvalidState(format!(
                            "market {id} is {status}, not OPEN"
                        ))
                        .into()),
                    };
                }

                audit::append(conn, audit)?;
                load_market(conn, id.value())?.ok_or_else(|| Error::not_found("market", id))
            })
        })
        .await
    }

    async fn invite_groups(&self, market_ids: &[MarketId]) -> Result<HashMap<MarketId, Vec<GroupId>>> {
        let ids: Vec<i32> = market_ids.iter().map(|m| m.value()).collect();
        with_conn(&self.pool, move |conn| {
            let links: Vec<(i32, i32)> = group_markets::table
                .inner_join(market_groups::table)
                .filter(group_markets::market_id.eq_any(ids))
                .filter(market_groups::privacy.eq(Privacy::Invite.as_str()))
                .select((group_markets::market_id, group_markets::group_id))
                .load(conn)?;

            let mut map: HashMap<MarketId, Vec<GroupId>> = HashMap::new();
            for (market_id, group_id) in links {
                map.entry(MarketId::new(market_id))
                    .or_default()
                    .push(GroupId::new(group_id));
            }
            Ok(map)
        })
        .await
    }
}
