//! SQLite ledger: trades, positions and market volume.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use tracing::debug;

use crate::adapter::outbound::sqlite::database::connection::{with_conn, DbPool};
use crate::adapter::outbound::sqlite::database::model::{
    now_rfc3339, parse_column, parse_decimal, NewPositionRow, NewTradeRow, PositionRow, TradeRow,
};
use crate::adapter::outbound::sqlite::database::schema::{markets, outcomes, positions, trades};
use crate::domain::trade::max_money;
use crate::domain::{
    DomainError, Holding, MarketId, MarketStatus, OutcomeId, Position, PositionId, Trade,
    TradeOrder, TradeStatus, UserId,
};
use crate::error::{Error, Result, StateError};
use crate::port::outbound::store::LedgerStore;

/// SQLite-backed ledger store.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: DbPool,
}

impl SqliteLedgerStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn money(value: Decimal) -> String {
    format!("{value:.2}")
}

fn ensure_tradable(conn: &mut SqliteConnection, order: &TradeOrder) -> Result<()> {
    let status: Option<String> = markets::table
        .find(order.market_id.value())
        .select(markets::status)
        .first(conn)
        .optional()?;
    let status: MarketStatus = match status {
        Some(raw) => parse_column("markets.status", &raw)?,
        None => return Err(Error::not_found("market", order.market_id)),
    };
    if status != MarketStatus::Open {
        return Err(StateError::InvalidState(format!(
            "market {} is {status}; trading is closed",
            order.market_id
        ))
        .into());
    }

    let owned: i64 = outcomes::table
        .filter(outcomes::id.eq(order.outcome_id.value()))
        .filter(outcomes::market_id.eq(order.market_id.value()))
        .count()
        .get_result(conn)?;
    if owned == 0 {
        return Err(DomainError::ForeignOutcome {
            market_id: order.market_id.value(),
            outcome_id: order.outcome_id.value(),
        }
        .into());
    }
    Ok(())
}

fn upsert_position(conn: &mut SqliteConnection, user_id: UserId, order: &TradeOrder) -> Result<()> {
    let now = now_rfc3339();
    let existing: Option<PositionRow> = positions::table
        .filter(positions::user_id.eq(user_id.value()))
        .filter(positions::market_id.eq(order.market_id.value()))
        .filter(positions::outcome_id.eq(order.outcome_id.value()))
        .filter(positions::side.eq(order.side.as_str()))
        .select(PositionRow::as_select())
        .first(conn)
        .optional()?;

    match existing {
        Some(row) => {
            let holding = Holding {
                shares: parse_decimal("positions.shares", &row.shares)?,
                avg_price: parse_decimal("positions.avg_price", &row.avg_price)?,
            }
            .add(order.shares, order.price)?;
            diesel::update(positions::table.find(row.id))
                .set((
                    positions::shares.eq(holding.shares.normalize().to_string()),
                    positions::avg_price.eq(holding.avg_price.to_string()),
                    positions::updated_at.eq(&now),
                ))
                .execute(conn)?;
        }
        None => {
            let holding = Holding::default().add(order.shares, order.price)?;
            diesel::insert_into(positions::table)
                .values(&NewPositionRow {
                    user_id: user_id.value(),
                    market_id: order.market_id.value(),
                    outcome_id: order.outcome_id.value(),
                    side: order.side.as_str(),
                    shares: holding.shares.normalize().to_string(),
                    avg_price: holding.avg_price.to_string(),
                    created_at: now.clone(),
                    updated_at: now,
                })
                .execute(conn)?;
        }
    }
    Ok(())
}

fn add_volume(conn: &mut SqliteConnection, market_id: MarketId, amount: Decimal) -> Result<()> {
    let raw: String = markets::table
        .find(market_id.value())
        .select(markets::volume)
        .first(conn)?;
    let volume = parse_decimal("markets.volume", &raw)?
        .checked_add(amount)
        .filter(|volume| *volume < max_money())
        .ok_or(DomainError::TooLarge {
            field: "market volume",
            max: max_money(),
        })?;
    diesel::update(markets::table.find(market_id.value()))
        .set(markets::volume.eq(money(volume)))
        .execute(conn)?;
    Ok(())
}

impl LedgerStore for SqliteLedgerStore {
    async fn record_trade(&self, user_id: UserId, order: &TradeOrder) -> Result<Trade> {
        let order = *order;
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                ensure_tradable(conn, &order)?;

                let total_value = order.total_value()?;
                let row: TradeRow = diesel::insert_into(trades::table)
                    .values(&NewTradeRow {
                        user_id: user_id.value(),
                        market_id: order.market_id.value(),
                        outcome_id: order.outcome_id.value(),
                        side: order.side.as_str(),
                        shares: order.shares.normalize().to_string(),
                        price: order.price.normalize().to_string(),
                        total_value: money(total_value),
                        status: TradeStatus::Completed.as_str(),
                        created_at: now_rfc3339(),
                    })
                    .returning(TradeRow::as_returning())
                    .get_result(conn)?;

                upsert_position(conn, user_id, &order)?;
                add_volume(conn, order.market_id, total_value)?;
                debug!(trade_id = row.id, user_id = %user_id, market_id = %order.market_id, "Recorded trade");

                Trade::try_from(row)
            })
        })
        .await
    }

    async fn positions(&self, user_id: UserId) -> Result<Vec<Position>> {
        with_conn(&self.pool, move |conn| {
            let rows: Vec<PositionRow> = positions::table
                .filter(positions::user_id.eq(user_id.value()))
                .select(PositionRow::as_select())
                .order(positions::id.asc())
                .load(conn)?;

            let market_ids: Vec<i32> = rows.iter().map(|r| r.market_id).collect();
            let outcome_ids: Vec<i32> = rows.iter().map(|r| r.outcome_id).collect();
            let titles: HashMap<i32, String> = markets::table
                .filter(markets::id.eq_any(market_ids))
                .select((markets::id, markets::title))
                .load::<(i32, String)>(conn)?
                .into_iter()
                .collect();
            let labels: HashMap<i32, String> = outcomes::table
                .filter(outcomes::id.eq_any(outcome_ids))
                .select((outcomes::id, outcomes::label))
                .load::<(i32, String)>(conn)?
                .into_iter()
                .collect();

            rows.into_iter()
                .map(|row| {
                    Ok(Position {
                        id: PositionId::new(row.id),
                        user_id: UserId::new(row.user_id),
                        market_id: MarketId::new(row.market_id),
                        market_title: titles.get(&row.market_id).cloned().unwrap_or_default(),
                        outcome_id: OutcomeId::new(row.outcome_id),
                        outcome_label: labels.get(&row.outcome_id).cloned().unwrap_or_default(),
                        side: parse_column("positions.side", &row.side)?,
                        shares: parse_decimal("positions.shares", &row.shares)?,
                        avg_price: parse_decimal("positions.avg_price", &row.avg_price)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn trades(&self, user_id: Option<UserId>) -> Result<Vec<Trade>> {
        with_conn(&self.pool, move |conn| {
            let mut query = trades::table.select(TradeRow::as_select()).into_boxed();
            if let Some(user_id) = user_id {
                query = query.filter(trades::user_id.eq(user_id.value()));
            }
            query
                .order((trades::created_at.desc(), trades::id.desc()))
                .load::<TradeRow>(conn)?
                .into_iter()
                .map(Trade::try_from)
                .collect()
        })
        .await
    }
}
