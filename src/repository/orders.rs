//! Order repository.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::diesel_models::{NewOrderRecord, OrderRecord};
use super::pool::{DbError, DbPool};
use super::util::parse_datetime;
use crate::faults::Fault;
use crate::models::{NewOrder, Order, OrderStatus, PaymentPlatform};
use crate::schema::orders;
use crate::with_conn;

/// Durable store for submitted orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &NewOrder) -> Result<(), Fault>;
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Order {
            id: record.id,
            template_slug: record.template_slug,
            customer_name: record.customer_name,
            email: record.email,
            phone: record.phone,
            amount_cents: record.amount_cents,
            currency: record.currency,
            payment_platform: PaymentPlatform::from_str(&record.payment_platform)
                .unwrap_or(PaymentPlatform::Cash),
            account_name: record.account_name,
            account_number: record.account_number,
            transaction_ref: record.transaction_ref,
            notes: record.notes,
            status: OrderStatus::from_str(&record.status).unwrap_or(OrderStatus::Pending),
            client_ip: record.client_ip,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

/// Diesel-backed order repository.
#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new order with status `pending`.
    pub async fn insert(&self, order: &NewOrder) -> Result<(), DbError> {
        let created_at = order.created_at.to_rfc3339();

        with_conn!(self.pool, conn => {
            diesel::insert_into(orders::table)
                .values(NewOrderRecord {
                    id: &order.id,
                    template_slug: &order.template_slug,
                    customer_name: &order.customer_name,
                    email: &order.email,
                    phone: &order.phone,
                    amount_cents: order.amount_cents,
                    currency: &order.currency,
                    payment_platform: order.payment_platform.as_str(),
                    account_name: order.account_name.as_deref(),
                    account_number: order.account_number.as_deref(),
                    transaction_ref: order.transaction_ref.as_deref(),
                    notes: order.notes.as_deref(),
                    status: OrderStatus::Pending.as_str(),
                    client_ip: &order.client_ip,
                    created_at: &created_at,
                })
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Most recent orders first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>, DbError> {
        with_conn!(self.pool, conn => {
            orders::table
                .order(orders::created_at.desc())
                .limit(limit)
                .select(OrderRecord::as_select())
                .load::<OrderRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Order::from).collect())
        })
    }

    /// Count orders, optionally only those with the given status.
    pub async fn count(&self, status: Option<OrderStatus>) -> Result<i64, DbError> {
        use diesel::dsl::count_star;

        with_conn!(self.pool, conn => {
            let mut query = orders::table.select(count_star()).into_boxed();
            if let Some(status) = status {
                query = query.filter(orders::status.eq(status.as_str()));
            }
            query.first::<i64>(&mut conn).await
        })
    }
}

#[async_trait]
impl OrderStore for DieselOrderRepository {
    async fn insert_order(&self, order: &NewOrder) -> Result<(), Fault> {
        self.insert(order).await.map_err(Fault::from)
    }
}
