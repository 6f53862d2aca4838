use rand::Rng;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::OrderError;
use crate::models::{CreateOrderRequest, DashboardStats, Order, OrderStatus};

/// Codomain of customer-facing order codes: 5 to 7 decimal digits.
pub const ORDER_CODE_MIN: u32 = 10_000;
pub const ORDER_CODE_MAX: u32 = 10_000_000;

/// Fresh inserts redraw the code on a unique-constraint collision instead of
/// probing for existence first, so two concurrent creates can never commit
/// the same code.
const MAX_CODE_ATTEMPTS: u32 = 8;

/// Order-level cosmetics heuristic, matched case-insensitively against cart
/// item names with Postgres `~*`. Deliberately independent of the category
/// join used for revenue attribution.
pub const COSMETICS_NAME_PATTERN: &str = "cosmetic|beauty|serum|lip";

pub fn generate_order_code() -> String {
    rand::thread_rng()
        .gen_range(ORDER_CODE_MIN..ORDER_CODE_MAX)
        .to_string()
}

#[derive(Clone)]
pub struct OrderRepo {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RevenueSplit {
    total_revenue: f64,
    cosmetics_revenue: f64,
    fashion_revenue: f64,
}

impl OrderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: &CreateOrderRequest) -> Result<Order, OrderError> {
        if req.cart_items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let computed_total = req.computed_total();
        let customer = &req.customer_details;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let result = sqlx::query_as::<_, Order>(
                r#"
                INSERT INTO orders (
                    id, order_code,
                    first_name, last_name, email, phone, address, city, note,
                    cart_items, shipping_charge, total, computed_total,
                    payment_method, payment_details, status
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(generate_order_code())
            .bind(&customer.first_name)
            .bind(&customer.last_name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.address)
            .bind(&customer.city)
            .bind(&customer.note)
            .bind(Json(&req.cart_items))
            .bind(req.shipping_charge.unwrap_or(0.0))
            .bind(req.total)
            .bind(computed_total)
            .bind(&req.payment_info.payment_method)
            .bind(&req.payment_info.payment_details)
            .bind(OrderStatus::Pending)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(order) => return Ok(order),
                Err(sqlx::Error::Database(db_err))
                    if db_err.is_unique_violation()
                        && db_err.constraint() == Some("orders_order_code_key") =>
                {
                    tracing::debug!("order code collision, redrawing");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(OrderError::CodeExhausted(MAX_CODE_ATTEMPTS))
    }

    pub async fn list_all(&self) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"SELECT * FROM orders ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(r#"SELECT * FROM orders WHERE id = $1"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(r#"SELECT * FROM orders WHERE order_code = $1"#)
            .bind(code)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"UPDATE orders SET status = $1 WHERE id = $2 RETURNING *"#,
        )
        .bind(status)
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM orders WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// One dashboard snapshot, recomputed on every call.
    ///
    /// Revenue is attributed per cart line through the category join
    /// (item `id` cast against `products.id`, unresolved lines fall back to
    /// `Other`); cosmetics revenue is an exact-equality bucket and fashion is
    /// its complement. The order-level cosmetics/fashion counts use the
    /// separate name-keyword heuristic instead, so the two classifications
    /// can disagree on the same data.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, sqlx::Error> {
        let total_orders: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM orders"#)
            .fetch_one(&self.pool)
            .await?;

        let online_transactions: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM orders WHERE payment_method = 'Online'"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total_products: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM products"#)
            .fetch_one(&self.pool)
            .await?;

        let out_of_stock_count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM products WHERE is_out_of_stock"#)
                .fetch_one(&self.pool)
                .await?;

        // Repeat purchasers counted once, keyed by phone.
        let customer_count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(DISTINCT phone) FROM orders"#)
                .fetch_one(&self.pool)
                .await?;

        let split = sqlx::query_as::<_, RevenueSplit>(
            r#"
            SELECT
                COALESCE(SUM(
                    (item->>'price')::double precision * (item->>'quantity')::double precision
                ), 0) AS total_revenue,
                COALESCE(SUM(CASE
                    WHEN COALESCE(p.category, 'Other') = 'Cosmetics'
                    THEN (item->>'price')::double precision * (item->>'quantity')::double precision
                    ELSE 0
                END), 0) AS cosmetics_revenue,
                COALESCE(SUM(CASE
                    WHEN COALESCE(p.category, 'Other') <> 'Cosmetics'
                    THEN (item->>'price')::double precision * (item->>'quantity')::double precision
                    ELSE 0
                END), 0) AS fashion_revenue
            FROM orders o
            CROSS JOIN LATERAL jsonb_array_elements(o.cart_items) AS item
            LEFT JOIN products p ON p.id::text = item->>'id'
            WHERE o.status <> 'Cancelled'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let cosmetics_orders: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders o
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(o.cart_items) AS item
                WHERE item->>'name' ~* $1
            )
            "#,
        )
        .bind(COSMETICS_NAME_PATTERN)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_orders,
            online_transactions,
            total_revenue: split.total_revenue,
            total_products,
            out_of_stock_count,
            fashion_revenue: split.fashion_revenue,
            cosmetics_revenue: split.cosmetics_revenue,
            fashion_orders: total_orders - cosmetics_orders,
            cosmetics_orders,
            customer_count,
        })
    }
}

#[derive(Clone)]
pub struct ProductRepo {
    pool: PgPool,
}

impl ProductRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent catalog bootstrap, run once at startup before the server
    /// binds. An already-populated table is left untouched.
    pub async fn seed_if_empty(&self) -> Result<u64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM products"#)
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut seeded = 0u64;
        for (name, category, price) in DEFAULT_CATALOG {
            sqlx::query(
                r#"INSERT INTO products (name, category, price) VALUES ($1, $2, $3)"#,
            )
            .bind(name)
            .bind(category)
            .bind(price)
            .execute(&mut *tx)
            .await?;
            seeded += 1;
        }
        tx.commit().await?;

        tracing::info!(count = seeded, "seeded product catalog");
        Ok(seeded)
    }
}

const DEFAULT_CATALOG: [(&str, &str, f64); 6] = [
    ("Rose Glow Serum", "Cosmetics", 850.0),
    ("Velvet Lip Tint", "Cosmetics", 450.0),
    ("Hydra Beauty Cream", "Cosmetics", 1200.0),
    ("Silk Chiffon Scarf", "Fashion", 650.0),
    ("Embroidered Kurti", "Fashion", 1800.0),
    ("Classic Denim Jacket", "Fashion", 2400.0),
];
