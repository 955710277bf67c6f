use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Account, AccountChanges, AccountCredentials, AccountId, AccountRepository, CatalogRepository,
    Database, Money, NewAccount, NewOrder, Order, OrderId, OrderRepository, OrderStatus, Product,
    ProductDraft, ProductId, Result, Role, StatusStatistics, StoreError,
};

const PRODUCT_COLUMNS: &str = "id, name, description, category, subcategory, \
     ROUND(price * 100)::BIGINT AS price_cents, stock";

const ACCOUNT_COLUMNS: &str =
    "id, name, surname, email, phone, address, role, registered_at, secret_hash";

const ORDER_COLUMNS: &str =
    "id, account_id, product_id, product_name, product_category, quantity, status, created_at";

/// PostgreSQL-backed storefront store.
#[derive(Clone)]
pub struct PostgresStore {
    db: Database,
}

impl PostgresStore {
    /// Creates a store over an opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            subcategory: row.try_get("subcategory")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_credentials(row: PgRow) -> Result<AccountCredentials> {
        let role: String = row.try_get("role")?;
        Ok(AccountCredentials {
            account: Account {
                id: AccountId::new(row.try_get("id")?),
                name: row.try_get("name")?,
                surname: row.try_get("surname")?,
                email: row.try_get("email")?,
                phone: row.try_get("phone")?,
                address: row.try_get("address")?,
                role: Role::from_stored(&role),
                registered_at: row.try_get("registered_at")?,
            },
            secret_hash: row.try_get("secret_hash")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            account_id: AccountId::new(row.try_get("account_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            product_category: row.try_get("product_category")?,
            quantity: row.try_get("quantity")?,
            status: parse_status(row.try_get("status")?)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn parse_status(stored: String) -> Result<OrderStatus> {
    stored
        .parse()
        .map_err(|_| StoreError::Backend(format!("unknown order status stored: {stored}")))
}

/// Maps a unique index violation to `UniqueViolation`, keeping other errors.
fn unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::UniqueViolation {
            constraint: db_err.constraint().unwrap_or("unknown").to_string(),
        };
    }
    StoreError::Database(err)
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool())
            .await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = $1 ORDER BY name"
        ))
        .bind(category)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, description, category, subcategory, price, stock)
            VALUES ($1, $2, $3, $4, $5::BIGINT::NUMERIC / 100, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(&draft.subcategory)
        .bind(draft.price.cents())
        .bind(draft.stock)
        .fetch_one(self.pool())
        .await?;
        Self::row_to_product(row)
    }

    #[tracing::instrument(skip(self, draft))]
    async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, category = $4, subcategory = $5,
                price = $6::BIGINT::NUMERIC / 100, stock = $7
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(&draft.subcategory)
        .bind(draft.price.cents())
        .bind(draft.stock)
        .fetch_optional(self.pool())
        .await?;

        row.map(Self::row_to_product)
            .transpose()?
            .ok_or(StoreError::NotFound {
                entity: "product",
                id: id.as_i64(),
            })
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AccountRepository for PostgresStore {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        rows.into_iter()
            .map(|row| Self::row_to_credentials(row).map(|c| c.account))
            .collect()
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool())
            .await?;
        Ok(row
            .map(Self::row_to_credentials)
            .transpose()?
            .map(|c| c.account))
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.get_credentials(email).await?.map(|c| c.account))
    }

    async fn get_credentials(&self, email: &str) -> Result<Option<AccountCredentials>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        row.map(Self::row_to_credentials).transpose()
    }

    #[tracing::instrument(skip(self, account))]
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO accounts (name, surname, email, phone, address, role, secret_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.name)
        .bind(&account.surname)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.address)
        .bind(account.role.as_str())
        .bind(&account.secret_hash)
        .fetch_one(self.pool())
        .await
        .map_err(unique_violation)?;
        Ok(Self::row_to_credentials(row)?.account)
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update_account(&self, id: AccountId, changes: AccountChanges) -> Result<Account> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET name = $2, surname = $3, email = $4, phone = $5, address = $6, role = $7,
                secret_hash = COALESCE($8, secret_hash)
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(&changes.name)
        .bind(&changes.surname)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(changes.role.as_str())
        .bind(&changes.secret_hash)
        .fetch_optional(self.pool())
        .await
        .map_err(unique_violation)?;

        row.map(Self::row_to_credentials)
            .transpose()?
            .map(|c| c.account)
            .ok_or(StoreError::NotFound {
                entity: "account",
                id: id.as_i64(),
            })
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.as_i64())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool())
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn orders_by_account(&self, account_id: AccountId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(account_id.as_i64())
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    #[tracing::instrument(skip(self, orders), fields(lines = orders.len()))]
    async fn create_orders(&self, orders: Vec<NewOrder>) -> Result<Vec<Order>> {
        for order in &orders {
            order.validate()?;
        }
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        self.db
            .bounded(async {
                // Dropping `tx` on any early return rolls the batch back.
                let mut tx = self.db.begin().await?;
                let mut created = Vec::with_capacity(orders.len());

                for order in orders {
                    let decremented = sqlx::query(
                        "UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $1",
                    )
                    .bind(order.quantity)
                    .bind(order.product_id.as_i64())
                    .execute(&mut *tx)
                    .await?;

                    if decremented.rows_affected() == 0 {
                        return Err(StoreError::StockConflict {
                            product_id: order.product_id,
                            requested: order.quantity,
                        });
                    }

                    let row = sqlx::query(
                        r#"
                        INSERT INTO orders (account_id, product_id, product_name, product_category, quantity, status)
                        VALUES ($1, $2, $3, $4, $5, $6)
                        RETURNING id, created_at
                        "#,
                    )
                    .bind(order.account_id.as_i64())
                    .bind(order.product_id.as_i64())
                    .bind(&order.product_name)
                    .bind(&order.product_category)
                    .bind(order.quantity)
                    .bind(order.status.as_str())
                    .fetch_one(&mut *tx)
                    .await?;

                    let id = OrderId::new(row.try_get("id")?);
                    created.push(order.into_order(id, row.try_get("created_at")?));
                }

                tx.commit().await?;
                Ok(created)
            })
            .await
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(Self::row_to_order)
            .transpose()?
            .ok_or(StoreError::NotFound {
                entity: "order",
                id: id.as_i64(),
            })
    }

    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $3 WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(self.pool())
        .await?;

        if let Some(row) = row {
            return Self::row_to_order(row);
        }

        // Nothing matched: either the order is gone or its status moved on.
        match self.get_order(id).await? {
            Some(order) => Err(StoreError::StatusConflict {
                order_id: id,
                current: order.status,
            }),
            None => Err(StoreError::NotFound {
                entity: "order",
                id: id.as_i64(),
            }),
        }
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn order_statistics(&self) -> Result<Vec<StatusStatistics>> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS order_count, COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity
            FROM orders
            GROUP BY status
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        let mut stats = rows
            .into_iter()
            .map(|row| {
                Ok(StatusStatistics {
                    status: parse_status(row.try_get("status")?)?,
                    order_count: row.try_get("order_count")?,
                    total_quantity: row.try_get("total_quantity")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        stats.sort_by_key(|s| OrderStatus::ALL.iter().position(|&st| st == s.status));
        Ok(stats)
    }
}
