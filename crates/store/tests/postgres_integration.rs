//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use store::{
    AccountChanges, AccountRepository, CatalogRepository, Database, Money, NewAccount, NewOrder,
    OrderRepository, OrderStatus, PostgresStore, Product, ProductDraft, ProductId, Role,
    StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, accounts, products RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(Database::new(pool, Duration::from_secs(5)))
}

fn draft(name: &str, price_cents: i64, stock: i32) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        category: "home".to_string(),
        subcategory: None,
        price: Money::from_cents(price_cents),
        stock,
    }
}

fn new_account(email: &str) -> NewAccount {
    NewAccount {
        name: "Ana".to_string(),
        surname: Some("Lopez".to_string()),
        email: email.to_string(),
        phone: None,
        address: None,
        role: Role::Customer,
        secret_hash: "$argon2id$v=19$stub".to_string(),
    }
}

fn line(account: &store::Account, product: &Product, quantity: i32) -> NewOrder {
    NewOrder {
        account_id: account.id,
        product_id: product.id,
        product_name: product.name.clone(),
        product_category: product.category.clone(),
        quantity,
        status: OrderStatus::Pending,
    }
}

#[tokio::test]
async fn products_round_trip_prices_as_cents() {
    let store = get_test_store().await;

    let created = store.create_product(draft("Lamp", 1999, 4)).await.unwrap();
    assert_eq!(created.price, Money::from_cents(1999));

    let fetched = store.get_product(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert!(store.get_product(ProductId::new(999)).await.unwrap().is_none());

    let updated = store
        .update_product(created.id, draft("Lamp XL", 2500, 2))
        .await
        .unwrap();
    assert_eq!(updated.name, "Lamp XL");
    assert_eq!(updated.price.cents(), 2500);

    assert!(store.delete_product(created.id).await.unwrap());
    assert!(!store.delete_product(created.id).await.unwrap());
}

#[tokio::test]
async fn negative_stock_is_rejected_before_the_database() {
    let store = get_test_store().await;
    let result = store.create_product(draft("Broken", 100, -1)).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));
}

#[tokio::test]
async fn duplicate_email_maps_to_unique_violation() {
    let store = get_test_store().await;
    let first = store
        .create_account(new_account("ana@example.com"))
        .await
        .unwrap();

    let duplicate = store.create_account(new_account("ana@example.com")).await;
    assert!(matches!(
        duplicate,
        Err(StoreError::UniqueViolation { ref constraint }) if constraint == "accounts_email_key"
    ));

    let other = store
        .create_account(new_account("bo@example.com"))
        .await
        .unwrap();
    let clash = store
        .update_account(
            other.id,
            AccountChanges {
                name: other.name.clone(),
                surname: None,
                email: first.email.clone(),
                phone: None,
                address: None,
                role: Role::Customer,
                secret_hash: None,
            },
        )
        .await;
    assert!(matches!(clash, Err(StoreError::UniqueViolation { .. })));
}

#[tokio::test]
async fn credentials_include_the_stored_hash() {
    let store = get_test_store().await;
    store
        .create_account(new_account("ana@example.com"))
        .await
        .unwrap();

    let creds = store
        .get_credentials("ana@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(creds.secret_hash, "$argon2id$v=19$stub");
    assert_eq!(creds.account.role, Role::Customer);
}

#[tokio::test]
async fn batch_commits_all_rows_and_decrements_stock() {
    let store = get_test_store().await;
    let account = store.create_account(new_account("a@b.co")).await.unwrap();
    let a = store.create_product(draft("A", 1000, 5)).await.unwrap();
    let b = store.create_product(draft("B", 500, 3)).await.unwrap();

    let created = store
        .create_orders(vec![line(&account, &a, 2), line(&account, &b, 1)])
        .await
        .unwrap();

    assert_eq!(created.len(), 2);
    assert!(created[0].id < created[1].id);
    assert!(created.iter().all(|o| o.status == OrderStatus::Pending));
    assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 3);
    assert_eq!(store.get_product(b.id).await.unwrap().unwrap().stock, 2);

    let mine = store.orders_by_account(account.id).await.unwrap();
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
async fn batch_rolls_back_when_one_line_lacks_stock() {
    let store = get_test_store().await;
    let account = store.create_account(new_account("a@b.co")).await.unwrap();
    let a = store.create_product(draft("A", 1000, 5)).await.unwrap();
    let b = store.create_product(draft("B", 500, 0)).await.unwrap();

    let result = store
        .create_orders(vec![line(&account, &a, 2), line(&account, &b, 1)])
        .await;

    assert!(matches!(
        result,
        Err(StoreError::StockConflict { product_id, requested: 1 }) if product_id == b.id
    ));
    assert!(store.list_orders().await.unwrap().is_empty());
    assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn repeated_lines_decrement_cumulatively() {
    let store = get_test_store().await;
    let account = store.create_account(new_account("a@b.co")).await.unwrap();
    let a = store.create_product(draft("A", 1000, 3)).await.unwrap();

    let result = store
        .create_orders(vec![line(&account, &a, 2), line(&account, &a, 2)])
        .await;

    assert!(matches!(result, Err(StoreError::StockConflict { .. })));
    assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 3);
}

#[tokio::test]
async fn status_transition_is_compare_and_set() {
    let store = get_test_store().await;
    let account = store.create_account(new_account("a@b.co")).await.unwrap();
    let a = store.create_product(draft("A", 1000, 3)).await.unwrap();
    let order = store.create_order(line(&account, &a, 1)).await.unwrap();

    let cancelled = store
        .transition_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let again = store
        .transition_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await;
    assert!(matches!(
        again,
        Err(StoreError::StatusConflict {
            current: OrderStatus::Cancelled,
            ..
        })
    ));
}

#[tokio::test]
async fn statistics_count_and_sum_per_status() {
    let store = get_test_store().await;
    let account = store.create_account(new_account("a@b.co")).await.unwrap();
    let a = store.create_product(draft("A", 1000, 10)).await.unwrap();
    let created = store
        .create_orders(vec![line(&account, &a, 2), line(&account, &a, 4)])
        .await
        .unwrap();
    store
        .update_order_status(created[0].id, OrderStatus::Shipped)
        .await
        .unwrap();

    let stats = store.order_statistics().await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].status, OrderStatus::Pending);
    assert_eq!(stats[0].total_quantity, 4);
    assert_eq!(stats[1].status, OrderStatus::Shipped);
    assert_eq!(stats[1].order_count, 1);
}

#[tokio::test]
async fn deleting_an_account_removes_its_orders() {
    let store = get_test_store().await;
    let account = store.create_account(new_account("a@b.co")).await.unwrap();
    let a = store.create_product(draft("A", 1000, 10)).await.unwrap();
    store.create_order(line(&account, &a, 1)).await.unwrap();

    assert!(store.delete_account(account.id).await.unwrap());
    assert!(store.list_orders().await.unwrap().is_empty());
}
