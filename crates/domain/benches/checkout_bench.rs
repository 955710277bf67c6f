use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CheckoutLine, CheckoutService};
use store::{
    AccountId, AccountRepository, CatalogRepository, InMemoryStore, Money, NewAccount, ProductDraft,
    ProductId, Role,
};

async fn seeded_store(products: usize) -> (InMemoryStore, AccountId, Vec<ProductId>) {
    let store = InMemoryStore::new();
    let account = store
        .create_account(NewAccount {
            name: "Bench".to_string(),
            surname: None,
            email: "bench@example.com".to_string(),
            phone: None,
            address: None,
            role: Role::Customer,
            secret_hash: "hash".to_string(),
        })
        .await
        .unwrap();

    let mut ids = Vec::with_capacity(products);
    for i in 0..products {
        let product = store
            .create_product(ProductDraft {
                name: format!("Product {i}"),
                category: "bench".to_string(),
                price: Money::from_cents(1000),
                stock: i32::MAX,
                ..Default::default()
            })
            .await
            .unwrap();
        ids.push(product.id);
    }
    (store, account.id, ids)
}

fn bench_single_line_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, account, ids) = rt.block_on(seeded_store(1));
    let service = CheckoutService::new(store);

    c.bench_function("checkout/single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .checkout(account, vec![CheckoutLine::new(ids[0], 1)])
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_ten_line_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, account, ids) = rt.block_on(seeded_store(10));
    let service = CheckoutService::new(store);
    let lines: Vec<_> = ids.iter().map(|&id| CheckoutLine::new(id, 1)).collect();

    c.bench_function("checkout/ten_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.checkout(account, lines.clone()).await.unwrap();
            });
        });
    });
}

fn bench_rejected_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, account, ids) = rt.block_on(seeded_store(2));
    let service = CheckoutService::new(store);
    let lines = vec![
        CheckoutLine::new(ids[0], 1),
        CheckoutLine::new(ProductId::new(i64::MAX), 1),
    ];

    c.bench_function("checkout/rejected_unknown_product", |b| {
        b.iter(|| {
            rt.block_on(async {
                let _ = service.checkout(account, lines.clone()).await;
            });
        });
    });
}

criterion_group!(
    benches,
    bench_single_line_checkout,
    bench_ten_line_checkout,
    bench_rejected_checkout
);
criterion_main!(benches);
