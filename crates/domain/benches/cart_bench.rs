use cart_store::{Category, InMemoryCartRepository, InMemoryProductStore, Product};
use chrono::NaiveDate;
use common::{CustomerId, Money, ProductModel};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::CartService;

type Service = CartService<InMemoryCartRepository, InMemoryProductStore>;

fn catalog(size: usize) -> Vec<Product> {
    (0..size)
        .map(|i| {
            Product::new(
                format!("MODEL-{i:03}"),
                Category::Laptop,
                1_000_000,
                Money::from_cents(10_000 + i as i64),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
        })
        .collect()
}

fn create_service(size: usize) -> Service {
    CartService::new(
        InMemoryCartRepository::new(),
        InMemoryProductStore::with_products(catalog(size)),
    )
}

fn bench_add_to_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = create_service(1);
    let customer = CustomerId::new("bench");
    let model = ProductModel::new("MODEL-000");

    c.bench_function("cart/add_existing_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.add_to_cart(&customer, &model).await.unwrap();
            });
        });
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("cart/fill_and_checkout_10_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = create_service(10);
                let customer = CustomerId::new("bench");
                for i in 0..10 {
                    let model = ProductModel::new(format!("MODEL-{i:03}"));
                    service.add_to_cart(&customer, &model).await.unwrap();
                }
                service.checkout_cart(&customer).await.unwrap();
            });
        });
    });
}

fn bench_get_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = create_service(50);
    let customer = CustomerId::new("bench");
    rt.block_on(async {
        for i in 0..50 {
            let model = ProductModel::new(format!("MODEL-{i:03}"));
            service.add_to_cart(&customer, &model).await.unwrap();
        }
    });

    c.bench_function("cart/get_cart_50_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.get_cart(&customer).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_add_to_cart, bench_checkout, bench_get_cart);
criterion_main!(benches);
