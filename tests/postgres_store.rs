//! PostgreSQL backend checks. They need a reachable server:
//! `DATABASE_URL=postgres://... cargo test --test postgres_store -- --ignored`

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use shopgram::domain::aggregates::{
    AddressCommand, AddressPatch, Checkout, CheckoutLine, Customer, CustomerData, CustomerResolution, NewAddress, NewPlan,
    NewProduct, NewShop, Order, Plan, Product, Seller, ShopCommand, SubscriptionCommand,
};
use shopgram::domain::value_objects::{Email, Mobile, OrderNumber, Quantity};
use shopgram::store::{CustomerStore, OrderStore, ProductStore, SellerStore, StoreError, Stores, SubscriptionStore};

async fn seller(stores: &Stores) -> Seller {
    let now = Utc::now();
    let seller = Seller {
        id: Uuid::now_v7(),
        username: format!("seller{}", &Uuid::new_v4().simple().to_string()[..8]),
        email: format!("{}@shops.test", Uuid::new_v4().simple()),
        password_hash: String::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    stores.sellers.insert_seller(&seller).await.unwrap();
    seller
}

async fn product(stores: &Stores, seller: &Seller, inventory: i32) -> Product {
    let command = ShopCommand::Create(NewShop { shop_name: "Main".into(), is_default: false });
    let shop = stores.sellers.apply_shop_command(seller.id, command, Utc::now()).await.unwrap().value;
    let new = NewProduct { shop_id: shop.id, title: "Rose Oil".into(), description: None, price: Decimal::new(1999, 2), inventory, images: vec![] };
    let product = Product::create(seller.id, &new, Utc::now()).unwrap();
    stores.products.insert_product(&product).await.unwrap();
    product
}

fn guest(email: &str, mobile: &str) -> Customer {
    let data = CustomerData { full_name: Some("Sara Ahmadi".into()), email: Some(email.into()), mobile: Some(mobile.into()) };
    Customer::from_guest(Some(&data), Utc::now()).unwrap()
}

fn order_for(customer: &Customer, product: &Product, quantity: u32) -> Order {
    let checkout = Checkout {
        customer_id: customer.id,
        seller_id: product.seller_id,
        lines: vec![CheckoutLine { product_id: product.id, quoted_price: product.price, quantity: Quantity::new(quantity).unwrap() }],
        claimed_total: None,
        payment_method: None,
        shipping_address: json!({ "city": "Tehran" }),
    };
    let catalog = HashMap::from([(product.id, product.clone())]);
    Order::place(OrderNumber::generate(Utc::now()), checkout, &catalog, Utc::now()).unwrap()
}

fn new_address(is_default: bool) -> AddressCommand {
    AddressCommand::Create(NewAddress {
        full_name: "Sara Ahmadi".into(),
        mobile: "09121234567".into(),
        address: "12 Vali Asr St".into(),
        city: "Tehran".into(),
        province: "Tehran".into(),
        postal_code: "1234567890".into(),
        is_default,
    })
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_order_placement_decrements_inventory(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let seller = seller(&stores).await;
    let product = product(&stores, &seller, 5).await;
    let customer = guest("sara@example.com", "09121234567");
    let order = order_for(&customer, &product, 2);

    stores.orders.place_order(&CustomerResolution::New(customer.clone()), &order).await.unwrap();

    assert_eq!(stores.products.product(product.id).await.unwrap().unwrap().inventory, 3);
    let stored = stores.orders.order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.total, Decimal::new(3998, 2));
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stores.customers.customer(customer.id).await.unwrap().unwrap().email.as_deref(), Some("sara@example.com"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_stale_inventory_rolls_back_the_whole_order(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let seller = seller(&stores).await;
    let product = product(&stores, &seller, 5).await;
    let customer = guest("sara@example.com", "09121234567");
    let order = order_for(&customer, &product, 4);

    // Stock sold elsewhere after the order was priced.
    let mut sold = product.clone();
    sold.inventory = 3;
    stores.products.update_product(&sold).await.unwrap();

    let placed = stores.orders.place_order(&CustomerResolution::New(customer.clone()), &order).await;
    assert!(matches!(placed, Err(StoreError::InsufficientInventory(id)) if id == product.id));
    assert_eq!(stores.products.product(product.id).await.unwrap().unwrap().inventory, 3);
    assert!(stores.orders.order(order.id).await.unwrap().is_none());
    assert!(stores.customers.customer(customer.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_duplicate_contact_maps_to_readable_message(pool: PgPool) {
    let stores = Stores::postgres(pool);
    stores.customers.insert_customer(&guest("sara@example.com", "09121234567")).await.unwrap();

    let duplicate = stores.customers.insert_customer(&guest("sara@example.com", "09129999999")).await;
    assert!(matches!(duplicate, Err(StoreError::Duplicate(ref m)) if m == "A customer with this email already exists"));

    let email = Email::parse("SARA@example.com").unwrap();
    let mobile = Mobile::parse("09121234567").unwrap();
    assert!(stores.customers.customer_by_contact(Some(&email), None).await.unwrap().is_some());
    assert!(stores.customers.customer_by_contact(None, Some(&mobile)).await.unwrap().is_some());
    assert!(stores.customers.customer_by_contact(None, None).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_address_default_moves_within_the_partial_index(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let customer = guest("sara@example.com", "09121234567");
    stores.customers.insert_customer(&customer).await.unwrap();

    let first = stores.customers.apply_address_command(customer.id, new_address(false), Utc::now()).await.unwrap().value;
    assert!(first.is_default);
    let second = stores.customers.apply_address_command(customer.id, new_address(true), Utc::now()).await.unwrap().value;
    assert!(second.is_default);

    let patch = AddressPatch { is_default: Some(true), ..Default::default() };
    stores.customers.apply_address_command(customer.id, AddressCommand::Update { id: first.id, patch }, Utc::now()).await.unwrap();
    stores.customers.apply_address_command(customer.id, AddressCommand::Delete { id: first.id }, Utc::now()).await.unwrap();

    let live = stores.customers.addresses(customer.id).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, second.id);
    assert!(live[0].is_default);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_concurrent_first_addresses_leave_one_default(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let customer = guest("sara@example.com", "09121234567");
    stores.customers.insert_customer(&customer).await.unwrap();
    let customer_id = customer.id;

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let stores = stores.clone();
            tokio::spawn(async move { stores.customers.apply_address_command(customer_id, new_address(false), Utc::now()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let live = stores.customers.addresses(customer.id).await.unwrap();
    assert_eq!(live.len(), 6);
    assert_eq!(live.iter().filter(|a| a.is_default).count(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_single_default_shop_and_active_subscription(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let seller = seller(&stores).await;

    let create = |name: &str| ShopCommand::Create(NewShop { shop_name: name.into(), is_default: false });
    let main = stores.sellers.apply_shop_command(seller.id, create("Main"), Utc::now()).await.unwrap().value;
    let outlet = stores.sellers.apply_shop_command(seller.id, create("Outlet"), Utc::now()).await.unwrap().value;
    stores.sellers.apply_shop_command(seller.id, ShopCommand::MakeDefault { id: outlet.id }, Utc::now()).await.unwrap();
    let shops = stores.sellers.shops(seller.id).await.unwrap();
    assert_eq!(shops.iter().filter(|s| s.is_default).map(|s| s.id).collect::<Vec<_>>(), vec![outlet.id]);
    assert!(shops.iter().any(|s| s.id == main.id && !s.is_default));

    let plan = Plan::create(&NewPlan { name: "Gold".into(), price: Decimal::new(990, 1), max_products: 5 }, Utc::now()).unwrap();
    stores.subscriptions.insert_plan(&plan).await.unwrap();
    for months in [1, 3] {
        let command = SubscriptionCommand::Assign { plan: plan.clone(), months, is_active: true, start_date: None };
        stores.subscriptions.apply_subscription_command(seller.id, command, Utc::now()).await.unwrap();
    }
    let subscriptions = stores.subscriptions.subscriptions(Some(seller.id)).await.unwrap();
    assert_eq!(subscriptions.len(), 2);
    assert_eq!(subscriptions.iter().filter(|s| s.is_active).count(), 1);
}
