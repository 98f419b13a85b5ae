#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use shopgram::auth::UserType;
use shopgram::domain::aggregates::{
    Customer, CustomerData, NewPlan, NewProduct, NewShop, Plan, Product, Seller, Shop, ShopCommand,
    SubscriptionCommand,
};
use shopgram::store::{CustomerStore, ProductStore, SellerStore, SubscriptionStore};
use shopgram::{router, AppState};

pub const SECRET: &[u8] = b"integration-secret-0123456789abcdef";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::in_memory(SECRET);
        Self { router: router(state.clone()), state }
    }

    pub fn token(&self, user_id: Uuid, user_type: UserType) -> String {
        self.state.auth.keys().issue(user_id, user_type, Utc::now()).unwrap()
    }

    pub fn admin(&self) -> String { self.token(Uuid::new_v4(), UserType::Admin) }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, body)
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) { self.request(Method::GET, uri, token, None).await }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) { self.request(Method::DELETE, uri, token, None).await }

    pub async fn seed_seller(&self, username: &str) -> (Seller, String) {
        let now = Utc::now();
        let seller = Seller {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: format!("{username}@shops.test"),
            password_hash: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state.stores.sellers.insert_seller(&seller).await.unwrap();
        let token = self.token(seller.id, UserType::Seller);
        (seller, token)
    }

    pub async fn seed_shop(&self, seller_id: Uuid, name: &str) -> Shop {
        let command = ShopCommand::Create(NewShop { shop_name: name.to_string(), is_default: false });
        self.state.stores.sellers.apply_shop_command(seller_id, command, Utc::now()).await.unwrap().value
    }

    pub async fn seed_plan(&self, max_products: i32) -> Plan {
        let plan = Plan::create(&NewPlan { name: format!("Plan {max_products}"), price: Decimal::new(990, 1), max_products }, Utc::now()).unwrap();
        self.state.stores.subscriptions.insert_plan(&plan).await.unwrap();
        plan
    }

    pub async fn subscribe(&self, seller_id: Uuid, plan: &Plan) {
        let command = SubscriptionCommand::Assign { plan: plan.clone(), months: 1, is_active: true, start_date: None };
        self.state.stores.subscriptions.apply_subscription_command(seller_id, command, Utc::now()).await.unwrap();
    }

    pub async fn seed_product(&self, seller_id: Uuid, shop_id: Uuid, price: i64, inventory: i32) -> Product {
        let new = NewProduct { shop_id, title: format!("Item {price}"), description: None, price: Decimal::new(price, 0), inventory, images: vec![] };
        let product = Product::create(seller_id, &new, Utc::now()).unwrap();
        self.state.stores.products.insert_product(&product).await.unwrap();
        product
    }

    /// Seller with one shop and one product.
    pub async fn storefront(&self, price: i64, inventory: i32) -> (Seller, String, Product) {
        let (seller, token) = self.seed_seller(&format!("seller{}", &Uuid::new_v4().simple().to_string()[..8])).await;
        let shop = self.seed_shop(seller.id, "Main").await;
        let product = self.seed_product(seller.id, shop.id, price, inventory).await;
        (seller, token, product)
    }

    pub async fn seed_customer(&self, email: &str, mobile: &str) -> (Customer, String) {
        let data = CustomerData { full_name: Some("Test Customer".into()), email: Some(email.into()), mobile: Some(mobile.into()) };
        let customer = Customer::from_guest(Some(&data), Utc::now()).unwrap();
        self.state.stores.customers.insert_customer(&customer).await.unwrap();
        let token = self.token(customer.id, UserType::Customer);
        (customer, token)
    }

    pub async fn inventory(&self, product_id: Uuid) -> i32 {
        self.state.stores.products.product(product_id).await.unwrap().unwrap().inventory
    }
}
