//! In-memory backend used by the test suite and local experiments.
//!
//! One mutex guards every table, so each command is trivially atomic. The
//! lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    Applied, CartStorage, CustomerStore, OrderStore, ProductStore, SellerStore, StoreError, StoreResult, SubscriptionStore,
};
use crate::domain::aggregates::{
    AddressBook, AddressCommand, Cart, Customer, CustomerAddress, CustomerResolution, Order, Plan, Product, Seller, Shop,
    ShopCommand, ShopRoster, Subscription, SubscriptionCommand, SubscriptionLedger,
};
use crate::domain::value_objects::{Email, Mobile};

#[derive(Default)]
struct Tables {
    sellers: Vec<Seller>,
    shops: Vec<Shop>,
    plans: Vec<Plan>,
    subscriptions: Vec<Subscription>,
    products: Vec<Product>,
    customers: Vec<Customer>,
    addresses: Vec<CustomerAddress>,
    orders: Vec<Order>,
    carts: HashMap<String, Cart>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Inserts a product without the shop reference check.
    #[cfg(test)]
    pub(crate) fn seed_product(&self, product: Product) { self.tables.lock().products.push(product); }
}

/// Replaces the row with the same id or appends it.
fn upsert<T: Clone>(rows: &mut Vec<T>, row: &T, id: impl Fn(&T) -> Uuid) {
    let key = id(row);
    match rows.iter_mut().find(|r| id(r) == key) {
        Some(existing) => *existing = row.clone(),
        None => rows.push(row.clone()),
    }
}

fn check_customer_unique(customers: &[Customer], candidate: &Customer) -> StoreResult<()> {
    for other in customers.iter().filter(|c| c.id != candidate.id) {
        if candidate.email.is_some() && other.email == candidate.email {
            return Err(StoreError::Duplicate("A customer with this email already exists".into()));
        }
        if candidate.mobile.is_some() && other.mobile == candidate.mobile {
            return Err(StoreError::Duplicate("A customer with this mobile number already exists".into()));
        }
    }
    Ok(())
}

fn check_seller_unique(sellers: &[Seller], candidate: &Seller) -> StoreResult<()> {
    for other in sellers.iter().filter(|s| s.id != candidate.id) {
        if other.username == candidate.username {
            return Err(StoreError::Duplicate("A seller with this username already exists".into()));
        }
        if other.email == candidate.email {
            return Err(StoreError::Duplicate("A seller with this email already exists".into()));
        }
    }
    Ok(())
}

#[async_trait]
impl SellerStore for MemoryStore {
    async fn insert_seller(&self, seller: &Seller) -> StoreResult<()> {
        let mut t = self.tables.lock();
        check_seller_unique(&t.sellers, seller)?;
        t.sellers.push(seller.clone());
        Ok(())
    }

    async fn update_seller(&self, seller: &Seller) -> StoreResult<()> {
        let mut t = self.tables.lock();
        check_seller_unique(&t.sellers, seller)?;
        let existing = t.sellers.iter_mut().find(|s| s.id == seller.id).ok_or(StoreError::NotFound("Seller"))?;
        *existing = seller.clone();
        Ok(())
    }

    async fn seller(&self, id: Uuid) -> StoreResult<Option<Seller>> {
        Ok(self.tables.lock().sellers.iter().find(|s| s.id == id).cloned())
    }

    async fn seller_by_username(&self, username: &str) -> StoreResult<Option<Seller>> {
        let username = username.trim().to_lowercase();
        Ok(self.tables.lock().sellers.iter().find(|s| s.username == username).cloned())
    }

    async fn sellers(&self) -> StoreResult<Vec<Seller>> {
        let mut sellers = self.tables.lock().sellers.clone();
        sellers.reverse();
        Ok(sellers)
    }

    async fn shops(&self, seller_id: Uuid) -> StoreResult<Vec<Shop>> {
        Ok(self.tables.lock().shops.iter().filter(|s| s.seller_id == seller_id).cloned().collect())
    }

    async fn apply_shop_command(&self, seller_id: Uuid, command: ShopCommand, now: DateTime<Utc>) -> StoreResult<Applied<Shop>> {
        let mut t = self.tables.lock();
        if !t.sellers.iter().any(|s| s.id == seller_id) { return Err(StoreError::NotFound("Seller")); }
        let current = t.shops.iter().filter(|s| s.seller_id == seller_id).cloned().collect();
        let mut roster = ShopRoster::load(seller_id, current);
        let shop = roster.apply(command, now)?;
        for row in roster.changes() { upsert(&mut t.shops, &row, |s| s.id); }
        Ok(Applied::new(shop, roster.take_events()))
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn insert_plan(&self, plan: &Plan) -> StoreResult<()> {
        self.tables.lock().plans.push(plan.clone());
        Ok(())
    }

    async fn plan(&self, id: Uuid) -> StoreResult<Option<Plan>> {
        Ok(self.tables.lock().plans.iter().find(|p| p.id == id).cloned())
    }

    async fn plans(&self) -> StoreResult<Vec<Plan>> {
        let mut plans = self.tables.lock().plans.clone();
        plans.sort_by(|a, b| a.price.cmp(&b.price));
        Ok(plans)
    }

    async fn subscription(&self, id: Uuid) -> StoreResult<Option<Subscription>> {
        Ok(self.tables.lock().subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn subscriptions(&self, seller_id: Option<Uuid>) -> StoreResult<Vec<Subscription>> {
        let t = self.tables.lock();
        Ok(t.subscriptions.iter().rev().filter(|s| seller_id.map_or(true, |id| s.seller_id == id)).cloned().collect())
    }

    async fn apply_subscription_command(&self, seller_id: Uuid, command: SubscriptionCommand, now: DateTime<Utc>) -> StoreResult<Applied<Subscription>> {
        let mut t = self.tables.lock();
        if !t.sellers.iter().any(|s| s.id == seller_id) { return Err(StoreError::NotFound("Seller")); }
        let current = t.subscriptions.iter().filter(|s| s.seller_id == seller_id).cloned().collect();
        let mut ledger = SubscriptionLedger::load(seller_id, current);
        let subscription = ledger.apply(command, now)?;
        if let Some(missing) = ledger.changes().iter().find(|s| !t.plans.iter().any(|p| p.id == s.plan_id)) {
            return Err(StoreError::MissingReference(format!("Plan {} does not exist", missing.plan_id)));
        }
        let removed: Vec<Uuid> = ledger.removed().iter().map(|s| s.id).collect();
        t.subscriptions.retain(|s| !removed.contains(&s.id));
        for row in ledger.changes() { upsert(&mut t.subscriptions, &row, |s| s.id); }
        Ok(Applied::new(subscription, ledger.take_events()))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.tables.lock();
        if !t.shops.iter().any(|s| s.id == product.shop_id) {
            return Err(StoreError::MissingReference("Referenced shop does not exist".into()));
        }
        t.products.push(product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.tables.lock();
        let existing = t.products.iter_mut().find(|p| p.id == product.id).ok_or(StoreError::NotFound("Product"))?;
        *existing = product.clone();
        Ok(())
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.tables.lock().products.iter().find(|p| p.id == id).cloned())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        Ok(self.tables.lock().products.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn seller_products(&self, seller_id: Uuid) -> StoreResult<Vec<Product>> {
        Ok(self.tables.lock().products.iter().rev().filter(|p| p.seller_id == seller_id).cloned().collect())
    }

    async fn count_active_products(&self, seller_id: Uuid) -> StoreResult<i64> {
        Ok(self.tables.lock().products.iter().filter(|p| p.seller_id == seller_id && p.is_active).count() as i64)
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        let mut t = self.tables.lock();
        check_customer_unique(&t.customers, customer)?;
        t.customers.push(customer.clone());
        Ok(())
    }

    async fn customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        Ok(self.tables.lock().customers.iter().find(|c| c.id == id).cloned())
    }

    async fn customer_by_contact(&self, email: Option<&Email>, mobile: Option<&Mobile>) -> StoreResult<Option<Customer>> {
        let t = self.tables.lock();
        let by_email = t.customers.iter().find(|c| c.matches_contact(email, None));
        Ok(by_email.or_else(|| t.customers.iter().find(|c| c.matches_contact(None, mobile))).cloned())
    }

    async fn addresses(&self, customer_id: Uuid) -> StoreResult<Vec<CustomerAddress>> {
        let t = self.tables.lock();
        let mut rows: Vec<CustomerAddress> = t.addresses.iter()
            .filter(|a| a.customer_id == customer_id && a.deleted_at.is_none())
            .cloned()
            .collect();
        rows.sort_by_key(|a| !a.is_default);
        Ok(rows)
    }

    async fn apply_address_command(&self, customer_id: Uuid, command: AddressCommand, now: DateTime<Utc>) -> StoreResult<Applied<CustomerAddress>> {
        let mut t = self.tables.lock();
        if !t.customers.iter().any(|c| c.id == customer_id) { return Err(StoreError::NotFound("Customer")); }
        let current = t.addresses.iter().filter(|a| a.customer_id == customer_id).cloned().collect();
        let mut book = AddressBook::load(customer_id, current);
        let address = book.apply(command, now)?;
        for row in book.changes() { upsert(&mut t.addresses, &row, |a| a.id); }
        Ok(Applied::new(address, book.take_events()))
    }

    async fn anonymize_customers(&self, email: Option<&Email>, mobile: Option<&Mobile>, now: DateTime<Utc>) -> StoreResult<Applied<Vec<Uuid>>> {
        let mut t = self.tables.lock();
        let mut ids = vec![];
        let mut events = vec![];
        for customer in t.customers.iter_mut().filter(|c| c.matches_contact(email, mobile)) {
            events.push(customer.anonymize(now));
            ids.push(customer.id);
        }
        for address in t.addresses.iter_mut().filter(|a| ids.contains(&a.customer_id) && a.deleted_at.is_none()) {
            address.is_default = false;
            address.deleted_at = Some(now);
            address.updated_at = now;
        }
        Ok(Applied::new(ids, events))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, customer: &CustomerResolution, order: &Order) -> StoreResult<()> {
        let mut t = self.tables.lock();
        let c = customer.customer();
        check_customer_unique(&t.customers, c)?;
        if matches!(customer, CustomerResolution::Existing(_)) && !t.customers.iter().any(|x| x.id == c.id) {
            return Err(StoreError::NotFound("Customer"));
        }
        if t.orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(StoreError::Duplicate("Order number collision; please retry".into()));
        }
        for item in &order.items {
            let product = t.products.iter().find(|p| p.id == item.product_id)
                .ok_or_else(|| StoreError::MissingReference(format!("Product {} does not exist", item.product_id)))?;
            if product.inventory < item.quantity { return Err(StoreError::InsufficientInventory(item.product_id)); }
        }

        upsert(&mut t.customers, c, |x| x.id);
        for item in &order.items {
            if let Some(product) = t.products.iter_mut().find(|p| p.id == item.product_id) {
                product.inventory -= item.quantity;
                product.updated_at = order.created_at;
            }
        }
        t.orders.push(order.clone());
        Ok(())
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.tables.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn seller_orders(&self, seller_id: Uuid) -> StoreResult<Vec<Order>> {
        Ok(self.tables.lock().orders.iter().rev().filter(|o| o.seller_id == seller_id).cloned().collect())
    }

    async fn customer_orders(&self, customer_id: Uuid) -> StoreResult<Vec<Order>> {
        Ok(self.tables.lock().orders.iter().rev().filter(|o| o.customer_id == customer_id).cloned().collect())
    }

    async fn update_order_status(&self, order: &Order) -> StoreResult<()> {
        let mut t = self.tables.lock();
        let existing = t.orders.iter_mut().find(|o| o.id == order.id).ok_or(StoreError::NotFound("Order"))?;
        existing.status = order.status;
        existing.payment_status = order.payment_status;
        existing.updated_at = order.updated_at;
        Ok(())
    }
}

#[async_trait]
impl CartStorage for MemoryStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Cart>> {
        Ok(self.tables.lock().carts.get(key).cloned())
    }

    async fn save(&self, key: &str, cart: &Cart) -> StoreResult<()> {
        self.tables.lock().carts.insert(key.to_string(), cart.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.tables.lock().carts.remove(key);
        Ok(())
    }
}
