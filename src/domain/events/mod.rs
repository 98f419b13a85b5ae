//! Domain events

use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Order(OrderEvent),
    Subscription(SubscriptionEvent),
    Address(AddressEvent),
    Shop(ShopEvent),
    Customer(CustomerEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, seller_id: Uuid, total: Decimal },
    StatusChanged { order_id: Uuid, status: &'static str },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionEvent {
    Activated { subscription_id: Uuid, seller_id: Uuid, deactivated: usize },
    Deactivated { subscription_id: Uuid, seller_id: Uuid },
    Removed { subscription_id: Uuid, seller_id: Uuid },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AddressEvent {
    DefaultChanged { customer_id: Uuid, address_id: Uuid },
    Removed { customer_id: Uuid, address_id: Uuid, promoted: Option<Uuid> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShopEvent {
    DefaultChanged { seller_id: Uuid, shop_id: Uuid },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CustomerEvent {
    Anonymized { customer_id: Uuid },
}

/// Single publish point for domain events. Nothing consumes them in-process;
/// they are written to the log.
pub fn publish(events: &[DomainEvent]) {
    for event in events {
        match event {
            DomainEvent::Order(OrderEvent::Placed { order_id, order_number, seller_id, total }) =>
                tracing::info!(%order_id, %order_number, %seller_id, %total, "order placed"),
            DomainEvent::Order(OrderEvent::StatusChanged { order_id, status }) =>
                tracing::info!(%order_id, status, "order status changed"),
            DomainEvent::Subscription(SubscriptionEvent::Activated { subscription_id, seller_id, deactivated }) =>
                tracing::info!(%subscription_id, %seller_id, deactivated, "subscription activated"),
            DomainEvent::Subscription(SubscriptionEvent::Deactivated { subscription_id, seller_id }) =>
                tracing::info!(%subscription_id, %seller_id, "subscription deactivated"),
            DomainEvent::Subscription(SubscriptionEvent::Removed { subscription_id, seller_id }) =>
                tracing::info!(%subscription_id, %seller_id, "subscription removed"),
            DomainEvent::Address(AddressEvent::DefaultChanged { customer_id, address_id }) =>
                tracing::info!(%customer_id, %address_id, "default address changed"),
            DomainEvent::Address(AddressEvent::Removed { customer_id, address_id, promoted }) =>
                tracing::info!(%customer_id, %address_id, promoted = ?promoted, "address removed"),
            DomainEvent::Shop(ShopEvent::DefaultChanged { seller_id, shop_id }) =>
                tracing::info!(%seller_id, %shop_id, "default shop changed"),
            DomainEvent::Customer(CustomerEvent::Anonymized { customer_id }) =>
                tracing::info!(%customer_id, "customer anonymized"),
        }
    }
}
