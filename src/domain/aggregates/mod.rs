//! Aggregates module
pub mod exclusive;
pub mod address;
pub mod seller;
pub mod subscription;
pub mod product;
pub mod customer;
pub mod order;
pub mod cart;

pub use address::{AddressBook, AddressCommand, AddressError, AddressPatch, CustomerAddress, NewAddress};
pub use seller::{NewSeller, NewShop, Seller, SellerError, SellerPatch, Shop, ShopCommand, ShopError, ShopPatch, ShopRoster};
pub use subscription::{AssignSubscription, NewPlan, Plan, Subscription, SubscriptionCommand, SubscriptionError, SubscriptionLedger, SubscriptionPatch};
pub use product::{NewProduct, Product, ProductError, ProductImage, ProductPatch};
pub use customer::{Customer, CustomerData, CustomerError, CustomerResolution};
pub use order::{CartLineInput, Checkout, CheckoutLine, Order, OrderError, OrderItem, OrderStatus, PaymentStatus};
pub use cart::{Cart, CartError, CartItem, MAX_LINE_QUANTITY};
