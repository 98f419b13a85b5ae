use chrono::Utc;
use proptest::prelude::*;
use proptest::test_runner::Config;
use rust_decimal::Decimal;
use shopgram::domain::aggregates::{
    AddressBook, AddressCommand, AddressPatch, CustomerAddress, NewAddress, NewPlan, Plan, Subscription, SubscriptionCommand,
    SubscriptionLedger, SubscriptionPatch,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
enum AddressOp {
    Create { is_default: bool },
    Update { pick: usize, is_default: Option<bool>, blank_city: bool },
    Delete { pick: usize },
    DeleteUnknown,
}

fn address_op() -> impl Strategy<Value = AddressOp> {
    prop_oneof![
        3 => any::<bool>().prop_map(|is_default| AddressOp::Create { is_default }),
        3 => (any::<usize>(), proptest::option::of(any::<bool>()), proptest::bool::weighted(0.1))
            .prop_map(|(pick, is_default, blank_city)| AddressOp::Update { pick, is_default, blank_city }),
        2 => any::<usize>().prop_map(|pick| AddressOp::Delete { pick }),
        1 => Just(AddressOp::DeleteUnknown),
    ]
}

fn pick_id<T>(rows: &[T], pick: usize, id: impl Fn(&T) -> Uuid) -> Uuid {
    if rows.is_empty() { Uuid::new_v4() } else { id(&rows[pick % rows.len()]) }
}

fn address_command(op: &AddressOp, live: &[CustomerAddress]) -> AddressCommand {
    match op {
        AddressOp::Create { is_default } => AddressCommand::Create(NewAddress {
            full_name: "Sara Ahmadi".into(),
            mobile: "09121234567".into(),
            address: "12 Vali Asr St".into(),
            city: "Tehran".into(),
            province: "Tehran".into(),
            postal_code: "1234567890".into(),
            is_default: *is_default,
        }),
        AddressOp::Update { pick, is_default, blank_city } => AddressCommand::Update {
            id: pick_id(live, *pick, |a| a.id),
            patch: AddressPatch {
                city: blank_city.then(|| " ".to_string()),
                is_default: *is_default,
                ..Default::default()
            },
        },
        AddressOp::Delete { pick } => AddressCommand::Delete { id: pick_id(live, *pick, |a| a.id) },
        AddressOp::DeleteUnknown => AddressCommand::Delete { id: Uuid::new_v4() },
    }
}

/// Writes rows one at a time, the way a transaction issues its statements.
fn upsert_each<T: Clone>(stored: &mut Vec<T>, rows: &[T], id: impl Fn(&T) -> Uuid, after_each: impl Fn(&[T])) {
    for row in rows {
        match stored.iter().position(|s| id(s) == id(row)) {
            Some(index) => stored[index] = row.clone(),
            None => stored.push(row.clone()),
        }
        after_each(stored.as_slice());
    }
}

fn live_defaults(rows: &[CustomerAddress]) -> usize {
    rows.iter().filter(|a| a.deleted_at.is_none() && a.is_default).count()
}

#[derive(Debug, Clone)]
enum SubscriptionOp {
    Assign { months: u32, is_active: bool },
    Update { pick: usize, is_active: Option<bool>, extend_months: Option<u32> },
    Remove { pick: usize },
}

fn subscription_op() -> impl Strategy<Value = SubscriptionOp> {
    prop_oneof![
        3 => (1_u32..=36, any::<bool>()).prop_map(|(months, is_active)| SubscriptionOp::Assign { months, is_active }),
        3 => (any::<usize>(), proptest::option::of(any::<bool>()), proptest::option::of(1_u32..=36))
            .prop_map(|(pick, is_active, extend_months)| SubscriptionOp::Update { pick, is_active, extend_months }),
        1 => any::<usize>().prop_map(|pick| SubscriptionOp::Remove { pick }),
    ]
}

fn active_count(rows: &[Subscription]) -> usize {
    rows.iter().filter(|s| s.is_active).count()
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn address_book_keeps_a_single_default(ops in proptest::collection::vec(address_op(), 1..40)) {
        let customer_id = Uuid::new_v4();
        let mut stored: Vec<CustomerAddress> = Vec::new();
        let mut default_cleared = false;

        for op in &ops {
            let live: Vec<CustomerAddress> = stored.iter().filter(|a| a.deleted_at.is_none()).cloned().collect();
            let mut book = AddressBook::load(customer_id, stored.clone());
            if book.apply(address_command(op, &live), Utc::now()).is_err() {
                continue;
            }
            if matches!(op, AddressOp::Update { is_default: Some(false), .. }) {
                default_cleared = true;
            }

            let changes = book.changes();
            let first_raised = changes.iter().position(|a| a.is_default).unwrap_or(changes.len());
            prop_assert!(changes[first_raised..].iter().all(|a| a.is_default), "lowered row written after a raised one");

            upsert_each(&mut stored, &changes, |a| a.id, |rows| assert!(live_defaults(rows) <= 1));
            prop_assert!(live_defaults(&stored) <= 1);
            prop_assert_eq!(book.addresses().iter().filter(|a| a.is_default).count(), live_defaults(&stored));

            let live = stored.iter().filter(|a| a.deleted_at.is_none()).count();
            if live > 0 && !default_cleared {
                prop_assert_eq!(live_defaults(&stored), 1);
            }
        }
    }

    #[test]
    fn subscription_ledger_keeps_a_single_active(ops in proptest::collection::vec(subscription_op(), 1..40)) {
        let seller_id = Uuid::new_v4();
        let plan = Plan::create(&NewPlan { name: "Gold".into(), price: Decimal::new(490_000, 0), max_products: 10 }, Utc::now()).unwrap();
        let mut stored: Vec<Subscription> = Vec::new();

        for op in &ops {
            let command = match op {
                SubscriptionOp::Assign { months, is_active } => SubscriptionCommand::Assign {
                    plan: plan.clone(), months: *months, is_active: *is_active, start_date: None,
                },
                SubscriptionOp::Update { pick, is_active, extend_months } => SubscriptionCommand::Update {
                    id: pick_id(&stored, *pick, |s| s.id),
                    patch: SubscriptionPatch { is_active: *is_active, extend_months: *extend_months, ..Default::default() },
                },
                SubscriptionOp::Remove { pick } => SubscriptionCommand::Remove { id: pick_id(&stored, *pick, |s| s.id) },
            };
            let mut ledger = SubscriptionLedger::load(seller_id, stored.clone());
            let Ok(applied) = ledger.apply(command, Utc::now()) else { continue };

            let changes = ledger.changes();
            let first_raised = changes.iter().position(|s| s.is_active).unwrap_or(changes.len());
            prop_assert!(changes[first_raised..].iter().all(|s| s.is_active), "deactivation written after an activation");

            stored.retain(|s| !ledger.removed().iter().any(|r| r.id == s.id));
            upsert_each(&mut stored, &changes, |s| s.id, |rows| assert!(active_count(rows) <= 1));
            prop_assert!(active_count(&stored) <= 1);

            if matches!(op, SubscriptionOp::Assign { is_active: true, .. } | SubscriptionOp::Update { is_active: Some(true), .. }) {
                prop_assert_eq!(ledger.active().map(|s| s.id), Some(applied.id));
            }
        }
    }
}
