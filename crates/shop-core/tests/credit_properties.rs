// crates/shop-core/tests/credit_properties.rs

//! Property tests: random sequences of marketplace actions keep the
//! credit and ownership bookkeeping consistent.

use std::collections::HashSet;

use proptest::prelude::*;
use shop_core::{BonusRange, ConnectionState, Ledger, Marketplace, Request, ShopItem, Store};

const USERS: [&str; 3] = ["alice", "bob", "carol"];
const ITEMS: [(&str, u64); 4] = [("sword", 20), ("shield", 15), ("bow", 35), ("crown", 90)];
const BONUS: u64 = 25;

#[derive(Debug, Clone)]
enum Action {
    Login(usize),
    Logout(usize),
    Buy(usize, usize),
    Sell(usize, usize),
    Balance(usize),
}

fn action() -> impl Strategy<Value = Action> {
    let user = 0..USERS.len();
    let item = 0..ITEMS.len();
    prop_oneof![
        user.clone().prop_map(Action::Login),
        user.clone().prop_map(Action::Logout),
        (user.clone(), item.clone()).prop_map(|(u, i)| Action::Buy(u, i)),
        (user.clone(), item).prop_map(|(u, i)| Action::Sell(u, i)),
        user.prop_map(Action::Balance),
    ]
}

fn marketplace() -> Marketplace {
    let store = Store::in_memory();
    store.seed_items(ITEMS.iter().map(|(name, price)| ShopItem::new(*name, *price)));
    let bonus = BonusRange {
        min: BONUS,
        max: BONUS + 1,
        step: 1,
    };
    Marketplace::with_all_commands(store, Ledger::new(bonus).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    #[test]
    fn credits_match_bonuses_minus_holdings(actions in prop::collection::vec(action(), 1..120)) {
        let market = marketplace();
        let mut states = [ConnectionState::Unauthenticated; USERS.len()];
        let mut logins = [0u64; USERS.len()];

        for action in actions {
            let (u, request) = match action {
                Action::Login(u) => (u, Request::new("LOGIN").with_param(USERS[u])),
                Action::Logout(u) => (u, Request::new("LOGOUT")),
                Action::Buy(u, i) => (u, Request::new("BUY").with_param(ITEMS[i].0)),
                Action::Sell(u, i) => (u, Request::new("SELL").with_param(ITEMS[i].0)),
                Action::Balance(u) => (u, Request::new("BALANCE")),
            };

            let was_signed_in = matches!(states[u], ConnectionState::Authenticated(_));
            let (response, next) = market.dispatch(states[u], &request);

            if matches!(action, Action::Login(_)) && response.is_ok() {
                prop_assert!(!was_signed_in);
                logins[u] += 1;
            }

            // A closed connection is replaced by a fresh one.
            states[u] = if next.is_terminated() { ConnectionState::Unauthenticated } else { next };
        }

        let store = market.store();
        for (u, name) in USERS.iter().enumerate() {
            let Some(user) = store.users.find(|row| row.name == *name) else {
                prop_assert_eq!(logins[u], 0);
                continue;
            };

            let owned = store.user_goods.search(|o| o.user_id == user.id);
            let distinct: HashSet<_> = owned.iter().map(|o| o.item_id).collect();
            prop_assert_eq!(distinct.len(), owned.len(), "duplicate ownership rows");

            let held: u64 = owned
                .iter()
                .map(|o| store.shop_items.get(o.item_id).unwrap().price)
                .sum();
            prop_assert_eq!(user.credits + held, BONUS * logins[u]);
        }
    }
}
