// crates/shop-core/tests/marketplace_scenarios.rs
use std::sync::Arc;
use std::thread;

use shop_core::{
    BonusRange, ConnectionState, InventoryEntry, Ledger, Marketplace, Params, Request, Response,
    ResponseData, ShopItem, Store, UserId,
};

/// Every login grants exactly 40 credits.
fn fixed_bonus() -> BonusRange {
    BonusRange {
        min: 40,
        max: 41,
        step: 1,
    }
}

fn marketplace() -> Marketplace {
    let store = Store::in_memory();
    store.seed_items([
        ShopItem::new("sword", 20),
        ShopItem::new("shield", 15),
        ShopItem::new("crown", 500),
    ]);
    Marketplace::with_all_commands(store, Ledger::new(fixed_bonus()).unwrap())
}

fn login(market: &Marketplace, name: &str) -> (Response, ConnectionState) {
    market.dispatch(
        ConnectionState::Unauthenticated,
        &Request::new("LOGIN").with_param(name),
    )
}

fn signed_in(market: &Marketplace, name: &str) -> (UserId, ConnectionState) {
    let (response, state) = login(market, name);
    assert!(response.is_ok(), "login failed: {:?}", response);
    (state.user_id().unwrap(), state)
}

fn credits(market: &Marketplace, uid: UserId) -> u64 {
    market.store().users.get(uid).unwrap().credits
}

#[test]
fn alice_signs_up_trades_and_logs_out() {
    let market = marketplace();

    let (response, state) = login(&market, "alice");
    assert_eq!(response.text(), Some("Signed up as 'alice'. Welcome!"));
    let uid = response.user_id().expect("signup returns an id");
    assert_eq!(state, ConnectionState::Authenticated(uid));
    assert_eq!(credits(&market, uid), 40);

    let (response, state) = market.dispatch(state, &Request::new("BUY").with_param("sword"));
    assert_eq!(
        response.text(),
        Some("Successfully bought the 'sword'. Credits: 20")
    );

    let (response, state) = market.dispatch(state, &Request::new("SELL").with_param("sword"));
    assert_eq!(
        response.text(),
        Some("Successfully sold the 'sword'. Credits: 40")
    );

    let (response, state) = market.dispatch(state, &Request::new("LOGOUT"));
    assert_eq!(response, Response::Logout);
    assert!(state.is_terminated());
    assert!(!market.is_active(uid));
}

#[test]
fn unauthenticated_balance_is_refused() {
    let market = marketplace();
    let (response, state) = market.dispatch(ConnectionState::Unauthenticated, &Request::new("BALANCE"));
    assert_eq!(
        response,
        Response::Err {
            message: "You must sign in first to do this action!".to_string()
        }
    );
    assert_eq!(state, ConnectionState::Unauthenticated);
}

#[test]
fn client_supplied_user_id_does_not_authenticate() {
    let market = marketplace();
    let (uid, _) = signed_in(&market, "alice");

    let (response, _) = market.dispatch(
        ConnectionState::Unauthenticated,
        &Request::new("BALANCE").with_user(uid),
    );
    assert_eq!(response.text(), Some("You must sign in first to do this action!"));
}

#[test]
fn name_maps_to_one_stable_id() {
    let market = marketplace();
    let (first, state) = signed_in(&market, "bob");

    // Second connection while the first is active.
    let (response, other) = login(&market, "bob");
    assert_eq!(response.text(), Some("You already are logged in!"));
    assert_eq!(other, ConnectionState::Unauthenticated);

    market.dispatch(state, &Request::new("LOGOUT"));

    let (response, state) = login(&market, "bob");
    assert_eq!(response.user_id(), Some(first));
    assert_eq!(state, ConnectionState::Authenticated(first));
    assert_eq!(response.text(), Some("Signed in as 'bob'.\nCredits: 80"));
    assert_eq!(market.store().users.len(), 1);
}

#[test]
fn relogin_returns_inventory_as_data() {
    let market = marketplace();
    let (_, state) = signed_in(&market, "carol");
    market.dispatch(state, &Request::new("BUY").with_param("shield"));
    market.dispatch(state, &Request::new("LOGOUT"));

    let (response, _) = login(&market, "carol");
    assert_eq!(
        response.payload(),
        Some(&ResponseData::Inventory(vec![InventoryEntry {
            item_name: "shield".to_string()
        }]))
    );
}

#[test]
fn login_while_signed_in_is_refused() {
    let market = marketplace();
    let (_, state) = signed_in(&market, "alice");

    let (response, next) = market.dispatch(state, &Request::new("LOGIN").with_param("mallory"));
    assert_eq!(
        response.text(),
        Some("You must log out first before signing in to another account!")
    );
    assert_eq!(next, state);
    assert!(market.store().users.find(|u| u.name == "mallory").is_none());
}

#[test]
fn login_argument_shape_is_checked() {
    let market = marketplace();
    let state = ConnectionState::Unauthenticated;

    let (response, _) = market.dispatch(state, &Request::new("LOGIN"));
    assert_eq!(response.text(), Some("Invalid argument count!"));

    let (response, _) = market.dispatch(state, &Request::new("LOGIN").with_params(Params::Invalid));
    assert_eq!(response.text(), Some("Invalid argument!"));

    let (response, _) = market.dispatch(state, &Request::new("LOGIN").with_param("   "));
    assert_eq!(response.text(), Some("Invalid argument!"));
    assert!(market.store().users.is_empty());
}

#[test]
fn buying_owned_item_changes_nothing() {
    let market = marketplace();
    let (uid, state) = signed_in(&market, "dave");
    market.dispatch(state, &Request::new("BUY").with_param("sword"));
    let before = credits(&market, uid);

    let (response, _) = market.dispatch(state, &Request::new("BUY").with_param("sword"));
    assert_eq!(response.text(), Some("You already have that item!"));
    assert_eq!(credits(&market, uid), before);
}

#[test]
fn selling_unowned_item_changes_nothing() {
    let market = marketplace();
    let (uid, state) = signed_in(&market, "erin");

    let (response, _) = market.dispatch(state, &Request::new("SELL").with_param("sword"));
    assert_eq!(response.text(), Some("You don't have this item!"));
    assert_eq!(credits(&market, uid), 40);
}

#[test]
fn expensive_item_is_refused() {
    let market = marketplace();
    let (uid, state) = signed_in(&market, "frank");

    let (response, _) = market.dispatch(state, &Request::new("BUY").with_param("crown"));
    assert_eq!(
        response.text(),
        Some("You don't have enough credits to buy this item")
    );
    assert_eq!(credits(&market, uid), 40);
    assert!(market.store().user_goods.is_empty());
}

#[test]
fn unknown_item_is_reported() {
    let market = marketplace();
    let (_, state) = signed_in(&market, "gina");
    let (response, _) = market.dispatch(state, &Request::new("BUY").with_param("bow"));
    assert_eq!(response.text(), Some("Item doesn't exist in the shop!"));
}

#[test]
fn read_only_commands() {
    let market = marketplace();
    let (_, state) = signed_in(&market, "hank");

    let (response, _) = market.dispatch(state, &Request::new("BALANCE"));
    assert_eq!(response.text(), Some("Credits: 40"));

    let (response, _) = market.dispatch(state, &Request::new("INVENTORY"));
    assert_eq!(response.text(), Some("Your inventory is empty."));
    assert!(response.payload().is_none());

    let (response, _) = market.dispatch(state, &Request::new("SHOPLIST"));
    match response.payload() {
        Some(ResponseData::ShopItems(items)) => {
            let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, ["sword", "shield", "crown"]);
        }
        other => panic!("unexpected payload {:?}", other),
    }

    // Zero-arity handlers ignore a stray argument.
    let (response, _) = market.dispatch(state, &Request::new("SHOPLIST").with_param("x"));
    assert!(response.is_ok());
}

#[test]
fn dispatcher_validation_errors() {
    let market = marketplace();
    let (_, state) = signed_in(&market, "ivan");

    let cases = [
        (Request::new("DANCE"), "Invalid command!"),
        (Request::new("buy").with_param("sword"), "Invalid command!"),
        (Request::new("BUY").with_params(Params::Invalid), "Invalid argument!"),
        (Request::new("SHOPLIST").with_params(Params::Invalid), "Invalid argument!"),
        (Request::new("BALANCE").with_params(Params::Invalid), "Invalid argument!"),
        (Request::new("BUY"), "Invalid argument count!"),
        (Request::new("BALANCE").with_param("extra"), "Invalid argument count!"),
        (Request::new("INVENTORY").with_param("extra"), "Invalid argument count!"),
    ];

    for (request, expected) in cases {
        let (response, next) = market.dispatch(state, &request);
        assert_eq!(response.text(), Some(expected), "request {:?}", request);
        assert_eq!(next, state);
    }
}

#[test]
fn whitelist_gates_handlers() {
    let store = Store::in_memory();
    store.seed_items([ShopItem::new("sword", 20)]);
    let market = Marketplace::new(
        store,
        Ledger::new(fixed_bonus()).unwrap(),
        ["BALANCE", "TELEPORT"],
    );
    let (_, state) = signed_in(&market, "judy");

    let (response, _) = market.dispatch(state, &Request::new("BUY").with_param("sword"));
    assert_eq!(response.text(), Some("Invalid command!"));

    let (response, _) = market.dispatch(state, &Request::new("TELEPORT"));
    assert_eq!(
        response.text(),
        Some("Unexpected error: method 'TELEPORT' is not found!!!")
    );

    let (response, _) = market.dispatch(state, &Request::new("BALANCE"));
    assert!(response.is_ok());
}

#[test]
fn logout_without_session_still_terminates() {
    let market = marketplace();
    let (response, state) = market.dispatch(ConnectionState::Unauthenticated, &Request::new("LOGOUT"));
    assert_eq!(response.text(), Some("You must sign in before logging out"));
    assert!(state.is_terminated());
}

#[test]
fn released_session_allows_new_login() {
    let market = marketplace();
    let (uid, _) = signed_in(&market, "kim");

    assert!(market.release(uid));
    assert!(!market.release(uid));

    let (response, _) = login(&market, "kim");
    assert_eq!(response.user_id(), Some(uid));
}

#[test]
fn stale_connection_state_is_treated_as_signed_out() {
    let market = marketplace();
    let (uid, state) = signed_in(&market, "leo");
    market.release(uid);

    let (response, _) = market.dispatch(state, &Request::new("BALANCE"));
    assert_eq!(response.text(), Some("You must sign in first to do this action!"));

    // A stale session may sign in again.
    let (response, next) = market.dispatch(state, &Request::new("LOGIN").with_param("leo"));
    assert!(response.is_ok());
    assert_eq!(next, ConnectionState::Authenticated(uid));
}

#[test]
fn concurrent_buys_debit_once() {
    let market = Arc::new(marketplace());
    let (uid, state) = signed_in(&market, "mona");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let market = Arc::clone(&market);
            thread::spawn(move || {
                let (response, _) = market.dispatch(state, &Request::new("BUY").with_param("sword"));
                response.is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(market.store().user_goods.search(|o| o.user_id == uid).len(), 1);
    assert_eq!(credits(&market, uid), 20);
}

#[test]
fn concurrent_signups_with_one_name_create_one_user() {
    let market = Arc::new(marketplace());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let market = Arc::clone(&market);
            thread::spawn(move || login(&market, "nina").0)
        })
        .collect();

    let responses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let signed_up = responses
        .iter()
        .filter(|r| r.text() == Some("Signed up as 'nina'. Welcome!"))
        .count();

    assert_eq!(signed_up, 1);
    assert_eq!(market.store().users.len(), 1);
    assert_eq!(market.active_sessions(), 1);
}

#[test]
fn mutations_are_saved_to_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    {
        let store = Store::open(&path).unwrap();
        store.seed_items([ShopItem::new("sword", 20)]);
        let market = Marketplace::with_all_commands(store, Ledger::new(fixed_bonus()).unwrap());
        let (_, state) = signed_in(&market, "olga");
        market.dispatch(state, &Request::new("BUY").with_param("sword"));
    }

    let store = Store::open(&path).unwrap();
    let olga = store.users.find(|u| u.name == "olga").unwrap();
    assert_eq!(olga.credits, 20);
    assert_eq!(store.user_goods.len(), 1);
}
