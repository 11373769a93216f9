//! Session-aware command dispatcher.
//!
//! A [`Marketplace`] owns the store, the ledger and the command whitelist,
//! and is shared by every connection. Each connection keeps its own
//! [`ConnectionState`] and feeds it through [`Marketplace::dispatch`]
//! together with each request; the new state comes back with the reply.
//!
//! Routing order for one request:
//! 1. LOGIN (already signed in → error, otherwise login / signup)
//! 2. LOGOUT
//! 3. authentication
//! 4. whitelist
//! 5. argument shape (`params` must be absent or a string)
//! 6. handler lookup
//! 7. arity
//!
//! Every step runs with the session lock held, so all state-changing
//! sequences are totally ordered across connections.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::error::ShopError;
use crate::inventory::InventoryManager;
use crate::ledger::Ledger;
use crate::messages::{Params, Request, Response, ResponseData};
use crate::model::{User, UserId};
use crate::session::SessionRegistry;
use crate::store::Store;

/// Where a single connection is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unauthenticated,
    Authenticated(UserId),
    /// After LOGOUT. The connection is closed next.
    Terminated,
}

impl ConnectionState {
    pub fn user_id(self) -> Option<UserId> {
        match self {
            ConnectionState::Authenticated(uid) => Some(uid),
            _ => None,
        }
    }

    pub fn is_terminated(self) -> bool {
        self == ConnectionState::Terminated
    }
}

/// Outcome of routing one request.
struct Reply {
    response: Response,
    state: ConnectionState,
    /// Persisted state changed; save the snapshot.
    dirty: bool,
}

impl Reply {
    fn stay(response: Response, state: ConnectionState) -> Self {
        Reply {
            response,
            state,
            dirty: false,
        }
    }
}

pub struct Marketplace {
    store: Store,
    ledger: Ledger,
    commands: HashSet<String>,

    /// Active sessions. Holding this lock is also what serializes every
    /// multi-step read-then-write over the store.
    sessions: Mutex<SessionRegistry>,
}

impl Marketplace {
    /// Build a marketplace accepting the given action names.
    pub fn new<I, S>(store: Store, ledger: Ledger, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands: HashSet<String> = commands.into_iter().map(Into::into).collect();

        for name in &commands {
            if Command::from_action(name).is_none() {
                warn!(action = %name, "whitelisted command has no handler");
            }
        }

        Marketplace {
            store,
            ledger,
            commands,
            sessions: Mutex::new(SessionRegistry::new()),
        }
    }

    /// Whitelist every command there is a handler for.
    pub fn with_all_commands(store: Store, ledger: Ledger) -> Self {
        Self::new(store, ledger, Command::ALL.iter().map(|cmd| cmd.as_str()))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_active(&self, uid: UserId) -> bool {
        self.sessions.lock().contains(uid)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Route one request for a connection in `state`.
    ///
    /// Never fails: every domain error becomes an `ERR` reply and leaves
    /// the state as it was (LOGOUT always terminates).
    pub fn dispatch(&self, state: ConnectionState, request: &Request) -> (Response, ConnectionState) {
        let mut sessions = self.sessions.lock();
        let reply = self.route(&mut sessions, state, request);
        if reply.dirty {
            self.persist();
        }
        (reply.response, reply.state)
    }

    /// Drop `uid` from the active set, e.g. after the peer vanished
    /// without LOGOUT. Returns whether it was active.
    pub fn release(&self, uid: UserId) -> bool {
        let released = self.sessions.lock().remove(uid).is_ok();
        if released {
            info!(%uid, "session released");
        }
        released
    }

    /// Save the store snapshot now.
    pub fn flush(&self) {
        let _sessions = self.sessions.lock();
        self.persist();
    }

    fn persist(&self) {
        if let Err(err) = self.store.save() {
            warn!(error = %err, "failed to save store snapshot");
        }
    }

    fn route(
        &self,
        sessions: &mut SessionRegistry,
        state: ConnectionState,
        request: &Request,
    ) -> Reply {
        if state.is_terminated() {
            return Reply::stay(Response::error(ShopError::AuthRequired), state);
        }

        let command = Command::from_action(&request.action);
        let result = match command {
            Some(Command::Login) => self.login(sessions, state, &request.params),
            Some(Command::Logout) => return self.logout(sessions, state),
            _ => self.serve(sessions, state, command, request),
        };

        result.unwrap_or_else(|err| {
            debug!(action = %request.action, error = %err, "request rejected");
            Reply::stay(Response::error(err), state)
        })
    }

    fn serve(
        &self,
        sessions: &SessionRegistry,
        state: ConnectionState,
        command: Option<Command>,
        request: &Request,
    ) -> Result<Reply, ShopError> {
        let uid = match state {
            ConnectionState::Authenticated(uid) if sessions.is_authenticated(&self.store, uid) => uid,
            _ => return Err(ShopError::AuthRequired),
        };

        if !self.commands.contains(request.action.as_str()) {
            return Err(ShopError::UnknownCommand);
        }

        if request.params == Params::Invalid {
            return Err(ShopError::MalformedArguments);
        }

        let command = command.ok_or_else(|| ShopError::HandlerNotFound(request.action.clone()))?;

        let arg = match (command.arity(), &request.params) {
            (0, _) => None,
            (1, Params::Absent) => None,
            (2, Params::Text(arg)) => Some(arg.as_str()),
            _ => return Err(ShopError::ArityMismatch),
        };

        let response = self.invoke(command, uid, arg)?;
        Ok(Reply {
            response,
            state,
            dirty: command.mutates(),
        })
    }

    fn invoke(&self, command: Command, uid: UserId, arg: Option<&str>) -> Result<Response, ShopError> {
        let inventory = InventoryManager::new(&self.store, &self.ledger);

        match (command, arg) {
            (Command::Balance, _) => Ok(Response::message(self.ledger.balance_message(&self.store, uid)?)),
            (Command::ShopList, _) => Ok(Response::data(ResponseData::ShopItems(inventory.list_shop()))),
            (Command::Inventory, _) => {
                let items = inventory.list_inventory(uid);
                if items.is_empty() {
                    Ok(Response::message("Your inventory is empty."))
                } else {
                    Ok(Response::data(ResponseData::Inventory(items)))
                }
            }
            (Command::Buy, Some(name)) => inventory.buy(uid, name).map(Response::message),
            (Command::Sell, Some(name)) => inventory.sell(uid, name).map(Response::message),
            // LOGIN/LOGOUT are routed earlier; BUY/SELL always carry an argument here.
            _ => Err(ShopError::HandlerNotFound(command.as_str().to_string())),
        }
    }

    fn login(
        &self,
        sessions: &mut SessionRegistry,
        state: ConnectionState,
        params: &Params,
    ) -> Result<Reply, ShopError> {
        if let ConnectionState::Authenticated(current) = state {
            if sessions.is_authenticated(&self.store, current) {
                return Err(ShopError::AlreadyAuthenticated);
            }
        }

        let name = match params {
            Params::Text(name) if !name.trim().is_empty() => name.as_str(),
            Params::Absent => return Err(ShopError::ArityMismatch),
            _ => return Err(ShopError::MalformedArguments),
        };

        let Some(user) = self.store.users.find(|u| u.name == name) else {
            return self.signup(sessions, name);
        };

        if sessions.contains(user.id) {
            return Err(ShopError::AlreadyLoggedIn);
        }

        let (bonus, balance) = self.ledger.grant_login_bonus(&self.store, user.id)?;
        sessions.add(user.id);
        info!(user = %name, uid = %user.id, bonus, "signed in");

        let items = InventoryManager::new(&self.store, &self.ledger).list_inventory(user.id);

        Ok(Reply {
            response: Response::Ok {
                data: Some(ResponseData::Inventory(items)),
                message: Some(format!("Signed in as '{}'.\n{}", name, balance)),
                user_id: Some(user.id),
            },
            state: ConnectionState::Authenticated(user.id),
            dirty: true,
        })
    }

    fn signup(&self, sessions: &mut SessionRegistry, name: &str) -> Result<Reply, ShopError> {
        let uid = self.store.users.insert(User::new(name));
        let (bonus, _) = self.ledger.grant_login_bonus(&self.store, uid)?;
        sessions.add(uid);
        info!(user = %name, %uid, bonus, "signed up");

        Ok(Reply {
            response: Response::Ok {
                data: None,
                message: Some(format!("Signed up as '{}'. Welcome!", name)),
                user_id: Some(uid),
            },
            state: ConnectionState::Authenticated(uid),
            dirty: true,
        })
    }

    fn logout(&self, sessions: &mut SessionRegistry, state: ConnectionState) -> Reply {
        let result = match state {
            ConnectionState::Authenticated(uid) if sessions.is_authenticated(&self.store, uid) => {
                sessions.remove(uid).map(|()| uid)
            }
            _ => Err(ShopError::NotLoggedIn),
        };

        let response = match result {
            Ok(uid) => {
                info!(%uid, "logged out");
                Response::Logout
            }
            Err(err) => Response::error(err),
        };

        Reply::stay(response, ConnectionState::Terminated)
    }
}
