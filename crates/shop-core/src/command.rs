//! Typed command table.
//!
//! Maps action names to commands and records how many positional
//! arguments each handler takes, counting the implicit user id:
//! - 0: takes nothing (SHOPLIST)
//! - 1: user id only (BALANCE, INVENTORY)
//! - 2: user id plus one string (BUY, SELL)

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Login,
    Logout,
    Balance,
    ShopList,
    Inventory,
    Buy,
    Sell,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::Login,
        Command::Logout,
        Command::Balance,
        Command::ShopList,
        Command::Inventory,
        Command::Buy,
        Command::Sell,
    ];

    /// Case-sensitive lookup by wire name.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "LOGIN" => Some(Command::Login),
            "LOGOUT" => Some(Command::Logout),
            "BALANCE" => Some(Command::Balance),
            "SHOPLIST" => Some(Command::ShopList),
            "INVENTORY" => Some(Command::Inventory),
            "BUY" => Some(Command::Buy),
            "SELL" => Some(Command::Sell),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Login => "LOGIN",
            Command::Logout => "LOGOUT",
            Command::Balance => "BALANCE",
            Command::ShopList => "SHOPLIST",
            Command::Inventory => "INVENTORY",
            Command::Buy => "BUY",
            Command::Sell => "SELL",
        }
    }

    /// Required positional arguments, including the user id.
    ///
    /// LOGIN and LOGOUT are routed before the arity check and never
    /// consult this.
    pub fn arity(self) -> usize {
        match self {
            Command::ShopList => 0,
            Command::Login | Command::Logout | Command::Balance | Command::Inventory => 1,
            Command::Buy | Command::Sell => 2,
        }
    }

    /// True for commands whose success changes persisted state.
    pub fn mutates(self) -> bool {
        matches!(self, Command::Login | Command::Buy | Command::Sell)
    }
}
