//! Credit bookkeeping.
//!
//! The ledger is the only writer of `User::credits`. Every change is a
//! single [`Collection::update`](crate::store::Collection::update) so the
//! balance check and the write happen under one write lock on `users`.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::ShopError;
use crate::model::UserId;
use crate::store::Store;

/// Login bonus range: `min` inclusive, `max` exclusive, in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusRange {
    pub min: u64,
    pub max: u64,
    pub step: u64,
}

impl Default for BonusRange {
    fn default() -> Self {
        BonusRange {
            min: 10,
            max: 100,
            step: 5,
        }
    }
}

impl BonusRange {
    pub fn validate(&self) -> Result<(), ShopError> {
        if self.step == 0 || self.min >= self.max {
            return Err(ShopError::InvalidBonusRange {
                min: self.min,
                max: self.max,
                step: self.step,
            });
        }
        Ok(())
    }

    /// Number of distinct amounts the range can produce.
    fn choices(&self) -> u64 {
        (self.max - self.min).div_ceil(self.step)
    }

    fn nth(&self, k: u64) -> u64 {
        self.min + self.step * k
    }
}

/// Human-readable balance line used by every credit-related reply.
pub fn balance_message(credits: u64) -> String {
    format!("Credits: {}", credits)
}

#[derive(Debug)]
pub struct Ledger {
    bonus: BonusRange,
    rng: Mutex<StdRng>,
}

impl Ledger {
    pub fn new(bonus: BonusRange) -> Result<Self, ShopError> {
        Self::with_rng(bonus, StdRng::from_entropy())
    }

    /// Deterministic bonus draws, for tests and replays.
    pub fn with_seed(bonus: BonusRange, seed: u64) -> Result<Self, ShopError> {
        Self::with_rng(bonus, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bonus: BonusRange, rng: StdRng) -> Result<Self, ShopError> {
        bonus.validate()?;
        Ok(Ledger {
            bonus,
            rng: Mutex::new(rng),
        })
    }

    pub fn bonus_range(&self) -> BonusRange {
        self.bonus
    }

    fn draw_bonus(&self) -> u64 {
        let k = self.rng.lock().gen_range(0..self.bonus.choices());
        self.bonus.nth(k)
    }

    /// Credit a random bonus drawn from the configured range.
    pub fn grant_login_bonus(&self, store: &Store, uid: UserId) -> Result<(u64, String), ShopError> {
        let amount = self.draw_bonus();
        let message = self.apply_delta(store, uid, amount, true)?;
        Ok((amount, message))
    }

    /// Add (`is_income`) or subtract `amount`.
    ///
    /// A debit larger than the current balance fails with
    /// [`ShopError::InsufficientCredits`], a credit past `u64::MAX` with
    /// [`ShopError::CreditOverflow`]; either way the row is untouched.
    pub fn apply_delta(
        &self,
        store: &Store,
        uid: UserId,
        amount: u64,
        is_income: bool,
    ) -> Result<String, ShopError> {
        let credits = store
            .users
            .update(uid, |user| {
                if is_income {
                    user.credits = user
                        .credits
                        .checked_add(amount)
                        .ok_or(ShopError::CreditOverflow)?;
                } else if amount > user.credits {
                    return Err(ShopError::InsufficientCredits);
                } else {
                    user.credits -= amount;
                }
                Ok(user.credits)
            })
            .ok_or(ShopError::UnknownUser(uid))??;

        Ok(balance_message(credits))
    }

    pub fn balance_message(&self, store: &Store, uid: UserId) -> Result<String, ShopError> {
        let user = store.users.get(uid).ok_or(ShopError::UnknownUser(uid))?;
        Ok(balance_message(user.credits))
    }
}
