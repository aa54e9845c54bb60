//! # Token Ledger
//!
//! The reference protected resource: an in-memory fungible balance ledger
//! fronted by the Mandate engine. It implements the engine's outbound
//! `ResourceGateway` port and performs no authorization of its own beyond
//! recognizing root holders; chain validation and replay protection are the
//! engine's exclusive responsibility.
//!
//! ## Authority Model
//!
//! - `Deposit`, `Withdraw`, `Transfer` operate on the acting identity's own
//!   balance, so every identity is the root holder of those actions for
//!   itself.
//! - `Mint` creates supply and is recognized only for the ledger admin.
//!
//! Actions arrive as bincode-encoded [`LedgerAction`] payloads inside the
//! engine's opaque target actions.

#![warn(missing_docs)]
#![warn(clippy::all)]

use mandate_engine::{ExecutionOutput, ResourceError, ResourceGateway, RootAuthority};
use serde::{Deserialize, Serialize};
use shared_types::{Address, TargetAction, U256};
use std::collections::HashMap;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The action payload did not decode to a [`LedgerAction`].
    #[error("malformed action payload: {0}")]
    MalformedPayload(String),

    /// The acting identity's balance cannot cover the operation.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount the operation needs.
        required: U256,
        /// Amount the acting identity holds.
        available: U256,
    },

    /// A credit would overflow the recipient's balance.
    #[error("balance overflow")]
    BalanceOverflow,

    /// Mint attempted by an identity other than the ledger admin.
    #[error("mint requires the ledger admin")]
    NotAdmin,
}

impl From<LedgerError> for ResourceError {
    fn from(error: LedgerError) -> Self {
        ResourceError(error.to_string())
    }
}

/// An operation on the ledger, carried as the opaque payload of a target
/// action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    /// Credit the acting identity with externally received value.
    Deposit {
        /// Amount to credit.
        amount: U256,
    },
    /// Debit the acting identity, releasing value externally.
    Withdraw {
        /// Amount to debit.
        amount: U256,
    },
    /// Move value from the acting identity to another account.
    Transfer {
        /// Recipient account.
        to: Address,
        /// Amount to move.
        amount: U256,
    },
    /// Create new supply. Admin only.
    Mint {
        /// Recipient account.
        to: Address,
        /// Amount to create.
        amount: U256,
    },
}

impl LedgerAction {
    /// Encode this operation as an opaque action payload.
    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::MalformedPayload(e.to_string()))
    }

    /// Decode an opaque action payload.
    pub fn decode(payload: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(payload).map_err(|e| LedgerError::MalformedPayload(e.to_string()))
    }

    /// Wrap this operation in a target action addressed to the ledger.
    pub fn into_action(self, ledger_address: Address) -> Result<TargetAction, LedgerError> {
        Ok(TargetAction {
            to: ledger_address,
            payload: self.encode()?,
        })
    }
}

/// In-memory fungible balance ledger with checkpoint/revert support.
#[derive(Debug, Clone)]
pub struct TokenLedger {
    address: Address,
    admin: Address,
    balances: HashMap<Address, U256>,
    snapshots: Vec<HashMap<Address, U256>>,
}

impl TokenLedger {
    /// Create an empty ledger deployed at `address`, administered by
    /// `admin`.
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            admin,
            balances: HashMap::new(),
            snapshots: Vec::new(),
        }
    }

    /// The address this ledger instance is deployed at.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Balance of an account (zero if never touched).
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn credit(&mut self, account: Address, amount: U256) -> Result<(), LedgerError> {
        let balance = self.balance_of(&account);
        let updated = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        self.balances.insert(account, updated);
        Ok(())
    }

    fn debit(&mut self, account: Address, amount: U256) -> Result<(), LedgerError> {
        let balance = self.balance_of(&account);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available: balance,
            });
        }
        self.balances.insert(account, balance - amount);
        Ok(())
    }

    fn execute(
        &mut self,
        operation: LedgerAction,
        acting: Address,
    ) -> Result<U256, LedgerError> {
        match operation {
            LedgerAction::Deposit { amount } => {
                self.credit(acting, amount)?;
                Ok(self.balance_of(&acting))
            }
            LedgerAction::Withdraw { amount } => {
                self.debit(acting, amount)?;
                Ok(self.balance_of(&acting))
            }
            LedgerAction::Transfer { to, amount } => {
                self.debit(acting, amount)?;
                self.credit(to, amount)?;
                Ok(self.balance_of(&acting))
            }
            LedgerAction::Mint { to, amount } => {
                if acting != self.admin {
                    return Err(LedgerError::NotAdmin);
                }
                self.credit(to, amount)?;
                Ok(self.balance_of(&to))
            }
        }
    }
}

impl RootAuthority for TokenLedger {
    fn is_root_holder(&self, identity: &Address, action: &TargetAction) -> bool {
        match LedgerAction::decode(&action.payload) {
            // Supply creation is native to the admin alone.
            Ok(LedgerAction::Mint { .. }) => *identity == self.admin,
            // Every identity natively controls its own balance. Undecodable
            // payloads pass through here and fail in `apply` instead, so the
            // caller sees the precise execution error.
            _ => true,
        }
    }
}

impl ResourceGateway for TokenLedger {
    fn apply(
        &mut self,
        action: &TargetAction,
        acting_identity: &Address,
    ) -> Result<ExecutionOutput, ResourceError> {
        let operation = LedgerAction::decode(&action.payload)?;
        let balance = self.execute(operation, *acting_identity)?;
        bincode::serialize(&balance)
            .map_err(|e| ResourceError(LedgerError::MalformedPayload(e.to_string()).to_string()))
    }

    fn checkpoint(&mut self) {
        self.snapshots.push(self.balances.clone());
    }

    fn commit(&mut self) {
        self.snapshots.pop();
    }

    fn revert(&mut self) {
        if let Some(snapshot) = self.snapshots.pop() {
            self.balances = snapshot;
        }
    }
}
