//! Collaborators the deed commands but does not own.
//!
//! Only the calls the deed makes (plus `deposit`, used by buyers against the
//! escrow) are declared; `contractclient` generates the typed clients.

use soroban_sdk::{contractclient, Address, Env, Vec};

use crate::types::OwnerShare;

/// The property whose recorded title is being sold.
#[contractclient(name = "PropertyClient")]
pub trait PropertyInterface {
    /// `0` when idle, non-zero while a deed holds it pending.
    fn status(env: Env) -> u32;

    fn title_owner(env: Env) -> Address;

    /// Marks the property as engaged by `deed`.
    fn set_pending(env: Env, deed: Address);

    /// Reassigns title to `owners` and clears the pending marker.
    fn approve_ownership_transfer(env: Env, deed: Address, owners: Vec<OwnerShare>);
}

/// Holds the buyer's funds for one or more deeds.
#[contractclient(name = "EscrowClient")]
pub trait EscrowInterface {
    /// Total currently held against `deed`.
    fn deposited(env: Env, deed: Address) -> i128;

    fn deposit(env: Env, from: Address, deed: Address, amount: i128);
}
