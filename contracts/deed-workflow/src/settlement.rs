//! Settlement Gateway and Ownership Finalizer: the points where the deed
//! reaches out to its Escrow and Property collaborators.

use soroban_sdk::{log, Address, Env, Vec};

use crate::interfaces::{EscrowClient, PropertyClient};
use crate::types::{DeedTerms, Error, OwnerShare};

/// Property status reported while no transaction holds it.
pub const PROPERTY_IDLE: u32 = 0;

pub struct SettlementGateway;

impl SettlementGateway {
    /// Claims `property` for this deed and returns its current title owner.
    pub fn reserve_property(env: &Env, property: &Address) -> Result<Address, Error> {
        let client = PropertyClient::new(env, property);
        let status = client.status();
        if status != PROPERTY_IDLE {
            log!(env, "Property already engaged, status: {}", status);
            return Err(Error::PropertyUnavailable);
        }
        let seller = client.title_owner();
        client.set_pending(&env.current_contract_address());
        Ok(seller)
    }

    /// Returns the escrowed total once it covers the agreed price.
    pub fn confirm_funds(env: &Env, terms: &DeedTerms) -> Result<i128, Error> {
        let deposited = EscrowClient::new(env, &terms.escrow).deposited(&env.current_contract_address());
        if deposited < terms.price {
            log!(env, "Insufficient escrow. Required: {}, Deposited: {}", terms.price, deposited);
            return Err(Error::InsufficientFunds);
        }
        Ok(deposited)
    }
}

pub struct OwnershipFinalizer;

impl OwnershipFinalizer {
    /// Hands the title split to the property, which also releases its
    /// pending marker.
    pub fn transfer_title(env: &Env, terms: &DeedTerms, owners: &Vec<OwnerShare>) {
        PropertyClient::new(env, &terms.property)
            .approve_ownership_transfer(&env.current_contract_address(), owners);
    }
}
