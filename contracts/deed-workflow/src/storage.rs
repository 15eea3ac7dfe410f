//! Storage layout of one deed instance.
//!
//! Deed-wide state (status, flow, participants, terms) lives in instance
//! storage and shares the contract's lifetime. Per-document and per-step
//! records grow with the negotiation history and go to persistent storage.

use soroban_sdk::{contracttype, Address, BytesN, Env, Map};

use crate::types::{
    BuyerShare, DeedStatus, DeedTerms, Error, SignedDocument, StepDefinition, StepProgress,
    StepSequence, ValidationPolicy,
};

// Ledger lifetime configuration. A deed is a permanent record, so every
// mutating call pushes its entries well past the threshold.
const DAY_IN_LEDGERS: u32 = 17_280;
pub const INSTANCE_TTL_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
pub const INSTANCE_TTL_EXTEND_TO: u32 = 30 * DAY_IN_LEDGERS;
pub const RECORD_TTL_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
pub const RECORD_TTL_EXTEND_TO: u32 = 30 * DAY_IN_LEDGERS;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Status,
    Controller,
    Policy,
    Sequence,
    OwnershipStep,
    Terms,
    /// Map<Address, u32> of role flags
    Participants,
    /// Map<Address, BuyerShare>
    BuyerShares,
    /// StepProgress keyed by StepDefinition::id
    Progress(u32),
    /// SignedDocument keyed by document id
    Document(BytesN<32>),
}

pub fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
}

pub fn status(env: &Env) -> DeedStatus {
    env.storage()
        .instance()
        .get(&DataKey::Status)
        .unwrap_or(DeedStatus::None)
}

pub fn set_status(env: &Env, status: DeedStatus) {
    env.storage().instance().set(&DataKey::Status, &status);
}

pub fn controller(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Controller)
        .ok_or(Error::NotInitialized)
}

pub fn set_controller(env: &Env, controller: &Address) {
    env.storage().instance().set(&DataKey::Controller, controller);
}

pub fn policy(env: &Env) -> Result<ValidationPolicy, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Policy)
        .ok_or(Error::NotInitialized)
}

pub fn set_policy(env: &Env, policy: ValidationPolicy) {
    env.storage().instance().set(&DataKey::Policy, &policy);
}

pub fn sequence(env: &Env) -> Result<StepSequence, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Sequence)
        .ok_or(Error::NotInitialized)
}

pub fn set_sequence(env: &Env, sequence: &StepSequence) {
    env.storage().instance().set(&DataKey::Sequence, sequence);
}

pub fn ownership_step(env: &Env) -> Result<StepDefinition, Error> {
    env.storage()
        .instance()
        .get(&DataKey::OwnershipStep)
        .ok_or(Error::NotInitialized)
}

pub fn set_ownership_step(env: &Env, step: &StepDefinition) {
    env.storage().instance().set(&DataKey::OwnershipStep, step);
}

pub fn terms(env: &Env) -> Result<DeedTerms, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Terms)
        .ok_or(Error::WrongStatus)
}

pub fn set_terms(env: &Env, terms: &DeedTerms) {
    env.storage().instance().set(&DataKey::Terms, terms);
}

pub fn participants(env: &Env) -> Map<Address, u32> {
    env.storage()
        .instance()
        .get(&DataKey::Participants)
        .unwrap_or_else(|| Map::new(env))
}

pub fn set_participants(env: &Env, participants: &Map<Address, u32>) {
    env.storage()
        .instance()
        .set(&DataKey::Participants, participants);
}

pub fn buyer_shares(env: &Env) -> Map<Address, BuyerShare> {
    env.storage()
        .instance()
        .get(&DataKey::BuyerShares)
        .unwrap_or_else(|| Map::new(env))
}

pub fn set_buyer_shares(env: &Env, shares: &Map<Address, BuyerShare>) {
    env.storage().instance().set(&DataKey::BuyerShares, shares);
}

pub fn progress(env: &Env, step_id: u32) -> Option<StepProgress> {
    env.storage().persistent().get(&DataKey::Progress(step_id))
}

pub fn set_progress(env: &Env, step_id: u32, progress: &StepProgress) {
    let key = DataKey::Progress(step_id);
    env.storage().persistent().set(&key, progress);
    env.storage()
        .persistent()
        .extend_ttl(&key, RECORD_TTL_THRESHOLD, RECORD_TTL_EXTEND_TO);
}

pub fn document(env: &Env, document_id: &BytesN<32>) -> Option<SignedDocument> {
    env.storage()
        .persistent()
        .get(&DataKey::Document(document_id.clone()))
}

pub fn set_document(env: &Env, document_id: &BytesN<32>, document: &SignedDocument) {
    let key = DataKey::Document(document_id.clone());
    env.storage().persistent().set(&key, document);
    env.storage()
        .persistent()
        .extend_ttl(&key, RECORD_TTL_THRESHOLD, RECORD_TTL_EXTEND_TO);
}
