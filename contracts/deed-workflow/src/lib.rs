/*!
 * Deed Workflow Smart Contract
 *
 * One contract instance drives one title-deed sale. The parties (seller,
 * buyer, notary, brokers) progress the sale through an ordered sequence of
 * document-signing steps, settle once escrowed funds cover the price, and
 * finally move the recorded title of the property to the buyer(s).
 *
 * Key features:
 * - Configurable flow: steps are defined at `init` and can be inserted later,
 *   including after the original flow is complete (addenda)
 * - Two validation policies chosen per deed: signature-gated (signers
 *   authorize each document id, role thresholds per step) or count-only
 *   (the controller submits document ids, distinct ids are counted)
 * - Participant roles are local to the deed
 * - Settlement gated on escrow deposits, title transfer gated on settlement
 *   and on a dedicated ownership step
 *
 * Lifecycle:
 * 1. `init` builds the flow (Prepared)
 * 2. `reserve` binds property, price and escrow (Reserved)
 * 3. `init_users` records the participants (Started)
 * 4. `action` / `insert_step` walk the flow
 * 5. `pay_fee` confirms escrowed funds (FeePaid)
 * 6. `ownership_transfer` moves the title (Finished)
 *
 * Every check runs before the first write, so a failed call never leaves
 * partial state behind.
 */

#![no_std]

mod interfaces;
mod participants;
mod settlement;
mod steps;
mod storage;
mod types;
mod validator;

#[cfg(test)]
extern crate std;


use soroban_sdk::{contract, contractimpl, log, Address, BytesN, Env, Vec};

pub use interfaces::{EscrowClient, EscrowInterface, PropertyClient, PropertyInterface};
pub use types::{
    roles, step_flags, BuyerShare, DeedStatus, DeedTerms, Error, OwnerShare, RequiredCount,
    SignedDocument, StepDefinition, StepProgress, StepSequence, StepTemplate, ValidationPolicy,
};

use participants::ParticipantRegistry;
use settlement::{OwnershipFinalizer, SettlementGateway};
use types::{
    DEED_INITIALIZED, DEED_REJECTED, DEED_RESERVED, DEED_STARTED, DOCUMENT_SIGNED,
    DOCUMENT_SUBMITTED, FEE_PAID, OWNERSHIP_TRANSFERRED, SHARES_SET, STEP_DONE, STEP_INSERTED,
    USERS_SET,
};
use validator::{Accepted, ActionValidator};

#[contract]
pub struct DeedContract;

#[contractimpl]
impl DeedContract {
    // ================================================================================================
    // LIFECYCLE
    // ================================================================================================

    /// Builds the flow of this deed. Legal once, while the deed has no status.
    ///
    /// # Arguments
    /// * `controller` - Caller-side authority for every administrative call
    /// * `policy` - How `action` validates documents, fixed from now on
    /// * `steps` - Ordinary steps, in order
    /// * `ownership` - The dedicated step `ownership_transfer` validates against
    ///
    /// # Errors
    /// - AlreadyInitialized: If the deed already has a flow
    /// - InvalidStep: If the flow is empty or a template is malformed
    pub fn init(
        env: Env,
        controller: Address,
        policy: ValidationPolicy,
        steps: Vec<StepTemplate>,
        ownership: StepTemplate,
    ) -> Result<(), Error> {
        if storage::status(&env) != DeedStatus::None {
            return Err(Error::AlreadyInitialized);
        }
        controller.require_auth();

        let mut sequence = StepSequence::from_templates(&env, &steps)?;
        let mut ownership = ownership;
        ownership.flags |= step_flags::OWNERSHIP;
        let ownership_step = sequence.define(&ownership, false)?;

        storage::set_controller(&env, &controller);
        storage::set_policy(&env, policy);
        storage::set_sequence(&env, &sequence);
        storage::set_ownership_step(&env, &ownership_step);
        storage::set_status(&env, DeedStatus::Prepared);
        storage::bump_instance(&env);

        env.events()
            .publish((DEED_INITIALIZED, controller), (policy, sequence.len()));
        Ok(())
    }

    /// Binds the property, the agreed price and the escrow, and marks the
    /// property as pending. The property's current title owner becomes the
    /// seller.
    ///
    /// # Errors
    /// - WrongStatus: If the deed is not Prepared
    /// - InvalidPrice: If `price` is not positive
    /// - PropertyUnavailable: If the property is engaged elsewhere
    pub fn reserve(env: Env, property: Address, price: i128, escrow: Address) -> Result<(), Error> {
        Self::require_controller(&env)?;
        if storage::status(&env) != DeedStatus::Prepared {
            return Err(Error::WrongStatus);
        }
        if price <= 0 {
            return Err(Error::InvalidPrice);
        }

        let seller = SettlementGateway::reserve_property(&env, &property)?;
        let terms = DeedTerms {
            property: property.clone(),
            escrow: escrow.clone(),
            price,
            seller,
        };
        storage::set_terms(&env, &terms);
        storage::set_status(&env, DeedStatus::Reserved);
        storage::bump_instance(&env);

        env.events()
            .publish((DEED_RESERVED, env.current_contract_address()), (property, escrow, price));
        Ok(())
    }

    /// Records the participants and their role flags, starting the flow.
    ///
    /// # Errors
    /// - AlreadyStarted: If participants were already populated
    /// - WrongStatus: If the deed is not Reserved
    /// - LengthMismatch / InvalidFlags / RoleMismatch: On malformed input
    pub fn init_users(env: Env, addresses: Vec<Address>, flags: Vec<u32>) -> Result<(), Error> {
        Self::require_controller(&env)?;
        match storage::status(&env) {
            DeedStatus::Reserved => {}
            DeedStatus::Started | DeedStatus::FeePaid => return Err(Error::AlreadyStarted),
            _ => return Err(Error::WrongStatus),
        }

        let terms = storage::terms(&env)?;
        let mut registry = storage::participants(&env);
        ParticipantRegistry::assign(&mut registry, &addresses, &flags, &terms.seller)?;

        storage::set_participants(&env, &registry);
        storage::set_status(&env, DeedStatus::Started);
        storage::bump_instance(&env);

        env.events()
            .publish((DEED_STARTED, env.current_contract_address()), registry.len());
        Ok(())
    }

    /// Adds or replaces participants on a count-only deed. Accumulated
    /// progress and loaded documents are kept.
    ///
    /// # Errors
    /// - UnsupportedOperation: On a signature-gated deed
    /// - WrongStatus: Before Started or once the deed is closed
    pub fn set_users(env: Env, addresses: Vec<Address>, flags: Vec<u32>) -> Result<(), Error> {
        Self::require_controller(&env)?;
        if storage::policy(&env)? != ValidationPolicy::CountOnly {
            return Err(Error::UnsupportedOperation);
        }
        Self::require_open_flow(&env)?;

        let terms = storage::terms(&env)?;
        let mut registry = storage::participants(&env);
        ParticipantRegistry::assign(&mut registry, &addresses, &flags, &terms.seller)?;
        storage::set_participants(&env, &registry);
        storage::bump_instance(&env);

        env.events()
            .publish((USERS_SET, env.current_contract_address()), registry.len());
        Ok(())
    }

    /// Records each buyer's fraction of the title. Shares are checked for
    /// consistency when the title is split, not here.
    ///
    /// # Errors
    /// - NotABuyer: If an address is not a registered buyer
    /// - InvalidShares: If a share is not a proper fraction
    pub fn set_buyers_parts(env: Env, addresses: Vec<Address>, shares: Vec<BuyerShare>) -> Result<(), Error> {
        Self::require_controller(&env)?;
        Self::require_open_flow(&env)?;

        let registry = storage::participants(&env);
        let mut recorded = storage::buyer_shares(&env);
        ParticipantRegistry::record_shares(&registry, &mut recorded, &addresses, &shares)?;
        storage::set_buyer_shares(&env, &recorded);
        storage::bump_instance(&env);

        env.events()
            .publish((SHARES_SET, env.current_contract_address()), addresses.len());
        Ok(())
    }

    /// Inserts a step into the flow and returns the index it landed at.
    ///
    /// `position` is 1-based; `0` appends. A step placed behind the cursor is
    /// recorded as completed history and the cursor shifts by one.
    ///
    /// # Errors
    /// - WrongStatus: Once the deed is Finished or Rejected
    /// - OutOfRange: If `position` exceeds the flow length + 1
    /// - InvalidStep: If the template is malformed
    pub fn insert_step(env: Env, step: StepTemplate, position: u32) -> Result<u32, Error> {
        Self::require_controller(&env)?;
        if storage::status(&env).is_terminal() {
            return Err(Error::WrongStatus);
        }

        let mut sequence = storage::sequence(&env)?;
        let index = sequence.insert(&step, position)?;
        let id = sequence.next_id - 1;
        storage::set_sequence(&env, &sequence);
        storage::bump_instance(&env);

        env.events()
            .publish((STEP_INSERTED, env.current_contract_address()), (id, index, sequence.cursor));
        Ok(index)
    }

    /// Submits a document against the current step. Returns `true` when the
    /// call completed the step and moved the cursor.
    ///
    /// Signature-gated deeds expect every signer in `signers` to authorize
    /// `document_id`; count-only deeds expect an empty list and the
    /// controller's authorization.
    ///
    /// # Errors
    /// - WrongStatus: Unless the deed is Started or FeePaid
    /// - InvalidMove: Empty document, exhausted flow, or document bound to
    ///   another step
    /// - UnknownSigner / RoleMismatch / AlreadySigned: Signature checks
    pub fn action(env: Env, document_id: BytesN<32>, signers: Vec<Address>) -> Result<bool, Error> {
        Self::require_open_flow(&env)?;

        let policy = storage::policy(&env)?;
        let mut sequence = storage::sequence(&env)?;
        let step = sequence.current().map_err(|_| {
            log!(&env, "No step awaiting completion");
            Error::InvalidMove
        })?;

        let accepted = match Self::validate(&env, policy, &step, &document_id, &signers)? {
            Some(accepted) => accepted,
            None => return Ok(false),
        };
        Self::record(&env, policy, &step, &document_id, &accepted);

        if accepted.complete {
            let done = sequence.advance()?;
            storage::set_sequence(&env, &sequence);
            env.events()
                .publish((STEP_DONE, env.current_contract_address()), (done.id, sequence.cursor));
        }
        storage::bump_instance(&env);
        Ok(accepted.complete)
    }

    // ================================================================================================
    // SETTLEMENT
    // ================================================================================================

    /// Confirms that the escrow covers the price and moves the deed to
    /// FeePaid. Returns the escrowed total.
    ///
    /// # Errors
    /// - WrongStatus: Unless the deed is Started
    /// - InvalidMove: While ordinary steps are still pending
    /// - InsufficientFunds: If the escrow holds less than the price
    pub fn pay_fee(env: Env) -> Result<i128, Error> {
        Self::require_controller(&env)?;
        if storage::status(&env) != DeedStatus::Started {
            return Err(Error::WrongStatus);
        }
        if !storage::sequence(&env)?.is_exhausted() {
            log!(&env, "Settlement requested with steps pending");
            return Err(Error::InvalidMove);
        }

        let terms = storage::terms(&env)?;
        let deposited = SettlementGateway::confirm_funds(&env, &terms)?;
        storage::set_status(&env, DeedStatus::FeePaid);
        storage::bump_instance(&env);

        env.events()
            .publish((FEE_PAID, env.current_contract_address()), (deposited, terms.price));
        Ok(deposited)
    }

    /// Validates a document against the ownership step. Once that step is
    /// satisfied the title is split among the buyers, the property is
    /// released and the deed is Finished. Returns `true` when title moved.
    ///
    /// # Errors
    /// - WrongStatus: Unless the deed is FeePaid
    /// - InvalidMove: While inserted addenda are still pending
    /// - NoBuyer / InvalidShares: If title cannot be split
    pub fn ownership_transfer(env: Env, document_id: BytesN<32>, signers: Vec<Address>) -> Result<bool, Error> {
        if storage::status(&env) != DeedStatus::FeePaid {
            return Err(Error::WrongStatus);
        }
        if !storage::sequence(&env)?.is_exhausted() {
            return Err(Error::InvalidMove);
        }

        let policy = storage::policy(&env)?;
        let mut step = storage::ownership_step(&env)?;
        let accepted = match Self::validate(&env, policy, &step, &document_id, &signers)? {
            Some(accepted) => accepted,
            None => return Ok(false),
        };
        let owners = if accepted.complete {
            let registry = storage::participants(&env);
            let shares = storage::buyer_shares(&env);
            Some(ParticipantRegistry::ownership_split(&env, &registry, &shares)?)
        } else {
            None
        };

        Self::record(&env, policy, &step, &document_id, &accepted);
        if let Some(owners) = owners {
            let terms = storage::terms(&env)?;
            step.done = true;
            storage::set_ownership_step(&env, &step);
            storage::set_status(&env, DeedStatus::Finished);
            OwnershipFinalizer::transfer_title(&env, &terms, &owners);
            env.events()
                .publish((OWNERSHIP_TRANSFERRED, terms.property), owners);
        }
        storage::bump_instance(&env);
        Ok(accepted.complete)
    }

    /// Cancels the deed from any non-terminal status.
    ///
    /// # Errors
    /// - WrongStatus: If the deed is already Finished or Rejected
    pub fn reject(env: Env) -> Result<(), Error> {
        let controller = Self::require_controller(&env)?;
        let previous = storage::status(&env);
        if previous.is_terminal() {
            return Err(Error::WrongStatus);
        }
        storage::set_status(&env, DeedStatus::Rejected);
        storage::bump_instance(&env);

        env.events().publish((DEED_REJECTED, controller), previous);
        Ok(())
    }

    // ================================================================================================
    // QUERIES
    // ================================================================================================

    pub fn status(env: Env) -> DeedStatus {
        storage::status(&env)
    }

    pub fn policy(env: Env) -> Result<ValidationPolicy, Error> {
        storage::policy(&env)
    }

    pub fn controller(env: Env) -> Result<Address, Error> {
        storage::controller(&env)
    }

    pub fn terms(env: Env) -> Result<DeedTerms, Error> {
        storage::terms(&env)
    }

    pub fn property(env: Env) -> Result<Address, Error> {
        Ok(storage::terms(&env)?.property)
    }

    pub fn escrow(env: Env) -> Result<Address, Error> {
        Ok(storage::terms(&env)?.escrow)
    }

    pub fn price(env: Env) -> Result<i128, Error> {
        Ok(storage::terms(&env)?.price)
    }

    pub fn seller(env: Env) -> Result<Address, Error> {
        Ok(storage::terms(&env)?.seller)
    }

    pub fn steps(env: Env) -> Result<Vec<StepDefinition>, Error> {
        Ok(storage::sequence(&env)?.steps)
    }

    pub fn cursor(env: Env) -> Result<u32, Error> {
        Ok(storage::sequence(&env)?.cursor)
    }

    /// The step awaiting completion, or SequenceExhausted.
    pub fn current_step(env: Env) -> Result<StepDefinition, Error> {
        storage::sequence(&env)?.current()
    }

    pub fn ownership_step(env: Env) -> Result<StepDefinition, Error> {
        storage::ownership_step(&env)
    }

    pub fn step_progress(env: Env, step_id: u32) -> Option<StepProgress> {
        storage::progress(&env, step_id)
    }

    /// Role flags of `address`, if registered.
    pub fn participant(env: Env, address: Address) -> Option<u32> {
        storage::participants(&env).get(address)
    }

    pub fn buyers(env: Env) -> Vec<Address> {
        ParticipantRegistry::with_role(&env, &storage::participants(&env), roles::BUYER)
    }

    pub fn intermediaries(env: Env) -> Vec<Address> {
        ParticipantRegistry::intermediaries(&env, &storage::participants(&env))
    }

    pub fn buyer_share(env: Env, address: Address) -> Option<BuyerShare> {
        storage::buyer_shares(&env).get(address)
    }

    pub fn is_signed_by(env: Env, document_id: BytesN<32>, signer: Address) -> bool {
        storage::document(&env, &document_id)
            .map(|document| document.signers.contains(&signer))
            .unwrap_or(false)
    }

    pub fn is_loaded_document(env: Env, document_id: BytesN<32>) -> bool {
        storage::document(&env, &document_id).is_some()
    }
}

impl DeedContract {
    fn require_controller(env: &Env) -> Result<Address, Error> {
        let controller = storage::controller(env)?;
        controller.require_auth();
        Ok(controller)
    }

    /// Steps can be acted on while Started, and after settlement for addenda.
    fn require_open_flow(env: &Env) -> Result<(), Error> {
        match storage::status(env) {
            DeedStatus::Started | DeedStatus::FeePaid => Ok(()),
            status => {
                log!(env, "Flow closed, status: {}", status as u32);
                Err(Error::WrongStatus)
            }
        }
    }

    /// Runs the deed's policy on `step`. `None` means an idempotent resubmission.
    fn validate(
        env: &Env,
        policy: ValidationPolicy,
        step: &StepDefinition,
        document_id: &BytesN<32>,
        signers: &Vec<Address>,
    ) -> Result<Option<Accepted>, Error> {
        let progress = storage::progress(env, step.id).unwrap_or_else(|| StepProgress::new(env));
        let document = storage::document(env, document_id);
        match policy {
            ValidationPolicy::SignatureGated => {
                let registry = storage::participants(env);
                ActionValidator::sign(env, step, document_id, signers, &registry, document, progress)
                    .map(Some)
            }
            ValidationPolicy::CountOnly => {
                if !signers.is_empty() {
                    return Err(Error::UnsupportedOperation);
                }
                Self::require_controller(env)?;
                ActionValidator::submit(env, step, document_id, document, progress)
            }
        }
    }

    fn record(
        env: &Env,
        policy: ValidationPolicy,
        step: &StepDefinition,
        document_id: &BytesN<32>,
        accepted: &Accepted,
    ) {
        storage::set_document(env, document_id, &accepted.document);
        storage::set_progress(env, step.id, &accepted.progress);
        match policy {
            ValidationPolicy::SignatureGated => env.events().publish(
                (DOCUMENT_SIGNED, document_id.clone()),
                (step.id, accepted.document.signers.len()),
            ),
            ValidationPolicy::CountOnly => env.events().publish(
                (DOCUMENT_SUBMITTED, document_id.clone()),
                (step.id, accepted.progress.submissions),
            ),
        }
    }
}
