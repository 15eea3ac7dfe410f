/*!
 * Type Definitions for the Deed Workflow Contract
 *
 * This module defines the data structures, enums, flag constants and event
 * topics shared by every part of the deed engine. One deployed contract
 * instance represents one property sale (a "deed"), so none of these types
 * carry a deed identifier.
 */

use soroban_sdk::{contracterror, contracttype, symbol_short, Address, BytesN, Symbol, Vec};

// ================================================================================================
// FLAGS
// ================================================================================================

/// Role bits a participant can hold inside one deed.
///
/// These are local to the deed instance and unrelated to any global role
/// registry. A step's `roles` mask uses the same bits to name the categories
/// whose signatures it needs.
pub mod roles {
    pub const SELLER: u32 = 1 << 0;
    pub const BUYER: u32 = 1 << 1;
    pub const NOTARY: u32 = 1 << 2;
    pub const BROKER: u32 = 1 << 3;

    /// Every role bit the engine understands.
    pub const ALL: u32 = SELLER | BUYER | NOTARY | BROKER;
}

/// Behaviour bits carried by a step definition.
pub mod step_flags {
    /// Marks the dedicated final step consumed by the ownership finalizer.
    pub const OWNERSHIP: u32 = 1 << 0;

    /// Each signature credits a single category (the lowest matching one),
    /// so one multi-role participant cannot satisfy two categories alone.
    pub const SINGLE_ROLE: u32 = 1 << 1;

    pub const ALL: u32 = OWNERSHIP | SINGLE_ROLE;
}

// ================================================================================================
// CORE DATA STRUCTURES
// ================================================================================================

/// Minimum number of signatures a step needs, per category.
///
/// `primary` applies to the lowest role bit named by the step, `secondary` to
/// the next one. Count-only deeds need `primary + secondary` distinct document
/// submissions instead.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequiredCount {
    pub primary: u32,
    pub secondary: u32,
}

impl RequiredCount {
    pub fn total(&self) -> u32 {
        self.primary.saturating_add(self.secondary)
    }
}

/// Description of a step as supplied by the caller at `init` or `insert_step`.
///
/// Roles are local to the deed, so the required-role mask and the
/// required-flag mask of a step are the same thing here: `roles` holds both,
/// and `flags` only carries `step_flags` behaviour bits.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepTemplate {
    /// Fixed-size identifier of the action this step stands for
    pub selector: BytesN<4>,
    /// Role categories whose signatures count towards this step
    pub roles: u32,
    pub required: RequiredCount,
    /// `step_flags` bits
    pub flags: u32,
}

/// One step of the live sequence.
///
/// Everything except `done` is fixed once the step is created, and `done`
/// flips exactly once.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepDefinition {
    /// Per-deed sequence number. Stable across insertions, unlike the index.
    pub id: u32,
    pub selector: BytesN<4>,
    pub roles: u32,
    pub required: RequiredCount,
    pub flags: u32,
    pub done: bool,
}

impl StepDefinition {
    pub fn is_ownership(&self) -> bool {
        self.flags & step_flags::OWNERSHIP != 0
    }

    pub fn is_single_role(&self) -> bool {
        self.flags & step_flags::SINGLE_ROLE != 0
    }
}

/// The ordered step list of one deed together with its cursor.
///
/// Invariant: every step with index < `cursor` is done, the step at `cursor`
/// (if any) is not.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepSequence {
    pub steps: Vec<StepDefinition>,
    pub cursor: u32,
    pub next_id: u32,
}

/// Accumulated validation state for one step.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepProgress {
    /// Signatures credited to the primary category
    pub primary: u32,
    /// Signatures credited to the secondary category
    pub secondary: u32,
    /// Signatures on a single-role step from signers holding both
    /// categories; each one covers whichever category falls short
    pub either: u32,
    /// Distinct documents submitted (count-only deeds)
    pub submissions: u32,
    /// Signers already credited on this step, through any document
    pub credited: Vec<Address>,
}

/// A document identifier loaded against a step, with the signers that
/// satisfied it. Signers are only ever appended.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedDocument {
    /// `StepDefinition::id` the document was first loaded against
    pub step: u32,
    pub signers: Vec<Address>,
}

/// Fractional ownership assigned to one buyer.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BuyerShare {
    pub numerator: u32,
    pub denominator: u32,
}

/// One line of the title split handed to the Property collaborator.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnerShare {
    pub owner: Address,
    pub numerator: u32,
    pub denominator: u32,
}

/// Commercial terms bound once, at `reserve`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeedTerms {
    /// Property collaborator whose title is being sold
    pub property: Address,
    /// Escrow collaborator holding the buyer's funds
    pub escrow: Address,
    /// Agreed sale price, in escrow units
    pub price: i128,
    /// Title owner at the time of reservation
    pub seller: Address,
}

// ================================================================================================
// ENUMERATIONS
// ================================================================================================

/// Lifecycle of a deed.
///
/// # State Transition Rules
/// - None → Prepared (`init`)
/// - Prepared → Reserved (`reserve`)
/// - Reserved → Started (`init_users`)
/// - Started → FeePaid (`pay_fee`)
/// - FeePaid → Finished (`ownership_transfer`)
/// - any non-terminal state → Rejected (`reject`)
///
/// No state is entered twice. Finished and Rejected are terminal.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum DeedStatus {
    None = 0,
    Prepared = 1,
    Reserved = 2,
    Started = 3,
    FeePaid = 4,
    Finished = 5,
    Rejected = 6,
}

impl DeedStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeedStatus::Finished | DeedStatus::Rejected)
    }
}

/// How `action` decides that a step is satisfied. Fixed for the life of a deed.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationPolicy {
    /// Signers authorize the document id; role flags and per-category
    /// thresholds are checked.
    SignatureGated,
    /// The controller submits bare document ids; distinct ids are counted.
    CountOnly,
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Every failure the deed engine reports.
///
/// # Error Code Ranges
/// - 1-9: lifecycle and sequencing errors
/// - 10-29: validation errors
/// - 30-39: resource errors
///
/// Authorization failures are raised by the host itself (`require_auth`) and
/// never reach this enum.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ========== Lifecycle and Sequencing (1-9) ==========
    /// Deed state was read before `init`
    NotInitialized = 1,
    /// `init` called on a deed that already has a flow
    AlreadyInitialized = 2,
    /// `init_users` called after participants were already populated
    AlreadyStarted = 3,
    /// Operation is not legal in the current deed status
    WrongStatus = 4,
    /// Empty document, exhausted sequence, or a document bound to another step
    InvalidMove = 5,
    /// No step is awaiting completion
    SequenceExhausted = 6,
    /// Insertion position beyond `len + 1`
    OutOfRange = 7,

    // ========== Validation (10-29) ==========
    /// Signer is not a registered participant of this deed
    UnknownSigner = 10,
    /// Participant holds none of the roles the step asks for
    RoleMismatch = 11,
    /// Signer already satisfied this document or this step
    AlreadySigned = 12,
    /// Malformed step template
    InvalidStep = 13,
    /// Participant flags are zero or carry unknown bits
    InvalidFlags = 14,
    /// Parallel argument lists differ in length
    LengthMismatch = 15,
    /// Share assigned to an address that is not a registered buyer
    NotABuyer = 16,
    /// Share out of range, or buyer shares that do not add up
    InvalidShares = 17,
    /// Price must be strictly positive
    InvalidPrice = 18,
    /// Operation not offered by this deed's validation policy
    UnsupportedOperation = 19,

    // ========== Resources (30-39) ==========
    /// Escrow holds less than the agreed price
    InsufficientFunds = 30,
    /// Property is already engaged in another transaction
    PropertyUnavailable = 31,
    /// No participant is flagged as buyer
    NoBuyer = 32,
}

// ================================================================================================
// EVENT CONSTANTS
// ================================================================================================

/// Flow built. Contains: (policy, step count)
pub const DEED_INITIALIZED: Symbol = symbol_short!("deed_init");

/// Property and escrow bound. Contains: (property, escrow, price)
pub const DEED_RESERVED: Symbol = symbol_short!("reserved");

/// Participants populated. Contains: (participant count)
pub const DEED_STARTED: Symbol = symbol_short!("started");

/// Participants upserted on a count-only deed. Contains: (participant count)
pub const USERS_SET: Symbol = symbol_short!("users_set");

/// Buyer shares recorded. Contains: (buyer count)
pub const SHARES_SET: Symbol = symbol_short!("shares");

/// Step inserted. Contains: (step id, index, cursor)
pub const STEP_INSERTED: Symbol = symbol_short!("step_ins");

/// Signatures accepted on a document. Contains: (step id, signer count)
pub const DOCUMENT_SIGNED: Symbol = symbol_short!("signed");

/// Document submitted on a count-only deed. Contains: (step id, submissions)
pub const DOCUMENT_SUBMITTED: Symbol = symbol_short!("submitted");

/// Step completed. Contains: (step id, new cursor)
pub const STEP_DONE: Symbol = symbol_short!("step_done");

/// Settlement confirmed. Contains: (deposited, price)
pub const FEE_PAID: Symbol = symbol_short!("fee_paid");

/// Title reassigned. Contains: (owners)
pub const OWNERSHIP_TRANSFERRED: Symbol = symbol_short!("owner_xfr");

/// Deed cancelled. Contains: (status before rejection)
pub const DEED_REJECTED: Symbol = symbol_short!("rejected");
