//! Action Validator.
//!
//! Decides whether a document submitted against a step is acceptable and
//! whether the step is now complete. The policy is picked once per deed:
//!
//! - `SignatureGated`: every listed signer must be a registered participant
//!   holding one of the step's roles and must authorize the document id.
//!   Signatures accumulate per role category until each category reaches its
//!   minimum.
//! - `CountOnly`: the controller submits document ids and distinct ids are
//!   counted. Resubmitting a loaded id is accepted and ignored.
//!
//! Nothing here touches storage. Callers load the document and progress
//! records, run the validator, and persist what it hands back only when it
//! returns `Ok`.

use soroban_sdk::{log, Address, BytesN, Env, IntoVal, Map, Vec};

use crate::types::{Error, SignedDocument, StepDefinition, StepProgress, ValidationPolicy};

/// Records produced by an accepted call, ready to be written back.
pub struct Accepted {
    pub document: SignedDocument,
    pub progress: StepProgress,
    pub complete: bool,
}

impl StepProgress {
    pub fn new(env: &Env) -> Self {
        StepProgress {
            primary: 0,
            secondary: 0,
            either: 0,
            submissions: 0,
            credited: Vec::new(env),
        }
    }

    /// Signature-gated steps are satisfied once both categories can be
    /// covered without counting any `either` signature twice.
    pub fn is_satisfied(&self, step: &StepDefinition, policy: ValidationPolicy) -> bool {
        match policy {
            ValidationPolicy::SignatureGated => {
                let required = step.required;
                self.primary.saturating_add(self.either) >= required.primary
                    && self.secondary.saturating_add(self.either) >= required.secondary
                    && self
                        .primary
                        .saturating_add(self.secondary)
                        .saturating_add(self.either)
                        >= required.total()
            }
            ValidationPolicy::CountOnly => self.submissions >= step.required.total(),
        }
    }

    /// Credits one signature whose roles intersect the step in `matching`.
    ///
    /// On a single-role step a signer holding both categories is recorded
    /// as `either`, to be assigned to whichever category ends up short.
    pub fn credit(&mut self, step: &StepDefinition, matching: u32) {
        let (primary, secondary) = categories(step.roles);
        let holds_primary = matching & primary != 0;
        let holds_secondary = matching & secondary != 0;
        if step.is_single_role() && holds_primary && holds_secondary {
            self.either += 1;
            return;
        }
        if holds_primary {
            self.primary += 1;
        }
        if holds_secondary {
            self.secondary += 1;
        }
    }
}

/// Splits a step's role mask into its primary (lowest bit) and secondary
/// categories.
pub fn categories(roles: u32) -> (u32, u32) {
    let primary = roles & roles.wrapping_neg();
    (primary, roles & !primary)
}

pub fn is_empty_document(document_id: &BytesN<32>) -> bool {
    document_id.to_array() == [0u8; 32]
}

pub struct ActionValidator;

impl ActionValidator {
    /// Signature-gated validation of `signers` on `document_id`.
    ///
    /// All checks run before any signer is asked to authorize, so a rejected
    /// call leaves both records untouched.
    pub fn sign(
        env: &Env,
        step: &StepDefinition,
        document_id: &BytesN<32>,
        signers: &Vec<Address>,
        participants: &Map<Address, u32>,
        document: Option<SignedDocument>,
        progress: StepProgress,
    ) -> Result<Accepted, Error> {
        if is_empty_document(document_id) || signers.is_empty() {
            log!(env, "Empty document id or signer list on step {}", step.id);
            return Err(Error::InvalidMove);
        }
        let mut document = match document {
            Some(existing) if existing.step != step.id => {
                log!(env, "Document bound to step {}, current step {}", existing.step, step.id);
                return Err(Error::InvalidMove);
            }
            Some(existing) => existing,
            None => SignedDocument {
                step: step.id,
                signers: Vec::new(env),
            },
        };

        let mut credits: Vec<u32> = Vec::new(env);
        for (index, signer) in signers.iter().enumerate() {
            let flags = match participants.get(signer.clone()) {
                Some(flags) => flags,
                None => {
                    log!(env, "Unknown signer: {}", signer);
                    return Err(Error::UnknownSigner);
                }
            };
            let matching = flags & step.roles;
            if matching == 0 {
                log!(env, "Signer holds none of the step roles. Signer: {}, Roles: {}", signer, step.roles);
                return Err(Error::RoleMismatch);
            }
            if document.signers.contains(&signer)
                || progress.credited.contains(&signer)
                || signers.first_index_of(&signer) != Some(index as u32)
            {
                log!(env, "Signer already counted on step {}: {}", step.id, signer);
                return Err(Error::AlreadySigned);
            }
            credits.push_back(matching);
        }

        let mut progress = progress;
        for (signer, matching) in signers.iter().zip(credits.iter()) {
            signer.require_auth_for_args((document_id.clone(),).into_val(env));
            progress.credit(step, matching);
            document.signers.push_back(signer.clone());
            progress.credited.push_back(signer);
        }

        let complete = progress.is_satisfied(step, ValidationPolicy::SignatureGated);
        Ok(Accepted {
            document,
            progress,
            complete,
        })
    }

    /// Count-only validation. Returns `None` for a document that is already
    /// loaded, which the caller treats as a no-op.
    pub fn submit(
        env: &Env,
        step: &StepDefinition,
        document_id: &BytesN<32>,
        document: Option<SignedDocument>,
        progress: StepProgress,
    ) -> Result<Option<Accepted>, Error> {
        if is_empty_document(document_id) {
            return Err(Error::InvalidMove);
        }
        if document.is_some() {
            return Ok(None);
        }

        let mut progress = progress;
        progress.submissions += 1;
        let complete = progress.is_satisfied(step, ValidationPolicy::CountOnly);
        Ok(Some(Accepted {
            document: SignedDocument {
                step: step.id,
                signers: Vec::new(env),
            },
            progress,
            complete,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{roles, step_flags, RequiredCount};
    use soroban_sdk::{testutils::Address as _, vec, BytesN};

    fn step(env: &Env, roles: u32, primary: u32, secondary: u32) -> StepDefinition {
        StepDefinition {
            id: 7,
            selector: BytesN::from_array(env, &[0, 0, 0, 1]),
            roles,
            required: RequiredCount { primary, secondary },
            flags: 0,
            done: false,
        }
    }

    fn doc(env: &Env, byte: u8) -> BytesN<32> {
        BytesN::from_array(env, &[byte; 32])
    }

    #[test]
    fn test_categories_split_lowest_bit_first() {
        assert_eq!(categories(roles::SELLER | roles::NOTARY), (roles::SELLER, roles::NOTARY));
        assert_eq!(categories(roles::BUYER), (roles::BUYER, 0));
        assert_eq!(categories(roles::BROKER | roles::BUYER), (roles::BUYER, roles::BROKER));
    }

    #[test]
    fn test_threshold_gating() {
        let env = Env::default();
        let two_sided = step(&env, roles::SELLER | roles::BUYER, 2, 1);
        let mut progress = StepProgress::new(&env);

        progress.primary = 1;
        progress.secondary = 5;
        assert!(!progress.is_satisfied(&two_sided, ValidationPolicy::SignatureGated));

        progress.primary = 2;
        assert!(progress.is_satisfied(&two_sided, ValidationPolicy::SignatureGated));

        progress.secondary = 0;
        assert!(!progress.is_satisfied(&two_sided, ValidationPolicy::SignatureGated));
    }

    #[test]
    fn test_count_only_needs_total() {
        let env = Env::default();
        let two_sided = step(&env, roles::SELLER | roles::BUYER, 1, 1);
        let mut progress = StepProgress::new(&env);

        progress.submissions = 1;
        assert!(!progress.is_satisfied(&two_sided, ValidationPolicy::CountOnly));
        progress.submissions = 2;
        assert!(progress.is_satisfied(&two_sided, ValidationPolicy::CountOnly));
    }

    #[test]
    fn test_sign_rejections() {
        let env = Env::default();
        let seller = Address::generate(&env);
        let buyer = Address::generate(&env);
        let stranger = Address::generate(&env);
        let mut participants = Map::new(&env);
        participants.set(seller.clone(), roles::SELLER);
        participants.set(buyer.clone(), roles::BUYER);
        let seller_only = step(&env, roles::SELLER, 1, 0);

        let sign = |signers: Vec<Address>, document: Option<SignedDocument>, id: &BytesN<32>| {
            ActionValidator::sign(
                &env,
                &seller_only,
                id,
                &signers,
                &participants,
                document,
                StepProgress::new(&env),
            )
            .err()
        };

        assert_eq!(sign(vec![&env, seller.clone()], None, &doc(&env, 0)), Some(Error::InvalidMove));
        assert_eq!(sign(Vec::new(&env), None, &doc(&env, 1)), Some(Error::InvalidMove));
        assert_eq!(sign(vec![&env, stranger], None, &doc(&env, 1)), Some(Error::UnknownSigner));
        assert_eq!(sign(vec![&env, buyer], None, &doc(&env, 1)), Some(Error::RoleMismatch));
        assert_eq!(
            sign(vec![&env, seller.clone(), seller.clone()], None, &doc(&env, 1)),
            Some(Error::AlreadySigned)
        );

        let signed = SignedDocument {
            step: 7,
            signers: vec![&env, seller.clone()],
        };
        assert_eq!(
            sign(vec![&env, seller.clone()], Some(signed), &doc(&env, 1)),
            Some(Error::AlreadySigned)
        );

        let other_step = SignedDocument {
            step: 3,
            signers: Vec::new(&env),
        };
        assert_eq!(
            sign(vec![&env, seller], Some(other_step), &doc(&env, 1)),
            Some(Error::InvalidMove)
        );
    }

    #[test]
    fn test_sign_rejects_signer_credited_through_other_document() {
        let env = Env::default();
        let seller = Address::generate(&env);
        let mut participants = Map::new(&env);
        participants.set(seller.clone(), roles::SELLER);
        let seller_only = step(&env, roles::SELLER, 2, 0);
        let mut progress = StepProgress::new(&env);
        progress.primary = 1;
        progress.credited.push_back(seller.clone());

        let result = ActionValidator::sign(
            &env,
            &seller_only,
            &doc(&env, 2),
            &vec![&env, seller],
            &participants,
            None,
            progress,
        );
        assert_eq!(result.err(), Some(Error::AlreadySigned));
    }

    #[test]
    fn test_single_role_dual_signer_covers_short_category() {
        let env = Env::default();
        let mut single = step(&env, roles::BUYER | roles::NOTARY, 1, 1);
        single.flags = step_flags::SINGLE_ROLE;

        // Buyer first, then a buyer who is also the notary.
        let mut progress = StepProgress::new(&env);
        progress.credit(&single, roles::BUYER);
        assert!(!progress.is_satisfied(&single, ValidationPolicy::SignatureGated));
        progress.credit(&single, roles::BUYER | roles::NOTARY);
        assert_eq!((progress.primary, progress.secondary, progress.either), (1, 0, 1));
        assert!(progress.is_satisfied(&single, ValidationPolicy::SignatureGated));

        // Same two signers in the opposite order.
        let mut progress = StepProgress::new(&env);
        progress.credit(&single, roles::BUYER | roles::NOTARY);
        assert!(!progress.is_satisfied(&single, ValidationPolicy::SignatureGated));
        progress.credit(&single, roles::BUYER);
        assert!(progress.is_satisfied(&single, ValidationPolicy::SignatureGated));
    }

    #[test]
    fn test_single_role_dual_signer_alone_is_not_enough() {
        let env = Env::default();
        let mut single = step(&env, roles::BUYER | roles::NOTARY, 1, 1);
        single.flags = step_flags::SINGLE_ROLE;
        let mut progress = StepProgress::new(&env);

        progress.credit(&single, roles::BUYER | roles::NOTARY);
        assert_eq!((progress.primary, progress.secondary, progress.either), (0, 0, 1));
        assert!(!progress.is_satisfied(&single, ValidationPolicy::SignatureGated));

        progress.credit(&single, roles::BUYER);
        progress.credit(&single, roles::BUYER);
        assert_eq!(progress.primary, 2);
        assert!(progress.is_satisfied(&single, ValidationPolicy::SignatureGated));
    }

    #[test]
    fn test_dual_signer_credits_both_without_single_role() {
        let env = Env::default();
        let both = step(&env, roles::BUYER | roles::NOTARY, 1, 1);
        let mut progress = StepProgress::new(&env);

        progress.credit(&both, roles::BUYER | roles::NOTARY);
        assert_eq!((progress.primary, progress.secondary, progress.either), (1, 1, 0));
        assert!(progress.is_satisfied(&both, ValidationPolicy::SignatureGated));
    }

    #[test]
    fn test_submit_counts_distinct_documents() {
        let env = Env::default();
        let two = step(&env, roles::SELLER | roles::BUYER, 1, 1);

        let first = ActionValidator::submit(&env, &two, &doc(&env, 1), None, StepProgress::new(&env))
            .unwrap()
            .unwrap();
        assert_eq!(first.progress.submissions, 1);
        assert!(!first.complete);
        assert_eq!(first.document.step, 7);

        let repeat = ActionValidator::submit(
            &env,
            &two,
            &doc(&env, 1),
            Some(first.document.clone()),
            first.progress.clone(),
        )
        .unwrap();
        assert!(repeat.is_none());

        let second = ActionValidator::submit(&env, &two, &doc(&env, 2), None, first.progress)
            .unwrap()
            .unwrap();
        assert_eq!(second.progress.submissions, 2);
        assert!(second.complete);

        assert_eq!(
            ActionValidator::submit(&env, &two, &doc(&env, 0), None, StepProgress::new(&env)).err(),
            Some(Error::InvalidMove)
        );
    }
}
