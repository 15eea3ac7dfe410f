//! Participant Registry local to one deed.
//!
//! Maps each participant address to its role flags, and each buyer to an
//! optional fractional share of the title. Nothing here is shared between
//! deeds.

use soroban_sdk::{log, Address, Env, Map, Vec};

use crate::types::{roles, BuyerShare, Error, OwnerShare};

pub fn validate_flags(flags: u32) -> Result<(), Error> {
    if flags == 0 || flags & !roles::ALL != 0 {
        return Err(Error::InvalidFlags);
    }
    Ok(())
}

pub struct ParticipantRegistry;

impl ParticipantRegistry {
    /// Upserts `addresses` with the matching `flags` into `registry`.
    ///
    /// Only the deed's seller (the title owner recorded at reservation) may
    /// carry the seller flag. The registry is only modified once every entry
    /// has been checked.
    pub fn assign(
        registry: &mut Map<Address, u32>,
        addresses: &Vec<Address>,
        flags: &Vec<u32>,
        seller: &Address,
    ) -> Result<(), Error> {
        let env = registry.env();
        if addresses.len() != flags.len() || addresses.is_empty() {
            log!(env, "Participant lists differ. Addresses: {}, Flags: {}", addresses.len(), flags.len());
            return Err(Error::LengthMismatch);
        }
        for (address, flag) in addresses.iter().zip(flags.iter()) {
            validate_flags(flag).map_err(|err| {
                log!(env, "Invalid role flags {} for {}", flag, address);
                err
            })?;
            if flag & roles::SELLER != 0 && address != *seller {
                log!(env, "Seller flag on an address other than the title owner: {}", address);
                return Err(Error::RoleMismatch);
            }
        }
        for (address, flag) in addresses.iter().zip(flags.iter()) {
            registry.set(address, flag);
        }
        Ok(())
    }

    pub fn with_role(env: &Env, registry: &Map<Address, u32>, role: u32) -> Vec<Address> {
        let mut out = Vec::new(env);
        for (address, flags) in registry.iter() {
            if flags & role != 0 {
                out.push_back(address);
            }
        }
        out
    }

    /// Notaries, brokers and any other party that is neither seller nor buyer.
    pub fn intermediaries(env: &Env, registry: &Map<Address, u32>) -> Vec<Address> {
        let mut out = Vec::new(env);
        for (address, flags) in registry.iter() {
            if flags & (roles::SELLER | roles::BUYER) == 0 {
                out.push_back(address);
            }
        }
        out
    }

    /// Records buyer shares. Each share must be a proper fraction; whether
    /// they add up is only checked when title is split.
    pub fn record_shares(
        registry: &Map<Address, u32>,
        shares: &mut Map<Address, BuyerShare>,
        addresses: &Vec<Address>,
        parts: &Vec<BuyerShare>,
    ) -> Result<(), Error> {
        let env = registry.env();
        if addresses.len() != parts.len() || addresses.is_empty() {
            log!(env, "Share lists differ. Addresses: {}, Shares: {}", addresses.len(), parts.len());
            return Err(Error::LengthMismatch);
        }
        for (address, part) in addresses.iter().zip(parts.iter()) {
            if registry.get(address.clone()).unwrap_or(0) & roles::BUYER == 0 {
                log!(env, "Share assigned to a non-buyer: {}", address);
                return Err(Error::NotABuyer);
            }
            if part.numerator == 0 || part.denominator == 0 || part.numerator > part.denominator {
                log!(env, "Share out of range: {}/{}", part.numerator, part.denominator);
                return Err(Error::InvalidShares);
            }
        }
        for (address, part) in addresses.iter().zip(parts.iter()) {
            shares.set(address, part);
        }
        Ok(())
    }

    /// Computes how recorded title is split among the buyers.
    ///
    /// Without recorded shares every buyer gets an equal part. Once any buyer
    /// has a share, all of them need one, over a single denominator, and the
    /// numerators must add up to it.
    pub fn ownership_split(
        env: &Env,
        registry: &Map<Address, u32>,
        shares: &Map<Address, BuyerShare>,
    ) -> Result<Vec<OwnerShare>, Error> {
        let buyers = Self::with_role(env, registry, roles::BUYER);
        if buyers.is_empty() {
            log!(env, "No buyer to receive the title");
            return Err(Error::NoBuyer);
        }

        let mut split = Vec::new(env);
        let any_share = buyers.iter().any(|buyer| shares.contains_key(buyer));
        if !any_share {
            for owner in buyers.iter() {
                split.push_back(OwnerShare {
                    owner,
                    numerator: 1,
                    denominator: buyers.len(),
                });
            }
            return Ok(split);
        }

        let mut denominator: Option<u32> = None;
        let mut total: u64 = 0;
        for owner in buyers.iter() {
            let share = shares.get(owner.clone()).ok_or(Error::InvalidShares)?;
            match denominator {
                Some(common) if common != share.denominator => return Err(Error::InvalidShares),
                _ => denominator = Some(share.denominator),
            }
            total += share.numerator as u64;
            split.push_back(OwnerShare {
                owner,
                numerator: share.numerator,
                denominator: share.denominator,
            });
        }
        if Some(total) != denominator.map(u64::from) {
            log!(env, "Buyer shares do not add up to the whole title");
            return Err(Error::InvalidShares);
        }
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::{testutils::Address as _, vec};

    struct Parties {
        seller: Address,
        buyer: Address,
        co_buyer: Address,
        notary: Address,
    }

    fn parties(env: &Env) -> Parties {
        Parties {
            seller: Address::generate(env),
            buyer: Address::generate(env),
            co_buyer: Address::generate(env),
            notary: Address::generate(env),
        }
    }

    fn registry(env: &Env, p: &Parties) -> Map<Address, u32> {
        let mut registry = Map::new(env);
        ParticipantRegistry::assign(
            &mut registry,
            &vec![env, p.seller.clone(), p.buyer.clone(), p.co_buyer.clone(), p.notary.clone()],
            &vec![env, roles::SELLER, roles::BUYER, roles::BUYER, roles::NOTARY],
            &p.seller,
        )
        .unwrap();
        registry
    }

    #[test]
    fn test_assign_validates_before_writing() {
        let env = Env::default();
        let p = parties(&env);
        let mut registry = Map::new(&env);

        assert_eq!(
            ParticipantRegistry::assign(
                &mut registry,
                &vec![&env, p.buyer.clone()],
                &vec![&env, roles::BUYER, roles::NOTARY],
                &p.seller,
            ),
            Err(Error::LengthMismatch)
        );
        assert_eq!(
            ParticipantRegistry::assign(
                &mut registry,
                &vec![&env, p.buyer.clone(), p.notary.clone()],
                &vec![&env, roles::BUYER, 1 << 9],
                &p.seller,
            ),
            Err(Error::InvalidFlags)
        );
        assert_eq!(
            ParticipantRegistry::assign(
                &mut registry,
                &vec![&env, p.buyer.clone(), p.notary.clone()],
                &vec![&env, roles::BUYER, roles::SELLER],
                &p.seller,
            ),
            Err(Error::RoleMismatch)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_role_queries() {
        let env = Env::default();
        let p = parties(&env);
        let registry = registry(&env, &p);

        let buyers = ParticipantRegistry::with_role(&env, &registry, roles::BUYER);
        assert_eq!(buyers.len(), 2);
        assert!(buyers.contains(&p.buyer));
        assert!(buyers.contains(&p.co_buyer));

        let intermediaries = ParticipantRegistry::intermediaries(&env, &registry);
        assert_eq!(intermediaries, vec![&env, p.notary.clone()]);
    }

    #[test]
    fn test_equal_split_without_shares() {
        let env = Env::default();
        let p = parties(&env);
        let registry = registry(&env, &p);

        let split = ParticipantRegistry::ownership_split(&env, &registry, &Map::new(&env)).unwrap();
        assert_eq!(split.len(), 2);
        for share in split.iter() {
            assert_eq!((share.numerator, share.denominator), (1, 2));
        }
    }

    #[test]
    fn test_recorded_shares_must_add_up() {
        let env = Env::default();
        let p = parties(&env);
        let registry = registry(&env, &p);
        let mut shares = Map::new(&env);

        ParticipantRegistry::record_shares(
            &registry,
            &mut shares,
            &vec![&env, p.buyer.clone()],
            &vec![&env, BuyerShare { numerator: 3, denominator: 4 }],
        )
        .unwrap();
        assert_eq!(
            ParticipantRegistry::ownership_split(&env, &registry, &shares),
            Err(Error::InvalidShares)
        );

        ParticipantRegistry::record_shares(
            &registry,
            &mut shares,
            &vec![&env, p.co_buyer.clone()],
            &vec![&env, BuyerShare { numerator: 1, denominator: 3 }],
        )
        .unwrap();
        assert_eq!(
            ParticipantRegistry::ownership_split(&env, &registry, &shares),
            Err(Error::InvalidShares)
        );

        ParticipantRegistry::record_shares(
            &registry,
            &mut shares,
            &vec![&env, p.co_buyer.clone()],
            &vec![&env, BuyerShare { numerator: 1, denominator: 4 }],
        )
        .unwrap();
        let split = ParticipantRegistry::ownership_split(&env, &registry, &shares).unwrap();
        let total: u32 = split.iter().map(|s| s.numerator).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_record_shares_rejections() {
        let env = Env::default();
        let p = parties(&env);
        let registry = registry(&env, &p);
        let mut shares = Map::new(&env);
        let half = BuyerShare { numerator: 1, denominator: 2 };

        assert_eq!(
            ParticipantRegistry::record_shares(&registry, &mut shares, &vec![&env, p.notary.clone()], &vec![&env, half]),
            Err(Error::NotABuyer)
        );
        assert_eq!(
            ParticipantRegistry::record_shares(
                &registry,
                &mut shares,
                &vec![&env, p.buyer.clone()],
                &vec![&env, BuyerShare { numerator: 3, denominator: 2 }],
            ),
            Err(Error::InvalidShares)
        );
        assert!(shares.is_empty());
    }

    #[test]
    fn test_split_requires_a_buyer() {
        let env = Env::default();
        let seller = Address::generate(&env);
        let mut registry = Map::new(&env);
        registry.set(seller, roles::SELLER);

        assert_eq!(
            ParticipantRegistry::ownership_split(&env, &registry, &Map::new(&env)),
            Err(Error::NoBuyer)
        );
    }
}
