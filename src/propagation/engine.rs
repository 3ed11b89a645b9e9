//! Propagation engine: mint-on-distribute
//!
//! Distributing a unit never debits the distributor: every recipient gets a
//! freshly minted unit, the type's circulating supply grows by one, and a
//! provenance edge one generation beyond the distributor is recorded.
//!
//! Work is split in two. `plan` / `plan_initial` take `&self` and perform
//! every check; `apply` takes a plan and cannot fail. A batch therefore
//! either commits completely or not at all.

use super::generation::{Generation, GenerationTable, GenerationUpdate};
use super::provenance::ProvenanceLog;
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::holdings::Holdings;
use crate::identity::{Identity, TokenTypeId};
use crate::token::TokenType;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

/// A validated propagation batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationPlan {
    token_type: TokenTypeId,
    distributor: Identity,
    generation: Generation,
    recipients: Vec<Identity>,
}

impl PropagationPlan {
    pub fn token_type(&self) -> TokenTypeId {
        self.token_type
    }

    pub fn distributor(&self) -> &Identity {
        &self.distributor
    }

    /// Generation every edge of the batch will carry
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn recipients(&self) -> &[Identity] {
        &self.recipients
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropagationEngine {
    generations: GenerationTable,
    provenance: ProvenanceLog,
}

impl PropagationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generations(&self) -> &GenerationTable {
        &self.generations
    }

    pub fn provenance(&self) -> &ProvenanceLog {
        &self.provenance
    }

    /// Validate a `propagate` call by a current holder
    pub fn plan(
        &self,
        token: &TokenType,
        holdings: &Holdings,
        distributor: &Identity,
        recipients: &[Identity],
    ) -> LedgerResult<PropagationPlan> {
        if !token.policy().allow_propagation {
            return Err(LedgerError::PropagationDisabled(token.id()));
        }
        let not_a_holder = || LedgerError::NotAHolder {
            token_type: token.id(),
            holder: distributor.clone(),
        };
        if !holdings.is_holder(token.id(), distributor) {
            return Err(not_a_holder());
        }
        // every identity that has received a unit has a generation record
        let distributor_generation = self
            .generations
            .get(token.id(), distributor)
            .ok_or_else(not_a_holder)?;

        Self::plan_batch(
            token,
            distributor,
            distributor_generation,
            token.circulating_supply(),
            recipients,
        )
    }

    /// Validate the initial distribution of a type that is being created.
    ///
    /// The creator's own unit is not minted yet but already counts toward
    /// the ceiling. The type's propagation flag is not consulted.
    pub fn plan_initial(
        &self,
        token: &TokenType,
        recipients: &[Identity],
    ) -> LedgerResult<PropagationPlan> {
        Self::plan_batch(token, token.creator(), Generation::ORIGIN, 1, recipients)
    }

    fn plan_batch(
        token: &TokenType,
        distributor: &Identity,
        distributor_generation: Generation,
        circulating: u64,
        recipients: &[Identity],
    ) -> LedgerResult<PropagationPlan> {
        if let Some(looped) = recipients.iter().find(|r| *r == distributor) {
            return Err(LedgerError::SelfPropagation(looped.clone()));
        }

        let requested = recipients.len() as u64;
        if requested > token.supply_ceiling().saturating_sub(circulating) {
            return Err(LedgerError::SupplyExceeded {
                ceiling: token.supply_ceiling(),
                circulating,
                requested,
            });
        }

        let generation = distributor_generation.next().ok_or(LedgerError::Overflow)?;

        Ok(PropagationPlan {
            token_type: token.id(),
            distributor: distributor.clone(),
            generation,
            recipients: recipients.to_vec(),
        })
    }

    /// Record the creator of a new type at the origin generation
    pub(crate) fn seed_origin(&mut self, token_type: TokenTypeId, creator: &Identity) {
        self.generations.offer(token_type, creator, Generation::ORIGIN);
    }

    /// Commit a plan: mint, record edges, lower generations
    pub(crate) fn apply(
        &mut self,
        plan: PropagationPlan,
        token: &mut TokenType,
        holdings: &mut Holdings,
        now: DateTime<Utc>,
    ) -> Vec<LedgerEvent> {
        debug_assert_eq!(plan.token_type, token.id());
        token.add_circulating(plan.recipients.len() as u64);

        let mut events = Vec::with_capacity(plan.recipients.len());
        for recipient in plan.recipients {
            holdings.issue(plan.token_type, &recipient, 1);
            self.provenance
                .append(plan.token_type, &plan.distributor, &recipient, plan.generation, now);

            match self.generations.offer(plan.token_type, &recipient, plan.generation) {
                GenerationUpdate::First => {
                    debug!("{} reached {} at {}", plan.token_type, recipient, plan.generation)
                }
                GenerationUpdate::Lowered { previous } => debug!(
                    "{} shortened path to {}: {} -> {}",
                    plan.token_type, recipient, previous, plan.generation
                ),
                GenerationUpdate::Kept { .. } => {}
            }

            events.push(LedgerEvent::UnitPropagated {
                token_type: plan.token_type,
                from: plan.distributor.clone(),
                to: recipient,
                generation: plan.generation,
            });
        }
        events
    }

    /// Generation a relinquishment recipient is offered: one hop beyond the sender
    pub fn handoff_generation(&self, token_type: TokenTypeId, from: &Identity) -> Option<Generation> {
        self.generations.get(token_type, from).and_then(Generation::next)
    }

    pub(crate) fn record_handoff(
        &mut self,
        token_type: TokenTypeId,
        to: &Identity,
        generation: Generation,
    ) {
        self.generations.offer(token_type, to, generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{NewTokenType, TokenPolicy};

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    /// A type created by alice with her origin unit already minted
    fn setup(ceiling: u64, policy: TokenPolicy) -> (PropagationEngine, TokenType, Holdings) {
        let draft = NewTokenType::new("taught me to sail", ceiling).with_policy(policy);
        let mut token = TokenType::new(TokenTypeId::FIRST, id("alice"), &draft, Utc::now());
        let mut holdings = Holdings::new();
        let mut engine = PropagationEngine::new();
        token.add_circulating(1);
        holdings.issue(token.id(), &id("alice"), 1);
        engine.seed_origin(token.id(), &id("alice"));
        (engine, token, holdings)
    }

    #[test]
    fn test_propagation_is_additive() {
        let (mut engine, mut token, mut holdings) = setup(5, TokenPolicy::propagating());
        let plan = engine.plan(&token, &holdings, &id("alice"), &[id("bob")]).unwrap();
        let events = engine.apply(plan, &mut token, &mut holdings, Utc::now());

        assert_eq!(events.len(), 1);
        assert_eq!(holdings.holding_of(token.id(), &id("alice")), 1);
        assert_eq!(holdings.holding_of(token.id(), &id("bob")), 1);
        assert_eq!(token.circulating_supply(), 2);
        assert_eq!(engine.generations().get(token.id(), &id("bob")), Some(Generation::new(1)));
    }

    #[test]
    fn test_plan_rejections() {
        let (engine, token, holdings) = setup(2, TokenPolicy::propagating());

        assert!(matches!(
            engine.plan(&token, &holdings, &id("mallory"), &[id("bob")]),
            Err(LedgerError::NotAHolder { .. })
        ));
        assert_eq!(
            engine.plan(&token, &holdings, &id("alice"), &[id("bob"), id("alice")]),
            Err(LedgerError::SelfPropagation(id("alice")))
        );
        assert_eq!(
            engine.plan(&token, &holdings, &id("alice"), &[id("bob"), id("carol")]),
            Err(LedgerError::SupplyExceeded { ceiling: 2, circulating: 1, requested: 2 })
        );
    }

    #[test]
    fn test_disabled_policy_checked_first() {
        let (engine, token, holdings) = setup(2, TokenPolicy::sealed());
        assert_eq!(
            engine.plan(&token, &holdings, &id("mallory"), &[id("mallory")]),
            Err(LedgerError::PropagationDisabled(token.id()))
        );
        // the initial distribution ignores the flag
        assert!(engine.plan_initial(&token, &[id("bob")]).is_ok());
    }

    #[test]
    fn test_initial_plan_counts_creator_unit() {
        let draft = NewTokenType::new("welcome", 2);
        let token = TokenType::new(TokenTypeId::FIRST, id("alice"), &draft, Utc::now());
        let engine = PropagationEngine::new();

        let plan = engine.plan_initial(&token, &[id("bob")]).unwrap();
        assert_eq!(plan.generation(), Generation::new(1));
        assert_eq!(plan.distributor(), &id("alice"));
        assert!(matches!(
            engine.plan_initial(&token, &[id("bob"), id("carol")]),
            Err(LedgerError::SupplyExceeded { .. })
        ));
    }

    #[test]
    fn test_handoff_generation() {
        let (engine, token, _) = setup(3, TokenPolicy::propagating());
        assert_eq!(engine.handoff_generation(token.id(), &id("alice")), Some(Generation::new(1)));
        assert_eq!(engine.handoff_generation(token.id(), &id("nobody")), None);
    }
}
