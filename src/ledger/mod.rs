//! Ledger: the explicit context every operation runs against
//!
//! Owns the registry, holdings and propagation tables plus the event
//! outbox. Each mutating call validates everything (and asks receive hooks)
//! through `&self` first, then commits with writes that cannot fail, so a
//! call either lands completely or leaves no trace.

mod audit;
mod shared;

pub use audit::InvariantViolation;
pub use shared::SharedLedger;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventRecord, LedgerEvent};
use crate::gate;
use crate::holdings::Holdings;
use crate::hooks::{ReceiptKind, ReceiptNotice, ReceiveHook};
use crate::identity::{Identity, TokenTypeId};
use crate::propagation::{Generation, PropagationEngine, PropagationPlan};
use crate::token::{NewTokenType, TokenPolicy, TokenRegistry, TokenType};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default, Serialize, Deserialize)]
pub struct Ledger {
    config: LedgerConfig,
    registry: TokenRegistry,
    holdings: Holdings,
    engine: PropagationEngine,
    /// Committed events not yet handed to an indexer
    #[serde(default)]
    outbox: Vec<EventRecord>,
    #[serde(default)]
    last_sequence: u64,
    #[serde(skip)]
    hooks: BTreeMap<Identity, Arc<dyn ReceiveHook>>,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LedgerConfig) {
        self.config = config;
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    pub fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    /// Consult `hook` before `identity` receives any unit
    pub fn register_hook(&mut self, identity: Identity, hook: Arc<dyn ReceiveHook>) {
        self.hooks.insert(identity, hook);
    }

    pub fn remove_hook(&mut self, identity: &Identity) -> bool {
        self.hooks.remove(identity).is_some()
    }

    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Register a new token type, give the caller its origin unit and
    /// distribute one unit to each initial recipient.
    pub fn create(&mut self, caller: &Identity, draft: NewTokenType) -> LedgerResult<TokenTypeId> {
        let result = self.try_create(caller, &draft);
        match &result {
            Ok(id) => info!(
                "{} created {} (ceiling {}, {} initial recipients)",
                caller,
                id,
                draft.supply_ceiling,
                draft.initial_recipients.len()
            ),
            Err(e) => warn!("create by {} rejected: {}", caller, e),
        }
        result
    }

    fn try_create(&mut self, caller: &Identity, draft: &NewTokenType) -> LedgerResult<TokenTypeId> {
        TokenRegistry::validate(draft, &self.config)?;
        self.check_batch(draft.initial_recipients.len())?;

        let now = Utc::now();
        let id = self.registry.next_id();
        let mut token = TokenType::new(id, caller.clone(), draft, now);
        let plan = self.engine.plan_initial(&token, &draft.initial_recipients)?;

        let mut notices = vec![ReceiptNotice {
            token_type: id,
            kind: ReceiptKind::Creation,
            from: None,
            to: caller.clone(),
            amount: 1,
        }];
        notices.extend(propagation_notices(&plan));
        self.consult_hooks(&notices)?;

        // commit
        token.add_circulating(1);
        self.holdings.issue(id, caller, 1);
        self.engine.seed_origin(id, caller);

        let mut events = vec![LedgerEvent::TypeCreated {
            token_type: id,
            creator: caller.clone(),
            supply_ceiling: draft.supply_ceiling,
            initial_recipients: draft.initial_recipients.clone(),
        }];
        events.extend(self.engine.apply(plan, &mut token, &mut self.holdings, now));
        self.registry.insert(token);
        self.commit_events(events, now);
        Ok(id)
    }

    /// Mint one new unit to every recipient on behalf of `distributor`.
    ///
    /// Returns the generation the new edges carry. The distributor's own
    /// balance is untouched.
    pub fn propagate(
        &mut self,
        token_type: TokenTypeId,
        distributor: &Identity,
        recipients: &[Identity],
    ) -> LedgerResult<Generation> {
        let result = self.try_propagate(token_type, distributor, recipients);
        match &result {
            Ok(generation) => info!(
                "{} propagated {} to {} recipient(s) at {}",
                distributor,
                token_type,
                recipients.len(),
                generation
            ),
            Err(e) => warn!("propagate {} by {} rejected: {}", token_type, distributor, e),
        }
        result
    }

    fn try_propagate(
        &mut self,
        token_type: TokenTypeId,
        distributor: &Identity,
        recipients: &[Identity],
    ) -> LedgerResult<Generation> {
        let token = self.registry.require(token_type)?;
        self.check_batch(recipients.len())?;
        let plan = self.engine.plan(token, &self.holdings, distributor, recipients)?;
        self.consult_hooks(&propagation_notices(&plan))?;

        // commit
        let now = Utc::now();
        let generation = plan.generation();
        let token = self
            .registry
            .get_mut(token_type)
            .ok_or(LedgerError::UnknownTokenType(token_type))?;
        let events = self.engine.apply(plan, token, &mut self.holdings, now);
        self.commit_events(events, now);
        Ok(generation)
    }

    /// Hand `amount` existing units from `from` to `to`; only on opted-in types
    pub fn relinquish(
        &mut self,
        token_type: TokenTypeId,
        from: &Identity,
        to: &Identity,
        amount: u64,
        caller: &Identity,
    ) -> LedgerResult<()> {
        let result = self.try_relinquish(token_type, from, to, amount, caller);
        match &result {
            Ok(()) => info!("{} relinquished {} x{} to {}", from, token_type, amount, to),
            Err(e) => warn!("relinquish {} by {} rejected: {}", token_type, caller, e),
        }
        result
    }

    fn try_relinquish(
        &mut self,
        token_type: TokenTypeId,
        from: &Identity,
        to: &Identity,
        amount: u64,
        caller: &Identity,
    ) -> LedgerResult<()> {
        let token = self.registry.require(token_type)?;
        let plan = gate::check_relinquish(token, &self.holdings, &self.engine, from, to, amount, caller)?;
        self.consult_hooks(&[ReceiptNotice {
            token_type,
            kind: ReceiptKind::Relinquishment,
            from: Some(plan.from.clone()),
            to: plan.to.clone(),
            amount: plan.amount,
        }])?;

        // commit
        let now = Utc::now();
        self.holdings.transfer(token_type, &plan.from, &plan.to, plan.amount);
        self.engine.record_handoff(token_type, &plan.to, plan.to_generation);
        self.commit_events(
            vec![LedgerEvent::UnitRelinquished {
                token_type,
                from: plan.from,
                to: plan.to,
                amount: plan.amount,
            }],
            now,
        );
        Ok(())
    }

    /// Change a type's policy flags; creator only
    pub fn update_policy(
        &mut self,
        token_type: TokenTypeId,
        policy: TokenPolicy,
        caller: &Identity,
    ) -> LedgerResult<()> {
        if let Err(e) = self.registry.check_policy_update(token_type, caller) {
            warn!("policy update on {} by {} rejected: {}", token_type, caller, e);
            return Err(e);
        }

        self.registry.set_policy(token_type, policy);
        self.commit_events(
            vec![LedgerEvent::PolicyUpdated {
                token_type,
                allow_propagation: policy.allow_propagation,
                allow_relinquish: policy.allow_relinquish,
            }],
            Utc::now(),
        );
        info!(
            "{} set policy of {}: propagate={} relinquish={}",
            caller, token_type, policy.allow_propagation, policy.allow_relinquish
        );
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Committed events not yet drained
    pub fn pending_events(&self) -> &[EventRecord] {
        &self.outbox
    }

    /// Hand all committed events to the caller, emptying the outbox
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.outbox)
    }

    fn commit_events(&mut self, events: Vec<LedgerEvent>, now: DateTime<Utc>) {
        for event in events {
            self.last_sequence += 1;
            self.outbox.push(EventRecord::new(self.last_sequence, event, now));
        }
    }

    // =========================================================================
    // Checks shared by the mutating operations
    // =========================================================================

    fn check_batch(&self, len: usize) -> LedgerResult<()> {
        if len > self.config.max_batch_size {
            return Err(LedgerError::BatchTooLarge {
                len,
                max: self.config.max_batch_size,
            });
        }
        Ok(())
    }

    fn consult_hooks(&self, notices: &[ReceiptNotice]) -> LedgerResult<()> {
        for notice in notices {
            if let Some(hook) = self.hooks.get(&notice.to) {
                if !hook.on_receive(self, notice) {
                    return Err(LedgerError::ReceiverRejected(notice.to.clone()));
                }
            }
        }
        Ok(())
    }
}

fn propagation_notices(plan: &PropagationPlan) -> Vec<ReceiptNotice> {
    plan.recipients()
        .iter()
        .map(|to| ReceiptNotice {
            token_type: plan.token_type(),
            kind: ReceiptKind::Propagation,
            from: Some(plan.distributor().clone()),
            to: to.clone(),
            amount: 1,
        })
        .collect()
}
