//! Scenario execution harness.
//!
//! Owns a vault, an in-memory bank, and a simulated clock; plays scenario
//! steps in order, emulating transaction atomicity by checkpointing the
//! bank before every vault call and restoring it when the call fails. After
//! each step it audits the accounting invariants the vault is supposed to
//! preserve and records any violation verbatim in the report.

use crate::bank::InMemoryBank;
use crate::forwarder::ScriptedForwarder;
use crate::permit::{sign_permit, NonceRegistry, PermitGateway};
use crate::scenario::{Action, Expectation, Scenario, ScenarioStep};
use chrono::{DateTime, Duration, Utc};
use liquivault_core::auth::{AuthContext, Mode, Role};
use liquivault_core::domain::{AccountId, Amount, OrderHash, TokenId};
use liquivault_core::external::TokenEnv;
use liquivault_core::errors::VaultResult;
use liquivault_core::events::VaultEvent;
use liquivault_core::external::ExternalCall;
use liquivault_core::vault::Vault;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A step whose outcome disagreed with the scenario's expectation.
#[derive(Debug, Clone, Serialize)]
pub struct StepMismatch {
    pub index: usize,
    pub expected: Expectation,
    pub got: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps_executed: usize,
    pub mismatches: Vec<StepMismatch>,
    pub violations: Vec<String>,
    pub events: Vec<VaultEvent>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty() && self.violations.is_empty()
    }
}

pub struct Harness {
    pub vault: Vault,
    pub bank: InMemoryBank,
    pub now: DateTime<Utc>,
    admin: AuthContext,
    orchestrator: AuthContext,
    gateway: PermitGateway<NonceRegistry>,
    adapter: AccountId,
    tokens: Vec<TokenId>,
    order_refs: HashMap<u64, OrderHash>,
    violations: Vec<String>,
}

impl Harness {
    pub fn from_scenario(scenario: &Scenario) -> VaultResult<Self> {
        let mut vault = Vault::new(scenario.vault.clone())?;
        let admin = AuthContext::new(AccountId::new("admin"), vec![Role::Admin]);
        let orchestrator = AuthContext::new(
            AccountId::new("orchestrator"),
            vec![Role::Orchestrator, Role::Executor],
        );
        let mut tokens = vec![scenario.vault.reference_token.clone()];
        for token in &scenario.extra_tokens {
            vault.add_supported_token(&admin, token.clone(), scenario.start_time)?;
            tokens.push(token.clone());
        }

        let mut bank = InMemoryBank::new();
        let vault_account = scenario.vault.vault_account.clone();
        for setup in &scenario.accounts {
            bank.mint(&setup.token, &setup.account, setup.balance);
            bank.approve(&setup.token, &setup.account, &vault_account, Amount::MAX)?;
        }
        // The privileged accounts move funds into the vault too (bridge-in,
        // rewards); grant their approvals up front.
        for token in &tokens {
            bank.approve(token, &orchestrator.account, &vault_account, Amount::MAX)?;
            bank.approve(token, &admin.account, &vault_account, Amount::MAX)?;
        }

        Ok(Self {
            vault,
            bank,
            now: scenario.start_time,
            admin,
            orchestrator,
            gateway: PermitGateway::new(AccountId::new("gateway"), NonceRegistry::new()),
            adapter: AccountId::new("adapter"),
            tokens,
            order_refs: HashMap::new(),
            violations: Vec::new(),
        })
    }

    pub fn run(scenario: &Scenario) -> VaultResult<ScenarioReport> {
        let mut harness = Self::from_scenario(scenario)?;
        let mut mismatches = Vec::new();

        info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");
        for (index, step) in scenario.steps.iter().enumerate() {
            if let Some(mismatch) = harness.execute_step(index, step) {
                mismatches.push(mismatch);
            }
            harness.audit(index);
        }

        let report = ScenarioReport {
            name: scenario.name.clone(),
            steps_executed: scenario.steps.len(),
            mismatches,
            violations: harness.violations.clone(),
            events: harness.vault.drain_events(),
        };
        if report.passed() {
            info!(scenario = %scenario.name, "scenario passed");
        } else {
            warn!(
                scenario = %scenario.name,
                mismatches = report.mismatches.len(),
                violations = report.violations.len(),
                "scenario finished with findings"
            );
        }
        Ok(report)
    }

    /// Execute one step, restoring the bank on failure so a failed vault
    /// call leaves no physical side effects, and compare the outcome with
    /// the step's expectation.
    fn execute_step(&mut self, index: usize, step: &ScenarioStep) -> Option<StepMismatch> {
        let checkpoint = self.bank.clone();
        let result = self.apply(&step.action);
        if result.is_err() {
            self.bank = checkpoint;
        }
        debug!(index, outcome = ?result, "step executed");

        match (step.expect, &result) {
            (Expectation::Ok, Ok(())) | (Expectation::Error, Err(_)) => None,
            (Expectation::Ok, Err(e)) => Some(StepMismatch {
                index,
                expected: step.expect,
                got: format!("error: {e}"),
            }),
            (Expectation::Error, Ok(())) => Some(StepMismatch {
                index,
                expected: step.expect,
                got: "ok".into(),
            }),
        }
    }

    fn apply(&mut self, action: &Action) -> VaultResult<()> {
        match action {
            Action::Stake { staker, amount } => {
                let ctx = AuthContext::user(staker.clone());
                self.vault
                    .stake_deposit(&ctx, staker, *amount, self.now, &mut self.bank)
            }
            Action::Withdraw {
                owner,
                receiver,
                amount,
            } => {
                let ctx = AuthContext::user(owner.clone());
                self.vault
                    .stake_withdraw(&ctx, owner, receiver, *amount, self.now, &mut self.bank)
            }
            Action::SubmitReward { from, amount } => {
                let ctx = AuthContext::user(from.clone());
                self.vault
                    .submit_reward(&ctx, *amount, self.now, &mut self.bank)
            }
            Action::Donate { token, amount } => {
                let vault_account = self.vault.config().vault_account.clone();
                self.bank.donate(token, &vault_account, *amount);
                Ok(())
            }
            Action::CreateOrder { order } => {
                let order = order.materialize(self.now);
                let seed = order.seed;
                let hash =
                    self.vault
                        .create_order(&self.orchestrator, order, self.now, &mut self.bank)?;
                self.order_refs.insert(seed, hash);
                Ok(())
            }
            Action::CreateOrderWithPermit { order, nonce } => {
                let order = order.materialize(self.now);
                let seed = order.seed;
                let permit = sign_permit(&order.trader, *nonce);
                let hash = self.gateway.create_order_with_permit(
                    &mut self.vault,
                    &permit,
                    order,
                    self.now,
                    &mut self.bank,
                )?;
                self.order_refs.insert(seed, hash);
                Ok(())
            }
            Action::FillOrder { seed, script } => {
                let hash = self.order_hash(*seed)?;
                let mut forwarder = self.forwarder(script.clone());
                let call = self.call("fill");
                self.vault
                    .fill_order(&self.orchestrator, &hash, &call, &mut forwarder, self.now, &mut self.bank)
                    .map(|_| ())
            }
            Action::RevertOrder { seed } => {
                let hash = self.order_hash(*seed)?;
                self.vault
                    .revert_order(&self.orchestrator, &hash, self.now, &mut self.bank)
                    .map(|_| ())
            }
            Action::ClaimFees { token, receiver } => self
                .vault
                .claim_fees(&self.admin, token, receiver, self.now, &mut self.bank)
                .map(|_| ()),
            Action::Swap {
                token,
                amount,
                receiver,
            } => self.vault.remove_liquidity_swap(
                &self.orchestrator,
                token,
                *amount,
                receiver,
                self.now,
                &mut self.bank,
            ),
            Action::BridgeOut {
                token,
                amount,
                script,
            } => {
                let mut forwarder = self.forwarder(script.clone());
                let call = self.call("bridge-out");
                self.vault
                    .remove_bridge_liquidity(
                        &self.orchestrator,
                        token,
                        *amount,
                        &call,
                        &mut forwarder,
                        self.now,
                        &mut self.bank,
                    )
                    .map(|_| ())
            }
            Action::BridgeIn { token, amount } => self.vault.add_bridge_liquidity(
                &self.orchestrator,
                token,
                *amount,
                self.now,
                &mut self.bank,
            ),
            Action::Rebalance {
                token,
                amount,
                script,
            } => {
                let mut forwarder = self.forwarder(script.clone());
                let call = self.call("rebalance");
                self.vault
                    .rebalance_liquidity(
                        &self.orchestrator,
                        token,
                        *amount,
                        &call,
                        &mut forwarder,
                        self.now,
                        &mut self.bank,
                    )
                    .map(|_| ())
            }
            Action::SetThreshold { bps } => {
                self.vault.set_rebalance_threshold(&self.admin, *bps, self.now)
            }
            Action::SetMode { paused } => {
                let mode = if *paused { Mode::Paused } else { Mode::Active };
                self.vault.set_mode(&self.admin, mode, self.now)
            }
            Action::AddToken { token } => {
                self.vault
                    .add_supported_token(&self.admin, token.clone(), self.now)?;
                self.tokens.push(token.clone());
                Ok(())
            }
            Action::SyncBalance { token } => self
                .vault
                .sync_balance(token, self.now, &mut self.bank)
                .map(|_| ()),
            Action::AdvanceTime { secs } => {
                self.now += Duration::seconds(*secs);
                Ok(())
            }
        }
    }

    fn order_hash(&self, seed: u64) -> VaultResult<OrderHash> {
        self.order_refs.get(&seed).cloned().ok_or_else(|| {
            liquivault_core::errors::VaultError::OrderNotFound(OrderHash(format!("seed:{seed}")))
        })
    }

    fn forwarder(&self, script: crate::forwarder::CallScript) -> ScriptedForwarder {
        let mut forwarder = ScriptedForwarder::new().with(script);
        forwarder.set_vault(self.vault.config().vault_account.clone());
        forwarder
    }

    fn call(&self, payload: &str) -> ExternalCall {
        ExternalCall {
            target: self.adapter.clone(),
            payload: payload.into(),
        }
    }

    /// Accounting invariants checked after every step:
    /// 1. No ledger claims more than the bank actually holds for the vault
    ///    (the physical balance may run ahead while a donation is pending).
    /// 2. Fee counters never exceed the balance backing them.
    /// 3. Staked principal never exceeds the pool's total claim value.
    fn audit(&mut self, index: usize) {
        let vault_account = self.vault.config().vault_account.clone();
        for token in &self.tokens {
            let ledger = match self.vault.ledger(token) {
                Ok(ledger) => ledger,
                Err(e) => {
                    self.violations.push(format!("step {index}: {e}"));
                    continue;
                }
            };
            let physical = self.bank.balance_of(token, &vault_account);
            if ledger.balance > physical {
                self.violations.push(format!(
                    "step {index}: {token} ledger balance {} exceeds physical {physical}",
                    ledger.balance
                ));
            }
            if !ledger.fees_covered() {
                self.violations.push(format!(
                    "step {index}: {token} fee counters exceed balance"
                ));
            }
        }
        if self.vault.total_staked_assets() > self.vault.total_supply() {
            self.violations.push(format!(
                "step {index}: staked principal {} exceeds pool value {}",
                self.vault.total_staked_assets(),
                self.vault.total_supply()
            ));
        }
    }
}
