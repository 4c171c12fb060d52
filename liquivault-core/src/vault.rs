//! Vault façade: composes the ledgers, share pool, order book, availability
//! calculator, and bridge rebalancer behind the public operations.
//!
//! Every operation is check-then-act within one call: all guards run before
//! any ledger mutation, so a failed operation commits nothing to the vault.
//! External calls are wrapped so the vault never retains a dangling approval
//! and always re-reads its own balances afterward instead of trusting the
//! forwarder's self-reported outcome.

use crate::auth::{ensure_active, ensure_role, AuthContext, Mode, Role};
use crate::domain::{bps_share, Amount, Order, OrderHash, OrderRecord, TokenId};
use crate::errors::{VaultError, VaultResult};
use crate::events::VaultEvent;
use crate::external::{CallForwarder, CallOutcome, CircuitBreaker, ExternalCall, TokenEnv};
use crate::ledger::{LedgerBook, SharePool, TokenLedger};
use crate::liquidity;
use crate::orders::OrderBook;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static vault parameters. Durations are plain seconds so the config
/// serializes into snapshots and scenario files without ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// The vault's own identity in the token environment.
    pub vault_account: crate::domain::AccountId,
    /// The staked reference stablecoin.
    pub reference_token: TokenId,
    /// Fraction of staked capital orchestrators may move, in basis points.
    pub rebalance_threshold_bps: u64,
    /// Cooldown past the fill deadline before an order may be reverted.
    pub order_revert_buffer_secs: i64,
    /// Maximum distance of a fill deadline from order creation.
    pub max_order_time_secs: i64,
    /// Fraction of the reserved fee retained on revert, in basis points.
    pub revert_fee_keep_bps: u64,
}

impl VaultConfig {
    pub fn order_revert_buffer(&self) -> Duration {
        Duration::seconds(self.order_revert_buffer_secs)
    }

    pub fn max_order_time(&self) -> Duration {
        Duration::seconds(self.max_order_time_secs)
    }
}

/// Net balance movement of one token across an external call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    pub outflow: Amount,
    pub inflow: Amount,
}

pub struct Vault {
    config: VaultConfig,
    mode: Mode,
    total_staked_assets: Amount,
    ledgers: LedgerBook,
    pool: SharePool,
    orders: OrderBook,
    breaker: Option<CircuitBreaker>,
    events: Vec<VaultEvent>,
}

impl Vault {
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        liquidity::validate_threshold(config.rebalance_threshold_bps)?;
        liquidity::validate_threshold(config.revert_fee_keep_bps)?;
        let mut ledgers = LedgerBook::new();
        ledgers.register(config.reference_token.clone())?;
        Ok(Self {
            config,
            mode: Mode::Active,
            total_staked_assets: 0,
            ledgers,
            pool: SharePool::new(),
            orders: OrderBook::new(),
            breaker: None,
            events: Vec::new(),
        })
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn total_staked_assets(&self) -> Amount {
        self.total_staked_assets
    }

    pub fn ledger(&self, token: &TokenId) -> VaultResult<&TokenLedger> {
        self.ledgers.get(token)
    }

    pub fn is_supported(&self, token: &TokenId) -> bool {
        self.ledgers.is_supported(token)
    }

    pub fn order(&self, hash: &OrderHash) -> VaultResult<&OrderRecord> {
        self.orders.get(hash)
    }

    pub fn order_book(&self) -> &OrderBook {
        &self.orders
    }

    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    /// The redemption buffer for the reference token, derived live.
    pub fn min_asset_balance(&self) -> Amount {
        liquidity::min_asset_balance(self.total_staked_assets, self.config.rebalance_threshold_bps)
    }

    /// How much of `token` may leave right now. For the reference token the
    /// floor is the staked-capital buffer plus the fee counters; for other
    /// tokens only the fee counters.
    pub fn available_assets(&self, token: &TokenId) -> VaultResult<Amount> {
        let ledger = self.ledgers.get(token)?;
        let mut floor = ledger.fee_total();
        if *token == self.config.reference_token {
            floor = floor
                .checked_add(self.min_asset_balance())
                .ok_or(VaultError::MathOverflow)?;
        }
        Ok(liquidity::available_assets(ledger.balance, floor))
    }

    // ── Staking ──────────────────────────────────────────────────────

    /// Pull `amount` of the reference stablecoin from the caller and mint
    /// the receiver an asset-denominated claim at the current pool ratio.
    pub fn stake_deposit(
        &mut self,
        ctx: &AuthContext,
        receiver: &crate::domain::AccountId,
        amount: Amount,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        self.guard_price(now)?;
        // Fold any pending donation into the ratio before minting.
        self.absorb_reference_surplus(env, now)?;
        if self.pool.to_share_units(amount) == 0 {
            return Err(VaultError::InvalidAmount);
        }

        let reference = self.config.reference_token.clone();
        self.pull(&reference, &ctx.account, amount, env)?;
        self.pool.deposit(receiver, amount)?;
        self.total_staked_assets = self
            .total_staked_assets
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        self.events.push(VaultEvent::Staked {
            staker: ctx.account.clone(),
            receiver: receiver.clone(),
            amount,
            at: now,
        });
        Ok(())
    }

    /// Burn `assets` worth of the owner's claim and pay out the reference
    /// token. The caller needs a share allowance when withdrawing for
    /// someone else.
    pub fn stake_withdraw(
        &mut self,
        ctx: &AuthContext,
        owner: &crate::domain::AccountId,
        receiver: &crate::domain::AccountId,
        assets: Amount,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        if assets == 0 {
            return Err(VaultError::InvalidAmount);
        }
        self.absorb_reference_surplus(env, now)?;

        if assets > self.total_staked_assets {
            return Err(VaultError::InsufficientLiquidity {
                requested: assets,
                available: self.total_staked_assets,
            });
        }
        let reference = self.config.reference_token.clone();
        let unencumbered = self.ledgers.get(&reference)?.unencumbered();
        if assets > unencumbered {
            return Err(VaultError::InsufficientLiquidity {
                requested: assets,
                available: unencumbered,
            });
        }
        let held = self.pool.balance_of(owner);
        if assets > held {
            return Err(VaultError::InsufficientBalance {
                requested: assets,
                available: held,
            });
        }
        if owner != &ctx.account {
            self.pool.spend_allowance(owner, &ctx.account, assets)?;
        }

        self.pool.withdraw_assets(owner, assets)?;
        self.pay(&reference, receiver, assets, env)?;
        self.total_staked_assets -= assets;
        self.events.push(VaultEvent::Unstaked {
            owner: owner.clone(),
            receiver: receiver.clone(),
            amount: assets,
            at: now,
        });
        Ok(())
    }

    /// Explicit reward inflow: raises every staker's claim, mints nothing.
    pub fn submit_reward(
        &mut self,
        ctx: &AuthContext,
        amount: Amount,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        let reference = self.config.reference_token.clone();
        self.pull(&reference, &ctx.account, amount, env)?;
        self.pool.credit_yield(amount)?;
        self.events.push(VaultEvent::RewardSubmitted {
            from: ctx.account.clone(),
            amount,
            at: now,
        });
        Ok(())
    }

    // ── Asset-denominated share surface ──────────────────────────────

    pub fn balance_of(&self, account: &crate::domain::AccountId) -> Amount {
        self.pool.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.pool.total_supply()
    }

    /// Moves claim value between holders. Deliberately not pause-gated.
    pub fn transfer(
        &mut self,
        ctx: &AuthContext,
        to: &crate::domain::AccountId,
        assets: Amount,
    ) -> VaultResult<()> {
        self.pool.transfer(&ctx.account, to, assets)
    }

    pub fn approve(
        &mut self,
        ctx: &AuthContext,
        spender: &crate::domain::AccountId,
        assets: Amount,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        self.pool.approve(&ctx.account, spender, assets);
        Ok(())
    }

    pub fn allowance(
        &self,
        owner: &crate::domain::AccountId,
        spender: &crate::domain::AccountId,
    ) -> Amount {
        self.pool.allowance(owner, spender)
    }

    /// Allowance-backed transfer. Deliberately not pause-gated.
    pub fn transfer_from(
        &mut self,
        ctx: &AuthContext,
        owner: &crate::domain::AccountId,
        to: &crate::domain::AccountId,
        assets: Amount,
    ) -> VaultResult<()> {
        self.pool.spend_allowance(owner, &ctx.account, assets)?;
        self.pool.transfer(owner, to, assets)
    }

    // ── Order state machine ──────────────────────────────────────────

    /// Record a new order: pull the incoming transfer, reserve its fee.
    /// Callable only by the trusted executor or an orchestrator.
    pub fn create_order(
        &mut self,
        ctx: &AuthContext,
        order: Order,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<OrderHash> {
        ensure_active(self.mode)?;
        if !ctx.has(Role::Executor) && !ctx.has(Role::Orchestrator) {
            return Err(VaultError::InvalidCaller);
        }
        if order.amount_in == 0 || order.fee > order.amount_in {
            return Err(VaultError::InvalidAmount);
        }
        if !self.ledgers.is_supported(&order.token_in) {
            return Err(VaultError::InvalidToken(order.token_in.clone()));
        }
        if order.fill_deadline <= now || order.fill_deadline > now + self.config.max_order_time() {
            return Err(VaultError::InvalidDeadline);
        }
        let hash = order.hash();
        if self.orders.contains(&hash) {
            return Err(VaultError::DuplicateOrder(hash));
        }

        self.pull(&order.token_in, &order.trader, order.amount_in, env)?;
        self.ledgers.get_mut(&order.token_in)?.reserve_fee(order.fee)?;
        let token_in = order.token_in.clone();
        let amount_in = order.amount_in;
        let fee = order.fee;
        let hash = self.orders.insert(order, now)?;
        self.events.push(VaultEvent::OrderCreated {
            order_hash: hash.clone(),
            token_in,
            amount_in,
            fee,
            at: now,
        });
        Ok(hash)
    }

    /// Fill a Created order before its deadline: route the delivery call
    /// through the forwarder, verify the realized output against the order's
    /// minimum from the vault's own balance reads, then accrue the fee.
    ///
    /// No vault state is committed unless every check passes.
    pub fn fill_order(
        &mut self,
        ctx: &AuthContext,
        hash: &OrderHash,
        call: &ExternalCall,
        forwarder: &mut dyn CallForwarder,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<Amount> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Orchestrator)?;
        self.guard_price(now)?;
        let order = self.orders.expect_created(hash)?.order.clone();
        if now > order.fill_deadline {
            return Err(VaultError::DeadlinePassed);
        }

        // The delivery may spend vault liquidity of the output token, up to
        // what may safely leave right now.
        let approval = if self.ledgers.is_supported(&order.token_out) {
            Some((order.token_out.clone(), self.available_assets(&order.token_out)?))
        } else {
            None
        };
        let receiver_before = env.balance_of(&order.token_out, &order.receiver);
        let (_outcome, before) = self.run_external(call, approval, forwarder, env)?;
        let delivered = env
            .balance_of(&order.token_out, &order.receiver)
            .saturating_sub(receiver_before);
        if delivered < order.min_amount_out {
            return Err(VaultError::InvalidAmountOut {
                min: order.min_amount_out,
                actual: delivered,
            });
        }

        self.settle_call_balances(&before, env)?;
        self.ledgers
            .get_mut(&order.token_in)?
            .resolve_fee(order.fee, order.fee)?;
        self.orders.mark_filled(hash, now)?;
        self.events.push(VaultEvent::OrderFilled {
            order_hash: hash.clone(),
            delivered,
            at: now,
        });
        Ok(delivered)
    }

    /// Revert a Created order once the cooldown past its deadline has
    /// elapsed: refund the principal minus the retained fee penalty.
    pub fn revert_order(
        &mut self,
        ctx: &AuthContext,
        hash: &OrderHash,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<Amount> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Orchestrator)?;
        let order = self.orders.expect_created(hash)?.order.clone();
        if now <= order.fill_deadline + self.config.order_revert_buffer() {
            return Err(VaultError::DeadlineNotPassed);
        }

        let penalty = bps_share(order.fee, self.config.revert_fee_keep_bps);
        let refund = order.amount_in - penalty;
        let balance = self.ledgers.get(&order.token_in)?.balance;
        if refund > balance {
            return Err(VaultError::InsufficientBalance {
                requested: refund,
                available: balance,
            });
        }

        self.ledgers
            .get_mut(&order.token_in)?
            .resolve_fee(order.fee, penalty)?;
        self.pay(&order.token_in, &order.trader, refund, env)?;
        self.orders.mark_reverted(hash, now)?;
        self.events.push(VaultEvent::OrderReverted {
            order_hash: hash.clone(),
            refunded: refund,
            fee_kept: penalty,
            at: now,
        });
        Ok(refund)
    }

    /// Legacy single-pool outflow: the degenerate order path with no fee and
    /// no deadline tracking, bounded by the availability floor.
    pub fn remove_liquidity_swap(
        &mut self,
        ctx: &AuthContext,
        token: &TokenId,
        amount: Amount,
        receiver: &crate::domain::AccountId,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Orchestrator)?;
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        let available = self.available_assets(token)?;
        if amount > available {
            return Err(VaultError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }
        self.pay(token, receiver, amount, env)?;
        self.events.push(VaultEvent::SwapExecuted {
            token: token.clone(),
            amount,
            receiver: receiver.clone(),
            at: now,
        });
        Ok(())
    }

    // ── Fees ─────────────────────────────────────────────────────────

    /// Transfer out the accrued fees for `token` and zero the counter.
    /// Never touches reserved fees or staked principal.
    pub fn claim_fees(
        &mut self,
        ctx: &AuthContext,
        token: &TokenId,
        receiver: &crate::domain::AccountId,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<Amount> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Admin)?;
        let accrued = self.ledgers.get(token)?.fees_accrued;
        if accrued == 0 {
            return Ok(0);
        }
        self.pay(token, receiver, accrued, env)?;
        self.ledgers.get_mut(token)?.take_accrued();
        self.events.push(VaultEvent::FeesClaimed {
            token: token.clone(),
            amount: accrued,
            receiver: receiver.clone(),
            at: now,
        });
        Ok(accrued)
    }

    // ── Bridge liquidity ─────────────────────────────────────────────

    /// Return bridged capital to the vault.
    pub fn add_bridge_liquidity(
        &mut self,
        ctx: &AuthContext,
        token: &TokenId,
        amount: Amount,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Orchestrator)?;
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        self.pull(token, &ctx.account, amount, env)?;
        let ledger = self.ledgers.get_mut(token)?;
        ledger.bridge_outstanding = ledger.bridge_outstanding.saturating_sub(amount);
        self.events.push(VaultEvent::BridgeLiquidityAdded {
            token: token.clone(),
            amount,
            at: now,
        });
        Ok(())
    }

    /// Move available capital out through the bridge. The external call may
    /// drain at most `amount`; the ledger is reconciled to the vault's real
    /// post-call balance, never to an assumed delta.
    pub fn remove_bridge_liquidity(
        &mut self,
        ctx: &AuthContext,
        token: &TokenId,
        amount: Amount,
        call: &ExternalCall,
        forwarder: &mut dyn CallForwarder,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<Amount> {
        let delta = self.bridge_call(ctx, token, amount, call, forwarder, env)?;
        self.events.push(VaultEvent::BridgeLiquidityRemoved {
            token: token.clone(),
            amount: delta.outflow,
            at: now,
        });
        Ok(delta.outflow)
    }

    /// Rebalance bridge liquidity: the call may both send and receive; the
    /// net movement is read from the vault's own balances afterward.
    pub fn rebalance_liquidity(
        &mut self,
        ctx: &AuthContext,
        token: &TokenId,
        amount: Amount,
        call: &ExternalCall,
        forwarder: &mut dyn CallForwarder,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<BalanceDelta> {
        let delta = self.bridge_call(ctx, token, amount, call, forwarder, env)?;
        self.events.push(VaultEvent::Rebalanced {
            token: token.clone(),
            outflow: delta.outflow,
            inflow: delta.inflow,
            at: now,
        });
        Ok(delta)
    }

    fn bridge_call(
        &mut self,
        ctx: &AuthContext,
        token: &TokenId,
        amount: Amount,
        call: &ExternalCall,
        forwarder: &mut dyn CallForwarder,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<BalanceDelta> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Orchestrator)?;
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        let available = self.available_assets(token)?;
        if amount > available {
            return Err(VaultError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }

        let (_outcome, before) =
            self.run_external(call, Some((token.clone(), amount)), forwarder, env)?;
        let deltas = self.settle_call_balances(&before, env)?;
        let delta = deltas.get(token).copied().unwrap_or_default();

        let ledger = self.ledgers.get_mut(token)?;
        ledger.bridge_outstanding = ledger
            .bridge_outstanding
            .checked_add(delta.outflow)
            .ok_or(VaultError::MathOverflow)?
            .saturating_sub(delta.inflow);
        Ok(delta)
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Public reconciliation hook: absorb third-party transfers ("donations")
    /// into the ledger. Reference-token surplus compounds into the share
    /// pool; other tokens are absorbed into their balance only.
    pub fn sync_balance(
        &mut self,
        token: &TokenId,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<Amount> {
        let real = env.balance_of(token, &self.config.vault_account);
        let ledger = self.ledgers.get_mut(token)?;
        let cached = ledger.balance;
        if real < cached {
            return Err(VaultError::ExternalCallFailed(format!(
                "physical balance {real} below ledger balance {cached} for {token}"
            )));
        }
        let surplus = real - cached;
        if surplus > 0 {
            ledger.balance = real;
            if *token == self.config.reference_token {
                self.pool.credit_yield(surplus)?;
            }
            self.events.push(VaultEvent::DonationAbsorbed {
                token: token.clone(),
                amount: surplus,
                at: now,
            });
        }
        Ok(surplus)
    }

    fn absorb_reference_surplus(
        &mut self,
        env: &mut dyn TokenEnv,
        now: DateTime<Utc>,
    ) -> VaultResult<Amount> {
        let reference = self.config.reference_token.clone();
        self.sync_balance(&reference, now, env)
    }

    // ── Config ───────────────────────────────────────────────────────

    /// Takes effect on the next read; nothing is stored pre-derived.
    pub fn set_rebalance_threshold(
        &mut self,
        ctx: &AuthContext,
        threshold_bps: u64,
        now: DateTime<Utc>,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Admin)?;
        liquidity::validate_threshold(threshold_bps)?;
        self.config.rebalance_threshold_bps = threshold_bps;
        self.events.push(VaultEvent::ThresholdUpdated {
            threshold_bps,
            at: now,
        });
        Ok(())
    }

    pub fn set_mode(&mut self, ctx: &AuthContext, mode: Mode, now: DateTime<Utc>) -> VaultResult<()> {
        ensure_role(ctx, Role::Admin)?;
        self.mode = mode;
        self.events.push(VaultEvent::ModeChanged { mode, at: now });
        Ok(())
    }

    pub fn add_supported_token(
        &mut self,
        ctx: &AuthContext,
        token: TokenId,
        now: DateTime<Utc>,
    ) -> VaultResult<()> {
        ensure_active(self.mode)?;
        ensure_role(ctx, Role::Admin)?;
        self.ledgers.register(token.clone())?;
        self.events.push(VaultEvent::TokenAdded { token, at: now });
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn guard_price(&self, now: DateTime<Utc>) -> VaultResult<()> {
        match &self.breaker {
            Some(breaker) => breaker.check(now),
            None => Ok(()),
        }
    }

    /// Pull tokens from `from` into the vault and mirror the ledger.
    fn pull(
        &mut self,
        token: &TokenId,
        from: &crate::domain::AccountId,
        amount: Amount,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<()> {
        self.ledgers.get(token)?; // supported check before touching the env
        let vault = self.config.vault_account.clone();
        env.transfer_from(token, &vault, from, &vault, amount)?;
        self.ledgers.get_mut(token)?.credit(amount)
    }

    /// Pay tokens out of the vault and mirror the ledger. The ledger check
    /// runs before the physical transfer so a failure commits nothing.
    fn pay(
        &mut self,
        token: &TokenId,
        to: &crate::domain::AccountId,
        amount: Amount,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<()> {
        let balance = self.ledgers.get(token)?.balance;
        if amount > balance {
            return Err(VaultError::InsufficientBalance {
                requested: amount,
                available: balance,
            });
        }
        let vault = self.config.vault_account.clone();
        env.transfer(token, &vault, to, amount)?;
        self.ledgers.get_mut(token)?.debit(amount)
    }

    /// Execute an external call with a bounded, always-reset approval.
    ///
    /// Returns the forwarder outcome together with the vault's pre-call
    /// balances of every supported token. Fails if the call drained more of
    /// any token than the approval authorized.
    fn run_external(
        &mut self,
        call: &ExternalCall,
        approval: Option<(TokenId, Amount)>,
        forwarder: &mut dyn CallForwarder,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<(CallOutcome, BTreeMap<TokenId, Amount>)> {
        if call.target == self.config.vault_account {
            return Err(VaultError::InvalidTarget("call target is the vault itself".into()));
        }
        let vault = self.config.vault_account.clone();
        let before: BTreeMap<TokenId, Amount> = self
            .ledgers
            .tokens()
            .map(|t| (t.clone(), env.balance_of(t, &vault)))
            .collect();

        if let Some((token, amount)) = &approval {
            self.ledgers.get(token)?;
            env.approve(token, &vault, &call.target, *amount)?;
        }
        let result = forwarder.execute(call, env);
        // Approval is reset unconditionally, success or failure.
        if let Some((token, _)) = &approval {
            env.approve(token, &vault, &call.target, 0)?;
        }
        let outcome = result?;

        for (token, pre) in &before {
            let real = env.balance_of(token, &vault);
            if real < *pre {
                let drained = pre - real;
                let authorized = match &approval {
                    Some((t, a)) if t == token => *a,
                    _ => 0,
                };
                if drained > authorized {
                    return Err(VaultError::ExternalCallFailed(format!(
                        "call drained {drained} of {token}, authorized {authorized}"
                    )));
                }
            }
        }
        Ok((outcome, before))
    }

    /// Reconcile every supported ledger to the vault's real post-call
    /// balance. Surplus is absorbed without yield credit (bridge returns are
    /// principal, not donations); deficits were already bounded by the
    /// approval check in `run_external`.
    fn settle_call_balances(
        &mut self,
        before: &BTreeMap<TokenId, Amount>,
        env: &dyn TokenEnv,
    ) -> VaultResult<BTreeMap<TokenId, BalanceDelta>> {
        let vault = self.config.vault_account.clone();
        let mut deltas = BTreeMap::new();
        for (token, pre) in before {
            let real = env.balance_of(token, &vault);
            let delta = if real >= *pre {
                BalanceDelta {
                    outflow: 0,
                    inflow: real - pre,
                }
            } else {
                BalanceDelta {
                    outflow: pre - real,
                    inflow: 0,
                }
            };
            let ledger = self.ledgers.get_mut(token)?;
            ledger.balance = real;
            if !ledger.fees_covered() {
                return Err(VaultError::ExternalCallFailed(format!(
                    "post-call balance of {token} no longer covers fee counters"
                )));
            }
            deltas.insert(token.clone(), delta);
        }
        Ok(deltas)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("total_staked_assets", &self.total_staked_assets)
            .field("orders", &self.orders.len())
            .finish_non_exhaustive()
    }
}

// Snapshot plumbing lives in `schema`; these accessors keep the fields
// private while letting the snapshot round-trip full state.
impl Vault {
    pub(crate) fn snapshot_parts(&self) -> (&VaultConfig, Mode, Amount, &LedgerBook, &SharePool, &OrderBook) {
        (
            &self.config,
            self.mode,
            self.total_staked_assets,
            &self.ledgers,
            &self.pool,
            &self.orders,
        )
    }

    pub(crate) fn from_parts(
        config: VaultConfig,
        mode: Mode,
        total_staked_assets: Amount,
        ledgers: LedgerBook,
        pool: SharePool,
        orders: OrderBook,
    ) -> VaultResult<Self> {
        liquidity::validate_threshold(config.rebalance_threshold_bps)?;
        liquidity::validate_threshold(config.revert_fee_keep_bps)?;
        Ok(Self {
            config,
            mode,
            total_staked_assets,
            ledgers,
            pool,
            orders,
            breaker: None,
            events: Vec::new(),
        })
    }
}
