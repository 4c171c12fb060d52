//! Random scenario generation for soak runs.
//!
//! Generates step sequences that are valid by construction (amounts tracked
//! against what each account can actually afford), so a clean vault must run
//! them without mismatches; any failure a sweep surfaces is a real finding.

use crate::forwarder::CallScript;
use crate::scenario::{
    AccountSetup, Action, OrderSpec, Scenario, ScenarioStep,
};
use chrono::{TimeZone, Utc};
use liquivault_core::domain::{AccountId, Amount, TokenId};
use liquivault_core::vault::VaultConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub steps: usize,
    pub stakers: u8,
    pub max_amount: Amount,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            steps: 50,
            stakers: 4,
            max_amount: 1_000_000,
        }
    }
}

fn usdc() -> TokenId {
    TokenId::new("USDC")
}

fn staker(idx: u8) -> AccountId {
    AccountId::new(format!("lp-{idx}"))
}

pub fn generate(config: &GeneratorConfig) -> Scenario {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let start_time = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let trader = AccountId::new("trader");
    let rewarder = AccountId::new("strategy");

    // Per-account budgets so every generated step can actually be funded.
    let bankroll = config
        .max_amount
        .saturating_mul(config.steps as u64)
        .max(config.max_amount);
    let mut accounts = vec![
        AccountSetup {
            account: trader.clone(),
            token: usdc(),
            balance: bankroll,
        },
        AccountSetup {
            account: rewarder.clone(),
            token: usdc(),
            balance: bankroll,
        },
    ];
    for idx in 0..config.stakers {
        accounts.push(AccountSetup {
            account: staker(idx),
            token: usdc(),
            balance: bankroll,
        });
    }

    // Principal per staker, tracked so withdrawals never exceed it.
    let mut principal: Vec<Amount> = vec![0; config.stakers as usize];
    let mut next_seed: u64 = 1;
    let mut steps = Vec::with_capacity(config.steps);

    while steps.len() < config.steps {
        match rng.gen_range(0u8..10) {
            // Deposits dominate so the pool stays funded.
            0..=3 => {
                let idx = rng.gen_range(0..config.stakers) as usize;
                let amount = rng.gen_range(1..=config.max_amount);
                principal[idx] += amount;
                steps.push(ok(Action::Stake {
                    staker: staker(idx as u8),
                    amount,
                }));
            }
            4 => {
                let idx = rng.gen_range(0..config.stakers) as usize;
                if principal[idx] == 0 {
                    continue;
                }
                let amount = rng.gen_range(1..=principal[idx]);
                // Keep a unit of slack per withdrawal: the ceil burn can
                // round the remaining claim down by one.
                principal[idx] = (principal[idx] - amount).saturating_sub(1);
                steps.push(ok(Action::Withdraw {
                    owner: staker(idx as u8),
                    receiver: staker(idx as u8),
                    amount,
                }));
            }
            5 => {
                steps.push(ok(Action::SubmitReward {
                    from: rewarder.clone(),
                    amount: rng.gen_range(1..=config.max_amount),
                }));
            }
            6 => {
                steps.push(ok(Action::Donate {
                    token: usdc(),
                    amount: rng.gen_range(1..=config.max_amount),
                }));
                steps.push(ok(Action::SyncBalance { token: usdc() }));
            }
            // Order created and immediately filled.
            7..=8 => {
                let spec = order_spec(&mut rng, next_seed, &trader, config.max_amount);
                next_seed += 1;
                let script = CallScript::Deliver {
                    token: usdc(),
                    pull: spec.min_amount_out,
                    deliver: spec.min_amount_out,
                    receiver: spec.receiver.clone(),
                };
                let seed = spec.seed;
                steps.push(ok(Action::CreateOrder { order: spec }));
                steps.push(ok(Action::FillOrder { seed, script }));
            }
            // Order created, left to expire, then reverted.
            _ => {
                let spec = order_spec(&mut rng, next_seed, &trader, config.max_amount);
                next_seed += 1;
                let seed = spec.seed;
                let past_buffer = spec.deadline_secs + 601;
                steps.push(ok(Action::CreateOrder { order: spec }));
                steps.push(ok(Action::AdvanceTime { secs: past_buffer }));
                steps.push(ok(Action::RevertOrder { seed }));
            }
        }
    }
    steps.truncate(config.steps);

    Scenario {
        name: format!("generated-{}", config.seed),
        start_time,
        vault: VaultConfig {
            vault_account: AccountId::new("vault"),
            reference_token: usdc(),
            rebalance_threshold_bps: 7_500,
            order_revert_buffer_secs: 600,
            max_order_time_secs: 3_600,
            revert_fee_keep_bps: 5_000,
        },
        extra_tokens: Vec::new(),
        accounts,
        steps,
    }
}

fn ok(action: Action) -> ScenarioStep {
    ScenarioStep {
        action,
        expect: Default::default(),
    }
}

fn order_spec(rng: &mut StdRng, seed: u64, trader: &AccountId, max_amount: Amount) -> OrderSpec {
    let amount_in = rng.gen_range(100..=max_amount.max(100));
    let fee = amount_in / 100;
    OrderSpec {
        seed,
        amount_in,
        trader: trader.clone(),
        receiver: AccountId::new("receiver"),
        src_chain_id: 10,
        dest_chain_id: 1,
        token_in: usdc(),
        token_out: usdc(),
        fee,
        deadline_secs: 1_800,
        min_amount_out: amount_in - fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let config = GeneratorConfig {
            seed: 42,
            steps: 30,
            ..Default::default()
        };
        let a = generate(&config);
        let b = generate(&config);
        assert_eq!(a.steps.len(), 30);
        assert_eq!(
            serde_json::to_string(&a.steps).unwrap(),
            serde_json::to_string(&b.steps).unwrap()
        );
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate(&GeneratorConfig { seed: 1, steps: 30, ..Default::default() });
        let b = generate(&GeneratorConfig { seed: 2, steps: 30, ..Default::default() });
        assert_ne!(
            serde_json::to_string(&a.steps).unwrap(),
            serde_json::to_string(&b.steps).unwrap()
        );
    }

    #[test]
    fn generated_scenarios_validate() {
        for seed in 0..5 {
            let scenario = generate(&GeneratorConfig { seed, steps: 40, ..Default::default() });
            let toml = toml::to_string(&scenario).unwrap();
            Scenario::from_toml_str(&toml).unwrap();
        }
    }

    mod properties {
        use super::*;
        use crate::harness::Harness;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn any_seed_yields_a_valid_scenario(seed in any::<u64>(), steps in 1usize..40) {
                let scenario = generate(&GeneratorConfig { seed, steps, ..Default::default() });
                let toml = toml::to_string(&scenario).unwrap();
                let parsed = Scenario::from_toml_str(&toml).unwrap();
                prop_assert_eq!(parsed.steps.len(), scenario.steps.len());
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn any_seed_runs_without_findings(seed in any::<u64>()) {
                let scenario = generate(&GeneratorConfig { seed, steps: 15, ..Default::default() });
                let report = Harness::run(&scenario).unwrap();
                prop_assert!(report.passed(), "{:?}", report);
            }
        }
    }
}
