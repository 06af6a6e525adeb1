//! Membership plans and the user's subscription.
//!
//! [`MembershipStore`] loads plans and the current subscription through a
//! [`PlanService`], retrying transient failures with backoff. Upgrades are
//! optimistic: the new subscription is shown as pending straight away and
//! rolled back if the service refuses it.

use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    retry::{RetryOutcome, RetryPolicy, retry},
    snapshot::Optimistic,
};

pub use error::MembershipError;
use error::Result;

/// Membership level, ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Supporter,
    Partner,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "Free",
            Self::Supporter => "Supporter",
            Self::Partner => "Partner",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub id: String,
    pub name: String,
    pub tier: Tier,
    pub monthly_price_cents: u32,
    pub annual_price_cents: u32,
}

impl MembershipPlan {
    pub const fn price_cents(&self, cycle: BillingCycle) -> u32 {
        match cycle {
            BillingCycle::Monthly => self.monthly_price_cents,
            BillingCycle::Annual => self.annual_price_cents,
        }
    }

    /// Twelve monthly payments minus the annual price, never negative.
    pub const fn annual_savings_cents(&self) -> u32 {
        self.monthly_price_cents
            .saturating_mul(12)
            .saturating_sub(self.annual_price_cents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    /// Shown while an upgrade waits for confirmation.
    Pending,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan_id: String,
    pub tier: Tier,
    pub cycle: BillingCycle,
    pub status: SubscriptionStatus,
}

/// Everything the membership screens render from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MembershipState {
    pub plans: Vec<MembershipPlan>,
    pub subscription: Option<Subscription>,
}

impl MembershipState {
    pub fn plan(&self, id: &str) -> Option<&MembershipPlan> {
        self.plans.iter().find(|plan| plan.id == id)
    }

    /// Tier of an active or pending subscription; `Free` otherwise.
    pub fn current_tier(&self) -> Tier {
        self.subscription
            .as_ref()
            .filter(|sub| sub.status != SubscriptionStatus::Cancelled)
            .map_or(Tier::Free, |sub| sub.tier)
    }
}

/// Remote membership API.
pub trait PlanService: Send + Sync {
    fn fetch_plans(&self) -> impl Future<Output = Result<Vec<MembershipPlan>>> + Send;

    fn fetch_subscription(&self) -> impl Future<Output = Result<Option<Subscription>>> + Send;

    /// Ask the service to move the user onto `plan_id`. Returns the confirmed subscription.
    fn confirm_upgrade(
        &self,
        plan_id: &str,
        cycle: BillingCycle,
    ) -> impl Future<Output = Result<Subscription>> + Send;
}

#[derive(Debug, Default)]
pub struct MembershipStore {
    state: Optimistic<MembershipState>,
    policy: RetryPolicy,
    loaded: bool,
}

impl MembershipStore {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: Optimistic::default(),
            policy,
            loaded: false,
        }
    }

    pub const fn state(&self) -> &MembershipState {
        self.state.get()
    }

    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn current_tier(&self) -> Tier {
        self.state().current_tier()
    }

    /// Fetch plans and the current subscription, retrying per the store's policy.
    #[instrument(name = "Load membership", skip_all, level = "info")]
    pub async fn load<S: PlanService>(&mut self, service: &S) -> Result<&MembershipState> {
        let outcome = retry(&self.policy, move |_attempt| async move {
            let plans = service.fetch_plans().await?;
            let subscription = service.fetch_subscription().await?;
            Ok::<_, MembershipError>(MembershipState {
                plans,
                subscription,
            })
        })
        .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                info!(attempts, plans = value.plans.len(), "Membership loaded");
                self.state.update(value);
                self.loaded = true;
                Ok(self.state.get())
            }
            RetryOutcome::Exhausted { error, attempts } => Err(MembershipError::LoadFailed {
                attempts,
                message: error.to_string(),
            }),
        }
    }

    /// Move the user onto a higher plan.
    ///
    /// The pending subscription is visible immediately; if the service does not
    /// confirm it the previous state is restored and the service error returned.
    #[instrument(name = "Upgrade membership", skip(self, service), level = "info")]
    pub async fn upgrade<S: PlanService>(
        &mut self,
        plan_id: &str,
        cycle: BillingCycle,
        service: &S,
    ) -> Result<Subscription> {
        if !self.loaded {
            return Err(MembershipError::NotLoaded);
        }
        let plan = self
            .state()
            .plan(plan_id)
            .ok_or_else(|| MembershipError::UnknownPlan(plan_id.to_string()))?;
        let current = self.current_tier();
        if plan.tier <= current {
            return Err(MembershipError::NotAnUpgrade {
                current,
                requested: plan.tier,
            });
        }

        let pending = Subscription {
            plan_id: plan.id.clone(),
            tier: plan.tier,
            cycle,
            status: SubscriptionStatus::Pending,
        };
        let snapshot = self.state.apply(|state| state.subscription = Some(pending));

        match service.confirm_upgrade(plan_id, cycle).await {
            Ok(confirmed) => {
                self.state.commit(snapshot);
                let mut state = self.state.get().clone();
                state.subscription = Some(confirmed.clone());
                self.state.update(state);
                info!(tier = %confirmed.tier, "Upgrade confirmed");
                Ok(confirmed)
            }
            Err(error) => {
                warn!(%error, "Upgrade rejected; restoring previous membership");
                self.state.rollback(snapshot);
                Err(error)
            }
        }
    }
}

mod error {
    use thiserror::Error;

    use super::Tier;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum MembershipError {
        #[error("Membership service unavailable: {0}")]
        Unavailable(String),
        #[error("Unknown membership plan: {0}")]
        UnknownPlan(String),
        #[error("{requested} is not an upgrade from {current}")]
        NotAnUpgrade { current: Tier, requested: Tier },
        #[error("Membership has not been loaded")]
        NotLoaded,
        #[error("Failed to load membership after {attempts} attempts: {message}")]
        LoadFailed { attempts: u32, message: String },
    }
    pub type Result<T> = std::result::Result<T, MembershipError>;
}


#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use super::{testing::*, *};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
        }
    }

    #[test]
    fn test_plan_pricing() {
        let partner = &plans()[2];
        assert_eq!(partner.price_cents(BillingCycle::Monthly), 2_900);
        assert_eq!(partner.price_cents(BillingCycle::Annual), 29_000);
        assert_eq!(partner.annual_savings_cents(), 5_800);

        let overpriced = MembershipPlan {
            annual_price_cents: 50_000,
            ..partner.clone()
        };
        assert_eq!(overpriced.annual_savings_cents(), 0);
    }

    #[test]
    fn test_current_tier_ignores_cancelled() {
        let mut state = MembershipState {
            plans: plans(),
            subscription: Some(Subscription {
                plan_id: "partner".to_string(),
                tier: Tier::Partner,
                cycle: BillingCycle::Annual,
                status: SubscriptionStatus::Active,
            }),
        };
        assert_eq!(state.current_tier(), Tier::Partner);

        if let Some(sub) = state.subscription.as_mut() {
            sub.status = SubscriptionStatus::Cancelled;
        }
        assert_eq!(state.current_tier(), Tier::Free);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_retries_transient_failures() {
        let service = MockPlanService {
            load_failures: 2,
            ..MockPlanService::default()
        };
        let mut store = MembershipStore::new(fast_retry());

        let state = store.load(&service).await.unwrap();
        assert_eq!(state.plans.len(), 3);
        assert_eq!(service.load_calls.load(Ordering::SeqCst), 3);
        assert!(store.is_loaded());
        assert_eq!(store.current_tier(), Tier::Free);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_gives_up() {
        let service = MockPlanService {
            load_failures: 10,
            ..MockPlanService::default()
        };
        let mut store = MembershipStore::new(fast_retry());

        let err = store.load(&service).await.unwrap_err();
        assert_eq!(
            err,
            MembershipError::LoadFailed {
                attempts: 3,
                message: "Membership service unavailable: attempt 3".to_string()
            }
        );
        assert!(!store.is_loaded());
    }

    #[tokio::test]
    async fn test_upgrade_confirmed() {
        let service = MockPlanService::default();
        let mut store = MembershipStore::new(fast_retry());
        store.load(&service).await.unwrap();

        let sub = store
            .upgrade("supporter", BillingCycle::Annual, &service)
            .await
            .unwrap();
        assert_eq!(sub.tier, Tier::Supporter);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(store.current_tier(), Tier::Supporter);
    }

    #[tokio::test]
    async fn test_rejected_upgrade_restores_snapshot() {
        let service = MockPlanService {
            reject_upgrades: true,
            ..MockPlanService::default()
        };
        let mut store = MembershipStore::new(fast_retry());
        store.load(&service).await.unwrap();
        let before = store.state().clone();

        let err = store
            .upgrade("partner", BillingCycle::Monthly, &service)
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::Unavailable(_)));
        assert_eq!(store.state(), &before);
        assert_eq!(service.upgrade_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upgrade_validation() {
        let service = MockPlanService::default();
        let mut store = MembershipStore::new(fast_retry());

        assert_eq!(
            store
                .upgrade("partner", BillingCycle::Monthly, &service)
                .await
                .unwrap_err(),
            MembershipError::NotLoaded
        );

        store.load(&service).await.unwrap();
        assert!(matches!(
            store.upgrade("gold", BillingCycle::Monthly, &service).await,
            Err(MembershipError::UnknownPlan(_))
        ));
        assert_eq!(
            store
                .upgrade("free", BillingCycle::Monthly, &service)
                .await
                .unwrap_err(),
            MembershipError::NotAnUpgrade {
                current: Tier::Free,
                requested: Tier::Free
            }
        );
        assert_eq!(service.upgrade_calls.load(Ordering::SeqCst), 0);
    }
}
