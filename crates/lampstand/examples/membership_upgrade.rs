//! Membership plans with retry and optimistic upgrades
//!
//! This example demonstrates:
//! - Loading plans through a flaky service with exponential backoff
//! - Annual pricing and savings
//! - An upgrade that is rolled back when the service declines it

use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use lampstand::{
    membership::{
        BillingCycle, MembershipError, MembershipPlan, MembershipStore, PlanService,
        Subscription, SubscriptionStatus, Tier,
    },
    retry::RetryPolicy,
};

/// Fails the first two plan fetches and declines the first upgrade.
#[derive(Default)]
struct FlakyService {
    fetches: AtomicU32,
    upgrades: AtomicU32,
}

impl PlanService for FlakyService {
    async fn fetch_plans(&self) -> Result<Vec<MembershipPlan>, MembershipError> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(MembershipError::Unavailable("gateway timeout".to_string()));
        }
        Ok(vec![
            plan("supporter", "Supporter", Tier::Supporter, 900, 9_000),
            plan("partner", "Ministry Partner", Tier::Partner, 2_900, 29_000),
        ])
    }

    async fn fetch_subscription(&self) -> Result<Option<Subscription>, MembershipError> {
        Ok(None)
    }

    async fn confirm_upgrade(
        &self,
        plan_id: &str,
        cycle: BillingCycle,
    ) -> Result<Subscription, MembershipError> {
        if self.upgrades.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(MembershipError::Unavailable("card declined".to_string()));
        }
        Ok(Subscription {
            plan_id: plan_id.to_string(),
            tier: Tier::Supporter,
            cycle,
            status: SubscriptionStatus::Active,
        })
    }
}

fn plan(id: &str, name: &str, tier: Tier, monthly: u32, annual: u32) -> MembershipPlan {
    MembershipPlan {
        id: id.to_string(),
        name: name.to_string(),
        tier,
        monthly_price_cents: monthly,
        annual_price_cents: annual,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lampstand::init_logging(tracing::Level::DEBUG)?;

    let service = FlakyService::default();
    let mut store = MembershipStore::new(RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(400),
    });

    let state = store.load(&service).await?;
    println!("Plans:");
    for plan in &state.plans {
        println!(
            "  {:<18} ${:>6.2}/month  ${:>7.2}/year  (save ${:.2})",
            plan.name,
            f64::from(plan.monthly_price_cents) / 100.0,
            f64::from(plan.annual_price_cents) / 100.0,
            f64::from(plan.annual_savings_cents()) / 100.0,
        );
    }

    match store.upgrade("supporter", BillingCycle::Annual, &service).await {
        Ok(sub) => println!("\nUpgraded to {}", sub.tier),
        Err(error) => println!("\nUpgrade failed ({error}); still on {}", store.current_tier()),
    }

    let sub = store.upgrade("supporter", BillingCycle::Annual, &service).await?;
    println!("Upgraded to {} on the {:?} cycle", sub.tier, sub.cycle);
    Ok(())
}
