//! Common test utilities for debt engine tests
//!
//! Every test builds its own store, clock and engine, so tests never share a
//! run guard and can execute in parallel.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use debts_rs::clock::FixedClock;
use debts_rs::models::{
    ConsumptionRecord, Member, RecordStatus, RecurrencePeriod, ReservationRecord, Society,
    SubscriptionType,
};
use debts_rs::repos::{DebtStore, InMemoryDebtStore};
use debts_rs::{DebtCalculationEngine, EngineConfig, RunOutcome, RunSummary};
use uuid::Uuid;

pub struct Fixture {
    pub store: Arc<InMemoryDebtStore>,
    pub clock: Arc<FixedClock>,
    pub engine: Arc<DebtCalculationEngine>,
    pub society: Society,
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Store with one active society (kitchen fee 3.00) and a clock on 2025-11-15
pub async fn fixture() -> Fixture {
    fixture_with(300, EngineConfig::default()).await
}

pub async fn fixture_with(kitchen_fee_minor: i64, config: EngineConfig) -> Fixture {
    let store = Arc::new(InMemoryDebtStore::new());
    let society = Society {
        id: Uuid::new_v4(),
        name: "Sociedad Gastronómica".to_string(),
        is_active: true,
        kitchen_fee_per_use_minor: kitchen_fee_minor,
    };
    store.add_society(society.clone()).await;

    let clock = Arc::new(FixedClock::new(at(2025, 11, 15)));
    let engine = Arc::new(DebtCalculationEngine::with_clock(
        store.clone() as Arc<dyn DebtStore>,
        clock.clone(),
        config,
    ));

    Fixture {
        store,
        clock,
        engine,
        society,
    }
}

/// Store and engine without any society
pub async fn fixture_without_tenant() -> Fixture {
    let fx = fixture().await;
    let store = Arc::new(InMemoryDebtStore::new());
    let engine = Arc::new(DebtCalculationEngine::with_clock(
        store.clone() as Arc<dyn DebtStore>,
        fx.clock.clone(),
        EngineConfig::default(),
    ));
    Fixture {
        store,
        engine,
        ..fx
    }
}

impl Fixture {
    pub async fn add_member(&self, name: &str) -> Member {
        self.add_member_with(name, true, None).await
    }

    pub async fn add_member_with(
        &self,
        name: &str,
        is_active: bool,
        subscription_type_id: Option<Uuid>,
    ) -> Member {
        let member = Member {
            id: Uuid::new_v4(),
            society_id: self.society.id,
            display_name: name.to_string(),
            is_active,
            subscription_type_id,
        };
        self.store.add_member(member.clone()).await;
        member
    }

    pub async fn add_subscription(
        &self,
        period: RecurrencePeriod,
        period_months: Option<i32>,
        amount_minor: i64,
    ) -> SubscriptionType {
        let subscription = SubscriptionType {
            id: Uuid::new_v4(),
            society_id: self.society.id,
            name: format!("{:?} dues", period),
            amount_minor,
            period,
            period_months,
            is_active: true,
        };
        self.store.add_subscription_type(subscription.clone()).await;
        subscription
    }

    pub async fn add_consumption(
        &self,
        member: &Member,
        amount_minor: i64,
        consumed_at: DateTime<Utc>,
        status: RecordStatus,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .add_consumption(ConsumptionRecord {
                id,
                member_id: member.id,
                society_id: self.society.id,
                amount_minor,
                consumed_at,
                status,
            })
            .await;
        id
    }

    pub async fn add_reservation(
        &self,
        member: &Member,
        amount_minor: i64,
        reserved_at: DateTime<Utc>,
        uses_kitchen: bool,
        status: RecordStatus,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .add_reservation(ReservationRecord {
                id,
                member_id: member.id,
                society_id: self.society.id,
                amount_minor,
                reserved_at,
                uses_kitchen,
                status,
            })
            .await;
        id
    }
}

pub fn completed(outcome: RunOutcome) -> RunSummary {
    match outcome {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::Skipped => panic!("expected a completed run, got Skipped"),
    }
}
