//! In-memory implementation of the DebtStore trait for testing and development

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use super::{DebtStore, StoreError, StoreResult};
use crate::models::{
    ConsumptionRecord, DebtAmounts, DebtEntry, DebtStatus, Member, NewDebtEntry, RecordStatus,
    ReservationRecord, ReservationTotals, Society, SubscriptionType,
};
use crate::period::MonthWindow;

/// One-shot gate that parks the first caller of a store operation until released
///
/// Lets tests observe the engine while a calculation is in flight.
#[derive(Debug, Default)]
pub struct PauseGate {
    entered: Notify,
    release: Notify,
}

impl PauseGate {
    /// Resolves once a caller is parked at the gate
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn park(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
struct Tables {
    societies: Vec<Society>,
    members: Vec<Member>,
    subscription_types: HashMap<Uuid, SubscriptionType>,
    consumptions: Vec<ConsumptionRecord>,
    reservations: Vec<ReservationRecord>,
    debts: Vec<DebtEntry>,
}

/// How the next `insert_debt` collides with another writer
#[derive(Debug, Clone, Copy)]
enum InsertRace {
    /// A row with these amounts lands just before ours
    ConcurrentWriter(DebtAmounts),
    /// The insert conflicts but the conflicting row is gone by the time it is read
    Vanished,
}

#[derive(Default)]
struct Faults {
    failing_members: HashSet<Uuid>,
    failing_subscription_lookups: HashSet<Uuid>,
    fail_debt_count: bool,
    insert_race: Option<InsertRace>,
}

fn debt_row(entry: &NewDebtEntry, amounts: DebtAmounts) -> DebtEntry {
    let now = Utc::now();
    DebtEntry {
        id: Uuid::new_v4(),
        member_id: entry.member_id,
        society_id: entry.society_id,
        month: entry.month.clone(),
        year: entry.year,
        month_number: entry.month_number,
        consumption_amount_minor: amounts.consumption_minor,
        reservation_amount_minor: amounts.reservation_minor,
        kitchen_amount_minor: amounts.kitchen_minor,
        subscription_amount_minor: amounts.subscription_minor,
        total_amount_minor: amounts.total_minor(),
        status: DebtStatus::Pending,
        paid_amount_minor: 0,
        paid_at: None,
        calculated_at: now,
        updated_at: now,
    }
}

/// DebtStore implementation backed by in-process tables
///
/// Suitable for:
/// - Unit and integration tests (no database)
/// - Local development of the HTTP surface
///
/// Failure injection mirrors the error paths of the Postgres store so the
/// engine's partial-failure handling can be exercised deterministically.
#[derive(Default)]
pub struct InMemoryDebtStore {
    tables: RwLock<Tables>,
    faults: RwLock<Faults>,
    member_listing_gate: Mutex<Option<Arc<PauseGate>>>,
}

impl InMemoryDebtStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_society(&self, society: Society) {
        self.tables.write().await.societies.push(society);
    }

    pub async fn add_member(&self, member: Member) {
        self.tables.write().await.members.push(member);
    }

    pub async fn add_subscription_type(&self, subscription: SubscriptionType) {
        self.tables
            .write()
            .await
            .subscription_types
            .insert(subscription.id, subscription);
    }

    pub async fn add_consumption(&self, record: ConsumptionRecord) {
        self.tables.write().await.consumptions.push(record);
    }

    pub async fn add_reservation(&self, record: ReservationRecord) {
        self.tables.write().await.reservations.push(record);
    }

    /// Mutate a consumption the way the bar module would (e.g. cancel it)
    pub async fn set_consumption_status(&self, consumption_id: Uuid, status: RecordStatus) {
        let mut tables = self.tables.write().await;
        if let Some(record) = tables.consumptions.iter_mut().find(|c| c.id == consumption_id) {
            record.status = status;
        }
    }

    pub async fn set_reservation_status(&self, reservation_id: Uuid, status: RecordStatus) {
        let mut tables = self.tables.write().await;
        if let Some(record) = tables.reservations.iter_mut().find(|r| r.id == reservation_id) {
            record.status = status;
        }
    }

    /// Snapshot of every stored debt entry
    pub async fn debts(&self) -> Vec<DebtEntry> {
        self.tables.read().await.debts.clone()
    }

    /// Make every ledger read for this member fail
    pub async fn fail_member(&self, member_id: Uuid) {
        self.faults.write().await.failing_members.insert(member_id);
    }

    /// Make the subscription lookup for this member fail
    pub async fn fail_subscription_lookup(&self, member_id: Uuid) {
        self.faults
            .write()
            .await
            .failing_subscription_lookups
            .insert(member_id);
    }

    pub async fn set_fail_debt_count(&self, fail: bool) {
        self.faults.write().await.fail_debt_count = fail;
    }

    /// Have another writer create the same member-month, with `amounts`, right before the next insert
    pub async fn race_next_insert(&self, amounts: DebtAmounts) {
        self.faults.write().await.insert_race = Some(InsertRace::ConcurrentWriter(amounts));
    }

    /// Make the next insert report a conflict whose row cannot be found afterwards
    pub async fn vanish_next_insert(&self) {
        self.faults.write().await.insert_race = Some(InsertRace::Vanished);
    }

    /// Park the next `list_active_members` call until the returned gate is released
    pub fn pause_member_listing(&self) -> Arc<PauseGate> {
        let gate = Arc::new(PauseGate::default());
        if let Ok(mut slot) = self.member_listing_gate.lock() {
            *slot = Some(gate.clone());
        }
        gate
    }

    fn take_member_listing_gate(&self) -> Option<Arc<PauseGate>> {
        self.member_listing_gate
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
    }

    async fn check_member(&self, member_id: Uuid) -> StoreResult<()> {
        if self.faults.read().await.failing_members.contains(&member_id) {
            return Err(StoreError::Unavailable(format!(
                "ledger read failed for member {}",
                member_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DebtStore for InMemoryDebtStore {
    async fn find_active_society(&self) -> StoreResult<Option<Society>> {
        let tables = self.tables.read().await;
        Ok(tables.societies.iter().find(|s| s.is_active).cloned())
    }

    async fn list_active_members(&self, society_id: Uuid) -> StoreResult<Vec<Member>> {
        if let Some(gate) = self.take_member_listing_gate() {
            gate.park().await;
        }

        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .filter(|m| m.society_id == society_id && m.is_active)
            .cloned()
            .collect())
    }

    async fn sum_consumptions(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        window: MonthWindow,
    ) -> StoreResult<i64> {
        self.check_member(member_id).await?;

        let tables = self.tables.read().await;
        Ok(tables
            .consumptions
            .iter()
            .filter(|c| {
                c.member_id == member_id
                    && c.society_id == society_id
                    && c.status != RecordStatus::Cancelled
                    && window.contains(c.consumed_at)
            })
            .map(|c| c.amount_minor)
            .sum())
    }

    async fn reservation_totals(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        window: MonthWindow,
    ) -> StoreResult<ReservationTotals> {
        self.check_member(member_id).await?;

        let tables = self.tables.read().await;
        let totals = tables
            .reservations
            .iter()
            .filter(|r| {
                r.member_id == member_id
                    && r.society_id == society_id
                    && r.status != RecordStatus::Cancelled
                    && window.contains(r.reserved_at)
            })
            .fold(ReservationTotals::default(), |mut acc, r| {
                acc.amount_minor += r.amount_minor;
                if r.uses_kitchen {
                    acc.kitchen_uses += 1;
                }
                acc
            });
        Ok(totals)
    }

    async fn find_member_subscription(
        &self,
        member_id: Uuid,
        society_id: Uuid,
    ) -> StoreResult<Option<SubscriptionType>> {
        if self
            .faults
            .read()
            .await
            .failing_subscription_lookups
            .contains(&member_id)
        {
            return Err(StoreError::Unavailable(format!(
                "subscription lookup failed for member {}",
                member_id
            )));
        }

        let tables = self.tables.read().await;
        let subscription = tables
            .members
            .iter()
            .find(|m| m.id == member_id && m.society_id == society_id)
            .and_then(|m| m.subscription_type_id)
            .and_then(|id| tables.subscription_types.get(&id))
            .cloned();
        Ok(subscription)
    }

    async fn find_debt(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        month: &str,
    ) -> StoreResult<Option<DebtEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .debts
            .iter()
            .find(|d| d.member_id == member_id && d.society_id == society_id && d.month == month)
            .cloned())
    }

    async fn insert_debt(&self, entry: NewDebtEntry) -> StoreResult<DebtEntry> {
        let race = self.faults.write().await.insert_race.take();
        let mut tables = self.tables.write().await;

        match race {
            Some(InsertRace::ConcurrentWriter(amounts)) => {
                tables.debts.push(debt_row(&entry, amounts));
            }
            Some(InsertRace::Vanished) => {
                return Err(StoreError::DuplicateDebt {
                    member_id: entry.member_id,
                    month: entry.month,
                });
            }
            None => {}
        }

        let exists = tables.debts.iter().any(|d| {
            d.member_id == entry.member_id
                && d.society_id == entry.society_id
                && d.month == entry.month
        });
        if exists {
            return Err(StoreError::DuplicateDebt {
                member_id: entry.member_id,
                month: entry.month,
            });
        }

        let debt = debt_row(&entry, entry.amounts);
        tables.debts.push(debt.clone());
        Ok(debt)
    }

    async fn update_debt_amounts(
        &self,
        debt_id: Uuid,
        amounts: DebtAmounts,
    ) -> StoreResult<DebtEntry> {
        let mut tables = self.tables.write().await;
        let debt = tables
            .debts
            .iter_mut()
            .find(|d| d.id == debt_id)
            .ok_or(StoreError::DebtNotFound(debt_id))?;

        debt.consumption_amount_minor = amounts.consumption_minor;
        debt.reservation_amount_minor = amounts.reservation_minor;
        debt.kitchen_amount_minor = amounts.kitchen_minor;
        debt.subscription_amount_minor = amounts.subscription_minor;
        debt.total_amount_minor = amounts.total_minor();
        debt.updated_at = Utc::now();
        Ok(debt.clone())
    }

    async fn count_debts_for_month(&self, month: &str) -> StoreResult<i64> {
        if self.faults.read().await.fail_debt_count {
            return Err(StoreError::Unavailable("debt count failed".to_string()));
        }
        let tables = self.tables.read().await;
        Ok(tables.debts.iter().filter(|d| d.month == month).count() as i64)
    }

    async fn list_debts_for_month(
        &self,
        society_id: Uuid,
        month: &str,
    ) -> StoreResult<Vec<DebtEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .debts
            .iter()
            .filter(|d| d.society_id == society_id && d.month == month)
            .cloned()
            .collect())
    }

    async fn mark_debt_paid(
        &self,
        debt_id: Uuid,
        paid_amount_minor: i64,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<DebtEntry> {
        let mut tables = self.tables.write().await;
        let debt = tables
            .debts
            .iter_mut()
            .find(|d| d.id == debt_id)
            .ok_or(StoreError::DebtNotFound(debt_id))?;

        debt.paid_amount_minor += paid_amount_minor;
        debt.status = if debt.paid_amount_minor >= debt.total_amount_minor {
            DebtStatus::Paid
        } else {
            DebtStatus::Partial
        };
        debt.paid_at = Some(paid_at);
        debt.updated_at = Utc::now();
        Ok(debt.clone())
    }
}
