//! Fixed-budget work allocation.
//!
//! The budget is split evenly with integer-minute floor division. Leftover
//! minutes are not redistributed: with 7 issues and 360 minutes each issue gets
//! 51 minutes and 3 minutes are never logged. `WorkPlan::unallocated` exposes
//! that remainder so callers can report it.

use chrono::{Duration, NaiveDate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkShare<T> {
    pub item: T,
    pub duration: Duration,
}

pub fn allocate<T>(items: &[T], budget: Duration) -> Vec<WorkShare<T>>
where
    T: Clone,
{
    if items.is_empty() {
        return Vec::new();
    }

    let share = per_item_minutes(budget.num_minutes(), items.len());
    items
        .iter()
        .map(|item| WorkShare { item: item.clone(), duration: Duration::minutes(share) })
        .collect()
}

fn per_item_minutes(budget_minutes: i64, item_count: usize) -> i64 {
    let count = i64::try_from(item_count).unwrap_or(i64::MAX);
    budget_minutes.max(0) / count
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkAllocationRequest<T> {
    pub items: Vec<T>,
    pub budget: Duration,
    pub reference_date: NaiveDate,
}

impl<T> WorkAllocationRequest<T>
where
    T: Clone,
{
    pub fn new(items: Vec<T>, budget: Duration, reference_date: NaiveDate) -> Self {
        Self { items, budget, reference_date }
    }

    pub fn plan(&self) -> WorkPlan<T> {
        WorkPlan {
            shares: allocate(&self.items, self.budget),
            budget: self.budget,
            reference_date: self.reference_date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkPlan<T> {
    pub shares: Vec<WorkShare<T>>,
    pub budget: Duration,
    pub reference_date: NaiveDate,
}

impl<T> WorkPlan<T> {
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn allocated(&self) -> Duration {
        self.shares.iter().fold(Duration::zero(), |total, share| total + share.duration)
    }

    /// Minutes of the budget that the floor division dropped.
    pub fn unallocated(&self) -> Duration {
        if self.shares.is_empty() {
            return Duration::zero();
        }
        Duration::minutes(self.budget.num_minutes().max(0)) - self.allocated()
    }
}

/// Jira's compact time-spent notation, e.g. `120m`.
pub fn format_jira_duration(duration: Duration) -> String {
    format!("{}m", duration.num_minutes())
}
