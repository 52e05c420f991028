//! Entity-specific shortcuts on top of [`Repository`].

use crate::error::DataResult;
use crate::repository::{Repository, WriteOutcome, field};
use chrono::NaiveDate;
use dealdesk_model::{DailyMove, Deal, DealStage, Debt, RecordId, Task};
use rust_decimal::Decimal;
use serde_json::{Value, json};

impl Repository<Deal> {
    /// Deals that still need work (not deferred, closed or cancelled).
    pub async fn active(&self) -> DataResult<Vec<Deal>> {
        Ok(self.list().await?.into_iter().filter(Deal::is_active).collect())
    }

    pub async fn set_stage(&self, id: &RecordId, stage: DealStage) -> DataResult<WriteOutcome<Deal>> {
        self.update(id, field("stage", serde_json::to_value(stage)?)).await
    }
}

impl Repository<Debt> {
    /// Marks a debt paid; nothing remains outstanding.
    pub async fn mark_paid(&self, id: &RecordId) -> DataResult<WriteOutcome<Debt>> {
        self.update(
            id,
            json!({ "is_paid": true, "remaining_amount": Decimal::ZERO }),
        )
        .await
    }

    pub async fn unpaid(&self) -> DataResult<Vec<Debt>> {
        Ok(self.list().await?.into_iter().filter(|d| !d.is_paid).collect())
    }
}

impl Repository<Task> {
    pub async fn set_completed(&self, id: &RecordId, done: bool) -> DataResult<WriteOutcome<Task>> {
        self.update(id, field("is_completed", Value::Bool(done))).await
    }

    pub async fn toggle_completed(&self, id: &RecordId) -> DataResult<WriteOutcome<Task>> {
        let task = self.require(id).await?;
        self.set_completed(id, !task.is_completed).await
    }
}

impl Repository<DailyMove> {
    /// Moves planned for `day`, in rank order.
    pub async fn for_day(&self, day: NaiveDate) -> DataResult<Vec<DailyMove>> {
        let mut moves: Vec<_> = self
            .list()
            .await?
            .into_iter()
            .filter(|m| m.move_date == day)
            .collect();
        moves.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(moves)
    }

    pub async fn set_completed(
        &self,
        id: &RecordId,
        done: bool,
    ) -> DataResult<WriteOutcome<DailyMove>> {
        self.update(id, field("is_completed", Value::Bool(done))).await
    }

    pub async fn toggle_completed(&self, id: &RecordId) -> DataResult<WriteOutcome<DailyMove>> {
        let daily = self.require(id).await?;
        self.set_completed(id, !daily.is_completed).await
    }
}
