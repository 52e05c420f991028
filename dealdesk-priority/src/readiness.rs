//! Execution readiness: what stands between a deal and its next step.

use crate::types::Difficulty;
use dealdesk_model::{Deal, DealStage};
use serde::Serialize;

/// A missing prerequisite. Each one costs readiness and maps to one
/// remediation the dashboard can suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Blocker {
    MissingNextAction,
    MissingNextActionDate,
    NotStarted,
    NoContacts,
}

impl Blocker {
    pub fn penalty(&self) -> u8 {
        match self {
            Blocker::MissingNextAction => 40,
            Blocker::MissingNextActionDate => 25,
            Blocker::NotStarted => 20,
            Blocker::NoContacts => 15,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Blocker::MissingNextAction => "مفيش خطوة جاية محددة",
            Blocker::MissingNextActionDate => "مفيش ميعاد للخطوة الجاية",
            Blocker::NotStarted => "لسه في أول مرحلة",
            Blocker::NoContacts => "مفيش جهة اتصال",
        }
    }

    pub fn remedy(&self) -> &'static str {
        match self {
            Blocker::MissingNextAction => "حدد الخطوة الجاية",
            Blocker::MissingNextActionDate => "حدد ميعاد للخطوة الجاية",
            Blocker::NotStarted => "اتواصل وابدأ الكلام",
            Blocker::NoContacts => "ضيف جهة اتصال",
        }
    }
}

/// Blockers of a deal, most severe first. A missing date is only reported
/// when there is an action to date.
pub fn blockers(deal: &Deal) -> Vec<Blocker> {
    let mut found = Vec::new();
    if !deal.has_next_action() {
        found.push(Blocker::MissingNextAction);
    } else if deal.next_action_date.is_none() {
        found.push(Blocker::MissingNextActionDate);
    }
    if deal.stage == DealStage::New {
        found.push(Blocker::NotStarted);
    }
    if deal.contacts.is_empty() {
        found.push(Blocker::NoContacts);
    }
    found
}

pub fn readiness_score(blockers: &[Blocker]) -> u8 {
    blockers
        .iter()
        .fold(100u8, |score, b| score.saturating_sub(b.penalty()))
}

fn stage_weight(stage: DealStage) -> usize {
    match stage {
        DealStage::New => 2,
        DealStage::Talking | DealStage::Negotiating => 1,
        _ => 0,
    }
}

/// Early stages and open blockers both make a deal harder to move.
pub fn difficulty(deal: &Deal, blockers: &[Blocker]) -> Difficulty {
    match blockers.len() + stage_weight(deal.stage) {
        0 => Difficulty::Easy,
        1 | 2 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}

pub fn suggested_action(deal: &Deal, blockers: &[Blocker]) -> Option<String> {
    if let Some(first) = blockers.first() {
        return Some(first.remedy().to_string());
    }
    if deal.stage == DealStage::AwaitingSignature {
        return Some("تابع التوقيع".to_string());
    }
    deal.next_action.clone()
}
