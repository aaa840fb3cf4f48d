use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::points::PointEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralKind {
    Member,
    Supporter,
}

impl ReferralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferralKind::Member => "member",
            ReferralKind::Supporter => "supporter",
        }
    }

    pub fn point_event(self) -> PointEvent {
        match self {
            ReferralKind::Member => PointEvent::MemberReferral,
            ReferralKind::Supporter => PointEvent::SupporterReferral,
        }
    }
}

/// One referred person, joined with whichever of profiles/supporters they
/// live in.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ReferredEntry {
    pub referred_id: Uuid,
    pub kind: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ReferralCounts {
    pub members: i64,
    pub supporters: i64,
}

#[derive(Debug, Deserialize)]
pub struct ClaimReferralRequest {
    pub code: String,
}

/// Who owns a referral code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeOwner {
    Profile(Uuid),
    Supporter(Uuid),
}
