//! Gamification points: per-event values, the expected-total formula and the
//! audit that diffs it against what is stored on each profile.

use serde::Serialize;
use uuid::Uuid;

use crate::models::badge::Badge;

pub const SIGNUP_POINTS: i32 = 10;
pub const MEMBER_REFERRAL_POINTS: i32 = 20;
pub const SUPPORTER_REFERRAL_POINTS: i32 = 10;
pub const VOTE_POINTS: i32 = 5;
pub const PROFILE_COMPLETION_POINTS: i32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointEvent {
    Signup,
    MemberReferral,
    SupporterReferral,
    Vote,
    ProfileCompletion,
}

impl PointEvent {
    pub fn value(self) -> i32 {
        match self {
            PointEvent::Signup => SIGNUP_POINTS,
            PointEvent::MemberReferral => MEMBER_REFERRAL_POINTS,
            PointEvent::SupporterReferral => SUPPORTER_REFERRAL_POINTS,
            PointEvent::Vote => VOTE_POINTS,
            PointEvent::ProfileCompletion => PROFILE_COMPLETION_POINTS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PointEvent::Signup => "signup",
            PointEvent::MemberReferral => "member_referral",
            PointEvent::SupporterReferral => "supporter_referral",
            PointEvent::Vote => "vote",
            PointEvent::ProfileCompletion => "profile_completion",
        }
    }
}

/// Event counts for one profile, as gathered by the audit query.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct PointsTally {
    pub user_id: Uuid,
    pub username: String,
    pub current_points: i32,
    pub member_referrals: i64,
    pub supporter_referrals: i64,
    pub votes: i64,
    pub profile_completed: bool,
}

impl PointsTally {
    pub fn expected_points(&self) -> i64 {
        i64::from(SIGNUP_POINTS)
            + i64::from(MEMBER_REFERRAL_POINTS) * self.member_referrals
            + i64::from(SUPPORTER_REFERRAL_POINTS) * self.supporter_referrals
            + i64::from(VOTE_POINTS) * self.votes
            + if self.profile_completed {
                i64::from(PROFILE_COMPLETION_POINTS)
            } else {
                0
            }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Discrepancy {
    pub user_id: Uuid,
    pub username: String,
    pub current_points: i32,
    pub expected_points: i64,
    /// Positive when the profile is owed points.
    pub difference: i64,
    pub member_referrals: i64,
    pub supporter_referrals: i64,
    pub votes: i64,
    pub profile_completed: bool,
}

pub fn audit(tallies: &[PointsTally]) -> Vec<Discrepancy> {
    tallies
        .iter()
        .filter_map(|tally| {
            let expected = tally.expected_points();
            let current = i64::from(tally.current_points);
            (expected != current).then(|| Discrepancy {
                user_id: tally.user_id,
                username: tally.username.clone(),
                current_points: tally.current_points,
                expected_points: expected,
                difference: expected - current,
                member_referrals: tally.member_referrals,
                supporter_referrals: tally.supporter_referrals,
                votes: tally.votes,
                profile_completed: tally.profile_completed,
            })
        })
        .collect()
}

/// Badges whose threshold the given total reaches.
pub fn earned_badges(points: i32, badges: &[Badge]) -> Vec<Uuid> {
    badges
        .iter()
        .filter(|badge| badge.points_threshold <= points)
        .map(|badge| badge.id)
        .collect()
}
