use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::models::{PeerActivityGroup, PeerCandidate, PositiveAction};
use crate::policy::BehaviorPolicy;
use crate::scoring;
use crate::store::RecommendationStore;
use crate::tier;

/// Finds actions common among higher-performing peers that the student has
/// never earned points for.
pub struct PositiveActionAnalyzer<'a> {
    store: &'a dyn RecommendationStore,
    config: &'a AnalysisConfig,
    policy: &'a BehaviorPolicy,
}

struct PeerActions {
    peer_count: usize,
    top_actions: Vec<PeerActivityGroup>,
}

impl<'a> PositiveActionAnalyzer<'a> {
    pub fn new(
        store: &'a dyn RecommendationStore,
        config: &'a AnalysisConfig,
        policy: &'a BehaviorPolicy,
    ) -> Self {
        Self {
            store,
            config,
            policy,
        }
    }

    pub async fn analyze(
        &self,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PositiveAction>, AnalysisError> {
        let (peer_actions, own_labels) = tokio::try_join!(
            self.peer_actions(student_id, now),
            self.own_labels(student_id)
        )?;

        Ok(find_gaps(
            peer_actions.top_actions,
            peer_actions.peer_count,
            &own_labels,
            self.config,
            self.policy,
        ))
    }

    async fn peer_actions(
        &self,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<PeerActions, AnalysisError> {
        let total_points = self
            .store
            .get_total_points(student_id)
            .await?
            .ok_or(AnalysisError::UnknownStudent(student_id))?;

        let candidates = self
            .store
            .find_students_with_points_at_least(tier::peer_floor(total_points), student_id)
            .await?;
        let peers = select_peers(total_points, candidates, self.config.peer_limit);
        debug!(student_id, total_points, peers = peers.len(), "peer cohort selected");

        if peers.is_empty() {
            return Ok(PeerActions {
                peer_count: 0,
                top_actions: Vec::new(),
            });
        }

        let peer_ids: Vec<i64> = peers.iter().map(|peer| peer.student_id).collect();
        let since = scoring::cutoff(now, self.config.window_days);
        let groups = self
            .store
            .find_positive_activities_for_students(&peer_ids, since)
            .await?;

        Ok(PeerActions {
            peer_count: peers.len(),
            top_actions: top_peer_actions(groups, self.config),
        })
    }

    async fn own_labels(&self, student_id: i64) -> Result<BTreeSet<String>, AnalysisError> {
        Ok(self.store.find_own_positive_activity_labels(student_id).await?)
    }
}

/// Keeps candidates inside the student's reference tiers and at or above the
/// student's own total, highest totals first, capped at `limit`.
pub fn select_peers(
    total_points: i64,
    mut candidates: Vec<PeerCandidate>,
    limit: usize,
) -> Vec<PeerCandidate> {
    candidates.retain(|peer| tier::in_reference_group(total_points, peer.total_points));
    candidates.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then(a.student_id.cmp(&b.student_id))
    });
    candidates.truncate(limit);
    candidates
}

pub fn top_peer_actions(
    mut groups: Vec<PeerActivityGroup>,
    config: &AnalysisConfig,
) -> Vec<PeerActivityGroup> {
    groups.retain(|group| group.count >= config.min_action_frequency);
    groups.sort_by(|a, b| {
        scoring::descending(
            scoring::peer_action_weight(a.avg_points, a.count),
            scoring::peer_action_weight(b.avg_points, b.count),
        )
        .then_with(|| a.activity.cmp(&b.activity))
    });
    groups.truncate(config.top_actions_limit);
    groups
}

pub fn find_gaps(
    top_actions: Vec<PeerActivityGroup>,
    peer_count: usize,
    own_labels: &BTreeSet<String>,
    config: &AnalysisConfig,
    policy: &BehaviorPolicy,
) -> Vec<PositiveAction> {
    top_actions
        .into_iter()
        .filter(|group| !own_labels.contains(&group.activity))
        .map(|group| PositiveAction {
            average_points: group.avg_points,
            adoption_rate: scoring::adoption_rate(group.student_count, peer_count),
            implementation_tips: vec![policy.positive_tip(&group.activity)],
            priority_score: scoring::positive_priority(group.avg_points, config.positive_action_weight),
            action: group.activity,
        })
        .collect()
}
