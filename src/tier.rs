use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceTier {
    Low,
    Average,
    Excellent,
    Outstanding,
}

impl PerformanceTier {
    pub fn classify(total_points: i64) -> Self {
        match total_points {
            p if p >= 90 => PerformanceTier::Outstanding,
            p if p >= 80 => PerformanceTier::Excellent,
            p if p >= 60 => PerformanceTier::Average,
            _ => PerformanceTier::Low,
        }
    }

    /// Lowest total that still lands in this tier.
    pub fn min_points(&self) -> i64 {
        match self {
            PerformanceTier::Outstanding => 90,
            PerformanceTier::Excellent => 80,
            PerformanceTier::Average => 60,
            PerformanceTier::Low => i64::MIN,
        }
    }

    /// Tiers a student of this tier is compared against. Never below the
    /// student's own tier.
    pub fn reference_group(&self) -> &'static [PerformanceTier] {
        match self {
            PerformanceTier::Outstanding => &[PerformanceTier::Outstanding],
            PerformanceTier::Excellent => &[PerformanceTier::Outstanding, PerformanceTier::Excellent],
            PerformanceTier::Average => &[PerformanceTier::Excellent, PerformanceTier::Average],
            PerformanceTier::Low => &[PerformanceTier::Average],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceTier::Outstanding => "OUTSTANDING",
            PerformanceTier::Excellent => "EXCELLENT",
            PerformanceTier::Average => "AVERAGE",
            PerformanceTier::Low => "LOW",
        }
    }
}

/// Minimum total a peer needs: the lowest reference tier's floor, raised to
/// the student's own total.
pub fn peer_floor(total_points: i64) -> i64 {
    let tier = PerformanceTier::classify(total_points);
    let tier_floor = tier
        .reference_group()
        .iter()
        .map(PerformanceTier::min_points)
        .min()
        .unwrap_or(i64::MIN);
    tier_floor.max(total_points)
}

pub fn in_reference_group(student_total: i64, peer_total: i64) -> bool {
    PerformanceTier::classify(student_total)
        .reference_group()
        .contains(&PerformanceTier::classify(peer_total))
        && peer_total >= peer_floor(student_total)
}
