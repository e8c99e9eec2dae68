//! Bounded Pareto archive of non-dominated path candidates.
//!
//! The archive is dominance-closed: no stored candidate is strictly
//! dominated by another. When a non-dominated insert would exceed capacity,
//! the member whose removal maximizes the minimum pairwise distance among
//! the survivors is evicted, which preserves spread over the objective
//! space rather than raw quality.
//!
//! All operations are pure functions of the arguments and current state:
//! no I/O, no errors. Internal serialization is a single mutex so callers
//! may invoke concurrently; nothing here ever awaits while holding it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::models::PathCandidate;

/// Bounded set of non-dominated candidates with diversity-preserving
/// eviction and selection.
pub struct ParetoArchive {
    capacity: usize,
    members: Mutex<Vec<Arc<PathCandidate>>>,
}

impl ParetoArchive {
    /// Create an archive holding at most `capacity` candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            members: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<PathCandidate>>> {
        // Critical sections are panic-free pure data manipulation, so a
        // poisoned lock still holds consistent state.
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a candidate.
    ///
    /// Rejected if any existing member dominates it. Otherwise every member
    /// it dominates is removed, the candidate is inserted, and if the
    /// archive now exceeds capacity the diversity-preserving eviction runs.
    /// Returns whether the candidate is in the archive afterwards.
    pub fn add(&self, candidate: Arc<PathCandidate>) -> bool {
        let mut members = self.lock();
        let scores = candidate.scores_or_zero();

        if members
            .iter()
            .any(|m| m.scores_or_zero().dominates(&scores))
        {
            return false;
        }

        members.retain(|m| !scores.dominates(&m.scores_or_zero()));
        let id = candidate.id.clone();
        members.push(candidate);

        if members.len() > self.capacity {
            let victim = eviction_victim(&members);
            members.remove(victim);
        }

        members.iter().any(|m| m.id == id)
    }

    /// Up to `k` candidates to mutate next.
    ///
    /// The Pareto front is preferred; if it is smaller than `k` the
    /// selection extends by highest `answer_quality`. Within each pool,
    /// picks maximize Euclidean distance from the already-selected set so
    /// parents spread over the objective space.
    pub fn select_for_mutation(&self, k: usize) -> Vec<Arc<PathCandidate>> {
        let members = self.lock();
        if k == 0 || members.is_empty() {
            return Vec::new();
        }

        let front_ids = front_ids(&members);
        let (mut front, mut rest): (Vec<_>, Vec<_>) = members
            .iter()
            .cloned()
            .partition(|m| front_ids.contains(&m.id));

        let mut selected: Vec<Arc<PathCandidate>> = Vec::with_capacity(k);
        pick_diverse(&mut selected, &mut front, k);
        if selected.len() < k {
            // Extension pool ordered by quality, diversity as tie-break.
            rest.sort_by(|a, b| {
                b.quality()
                    .partial_cmp(&a.quality())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
            pick_diverse(&mut selected, &mut rest, k);
        }
        selected
    }

    /// The subset not dominated by any other member.
    ///
    /// Because `add` keeps the archive dominance-closed this is normally the
    /// whole archive, but the computation does not rely on that.
    pub fn pareto_front(&self) -> Vec<Arc<PathCandidate>> {
        let members = self.lock();
        let ids = front_ids(&members);
        members
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect()
    }

    /// The maximally distant pair on the Pareto front, or `None` when the
    /// front has fewer than two members.
    pub fn select_diverse_pair(&self) -> Option<(Arc<PathCandidate>, Arc<PathCandidate>)> {
        let front = self.pareto_front();
        if front.len() < 2 {
            return None;
        }
        let mut best = (0, 1);
        let mut best_dist = -1.0f64;
        for i in 0..front.len() {
            for j in (i + 1)..front.len() {
                let d = front[i]
                    .scores_or_zero()
                    .euclidean_distance(&front[j].scores_or_zero());
                if d > best_dist {
                    best_dist = d;
                    best = (i, j);
                }
            }
        }
        Some((front[best.0].clone(), front[best.1].clone()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Ids of members not dominated by any other member.
fn front_ids(members: &[Arc<PathCandidate>]) -> Vec<String> {
    members
        .iter()
        .filter(|a| {
            !members
                .iter()
                .any(|b| b.scores_or_zero().dominates(&a.scores_or_zero()))
        })
        .map(|a| a.id.clone())
        .collect()
}

/// Greedily move candidates from `pool` into `selected` until it holds `k`,
/// always taking the candidate farthest (by minimum distance) from what is
/// already selected. The first pick from an empty selection is the
/// highest-quality pool member.
fn pick_diverse(
    selected: &mut Vec<Arc<PathCandidate>>,
    pool: &mut Vec<Arc<PathCandidate>>,
    k: usize,
) {
    while selected.len() < k && !pool.is_empty() {
        let idx = if selected.is_empty() {
            let mut best = 0;
            for i in 1..pool.len() {
                if pool[i].quality() > pool[best].quality() {
                    best = i;
                }
            }
            best
        } else {
            let mut best = 0;
            let mut best_dist = -1.0f64;
            for (i, cand) in pool.iter().enumerate() {
                let min_dist = selected
                    .iter()
                    .map(|s| s.scores_or_zero().euclidean_distance(&cand.scores_or_zero()))
                    .fold(f64::INFINITY, f64::min);
                if min_dist > best_dist {
                    best_dist = min_dist;
                    best = i;
                }
            }
            best
        };
        selected.push(pool.remove(idx));
    }
}

/// Index of the member to evict from an over-capacity archive: the one whose
/// removal maximizes the minimum pairwise distance among the survivors.
/// Ties go to the lowest `answer_quality`, then the oldest `created_at`.
fn eviction_victim(members: &[Arc<PathCandidate>]) -> usize {
    let n = members.len();
    let mut dist = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = members[i]
                .scores_or_zero()
                .euclidean_distance(&members[j].scores_or_zero());
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }

    let survivor_min_dist = |removed: usize| -> f64 {
        let mut min = f64::INFINITY;
        for i in 0..n {
            if i == removed {
                continue;
            }
            for j in (i + 1)..n {
                if j == removed {
                    continue;
                }
                min = min.min(dist[i][j]);
            }
        }
        min
    };

    let mut victim = 0;
    let mut victim_spread = f64::NEG_INFINITY;
    for i in 0..n {
        let spread = survivor_min_dist(i);
        let better = spread > victim_spread
            || (spread == victim_spread
                && (members[i].quality() < members[victim].quality()
                    || (members[i].quality() == members[victim].quality()
                        && members[i].created_at < members[victim].created_at)));
        if better {
            victim = i;
            victim_spread = spread;
        }
    }
    victim
}
