/// A permutation of member indices, best (lowest score) first.
///
/// Both directions of the permutation are kept: output naming needs the rank of a
/// member, refinement needs the member at a rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    order: Vec<usize>,
    positions: Vec<usize>,
}

impl Ranking {
    /// Orders members ascending by `scores`. Ties keep the original index order and
    /// NaN scores sort last.
    pub fn from_scores(scores: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

        let mut positions = vec![0; order.len()];
        for (rank, &member) in order.iter().enumerate() {
            positions[member] = rank;
        }
        Self { order, positions }
    }

    /// Member indices in rank order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn best(&self) -> Option<usize> {
        self.order.first().copied()
    }

    pub fn member_at(&self, rank: usize) -> Option<usize> {
        self.order.get(rank).copied()
    }

    pub fn rank_of(&self, member: usize) -> Option<usize> {
        self.positions.get(member).copied()
    }
}
