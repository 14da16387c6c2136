//! Edge selection rules for the simultaneous-move tree.

use rand::Rng;

use crate::search::{ActionStats, Node};

pub trait Policy: Copy + Send + 'static {
    /// Picks a child, returning its index and the probability it was picked with.
    fn select<R: Rng>(&self, children: &[Node], rng: &mut R, scratch: &mut Vec<f32>) -> (u16, f32);

    /// Records `reward` (from the chooser's point of view, in `[-1, 1]`) on an edge that was
    /// taken with `probability`.
    fn update(&self, node: &mut Node, reward: f32, probability: f32);

    /// Strength of a root action once all workers' statistics are merged.
    fn rank(&self, stats: &ActionStats) -> f64;
}

/// Upper confidence bound over win counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ucb {
    pub exploration: f32,
}

impl Policy for Ucb {
    fn select<R: Rng>(&self, children: &[Node], _: &mut R, _: &mut Vec<f32>) -> (u16, f32) {
        if let Some(i) = children.iter().position(|n| n.visits == 0) {
            return (i as u16, 1.);
        }

        let total: u32 = children.iter().map(|n| n.visits).sum();
        let log_total = (total as f32).ln();

        let mut best = f32::NEG_INFINITY;
        let mut best_index = 0;
        for (i, n) in children.iter().enumerate() {
            let visits = n.visits as f32;
            let value = n.score / visits + self.exploration * (log_total / visits).sqrt();
            if value > best {
                best = value;
                best_index = i;
            }
        }

        (best_index as u16, 1.)
    }

    fn update(&self, node: &mut Node, reward: f32, _: f32) {
        node.visits += 1;
        if reward > 0. {
            node.score += 1.;
        }
    }

    fn rank(&self, stats: &ActionStats) -> f64 {
        if stats.visits == 0 {
            0.
        } else {
            stats.score / stats.visits as f64
        }
    }
}

/// Exponential weights with a uniform exploration floor of `gamma`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exp3 {
    pub gamma: f32,
}

impl Exp3 {
    /// Fills `out` with the selection distribution over `children`.
    pub fn distribution(&self, children: &[Node], out: &mut Vec<f32>) {
        let k = children.len() as f32;
        let eta = self.gamma / k;

        out.clear();
        out.extend(children.iter().map(|n| eta * n.score));

        let max = out.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.;
        for w in out.iter_mut() {
            *w = (*w - max).exp();
            sum += *w;
        }
        for w in out.iter_mut() {
            *w = (1. - self.gamma) * *w / sum + self.gamma / k;
        }
    }
}

impl Policy for Exp3 {
    fn select<R: Rng>(&self, children: &[Node], rng: &mut R, scratch: &mut Vec<f32>) -> (u16, f32) {
        self.distribution(children, scratch);

        let mut target = rng.gen::<f32>();
        for (i, &p) in scratch.iter().enumerate() {
            if target < p {
                return (i as u16, p);
            }
            target -= p;
        }

        // Rounding left a sliver past the last bucket.
        let last = scratch.len() - 1;
        (last as u16, scratch[last])
    }

    fn update(&self, node: &mut Node, reward: f32, probability: f32) {
        node.visits += 1;
        node.score += (reward + 1.) / 2. / probability;
    }

    fn rank(&self, stats: &ActionStats) -> f64 {
        stats.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn node(visits: u32, score: f32) -> Node {
        Node {
            visits,
            score,
            ..Node::LEAF
        }
    }

    #[test]
    fn ucb_tries_unvisited_first() {
        let ucb = Ucb {
            exploration: core::f32::consts::SQRT_2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let children = [node(3, 3.), node(0, 0.), node(0, 0.)];
        assert_eq!(ucb.select(&children, &mut rng, &mut vec![]), (1, 1.));
    }

    #[test]
    fn ucb_prefers_winners_and_breaks_ties_low() {
        let ucb = Ucb { exploration: 0.5 };
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let children = [node(10, 2.), node(10, 8.), node(10, 8.)];
        assert_eq!(ucb.select(&children, &mut rng, &mut vec![]).0, 1);

        let even = [node(4, 2.), node(4, 2.)];
        assert_eq!(ucb.select(&even, &mut rng, &mut vec![]).0, 0);
    }

    #[test]
    fn ucb_counts_wins_only() {
        let ucb = Ucb { exploration: 1. };
        let mut n = Node::LEAF;
        for reward in [1., 0., -1., 1.] {
            ucb.update(&mut n, reward, 0.5);
        }
        assert_eq!((n.visits, n.score), (4, 2.));
        assert_eq!(ucb.rank(&ActionStats { visits: 4, score: 2. }), 0.5);
        assert_eq!(ucb.rank(&ActionStats::default()), 0.);
    }

    #[test]
    fn exp3_distribution_has_a_floor() {
        let exp3 = Exp3 { gamma: 0.1 };
        let children = [node(5, 40.), node(5, 0.), node(5, 120.), node(0, 0.)];
        let mut p = vec![];
        exp3.distribution(&children, &mut p);

        let total: f32 = p.iter().sum();
        assert!((total - 1.).abs() < 1e-5);
        assert!(p.iter().all(|&p| p >= 0.1 / 4. - 1e-6));
        assert!(p[2] > p[0] && p[0] > p[1]);
    }

    #[test]
    fn exp3_samples_roughly_by_distribution() {
        let exp3 = Exp3 { gamma: 0.5 };
        let children = [node(1, 0.), node(1, 80.)];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut scratch = vec![];

        let mut p = vec![];
        exp3.distribution(&children, &mut p);

        let mut hits = [0u32; 2];
        for _ in 0..10_000 {
            let (i, prob) = exp3.select(&children, &mut rng, &mut scratch);
            assert_eq!(prob, p[i as usize]);
            hits[i as usize] += 1;
        }
        let observed = hits[1] as f32 / 10_000.;
        assert!((observed - p[1]).abs() < 0.03, "{observed} vs {}", p[1]);
    }

    #[test]
    fn exp3_weights_gain_by_probability() {
        let exp3 = Exp3 { gamma: 0.1 };
        let mut n = Node::LEAF;
        exp3.update(&mut n, 1., 0.25);
        exp3.update(&mut n, -1., 0.5);
        exp3.update(&mut n, 0., 0.5);
        assert_eq!(n.visits, 3);
        assert!((n.score - 5.).abs() < 1e-6);
    }
}
