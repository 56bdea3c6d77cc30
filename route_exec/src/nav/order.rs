//! # Visiting order
//!
//! Exhaustive search over every visiting order of the obstacles, scored by the straight line
//! distance from the start through each obstacle's target pose in turn. The factorial cost limits
//! this to a handful of obstacles, so the number accepted is bounded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};

use super::NavError;
use crate::loc::Pose;
use crate::map::Obstacle;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Iterator over every permutation of `0..n` in lexicographic order, starting from the identity.
#[derive(Debug, Clone)]
pub struct Permutations {
    current: Option<Vec<usize>>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Permutations {
    pub fn new(n: usize) -> Self {
        Self {
            current: Some((0..n).collect()),
        }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let out = self.current.take()?;

        let mut next = out.clone();
        if next_permutation(&mut next) {
            self.current = Some(next);
        }

        Some(out)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Length of the straight line route from `start` through each obstacle's target position.
pub fn route_length(start: &Pose, order: &[Obstacle]) -> f64 {
    order
        .iter()
        .fold((0.0, *start), |(dist, prev), o| {
            let target = o.target_pose();
            (dist + prev.distance_to(&target), target)
        })
        .0
}

/// Find the visiting order with the shortest [`route_length`].
///
/// Ties are broken in favour of the lexicographically first order of obstacle indices. No
/// obstacles gives an empty order.
pub fn best_order(
    start: &Pose,
    obstacles: &[Obstacle],
    max_obstacles: usize,
) -> Result<Vec<Obstacle>, NavError> {
    if obstacles.len() > max_obstacles {
        return Err(NavError::TooManyObstacles(obstacles.len(), max_obstacles));
    }

    // Distances are precomputed so each permutation is only a sum of table lookups
    let targets: Vec<Pose> = obstacles.iter().map(|o| o.target_pose()).collect();
    let from_start: Vec<f64> = targets.iter().map(|t| start.distance_to(t)).collect();
    let between: Vec<Vec<f64>> = targets
        .iter()
        .map(|a| targets.iter().map(|b| a.distance_to(b)).collect())
        .collect();

    let mut best: Option<(f64, Vec<usize>)> = None;
    let mut num_tested = 0usize;

    for perm in Permutations::new(obstacles.len()) {
        num_tested += 1;

        let length = match perm.first() {
            Some(&first) => {
                from_start[first]
                    + perm
                        .windows(2)
                        .map(|w| between[w[0]][w[1]])
                        .sum::<f64>()
            }
            None => 0.0,
        };

        let better = match best {
            Some((best_length, _)) => length < best_length,
            None => true,
        };
        if better {
            best = Some((length, perm));
        }
    }

    let (length, perm) = best.unwrap_or((0.0, Vec::new()));

    debug!("Tested {} visiting orders", num_tested);
    info!(
        "Visiting order {:?}, route length {:.2} cm",
        perm.iter().map(|&i| obstacles[i].id).collect::<Vec<_>>(),
        length
    );

    Ok(perm.into_iter().map(|i| obstacles[i]).collect())
}

/// Rearrange `items` into the next lexicographically greater permutation.
///
/// Returns `false`, leaving `items` unchanged, if it is already the last permutation.
fn next_permutation<T: Ord>(items: &mut [T]) -> bool {
    if items.len() < 2 {
        return false;
    }

    // Longest non-increasing suffix
    let mut pivot = items.len() - 1;
    while pivot > 0 && items[pivot - 1] >= items[pivot] {
        pivot -= 1;
    }
    if pivot == 0 {
        return false;
    }

    let mut successor = items.len() - 1;
    while items[successor] <= items[pivot - 1] {
        successor -= 1;
    }

    items.swap(pivot - 1, successor);
    items[pivot..].reverse();

    true
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::Direction;
    use crate::map::{ArenaParams, ObstacleParams};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn obstacles_from(points: &[(f64, f64, Direction)]) -> Vec<Obstacle> {
        let arena = ArenaParams::default();
        let params = ObstacleParams::default();

        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, d))| Obstacle::new(i, x, y, d, &arena, &params).unwrap())
            .collect()
    }

    #[test]
    fn test_permutations() {
        let perms: Vec<Vec<usize>> = Permutations::new(3).collect();
        assert_eq!(
            perms,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0]
            ]
        );

        assert_eq!(Permutations::new(5).count(), 120);
        assert_eq!(Permutations::new(0).collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_no_obstacles() {
        let start = ArenaParams::default().start_pose();
        assert_eq!(best_order(&start, &[], 8).unwrap(), Vec::new());
    }

    #[test]
    fn test_too_many_obstacles() {
        let start = ArenaParams::default().start_pose();
        let obstacles = obstacles_from(&[(50.0, 50.0, Direction::Top); 4]);

        assert_eq!(
            best_order(&start, &obstacles, 3),
            Err(NavError::TooManyObstacles(4, 3))
        );
    }

    #[test]
    fn test_best_order_is_optimal() {
        let mut rng = StdRng::seed_from_u64(42);
        let start = ArenaParams::default().start_pose();

        for n in 1..=5 {
            for _ in 0..20 {
                let points: Vec<(f64, f64, Direction)> = (0..n)
                    .map(|_| {
                        (
                            rng.gen_range(30.0..170.0),
                            rng.gen_range(30.0..170.0),
                            Direction::ALL[rng.gen_range(0..4usize)],
                        )
                    })
                    .collect();
                let obstacles = obstacles_from(&points);

                let best = best_order(&start, &obstacles, 8).unwrap();
                let best_length = route_length(&start, &best);
                assert_eq!(best.len(), n);

                for perm in Permutations::new(n) {
                    let order: Vec<Obstacle> = perm.iter().map(|&i| obstacles[i]).collect();
                    assert!(best_length <= route_length(&start, &order) + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_reference_scenario_order() {
        let arena = ArenaParams::default();
        let obstacles = crate::test_util::reference_obstacles();

        let order = best_order(&arena.start_pose(), &obstacles, 8).unwrap();

        assert_eq!(
            order.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![1, 0, 4, 3, 2]
        );
        assert!((route_length(&arena.start_pose(), &order) - 392.057).abs() < 1e-3);
    }
}
