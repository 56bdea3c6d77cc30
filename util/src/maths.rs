//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float,
{
    if point_0.len() != point_1.len() {
        return None;
    }

    let sum = point_0
        .iter()
        .zip(point_1.iter())
        .fold(T::zero(), |acc, (a, b)| acc + (*a - *b).powi(2));

    Some(sum.sqrt())
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the half-open range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau = pi + pi;

    let wrapped = pi - rem_euclid(pi - angle, tau);

    // rem_euclid may return exactly tau for tiny negative inputs
    if wrapped <= -pi {
        wrapped + tau
    } else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `a` to `b`, in (-pi, pi].
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float,
{
    wrap_pi(b - a)
}

/// Return the sign of a value as -1, 0 or 1.
///
/// Unlike `Float::signum` zero (of either sign) maps to zero.
pub fn sign<T>(value: T) -> T
where
    T: Float,
{
    if value > T::zero() {
        T::one()
    } else if value < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
