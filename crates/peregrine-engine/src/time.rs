//! Time management — convert clock parameters to search budgets.

/// Compute soft and hard time budgets, in seconds, from the remaining
/// clock time, the increment, and an optional moves-to-go count.
///
/// Formula:
/// - `base = usable / moves_to_go` (default 25 when not specified)
/// - `soft = base + increment * 0.75`
/// - `hard = min(usable * 0.3, soft * 3.0)`
///
/// `usable` holds back a 10 ms overhead. Very low or zero remaining
/// time yields 1 ms budgets.
pub fn compute_limits(remaining: f64, increment: f64, moves_to_go: Option<u32>) -> (f64, f64) {
    if remaining < 0.010 {
        return (0.001, 0.001);
    }

    let usable = (remaining - 0.010).max(0.001);
    let mtg = moves_to_go.unwrap_or(25).max(1) as f64;

    let base = usable / mtg;
    let soft = (base + increment * 0.75).min(usable).max(0.001);
    let hard = (usable * 0.3).min(soft * 3.0).min(usable).max(0.001);

    (soft, hard)
}
