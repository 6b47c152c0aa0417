#![forbid(unsafe_code)]

//! Cyclic stepping through an inclusive window of indices.

/// Next index after `current` within the inclusive window `[from, to]`.
///
/// Steps forward by one and wraps to `from` past the end of the window. An
/// index below the window snaps to `from` rather than creeping up one step
/// at a time. The window is expected to be ascending.
///
/// ```
/// use showmirror_core::cycle_next;
///
/// assert_eq!(cycle_next(0, 0, 2), 1);
/// assert_eq!(cycle_next(2, 0, 2), 0);
/// assert_eq!(cycle_next(5, 0, 2), 0);
/// assert_eq!(cycle_next(-1, 1, 2), 1);
/// ```
#[must_use]
pub fn cycle_next(current: i64, from: i64, to: i64) -> i64 {
    let next = current.saturating_add(1);
    if next > to || (next < from && next != to) {
        from
    } else {
        next
    }
}
