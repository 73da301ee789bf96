//! DST transition policies for local slot conversion.

/// Policy for local slot times that do not exist because of a DST gap.
///
/// Ambiguous local times (the repeated hour when clocks fall back) always
/// resolve to the earlier instant; only the gap needs a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Refuse the slot (e.g., 02:30 on the spring-forward day).
    #[default]
    Reject,
    /// Move to the first valid half-hour after the gap.
    ///
    /// The shifted slot reads back as the post-gap local time, so
    /// `from_instant(to_instant(d, m))` is `(d, m)` only for times that exist.
    ShiftForward,
}
