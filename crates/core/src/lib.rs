#![forbid(unsafe_code)]

pub mod order {
    use std::cmp::Ordering;

    /// Batched position adjustment that relocates exactly one task inside a
    /// dense column while keeping every other task's relative order.
    ///
    /// Positions in a column always form the contiguous run `0..count`. Moving
    /// one task shifts the tasks between its old and new slot by one step in
    /// the opposite direction; the two variants carry the half-open range
    /// bounds of that shift.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Shift {
        /// Target equals the current position; nothing moves.
        None,
        /// Task moves toward the tail: positions in `(after, up_to]` step back
        /// by one, closing the gap it left behind.
        TowardTail { after: i64, up_to: i64 },
        /// Task moves toward the head: positions in `[from, before)` step
        /// forward by one, opening a slot at `from`.
        TowardHead { from: i64, before: i64 },
    }

    impl Shift {
        pub fn plan(old_position: i64, new_position: i64) -> Self {
            match new_position.cmp(&old_position) {
                Ordering::Equal => Shift::None,
                Ordering::Greater => Shift::TowardTail {
                    after: old_position,
                    up_to: new_position,
                },
                Ordering::Less => Shift::TowardHead {
                    from: new_position,
                    before: old_position,
                },
            }
        }
    }

    /// Valid targets for repositioning inside a column: `0..count`.
    pub fn reorder_in_bounds(new_position: i64, count: i64) -> bool {
        new_position >= 0 && new_position < count
    }

    /// Valid targets for inserting into a column: `0..=count` (the tail slot
    /// is a legal destination).
    pub fn insert_in_bounds(new_position: i64, count: i64) -> bool {
        new_position >= 0 && new_position <= count
    }
}

pub mod model {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub enum Priority {
        Low,
        #[default]
        Medium,
        High,
    }

    impl Priority {
        pub fn as_str(self) -> &'static str {
            match self {
                Priority::Low => "low",
                Priority::Medium => "medium",
                Priority::High => "high",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value.trim() {
                "low" => Some(Priority::Low),
                "medium" => Some(Priority::Medium),
                "high" => Some(Priority::High),
                _ => None,
            }
        }
    }

    /// Column palette seeded into a fresh board: `(name, color)`.
    pub const DEFAULT_COLUMNS: &[(&str, &str)] = &[
        ("To Do", "#EF4444"),
        ("In Progress", "#F59E0B"),
        ("In Review", "#3B82F6"),
        ("Done", "#10B981"),
    ];
}

#[cfg(test)]
mod tests {
    use super::model::Priority;
    use super::order::{Shift, insert_in_bounds, reorder_in_bounds};

    #[test]
    fn plan_same_position_is_none() {
        assert_eq!(Shift::plan(2, 2), Shift::None);
        assert_eq!(Shift::plan(0, 0), Shift::None);
    }

    #[test]
    fn plan_toward_tail_covers_half_open_range_after_old() {
        assert_eq!(Shift::plan(1, 3), Shift::TowardTail { after: 1, up_to: 3 });
        assert_eq!(Shift::plan(0, 1), Shift::TowardTail { after: 0, up_to: 1 });
    }

    #[test]
    fn plan_toward_head_covers_half_open_range_before_old() {
        assert_eq!(Shift::plan(3, 1), Shift::TowardHead { from: 1, before: 3 });
        assert_eq!(Shift::plan(1, 0), Shift::TowardHead { from: 0, before: 1 });
    }

    #[test]
    fn reorder_bounds_exclude_the_tail_slot() {
        assert!(reorder_in_bounds(0, 3));
        assert!(reorder_in_bounds(2, 3));
        assert!(!reorder_in_bounds(3, 3));
        assert!(!reorder_in_bounds(-1, 3));
        assert!(!reorder_in_bounds(0, 0));
    }

    #[test]
    fn insert_bounds_include_the_tail_slot() {
        assert!(insert_in_bounds(0, 0));
        assert!(insert_in_bounds(3, 3));
        assert!(!insert_in_bounds(4, 3));
        assert!(!insert_in_bounds(-1, 3));
    }

    #[test]
    fn priority_round_trips_and_rejects_unknown_values() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::parse(priority.as_str()), Some(priority));
        }
        assert_eq!(Priority::parse(" medium "), Some(Priority::Medium));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
