// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The skip-pointer height function (spec §3 "The height function").
//!
//! `height(s)` decides how many back pointers record `s` stores on disk;
//! `update_height(s)` decides how many levels of the writer's in-memory
//! `back`/`back_tag` arrays get refreshed after writing record `s`. They
//! differ only in the power-of-two decrement, and that asymmetry is load
//! bearing (see `DESIGN.md`): without it, record 1 would carry a back
//! pointer to nothing.

/// Number of back pointers record `s` (1-origin) stores.
///
/// `height(s) = trailing_zeros(s) + 1`, minus one if `s` is itself a power
/// of two (including `s == 1`). The first record therefore has height 0.
#[must_use]
pub fn height(s: u64) -> u32 {
    debug_assert!(s >= 1, "sequence numbers are 1-origin");

    let k = s.trailing_zeros();
    let h = k + 1;

    if s >> k == 1 {
        h - 1
    } else {
        h
    }
}

/// Number of levels of the writer's back-pointer state to refresh after
/// writing record `s`. Same bit-trick as [`height`], without the
/// power-of-two decrement.
#[must_use]
pub fn update_height(s: u64) -> u32 {
    debug_assert!(s >= 1, "sequence numbers are 1-origin");
    s.trailing_zeros() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_has_no_back_pointers() {
        assert_eq!(height(1), 0);
    }

    #[test]
    fn matches_spec_worked_example() {
        // s: 1 2 3 4 5 6 7 8 9 10
        let expected_height = [0, 1, 1, 2, 1, 2, 1, 3, 1, 2];
        for (i, expected) in expected_height.iter().enumerate() {
            let s = (i + 1) as u64;
            assert_eq!(height(s), *expected, "height({s})");
        }
    }

    #[test]
    fn update_height_never_decrements_for_powers_of_two() {
        // update_height(1) must be 1 so record 1's back[0]/back_tag[0] get
        // populated even though record 1 itself stores zero back pointers.
        assert_eq!(update_height(1), 1);
        assert_eq!(update_height(2), 2);
        assert_eq!(update_height(4), 3);
        assert_eq!(update_height(8), 4);
    }

    #[test]
    fn update_height_is_always_one_more_than_height_at_powers_of_two() {
        for k in 0..20 {
            let s = 1u64 << k;
            assert_eq!(update_height(s), height(s) + 1);
        }
    }

    #[test]
    fn height_grows_with_trailing_zero_count() {
        for k in 1..20u32 {
            let s = 3u64 << k; // not a power of two, has exactly k trailing zeros
            assert_eq!(height(s), k + 1);
            assert_eq!(update_height(s), k + 1);
        }
    }
}
