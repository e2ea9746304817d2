// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The measure tables from the Musikalisches Würfelspiel. Rows are indexed by the dice
//! outcome and columns by the measure position within the section.

/// The number of measures in each section of the waltz.
pub const MEASURES_PER_SECTION: usize = 16;

/// The number of pre-composed minuet measures.
pub const MINUET_MEASURES: u16 = 176;

/// The number of pre-composed trio measures.
pub const TRIO_MEASURES: u16 = 96;

/// The smallest sum two dice can roll. The first minuet row belongs to this sum.
pub const MIN_MINUET_SUM: u32 = 2;

/// Minuet measures, one row per two-dice sum from 2 through 12.
pub const MINUET: [[u16; MEASURES_PER_SECTION]; 11] = [
    [96, 22, 141, 41, 105, 122, 11, 30, 70, 121, 26, 9, 112, 49, 109, 14],
    [32, 6, 128, 63, 146, 46, 134, 81, 117, 39, 126, 56, 174, 18, 116, 83],
    [69, 95, 158, 13, 153, 55, 110, 24, 66, 139, 15, 132, 73, 58, 145, 79],
    [40, 17, 113, 85, 161, 2, 159, 100, 90, 176, 7, 34, 67, 160, 52, 170],
    [148, 74, 163, 45, 80, 97, 36, 107, 25, 143, 64, 125, 76, 136, 1, 93],
    [104, 157, 27, 167, 154, 68, 118, 91, 138, 71, 150, 29, 101, 162, 23, 151],
    [152, 60, 171, 53, 99, 133, 21, 127, 16, 155, 57, 175, 43, 168, 89, 172],
    [119, 84, 114, 50, 140, 86, 169, 94, 120, 88, 48, 166, 51, 115, 72, 111],
    [98, 142, 42, 156, 75, 129, 62, 123, 65, 77, 19, 82, 137, 38, 149, 8],
    [3, 87, 165, 61, 135, 47, 147, 33, 102, 4, 31, 164, 144, 59, 173, 78],
    [54, 130, 10, 103, 28, 37, 106, 5, 35, 20, 108, 92, 12, 124, 44, 131],
];

/// Trio measures, one row per die face from 1 through 6.
pub const TRIO: [[u16; MEASURES_PER_SECTION]; 6] = [
    [72, 6, 59, 25, 81, 41, 89, 13, 36, 5, 46, 79, 30, 95, 19, 66],
    [56, 82, 42, 74, 14, 7, 26, 71, 76, 20, 64, 84, 8, 35, 47, 88],
    [75, 39, 54, 1, 65, 43, 15, 80, 9, 34, 93, 48, 69, 58, 90, 21],
    [40, 73, 16, 68, 29, 55, 2, 61, 22, 67, 49, 77, 57, 87, 33, 10],
    [83, 3, 28, 53, 37, 17, 44, 70, 63, 85, 32, 96, 12, 23, 50, 91],
    [18, 45, 62, 38, 4, 27, 52, 94, 11, 92, 24, 86, 51, 60, 78, 31],
];

/// Looks up the minuet measure for a two-dice sum and a 1-based measure position.
pub fn minuet_measure(sum: u32, position: usize) -> Option<u16> {
    let row = usize::try_from(sum.checked_sub(MIN_MINUET_SUM)?).ok()?;
    MINUET.get(row)?.get(position.checked_sub(1)?).copied()
}

/// Looks up the trio measure for a die face and a 1-based measure position.
pub fn trio_measure(face: u32, position: usize) -> Option<u16> {
    let row = usize::try_from(face.checked_sub(1)?).ok()?;
    TRIO.get(row)?.get(position.checked_sub(1)?).copied()
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_permutation(table: &[[u16; MEASURES_PER_SECTION]], count: u16) {
        let mut measures: Vec<u16> = table.iter().flatten().copied().collect();
        measures.sort_unstable();
        let expected: Vec<u16> = (1..=count).collect();
        assert_eq!(expected, measures);
    }

    #[test]
    fn test_minuet_is_a_permutation() {
        assert_permutation(&MINUET, MINUET_MEASURES);
    }

    #[test]
    fn test_trio_is_a_permutation() {
        assert_permutation(&TRIO, TRIO_MEASURES);
    }

    #[test]
    fn test_minuet_lookup() {
        assert_eq!(Some(96), minuet_measure(2, 1));
        assert_eq!(Some(14), minuet_measure(2, 16));
        assert_eq!(Some(54), minuet_measure(12, 1));
        assert_eq!(Some(131), minuet_measure(12, 16));
        assert_eq!(Some(148), minuet_measure(7, 1));
    }

    #[test]
    fn test_minuet_lookup_out_of_range() {
        assert_eq!(None, minuet_measure(0, 1));
        assert_eq!(None, minuet_measure(1, 1));
        assert_eq!(None, minuet_measure(13, 1));
        assert_eq!(None, minuet_measure(7, 0));
        assert_eq!(None, minuet_measure(7, 17));
    }

    #[test]
    fn test_trio_lookup() {
        assert_eq!(Some(72), trio_measure(1, 1));
        assert_eq!(Some(66), trio_measure(1, 16));
        assert_eq!(Some(18), trio_measure(6, 1));
        assert_eq!(Some(31), trio_measure(6, 16));
        assert_eq!(None, trio_measure(0, 1));
        assert_eq!(None, trio_measure(7, 1));
        assert_eq!(None, trio_measure(3, 0));
        assert_eq!(None, trio_measure(3, 17));
    }
}
