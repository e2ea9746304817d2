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
use std::fmt;

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// The number of faces on a die.
pub const DIE_FACES: u8 = 6;

/// A single face of a six sided die. Always within 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DieFace(u8);

impl DieFace {
    /// Creates a die face, returning None if the value can't be rolled on a six sided die.
    pub fn new(value: u8) -> Option<DieFace> {
        (1..=DIE_FACES).contains(&value).then_some(DieFace(value))
    }

    /// Gets the value of the face.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DieFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source of die rolls. Selection code only ever sees faces, so tests can swap in a
/// loaded die without touching a random number generator.
pub trait DieSource {
    /// Rolls a single die.
    fn roll(&mut self) -> DieFace;
}

impl<D: DieSource + ?Sized> DieSource for &mut D {
    fn roll(&mut self) -> DieFace {
        (**self).roll()
    }
}

/// Fair dice backed by a rand generator.
pub struct Dice<R: Rng> {
    rng: R,
}

impl<R: Rng> Dice<R> {
    /// Creates dice from the given generator.
    pub fn new(rng: R) -> Dice<R> {
        Dice { rng }
    }
}

impl Dice<ThreadRng> {
    /// Dice backed by the thread local generator.
    pub fn thread() -> Dice<ThreadRng> {
        Dice::new(rand::thread_rng())
    }
}

impl Dice<StdRng> {
    /// Dice that always produce the same sequence of rolls for the same seed.
    pub fn seeded(seed: u64) -> Dice<StdRng> {
        Dice::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DieSource for Dice<R> {
    fn roll(&mut self) -> DieFace {
        DieFace(self.rng.gen_range(1..=DIE_FACES))
    }
}

/// Rolls `count` dice and returns their sum. Zero or negative counts roll nothing and return 0.
pub fn roll_dice<D: DieSource + ?Sized>(dice: &mut D, count: i32) -> u32 {
    if count <= 0 {
        return 0;
    }

    (0..count).map(|_| u32::from(dice.roll().value())).sum()
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::HashSet;

    use super::*;

    const TEST_ITERATIONS: usize = 200;

    /// A loaded die that always lands on the same face.
    pub struct LoadedDie {
        face: DieFace,
        pub rolls: usize,
    }

    impl LoadedDie {
        pub fn new(value: u8) -> LoadedDie {
            LoadedDie {
                face: DieFace::new(value).expect("invalid face"),
                rolls: 0,
            }
        }
    }

    impl DieSource for LoadedDie {
        fn roll(&mut self) -> DieFace {
            self.rolls += 1;
            self.face
        }
    }

    #[test]
    fn test_die_face_range() {
        assert!(DieFace::new(0).is_none());
        assert!(DieFace::new(7).is_none());
        for value in 1..=6 {
            assert_eq!(DieFace::new(value).map(DieFace::value), Some(value));
        }
    }

    #[test]
    fn test_roll_zero_and_below() {
        let mut die = LoadedDie::new(3);
        assert_eq!(0, roll_dice(&mut die, 0));
        assert_eq!(0, roll_dice(&mut die, -1));
        assert_eq!(0, roll_dice(&mut die, i32::MIN));
        assert_eq!(0, die.rolls, "no randomness should be consumed");

        let mut dice = Dice::thread();
        assert_ne!(0, roll_dice(&mut dice, 2));
    }

    #[test]
    fn test_roll_one_die() {
        let mut dice = Dice::thread();
        let mut seen = HashSet::new();
        for _ in 0..TEST_ITERATIONS {
            let roll = roll_dice(&mut dice, 1);
            assert!((1..=6).contains(&roll), "roll {} out of range", roll);
            seen.insert(roll);
        }
        // The odds of missing a face over 200 fair rolls are around 1e-15.
        assert_eq!(6, seen.len());
    }

    #[test]
    fn test_roll_two_dice() {
        let mut dice = Dice::thread();
        for _ in 0..TEST_ITERATIONS {
            let roll = roll_dice(&mut dice, 2);
            assert!((2..=12).contains(&roll), "roll {} out of range", roll);
        }
    }

    #[test]
    fn test_one_die_is_roughly_uniform() {
        let mut dice = Dice::seeded(7);
        let trials = 6000;
        let mut counts = [0u32; 6];
        for _ in 0..trials {
            counts[roll_dice(&mut dice, 1) as usize - 1] += 1;
        }

        let expected = trials as f64 / 6.0;
        let chi_square: f64 = counts
            .iter()
            .map(|&count| (count as f64 - expected).powi(2) / expected)
            .sum();
        // Critical value for 5 degrees of freedom at p = 0.001.
        assert!(chi_square < 20.52, "chi square {} too large", chi_square);
    }

    #[test]
    fn test_loaded_die_sums() {
        let mut die = LoadedDie::new(6);
        assert_eq!(12, roll_dice(&mut die, 2));
        assert_eq!(6, roll_dice(&mut die, 1));
        assert_eq!(3, die.rolls);
    }

    #[test]
    fn test_seeded_dice_repeat() {
        let first: Vec<u32> = {
            let mut dice = Dice::seeded(42);
            (0..32).map(|_| roll_dice(&mut dice, 2)).collect()
        };
        let second: Vec<u32> = {
            let mut dice = Dice::seeded(42);
            (0..32).map(|_| roll_dice(&mut dice, 2)).collect()
        };
        assert_eq!(first, second);
    }
}
