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
use std::{fmt, str::FromStr};

use tracing::debug;

use crate::dice::{roll_dice, DieSource};
use crate::error::Error;
use crate::tables::{self, MEASURES_PER_SECTION, MINUET_MEASURES, TRIO_MEASURES};

/// The number of measures in a complete waltz.
pub const COMPOSITION_LENGTH: usize = MEASURES_PER_SECTION * 2;

/// The two sections of the waltz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Minuet,
    Trio,
}

impl Section {
    /// The tag used to prefix measure identifiers in this section.
    pub fn tag(self) -> char {
        match self {
            Section::Minuet => 'M',
            Section::Trio => 'T',
        }
    }

    /// The number of pre-composed measures available to this section.
    pub fn measure_count(self) -> u16 {
        match self {
            Section::Minuet => MINUET_MEASURES,
            Section::Trio => TRIO_MEASURES,
        }
    }
}

/// Identifies one pre-composed measure, e.g. M96 or T72.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Measure {
    section: Section,
    number: u16,
}

impl Measure {
    /// Creates a measure, returning None if the number isn't one of the section's measures.
    pub fn new(section: Section, number: u16) -> Option<Measure> {
        (1..=section.measure_count())
            .contains(&number)
            .then_some(Measure { section, number })
    }

    /// Gets the section this measure belongs to.
    pub fn section(&self) -> Section {
        self.section
    }

    /// Gets the measure number within its section.
    pub fn number(&self) -> u16 {
        self.number
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.section.tag(), self.number)
    }
}

impl FromStr for Measure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMeasure(s.to_string());

        let mut chars = s.chars();
        let section = match chars.next() {
            Some('M') => Section::Minuet,
            Some('T') => Section::Trio,
            _ => return Err(invalid()),
        };
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = digits.parse::<u16>().map_err(|_| invalid())?;

        Measure::new(section, number).ok_or_else(invalid)
    }
}

/// A complete waltz: sixteen minuet measures followed by sixteen trio measures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    measures: Vec<Measure>,
}

impl Composition {
    /// Gets all of the measures in playing order.
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Gets the minuet measures.
    pub fn minuet(&self) -> &[Measure] {
        &self.measures[..MEASURES_PER_SECTION]
    }

    /// Gets the trio measures.
    pub fn trio(&self) -> &[Measure] {
        &self.measures[MEASURES_PER_SECTION..]
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measure> {
        self.measures.iter()
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.measures
                .iter()
                .map(|measure| measure.to_string())
                .collect::<Vec<String>>()
                .join(" ")
        )
    }
}

impl<'a> IntoIterator for &'a Composition {
    type Item = &'a Measure;
    type IntoIter = std::slice::Iter<'a, Measure>;

    fn into_iter(self) -> Self::IntoIter {
        self.measures.iter()
    }
}

/// Composes a new waltz. Each minuet measure is chosen by the sum of two dice and each trio
/// measure by a single die.
pub fn select_measures<D: DieSource + ?Sized>(dice: &mut D) -> Composition {
    let mut measures = Vec::with_capacity(COMPOSITION_LENGTH);

    for position in 1..=MEASURES_PER_SECTION {
        let sum = roll_dice(dice, 2);
        let number = tables::minuet_measure(sum, position)
            .expect("two dice always sum to a row of the minuet table");
        measures.push(Measure {
            section: Section::Minuet,
            number,
        });
    }

    for position in 1..=MEASURES_PER_SECTION {
        let face = roll_dice(dice, 1);
        let number = tables::trio_measure(face, position)
            .expect("one die always lands on a row of the trio table");
        measures.push(Measure {
            section: Section::Trio,
            number,
        });
    }

    let composition = Composition { measures };
    debug!(composition = %composition, "Selected measures.");
    composition
}
