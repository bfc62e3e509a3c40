//! The instrument catalog.
//!
//! Declaration order of [`Instrument`] *is* the catalog: the legacy encoding's
//! integer index is the position of a variant in [`Instrument::ALL`], and both
//! directions of the name/index mapping are derived from it. Nothing else in the
//! crate keeps its own copy of either mapping.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[repr(u8)]
pub enum Instrument {
    #[serde(rename = "mcdonald1")]
    #[value(name = "mcdonald1")]
    McDonald1,
    #[serde(rename = "torres")]
    #[value(name = "torres")]
    Torres,
    #[serde(rename = "cfht")]
    #[value(name = "cfht")]
    Cfht,
    #[serde(rename = "mcdonald2")]
    #[value(name = "mcdonald2")]
    McDonald2,
    #[serde(rename = "mcdonald3")]
    #[value(name = "mcdonald3")]
    McDonald3,
    /// Keck/HIRES, labelled `j` by the survey pipeline.
    #[serde(rename = "j")]
    #[value(name = "j")]
    Hires,
    #[serde(rename = "apf")]
    #[value(name = "apf")]
    Apf,
    /// Compiled per-sub-instrument velocities (km/s in the source table).
    #[serde(rename = "griffin")]
    #[value(name = "griffin")]
    Griffin,
}

impl Instrument {
    /// Catalog order. Must match declaration order.
    pub const ALL: [Instrument; 8] = [
        Instrument::McDonald1,
        Instrument::Torres,
        Instrument::Cfht,
        Instrument::McDonald2,
        Instrument::McDonald3,
        Instrument::Hires,
        Instrument::Apf,
        Instrument::Griffin,
    ];

    /// Instruments whose velocities enter the summary table and the
    /// "precision" diagnostics.
    pub const PRECISION: [Instrument; 3] = [Instrument::McDonald3, Instrument::Hires, Instrument::Apf];

    /// Canonical name, as written in the generic encoding.
    pub fn name(self) -> &'static str {
        match self {
            Instrument::McDonald1 => "mcdonald1",
            Instrument::Torres => "torres",
            Instrument::Cfht => "cfht",
            Instrument::McDonald2 => "mcdonald2",
            Instrument::McDonald3 => "mcdonald3",
            Instrument::Hires => "j",
            Instrument::Apf => "apf",
            Instrument::Griffin => "griffin",
        }
    }

    /// Publication-ready label for the summary table.
    pub fn display_name(self) -> &'static str {
        match self {
            Instrument::McDonald1 => "McDonald I",
            Instrument::Torres => "Torres",
            Instrument::Cfht => "CFHT",
            Instrument::McDonald2 => "McDonald II",
            Instrument::McDonald3 => "McDonald III",
            Instrument::Hires => "HIRES",
            Instrument::Apf => "APF",
            Instrument::Griffin => "Griffin",
        }
    }

    /// Legacy integer index.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Instrument> {
        Self::ALL.get(index).copied()
    }

    /// Resolve a canonical name (surrounding whitespace ignored, case-sensitive).
    pub fn from_name(name: &str) -> Option<Instrument> {
        let name = name.trim();
        Self::ALL.into_iter().find(|inst| inst.name() == name)
    }

    /// Every catalog instrument except `griffin`, which is loaded for
    /// diagnostics but kept out of the active fit.
    pub fn default_allow_list() -> Vec<Instrument> {
        Self::ALL
            .into_iter()
            .filter(|inst| *inst != Instrument::Griffin)
            .collect()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_catalog_position() {
        for (pos, inst) in Instrument::ALL.iter().enumerate() {
            assert_eq!(inst.index(), pos);
            assert_eq!(Instrument::from_index(pos), Some(*inst));
        }
        assert_eq!(Instrument::from_index(Instrument::ALL.len()), None);
    }

    #[test]
    fn name_round_trips_through_catalog() {
        for inst in Instrument::ALL {
            assert_eq!(Instrument::from_name(inst.name()), Some(inst));
        }
        assert_eq!(Instrument::from_name(" apf "), Some(Instrument::Apf));
        assert_eq!(Instrument::from_name("APF"), None);
        assert_eq!(Instrument::from_name("keck"), None);
    }

    #[test]
    fn legacy_indices_match_survey_labels() {
        assert_eq!(Instrument::McDonald3.index(), 4);
        assert_eq!(Instrument::Hires.index(), 5);
        assert_eq!(Instrument::Apf.index(), 6);
    }

    #[test]
    fn value_enum_names_match_catalog_names() {
        for inst in Instrument::ALL {
            let value = inst.to_possible_value().unwrap();
            assert_eq!(value.get_name(), inst.name());
        }
    }

    #[test]
    fn default_allow_list_excludes_griffin() {
        let allow = Instrument::default_allow_list();
        assert_eq!(allow.len(), Instrument::ALL.len() - 1);
        assert!(!allow.contains(&Instrument::Griffin));
    }
}
