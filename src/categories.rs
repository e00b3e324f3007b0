// 🏷️ Categorical domains for transfer records
//
// Each field has a small expected vocabulary. Anything outside it is kept
// verbatim in an `Other` variant: unknown values are unexpected, not invalid.

use serde::{Deserialize, Serialize};

/// Field names used in CleanReport counters
pub const FIELD_REGION: &str = "state";
pub const FIELD_UNIT_OF_ISSUE: &str = "ui";
pub const FIELD_DEMIL_CODE: &str = "demil_code";
pub const FIELD_DEMIL_IC: &str = "demil_ic";
pub const FIELD_STATION_TYPE: &str = "station_type";

// ============================================================================
// UNIT OF ISSUE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitOfIssue {
    Each,
    Kit,
    Pair,
    Set,
    Box,
    Package,
    Assembly,
    Dozen,
    Roll,
    Foot,
    Gallon,
    Lot,
    Other(String),
}

impl UnitOfIssue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_uppercase().as_str() {
            "EACH" | "EA" => UnitOfIssue::Each,
            "KIT" | "KT" => UnitOfIssue::Kit,
            "PAIR" | "PR" => UnitOfIssue::Pair,
            "SET" | "SE" => UnitOfIssue::Set,
            "BOX" | "BX" => UnitOfIssue::Box,
            "PACKAGE" | "PG" => UnitOfIssue::Package,
            "ASSEMBLY" | "AY" => UnitOfIssue::Assembly,
            "DOZEN" | "DZ" => UnitOfIssue::Dozen,
            "ROLL" | "RO" => UnitOfIssue::Roll,
            "FOOT" | "FT" => UnitOfIssue::Foot,
            "GALLON" | "GL" => UnitOfIssue::Gallon,
            "LOT" | "LO" => UnitOfIssue::Lot,
            _ => UnitOfIssue::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UnitOfIssue::Each => "Each",
            UnitOfIssue::Kit => "Kit",
            UnitOfIssue::Pair => "Pair",
            UnitOfIssue::Set => "Set",
            UnitOfIssue::Box => "Box",
            UnitOfIssue::Package => "Package",
            UnitOfIssue::Assembly => "Assembly",
            UnitOfIssue::Dozen => "Dozen",
            UnitOfIssue::Roll => "Roll",
            UnitOfIssue::Foot => "Foot",
            UnitOfIssue::Gallon => "Gallon",
            UnitOfIssue::Lot => "Lot",
            UnitOfIssue::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, UnitOfIssue::Other(_))
    }
}

// ============================================================================
// DEMIL CODE
// ============================================================================

/// Demilitarization code (A-G, P, Q). Carried through, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemilCode {
    Code(char),
    Other(String),
}

const DEMIL_CODES: &[char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'P', 'Q'];

impl DemilCode {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase();
        let mut chars = normalized.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if DEMIL_CODES.contains(&c) => DemilCode::Code(c),
            _ => DemilCode::Other(raw.trim().to_string()),
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            DemilCode::Code(c) => c.to_string(),
            DemilCode::Other(s) => s.clone(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, DemilCode::Code(_))
    }
}

// ============================================================================
// DEMIL INTEGRITY CODE
// ============================================================================

/// Demilitarization integrity code, a single digit 0-9
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemilIc {
    Code(u8),
    Other(String),
}

impl DemilIc {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        // Numeric cells arrive as "1" or "1.0"
        let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        match digits.parse::<u8>() {
            Ok(code) if code <= 9 => DemilIc::Code(code),
            _ => DemilIc::Other(trimmed.to_string()),
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            DemilIc::Code(c) => c.to_string(),
            DemilIc::Other(s) => s.clone(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, DemilIc::Code(_))
    }
}

// ============================================================================
// STATION TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationType {
    State,
    Tribal,
    Federal,
    Other(String),
}

impl StationType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_uppercase().as_str() {
            "STATE" => StationType::State,
            "TRIBAL" => StationType::Tribal,
            "FEDERAL" => StationType::Federal,
            _ => StationType::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StationType::State => "State",
            StationType::Tribal => "Tribal",
            StationType::Federal => "Federal",
            StationType::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, StationType::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_of_issue_aliases() {
        assert_eq!(UnitOfIssue::parse("Each"), UnitOfIssue::Each);
        assert_eq!(UnitOfIssue::parse(" ea "), UnitOfIssue::Each);
        assert_eq!(UnitOfIssue::parse("PR"), UnitOfIssue::Pair);
        assert_eq!(UnitOfIssue::Kit.as_str(), "Kit");
    }

    #[test]
    fn test_unknown_values_are_preserved() {
        let ui = UnitOfIssue::parse("Hogshead");
        assert_eq!(ui, UnitOfIssue::Other("Hogshead".to_string()));
        assert_eq!(ui.as_str(), "Hogshead");
        assert!(!ui.is_known());

        let station = StationType::parse("Municipal");
        assert_eq!(station.as_str(), "Municipal");
        assert!(!station.is_known());
    }

    #[test]
    fn test_demil_code() {
        assert_eq!(DemilCode::parse("d"), DemilCode::Code('D'));
        assert_eq!(DemilCode::parse("Q").as_string(), "Q");
        assert!(!DemilCode::parse("Z").is_known());
        assert!(!DemilCode::parse("AB").is_known());
    }

    #[test]
    fn test_demil_ic() {
        assert_eq!(DemilIc::parse("1"), DemilIc::Code(1));
        assert_eq!(DemilIc::parse("7.0"), DemilIc::Code(7));
        assert_eq!(DemilIc::parse("12"), DemilIc::Other("12".to_string()));
        assert_eq!(DemilIc::parse("n/a").as_string(), "n/a");
    }

    #[test]
    fn test_station_type() {
        assert_eq!(StationType::parse("state"), StationType::State);
        assert_eq!(StationType::parse("Tribal"), StationType::Tribal);
        assert!(StationType::State.is_known());
    }
}
