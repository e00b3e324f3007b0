// 🗺️ Region crosswalk - 2-letter code ↔ full name
//
// 50 states plus the five territories that appear in the disposition data.
// The population table and the hexgrid are both keyed by full name.

/// (code, name) pairs, states first then territories
pub const REGIONS: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    // Territories
    ("DC", "District of Columbia"),
    ("PR", "Puerto Rico"),
    ("GU", "Guam"),
    ("VI", "U.S. Virgin Islands"),
    ("MP", "Northern Mariana Islands"),
];

pub const STATE_COUNT: usize = 50;
pub const TERRITORY_COUNT: usize = 5;

/// Full name for a region code (case-insensitive)
pub fn name_for(code: &str) -> Option<&'static str> {
    let code = code.trim();
    REGIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Region code for a full name (case-insensitive)
#[cfg(test)]
pub(crate) fn code_for(name: &str) -> Option<&'static str> {
    let name = name.trim();
    REGIONS
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(code, _)| *code)
}

pub fn is_known_code(code: &str) -> bool {
    name_for(code).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_covers_states_and_territories() {
        assert_eq!(REGIONS.len(), STATE_COUNT + TERRITORY_COUNT);

        let codes: HashSet<&str> = REGIONS.iter().map(|(c, _)| *c).collect();
        let names: HashSet<&str> = REGIONS.iter().map(|(_, n)| *n).collect();
        assert_eq!(codes.len(), REGIONS.len(), "duplicate code");
        assert_eq!(names.len(), REGIONS.len(), "duplicate name");

        for code in codes {
            assert_eq!(code.len(), 2);
            assert_eq!(code, code.to_uppercase());
        }
    }

    #[test]
    fn test_lookup_both_ways() {
        assert_eq!(name_for("CA"), Some("California"));
        assert_eq!(name_for("ca"), Some("California"));
        assert_eq!(name_for("VI"), Some("U.S. Virgin Islands"));
        assert_eq!(code_for("texas"), Some("TX"));
        assert_eq!(code_for("Northern Mariana Islands"), Some("MP"));

        assert_eq!(name_for("ZZ"), None);
        assert_eq!(code_for("Atlantis"), None);
        assert!(!is_known_code("AS"));
    }
}
