use super::selection::FilterAxis;

pub const PERIOD_VALUES: [&str; 6] = ["I", "II", "III", "IV", "V", "Summer"];

/// Ordered by how many catalog courses carry each prefix.
pub const PREFIX_VALUES: [&str; 37] = [
    "ELEC", "CHEM", "ELO", "LC", "AXM", "CS", "ARK", "MUO", "TU", "MS", "ARTS", "MEC", "MLI",
    "PHYS", "MNGT", "AAE", "CIV", "MAR", "ABL", "ECON", "NBE", "ARTX", "BIZ", "ISM", "ENG", "GEO",
    "WAT", "GIS", "REC", "SCI", "JOIN", "COE", "KEY", "FIN", "KIG", "KON", "MARK",
];

pub fn known_options(axis: FilterAxis) -> &'static [&'static str] {
    match axis {
        FilterAxis::Prefix => &PREFIX_VALUES,
        FilterAxis::Period => &PERIOD_VALUES,
    }
}

pub fn is_known_option(axis: FilterAxis, option: &str) -> bool {
    known_options(axis).contains(&option)
}
