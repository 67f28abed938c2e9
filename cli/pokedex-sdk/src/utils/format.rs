//! Display formatting for catalog values.

use itertools::Itertools;

/// `1` -> `#001`, ids above 999 keep all their digits.
pub fn format_item_id(id: u32) -> String {
    format!("#{id:03}")
}

/// Capitalize every dash separated word: `mr-mime` -> `Mr-Mime`.
pub fn format_item_name(name: &str) -> String {
    name.split('-').map(capitalize).join("-")
}

/// Heights are reported in decimetres.
pub fn format_height(decimetres: u32) -> String {
    format!("{:.1} m", f64::from(decimetres) / 10.0)
}

/// Weights are reported in hectograms.
pub fn format_weight(hectograms: u32) -> String {
    format!("{:.1} kg", f64::from(hectograms) / 10.0)
}

/// Short label for a stat, unknown stats are returned as is.
pub fn format_stat_name(stat: &str) -> String {
    match stat {
        "hp" => "HP",
        "attack" => "Attack",
        "defense" => "Defense",
        "special-attack" => "Sp. Atk",
        "special-defense" => "Sp. Def",
        "speed" => "Speed",
        other => other,
    }
    .to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn ids_are_zero_padded() {
        assert_eq!(format_item_id(1), "#001");
        assert_eq!(format_item_id(25), "#025");
        assert_eq!(format_item_id(1010), "#1010");
    }

    #[test]
    fn names_are_capitalized_per_word() {
        assert_eq!(format_item_name("pikachu"), "Pikachu");
        assert_eq!(format_item_name("mr-mime"), "Mr-Mime");
        assert_eq!(format_item_name("ho-oh"), "Ho-Oh");
        assert_eq!(format_item_name(""), "");
    }

    #[test]
    fn measures_use_one_decimal() {
        assert_eq!(format_height(7), "0.7 m");
        assert_eq!(format_height(20), "2.0 m");
        assert_eq!(format_weight(69), "6.9 kg");
        assert_eq!(format_weight(9999), "999.9 kg");
    }

    #[test]
    fn stat_names() {
        assert_eq!(format_stat_name("hp"), "HP");
        assert_eq!(format_stat_name("special-attack"), "Sp. Atk");
        assert_eq!(format_stat_name("special-defense"), "Sp. Def");
        assert_eq!(format_stat_name("accuracy"), "accuracy");
    }
}
