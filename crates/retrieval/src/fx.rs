//! Fixed (time-invariant) fields such as orography and land fraction.

/// Fixed-field variable for surface altitude.
pub const OROGRAPHY: &str = "orog";
/// Fixed-field variable for land area fraction.
pub const LAND_FRACTION: &str = "sftlf";

/// Models whose fixed fields are missing from the archive, and the model
/// whose fields are used instead.
pub const FX_ALIASES: &[(&str, &str)] = &[("HadGEM2-AO", "HadGEM2-CC")];

/// Experiments fixed fields are read from, in order of preference.
pub const FX_EXPERIMENTS: &[&str] = &["historical", "piControl", "amip", "rcp45", "decadal1980"];

/// The model whose fixed fields stand in for `model`.
pub fn fx_model(model: &str) -> &str {
    FX_ALIASES
        .iter()
        .find(|(from, _)| *from == model)
        .map(|(_, to)| *to)
        .unwrap_or(model)
}

/// First preferred experiment among `available`.
pub fn preferred_experiment<S: AsRef<str>>(available: &[S]) -> Option<&'static str> {
    FX_EXPERIMENTS
        .iter()
        .copied()
        .find(|exp| available.iter().any(|a| a.as_ref() == *exp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias() {
        assert_eq!(fx_model("HadGEM2-AO"), "HadGEM2-CC");
        assert_eq!(fx_model("CMCC-CM"), "CMCC-CM");
    }

    #[test]
    fn test_preferred_experiment_order() {
        assert_eq!(preferred_experiment(&["rcp45", "piControl"]), Some("piControl"));
        assert_eq!(preferred_experiment(&["amip", "historical"]), Some("historical"));
        assert_eq!(preferred_experiment(&["rcp85"]), None);
        assert_eq!(preferred_experiment::<String>(&[]), None);
    }
}
