//! Catalogue filtering by column values.

use std::collections::HashSet;
use std::str::FromStr;

use tracing::debug;

use cmip_common::{CmipError, CmipResult};

use crate::catalog::{Catalogue, Column};

/// Accepted values per column.
///
/// Columns keep the order they were added in and values keep the order they
/// were given in, without duplicates. Rows must match every column (AND) and
/// any value within a column (OR).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    terms: Vec<(Column, Vec<String>)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `value` in `column`, in addition to any values already given.
    pub fn with(self, column: Column, value: &str) -> Self {
        self.with_any(column, [value])
    }

    /// Accept any of `values` in `column`, in addition to any values already given.
    pub fn with_any<I, S>(mut self, column: Column, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pos = match self.terms.iter().position(|(c, _)| *c == column) {
            Some(pos) => pos,
            None => {
                self.terms.push((column, Vec::new()));
                self.terms.len() - 1
            }
        };
        let accepted = &mut self.terms[pos].1;
        for value in values {
            let value = value.as_ref().trim();
            if !value.is_empty() && !accepted.iter().any(|v| v == value) {
                accepted.push(value.to_string());
            }
        }
        self
    }

    /// Add a `Column=value[,value...]` argument, as given on the command line.
    pub fn parse_arg(self, arg: &str) -> CmipResult<Self> {
        let (column, values) = arg.split_once('=').ok_or_else(|| {
            CmipError::InvalidQuery(format!("expected Column=value[,value...], got '{}'", arg))
        })?;
        let column: Column = column.parse()?;
        let values: Vec<&str> = values.split(',').map(str::trim).filter(|v| !v.is_empty()).collect();
        if values.is_empty() {
            return Err(CmipError::InvalidQuery(format!("no values given for {}", column)));
        }
        Ok(self.with_any(column, values))
    }

    /// Accepted values for `column`, if it is constrained.
    pub fn values(&self, column: Column) -> Option<&[String]> {
        self.terms
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_slice())
    }

    pub fn terms(&self) -> impl Iterator<Item = (Column, &[String])> {
        self.terms.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl FromStr for FilterSpec {
    type Err = CmipError;

    /// Parse whitespace-separated `Column=value[,value...]` arguments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .try_fold(FilterSpec::new(), |spec, arg| spec.parse_arg(arg))
    }
}

/// Rows of `table` satisfying `spec`.
///
/// Each requested value must exist in its column among the rows left by the
/// columns filtered before it, or the whole query fails with
/// [`CmipError::UnknownValue`].
///
/// With `complete_var_set`, `Var` must list two or more variables and every
/// other column exactly one value. Run directories (rows sharing a path-head)
/// that do not offer every requested variable are then dropped whole.
pub fn filter(table: &Catalogue, spec: &FilterSpec, complete_var_set: bool) -> CmipResult<Catalogue> {
    if complete_var_set {
        check_complete_var_set(spec)?;
    }

    let mut result = table.clone();
    for (column, values) in spec.terms() {
        let available = result.distinct(column);
        if let Some(missing) = values.iter().find(|v| !available.contains(v)) {
            return Err(CmipError::UnknownValue {
                column: column.to_string(),
                value: missing.clone(),
                available,
            });
        }
        result.retain(|row| values.iter().any(|v| v == row.get(column)));
    }

    if complete_var_set {
        if let Some(vars) = spec.values(Column::Var) {
            drop_incomplete_var_sets(&mut result, vars);
        }
    }

    debug!(input = table.len(), output = result.len(), "Filtered catalogue");
    Ok(result)
}

fn check_complete_var_set(spec: &FilterSpec) -> CmipResult<()> {
    match spec.values(Column::Var) {
        Some(vars) if vars.len() >= 2 => {}
        _ => {
            return Err(CmipError::InvalidQuery(
                "two or more variables (Var=) are needed for complete_var_set".to_string(),
            ))
        }
    }
    for (column, values) in spec.terms().filter(|(c, _)| *c != Column::Var) {
        if values.len() > 1 {
            return Err(CmipError::InvalidQuery(format!(
                "complete_var_set allows one value for columns other than Var, got {}={}",
                column,
                values.join(",")
            )));
        }
    }
    Ok(())
}

/// Drop every row whose path-head does not offer all of `vars`.
///
/// Each variable is compared with the first in turn, and rows are removed
/// before the next comparison.
fn drop_incomplete_var_sets(table: &mut Catalogue, vars: &[String]) {
    let Some(first) = vars.first() else {
        return;
    };
    for var in vars {
        let heads = |table: &Catalogue, var: &str| -> HashSet<String> {
            table
                .iter()
                .filter(|r| r.var == var)
                .map(|r| r.path_head().to_string())
                .collect()
        };
        let with_first = heads(table, first);
        let with_var = heads(table, var);
        let incomplete: HashSet<&String> = with_first.symmetric_difference(&with_var).collect();
        if incomplete.is_empty() {
            continue;
        }
        debug!(var = %var, groups = incomplete.len(), "Dropping incomplete variable sets");
        table.retain(|row| !incomplete.contains(&row.path_head().to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_any_dedups_in_order() {
        let spec = FilterSpec::new()
            .with_any(Column::Var, ["tas", "pr", "tas"])
            .with(Column::Var, "pr")
            .with(Column::Model, "CMCC-CM");
        assert_eq!(spec.values(Column::Var).unwrap(), &["tas", "pr"]);
        let columns: Vec<Column> = spec.terms().map(|(c, _)| c).collect();
        assert_eq!(columns, vec![Column::Var, Column::Model]);
    }

    #[test]
    fn test_parse_arg() {
        let spec = FilterSpec::new()
            .parse_arg("Model=CMCC-CM")
            .unwrap()
            .parse_arg("Var=tas, pr")
            .unwrap();
        assert_eq!(spec.values(Column::Model).unwrap(), &["CMCC-CM"]);
        assert_eq!(spec.values(Column::Var).unwrap(), &["tas", "pr"]);
    }

    #[test]
    fn test_parse_arg_errors() {
        assert!(FilterSpec::new().parse_arg("Model").is_err());
        assert!(FilterSpec::new().parse_arg("Model=").is_err());
        assert!(FilterSpec::new().parse_arg("Ensemble=r1i1p1").is_err());
    }

    #[test]
    fn test_from_str() {
        let spec: FilterSpec = "Experiment=historical Frequency=mon".parse().unwrap();
        assert_eq!(spec.values(Column::Experiment).unwrap(), &["historical"]);
        assert_eq!(spec.values(Column::Frequency).unwrap(), &["mon"]);
    }

    #[test]
    fn test_complete_var_set_validation() {
        let one_var = FilterSpec::new().with(Column::Var, "tas");
        assert!(check_complete_var_set(&one_var).is_err());

        let two_models = FilterSpec::new()
            .with_any(Column::Var, ["tas", "pr"])
            .with_any(Column::Model, ["CMCC-CM", "EC-EARTH"]);
        assert!(check_complete_var_set(&two_models).is_err());

        let ok = FilterSpec::new()
            .with_any(Column::Var, ["tas", "pr"])
            .with(Column::Model, "CMCC-CM");
        assert!(check_complete_var_set(&ok).is_ok());
    }
}
