//! Catalogue rows and the persisted CSV table.

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use cmip_common::{CmipError, CmipResult};

/// A catalogue column, named as in the CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Centre,
    Model,
    Experiment,
    Frequency,
    SubModel,
    #[serde(rename = "CMOR")]
    Cmor,
    #[serde(rename = "RunID")]
    RunId,
    Var,
    Version,
    Path,
}

impl Column {
    /// All columns in CSV order.
    pub const ALL: [Column; 10] = [
        Column::Centre,
        Column::Model,
        Column::Experiment,
        Column::Frequency,
        Column::SubModel,
        Column::Cmor,
        Column::RunId,
        Column::Var,
        Column::Version,
        Column::Path,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Centre => "Centre",
            Column::Model => "Model",
            Column::Experiment => "Experiment",
            Column::Frequency => "Frequency",
            Column::SubModel => "SubModel",
            Column::Cmor => "CMOR",
            Column::RunId => "RunID",
            Column::Var => "Var",
            Column::Version => "Version",
            Column::Path => "Path",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = CmipError;

    /// Parse a header name. Matching ignores case, so `runid` and `RunID` agree.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CmipError::InvalidQuery(format!(
                    "unknown column '{}', expected one of {}",
                    s,
                    Column::ALL.map(|c| c.as_str()).join(", ")
                ))
            })
    }
}

/// One (run, variable) directory of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueRow {
    #[serde(rename = "Centre")]
    pub centre: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Experiment")]
    pub experiment: String,
    #[serde(rename = "Frequency")]
    pub frequency: String,
    #[serde(rename = "SubModel")]
    pub submodel: String,
    #[serde(rename = "CMOR")]
    pub cmor: String,
    #[serde(rename = "RunID")]
    pub run_id: String,
    #[serde(rename = "Var")]
    pub var: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Path")]
    pub path: String,
}

impl CatalogueRow {
    /// Value of a column.
    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::Centre => &self.centre,
            Column::Model => &self.model,
            Column::Experiment => &self.experiment,
            Column::Frequency => &self.frequency,
            Column::SubModel => &self.submodel,
            Column::Cmor => &self.cmor,
            Column::RunId => &self.run_id,
            Column::Var => &self.var,
            Column::Version => &self.version,
            Column::Path => &self.path,
        }
    }

    /// `Path` without its trailing variable directory.
    ///
    /// Rows sharing a path-head belong to the same run and version.
    pub fn path_head(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(i) => &trimmed[..i],
            None => "",
        }
    }
}

/// An ordered table of catalogue rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalogue {
    rows: Vec<CatalogueRow>,
}

impl Catalogue {
    pub fn new(rows: Vec<CatalogueRow>) -> Self {
        Self { rows }
    }

    /// Read a table written by [`Catalogue::write_csv`].
    pub fn read_csv(path: &Path) -> CmipResult<Self> {
        let file = File::open(path).map_err(|e| {
            CmipError::Csv(format!("Failed to open catalogue {}: {}", path.display(), e))
        })?;
        let catalogue = Self::from_reader(file)?;
        debug!(path = %path.display(), rows = catalogue.len(), "Read catalogue");
        Ok(catalogue)
    }

    pub fn from_reader<R: Read>(reader: R) -> CmipResult<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<CatalogueRow>, _>>()
            .map_err(|e| CmipError::Csv(format!("Invalid catalogue record: {}", e)))?;
        Ok(Self { rows })
    }

    /// Replace the file at `path` with this table.
    pub fn write_csv(&self, path: &Path) -> CmipResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.to_writer(file)?;
        debug!(path = %path.display(), rows = self.len(), "Wrote catalogue");
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> CmipResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        let csv_err = |e: csv::Error| CmipError::Csv(format!("Failed to write catalogue: {}", e));

        // An empty table still gets its header.
        if self.rows.is_empty() {
            writer
                .write_record(Column::ALL.map(|c| c.as_str()))
                .map_err(csv_err)?;
        }
        for row in &self.rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[CatalogueRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogueRow> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<CatalogueRow> {
        self.rows
    }

    /// Sorted distinct values of a column.
    pub fn distinct(&self, column: Column) -> Vec<String> {
        let mut values: Vec<String> = self.rows.iter().map(|r| r.get(column).to_string()).collect();
        values.sort();
        values.dedup();
        values
    }

    /// Table holding only the row at `index`, if any.
    pub fn row_table(&self, index: usize) -> Catalogue {
        Catalogue::new(self.rows.get(index).cloned().into_iter().collect())
    }

    pub(crate) fn retain<F: FnMut(&CatalogueRow) -> bool>(&mut self, keep: F) {
        self.rows.retain(keep);
    }
}

impl<'a> IntoIterator for &'a Catalogue {
    type Item = &'a CatalogueRow;
    type IntoIter = std::slice::Iter<'a, CatalogueRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<CatalogueRow> for Catalogue {
    fn from_iter<I: IntoIterator<Item = CatalogueRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
