//! The query surface over a CMIP5 archive.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use catalogue::{filter, rebuild, Catalogue, CatalogueConfig, Column, FilterSpec};
use cmip_common::{CmipError, CmipResult};
use grid_processor::LatLon;
use netcdf_parser::{Constraint, Cube, CubeLoader, NetCdfLoader};

use crate::assembly::assemble_row;
use crate::fixes::ModelFixes;
use crate::fx::{fx_model, preferred_experiment, LAND_FRACTION, OROGRAPHY};

/// Options for catalogue queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueOptions {
    /// Rebuild the catalogue from the archive before querying
    pub refresh: bool,
    /// Keep only run directories offering every requested variable
    pub complete_var_set: bool,
}

/// Catalogue queries and cube retrieval for one archive.
///
/// The catalogue file is read again for every query.
pub struct Archive<L = NetCdfLoader> {
    config: CatalogueConfig,
    loader: L,
    fixes: ModelFixes,
}

impl Archive<NetCdfLoader> {
    /// Archive read from NetCDF files on disk.
    pub fn open(config: CatalogueConfig) -> Self {
        Self::new(config, NetCdfLoader::new())
    }
}

impl<L: CubeLoader> Archive<L> {
    pub fn new(config: CatalogueConfig, loader: L) -> Self {
        Self {
            config,
            loader,
            fixes: ModelFixes::default(),
        }
    }

    /// Replace the model fix table.
    pub fn with_fixes(mut self, fixes: ModelFixes) -> Self {
        self.fixes = fixes;
        self
    }

    pub fn config(&self) -> &CatalogueConfig {
        &self.config
    }

    /// Rebuild the catalogue from the archive tree.
    pub fn refresh(&self) -> CmipResult<Catalogue> {
        rebuild(&self.config)
    }

    /// The whole catalogue, bringing the local copy up to date first.
    pub fn full_catalogue(&self) -> CmipResult<Catalogue> {
        self.config.setup_local_file()?;
        Catalogue::read_csv(&self.config.local_file)
    }

    /// Catalogue rows matching `spec`.
    pub fn catalogue(&self, spec: &FilterSpec, options: CatalogueOptions) -> CmipResult<Catalogue> {
        let table = if options.refresh {
            self.refresh()?
        } else {
            self.full_catalogue()?
        };
        filter(&table, spec, options.complete_var_set)
    }

    /// One cube per row of `rows`, in row order.
    ///
    /// `constraint` is applied to each file on top of the row's variable, and
    /// `target` samples the nearest grid point. Any failure aborts the call.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub fn get_cubes(
        &self,
        rows: &Catalogue,
        constraint: Option<&Constraint>,
        target: Option<LatLon>,
    ) -> CmipResult<Vec<Cube>> {
        let total = rows.len();
        let mut cubes = Vec::with_capacity(total);
        for (i, row) in rows.iter().enumerate() {
            info!(
                centre = %row.centre,
                model = %row.model,
                run_id = %row.run_id,
                experiment = %row.experiment,
                var = %row.var,
                "[{}/{}] CMIP5 {} {} {} {} {}",
                i + 1,
                total,
                row.centre,
                row.model,
                row.run_id,
                row.experiment,
                row.var
            );
            cubes.push(assemble_row(&self.loader, row, constraint, target, &self.fixes)?);
        }
        Ok(cubes)
    }

    /// The cube for a table of exactly one row.
    pub fn get_cube(
        &self,
        rows: &Catalogue,
        constraint: Option<&Constraint>,
        target: Option<LatLon>,
    ) -> CmipResult<Cube> {
        match rows.len() {
            0 => Err(CmipError::NotFound("no rows specified in catalogue".to_string())),
            1 => self
                .get_cubes(rows, constraint, target)?
                .pop()
                .ok_or_else(|| CmipError::NotFound("no cube loaded".to_string())),
            n => Err(CmipError::AmbiguousResult(n)),
        }
    }

    /// A fixed field (`fx`) for `model`, from the preferred available experiment.
    pub fn get_fx(&self, model: &str, var: &str) -> CmipResult<Cube> {
        let source = fx_model(model);
        if source != model {
            info!(model, source, var, "Using fixed field of another model");
        }

        let spec = FilterSpec::new()
            .with(Column::Model, source)
            .with(Column::Frequency, "fx")
            .with(Column::Var, var);
        let rows = match self.catalogue(&spec, CatalogueOptions::default()) {
            Ok(rows) => rows,
            Err(CmipError::UnknownValue { .. }) => Catalogue::default(),
            Err(e) => return Err(e),
        };
        if rows.is_empty() {
            return Err(CmipError::NotFound(format!("no {} files exist for {}", var, source)));
        }

        let experiments = rows.distinct(Column::Experiment);
        let Some(experiment) = preferred_experiment(&experiments) else {
            return Err(CmipError::NotFound(format!(
                "no {} file for {} in a known experiment (found {})",
                var,
                source,
                experiments.join(", ")
            )));
        };

        let rows = filter(&rows, &FilterSpec::new().with(Column::Experiment, experiment), false)?;
        let mut cubes = self.get_cubes(&rows, None, None)?;
        if cubes.len() > 1 {
            warn!(model = source, var, count = cubes.len(), "More than one fixed field found, using the first");
        }
        if cubes.is_empty() {
            return Err(CmipError::NotFound(format!("no {} cube for {}", var, source)));
        }
        Ok(cubes.swap_remove(0))
    }

    /// Surface altitude for `model`.
    pub fn get_orog(&self, model: &str) -> CmipResult<Cube> {
        self.get_fx(model, OROGRAPHY)
    }

    /// Land area fraction for `model`.
    pub fn get_laf(&self, model: &str) -> CmipResult<Cube> {
        self.get_fx(model, LAND_FRACTION)
    }

    /// January 2000 of CMCC-CM historical monthly `tas`, for use as a
    /// reference grid.
    pub fn template_cube(&self) -> CmipResult<Cube> {
        let spec = FilterSpec::new()
            .with(Column::Model, "CMCC-CM")
            .with(Column::Experiment, "historical")
            .with(Column::Var, "tas")
            .with(Column::Frequency, "mon");
        let rows = self.catalogue(&spec, CatalogueOptions::default())?;
        if rows.is_empty() {
            return Err(CmipError::NotFound("template catalogue row".to_string()));
        }

        let constraint = Constraint::var_name("tas")
            .and(Constraint::coord_eq("year", 2000))
            .and(Constraint::coord_eq("month", 1));
        self.get_cubes(&rows.row_table(0), Some(&constraint), None)?
            .pop()
            .ok_or_else(|| CmipError::NotFound("template cube".to_string()))
    }
}
