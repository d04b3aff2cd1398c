//! End-to-end retrieval over a miniature archive with in-memory file contents.

use catalogue::{Catalogue, CatalogueConfig, Column, FilterSpec};
use cmip_common::{Calendar, CmipError};
use grid_processor::LatLon;
use netcdf_parser::{Constraint, Cube, MemoryLoader, Points};
use retrieval::{Archive, CatalogueOptions, ModelFixes};
use tempfile::TempDir;
use test_utils::{assert_approx_eq, files, fixed_field_cube, models, Cmip5Tree, DatasetSpec, MonthlyCube};

fn cmcc(var: &str) -> DatasetSpec {
    DatasetSpec::new("CMCC", models::CMCC_CM, "historical", "r1i1p1", var)
}

/// Archive over `tree` with a catalogue file in a scratch directory and no
/// reachable shared catalogue.
fn archive(tree: &Cmip5Tree, loader: MemoryLoader) -> (TempDir, Archive<MemoryLoader>) {
    let home = tempfile::tempdir().unwrap();
    let config = CatalogueConfig::new(
        tree.root(),
        home.path().join(".cmip5_catalogue.csv"),
        home.path().join("missing/cmip5_catalogue.csv"),
    );
    let archive = Archive::new(config, loader);
    archive.refresh().unwrap();
    (home, archive)
}

fn query(archive: &Archive<MemoryLoader>, spec: FilterSpec) -> Catalogue {
    archive.catalogue(&spec, CatalogueOptions::default()).unwrap()
}

fn cmcc_tas_2000(tree: &Cmip5Tree) -> MemoryLoader {
    let dir = tree.add(&cmcc("tas").period("200001-200012"));
    MemoryLoader::new().with(
        dir.join(files::CMCC_TAS_2000),
        vec![MonthlyCube::new("tas", 2000, 12).build()],
    )
}

fn time_points(cube: &Cube) -> Vec<f64> {
    cube.coord("time")
        .and_then(|c| c.points.as_numeric())
        .unwrap()
        .to_vec()
}

fn strictly_increasing(points: &[f64]) -> bool {
    points.windows(2).all(|w| w[0] < w[1])
}

// ============================================================================
// Labelling and constraints
// ============================================================================

#[test]
fn test_cmcc_january_2000() {
    let tree = Cmip5Tree::new();
    let (_home, archive) = archive(&tree, cmcc_tas_2000(&tree));

    let rows = query(
        &archive,
        FilterSpec::new()
            .with(Column::Model, models::CMCC_CM)
            .with(Column::Experiment, "historical")
            .with(Column::Var, "tas"),
    );
    let constraint = Constraint::coord_eq("year", 2000).and(Constraint::coord_eq("month", 1));
    let cube = archive.get_cube(&rows, Some(&constraint), None).unwrap();

    assert_eq!(cube.shape, vec![1, 2, 3]);
    assert_eq!(cube.label("Model"), Some("CMCC-CM"));
    assert_eq!(cube.label("Experiment"), Some("historical"));
    assert_eq!(cube.label("RunID"), Some("r1i1p1"));
    assert_eq!(cube.coord("year").unwrap().points, Points::Numeric(vec![2000.0]));
    assert_eq!(cube.coord("month").unwrap().points, Points::Numeric(vec![1.0]));
}

#[test]
fn test_template_cube() {
    let tree = Cmip5Tree::new();
    let (_home, archive) = archive(&tree, cmcc_tas_2000(&tree));

    let cube = archive.template_cube().unwrap();
    assert_eq!(cube.var_name, "tas");
    assert_eq!(cube.shape, vec![1, 2, 3]);
    assert_eq!(cube.coord("year").unwrap().points, Points::Numeric(vec![2000.0]));
}

#[test]
fn test_template_cube_missing() {
    let tree = Cmip5Tree::new();
    let dir = tree.add(&cmcc("pr").period("200001-200012"));
    let loader = MemoryLoader::new().with(
        dir.join(cmcc("pr").file_name("200001-200012")),
        vec![MonthlyCube::new("pr", 2000, 12).build()],
    );
    let (_home, archive) = archive(&tree, loader);

    assert!(matches!(
        archive.template_cube(),
        Err(CmipError::UnknownValue { .. })
    ));
}

// ============================================================================
// Joining segments
// ============================================================================

#[test]
fn test_segments_joined_in_time_order() {
    let tree = Cmip5Tree::new();
    let dir = tree.add(&cmcc("tas").period("200001-200012").period("200101-200112"));

    let mut first = MonthlyCube::new("tas", 2000, 12).build();
    first.attributes.insert("history".into(), "created 2011".into());
    let mut second = MonthlyCube::new("tas", 2001, 12).build();
    second.attributes.insert("history".into(), "created 2012".into());
    let loader = MemoryLoader::new()
        .with(dir.join(files::CMCC_TAS_2000), vec![first])
        .with(dir.join(files::CMCC_TAS_2001), vec![second]);
    let (_home, archive) = archive(&tree, loader);

    let rows = query(&archive, FilterSpec::new().with(Column::Var, "tas"));
    let cube = archive.get_cube(&rows, None, None).unwrap();

    assert_eq!(cube.shape, vec![24, 2, 3]);
    assert!(strictly_increasing(&time_points(&cube)));
    assert!(cube.attributes.is_empty());
    let years = cube.coord("year").unwrap().points.as_numeric().unwrap().to_vec();
    assert_eq!(years[0], 2000.0);
    assert_eq!(years[23], 2001.0);
}

#[test]
fn test_overlapping_segment_trimmed() {
    let tree = Cmip5Tree::new();
    let dir = tree.add(&cmcc("tas").period("200001-200012").period("200006-200105"));

    let loader = MemoryLoader::new()
        .with(
            dir.join(files::CMCC_TAS_2000),
            vec![MonthlyCube::new("tas", 2000, 12).build()],
        )
        .with(
            dir.join(cmcc("tas").file_name("200006-200105")),
            vec![MonthlyCube::new("tas", 2000, 12).start_month(6).build()],
        );
    let (_home, archive) = archive(&tree, loader);

    let rows = query(&archive, FilterSpec::new().with(Column::Var, "tas"));
    let cube = archive.get_cube(&rows, None, None).unwrap();

    // January 2000 to May 2001
    assert_eq!(cube.shape[0], 17);
    assert!(strictly_increasing(&time_points(&cube)));
}

#[test]
fn test_misplaced_file_skipped() {
    let tree = Cmip5Tree::new();
    let dir = tree.add(
        &cmcc("tas")
            .period("200001-200012")
            .file("tas_Amon_CMCC-CM_historical_r2i1p1_200101-200112.nc"),
    );
    // Only the r1i1p1 file is known to the loader, so loading the other fails
    let loader = MemoryLoader::new().with(
        dir.join(files::CMCC_TAS_2000),
        vec![MonthlyCube::new("tas", 2000, 12).build()],
    );
    let (_home, archive) = archive(&tree, loader);

    let rows = query(&archive, FilterSpec::new().with(Column::Var, "tas"));
    let cube = archive.get_cube(&rows, None, None).unwrap();
    assert_eq!(cube.shape[0], 12);
}

#[test]
fn test_multiple_cubes_in_file() {
    let tree = Cmip5Tree::new();
    let dir = tree.add(&cmcc("tas").period("200001-200012"));
    let loader = MemoryLoader::new().with(
        dir.join(files::CMCC_TAS_2000),
        vec![
            MonthlyCube::new("tas", 2000, 12).build(),
            MonthlyCube::new("tas", 2000, 12).lats(vec![-30.0, 30.0]).build(),
        ],
    );
    let (_home, archive) = archive(&tree, loader);

    let rows = query(&archive, FilterSpec::new().with(Column::Var, "tas"));
    let err = archive.get_cubes(&rows, None, None).unwrap_err();
    assert!(matches!(err, CmipError::MultipleCubes { count: 2, .. }));
}

// ============================================================================
// Model fixes
// ============================================================================

fn ec_earth_tree() -> (Cmip5Tree, MemoryLoader) {
    let tree = Cmip5Tree::new();
    let spec = DatasetSpec::new("ICHEC", models::EC_EARTH, "historical", "r1i1p1", "tas");
    let dir = tree.add(&spec.clone().period("200001-200012").period("200101-200112"));

    let loader = MemoryLoader::new()
        .with(
            dir.join(spec.file_name("200001-200012")),
            vec![MonthlyCube::new("tas", 2000, 12)
                .calendar(Calendar::Gregorian)
                .build()],
        )
        .with(
            dir.join(spec.file_name("200101-200112")),
            vec![MonthlyCube::new("tas", 2001, 12)
                .time_units("days since 2001-01-01")
                .build()],
        );
    (tree, loader)
}

#[test]
fn test_ec_earth_segments_joined() {
    let (tree, loader) = ec_earth_tree();
    let (_home, archive) = archive(&tree, loader);

    let rows = query(&archive, FilterSpec::new().with(Column::Model, models::EC_EARTH));
    let cube = archive.get_cube(&rows, None, None).unwrap();

    assert_eq!(cube.shape[0], 24);
    let units = cube.coord("time").unwrap().units.time().copied().unwrap();
    assert_eq!(units.calendar, Calendar::Standard);
    assert!(strictly_increasing(&time_points(&cube)));
}

#[test]
fn test_ec_earth_without_fix_fails() {
    let (tree, loader) = ec_earth_tree();
    let (_home, archive) = archive(&tree, loader);
    let archive = archive.with_fixes(ModelFixes::none());

    let rows = query(&archive, FilterSpec::new().with(Column::Model, models::EC_EARTH));
    let err = archive.get_cube(&rows, None, None).unwrap_err();
    assert!(matches!(err, CmipError::Concatenation(_)));
}

// ============================================================================
// Row selection
// ============================================================================

fn tas_and_pr() -> (Cmip5Tree, MemoryLoader) {
    let tree = Cmip5Tree::new();
    let tas = tree.add(&cmcc("tas").period("200001-200012"));
    let pr = tree.add(&cmcc("pr").period("200001-200012"));
    let loader = MemoryLoader::new()
        .with(
            tas.join(files::CMCC_TAS_2000),
            vec![MonthlyCube::new("tas", 2000, 12).build()],
        )
        .with(
            pr.join(cmcc("pr").file_name("200001-200012")),
            vec![MonthlyCube::new("pr", 2000, 12).build()],
        );
    (tree, loader)
}

#[test]
fn test_get_cubes_follows_row_order() {
    let (tree, loader) = tas_and_pr();
    let (_home, archive) = archive(&tree, loader);

    let rows = query(&archive, FilterSpec::new().with(Column::Model, models::CMCC_CM));
    let cubes = archive.get_cubes(&rows, None, None).unwrap();

    assert_eq!(cubes.len(), rows.len());
    for (cube, row) in cubes.iter().zip(rows.iter()) {
        assert_eq!(cube.var_name, row.var);
    }
}

#[test]
fn test_get_cube_needs_one_row() {
    let (tree, loader) = tas_and_pr();
    let (_home, archive) = archive(&tree, loader);

    let rows = query(&archive, FilterSpec::new().with(Column::Model, models::CMCC_CM));
    assert!(matches!(
        archive.get_cube(&rows, None, None),
        Err(CmipError::AmbiguousResult(2))
    ));
    assert!(matches!(
        archive.get_cube(&Catalogue::default(), None, None),
        Err(CmipError::NotFound(_))
    ));
}

#[test]
fn test_complete_var_set_query() {
    let (tree, loader) = tas_and_pr();
    tree.add(&DatasetSpec::new("CMCC", models::CMCC_CM, "historical", "r2i1p1", "tas"));
    let (_home, archive) = archive(&tree, loader);

    let spec = FilterSpec::new()
        .with(Column::Model, models::CMCC_CM)
        .with_any(Column::Var, ["tas", "pr"]);
    let options = CatalogueOptions {
        complete_var_set: true,
        ..Default::default()
    };
    let rows = archive.catalogue(&spec, options).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.run_id == "r1i1p1"));
}

#[test]
fn test_refresh_option_picks_up_new_data() {
    let tree = Cmip5Tree::new();
    let (_home, archive) = archive(&tree, cmcc_tas_2000(&tree));
    tree.add(&cmcc("pr").period("200001-200012"));

    let spec = FilterSpec::new().with(Column::Var, "pr");
    assert!(matches!(
        archive.catalogue(&spec, CatalogueOptions::default()),
        Err(CmipError::UnknownValue { .. })
    ));

    let refreshed = CatalogueOptions {
        refresh: true,
        ..Default::default()
    };
    assert_eq!(archive.catalogue(&spec, refreshed).unwrap().len(), 1);
}

// ============================================================================
// Nearest-point sampling
// ============================================================================

#[test]
fn test_target_point() {
    let tree = Cmip5Tree::new();
    let (_home, archive) = archive(&tree, cmcc_tas_2000(&tree));

    let rows = query(&archive, FilterSpec::new().with(Column::Var, "tas"));
    let cube = archive
        .get_cube(&rows, None, Some(LatLon::new(40.0, 115.0)))
        .unwrap();

    assert_eq!(cube.shape, vec![12]);
    // Nearest grid point is (45, 120): lat index 1, lon index 1
    assert_approx_eq!(cube.data[0], 11.0, 1e-6);
    assert_approx_eq!(cube.data[1], 111.0, 1e-6);
    assert_eq!(cube.coord("latitude").unwrap().points, Points::Numeric(vec![40.0]));
}

// ============================================================================
// Fixed fields
// ============================================================================

#[test]
fn test_orog_alias_and_experiment_preference() {
    let tree = Cmip5Tree::new();
    let historical = DatasetSpec::fx("MOHC", models::HADGEM2_CC, "historical", "orog");
    let pi_control = DatasetSpec::fx("MOHC", models::HADGEM2_CC, "piControl", "orog");
    let hist_dir = tree.add(&historical.clone().period(""));
    let pi_dir = tree.add(&pi_control.clone().period(""));

    let loader = MemoryLoader::new()
        .with(hist_dir.join(historical.file_name("")), vec![fixed_field_cube("orog", "m")])
        .with(pi_dir.join(pi_control.file_name("")), vec![fixed_field_cube("orog", "m")]);
    let (_home, archive) = archive(&tree, loader);

    let cube = archive.get_orog(models::HADGEM2_AO).unwrap();
    assert_eq!(cube.var_name, "orog");
    assert_eq!(cube.shape, vec![2, 3]);
    assert_eq!(cube.label("Model"), Some(models::HADGEM2_CC));
    assert_eq!(cube.label("Experiment"), Some("historical"));
}

#[test]
fn test_fx_missing() {
    let tree = Cmip5Tree::new();
    let (_home, archive) = archive(&tree, cmcc_tas_2000(&tree));

    assert!(matches!(archive.get_laf(models::CMCC_CM), Err(CmipError::NotFound(_))));
    assert!(matches!(archive.get_orog("NoSuchModel"), Err(CmipError::NotFound(_))));
}

#[test]
fn test_fx_only_in_unknown_experiment() {
    let tree = Cmip5Tree::new();
    let spec = DatasetSpec::fx("CMCC", models::CMCC_CM, "rcp85", "sftlf");
    let dir = tree.add(&spec.clone().period(""));
    let loader =
        MemoryLoader::new().with(dir.join(spec.file_name("")), vec![fixed_field_cube("sftlf", "%")]);
    let (_home, archive) = archive(&tree, loader);

    assert!(matches!(archive.get_laf(models::CMCC_CM), Err(CmipError::NotFound(_))));
}
