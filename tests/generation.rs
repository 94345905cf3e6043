use village_generator::params::GenerationParams;
use village_generator::terrain::synthetic::SyntheticTerrain;
use village_generator::{generate, GenerationError};

fn params(seed: u64) -> GenerationParams {
    GenerationParams { seed, time_limit_secs: 30.0, max_buildings: 24, ..Default::default() }
}

#[test]
fn end_to_end_on_synthetic_terrain() {
    let terrain = SyntheticTerrain { width: 128, length: 128, seed: 3, ..Default::default() }
        .generate()
        .unwrap();
    let report = generate(&terrain, params(3)).unwrap();

    assert!(report.stats.districts >= 1);
    assert!(report.stats.towns >= 1);
    assert!(!report.parcels.is_empty());
    assert!(report.roads.is_connected());

    for (i, parcel) in report.parcels.iter().enumerate() {
        assert!(report.roads.is_road(parcel.entry), "parcel {} has no road", parcel.id);
        assert!(parcel.ground_level.is_some());
        assert!(parcel.building_height.is_some());
        let cells = parcel.cells();
        assert!(cells.iter().all(|p| terrain.contains(*p) && !report.roads.is_road(*p)));
        for other in &report.parcels[i + 1..] {
            assert!(cells.iter().all(|p| !other.contains(*p)), "{} overlaps {}", parcel.id, other.id);
        }
    }
    let json = serde_json::to_string(&report.stats).unwrap();
    assert!(json.contains("\"road_cells\""));
}

#[test]
fn export_writes_images() {
    let terrain = SyntheticTerrain { width: 64, length: 64, seed: 8, river: false, ..Default::default() }
        .generate()
        .unwrap();
    let report = generate(&terrain, GenerationParams { max_buildings: 6, ..params(8) }).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let written = village_generator::export::export_report(&report, &terrain, dir.path()).unwrap();
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|p| p.exists()));
}

#[test]
fn invalid_params_are_rejected() {
    let terrain = SyntheticTerrain { width: 32, length: 32, ..Default::default() }.generate().unwrap();
    let mut bad = GenerationParams::default();
    bad.districts.sample_step = 0;
    assert!(matches!(generate(&terrain, bad), Err(GenerationError::InvalidParams(_))));
}
