// End-to-end test: a small city block of terrain, road, and building
// lifted from a synthetic sample stream into 3D mesh buffers.
use citylift::{
    collect_stream, run, AttributeValue, ElevationSample, FootprintArena, FootprintClass,
    LiftConfig,
};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sample(x: f64, y: f64, z: f64) -> ElevationSample {
    ElevationSample {
        x,
        y,
        z,
        classification: 2,
    }
}

/// terrain (0..10), road (10..20), building (20..30), all sharing edges
fn build_scene() -> (
    FootprintArena,
    citylift::FootprintId,
    citylift::FootprintId,
    citylift::FootprintId,
) {
    let mut arena = FootprintArena::new();
    let terrain = arena
        .insert(
            "POLYGON ((0 0, 10 0, 10 10, 0 10))",
            "terrain",
            FootprintClass::Terrain,
            IndexMap::new(),
            "terrain-1",
        )
        .expect("terrain polygon is valid");
    let road = arena
        .insert(
            "POLYGON ((10 0, 20 0, 20 10, 10 10))",
            "roads",
            FootprintClass::Road,
            IndexMap::new(),
            "road-1",
        )
        .expect("road polygon is valid");
    let mut attrs = IndexMap::new();
    attrs.insert(
        "function".to_string(),
        AttributeValue::String("residential".to_string()),
    );
    attrs.insert("storeys".to_string(), AttributeValue::Integer(3));
    let building = arena
        .insert(
            "POLYGON ((20 0, 30 0, 30 10, 20 10))",
            "buildings",
            FootprintClass::Building,
            attrs,
            "building-1",
        )
        .expect("building polygon is valid");
    arena.link_mutual(terrain, road);
    arena.link_mutual(road, building);
    (arena, terrain, road, building)
}

fn feed_samples(
    arena: &mut FootprintArena,
    config: &LiftConfig,
    terrain: citylift::FootprintId,
    road: citylift::FootprintId,
    building: citylift::FootprintId,
) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut samples = Vec::new();
    // ground returns at 2 m across terrain and road
    for i in 0..=20 {
        for j in 0..=10 {
            let s = sample(i as f64, j as f64, 2.0);
            samples.push((if i <= 10 { terrain } else { road }, s));
            if i == 10 {
                // the shared column feeds both footprints
                samples.push((road, s));
            }
        }
    }
    // roof returns at 12 m across the building
    for i in 20..=30 {
        for j in 0..=10 {
            samples.push((building, sample(i as f64, j as f64, 12.0)));
        }
    }
    collect_stream(arena, samples, &config.collect, &mut rng);
}

#[test]
fn test_city_block_lifts_and_meshes() {
    let (mut arena, terrain, road, building) = build_scene();
    let config = LiftConfig::default();
    feed_samples(&mut arena, &config, terrain, road, building);

    let report = run(&mut arena, &config);
    println!(
        "lifted {} meshed {} walls {}",
        report.lifted, report.meshed, report.wall_footprints
    );
    assert_eq!(report.lifted, 3);
    assert_eq!(report.meshed, 3);
    assert_eq!(report.wall_footprints, 1);
    assert!(report.missing_height.is_empty());
    assert!(report.mesh_failures.is_empty());

    // terrain and road agree on the ground level
    for id in [terrain, road] {
        let fp = arena.get(id);
        for ringi in 0..fp.polygon().num_rings() {
            for pi in 0..fp.polygon().ring(ringi).len() {
                assert_eq!(fp.vertex_height(ringi, pi), 200, "{} stays at 2 m", fp.id());
            }
        }
        assert!(!fp.mesh.surface.triangles.is_empty());
        assert!(!fp.mesh.has_walls, "no walls between level neighbors");
    }

    // the building pools its roof samples to one uniform height
    let b = arena.get(building);
    for pi in 0..4 {
        assert_eq!(b.vertex_height(0, pi), 1200);
    }
    assert!(b.mesh.has_walls);
    let wall_zs: Vec<f64> = b.mesh.walls.vertices.points.iter().map(|p| p.z).collect();
    assert!(
        wall_zs.iter().any(|&z| (z - 12.0).abs() < 1e-9),
        "walls reach the roof"
    );
    assert!(
        wall_zs.iter().any(|&z| (z - 2.0).abs() < 1e-9),
        "walls reach the street level"
    );

    println!("✓ city block lifted, reconciled, and meshed");
}

#[test]
fn test_outputs_serialize_for_exporters() {
    let (mut arena, terrain, road, building) = build_scene();
    let config = LiftConfig::default();
    feed_samples(&mut arena, &config, terrain, road, building);
    let report = run(&mut arena, &config);

    let mesh_json =
        serde_json::to_value(&arena.get(building).mesh).expect("mesh serializes");
    assert!(mesh_json["surface"]["vertices"]["points"].is_array());
    assert!(mesh_json["surface"]["vertices"]["keys"].is_array());
    assert!(mesh_json["has_walls"].as_bool().unwrap());

    let report_json = serde_json::to_string(&report).expect("report serializes");
    assert!(report_json.contains("missing_height"));

    println!("✓ outputs round-trip through serde_json");
}

#[test]
fn test_attributes_survive_the_pipeline() {
    let (mut arena, terrain, road, building) = build_scene();
    let config = LiftConfig::default();
    feed_samples(&mut arena, &config, terrain, road, building);
    run(&mut arena, &config);

    let b = arena.get(building);
    assert_eq!(
        b.attribute("function"),
        Some(&AttributeValue::String("residential".to_string()))
    );
    assert_eq!(b.attribute_or("storeys", "1"), "3");
    assert_eq!(b.attribute_or("absent", "fallback"), "fallback");
}

#[test]
fn test_invalid_footprint_is_skipped_alone() {
    let mut arena = FootprintArena::new();
    // fewer than 3 distinct vertices: fatal for this footprint only
    let bad = arena.insert(
        "POLYGON ((0 0, 5 5, 0 0))",
        "terrain",
        FootprintClass::Terrain,
        IndexMap::new(),
        "bad",
    );
    assert!(bad.is_err());

    let good = arena
        .insert(
            "POLYGON ((0 0, 10 0, 10 10, 0 10))",
            "terrain",
            FootprintClass::Terrain,
            IndexMap::new(),
            "good",
        )
        .expect("valid footprint still inserts");

    let config = LiftConfig::default();
    let mut rng = StdRng::seed_from_u64(7);
    let mut samples = Vec::new();
    for i in 0..=10 {
        for j in 0..=10 {
            samples.push((good, sample(i as f64, j as f64, 3.0)));
        }
    }
    collect_stream(&mut arena, samples, &config.collect, &mut rng);
    let report = run(&mut arena, &config);
    assert_eq!(report.meshed, 1);
    assert!(!arena.get(good).mesh.surface.triangles.is_empty());
}
