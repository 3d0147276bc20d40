use marionette::{MarionetteError, PuppetDefinition, Vec2, prepare};

fn fixture() -> PuppetDefinition {
    let s = include_str!("data/puppet.json");
    serde_json::from_str(s).unwrap()
}

#[test]
fn mutator_table_covers_every_generator_in_visitation_order() {
    let prepared = prepare(&fixture()).unwrap();

    assert_eq!(prepared.mutators.len, 6);
    assert_eq!(prepared.mutators.stride, 4);
    // translate
    assert_eq!(prepared.mutators.data[0..4], [1.0, 30.0, 30.0, -1.0]);
    // opacity
    assert_eq!(prepared.mutators.data[4..8], [5.0, 30.0, 30.0, -1.0]);
    // deform keeps its radius
    assert_eq!(prepared.mutators.data[8..12], [4.0, 15.0, 15.0, 30.0]);
    // stretch
    assert_eq!(prepared.mutators.data[12..16], [2.0, 18.0, 12.0, -1.0]);
    // rotate
    assert_eq!(prepared.mutators.data[16..20], [3.0, 40.0, 34.0, -1.0]);
}

#[test]
fn parent_chain_matches_the_scope_rules() {
    let prepared = prepare(&fixture()).unwrap();

    assert_eq!(prepared.mutator_parents.len, prepared.mutators.len);
    assert_eq!(prepared.mutator_parents.data, vec![-1, 0, 1, 2, 1, 1]);
}

#[test]
fn default_mutation_values_follow_the_default_frame() {
    let prepared = prepare(&fixture()).unwrap();

    // `move` is absent from the default frame and compiles to zero.
    assert_eq!(
        prepared.mutation_values.data,
        vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 1.0, 1.0, 45.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn jointly_governed_mutators_use_the_indexed_tables() {
    let prepared = prepare(&fixture()).unwrap();

    // Only `limb` is governed by two controls; its step values fill the pool.
    assert_eq!(prepared.control_mutation_values.stride, 2);
    assert_eq!(
        prepared.control_mutation_values.data,
        vec![200.0, 0.0, 120.0, 0.0, -20.0, 0.0, -60.0, 0.0]
    );

    assert_eq!(prepared.mutation_value_indices.stride, 3);
    assert_eq!(prepared.mutation_value_indices.data, vec![0, 0, 0, 2, 1, 0]);

    assert_eq!(prepared.control_mutation_indices.stride, 2);
    assert_eq!(prepared.control_mutation_indices.len, 6);
    assert_eq!(
        prepared.control_mutation_indices.data,
        vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0]
    );

    assert_eq!(prepared.max_iteration, 2);
}

#[test]
fn binding_evaluation_matches_the_mix_rules() {
    let prepared = prepare(&fixture()).unwrap();
    let values = prepared.evaluate_mutations(&[0.3, 0.1, 0.0]);

    // hide: opacity multiplies its default (1, 0) by the interpolated step.
    assert!((values[1].x - 0.92).abs() < 1e-5);
    // limb: both governing controls fold additively into the default 45.
    assert!((values[4].x - 197.0).abs() < 1e-3);
    // move: direct binding at step 0.
    assert!((values[5].x - -500.0).abs() < 1e-3);
    // stretch keeps its default, no control governs it.
    assert_eq!(values[3], Vec2::new(1.0, 1.0));
}

#[test]
fn control_metadata_and_initial_values_are_reported() {
    let prepared = prepare(&fixture()).unwrap();

    let names: Vec<_> = prepared.controls.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Control1", "Control2", "Control3"]);
    assert!(prepared.controls.iter().all(|c| c.steps == 2));
    assert_eq!(prepared.default_control_values, vec![0.3, 0.1, 0.0]);
}

#[test]
fn animations_compile_to_per_control_tracks() {
    let prepared = prepare(&fixture()).unwrap();

    let animation = &prepared.animations[0];
    assert_eq!(animation.name, "AnimationTrack");
    assert_eq!(animation.duration, 6200.0);
    assert_eq!(animation.tracks.len(), 2);
    assert_eq!(animation.tracks[0].control, 0);
    assert_eq!(
        animation.tracks[0].track,
        vec![2000.0, 0.0, 4000.0, 0.7, 6200.0, 1.0]
    );
    assert_eq!(animation.tracks[1].control, 1);
    assert_eq!(animation.tracks[1].track, vec![2000.0, 0.4, 6200.0, 1.0]);
    assert_eq!(animation.events.len(), 1);
    assert_eq!(animation.events[0].time, 2500.0);
    assert_eq!(animation.events[0].name, "MyCustomEvent");

    let empty = &prepared.animations[1];
    assert_eq!(empty.duration, 0.0);
    assert!(empty.tracks.is_empty());
    assert!(empty.events.is_empty());
}

#[test]
fn draw_records_map_sprites_to_their_driving_mutators() {
    let prepared = prepare(&fixture()).unwrap();

    assert_eq!(prepared.shapes.len(), 3);
    // Sorted by z, descending: later sprites stack closer to the viewer.
    let names: Vec<_> = prepared.shapes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Layer3", "Layer2", "Layer1"]);
    let drivers: Vec<_> = prepared.shapes.iter().map(|s| s.mutator).collect();
    assert_eq!(drivers, vec![5, 4, 3]);

    // Three triangles, three vertices each, indices offset per sprite.
    assert_eq!(prepared.shape_vertices.len, 9);
    assert_eq!(prepared.shape_indices.len(), 9);
}

#[test]
fn other_versions_are_rejected_by_name() {
    for version in ["1.1", "1.2", "2.0"] {
        let mut def = fixture();
        def.version = version.to_string();
        let err = prepare(&def).unwrap_err();
        assert!(matches!(err, MarionetteError::UnsupportedVersion { .. }));
        assert_eq!(
            err.to_string(),
            format!("version {version} files are not supported")
        );
    }
}
