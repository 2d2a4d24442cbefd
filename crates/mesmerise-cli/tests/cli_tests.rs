use std::ffi::OsString;

use clap::Parser;
use mesmerise_cli::args::CliArgs;
use mesmerise_cli::recipe::Recipe;
use mesmerise_cli::run;
use mesmerise_core::config::EditorConfig;
use mesmerise_core::effects::EffectKind;
use mesmerise_io::decode;
use mesmerise_test_harness::builders::RasterBuilder;
use mesmerise_test_harness::fixtures;

#[test]
fn test_parse_args() {
    let args = CliArgs::parse_from([
        "mesmerise", "-l", "base.png", "-l", "top.png", "-r", "edit.json", "-o", "out.png",
        "-vv", "--seed", "3",
    ]);
    assert_eq!(args.layers.len(), 2);
    assert_eq!(args.recipe.as_deref(), Some(std::path::Path::new("edit.json")));
    assert_eq!(args.output, std::path::PathBuf::from("out.png"));
    assert_eq!(args.verbose, 2);
    assert_eq!(args.seed, Some(3));
    assert!(!args.quiet);
}

#[test]
fn test_layers_required_without_list_effects() {
    assert!(CliArgs::try_parse_from(["mesmerise", "-o", "x.png"]).is_err());
    assert!(CliArgs::try_parse_from(["mesmerise", "--list-effects"]).is_ok());
}

#[test]
fn test_run_applies_recipe_and_exports() {
    let dir = fixtures::fixture_dir();
    let base = fixtures::write_test_png(
        dir.path(),
        "base",
        &RasterBuilder::new(60, 40).gradient().build(),
    );
    let top = fixtures::write_test_png(
        dir.path(),
        "top",
        &RasterBuilder::new(20, 10).fill([255, 0, 0, 255]).build(),
    );
    let recipe = fixtures::write_json(
        dir.path(),
        "recipe.json",
        r#"{
            "layers": [
                { "layer": 0, "effects": [{ "kind": "sepia", "value": 50 }] },
                { "layer": 1, "move": [30, 20], "effects": [{ "kind": "invert", "value": 100 }] }
            ],
            "crop": { "x": 10, "y": 10, "width": 40, "height": 25 }
        }"#,
    );
    let output = dir.path().join("result.png");

    let args = CliArgs::parse_from([
        OsString::from("mesmerise"),
        "-l".into(),
        base.into_os_string(),
        "-l".into(),
        top.into_os_string(),
        "-r".into(),
        recipe.into_os_string(),
        "-o".into(),
        output.clone().into_os_string(),
        "--seed".into(),
        "1".into(),
    ]);
    run::run(&args).unwrap();

    let written = decode::load_raster(&output).unwrap();
    assert_eq!((written.width, written.height), (40, 25));
    // the inverted red layer now sits at (20, 10) on the cropped canvas
    assert_eq!(written.pixel(25, 12), &[0, 255, 255, 255]);
}

#[test]
fn test_recipe_refusals_are_reported() {
    let dir = fixtures::fixture_dir();
    let base = fixtures::write_test_png(dir.path(), "base", &RasterBuilder::new(30, 30).build());
    let top = fixtures::write_test_png(dir.path(), "top", &RasterBuilder::new(10, 10).build());
    let (mut session, ids) = run::load_session(&[base, top], EditorConfig::default()).unwrap();

    let recipe = Recipe::from_json_str(
        r#"{
            "layers": [
                { "layer": 0, "move": [5, 5] },
                { "layer": 1, "effects": [{ "kind": "resolution" }, { "kind": "resolution" }] }
            ]
        }"#,
    )
    .unwrap();
    let report = recipe.apply(&mut session, &ids).unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.refused.len(), 2);
    assert!(report.refused[1].contains("Resolution can only be applied once."));
    assert_eq!(session.resolution_count(), 1);
}

#[test]
fn test_recipe_with_unknown_layer_fails() {
    let dir = fixtures::fixture_dir();
    let base = fixtures::write_test_png(dir.path(), "base", &RasterBuilder::new(8, 8).build());
    let (mut session, ids) = run::load_session(&[base], EditorConfig::default()).unwrap();
    let recipe = Recipe::from_json_str(r#"{ "layers": [{ "layer": 2 }] }"#).unwrap();
    assert!(recipe.apply(&mut session, &ids).is_err());
}

#[test]
fn test_missing_layer_file_has_context() {
    let dir = fixtures::fixture_dir();
    let err = run::load_session(&[dir.path().join("ghost.png")], EditorConfig::default())
        .unwrap_err();
    assert!(format!("{err:#}").contains("failed to load layer"));
}

#[test]
fn test_catalog_lists_every_effect() {
    let json = run::catalog_json().unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(entries.len(), EffectKind::all_builtin().len());
    assert!(entries.iter().any(|e| e["kind"] == "halftone"));
}

#[test]
fn test_recipe_resize_and_layer_crop_without_move() {
    let dir = fixtures::fixture_dir();
    let base = fixtures::write_test_png(
        dir.path(),
        "base",
        &RasterBuilder::new(60, 40).gradient().build(),
    );
    let top = fixtures::write_test_png(
        dir.path(),
        "top",
        &RasterBuilder::new(20, 10).fill([255, 0, 0, 255]).build(),
    );
    let (mut session, ids) = run::load_session(&[base, top], EditorConfig::default()).unwrap();
    let recipe = Recipe::from_json_str(
        r#"{
            "layers": [{ "layer": 1, "resize": { "width": 10 } }],
            "crop": { "layer": 1, "x": 20, "y": 15, "width": 5, "height": 5 }
        }"#,
    )
    .unwrap();
    let report = recipe.apply(&mut session, &ids).unwrap();
    assert_eq!(report.applied, 2);
    assert!(report.refused.is_empty());

    let layer = session.layer(ids[1]).unwrap();
    assert_eq!(layer.position(), (20, 15));
    assert_eq!(layer.natural_size(), (5, 5));

    let bytes = mesmerise_io::export::export_png_bytes(&mut session).unwrap();
    let flat = decode::decode_raster(&bytes).unwrap();
    assert_eq!(flat.pixel(22, 17), &[255, 0, 0, 255]);
    assert_ne!(flat.pixel(27, 17), &[255, 0, 0, 255]);
}
