use std::time::{Duration, Instant};

use mesmerise_core::effects::{EffectKind, EffectValue, Rgb};
use mesmerise_core::geometry::{Handle, Point};
use mesmerise_core::layer::SourceImage;
use mesmerise_core::raster::Raster;
use mesmerise_core::session::{Command, EditorSession, Rejection};
use mesmerise_test_harness::assertions::{assert_layer_geometry, assert_rasters_differ};
use mesmerise_test_harness::builders::{RasterBuilder, SessionBuilder};

#[test]
fn test_resolution_count_never_exceeds_one() {
    let (mut session, ids) = SessionBuilder::new()
        .layer(40, 40)
        .layer(10, 10)
        .layer(10, 10)
        .layer(10, 10)
        .build();

    let mut accepted = 0;
    for &id in ids.iter().chain(ids.iter()) {
        let outcome = session
            .execute(Command::AddEffect {
                layer_id: id,
                kind: EffectKind::Resolution,
                value: Some(EffectValue::Scalar(50.0)),
            })
            .unwrap();
        if outcome.is_applied() {
            accepted += 1;
        }
        assert!(session.resolution_count() <= 1);
    }
    assert_eq!(accepted, 1);
}

#[test]
fn test_resolution_allowed_again_after_removal() {
    let (mut session, ids) = SessionBuilder::new().layer(40, 40).layer(10, 10).build();
    let add = Command::AddEffect {
        layer_id: ids[1],
        kind: EffectKind::Resolution,
        value: None,
    };
    let effect_id = session.execute(add.clone()).unwrap().created().unwrap();
    assert_eq!(
        session.execute(add.clone()).unwrap().rejection(),
        Some(Rejection::ResolutionAlreadyApplied)
    );
    session.execute(Command::RemoveEffect(effect_id)).unwrap();
    assert!(session.execute(add).unwrap().is_applied());
}

#[test]
fn test_base_layer_is_immutable_through_layer_flows() {
    let (mut session, ids) = SessionBuilder::new()
        .layer(60, 40)
        .effect(EffectKind::Sepia, Some(EffectValue::Scalar(40.0)))
        .layer(10, 10)
        .build();
    let base_id = ids[0];
    let before = session.layer(base_id).unwrap().clone();

    let outcomes = [
        session
            .execute(Command::MoveLayer {
                layer_id: base_id,
                x: 5,
                y: 5,
            })
            .unwrap(),
        session
            .execute(Command::ResizeLayer {
                layer_id: base_id,
                width: Some(10),
                height: None,
            })
            .unwrap(),
        session
            .execute(Command::AddEffect {
                layer_id: base_id,
                kind: EffectKind::Resolution,
                value: None,
            })
            .unwrap(),
        session.start_resize_session(Some(base_id)).unwrap(),
    ];
    for outcome in outcomes {
        assert_eq!(outcome.rejection(), Some(Rejection::BaseLayerLocked));
    }

    session.execute(Command::SelectLayer(base_id)).unwrap();
    assert_eq!(
        session
            .begin_handle_resize(Handle::SouthEast, Point::new(60.0, 40.0))
            .unwrap()
            .rejection(),
        Some(Rejection::BaseLayerLocked)
    );

    // a press on a spot only the base covers starts no drag
    session.pointer_down(Point::new(1.0, 1.0)).unwrap();
    session.pointer_move(Point::new(30.0, 30.0)).unwrap();
    session.pointer_up().unwrap();

    let after = session.layer(base_id).unwrap();
    assert_layer_geometry(after, before.position(), before.natural_size());
    assert_eq!(after.effects(), before.effects());
}

#[test]
fn test_cache_reflects_new_effect_value() {
    let (mut session, ids) = SessionBuilder::new()
        .raster_layer(Raster::filled(8, 8, [100, 100, 100, 255]))
        .build();
    let effect_id = session
        .execute(Command::AddEffect {
            layer_id: ids[0],
            kind: EffectKind::Invert,
            value: Some(EffectValue::Scalar(100.0)),
        })
        .unwrap()
        .created()
        .unwrap();
    session.render();
    assert_eq!(session.surface().pixel(3, 3), &[155, 155, 155, 255]);

    session
        .execute(Command::UpdateEffect {
            effect_id,
            value: EffectValue::Scalar(0.0),
        })
        .unwrap();
    let stats = session.render();
    assert_eq!(stats.rebuilt, 1);
    assert_eq!(session.surface().pixel(3, 3), &[100, 100, 100, 255]);
}

#[test]
fn test_removing_effect_restores_pixels() {
    let (mut session, ids) = SessionBuilder::new().layer(12, 12).build();
    let plain = session.surface().clone();
    let effect_id = session
        .execute(Command::AddEffect {
            layer_id: ids[0],
            kind: EffectKind::Tint,
            value: Some(EffectValue::Tint {
                color: Rgb::new(0, 0, 255),
                mix: 90.0,
            }),
        })
        .unwrap()
        .created()
        .unwrap();
    session.render();
    assert_rasters_differ(&plain, session.surface());

    session.execute(Command::RemoveEffect(effect_id)).unwrap();
    session.render();
    assert_eq!(session.surface(), &plain);
}

#[test]
fn test_tainted_layer_renders_unprocessed() {
    let source = Raster::filled(6, 6, [20, 40, 60, 255]);
    let (mut session, ids) = SessionBuilder::new()
        .raster_layer(source.clone())
        .tainted()
        .effect(EffectKind::Invert, Some(EffectValue::Scalar(100.0)))
        .build();
    let stats = session.render();
    assert_eq!(stats.skipped, 0);
    assert_eq!(session.surface(), &source);
    assert_eq!(session.layer(ids[0]).unwrap().effects().len(), 1);
}

#[test]
fn test_scheduler_coalesces_slider_burst() {
    let (mut session, ids) = SessionBuilder::new().layer(8, 8).build();
    let effect_id = session
        .execute(Command::AddEffect {
            layer_id: ids[0],
            kind: EffectKind::Brightness,
            value: None,
        })
        .unwrap()
        .created()
        .unwrap();
    let t0 = Instant::now();
    assert!(session.tick(t0).is_some(), "add effect requests a frame");

    for step in 0..5u64 {
        session
            .execute_at(
                Command::UpdateEffect {
                    effect_id,
                    value: EffectValue::Scalar(step as f64 * 10.0),
                },
                t0 + Duration::from_millis(step * 5),
            )
            .unwrap();
        assert!(session.tick(t0 + Duration::from_millis(step * 5 + 1)).is_none());
    }
    let last_change = t0 + Duration::from_millis(20);
    assert!(session.tick(last_change + Duration::from_millis(15)).is_none());
    assert!(session.tick(last_change + Duration::from_millis(16)).is_some());
    assert!(session.scheduler().is_idle());
}

#[test]
fn test_remove_base_promotes_next_layer() {
    let (mut session, ids) = SessionBuilder::new().layer(50, 50).layer(20, 10).build();
    session.execute(Command::RemoveLayer(ids[0])).unwrap();
    session.render();
    assert_eq!(session.canvas_size(), Some((20, 10)));
    assert_eq!(session.base().map(|l| l.id()), Some(ids[1]));
}

#[test]
fn test_add_layer_rejects_empty_source() {
    let mut session = EditorSession::new();
    let err = session
        .execute(Command::AddLayer {
            name: "empty".into(),
            source: SourceImage::new(RasterBuilder::new(0, 4).build()),
        })
        .unwrap_err();
    assert!(err.to_string().contains("no pixels"));
    assert!(session.layers().is_empty());
}

#[test]
fn test_wrong_value_shape_is_error() {
    let (mut session, ids) = SessionBuilder::new().layer(4, 4).build();
    let err = session.execute(Command::AddEffect {
        layer_id: ids[0],
        kind: EffectKind::Sepia,
        value: Some(EffectValue::Tint {
            color: Rgb::new(1, 2, 3),
            mix: 10.0,
        }),
    });
    assert!(err.is_err());
    assert!(session.layer(ids[0]).unwrap().effects().is_empty());
}
