use mesmerise_core::effects::{
    BlendMode, EffectInstance, EffectKind, EffectValue, HalftoneMode, HalftoneParams,
    HalftoneShape, HalftoneSize, Rgb,
};
use mesmerise_core::pipeline::{EffectContext, EffectRegistry, run_effect_pipeline};
use mesmerise_test_harness::assertions::{assert_channels_in_range, assert_rasters_differ};
use mesmerise_test_harness::builders::RasterBuilder;

fn ctx() -> EffectContext {
    EffectContext::new(99)
}

fn run(effects: &[EffectInstance]) -> mesmerise_core::raster::Raster {
    let input = RasterBuilder::new(24, 16).fill([0, 0, 0, 180]).gradient().build();
    run_effect_pipeline(input, effects, &EffectRegistry::with_builtins(), &ctx()).raster
}

fn effect(kind: EffectKind, value: EffectValue) -> EffectInstance {
    EffectInstance::with_value(kind, value).unwrap()
}

#[test]
fn test_zero_valued_tone_effects_are_identity() {
    let input = RasterBuilder::new(24, 16).gradient().build();
    let effects = vec![
        effect(EffectKind::Brightness, EffectValue::Scalar(0.0)),
        effect(EffectKind::Contrast, EffectValue::Scalar(0.0)),
        effect(EffectKind::Saturation, EffectValue::Scalar(0.0)),
    ];
    let out = run_effect_pipeline(
        input.clone(),
        &effects,
        &EffectRegistry::with_builtins(),
        &ctx(),
    );
    assert_eq!(out.raster, input);
}

#[test]
fn test_zero_valued_tone_effects_forced_through_kernels_are_identity() {
    // bypass the identity short-circuit to check the math itself
    let input = RasterBuilder::new(24, 16).gradient().build();
    let mut out = input.clone();
    mesmerise_core::kernels::brightness(&mut out, 0.0);
    mesmerise_core::kernels::contrast(&mut out, 0.0);
    mesmerise_core::kernels::saturation(&mut out, 0.0);
    assert_eq!(out, input);
}

#[test]
fn test_sepia_then_tint_differs_from_tint_then_sepia() {
    let sepia = effect(EffectKind::Sepia, EffectValue::Scalar(100.0));
    let tint = effect(
        EffectKind::Tint,
        EffectValue::Tint {
            color: Rgb::new(255, 0, 0),
            mix: 100.0,
        },
    );
    let a = run(&[sepia.clone(), tint.clone()]);
    let b = run(&[tint, sepia]);
    assert_rasters_differ(&a, &b);
}

#[test]
fn test_every_effect_at_extremes_stays_in_range_and_keeps_alpha() {
    let mut values: Vec<(EffectKind, EffectValue)> = Vec::new();
    for kind in EffectKind::all_builtin() {
        match kind.domain() {
            mesmerise_core::effects::ValueDomain::Slider(d) => {
                values.push((kind, EffectValue::Scalar(d.min)));
                values.push((kind, EffectValue::Scalar(d.max)));
            }
            mesmerise_core::effects::ValueDomain::Custom(v) => values.push((kind, v)),
        }
    }
    values.push((
        EffectKind::Duotone,
        EffectValue::Duotone {
            color_a: Rgb::new(255, 255, 255),
            color_b: Rgb::new(0, 0, 0),
            mix: 100.0,
            mode: BlendMode::Overlay,
        },
    ));
    for shape in [
        HalftoneShape::Circle,
        HalftoneShape::Square,
        HalftoneShape::Triangle,
        HalftoneShape::Line,
    ] {
        values.push((
            EffectKind::Halftone,
            EffectValue::Halftone(HalftoneParams {
                shape,
                size: HalftoneSize::Small,
                mode: HalftoneMode::Color,
            }),
        ));
    }

    for (kind, value) in values {
        let out = run(&[effect(kind, value.clone())]);
        assert_channels_in_range(&out, 0, 255);
        assert!(
            out.data.chunks_exact(4).all(|px| px[3] == 180),
            "{kind:?} {value:?} changed alpha"
        );
        assert_eq!((out.width, out.height), (24, 16));
    }
}

#[test]
fn test_stacked_extremes_stay_in_range() {
    let effects = vec![
        effect(EffectKind::Brightness, EffectValue::Scalar(100.0)),
        effect(EffectKind::Contrast, EffectValue::Scalar(100.0)),
        effect(EffectKind::Saturation, EffectValue::Scalar(100.0)),
        effect(EffectKind::Sharpen, EffectValue::Scalar(200.0)),
        effect(EffectKind::Grain, EffectValue::Scalar(100.0)),
        effect(EffectKind::Vignette, EffectValue::Scalar(100.0)),
    ];
    let out = run(&effects);
    assert_channels_in_range(&out, 0, 255);
}

#[test]
fn test_duotone_modes_blend_identically() {
    let make = |mode| {
        effect(
            EffectKind::Duotone,
            EffectValue::Duotone {
                color_a: Rgb::new(11, 61, 145),
                color_b: Rgb::new(255, 209, 102),
                mix: 70.0,
                mode,
            },
        )
    };
    assert_eq!(run(&[make(BlendMode::Replace)]), run(&[make(BlendMode::Overlay)]));
}

#[test]
fn test_halftone_sizes_change_output() {
    let make = |size| {
        effect(
            EffectKind::Halftone,
            EffectValue::Halftone(HalftoneParams {
                size,
                ..HalftoneParams::default()
            }),
        )
    };
    assert_rasters_differ(
        &run(&[make(HalftoneSize::Small)]),
        &run(&[make(HalftoneSize::Large)]),
    );
}

#[test]
fn test_effect_values_deserialize_from_json() {
    let tint: EffectValue = serde_json::from_str(r##"{ "color": "#0f0", "mix": 45 }"##).unwrap();
    assert_eq!(
        tint,
        EffectValue::Tint {
            color: Rgb::new(0, 255, 0),
            mix: 45.0
        }
    );
    let scalar: EffectValue = serde_json::from_str("12.5").unwrap();
    assert_eq!(scalar, EffectValue::Scalar(12.5));
    let halftone: EffectValue = serde_json::from_str(r#"{ "shape": "line" }"#).unwrap();
    assert_eq!(
        halftone,
        EffectValue::Halftone(HalftoneParams {
            shape: HalftoneShape::Line,
            ..HalftoneParams::default()
        })
    );
}
