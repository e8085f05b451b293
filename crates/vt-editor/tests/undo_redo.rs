//! Integration tests: undo/redo through the command log (vt-editor).
//!
//! Every command must satisfy `rollback(execute(s)) == s` by deep
//! structural equality, and `redo` after `undo` must reproduce the
//! executed state exactly.

use pretty_assertions::{assert_eq, assert_ne};
use vt_core::animation::{Interpolation, Keyframe, keys};
use vt_core::config::CoreConfig;
use vt_core::curve::Curve;
use vt_core::document::Document;
use vt_core::frames::ChildKeys;
use vt_core::id::ObjectId;
use vt_core::kurbo::Point;
use vt_core::layer::{Authority, Child, Layer};
use vt_core::model::Color;
use vt_core::shape::{Shape, SimplifyMode};
use vt_editor::actions::*;
use vt_editor::commands::CommandLog;
use vt_editor::registry::CommandKind;

fn id(s: &str) -> ObjectId {
    ObjectId::intern(s)
}

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn triangle(shape_id: &str, instance: &str) -> Shape {
    let mut s = Shape::with_ids(id(shape_id), id(instance));
    s.set_curves(vec![
        Curve::line(p(0.0, 0.0), p(40.0, 0.0), Color::BLACK),
        Curve::line(p(40.0, 0.0), p(20.0, 30.0), Color::BLACK),
        Curve::line(p(20.0, 30.0), p(0.0, 0.0), Color::BLACK),
    ]);
    s
}

/// One layer with a shape, an animated child and a small legacy track.
fn make_doc() -> Document {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut doc = Document::new();
    let mut layer = Layer::with_id(id("stage"), "stage");
    layer.add_shape(triangle("tri", "tri-0"), 0.0);
    layer.add_child(Child::new(id("hero")));
    layer.add_curve_keyframe("hero.x", Keyframe::linear(0.0, 0.0));
    layer.add_curve_keyframe("hero.x", Keyframe::linear(10.0, 100.0));
    layer
        .frames
        .set_keys(0, id("hero"), ChildKeys::from([("y".to_string(), 5.0)]));
    layer.frames.add_keyframe(2);
    layer.frames.add_keyframe(8);
    doc.add_layer(layer);
    doc
}

/// create → undo → redo, checking state equality at each step.
fn check<C: Command>(args: C::Args) -> Document {
    let mut doc = make_doc();
    let state0 = doc.clone();
    let mut log = CommandLog::new(100);

    log.create::<C>(&mut doc, args).unwrap();
    let state1 = doc.clone();

    assert_eq!(log.undo(&mut doc), Some(C::KIND));
    assert_eq!(doc, state0, "{:?} rollback", C::KIND);
    assert_eq!(log.redo(&mut doc), Some(C::KIND));
    assert_eq!(doc, state1, "{:?} redo", C::KIND);
    state1
}

// ─── Shapes ──────────────────────────────────────────────────────────────

#[test]
fn add_shape_round_trips() {
    let state1 = check::<AddShape>(AddShapeArgs {
        layer: id("stage"),
        shape: triangle("petal", "petal-0"),
        time: 3.0,
    });
    let layer = state1.layer(id("stage")).unwrap();
    assert_eq!(layer.shapes.len(), 2);
    assert_eq!(layer.animation.interpolate(&keys::z_order(id("petal")), 3.0), Some(1.0));
}

#[test]
fn add_variant_round_trips() {
    let mut variant = triangle("tri", "tri-1");
    variant.shape_index = 1;
    variant.translate(5.0, 0.0);
    check::<AddShape>(AddShapeArgs {
        layer: id("stage"),
        shape: variant,
        time: 6.0,
    });
}

#[test]
fn delete_shape_round_trips() {
    let state1 = check::<DeleteShape>(id("tri-0"));
    let layer = state1.layer(id("stage")).unwrap();
    assert!(layer.shapes.is_empty());
    assert!(layer.animation.curve(&keys::exists(id("tri"))).is_none());
}

#[test]
fn translate_round_trips() {
    let state1 = check::<TranslateShape>(TranslateShapeArgs {
        instance: id("tri-0"),
        dx: 0.1,
        dy: -0.3,
    });
    assert_eq!(state1.shape(id("tri-0")).unwrap().curves()[0].start, p(0.1, -0.3));
}

#[test]
fn edit_curve_round_trips() {
    check::<EditCurve>(EditCurveArgs {
        instance: id("tri-0"),
        index: 1,
        curve: Curve::new(p(40.0, 0.0), p(50.0, 10.0), p(30.0, 40.0), p(20.0, 30.0), Color::BLACK),
    });
}

#[test]
fn simplify_round_trips() {
    let mut doc = make_doc();
    let wobbly: Vec<Point> = (0..40)
        .map(|i| {
            let x = i as f64 * 3.0;
            p(x, (x / 7.0).sin() * 12.0)
        })
        .collect();
    let mut shape = Shape::with_ids(id("wobble"), id("wobble-0"));
    shape.from_points(&wobbly, 0.5).unwrap();
    doc.layer_mut(id("stage")).unwrap().add_shape(shape, 0.0);
    doc.reindex();

    for mode in [SimplifyMode::Corners, SimplifyMode::Smooth] {
        let state0 = doc.clone();
        let mut log = CommandLog::new(10);
        log.create::<SimplifyShape>(
            &mut doc,
            SimplifyShapeArgs {
                instance: id("wobble-0"),
                mode,
            },
        )
        .unwrap();
        let state1 = doc.clone();
        log.undo(&mut doc);
        assert_eq!(doc, state0, "{mode:?}");
        log.redo(&mut doc);
        assert_eq!(doc, state1, "{mode:?}");
        log.undo(&mut doc);
    }
}

#[test]
fn simplify_follows_document_config() {
    let outline = [p(0.0, 0.0), p(50.0, 2.0), p(100.0, 0.0), p(100.0, 50.0), p(0.0, 50.0)];
    let simplified_len = |corner_tolerance: f64| {
        let mut doc = Document::with_config(&CoreConfig {
            corner_tolerance,
            ..CoreConfig::default()
        });
        let mut shape = Shape::with_ids(id("bump"), id("bump-0"));
        shape.set_curves(
            (0..outline.len())
                .map(|i| Curve::line(outline[i], outline[(i + 1) % outline.len()], Color::BLACK))
                .collect(),
        );
        let mut layer = Layer::with_id(id("bumps"), "bumps");
        layer.add_shape(shape, 0.0);
        doc.add_layer(layer);
        let before = doc.clone();

        let mut log = CommandLog::new(10);
        log.create::<SimplifyShape>(
            &mut doc,
            SimplifyShapeArgs {
                instance: id("bump-0"),
                mode: SimplifyMode::Corners,
            },
        )
        .unwrap();
        let len = doc.shape(id("bump-0")).unwrap().curves().len();
        log.undo(&mut doc);
        assert_eq!(doc, before);
        len
    };
    assert_eq!(simplified_len(10.0), 4);
    assert_eq!(simplified_len(1.0), 5);
}

#[test]
fn duplicate_shape_round_trips() {
    let state1 = check::<DuplicateShape>(id("tri-0"));
    let layer = state1.layer(id("stage")).unwrap();
    assert_eq!(layer.shapes.len(), 2);
    let copy = &layer.shapes[1];
    assert_ne!(copy.shape_id, id("tri"));
    assert_eq!(layer.animation.interpolate(&keys::exists(copy.shape_id), 0.0), Some(1.0));
}

// ─── Keyframes ───────────────────────────────────────────────────────────

#[test]
fn add_keyframe_restores_authority() {
    let state1 = check::<AddKeyframe>(AddKeyframeArgs {
        layer: id("stage"),
        key: "hero.y".into(),
        keyframe: Keyframe::hold(4.0, 9.0),
    });
    assert_eq!(state1.layer(id("stage")).unwrap().authority("hero.y"), Authority::Curves);

    let mut doc = make_doc();
    let mut log = CommandLog::new(10);
    log.create::<AddKeyframe>(
        &mut doc,
        AddKeyframeArgs {
            layer: id("stage"),
            key: "hero.y".into(),
            keyframe: Keyframe::hold(4.0, 9.0),
        },
    )
    .unwrap();
    log.undo(&mut doc);
    let layer = doc.layer(id("stage")).unwrap();
    assert_eq!(layer.authority("hero.y"), Authority::Frames);
    assert_eq!(layer.child_transform(id("hero"), 4.0, doc.frame_duration()).unwrap().y, 5.0);
}

#[test]
fn remove_keyframe_round_trips() {
    let state1 = check::<RemoveKeyframe>(KeyframeRef {
        layer: id("stage"),
        key: "hero.x".into(),
        time: 0.0,
    });
    let curve = state1.layer(id("stage")).unwrap().animation.curve("hero.x").unwrap();
    assert_eq!(curve.len(), 1);
}

#[test]
fn set_interpolation_round_trips() {
    let state1 = check::<SetKeyframeInterpolation>(SetInterpolationArgs {
        at: KeyframeRef {
            layer: id("stage"),
            key: "hero.x".into(),
            time: 0.0,
        },
        mode: Interpolation::Hold,
    });
    let layer = state1.layer(id("stage")).unwrap();
    assert_eq!(layer.animation.interpolate("hero.x", 5.0), Some(0.0));
}

// ─── Legacy track ────────────────────────────────────────────────────────

fn at(index: usize) -> FrameRef {
    FrameRef {
        layer: id("stage"),
        index,
    }
}

#[test]
fn frame_edits_round_trip() {
    check::<AddFrameKeyframe>(at(5));
    check::<CreateMotionTween>(at(5));
    check::<CreateShapeTween>(at(5));
    check::<DeleteFrame>(at(8));
    check::<DeleteFrame>(at(2));
}

#[test]
fn motion_tween_then_delete_sequence() {
    let mut doc = make_doc();
    let state0 = doc.clone();
    let mut log = CommandLog::new(100);

    log.create::<CreateMotionTween>(&mut doc, at(4)).unwrap();
    log.create::<AddFrameKeyframe>(&mut doc, at(12)).unwrap();
    log.create::<DeleteFrame>(&mut doc, at(8)).unwrap();
    let state3 = doc.clone();

    let track = &doc.layer(id("stage")).unwrap().frames;
    for i in 3..=11 {
        assert_eq!(track.kind(i), Some(vt_core::frames::FrameKind::Motion), "cell {i}");
    }

    while log.can_undo() {
        log.undo(&mut doc);
    }
    assert_eq!(doc, state0);
    while log.can_redo() {
        log.redo(&mut doc);
    }
    assert_eq!(doc, state3);
}

// ─── Mixed history and missing references ────────────────────────────────

#[test]
fn mixed_history_unwinds_completely() {
    let mut doc = make_doc();
    let state0 = doc.clone();
    let mut log = CommandLog::new(100);

    log.create::<AddShape>(
        &mut doc,
        AddShapeArgs {
            layer: id("stage"),
            shape: triangle("leaf", "leaf-0"),
            time: 1.0,
        },
    )
    .unwrap();
    log.create::<TranslateShape>(
        &mut doc,
        TranslateShapeArgs {
            instance: id("leaf-0"),
            dx: 7.0,
            dy: 7.0,
        },
    )
    .unwrap();
    log.create::<DuplicateShape>(&mut doc, id("leaf-0")).unwrap();
    log.create::<DeleteShape>(&mut doc, id("tri-0")).unwrap();
    log.create::<AddKeyframe>(
        &mut doc,
        AddKeyframeArgs {
            layer: id("stage"),
            key: keys::child(id("hero"), "rotation"),
            keyframe: Keyframe::linear(2.0, 45.0),
        },
    )
    .unwrap();
    let end = doc.clone();
    assert_ne!(end, state0);

    let mut undone = Vec::new();
    while let Some(kind) = log.undo(&mut doc) {
        undone.push(kind);
    }
    assert_eq!(
        undone,
        vec![
            CommandKind::AddKeyframe,
            CommandKind::DeleteShape,
            CommandKind::DuplicateShape,
            CommandKind::TranslateShape,
            CommandKind::AddShape,
        ]
    );
    assert_eq!(doc, state0);

    while log.redo(&mut doc).is_some() {}
    assert_eq!(doc, end);
}

#[test]
fn missing_reference_is_a_no_op() {
    let mut doc = make_doc();
    let mut log = CommandLog::new(10);
    log.create::<TranslateShape>(
        &mut doc,
        TranslateShapeArgs {
            instance: id("tri-0"),
            dx: 1.0,
            dy: 1.0,
        },
    )
    .unwrap();

    // Remove the shape behind the log's back.
    doc.layer_mut(id("stage")).unwrap().remove_shape(id("tri-0"));
    doc.reindex();
    let orphaned = doc.clone();

    assert_eq!(log.undo(&mut doc), Some(CommandKind::TranslateShape));
    assert_eq!(doc, orphaned);
    assert!(log.can_redo());
    assert_eq!(log.redo(&mut doc), Some(CommandKind::TranslateShape));
    assert_eq!(doc, orphaned);
}

#[test]
fn history_records_serialize() {
    let mut doc = make_doc();
    let mut log = CommandLog::new(10);
    log.create::<RemoveKeyframe>(
        &mut doc,
        KeyframeRef {
            layer: id("stage"),
            key: "hero.x".into(),
            time: 10.0,
        },
    )
    .unwrap();
    let json = serde_json::to_string(log.history()).unwrap();
    assert!(json.contains("\"RemoveKeyframe\""));
    assert!(json.contains("hero.x"));
}
