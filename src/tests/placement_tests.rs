use pollster::block_on;

use super::{folder, gateway, line, open_engine};
use crate::engine::EngineSettings;
use crate::error::SyncError;
use crate::gateway::GatewayOp;
use crate::model::Point;
use crate::placement::{ClickOutcome, LineForm, PlacementMode, PlacementState, SnapPolicy, Snapper};

#[test]
fn test_line_snaps_onto_existing_endpoint() {
    let gateway = gateway();
    gateway.seed_line(&folder("garden"), line("l1", (10.0, 10.0), (50.0, 50.0), "Fence"));
    let engine = open_engine(gateway, EngineSettings::default());
    assert!(engine.set_mode(PlacementMode::Line));

    let outcome = engine.click(Point::new(50.4, 50.9)).unwrap();
    assert_eq!(
        outcome,
        ClickOutcome::LineAnchored {
            anchor: Point::new(50.0, 50.0)
        }
    );

    assert!(engine.cursor_moved(Point::new(120.0, 80.0)));
    {
        let canvas = engine.canvas();
        let preview = canvas.preview().unwrap();
        assert_eq!(preview.start, Point::new(50.0, 50.0));
        assert_eq!(preview.end, Point::new(120.0, 80.0));
    }

    let ClickOutcome::LineFormOpened { start, end, mut form } =
        engine.click(Point::new(200.0, 100.0)).unwrap()
    else {
        panic!("Expected line form");
    };
    assert_eq!(start, Point::new(50.0, 50.0));
    assert_eq!(end, Point::new(200.0, 100.0));

    form.info = "Path".to_string();
    let id = block_on(engine.submit_line_form(&form)).unwrap();

    let stored = engine.gateway().stored_line(&folder("garden"), &id).unwrap();
    assert_eq!(stored.start, Point::new(50.0, 50.0));
    assert_eq!(stored.end, Point::new(200.0, 100.0));
    assert!(engine.canvas().preview().is_none());
    assert!(engine.placement().state().is_idle());
    assert_eq!(engine.table().row(&id).unwrap().type_label, "line");
}

#[test]
fn test_snap_tolerance_is_strict() {
    let gateway = gateway();
    gateway.seed_line(&folder("garden"), line("l1", (10.0, 10.0), (50.0, 50.0), "Fence"));
    let engine = open_engine(gateway, EngineSettings::default());
    engine.set_mode(PlacementMode::Line);

    let outcome = engine.click(Point::new(51.5, 50.0)).unwrap();
    assert_eq!(
        outcome,
        ClickOutcome::LineAnchored {
            anchor: Point::new(51.5, 50.0)
        }
    );
}

#[test]
fn test_degenerate_line_is_rejected() {
    let gateway = gateway();
    gateway.seed_line(&folder("garden"), line("l1", (10.0, 10.0), (50.0, 50.0), "Fence"));
    let engine = open_engine(gateway, EngineSettings::default());
    engine.set_mode(PlacementMode::Line);

    engine.click(Point::new(50.2, 50.2)).unwrap();
    // Snaps back onto the anchor
    let result = engine.click(Point::new(49.5, 50.5));
    assert!(matches!(result, Err(SyncError::Validation { .. })));
    assert!(matches!(
        engine.placement().state(),
        PlacementState::LineAnchored { .. }
    ));
    assert_eq!(engine.gateway().call_count(GatewayOp::CreateLine), 0);
    assert_eq!(engine.store().len(), 1);
}

#[test]
fn test_cancelled_line_persists_nothing() {
    let engine = open_engine(gateway(), EngineSettings::default());
    engine.set_mode(PlacementMode::Line);

    engine.click(Point::new(10.0, 10.0)).unwrap();
    engine.click(Point::new(90.0, 10.0)).unwrap();
    assert!(engine.canvas().preview().is_some());

    assert!(engine.cancel_placement());
    assert!(engine.canvas().preview().is_none());
    assert!(engine.store().is_empty());
    assert!(engine.gateway().calls().iter().all(|op| *op != GatewayOp::CreateLine));
    assert!(!engine.cancel_placement());
}

#[test]
fn test_mode_switch_ignored_mid_line() {
    let engine = open_engine(gateway(), EngineSettings::default());
    assert!(engine.toggle_mode());
    assert_eq!(engine.placement().mode(), PlacementMode::Line);

    engine.click(Point::new(10.0, 10.0)).unwrap();
    assert!(!engine.toggle_mode());
    assert!(!engine.set_mode(PlacementMode::Marker));
    assert_eq!(engine.placement().mode(), PlacementMode::Line);

    engine.cancel_placement();
    assert!(engine.set_mode(PlacementMode::Marker));
}

#[test]
fn test_click_ignored_while_line_form_open() {
    let engine = open_engine(gateway(), EngineSettings::default());
    engine.set_mode(PlacementMode::Line);
    engine.click(Point::new(10.0, 10.0)).unwrap();
    engine.click(Point::new(20.0, 10.0)).unwrap();

    assert_eq!(engine.click(Point::new(300.0, 300.0)).unwrap(), ClickOutcome::Ignored);
    assert_eq!(
        engine.placement().state(),
        PlacementState::LineFormPending {
            start: Point::new(10.0, 10.0),
            end: Point::new(20.0, 10.0)
        }
    );
}

#[test]
fn test_line_form_submits_once() {
    let engine = open_engine(gateway(), EngineSettings::default());
    engine.set_mode(PlacementMode::Line);
    engine.click(Point::new(10.0, 10.0)).unwrap();
    engine.click(Point::new(20.0, 10.0)).unwrap();

    let id = block_on(engine.submit_line_form(&LineForm::default())).unwrap();
    let again = block_on(engine.submit_line_form(&LineForm::default()));
    assert!(matches!(again, Err(SyncError::Validation { .. })));
    assert_eq!(engine.store().len(), 1);
    assert!(engine.store().contains(&id));
}

#[test]
fn test_nearest_policy_prefers_closest_endpoint() {
    let gateway = gateway();
    gateway.seed_line(&folder("garden"), line("l1", (10.0, 10.0), (100.0, 100.0), "A"));
    gateway.seed_line(&folder("garden"), line("l2", (10.8, 10.0), (300.0, 10.0), "B"));
    let click = Point::new(10.6, 10.0);

    let first = open_engine(gateway, EngineSettings::default());
    first.set_mode(PlacementMode::Line);
    assert_eq!(
        first.click(click).unwrap(),
        ClickOutcome::LineAnchored {
            anchor: Point::new(10.0, 10.0)
        }
    );

    let gateway = super::gateway();
    gateway.seed_line(&folder("garden"), line("l1", (10.0, 10.0), (100.0, 100.0), "A"));
    gateway.seed_line(&folder("garden"), line("l2", (10.8, 10.0), (300.0, 10.0), "B"));
    let settings =
        EngineSettings::default().with_snapper(Snapper::new(1.5, SnapPolicy::Nearest));
    let nearest = open_engine(gateway, settings);
    nearest.set_mode(PlacementMode::Line);
    assert_eq!(
        nearest.click(click).unwrap(),
        ClickOutcome::LineAnchored {
            anchor: Point::new(10.8, 10.0)
        }
    );
}

#[test]
fn test_click_requires_active_folder() {
    let engine = crate::engine::SyncEngine::with_defaults(gateway());
    assert_eq!(engine.click(Point::new(1.0, 1.0)), Err(SyncError::NoActiveFolder));
}

#[test]
fn test_rejected_end_point_resets_preview() {
    let engine = open_engine(gateway(), EngineSettings::default());
    engine.set_mode(PlacementMode::Line);

    engine.click(Point::new(10.0, 10.0)).unwrap();
    engine.cursor_moved(Point::new(30.0, 30.0));
    let result = engine.click(Point::new(10.0, 10.0));
    assert!(matches!(result, Err(SyncError::Validation { .. })));

    assert_eq!(
        engine.placement().state(),
        PlacementState::LineAnchored {
            anchor: Point::new(10.0, 10.0),
            cursor: Point::new(10.0, 10.0)
        }
    );
    let canvas = engine.canvas();
    let preview = canvas.preview().unwrap();
    assert_eq!(preview.start, Point::new(10.0, 10.0));
    assert_eq!(preview.end, Point::new(10.0, 10.0));
}

#[test]
fn test_click_outside_image_is_rejected() {
    let engine = open_engine(gateway(), EngineSettings::default());

    let result = engine.click(Point::new(900.0, 100.0));
    assert!(matches!(result, Err(SyncError::Validation { .. })));
    assert!(engine.placement().state().is_idle());

    engine.set_mode(PlacementMode::Line);
    engine.click(Point::new(10.0, 10.0)).unwrap();
    assert!(engine.click(Point::new(10.0, -4.0)).is_err());
    assert!(matches!(
        engine.placement().state(),
        PlacementState::LineAnchored { .. }
    ));
    // The right and bottom edges are still on the image
    assert!(engine.click(Point::new(800.0, 600.0)).is_ok());
}
