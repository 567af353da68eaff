//! Folder switching, reloads and interleaved responses.

use futures::future::join;
use pollster::block_on;

use super::{SlowGateway, folder, frame, gateway, line, marker, open_engine};
use crate::color_utils::Rgb;
use crate::engine::{EngineSettings, SyncEngine};
use crate::error::{SyncError, WarningKind};
use crate::gateway::GatewayOp;
use crate::model::{FeatureDraft, FeatureId, MarkerDraft, Point};
use crate::placement::PlacementMode;

fn slow_engine() -> SyncEngine<SlowGateway> {
    let inner = gateway();
    inner.seed_marker(&folder("garden"), marker("g1", 5.0, 5.0, "Well"));
    inner.seed_marker(&folder("orchard"), marker("o1", 7.0, 7.0, "Apple"));
    let engine = SyncEngine::new(SlowGateway(inner), EngineSettings::default());
    block_on(engine.refresh_icon_options()).unwrap();
    block_on(engine.switch_folder(folder("garden"), frame())).unwrap();
    engine
}

#[test]
fn test_switch_leaves_nothing_behind() {
    let gateway = gateway();
    gateway.seed_marker(&folder("garden"), marker("g1", 5.0, 5.0, "Well"));
    gateway.seed_line(&folder("garden"), line("g2", (0.0, 0.0), (9.0, 9.0), "Fence"));
    gateway.seed_marker(&folder("orchard"), marker("o1", 7.0, 7.0, "Apple"));
    let engine = open_engine(gateway, EngineSettings::default());

    engine.select(&FeatureId::new("g1")).unwrap();
    engine.set_mode(PlacementMode::Line);
    engine.click(Point::new(100.0, 100.0)).unwrap();
    engine.request_delete(&FeatureId::new("g2")).unwrap();

    block_on(engine.switch_folder(folder("orchard"), frame())).unwrap();

    assert_eq!(engine.active_folder().unwrap().name, folder("orchard"));
    assert_eq!(engine.store().ids().cloned().collect::<Vec<_>>(), vec![FeatureId::new("o1")]);
    assert_eq!(engine.canvas().ids().cloned().collect::<Vec<_>>(), vec![FeatureId::new("o1")]);
    assert_eq!(engine.table().len(), 1);
    assert!(engine.is_consistent());
    assert!(engine.selection().selected().is_none());
    assert!(engine.placement().state().is_idle());
    assert!(engine.canvas().preview().is_none());
    assert!(engine.pending_delete().is_none());
}

#[test]
fn test_switch_back_reloads_from_backend() {
    let gateway = gateway();
    gateway.seed_marker(&folder("garden"), marker("g1", 5.0, 5.0, "Well"));
    let engine = open_engine(gateway, EngineSettings::default());

    block_on(engine.switch_folder(folder("orchard"), frame())).unwrap();
    assert!(engine.store().is_empty());
    block_on(engine.switch_folder(folder("garden"), frame())).unwrap();
    assert!(engine.store().contains(&FeatureId::new("g1")));
    assert_eq!(engine.gateway().call_count(GatewayOp::ListMarkers), 3);
}

#[test]
fn test_failed_reload_keeps_contents() {
    let gateway = gateway();
    gateway.seed_marker(&folder("garden"), marker("g1", 5.0, 5.0, "Well"));
    let engine = open_engine(gateway, EngineSettings::default());

    engine.gateway().fail_next(GatewayOp::ListLines);
    let result = block_on(engine.load());
    assert!(matches!(result, Err(SyncError::Network(_))));

    assert!(engine.store().contains(&FeatureId::new("g1")));
    assert!(engine.table().contains(&FeatureId::new("g1")));
    assert!(engine.is_consistent());
    let warnings = engine.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::Network);
}

#[test]
fn test_failed_switch_leaves_new_folder_empty() {
    let gateway = gateway();
    gateway.seed_marker(&folder("garden"), marker("g1", 5.0, 5.0, "Well"));
    gateway.seed_marker(&folder("orchard"), marker("o1", 7.0, 7.0, "Apple"));
    let engine = open_engine(gateway, EngineSettings::default());

    engine.gateway().fail_next(GatewayOp::ListMarkers);
    let result = block_on(engine.switch_folder(folder("orchard"), frame()));
    assert!(result.is_err());

    assert_eq!(engine.active_folder().unwrap().name, folder("orchard"));
    assert!(engine.store().is_empty());
    assert!(engine.canvas().is_empty());
    assert!(engine.table().is_empty());

    block_on(engine.load()).unwrap();
    assert!(engine.store().contains(&FeatureId::new("o1")));
}

#[test]
fn test_create_response_after_switch_is_discarded() {
    let engine = slow_engine();
    let draft = FeatureDraft::Marker(MarkerDraft {
        position: Point::new(30.0, 30.0),
        icon_type: "pin.svg".to_string(),
        icon_color: Rgb::RED,
        info: "Late".to_string(),
        notes: String::new(),
    });

    let (created, switched) = block_on(join(
        engine.add(draft),
        engine.switch_folder(folder("orchard"), frame()),
    ));

    assert!(matches!(created, Err(SyncError::StaleFolder { .. })));
    switched.unwrap();
    assert_eq!(engine.store().ids().cloned().collect::<Vec<_>>(), vec![FeatureId::new("o1")]);
    assert!(engine.is_consistent());
    assert!(engine.take_warnings().is_empty());
}

#[test]
fn test_stale_load_is_discarded() {
    let engine = slow_engine();

    let (garden, orchard) = block_on(join(
        engine.switch_folder(folder("garden"), frame()),
        engine.switch_folder(folder("orchard"), frame()),
    ));

    assert!(matches!(garden, Err(SyncError::StaleFolder { .. })));
    orchard.unwrap();
    assert_eq!(engine.active_folder().unwrap().name, folder("orchard"));
    assert_eq!(engine.store().ids().cloned().collect::<Vec<_>>(), vec![FeatureId::new("o1")]);
    assert!(engine.is_consistent());
}

#[test]
fn test_update_response_after_switch_is_discarded() {
    let engine = slow_engine();
    let patch = crate::model::FeaturePatch::new().info("Dry well");

    let (updated, switched) = block_on(join(
        engine.update(&FeatureId::new("g1"), patch),
        engine.switch_folder(folder("orchard"), frame()),
    ));

    assert!(matches!(updated, Err(SyncError::StaleFolder { .. })));
    switched.unwrap();
    assert!(!engine.store().contains(&FeatureId::new("g1")));
    assert!(engine.is_consistent());
}

#[test]
fn test_list_folders() {
    let engine = SyncEngine::with_defaults(gateway());
    let folders = block_on(engine.list_folders()).unwrap();
    assert_eq!(folders, vec![folder("garden"), folder("orchard")]);
    assert!(engine.active_folder().is_none());
}

#[test]
fn test_list_folders_failure_is_reported() {
    let engine = SyncEngine::with_defaults(gateway());
    engine.gateway().fail_next(GatewayOp::ListFolders);
    assert!(block_on(engine.list_folders()).is_err());
    assert_eq!(engine.take_warnings()[0].kind, WarningKind::Network);
}
