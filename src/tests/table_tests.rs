use pollster::block_on;

use super::{folder, gateway, line, marker, open_engine};
use crate::canvas::CanvasObject;
use crate::engine::EngineSettings;
use crate::model::{FeatureId, FeatureKind, Point};
use crate::placement::MarkerForm;
use crate::table::{Column, SortDirection, SortMode};

fn engine_with(settings: EngineSettings) -> crate::engine::SyncEngine<crate::gateway::MemoryGateway> {
    let gateway = gateway();
    gateway.seed_marker(&folder("garden"), marker("m1", 5.0, 5.0, "bravo"));
    gateway.seed_marker(&folder("garden"), marker("m2", 60.0, 5.0, "Alpha well"));
    gateway.seed_line(&folder("garden"), line("l1", (0.0, 90.0), (90.0, 90.0), "charlie fence"));
    open_engine(gateway, settings)
}

fn descriptions(engine: &crate::engine::SyncEngine<crate::gateway::MemoryGateway>) -> Vec<String> {
    engine
        .table()
        .visible_rows()
        .map(|r| r.description.clone())
        .collect()
}

#[test]
fn test_rows_follow_load_order() {
    let engine = engine_with(EngineSettings::default());
    assert_eq!(descriptions(&engine), ["bravo", "Alpha well", "charlie fence"]);
}

#[test]
fn test_sorting_twice_reverses() {
    let engine = engine_with(EngineSettings::default());

    assert_eq!(engine.sort_by(Column::Description), SortDirection::Ascending);
    assert_eq!(descriptions(&engine), ["Alpha well", "bravo", "charlie fence"]);

    assert_eq!(engine.sort_by(Column::Description), SortDirection::Descending);
    assert_eq!(descriptions(&engine), ["charlie fence", "bravo", "Alpha well"]);
}

#[test]
fn test_shared_toggle_spans_columns() {
    let engine = engine_with(EngineSettings::default());
    assert_eq!(engine.sort_by(Column::Description), SortDirection::Ascending);
    assert_eq!(engine.sort_by(Column::Id), SortDirection::Descending);
    let ids: Vec<String> = engine.table().rows().iter().map(|r| r.short_id.clone()).collect();
    assert_eq!(ids, ["m2", "m1", "l1"]);
}

#[test]
fn test_per_column_sort_mode() {
    let engine = engine_with(EngineSettings::default().with_sort_mode(SortMode::PerColumn));
    assert_eq!(engine.sort_by(Column::Description), SortDirection::Ascending);
    assert_eq!(engine.sort_by(Column::Id), SortDirection::Ascending);
    assert_eq!(engine.sort_by(Column::Description), SortDirection::Descending);
}

#[test]
fn test_filter_matches_description_only() {
    let engine = engine_with(EngineSettings::default());

    engine.set_filter("WELL");
    assert_eq!(descriptions(&engine), ["Alpha well"]);

    // Ids and types are not searched
    engine.set_filter("m1");
    assert!(descriptions(&engine).is_empty());
    engine.set_filter("pin");
    assert!(descriptions(&engine).is_empty());

    engine.set_filter("");
    assert_eq!(descriptions(&engine).len(), 3);
}

#[test]
fn test_new_rows_append_after_sort() {
    let engine = engine_with(EngineSettings::default());
    engine.sort_by(Column::Description);

    engine.click(Point::new(300.0, 300.0)).unwrap();
    let mut form = MarkerForm::new(engine.icon_options());
    form.info = "aardvark".to_string();
    block_on(engine.submit_marker_form(&form)).unwrap();

    assert_eq!(
        descriptions(&engine),
        ["Alpha well", "bravo", "charlie fence", "aardvark"]
    );
}

#[test]
fn test_visibility_toggles_restore_objects() {
    let engine = engine_with(EngineSettings::default());
    let visible = |engine: &crate::engine::SyncEngine<crate::gateway::MemoryGateway>| {
        let mut ids: Vec<FeatureId> = engine
            .canvas()
            .visible_objects()
            .map(|o: &CanvasObject| o.id.clone())
            .collect();
        ids.sort();
        ids
    };
    let before = visible(&engine);
    assert_eq!(before.len(), 3);

    assert!(!engine.toggle_markers());
    let lines_only = visible(&engine);
    assert_eq!(lines_only, vec![FeatureId::new("l1")]);
    assert_eq!(
        engine.canvas().object(&FeatureId::new("l1")).unwrap().kind(),
        FeatureKind::Line
    );

    assert!(!engine.toggle_lines());
    assert!(visible(&engine).is_empty());
    // Hidden objects are still tracked
    assert_eq!(engine.canvas().len(), 3);
    assert_eq!(engine.table().len(), 3);

    assert!(engine.toggle_markers());
    assert!(engine.toggle_lines());
    assert_eq!(visible(&engine), before);
}

#[test]
fn test_hidden_objects_are_not_hit() {
    let engine = engine_with(EngineSettings::default());
    engine.toggle_markers();
    assert_eq!(engine.select_at(Point::new(5.0, 5.0)), None);
    assert_eq!(engine.select_at(Point::new(45.0, 91.0)), Some(FeatureId::new("l1")));
}
