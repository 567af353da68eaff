//! Data models for the annotation engine.

mod feature;
mod folder;

pub use feature::{
    Feature, FeatureDraft, FeatureId, FeatureKind, FeaturePatch, Line, LineDraft, Marker,
    MarkerDraft, Point,
};
pub use folder::{FolderContext, FolderName};
