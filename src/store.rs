//! Feature store: the authoritative cache of the active folder's features.
//!
//! The store holds features for exactly one folder at a time and keeps them in
//! enumeration order (load order, then creation order). Every mutation returns
//! a [`StoreChange`] that the views apply to the affected id only.

use std::collections::HashMap;

use crate::error::SyncError;
use crate::model::{Feature, FeatureId, FeaturePatch, FolderContext, Line, Marker, Point};

/// Change notification published after a store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Contents replaced wholesale (folder load or switch)
    Reset,
    /// A feature was inserted or changed
    Upserted(FeatureId),
    /// A feature was removed
    Removed(FeatureId),
}

/// In-memory cache of the active folder's markers and lines.
#[derive(Debug, Default)]
pub struct FeatureStore {
    /// Folder the contents belong to
    context: Option<FolderContext>,
    features: HashMap<FeatureId, Feature>,
    /// Ids in enumeration order
    order: Vec<FeatureId>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> Option<&FolderContext> {
        self.context.as_ref()
    }

    /// Drop all features and bind the store to a new folder.
    pub fn reset(&mut self, context: FolderContext) -> StoreChange {
        self.features.clear();
        self.order.clear();
        self.context = Some(context);
        StoreChange::Reset
    }

    /// Replace the contents with a freshly listed folder. Markers precede
    /// lines in enumeration order.
    pub fn replace(&mut self, markers: Vec<Marker>, lines: Vec<Line>) -> StoreChange {
        self.features.clear();
        self.order.clear();
        for feature in markers
            .into_iter()
            .map(Feature::from)
            .chain(lines.into_iter().map(Feature::from))
        {
            self.insert_quiet(feature);
        }
        log::debug!("Store replaced with {} features", self.order.len());
        StoreChange::Reset
    }

    fn insert_quiet(&mut self, feature: Feature) {
        let id = feature.id().clone();
        if self.features.insert(id.clone(), feature).is_none() {
            self.order.push(id);
        } else {
            log::warn!("Duplicate feature id {} replaced", id);
        }
    }

    /// Insert a feature, or replace the one with the same id in place.
    pub fn insert(&mut self, feature: Feature) -> StoreChange {
        let id = feature.id().clone();
        self.insert_quiet(feature);
        StoreChange::Upserted(id)
    }

    /// Compute the result of merging `patch` into a feature without storing it.
    pub fn merged(&self, id: &FeatureId, patch: &FeaturePatch) -> Result<Feature, SyncError> {
        let current = self
            .features
            .get(id)
            .ok_or_else(|| SyncError::UnknownFeature { id: id.clone() })?;
        patch.validate_for(current.kind())?;
        let mut merged = current.clone();
        merged.apply(patch);
        Ok(merged)
    }

    /// Merge `patch` into the stored feature.
    pub fn merge(&mut self, id: &FeatureId, patch: &FeaturePatch) -> Result<StoreChange, SyncError> {
        let merged = self.merged(id, patch)?;
        self.features.insert(id.clone(), merged);
        Ok(StoreChange::Upserted(id.clone()))
    }

    /// Remove a feature. Returns `None` if the id is unknown.
    pub fn remove(&mut self, id: &FeatureId) -> Option<(Feature, StoreChange)> {
        let feature = self.features.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some((feature, StoreChange::Removed(id.clone())))
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    /// All features in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.order.iter().filter_map(|id| self.features.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &FeatureId> {
        self.order.iter()
    }

    /// Endpoints of every stored line in enumeration order, start before end.
    pub fn line_endpoints(&self) -> impl Iterator<Item = Point> + '_ {
        self.iter().flat_map(|feature| match feature {
            Feature::Line(line) => vec![line.start, line.end],
            Feature::Marker(_) => Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
