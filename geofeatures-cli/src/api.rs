//! Wire representations exchanged with callers.
//!
//! Feature payloads follow GeoJSON: single features serialize with
//! `"type": "Feature"` and pages with `"type": "FeatureCollection"`.

use clap::Args;
use geo::{Rect, coord};
use geofeatures_core::{Collection, ErrorKind, Feature, Geometry, Properties};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Collection metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Unique collection name.
    pub name: String,
    /// Human-readable title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
}

impl CollectionInfo {
    /// Reject empty fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("title", &self.title),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }
        Ok(())
    }
}

impl From<Collection> for CollectionInfo {
    fn from(collection: Collection) -> Self {
        Self {
            name: collection.name,
            title: collection.title,
            description: collection.description,
        }
    }
}

impl From<CollectionInfo> for Collection {
    fn from(info: CollectionInfo) -> Self {
        Self::new(info.name, info.title, info.description)
    }
}

/// Every collection in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionList {
    /// Collections ordered by name.
    pub collections: Vec<CollectionInfo>,
}

/// A stored feature as a GeoJSON `Feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct FeatureInfo {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// Feature geometry.
    pub geometry: Geometry,
    /// Feature properties.
    pub properties: Properties,
}

impl From<Feature> for FeatureInfo {
    fn from(feature: Feature) -> Self {
        Self {
            id: feature.id,
            geometry: feature.geometry,
            properties: feature.properties,
        }
    }
}

/// One page of features as a GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureList {
    /// Features in ascending id order.
    pub features: Vec<FeatureInfo>,
    /// Whether another page follows the last feature.
    pub more: bool,
}

impl FeatureList {
    /// Wrap a page of stored features.
    pub fn new(features: Vec<Feature>, more: bool) -> Self {
        Self {
            features: features.into_iter().map(FeatureInfo::from).collect(),
            more,
        }
    }
}

/// A feature submitted without an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeatureInfo {
    /// Feature geometry.
    pub geometry: Geometry,
    /// Feature properties.
    pub properties: Properties,
}

impl NewFeatureInfo {
    /// Build an uninserted feature for `collection`.
    pub fn into_feature(self, collection: &str) -> Feature {
        Feature::new(collection, self.geometry, self.properties)
    }
}

/// A batch of features submitted as a GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeatureList {
    /// GeoJSON discriminator; must be present.
    #[serde(rename = "type")]
    pub kind: String,
    /// Features to add.
    pub features: Vec<NewFeatureInfo>,
}

impl NewFeatureList {
    /// Reject a batch without a type discriminator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.kind.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "type" });
        }
        Ok(())
    }
}

/// Paging options for listing features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args, Serialize, Deserialize)]
pub struct FeatureListQuery {
    /// Page size; 0 selects the default of 500.
    #[arg(long, default_value_t = 0)]
    #[serde(default)]
    pub count: u64,
    /// Return features whose id sorts after this one.
    #[arg(long, value_name = "uuid")]
    #[serde(default)]
    pub after: Option<String>,
    /// Keep features intersecting `minx,miny,maxx,maxy`.
    #[arg(long, value_name = "minx,miny,maxx,maxy", allow_hyphen_values = true)]
    #[serde(default)]
    pub bbox: Option<String>,
}

impl FeatureListQuery {
    /// Parse the `after` cursor, if any.
    pub fn after_id(&self) -> Result<Option<Uuid>, ValidationError> {
        self.after
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| Uuid::parse_str(raw).map_err(|_| ValidationError::UnparsableAfter))
            .transpose()
    }

    /// Parse the bounding box, if any.
    pub fn bbox_rect(&self) -> Result<Option<Rect<f64>>, ValidationError> {
        self.bbox.as_deref().map(parse_bbox).transpose()
    }
}

/// Parse `minx,miny,maxx,maxy` into a rectangle.
pub fn parse_bbox(raw: &str) -> Result<Rect<f64>, ValidationError> {
    let invalid = |reason: &'static str| ValidationError::InvalidBbox {
        value: raw.to_owned(),
        reason,
    };
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("expected four numbers"))?;
    let &[min_x, min_y, max_x, max_y] = values.as_slice() else {
        return Err(invalid("expected four numbers"));
    };
    if values.iter().any(|value| !value.is_finite()) {
        return Err(invalid("bounds must be finite"));
    }
    if min_x > max_x || min_y > max_y {
        return Err(invalid("minimum exceeds maximum"));
    }
    Ok(Rect::new(
        coord! { x: min_x, y: min_y },
        coord! { x: max_x, y: max_y },
    ))
}

/// Request data rejected before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("'{field}' is required")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },
    /// The `after` cursor was not a UUID.
    #[error("cannot parse 'after' as a UUID")]
    UnparsableAfter,
    /// The `after` cursor named no stored feature.
    #[error("bad 'after' id")]
    UnknownAfter,
    /// A feature identifier was not a UUID.
    #[error("cannot parse '{value}' as a feature id")]
    InvalidId {
        /// The rejected input.
        value: String,
    },
    /// The bounding box could not be parsed.
    #[error("invalid bbox '{value}': {reason}")]
    InvalidBbox {
        /// The rejected input.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// HTTP status for a store error kind.
pub fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::NotFound => 404,
        ErrorKind::Conflict => 409,
        ErrorKind::InvalidInput => 400,
        ErrorKind::Storage => 500,
    }
}
