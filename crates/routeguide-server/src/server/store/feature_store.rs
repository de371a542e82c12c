use routeguide_core::{
    Error, Result,
    proto::{Feature, Point, Rectangle},
};
use serde::Deserialize;

/// Dataset compiled into the binary.
const ROUTE_GUIDE_DB: &str = include_str!("../../../data/route_guide_db.json");

#[derive(Debug, Deserialize)]
struct FeatureRecord {
    name: String,
    location: LocationRecord,
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    latitude: i32,
    longitude: i32,
}

impl From<FeatureRecord> for Feature {
    fn from(record: FeatureRecord) -> Self {
        Self {
            name: record.name,
            location: Some(Point::new(
                record.location.latitude,
                record.location.longitude,
            )),
        }
    }
}

/// Ordered, read-only collection of named locations.
///
/// Built once before the server starts and never mutated afterwards, so it is
/// shared between handlers behind a plain `Arc` with no synchronization.
/// Lookups are linear scans; the dataset is small.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    features: Vec<Feature>,
}

impl FeatureStore {
    /// Parses a JSON array of `{"name", "location": {"latitude",
    /// "longitude"}}` records, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataLoad`] if `data` is not a valid dataset.
    pub fn load(data: &str) -> Result<Self> {
        let records: Vec<FeatureRecord> =
            serde_json::from_str(data).map_err(|e| Error::DataLoad {
                reason: e.to_string(),
            })?;

        Ok(Self {
            features: records.into_iter().map(Feature::from).collect(),
        })
    }

    /// Loads the dataset embedded in the binary.
    pub fn embedded() -> Result<Self> {
        Self::load(ROUTE_GUIDE_DB)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Returns the first feature stored at exactly `point`, or the absence
    /// sentinel (empty name) when there is none.
    pub fn get_at(&self, point: &Point) -> Feature {
        self.features
            .iter()
            .find(|feature| feature.location.as_ref() == Some(point))
            .cloned()
            .unwrap_or_else(|| Feature::not_found(Point::new(point.latitude, point.longitude)))
    }

    /// Yields, in store order, every feature inside `rect` (inclusive on both
    /// axes, corners normalized). Call again to restart.
    pub fn list_within<'a>(
        &'a self,
        rect: &Rectangle,
    ) -> impl Iterator<Item = &'a Feature> + use<'a> {
        let bounds = rect.bounds();
        self.features.iter().filter(move |feature| {
            feature
                .location
                .as_ref()
                .is_some_and(|location| bounds.contains(location))
        })
    }
}
