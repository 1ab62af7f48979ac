//! Materialized, read-only view of a decoded dataset
//!
//! Once a pass finishes, each channel is frozen into a [`Series`] backed by
//! boxed slices. Nothing can be appended afterwards, and the result can be
//! shared freely between threads.

use crate::channel::{Channel, ChannelId, GroupId};
use crate::dataset::Dataset;
use crate::types::Timestamp;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::ops::Range;

/// A frozen time series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    timestamps: Box<[Timestamp]>,
    values: Box<[f64]>,
}

impl Series {
    fn from_channel(channel: Channel) -> Self {
        let (timestamps, values) = channel.into_parts();
        Self {
            timestamps: timestamps.into_boxed_slice(),
            values: values.into_boxed_slice(),
        }
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sample at `index`
    pub fn get(&self, index: usize) -> Option<(Timestamp, f64)> {
        Some((*self.timestamps.get(index)?, *self.values.get(index)?))
    }

    pub fn last(&self) -> Option<(Timestamp, f64)> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// Timestamps and values for an index range, clamped to the series
    pub fn slice(&self, range: Range<usize>) -> (&[Timestamp], &[f64]) {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        (&self.timestamps[start..end], &self.values[start..end])
    }

    /// Index range of samples with `start <= timestamp < end`
    ///
    /// Assumes timestamps are non-decreasing, as they are for a log in order.
    pub fn window(&self, start: Timestamp, end: Timestamp) -> Range<usize> {
        let first = self.timestamps.partition_point(|ts| *ts < start);
        let last = self.timestamps.partition_point(|ts| *ts < end).max(first);
        first..last
    }

    /// Smallest and largest value, ignoring NaN
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Series", 2)?;
        state.serialize_field("ts", &self.timestamps)?;
        state.serialize_field("val", &self.values)?;
        state.end()
    }
}

/// Every channel of a finished decode pass
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedDataset {
    channels: Vec<Series>,
    groups: Vec<Vec<Series>>,
}

impl MaterializedDataset {
    pub fn channel(&self, id: ChannelId) -> &Series {
        &self.channels[id.index()]
    }

    /// All members of a group
    pub fn group(&self, id: GroupId) -> &[Series] {
        &self.groups[id.index()]
    }

    pub fn group_member(&self, id: GroupId, index: usize) -> Option<&Series> {
        self.group(id).get(index)
    }

    /// Look up a flat channel by name
    pub fn by_name(&self, name: &str) -> Option<&Series> {
        ChannelId::from_name(name).map(|id| self.channel(id))
    }

    /// Flat channels paired with their IDs, in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &Series)> {
        ChannelId::ALL.iter().copied().zip(self.channels.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(Series::is_empty)
            && self.groups.iter().flatten().all(Series::is_empty)
    }
}

impl Serialize for MaterializedDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len() + self.groups.len()))?;
        for (id, series) in self.iter() {
            map.serialize_entry(id.name(), series)?;
        }
        for (id, members) in GroupId::ALL.iter().zip(self.groups.iter()) {
            map.serialize_entry(id.name(), members)?;
        }
        map.end()
    }
}

impl Dataset {
    /// Freeze the dataset into its read-only form
    pub fn materialize(self) -> MaterializedDataset {
        let (channels, groups) = self.into_parts();
        MaterializedDataset {
            channels: channels.into_iter().map(Series::from_channel).collect(),
            groups: groups
                .into_iter()
                .map(|group| group.into_channels().into_iter().map(Series::from_channel).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Sample;

    fn sample_dataset() -> MaterializedDataset {
        let mut dataset = Dataset::new();
        for (ts, value) in [(0, 1.0), (100, 3.0), (200, -2.0), (300, 5.0)] {
            dataset.append(ts, Sample::channel(ChannelId::Speed, value));
        }
        dataset.append(50, Sample::group(GroupId::NtcCell, 7, 21.5));
        dataset.materialize()
    }

    #[test]
    fn test_materialize_preserves_shape() {
        let empty = Dataset::new().materialize();
        assert!(empty.is_empty());
        assert_eq!(empty.group(GroupId::BmsCell).len(), 120);
        assert_eq!(empty.group(GroupId::NtcSegment).len(), 10);

        let data = sample_dataset();
        assert!(!data.is_empty());
        assert_eq!(data.channel(ChannelId::Speed).len(), 4);
        assert_eq!(data.group_member(GroupId::NtcCell, 7).unwrap().last(), Some((50, 21.5)));
        assert!(data.group_member(GroupId::NtcCell, 50).is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let data = sample_dataset();
        assert_eq!(data.by_name("Speed").map(Series::len), Some(4));
        assert!(data.by_name("speed").is_none());
    }

    #[test]
    fn test_series_queries() {
        let data = sample_dataset();
        let speed = data.channel(ChannelId::Speed);

        assert_eq!(speed.get(1), Some((100, 3.0)));
        assert_eq!(speed.get(9), None);
        assert_eq!(speed.min_max(), Some((-2.0, 5.0)));

        let (ts, values) = speed.slice(1..10);
        assert_eq!(ts, &[100, 200, 300]);
        assert_eq!(values, &[3.0, -2.0, 5.0]);

        assert_eq!(speed.window(100, 300), 1..3);
        assert_eq!(speed.window(1000, 2000), 4..4);
        assert_eq!(speed.window(300, 100), 3..3);
        assert_eq!(Series::default().min_max(), None);
    }

    #[test]
    fn test_serialize_shape() {
        let data = sample_dataset();
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["Speed"]["ts"], serde_json::json!([0, 100, 200, 300]));
        assert_eq!(json["NTC Cell"].as_array().unwrap().len(), 50);
        assert_eq!(json["NTC Cell"][7]["val"], serde_json::json!([21.5]));
    }

    #[test]
    fn test_materialized_dataset_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MaterializedDataset>();
    }
}
