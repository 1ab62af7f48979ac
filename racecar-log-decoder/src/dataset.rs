//! The decoded dataset
//!
//! One [`Dataset`] holds every flat channel and every channel group for a
//! single log. It is always fully shaped: a log that could not be found still
//! produces all channels, just empty.

use crate::channel::{Channel, ChannelGroup, ChannelId, GroupId};
use crate::types::Timestamp;

/// Where a decoded value is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Channel(ChannelId),
    Group(GroupId, usize),
}

/// One decoded value waiting to be appended
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub target: Target,
    pub value: f64,
}

impl Sample {
    pub fn channel(id: ChannelId, value: f64) -> Self {
        Self {
            target: Target::Channel(id),
            value,
        }
    }

    pub fn group(id: GroupId, index: usize, value: f64) -> Self {
        Self {
            target: Target::Group(id, index),
            value,
        }
    }
}

/// All channels decoded from one log
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    channels: Vec<Channel>,
    groups: Vec<ChannelGroup>,
}

impl Dataset {
    /// Create an empty, fully shaped dataset
    pub fn new() -> Self {
        Self {
            channels: vec![Channel::new(); ChannelId::COUNT],
            groups: GroupId::ALL.iter().map(|id| ChannelGroup::new(id.size())).collect(),
        }
    }

    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id.index()]
    }

    pub fn group(&self, id: GroupId) -> &ChannelGroup {
        &self.groups[id.index()]
    }

    /// Latest value of a flat channel
    pub fn last(&self, id: ChannelId) -> Option<f64> {
        self.channel(id).last()
    }

    /// Latest value of a group member
    pub fn group_last(&self, id: GroupId, index: usize) -> Option<f64> {
        self.group(id).last(index)
    }

    /// Append a sample at `timestamp`
    ///
    /// Returns false if the sample addressed a group member that does not exist.
    pub fn append(&mut self, timestamp: Timestamp, sample: Sample) -> bool {
        match sample.target {
            Target::Channel(id) => {
                self.channels[id.index()].push(timestamp, sample.value);
                true
            }
            Target::Group(id, index) => self.groups[id.index()].push(index, timestamp, sample.value),
        }
    }

    /// Total number of samples across every channel and group member
    pub fn total_samples(&self) -> usize {
        let flat: usize = self.channels.iter().map(Channel::len).sum();
        let grouped: usize = self
            .groups
            .iter()
            .flat_map(ChannelGroup::iter)
            .map(Channel::len)
            .sum();
        flat + grouped
    }

    /// True if no channel holds a sample
    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0
    }

    pub(crate) fn into_parts(self) -> (Vec<Channel>, Vec<ChannelGroup>) {
        (self.channels, self.groups)
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dataset_is_fully_shaped() {
        let dataset = Dataset::new();
        assert!(dataset.is_empty());
        for id in ChannelId::ALL {
            assert!(dataset.channel(*id).is_empty());
        }
        for id in GroupId::ALL {
            assert_eq!(dataset.group(*id).len(), id.size());
        }
    }

    #[test]
    fn test_append_routes_samples() {
        let mut dataset = Dataset::new();
        assert!(dataset.append(5, Sample::channel(ChannelId::Rpm, 600.0)));
        assert!(dataset.append(5, Sample::group(GroupId::BmsCell, 119, 3700.0)));
        assert!(!dataset.append(5, Sample::group(GroupId::BmsCell, 120, 3700.0)));

        assert_eq!(dataset.last(ChannelId::Rpm), Some(600.0));
        assert_eq!(dataset.group_last(GroupId::BmsCell, 119), Some(3700.0));
        assert_eq!(dataset.total_samples(), 2);
    }
}
