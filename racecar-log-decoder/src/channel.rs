//! Channel store primitives
//!
//! A [`Channel`] is one physical signal's time series. Its timestamp and value
//! sequences are private and only grow together through [`Channel::push`], so
//! they can never become ragged.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Append-only time series of one signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    timestamps: Vec<Timestamp>,
    values: Vec<f64>,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample
    pub fn push(&mut self, timestamp: Timestamp, value: f64) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    /// Most recent value, or `None` if the channel has no samples
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume the channel into its two sequences
    pub(crate) fn into_parts(self) -> (Vec<Timestamp>, Vec<f64>) {
        (self.timestamps, self.values)
    }
}

/// Fixed-size collection of channels for a physically repeated sensor
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    channels: Vec<Channel>,
}

impl ChannelGroup {
    /// Create a group of `size` empty channels
    pub fn new(size: usize) -> Self {
        Self {
            channels: vec![Channel::new(); size],
        }
    }

    /// Append to member `index`
    ///
    /// Returns false (and writes nothing) when the index is outside the group.
    pub fn push(&mut self, index: usize, timestamp: Timestamp, value: f64) -> bool {
        match self.channels.get_mut(index) {
            Some(channel) => {
                channel.push(timestamp, value);
                true
            }
            None => {
                log::warn!(
                    "Rejected write to member {} of a {}-member group",
                    index,
                    self.channels.len()
                );
                false
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Latest value of member `index`
    pub fn last(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(Channel::last)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    pub(crate) fn into_channels(self) -> Vec<Channel> {
        self.channels
    }
}

/// Category used to group related channels for browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Voltage,
    Current,
    Power,
    Torque,
    Pedal,
    Motor,
    Gyro,
    Motion,
    Suspension,
    Bms,
    Ntc,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Voltage => "Voltage",
            Category::Current => "Current",
            Category::Power => "Power",
            Category::Torque => "Torque",
            Category::Pedal => "Pedal",
            Category::Motor => "Motor",
            Category::Gyro => "Gyro",
            Category::Motion => "Motion",
            Category::Suspension => "Suspension",
            Category::Bms => "BMS",
            Category::Ntc => "NTC",
        };
        write!(f, "{}", name)
    }
}

macro_rules! channel_ids {
    ($($variant:ident => ($name:literal, $unit:literal, $category:ident)),+ $(,)?) => {
        /// Every flat channel produced by the decoder
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ChannelId {
            $($variant),+
        }

        impl ChannelId {
            /// All channel IDs in catalog order
            pub const ALL: &'static [ChannelId] = &[$(ChannelId::$variant),+];

            /// Stable channel name
            pub fn name(self) -> &'static str {
                match self {
                    $(ChannelId::$variant => $name),+
                }
            }

            /// Physical unit of the decoded values (empty for raw counts)
            pub fn unit(self) -> &'static str {
                match self {
                    $(ChannelId::$variant => $unit),+
                }
            }

            pub fn category(self) -> Category {
                match self {
                    $(ChannelId::$variant => Category::$category),+
                }
            }
        }
    };
}

channel_ids! {
    DcVoltage => ("DC Voltage", "V", Voltage),
    OutputVoltage => ("Output Voltage", "V", Voltage),
    DcCurrent => ("DC Current", "A", Current),
    PhaseACurrent => ("A Current", "A", Current),
    PhaseBCurrent => ("B Current", "A", Current),
    PhaseCCurrent => ("C Current", "A", Current),
    CalculatedCurrent => ("Calculated Current", "A", Current),
    DcPower => ("DC Power", "kW", Power),
    DcCumulativeEnergy => ("DC Cumulative Energy", "Wh", Power),
    DcDischargeEnergy => ("DC Discharge Cumulative Energy", "Wh", Power),
    DcRegenerationEnergy => ("DC Regeneration Cumulative Energy", "Wh", Power),
    FeedbackTorque => ("Feedback Torque", "Nm", Torque),
    CommandTorque => ("Command Torque", "Nm", Torque),
    VcuCommandTorque => ("VCU Command Torque", "Nm", Torque),
    VcuCommandDirection => ("VCU Command Direction", "", Torque),
    Apps1 => ("APPS1", "mV", Pedal),
    Apps2 => ("APPS2", "mV", Pedal),
    Bse => ("BSE", "mV", Pedal),
    Rpm => ("RPM", "rpm", Motor),
    MotorTemperature => ("Motor Temperature", "°C", Motor),
    GateDriverTemperature => ("Gate Driver Temperature", "°C", Motor),
    ModuleATemperature => ("Module A Temperature", "°C", Motor),
    ModuleBTemperature => ("Module B Temperature", "°C", Motor),
    ModuleCTemperature => ("Module C Temperature", "°C", Motor),
    ControlBoardTemperature => ("Control Board Temperature", "°C", Motor),
    DeltaResolver => ("Delta Resolver", "", Motor),
    GyroAccX => ("Gyro Acc x", "m/s²", Gyro),
    GyroAccY => ("Gyro Acc y", "m/s²", Gyro),
    GyroAccZ => ("Gyro Acc z", "m/s²", Gyro),
    GyroAngX => ("Gyro Ang x", "°/s", Gyro),
    GyroAngY => ("Gyro Ang y", "°/s", Gyro),
    GyroAngZ => ("Gyro Ang z", "°/s", Gyro),
    Speed => ("Speed", "km/h", Motion),
    Distance => ("Distance", "m", Motion),
    SteeringAngle => ("Steering Angle", "°", Motion),
    SteeringSpeed => ("Steering Speed", "°/s", Motion),
    FrontLeftLinear => ("Front Left Linear", "mm", Suspension),
    FrontRightLinear => ("Front Right Linear", "mm", Suspension),
    RearLeftLinear => ("Rear Left Linear", "mm", Suspension),
    RearRightLinear => ("Rear Right Linear", "mm", Suspension),
    FrontLeftWheelSpeed => ("Front Left Wheel Speed", "rps", Suspension),
    FrontRightWheelSpeed => ("Front Right Wheel Speed", "rps", Suspension),
    RearLeftWheelSpeed => ("Rear Left Wheel Speed", "rps", Suspension),
    RearRightWheelSpeed => ("Rear Right Wheel Speed", "rps", Suspension),
    BmsPack => ("BMS Pack", "V", Bms),
}

impl ChannelId {
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this channel in [`ChannelId::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a channel by its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Battery modules (cell monitoring units) on the car
pub const NUM_CMU_MODULES: usize = 10;
/// Cells measured by each module
pub const NUM_CELLS_PER_CMU: usize = 12;
/// NTC thermistors read by each module
pub const NUM_NTC_PER_CMU: usize = 5;

/// Every indexed channel group produced by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupId {
    /// Per-cell voltages in raw millivolts
    BmsCell,
    /// Per-module voltage totals
    BmsSegment,
    /// Per-sensor NTC temperatures
    NtcCell,
    /// Per-module NTC averages
    NtcSegment,
}

impl GroupId {
    pub const ALL: &'static [GroupId] = &[
        GroupId::BmsCell,
        GroupId::BmsSegment,
        GroupId::NtcCell,
        GroupId::NtcSegment,
    ];

    /// Number of member channels
    pub fn size(self) -> usize {
        match self {
            GroupId::BmsCell => NUM_CMU_MODULES * NUM_CELLS_PER_CMU,
            GroupId::BmsSegment => NUM_CMU_MODULES,
            GroupId::NtcCell => NUM_CMU_MODULES * NUM_NTC_PER_CMU,
            GroupId::NtcSegment => NUM_CMU_MODULES,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GroupId::BmsCell => "BMS Cell",
            GroupId::BmsSegment => "BMS Segment",
            GroupId::NtcCell => "NTC Cell",
            GroupId::NtcSegment => "NTC Segment",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            GroupId::BmsCell => "mV",
            GroupId::BmsSegment => "V",
            GroupId::NtcCell | GroupId::NtcSegment => "°C",
        }
    }

    pub fn category(self) -> Category {
        match self {
            GroupId::BmsCell | GroupId::BmsSegment => Category::Bms,
            GroupId::NtcCell | GroupId::NtcSegment => Category::Ntc,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_push_keeps_sequences_aligned() {
        let mut channel = Channel::new();
        assert!(channel.is_empty());
        assert_eq!(channel.last(), None);

        channel.push(0, 1.5);
        channel.push(10, 2.5);
        assert_eq!(channel.len(), 2);
        assert_eq!(channel.timestamps().len(), channel.values().len());
        assert_eq!(channel.last(), Some(2.5));
        assert_eq!(channel.timestamps(), &[0, 10]);
    }

    #[test]
    fn test_group_rejects_out_of_range() {
        let mut group = ChannelGroup::new(3);
        assert!(group.push(2, 5, 1.0));
        assert!(!group.push(3, 5, 1.0));
        assert_eq!(group.last(2), Some(1.0));
        assert_eq!(group.last(0), None);
        assert_eq!(group.iter().map(Channel::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_channel_catalog() {
        assert_eq!(ChannelId::COUNT, 45);
        for (position, id) in ChannelId::ALL.iter().enumerate() {
            assert_eq!(id.index(), position);
            assert_eq!(ChannelId::from_name(id.name()), Some(*id));
        }
        assert_eq!(ChannelId::DcVoltage.unit(), "V");
        assert_eq!(ChannelId::Distance.category(), Category::Motion);
        assert_eq!(ChannelId::from_name("dc voltage"), None);
    }

    #[test]
    fn test_group_catalog() {
        assert_eq!(GroupId::BmsCell.size(), 120);
        assert_eq!(GroupId::BmsSegment.size(), 10);
        assert_eq!(GroupId::NtcCell.size(), 50);
        assert_eq!(GroupId::NtcSegment.size(), 10);
        assert_eq!(GroupId::from_name("NTC Cell"), Some(GroupId::NtcCell));
        assert_eq!(format!("{}", GroupId::BmsSegment), "BMS Segment");
        assert_eq!(format!("{}", Category::Bms), "BMS");
    }
}
