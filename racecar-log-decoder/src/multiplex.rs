//! Multiplex resolver for the battery management messages
//!
//! The cell monitoring units share a handful of message IDs. Each frame
//! carries a module ID and three 16-bit readings; which cells or sensors the
//! readings belong to follows from the position of the message ID in a fixed
//! table and the embedded module ID.
//!
//! Payload layout:
//!
//! | byte | 0 | 1 | 2-3 | 4-5 | 6-7 |
//! |------|---|---|-----|-----|-----|
//! | field | module id | reserved | value 1 (LE) | value 2 (LE) | value 3 (LE) |

use crate::channel::{GroupId, NUM_CELLS_PER_CMU, NUM_CMU_MODULES, NUM_NTC_PER_CMU};
use crate::codec::Field;
use crate::types::CodecError;
use std::ops::Range;

/// Cell voltage messages, in slot order
pub const BMS_CELL_VOLTAGE_IDS: [&str; 6] = [
    "0x12905301",
    "0x12905381",
    "0x12905401",
    "0x12905481",
    "0x12905501",
    "0x12905581",
];

/// NTC temperature messages, in slot order
pub const BMS_TEMPERATURE_IDS: [&str; 2] = ["0x12905601", "0x12905681"];

/// Readings carried by every multiplexed frame
pub const VALUES_PER_FRAME: usize = 3;

const KELVIN_OFFSET: f64 = 273.15;

/// The two multiplexed message families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    CellVoltage,
    Temperature,
}

impl Family {
    /// Members of the family each module reports
    pub fn per_module(self) -> usize {
        match self {
            Family::CellVoltage => NUM_CELLS_PER_CMU,
            Family::Temperature => NUM_NTC_PER_CMU,
        }
    }

    /// Group the per-member readings are written to
    pub fn member_group(self) -> GroupId {
        match self {
            Family::CellVoltage => GroupId::BmsCell,
            Family::Temperature => GroupId::NtcCell,
        }
    }

    /// Group receiving the per-module aggregate
    pub fn module_group(self) -> GroupId {
        match self {
            Family::CellVoltage => GroupId::BmsSegment,
            Family::Temperature => GroupId::NtcSegment,
        }
    }

    /// Member indices belonging to `module_id`
    pub fn module_members(self, module_id: usize) -> Range<usize> {
        let per_module = self.per_module();
        module_id * per_module..(module_id + 1) * per_module
    }

    /// Resolve the member index for reading `value_index` of a frame
    ///
    /// Returns `None` when the module does not exist or the slot falls past
    /// the module's last member.
    pub fn member_index(self, msg_index: usize, module_id: usize, value_index: usize) -> Option<usize> {
        if module_id >= NUM_CMU_MODULES || value_index >= VALUES_PER_FRAME {
            return None;
        }
        let slot = msg_index * VALUES_PER_FRAME + value_index;
        if slot >= self.per_module() {
            return None;
        }
        Some(module_id * self.per_module() + slot)
    }
}

/// Find the family and message index for an arbitration ID
pub fn resolve(id: &str) -> Option<(Family, usize)> {
    if let Some(index) = BMS_CELL_VOLTAGE_IDS.iter().position(|candidate| *candidate == id) {
        return Some((Family::CellVoltage, index));
    }
    BMS_TEMPERATURE_IDS
        .iter()
        .position(|candidate| *candidate == id)
        .map(|index| (Family::Temperature, index))
}

/// Decoded contents of a multiplexed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedReadings {
    pub module_id: usize,
    pub values: [u16; VALUES_PER_FRAME],
}

const MODULE_ID: Field = Field::u8(0);
const VALUE_FIELDS: [Field; VALUES_PER_FRAME] = [Field::le_u16(2), Field::le_u16(4), Field::le_u16(6)];

/// Decode the module ID and the three packed readings
pub fn parse_packed(payload: &str) -> Result<PackedReadings, CodecError> {
    let module_id = MODULE_ID.read(payload)? as usize;
    let mut values = [0u16; VALUES_PER_FRAME];
    for (value, field) in values.iter_mut().zip(VALUE_FIELDS.iter()) {
        *value = field.read(payload)? as u16;
    }
    Ok(PackedReadings { module_id, values })
}

/// Convert a reading in tenths of a kelvin to degrees Celsius
///
/// A raw reading of zero marks a sensor with no data and yields `None`.
pub fn deci_kelvin_to_celsius(raw: u16) -> Option<f64> {
    if raw == 0 {
        return None;
    }
    Some(raw as f64 / 10.0 - KELVIN_OFFSET)
}
