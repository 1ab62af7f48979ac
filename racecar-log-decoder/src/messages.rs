//! Message dispatch and derivation rules
//!
//! Every arbitration ID the car emits maps to one [`MessageKind`]. Decoding a
//! frame is a pure function of the payload and the [`Prior`] view of earlier
//! frames; it returns the samples to append plus the next [`CarryState`].
//! Nothing is written until every field of the frame has decoded, so a
//! malformed payload never leaves a frame half-applied.

use crate::channel::{ChannelId, GroupId};
use crate::codec::Field;
use crate::dataset::{Dataset, Sample};
use crate::multiplex::{self, Family};
use crate::state::{CarryState, Integral};
use crate::types::{CodecError, RawFrame};
use std::f64::consts::PI;

/// Wheel radius used for the speed estimate (m)
const WHEEL_RADIUS_M: f64 = 0.52;
/// Motor revolutions per wheel revolution
const GEAR_RATIO: f64 = 3.0;
/// Torque × rpm / 9550 = power in kW
const TORQUE_POWER_CONSTANT: f64 = 9550.0;

/// Every message the decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// 0x0A0: inverter power module and gate driver temperatures
    InverterTemperatures,
    /// 0x0A1
    ControlBoardTemperature,
    /// 0x0A2
    MotorTemperature,
    /// 0x0A5: motor speed and resolver angle, drives speed/distance
    MotorPosition,
    /// 0x0A6: phase and DC currents, drives power/energy
    Currents,
    /// 0x0A7
    Voltages,
    /// 0x0C0: torque request from the vehicle control unit
    VcuCommand,
    /// 0x0AC
    Torques,
    /// 0x000075A1
    Apps1,
    /// 0x000075A2
    Apps2,
    /// 0x000075B0
    Bse,
    /// 0x4EC
    GyroAngular,
    /// 0x4ED
    GyroAcceleration,
    /// 0x2B0
    Steering,
    /// 0x200
    FrontTravel,
    /// 0x300
    RearTravel,
    /// 0x710
    FrontWheelSpeed,
    /// 0x702
    RearWheelSpeed,
    /// One of the six cell voltage IDs
    CellVoltage { msg_index: usize },
    /// One of the two NTC temperature IDs
    Temperature { msg_index: usize },
}

impl MessageKind {
    /// Resolve an arbitration ID token (case-sensitive)
    pub fn from_id(id: &str) -> Option<Self> {
        let kind = match id {
            "0x0A0" => MessageKind::InverterTemperatures,
            "0x0A1" => MessageKind::ControlBoardTemperature,
            "0x0A2" => MessageKind::MotorTemperature,
            "0x0A5" => MessageKind::MotorPosition,
            "0x0A6" => MessageKind::Currents,
            "0x0A7" => MessageKind::Voltages,
            "0x0C0" => MessageKind::VcuCommand,
            "0x0AC" => MessageKind::Torques,
            "0x000075A1" => MessageKind::Apps1,
            "0x000075A2" => MessageKind::Apps2,
            "0x000075B0" => MessageKind::Bse,
            "0x4EC" => MessageKind::GyroAngular,
            "0x4ED" => MessageKind::GyroAcceleration,
            "0x2B0" => MessageKind::Steering,
            "0x200" => MessageKind::FrontTravel,
            "0x300" => MessageKind::RearTravel,
            "0x710" => MessageKind::FrontWheelSpeed,
            "0x702" => MessageKind::RearWheelSpeed,
            _ => {
                return multiplex::resolve(id).map(|(family, msg_index)| match family {
                    Family::CellVoltage => MessageKind::CellVoltage { msg_index },
                    Family::Temperature => MessageKind::Temperature { msg_index },
                })
            }
        };
        Some(kind)
    }

    /// Decode a frame of this kind
    ///
    /// # Returns
    /// * `Ok(Outcome::Update)` with the samples and next carry-state
    /// * `Ok(Outcome::Debounced)` if a rate limiter dropped the frame
    /// * `Err(CodecError)` if a field could not be read; nothing is applied
    pub fn decode(self, frame: &RawFrame, prior: &Prior<'_>) -> Result<Outcome, CodecError> {
        let payload = frame.payload.as_str();
        let carry = *prior.carry;

        let update = match self {
            MessageKind::InverterTemperatures => FrameUpdate::new(
                vec![
                    Sample::channel(ChannelId::ModuleATemperature, scaled(Field::le_i16(0), payload, 10.0)?),
                    Sample::channel(ChannelId::ModuleBTemperature, scaled(Field::le_i16(2), payload, 10.0)?),
                    Sample::channel(ChannelId::ModuleCTemperature, scaled(Field::le_i16(4), payload, 10.0)?),
                    Sample::channel(ChannelId::GateDriverTemperature, scaled(Field::le_i16(6), payload, 10.0)?),
                ],
                carry,
            ),
            MessageKind::ControlBoardTemperature => FrameUpdate::new(
                vec![Sample::channel(
                    ChannelId::ControlBoardTemperature,
                    scaled(Field::le_i16(0), payload, 10.0)?,
                )],
                carry,
            ),
            MessageKind::MotorTemperature => FrameUpdate::new(
                vec![Sample::channel(
                    ChannelId::MotorTemperature,
                    scaled(Field::le_i16(4), payload, 10.0)?,
                )],
                carry,
            ),
            MessageKind::MotorPosition => motor_position(frame, carry)?,
            MessageKind::Currents => currents(frame, carry)?,
            MessageKind::Voltages => {
                let dc_voltage = scaled(Field::le_u16(0), payload, 10.0)?;
                let output_voltage = scaled(Field::le_u16(2), payload, 10.0)?;
                FrameUpdate::new(
                    vec![
                        Sample::channel(ChannelId::DcVoltage, dc_voltage),
                        Sample::channel(ChannelId::OutputVoltage, output_voltage),
                    ],
                    CarryState {
                        dc_voltage: Some(dc_voltage),
                        ..carry
                    },
                )
            }
            MessageKind::VcuCommand => FrameUpdate::new(
                vec![
                    Sample::channel(ChannelId::VcuCommandTorque, scaled(Field::le_u16(0), payload, 10.0)?),
                    Sample::channel(ChannelId::VcuCommandDirection, Field::u8(4).read_f64(payload)? * 100.0),
                ],
                carry,
            ),
            MessageKind::Torques => {
                let command = scaled(Field::le_i16(0), payload, 10.0)?;
                let feedback = -scaled(Field::le_i16(2), payload, 10.0)?;
                FrameUpdate::new(
                    vec![
                        Sample::channel(ChannelId::CommandTorque, command),
                        Sample::channel(ChannelId::FeedbackTorque, feedback),
                    ],
                    CarryState {
                        feedback_torque: Some(feedback),
                        ..carry
                    },
                )
            }
            MessageKind::Apps1 => pedal(ChannelId::Apps1, payload, carry)?,
            MessageKind::Apps2 => pedal(ChannelId::Apps2, payload, carry)?,
            MessageKind::Bse => pedal(ChannelId::Bse, payload, carry)?,
            MessageKind::GyroAngular => {
                if !carry.angular_limiter.allows(frame.timestamp, prior.debounce_ms) {
                    return Ok(Outcome::Debounced);
                }
                let samples = gyro_axes(
                    [ChannelId::GyroAngX, ChannelId::GyroAngY, ChannelId::GyroAngZ],
                    payload,
                    10.0,
                )?;
                FrameUpdate::new(
                    samples,
                    CarryState {
                        angular_limiter: carry.angular_limiter.accepted(frame.timestamp),
                        ..carry
                    },
                )
            }
            MessageKind::GyroAcceleration => {
                if !carry.acceleration_limiter.allows(frame.timestamp, prior.debounce_ms) {
                    return Ok(Outcome::Debounced);
                }
                let samples = gyro_axes(
                    [ChannelId::GyroAccX, ChannelId::GyroAccY, ChannelId::GyroAccZ],
                    payload,
                    100.0,
                )?;
                FrameUpdate::new(
                    samples,
                    CarryState {
                        acceleration_limiter: carry.acceleration_limiter.accepted(frame.timestamp),
                        ..carry
                    },
                )
            }
            MessageKind::Steering => FrameUpdate::new(
                vec![
                    Sample::channel(ChannelId::SteeringAngle, scaled(Field::le_i16(0), payload, 10.0)?),
                    Sample::channel(ChannelId::SteeringSpeed, Field::i8(2).read_f64(payload)?),
                ],
                carry,
            ),
            MessageKind::FrontTravel => left_right(
                [ChannelId::FrontLeftLinear, ChannelId::FrontRightLinear],
                payload,
                10.0,
                carry,
            )?,
            MessageKind::RearTravel => left_right(
                [ChannelId::RearLeftLinear, ChannelId::RearRightLinear],
                payload,
                10.0,
                carry,
            )?,
            MessageKind::FrontWheelSpeed => left_right(
                [ChannelId::FrontLeftWheelSpeed, ChannelId::FrontRightWheelSpeed],
                payload,
                100.0,
                carry,
            )?,
            MessageKind::RearWheelSpeed => left_right(
                [ChannelId::RearLeftWheelSpeed, ChannelId::RearRightWheelSpeed],
                payload,
                100.0,
                carry,
            )?,
            MessageKind::CellVoltage { msg_index } => cell_voltages(msg_index, payload, prior)?,
            MessageKind::Temperature { msg_index } => temperatures(msg_index, payload, prior)?,
        };

        Ok(Outcome::Update(update))
    }
}

/// Read-only view of everything decoded before the current frame
#[derive(Debug, Clone, Copy)]
pub struct Prior<'a> {
    pub carry: &'a CarryState,
    pub dataset: &'a Dataset,
    /// Minimum spacing between accepted gyro frames
    pub debounce_ms: u64,
}

/// Samples produced by one frame and the carry-state that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    pub samples: Vec<Sample>,
    pub carry: CarryState,
}

impl FrameUpdate {
    pub fn new(samples: Vec<Sample>, carry: CarryState) -> Self {
        Self { samples, carry }
    }
}

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Update(FrameUpdate),
    /// Dropped by a rate limiter; the carry-state is unchanged
    Debounced,
}

fn scaled(field: Field, payload: &str, divisor: f64) -> Result<f64, CodecError> {
    Ok(field.read_f64(payload)? / divisor)
}

/// Vehicle speed in km/h from motor rpm
pub fn speed_from_rpm(rpm: f64) -> f64 {
    rpm * WHEEL_RADIUS_M * PI / GEAR_RATIO / 60.0 * 3.6
}

fn motor_position(frame: &RawFrame, carry: CarryState) -> Result<FrameUpdate, CodecError> {
    let payload = frame.payload.as_str();
    // The inverter reports rotation with the opposite sign convention
    let rpm = -Field::le_i16(2).read_f64(payload)?;
    let delta_resolver = Field::le_i16(6).read_f64(payload)?;

    let speed = speed_from_rpm(rpm);
    let distance = carry
        .distance
        .map_or(0.0, |prior| prior.advanced(speed, frame.timestamp));

    Ok(FrameUpdate::new(
        vec![
            Sample::channel(ChannelId::Rpm, rpm),
            Sample::channel(ChannelId::DeltaResolver, delta_resolver),
            Sample::channel(ChannelId::Speed, speed),
            Sample::channel(ChannelId::Distance, distance),
        ],
        CarryState {
            rpm: Some(rpm),
            distance: Some(Integral::new(frame.timestamp, distance)),
            ..carry
        },
    ))
}

fn currents(frame: &RawFrame, carry: CarryState) -> Result<FrameUpdate, CodecError> {
    let payload = frame.payload.as_str();
    let now = frame.timestamp;

    let phase_a = scaled(Field::le_i16(0), payload, 10.0)?;
    let phase_b = scaled(Field::le_i16(2), payload, 10.0)?;
    let phase_c = scaled(Field::le_i16(4), payload, 10.0)?;
    let dc_current = scaled(Field::le_i16(6), payload, 10.0)?;

    let calculated_current = match (carry.rpm, carry.feedback_torque, carry.dc_voltage) {
        (Some(rpm), Some(torque), Some(voltage)) if voltage != 0.0 => {
            rpm * torque / TORQUE_POWER_CONSTANT * 1000.0 / voltage
        }
        _ => 0.0,
    };

    // kW
    let dc_power = carry.dc_voltage.map_or(0.0, |voltage| voltage * dc_current / 1000.0);

    let energy = carry
        .dc_energy
        .map_or(0.0, |prior| prior.advanced(dc_power, now));

    let (discharge, regeneration) = match (carry.discharge_energy, carry.regeneration_energy) {
        (Some(discharge), Some(regeneration)) if dc_power >= 0.0 => {
            (discharge.advanced(dc_power, now), regeneration.value)
        }
        (Some(discharge), Some(regeneration)) => {
            (discharge.value, regeneration.advanced(-dc_power, now))
        }
        _ => (0.0, 0.0),
    };

    Ok(FrameUpdate::new(
        vec![
            Sample::channel(ChannelId::PhaseACurrent, phase_a),
            Sample::channel(ChannelId::PhaseBCurrent, phase_b),
            Sample::channel(ChannelId::PhaseCCurrent, phase_c),
            Sample::channel(ChannelId::DcCurrent, dc_current),
            Sample::channel(ChannelId::CalculatedCurrent, calculated_current),
            Sample::channel(ChannelId::DcPower, dc_power),
            Sample::channel(ChannelId::DcCumulativeEnergy, energy),
            Sample::channel(ChannelId::DcDischargeEnergy, discharge),
            Sample::channel(ChannelId::DcRegenerationEnergy, regeneration),
        ],
        CarryState {
            dc_energy: Some(Integral::new(now, energy)),
            discharge_energy: Some(Integral::new(now, discharge)),
            regeneration_energy: Some(Integral::new(now, regeneration)),
            ..carry
        },
    ))
}

/// Pedal sensors carry a raw reading and a ratio; only the reading is kept
fn pedal(channel: ChannelId, payload: &str, carry: CarryState) -> Result<FrameUpdate, CodecError> {
    let value = Field::le_u16(0).read_f64(payload)?;
    Field::le_u16(2).read(payload)?;
    Ok(FrameUpdate::new(vec![Sample::channel(channel, value)], carry))
}

fn gyro_axes(channels: [ChannelId; 3], payload: &str, divisor: f64) -> Result<Vec<Sample>, CodecError> {
    channels
        .iter()
        .enumerate()
        .map(|(axis, channel)| {
            scaled(Field::be_i16(axis * 2), payload, divisor).map(|value| Sample::channel(*channel, value))
        })
        .collect()
}

fn left_right(
    channels: [ChannelId; 2],
    payload: &str,
    divisor: f64,
    carry: CarryState,
) -> Result<FrameUpdate, CodecError> {
    let left = scaled(Field::be_u16(0), payload, divisor)?;
    let right = scaled(Field::be_u16(2), payload, divisor)?;
    Ok(FrameUpdate::new(
        vec![Sample::channel(channels[0], left), Sample::channel(channels[1], right)],
        carry,
    ))
}

/// Readings this frame writes, as `(member index, value)`
fn member_writes(family: Family, msg_index: usize, module_id: usize, values: &[f64]) -> Vec<(usize, f64)> {
    values
        .iter()
        .enumerate()
        .filter_map(|(k, value)| {
            family
                .member_index(msg_index, module_id, k)
                .map(|index| (index, *value))
        })
        .collect()
}

/// Latest value of a group member, counting writes from the current frame
fn latest_member(prior: &Prior<'_>, group: GroupId, writes: &[(usize, f64)], index: usize) -> Option<f64> {
    writes
        .iter()
        .rev()
        .find(|(written, _)| *written == index)
        .map(|(_, value)| *value)
        .or_else(|| prior.dataset.group_last(group, index))
}

fn cell_voltages(msg_index: usize, payload: &str, prior: &Prior<'_>) -> Result<FrameUpdate, CodecError> {
    let family = Family::CellVoltage;
    let readings = multiplex::parse_packed(payload)?;
    let module_id = readings.module_id;
    let millivolts = readings.values.map(f64::from);

    let writes = member_writes(family, msg_index, module_id, &millivolts);
    if writes.is_empty() {
        log::trace!("Cell frame for module {} slot {} maps to no cells", module_id, msg_index);
        return Ok(FrameUpdate::new(Vec::new(), *prior.carry));
    }

    // Cells that never reported count as zero
    let cells = family.member_group();
    let cell = |index| latest_member(prior, cells, &writes, index).unwrap_or(0.0);
    let pack_mv: f64 = (0..cells.size()).map(cell).sum();
    let segment_mv: f64 = family.module_members(module_id).map(cell).sum();

    let mut samples: Vec<Sample> = writes
        .iter()
        .map(|(index, value)| Sample::group(cells, *index, *value))
        .collect();
    samples.push(Sample::channel(ChannelId::BmsPack, pack_mv / 1000.0));
    samples.push(Sample::group(family.module_group(), module_id, segment_mv / 1000.0));

    Ok(FrameUpdate::new(samples, *prior.carry))
}

fn temperatures(msg_index: usize, payload: &str, prior: &Prior<'_>) -> Result<FrameUpdate, CodecError> {
    let family = Family::Temperature;
    let readings = multiplex::parse_packed(payload)?;
    let module_id = readings.module_id;

    let writes: Vec<(usize, f64)> = readings
        .values
        .iter()
        .enumerate()
        .filter_map(|(k, raw)| {
            let index = family.member_index(msg_index, module_id, k)?;
            multiplex::deci_kelvin_to_celsius(*raw).map(|celsius| (index, celsius))
        })
        .collect();
    if writes.is_empty() {
        return Ok(FrameUpdate::new(Vec::new(), *prior.carry));
    }

    let sensors = family.member_group();
    let reported: Vec<f64> = family
        .module_members(module_id)
        .filter_map(|index| latest_member(prior, sensors, &writes, index))
        .collect();
    // Non-empty: this frame wrote at least one of the module's sensors
    let average = reported.iter().sum::<f64>() / reported.len() as f64;

    let mut samples: Vec<Sample> = writes
        .iter()
        .map(|(index, value)| Sample::group(sensors, *index, *value))
        .collect();
    samples.push(Sample::group(family.module_group(), module_id, average));

    Ok(FrameUpdate::new(samples, *prior.carry))
}
