//! Car Telemetry packet (id 6)

use super::player_record;
use crate::classify::PacketKind;
use crate::error::DecodeError;
use crate::format::WireFormat;
use crate::header::PacketHeader;
use pitwall_core::model::CarTelemetrySample;

pub fn decode_car_telemetry(
    buf: &[u8],
    header: &PacketHeader,
    format: &WireFormat,
) -> Result<CarTelemetrySample, DecodeError> {
    let mut r = player_record(
        buf,
        header,
        format,
        PacketKind::CarTelemetry,
        format.records.car_telemetry,
    )?;

    let speed_kph = r.u16_le()?;
    let throttle = r.f32_le()?;
    let steering = r.f32_le()?;
    let brake = r.f32_le()?;
    let clutch = r.u8()?;
    let gear = r.i8()?;
    let engine_rpm = r.u16_le()?;
    let drs_active = r.u8()? != 0;
    let rev_lights_percent = r.u8()?;
    let _rev_lights_bits = r.u16_le()?;
    let brake_temps = r.u16_le_array::<4>()?;
    let tyre_temps = r.u8_array::<4>()?;
    let tyre_inner_temps = r.u8_array::<4>()?;
    let engine_temp = r.u16_le()?;
    let tyre_pressures = r.f32_le_array::<4>()?;

    Ok(CarTelemetrySample {
        speed_kph,
        throttle,
        steering,
        brake,
        clutch,
        gear,
        engine_rpm,
        drs_active,
        rev_lights_percent,
        brake_temps,
        tyre_temps,
        tyre_inner_temps,
        engine_temp,
        tyre_pressures,
    })
}
