// the field table: which tag in an ExchangeData reply lands in which field of the aircraft state
// the order matters, the channel echoes all share the "item" tag and are matched by position

use crate::types::{AircraftState, NUM_CHANNELS};

/// Tag shared by the twelve echoed input channels.
pub const CHANNEL_TAG: &str = "item";

pub struct TelemetryField {
    pub tag: &'static str,
    pub target: fn(&mut AircraftState) -> &mut f64,
}

pub struct FieldTable {
    fields: Vec<TelemetryField>,
}

impl FieldTable {
    pub fn fields(&self) -> &[TelemetryField] {
        &self.fields
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }
}

pub fn field_table() -> FieldTable {
    let channels: [fn(&mut AircraftState) -> &mut f64; NUM_CHANNELS] = [
        |s| &mut s.rcin[0],
        |s| &mut s.rcin[1],
        |s| &mut s.rcin[2],
        |s| &mut s.rcin[3],
        |s| &mut s.rcin[4],
        |s| &mut s.rcin[5],
        |s| &mut s.rcin[6],
        |s| &mut s.rcin[7],
        |s| &mut s.rcin[8],
        |s| &mut s.rcin[9],
        |s| &mut s.rcin[10],
        |s| &mut s.rcin[11],
    ];

    let mut fields: Vec<TelemetryField> = channels
        .into_iter()
        .map(|target| TelemetryField {
            tag: CHANNEL_TAG,
            target,
        })
        .collect();

    fields.extend([
        TelemetryField {
            tag: "m-airspeed-MPS",
            target: |s| &mut s.airspeed_mps,
        },
        TelemetryField {
            tag: "m-altitudeASL-MTR",
            target: |s| &mut s.altitude_asl_m,
        },
        TelemetryField {
            tag: "m-altitudeAGL-MTR",
            target: |s| &mut s.altitude_agl_m,
        },
        TelemetryField {
            tag: "m-groundspeed-MPS",
            target: |s| &mut s.groundspeed_mps,
        },
        TelemetryField {
            tag: "m-pitchRate-DEGpSEC",
            target: |s| &mut s.pitch_rate_degps,
        },
        TelemetryField {
            tag: "m-rollRate-DEGpSEC",
            target: |s| &mut s.roll_rate_degps,
        },
        TelemetryField {
            tag: "m-yawRate-DEGpSEC",
            target: |s| &mut s.yaw_rate_degps,
        },
        TelemetryField {
            tag: "m-azimuth-DEG",
            target: |s| &mut s.azimuth_deg,
        },
        TelemetryField {
            tag: "m-inclination-DEG",
            target: |s| &mut s.inclination_deg,
        },
        TelemetryField {
            tag: "m-roll-DEG",
            target: |s| &mut s.roll_deg,
        },
        TelemetryField {
            tag: "m-aircraftPositionX-MTR",
            target: |s| &mut s.position_x_m,
        },
        TelemetryField {
            tag: "m-aircraftPositionY-MTR",
            target: |s| &mut s.position_y_m,
        },
        TelemetryField {
            tag: "m-velocityWorldU-MPS",
            target: |s| &mut s.velocity_world_u_mps,
        },
        TelemetryField {
            tag: "m-velocityWorldV-MPS",
            target: |s| &mut s.velocity_world_v_mps,
        },
        TelemetryField {
            tag: "m-velocityWorldW-MPS",
            target: |s| &mut s.velocity_world_w_mps,
        },
        TelemetryField {
            tag: "m-velocityBodyU-MPS",
            target: |s| &mut s.velocity_body_u_mps,
        },
        TelemetryField {
            tag: "m-velocityBodyV-MPS",
            target: |s| &mut s.velocity_body_v_mps,
        },
        TelemetryField {
            tag: "m-velocityBodyW-MPS",
            target: |s| &mut s.velocity_body_w_mps,
        },
        TelemetryField {
            tag: "m-accelerationWorldAX-MPS2",
            target: |s| &mut s.acceleration_world_ax_mps2,
        },
        TelemetryField {
            tag: "m-accelerationWorldAY-MPS2",
            target: |s| &mut s.acceleration_world_ay_mps2,
        },
        TelemetryField {
            tag: "m-accelerationWorldAZ-MPS2",
            target: |s| &mut s.acceleration_world_az_mps2,
        },
        TelemetryField {
            tag: "m-accelerationBodyAX-MPS2",
            target: |s| &mut s.acceleration_body_ax_mps2,
        },
        TelemetryField {
            tag: "m-accelerationBodyAY-MPS2",
            target: |s| &mut s.acceleration_body_ay_mps2,
        },
        TelemetryField {
            tag: "m-accelerationBodyAZ-MPS2",
            target: |s| &mut s.acceleration_body_az_mps2,
        },
        TelemetryField {
            tag: "m-windX-MPS",
            target: |s| &mut s.wind_x_mps,
        },
        TelemetryField {
            tag: "m-windY-MPS",
            target: |s| &mut s.wind_y_mps,
        },
        TelemetryField {
            tag: "m-windZ-MPS",
            target: |s| &mut s.wind_z_mps,
        },
        TelemetryField {
            tag: "m-propRPM",
            target: |s| &mut s.prop_rpm,
        },
        TelemetryField {
            tag: "m-heliMainRotorRPM",
            target: |s| &mut s.heli_main_rotor_rpm,
        },
        TelemetryField {
            tag: "m-batteryVoltage-VOLTS",
            target: |s| &mut s.battery_voltage_v,
        },
        TelemetryField {
            tag: "m-batteryCurrentDraw-AMPS",
            target: |s| &mut s.battery_current_draw_a,
        },
        TelemetryField {
            tag: "m-batteryRemainingCapacity-MAH",
            target: |s| &mut s.battery_remaining_capacity_mah,
        },
        TelemetryField {
            tag: "m-fuelRemaining-OZ",
            target: |s| &mut s.fuel_remaining_oz,
        },
        TelemetryField {
            tag: "m-isLocked",
            target: |s| &mut s.is_locked,
        },
        TelemetryField {
            tag: "m-hasLostComponents",
            target: |s| &mut s.has_lost_components,
        },
        TelemetryField {
            tag: "m-anEngineIsRunning",
            target: |s| &mut s.an_engine_is_running,
        },
        TelemetryField {
            tag: "m-isTouchingGround",
            target: |s| &mut s.is_touching_ground,
        },
        TelemetryField {
            tag: "m-currentAircraftStatus",
            target: |s| &mut s.current_aircraft_status,
        },
        TelemetryField {
            tag: "m-currentPhysicsTime-SEC",
            target: |s| &mut s.current_physics_time_s,
        },
        TelemetryField {
            tag: "m-currentPhysicsSpeedMultiplier",
            target: |s| &mut s.current_physics_speed_multiplier,
        },
        TelemetryField {
            tag: "m-orientationQuaternion-X",
            target: |s| &mut s.orientation_quaternion_x,
        },
        TelemetryField {
            tag: "m-orientationQuaternion-Y",
            target: |s| &mut s.orientation_quaternion_y,
        },
        TelemetryField {
            tag: "m-orientationQuaternion-Z",
            target: |s| &mut s.orientation_quaternion_z,
        },
        TelemetryField {
            tag: "m-orientationQuaternion-W",
            target: |s| &mut s.orientation_quaternion_w,
        },
        TelemetryField {
            tag: "m-flightAxisControllerIsActive",
            target: |s| &mut s.flight_axis_controller_is_active,
        },
        TelemetryField {
            tag: "m-resetButtonHasBeenPressed",
            target: |s| &mut s.reset_button_has_been_pressed,
        },
    ]);

    FieldTable { fields }
}
