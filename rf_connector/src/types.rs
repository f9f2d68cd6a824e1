use serde::{Deserialize, Serialize};

/// Number of control channels sent with every `ExchangeData` request.
pub const NUM_CHANNELS: usize = 12;

// a six channel control command, every value is expected in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub throttle: f64,
    pub aileron: f64,
    pub elevator: f64,
    pub rudder: f64,
    pub flaps: f64,
    pub gear: f64,
}

// neutral command: sticks centered, throttle idle, flaps and gear at zero
impl Default for Command {
    fn default() -> Self {
        Command {
            throttle: 0.0,
            aileron: 0.5,
            elevator: 0.5,
            rudder: 0.5,
            flaps: 0.0,
            gear: 0.0,
        }
    }
}

// the individual channels of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Throttle,
    Aileron,
    Elevator,
    Rudder,
    Flaps,
    Gear,
}

impl Command {
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Throttle => self.throttle,
            Axis::Aileron => self.aileron,
            Axis::Elevator => self.elevator,
            Axis::Rudder => self.rudder,
            Axis::Flaps => self.flaps,
            Axis::Gear => self.gear,
        }
    }

    // set a channel, clamped to [0, 1]. NaN falls back to the neutral value of the channel
    pub fn set(&mut self, axis: Axis, value: f64) {
        let value = if value.is_nan() {
            Command::default().get(axis)
        } else {
            value.clamp(0.0, 1.0)
        };

        match axis {
            Axis::Throttle => self.throttle = value,
            Axis::Aileron => self.aileron = value,
            Axis::Elevator => self.elevator = value,
            Axis::Rudder => self.rudder = value,
            Axis::Flaps => self.flaps = value,
            Axis::Gear => self.gear = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Flat telemetry record as reported by RealFlight in an `ExchangeData` reply.
///
/// Status flags (`is_locked`, `is_touching_ground`, ...) are carried as
/// doubles, 1.0 for true and 0.0 for false.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AircraftState {
    pub rcin: [f64; NUM_CHANNELS],
    pub airspeed_mps: f64,
    pub altitude_asl_m: f64,
    pub altitude_agl_m: f64,
    pub groundspeed_mps: f64,
    pub pitch_rate_degps: f64,
    pub roll_rate_degps: f64,
    pub yaw_rate_degps: f64,
    pub azimuth_deg: f64,
    pub inclination_deg: f64,
    pub roll_deg: f64,
    pub position_x_m: f64,
    pub position_y_m: f64,
    pub velocity_world_u_mps: f64,
    pub velocity_world_v_mps: f64,
    pub velocity_world_w_mps: f64,
    pub velocity_body_u_mps: f64,
    pub velocity_body_v_mps: f64,
    pub velocity_body_w_mps: f64,
    pub acceleration_world_ax_mps2: f64,
    pub acceleration_world_ay_mps2: f64,
    pub acceleration_world_az_mps2: f64,
    pub acceleration_body_ax_mps2: f64,
    pub acceleration_body_ay_mps2: f64,
    pub acceleration_body_az_mps2: f64,
    pub wind_x_mps: f64,
    pub wind_y_mps: f64,
    pub wind_z_mps: f64,
    pub prop_rpm: f64,
    pub heli_main_rotor_rpm: f64,
    pub battery_voltage_v: f64,
    pub battery_current_draw_a: f64,
    pub battery_remaining_capacity_mah: f64,
    pub fuel_remaining_oz: f64,
    pub is_locked: f64,
    pub has_lost_components: f64,
    pub an_engine_is_running: f64,
    pub is_touching_ground: f64,
    pub current_aircraft_status: f64,
    pub current_physics_time_s: f64,
    pub current_physics_speed_multiplier: f64,
    pub orientation_quaternion_x: f64,
    pub orientation_quaternion_y: f64,
    pub orientation_quaternion_z: f64,
    pub orientation_quaternion_w: f64,
    pub flight_axis_controller_is_active: f64,
    pub reset_button_has_been_pressed: f64,
}
