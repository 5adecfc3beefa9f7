// wf-core/src/units.rs

use uom::si::f64::{
    Length as UomLength, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Length = UomLength;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn degc(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

#[inline]
fn seconds_per_day() -> f64 {
    days(1.0).value
}

#[inline]
pub fn m3_per_day(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v / seconds_per_day())
}

/// Surface rate in m³/day from an SI rate (m³/s).
#[inline]
pub fn to_m3_per_day(rate_si: f64) -> f64 {
    rate_si * seconds_per_day()
}

/// Pressure in bar from an SI pressure (Pa).
#[inline]
pub fn to_bar(p_si: f64) -> f64 {
    use uom::si::pressure::{bar, pascal};
    Pressure::new::<pascal>(p_si).get::<bar>()
}

/// Time in days from an SI time (s).
#[inline]
pub fn to_days(t_si: f64) -> f64 {
    use uom::si::time::{day, second};
    Time::new::<second>(t_si).get::<day>()
}

pub mod constants {
    /// Standard gravity [m/s²]
    pub const G0_MPS2: f64 = 9.806_65;
}
