//! Core types for environment sensor data.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Number of sensor channels in a reading, not counting the timestamp.
pub const FIELD_COUNT: usize = 15;

/// A named sensor channel.
///
/// Variants are declared in log file column order. Positions are what the
/// line codec relies on; names only appear in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Air temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Barometric pressure in hPa (mbar).
    Pressure,
    /// PM1.0 mass concentration, standard particles (µg/m³).
    Pm10Standard,
    /// PM2.5 mass concentration, standard particles (µg/m³).
    Pm25Standard,
    /// PM10 mass concentration, standard particles (µg/m³).
    Pm100Standard,
    /// PM1.0 mass concentration, atmospheric environment (µg/m³).
    Pm10Env,
    /// PM2.5 mass concentration, atmospheric environment (µg/m³).
    Pm25Env,
    /// PM10 mass concentration, atmospheric environment (µg/m³).
    Pm100Env,
    /// Particles larger than 0.3 µm per 0.1 L of air.
    Particles03um,
    /// Particles larger than 0.5 µm per 0.1 L of air.
    Particles05um,
    /// Particles larger than 1.0 µm per 0.1 L of air.
    Particles10um,
    /// Particles larger than 2.5 µm per 0.1 L of air.
    Particles25um,
    /// Particles larger than 5.0 µm per 0.1 L of air.
    Particles50um,
    /// Particles larger than 10 µm per 0.1 L of air.
    Particles100um,
}

impl Field {
    /// All fields in column order.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Temperature,
        Field::Humidity,
        Field::Pressure,
        Field::Pm10Standard,
        Field::Pm25Standard,
        Field::Pm100Standard,
        Field::Pm10Env,
        Field::Pm25Env,
        Field::Pm100Env,
        Field::Particles03um,
        Field::Particles05um,
        Field::Particles10um,
        Field::Particles25um,
        Field::Particles50um,
        Field::Particles100um,
    ];

    /// The particle count fields, smallest size first.
    pub const PARTICLE_COUNTS: [Field; 6] = [
        Field::Particles03um,
        Field::Particles05um,
        Field::Particles10um,
        Field::Particles25um,
        Field::Particles50um,
        Field::Particles100um,
    ];

    /// Column name as written in the log file header.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Pressure => "pressure",
            Field::Pm10Standard => "pm10_standard",
            Field::Pm25Standard => "pm25_standard",
            Field::Pm100Standard => "pm100_standard",
            Field::Pm10Env => "pm10_env",
            Field::Pm25Env => "pm25_env",
            Field::Pm100Env => "pm100_env",
            Field::Particles03um => "particles_03um",
            Field::Particles05um => "particles_05um",
            Field::Particles10um => "particles_10um",
            Field::Particles25um => "particles_25um",
            Field::Particles50um => "particles_50um",
            Field::Particles100um => "particles_100um",
        }
    }

    /// Zero-based position among the sensor fields (the timestamp is not counted).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Unit label used for display.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Field::Temperature => "°C",
            Field::Humidity => "%RH",
            Field::Pressure => "hPa",
            Field::Pm10Standard
            | Field::Pm25Standard
            | Field::Pm100Standard
            | Field::Pm10Env
            | Field::Pm25Env
            | Field::Pm100Env => "µg/m³",
            _ => "/0.1L",
        }
    }

    /// Decimal places written to the log file, or `None` for the shortest exact form.
    #[must_use]
    pub const fn decimals(self) -> Option<usize> {
        match self {
            Field::Temperature | Field::Humidity | Field::Pressure => Some(1),
            _ => None,
        }
    }

    /// Lower particle diameter bound in µm for the particle count fields.
    #[must_use]
    pub const fn particle_size_um(self) -> Option<f64> {
        match self {
            Field::Particles03um => Some(0.3),
            Field::Particles05um => Some(0.5),
            Field::Particles10um => Some(1.0),
            Field::Particles25um => Some(2.5),
            Field::Particles50um => Some(5.0),
            Field::Particles100um => Some(10.0),
            _ => None,
        }
    }

    /// Look up a field by its header name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ParseError::UnknownField(s.to_string()))
    }
}

/// Values for every sensor field. `None` marks a missing value.
///
/// Non-finite numbers are never stored: [`SensorValues::set`] turns them into `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorValues {
    /// Air temperature in °C.
    pub temperature: Option<f64>,
    /// Relative humidity in %RH.
    pub humidity: Option<f64>,
    /// Barometric pressure in hPa.
    pub pressure: Option<f64>,
    /// PM1.0, standard particles, µg/m³.
    pub pm10_standard: Option<f64>,
    /// PM2.5, standard particles, µg/m³.
    pub pm25_standard: Option<f64>,
    /// PM10, standard particles, µg/m³.
    pub pm100_standard: Option<f64>,
    /// PM1.0, atmospheric environment, µg/m³.
    pub pm10_env: Option<f64>,
    /// PM2.5, atmospheric environment, µg/m³.
    pub pm25_env: Option<f64>,
    /// PM10, atmospheric environment, µg/m³.
    pub pm100_env: Option<f64>,
    /// Particles > 0.3 µm per 0.1 L.
    pub particles_03um: Option<f64>,
    /// Particles > 0.5 µm per 0.1 L.
    pub particles_05um: Option<f64>,
    /// Particles > 1.0 µm per 0.1 L.
    pub particles_10um: Option<f64>,
    /// Particles > 2.5 µm per 0.1 L.
    pub particles_25um: Option<f64>,
    /// Particles > 5.0 µm per 0.1 L.
    pub particles_50um: Option<f64>,
    /// Particles > 10 µm per 0.1 L.
    pub particles_100um: Option<f64>,
}

impl SensorValues {
    /// Values with every field missing.
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// Get the value of a field.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Pressure => self.pressure,
            Field::Pm10Standard => self.pm10_standard,
            Field::Pm25Standard => self.pm25_standard,
            Field::Pm100Standard => self.pm100_standard,
            Field::Pm10Env => self.pm10_env,
            Field::Pm25Env => self.pm25_env,
            Field::Pm100Env => self.pm100_env,
            Field::Particles03um => self.particles_03um,
            Field::Particles05um => self.particles_05um,
            Field::Particles10um => self.particles_10um,
            Field::Particles25um => self.particles_25um,
            Field::Particles50um => self.particles_50um,
            Field::Particles100um => self.particles_100um,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<f64> {
        match field {
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Pressure => &mut self.pressure,
            Field::Pm10Standard => &mut self.pm10_standard,
            Field::Pm25Standard => &mut self.pm25_standard,
            Field::Pm100Standard => &mut self.pm100_standard,
            Field::Pm10Env => &mut self.pm10_env,
            Field::Pm25Env => &mut self.pm25_env,
            Field::Pm100Env => &mut self.pm100_env,
            Field::Particles03um => &mut self.particles_03um,
            Field::Particles05um => &mut self.particles_05um,
            Field::Particles10um => &mut self.particles_10um,
            Field::Particles25um => &mut self.particles_25um,
            Field::Particles50um => &mut self.particles_50um,
            Field::Particles100um => &mut self.particles_100um,
        }
    }

    /// Set the value of a field. NaN and infinities are stored as missing.
    pub fn set(&mut self, field: Field, value: Option<f64>) {
        *self.slot_mut(field) = value.filter(|v| v.is_finite());
    }

    /// Builder-style variant of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Iterate over `(field, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, Option<f64>)> + '_ {
        Field::ALL.into_iter().map(move |field| (field, self.get(field)))
    }

    /// Mark every particulate field (mass concentrations and counts) as missing.
    pub fn clear_particulates(&mut self) {
        for field in &Field::ALL[3..] {
            self.set(*field, None);
        }
    }

    /// Number of missing fields.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.iter().filter(|(_, value)| value.is_none()).count()
    }

    /// Whether every field has a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_count() == 0
    }
}

/// One timestamped sample of all sensor fields.
///
/// A `Reading` always has the full header arity; absent values are carried as
/// missing markers rather than by dropping columns.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Sensor values in column order.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub values: SensorValues,
}

impl Reading {
    /// Create a reading from a timestamp and values.
    #[must_use]
    pub fn new(timestamp: f64, values: SensorValues) -> Self {
        Self { timestamp, values }
    }

    /// A reading whose sensor fields are all missing, used when a sensor read fails.
    #[must_use]
    pub fn missing(timestamp: f64) -> Self {
        Self::new(timestamp, SensorValues::missing())
    }

    /// Get the value of a field.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values.get(field)
    }

    /// The timestamp as a UTC date-time, if it is representable.
    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        timestamp_to_datetime(self.timestamp)
    }
}

/// Convert fractional Unix seconds to a UTC date-time.
#[must_use]
pub fn timestamp_to_datetime(timestamp: f64) -> Option<DateTime<Utc>> {
    if !timestamp.is_finite() {
        return None;
    }
    let micros = (timestamp * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

/// Convert a date-time to fractional Unix seconds, keeping microsecond precision.
#[must_use]
pub fn datetime_to_timestamp<Tz: chrono::TimeZone>(datetime: &DateTime<Tz>) -> f64 {
    datetime.timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_matches_index() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn test_field_from_name() {
        assert_eq!(Field::from_name("pm25_env"), Some(Field::Pm25Env));
        assert_eq!(Field::from_name("particles_100um"), Some(Field::Particles100um));
        assert_eq!(Field::from_name("timestamp"), None);
        assert!(matches!(
            "co2".parse::<Field>(),
            Err(ParseError::UnknownField(name)) if name == "co2"
        ));
    }

    #[test]
    fn test_particle_sizes_ascending() {
        let sizes: Vec<f64> = Field::PARTICLE_COUNTS
            .iter()
            .filter_map(|f| f.particle_size_um())
            .collect();
        assert_eq!(sizes, vec![0.3, 0.5, 1.0, 2.5, 5.0, 10.0]);
        assert_eq!(Field::Temperature.particle_size_um(), None);
    }

    #[test]
    fn test_set_rejects_non_finite() {
        let mut values = SensorValues::missing();
        values.set(Field::Temperature, Some(f64::NAN));
        values.set(Field::Humidity, Some(f64::INFINITY));
        values.set(Field::Pressure, Some(1013.2));
        assert_eq!(values.temperature, None);
        assert_eq!(values.humidity, None);
        assert_eq!(values.pressure, Some(1013.2));
        assert_eq!(values.missing_count(), FIELD_COUNT - 1);
    }

    #[test]
    fn test_clear_particulates_keeps_climate() {
        let mut values = SensorValues::missing()
            .with(Field::Temperature, 21.0)
            .with(Field::Pm25Env, 4.0)
            .with(Field::Particles03um, 900.0);
        values.clear_particulates();
        assert_eq!(values.temperature, Some(21.0));
        assert_eq!(values.pm25_env, None);
        assert_eq!(values.particles_03um, None);
    }

    #[test]
    fn test_missing_reading() {
        let reading = Reading::missing(1_700_000_000.0);
        assert!(reading.values.iter().all(|(_, v)| v.is_none()));
        assert!(!reading.values.is_complete());
    }

    #[test]
    fn test_timestamp_conversion() {
        let dt = timestamp_to_datetime(1_700_000_000.25).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 250);
        assert_eq!(datetime_to_timestamp(&dt), 1_700_000_000.25);
        assert!(timestamp_to_datetime(f64::NAN).is_none());
    }
}
