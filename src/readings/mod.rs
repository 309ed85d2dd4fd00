// src/readings/mod.rs
//! Mock spot readings for when no probe is attached.
//!
//! Values follow the same contract as real probe readings so consumers can't
//! tell the difference apart from the fixed latency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::LinkConfig;
use crate::log_debug;

mod range;

pub use range::ReadingRange;

/// Deficient nitrogen
pub const NITROGEN_RANGE: ReadingRange = ReadingRange::new(30.0, 90.0);
/// Sufficient phosphorus
pub const PHOSPHORUS_RANGE: ReadingRange = ReadingRange::new(120.0, 180.0);
/// Deficient potassium
pub const POTASSIUM_RANGE: ReadingRange = ReadingRange::new(20.0, 60.0);
/// Near-neutral soil
pub const PH_RANGE: ReadingRange = ReadingRange::new(6.5, 7.2);

pub const METHANE_RANGE: ReadingRange = ReadingRange::new(3.0, 8.0);
pub const TANK_TEMP_RANGE: ReadingRange = ReadingRange::new(25.0, 35.0);
pub const TANK_HUMIDITY_RANGE: ReadingRange = ReadingRange::new(60.0, 85.0);
pub const TANK_MOISTURE_RANGE: ReadingRange = ReadingRange::new(50.0, 75.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpkReading {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhReading {
    pub ph: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TankReading {
    pub methane: f64,
    pub temp: f64,
    pub humidity: f64,
    pub ph: f64,
    pub moisture: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SpotReading {
    Npk(NpkReading),
    Ph(PhReading),
    Tank(TankReading),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotKind {
    Npk,
    Ph,
    Tank,
}

impl fmt::Display for SpotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotKind::Npk => write!(f, "npk"),
            SpotKind::Ph => write!(f, "ph"),
            SpotKind::Tank => write!(f, "tank"),
        }
    }
}

impl FromStr for SpotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "npk" => Ok(SpotKind::Npk),
            "ph" => Ok(SpotKind::Ph),
            "tank" => Ok(SpotKind::Tank),
            other => Err(format!("unknown spot reading kind '{}'", other)),
        }
    }
}

pub fn sample_npk() -> NpkReading {
    let mut rng = rand::thread_rng();
    NpkReading {
        n: NITROGEN_RANGE.sample(&mut rng),
        p: PHOSPHORUS_RANGE.sample(&mut rng),
        k: POTASSIUM_RANGE.sample(&mut rng),
    }
}

pub fn sample_ph() -> PhReading {
    PhReading {
        ph: PH_RANGE.sample_rounded(&mut rand::thread_rng(), 1),
    }
}

pub fn sample_tank() -> TankReading {
    let mut rng = rand::thread_rng();
    TankReading {
        methane: METHANE_RANGE.sample_rounded(&mut rng, 2),
        temp: TANK_TEMP_RANGE.sample_rounded(&mut rng, 1),
        humidity: TANK_HUMIDITY_RANGE.sample_rounded(&mut rng, 1),
        ph: PH_RANGE.sample_rounded(&mut rng, 1),
        moisture: TANK_MOISTURE_RANGE.sample_rounded(&mut rng, 1),
    }
}

/// Produces spot readings after a fixed simulated latency per kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotReadingGenerator {
    npk_delay: Duration,
    ph_delay: Duration,
    tank_delay: Duration,
}

impl SpotReadingGenerator {
    pub fn new(npk_delay: Duration, ph_delay: Duration, tank_delay: Duration) -> Self {
        Self { npk_delay, ph_delay, tank_delay }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(
            Duration::from_millis(config.npk_delay_ms),
            Duration::from_millis(config.ph_delay_ms),
            Duration::from_millis(config.tank_delay_ms),
        )
    }

    pub fn delay_for(&self, kind: SpotKind) -> Duration {
        match kind {
            SpotKind::Npk => self.npk_delay,
            SpotKind::Ph => self.ph_delay,
            SpotKind::Tank => self.tank_delay,
        }
    }

    pub async fn read(&self, kind: SpotKind) -> SpotReading {
        tokio::time::sleep(self.delay_for(kind)).await;

        let reading = match kind {
            SpotKind::Npk => SpotReading::Npk(sample_npk()),
            SpotKind::Ph => SpotReading::Ph(sample_ph()),
            SpotKind::Tank => SpotReading::Tank(sample_tank()),
        };

        log_debug!("Mock {} reading: {:?}", kind, reading);
        reading
    }
}

impl Default for SpotReadingGenerator {
    fn default() -> Self {
        Self::from_config(&LinkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_npk_bounds_hold_across_repeated_sampling() {
        for _ in 0..5_000 {
            let reading = sample_npk();
            assert!((30.0..=90.0).contains(&reading.n), "n = {}", reading.n);
            assert!((120.0..=180.0).contains(&reading.p), "p = {}", reading.p);
            assert!((20.0..=60.0).contains(&reading.k), "k = {}", reading.k);
        }
    }

    #[test]
    fn test_tank_reading_ranges() {
        for _ in 0..1_000 {
            let reading = sample_tank();
            assert!(METHANE_RANGE.contains(reading.methane));
            assert!(TANK_TEMP_RANGE.contains(reading.temp));
            assert!(TANK_HUMIDITY_RANGE.contains(reading.humidity));
            assert!(PH_RANGE.contains(reading.ph));
            assert!(TANK_MOISTURE_RANGE.contains(reading.moisture));
        }
    }

    #[tokio::test]
    async fn test_read_waits_for_configured_delay() {
        let generator = SpotReadingGenerator::new(
            Duration::from_millis(40),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        let started = Instant::now();
        let reading = generator.read(SpotKind::Npk).await;
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(matches!(reading, SpotReading::Npk(_)));

        match generator.read(SpotKind::Ph).await {
            SpotReading::Ph(PhReading { ph }) => assert!(PH_RANGE.contains(ph)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("NPK".parse::<SpotKind>().unwrap(), SpotKind::Npk);
        assert_eq!(" ph ".parse::<SpotKind>().unwrap(), SpotKind::Ph);
        assert!("nitrate".parse::<SpotKind>().is_err());
        assert_eq!(SpotKind::Tank.to_string(), "tank");
    }

    #[test]
    fn test_default_delays_match_config() {
        let generator = SpotReadingGenerator::default();
        assert_eq!(generator.delay_for(SpotKind::Npk), Duration::from_millis(800));
        assert_eq!(generator.delay_for(SpotKind::Ph), Duration::from_millis(200));
    }
}
