//! Provider-agnostic weather model
//!
//! Every upstream integration maps its own wire format into these types, so the
//! cache, the dispatcher and the email templates never see provider details.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current conditions at one point in time
///
/// The default value is the zero snapshot (0 °C, 0 %, empty description) that
/// stands in for a day slot the provider did not report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Temperature in degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Condition text as reported upstream, e.g. "Partly cloudy"
    pub description: String,
}

impl WeatherSnapshot {
    pub fn new(temperature: f32, humidity: f32, description: impl Into<String>) -> Self {
        Self {
            temperature,
            humidity,
            description: description.into(),
        }
    }

    /// Whether this is the zero placeholder
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.temperature.abs() < f32::EPSILON
            && self.humidity.abs() < f32::EPSILON
            && self.description.is_empty()
    }
}

impl fmt::Display for WeatherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}°C, {:.0}% humidity, {}",
            self.temperature, self.humidity, self.description
        )
    }
}

/// One of the six fixed hours of a day outlook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForecastSlot {
    SevenAm,
    TenAm,
    OnePm,
    FourPm,
    SevenPm,
    TenPm,
}

impl ForecastSlot {
    /// All slots in chronological order
    pub const ALL: [Self; 6] = [
        Self::SevenAm,
        Self::TenAm,
        Self::OnePm,
        Self::FourPm,
        Self::SevenPm,
        Self::TenPm,
    ];

    /// Hour of day (0-23) this slot represents
    #[must_use]
    pub const fn hour(&self) -> u32 {
        match self {
            Self::SevenAm => 7,
            Self::TenAm => 10,
            Self::OnePm => 13,
            Self::FourPm => 16,
            Self::SevenPm => 19,
            Self::TenPm => 22,
        }
    }

    /// Slot for an hour of day, if it is one of the six
    #[must_use]
    pub const fn from_hour(hour: u32) -> Option<Self> {
        match hour {
            7 => Some(Self::SevenAm),
            10 => Some(Self::TenAm),
            13 => Some(Self::OnePm),
            16 => Some(Self::FourPm),
            19 => Some(Self::SevenPm),
            22 => Some(Self::TenPm),
            _ => None,
        }
    }

    /// `HH:00` label shown in emails
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SevenAm => "07:00",
            Self::TenAm => "10:00",
            Self::OnePm => "13:00",
            Self::FourPm => "16:00",
            Self::SevenPm => "19:00",
            Self::TenPm => "22:00",
        }
    }
}

impl fmt::Display for ForecastSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Day outlook with exactly six slots
///
/// All six fields are always present. A slot the provider did not return is
/// the zero snapshot; [`DayWeatherSnapshot::from_hourly`] reports which ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayWeatherSnapshot {
    pub seven_am: WeatherSnapshot,
    pub ten_am: WeatherSnapshot,
    pub one_pm: WeatherSnapshot,
    pub four_pm: WeatherSnapshot,
    pub seven_pm: WeatherSnapshot,
    pub ten_pm: WeatherSnapshot,
}

/// Result of assembling a day outlook from an hourly series
#[derive(Debug, Clone, PartialEq)]
pub struct SlotFill {
    pub day: DayWeatherSnapshot,
    /// Slots that were absent upstream and hold the zero snapshot
    pub missing: Vec<ForecastSlot>,
}

impl SlotFill {
    /// Whether every slot came from the upstream series
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl DayWeatherSnapshot {
    /// Build a day outlook from `(hour_of_day, snapshot)` pairs
    ///
    /// Hours outside the six slots are ignored. If an hour appears twice the
    /// later entry wins.
    pub fn from_hourly<I>(hours: I) -> SlotFill
    where
        I: IntoIterator<Item = (u32, WeatherSnapshot)>,
    {
        let mut day = Self::default();
        let mut seen = [false; 6];

        for (hour, snapshot) in hours {
            if let Some(slot) = ForecastSlot::from_hour(hour) {
                seen[slot as usize] = true;
                *day.slot_mut(slot) = snapshot;
            }
        }

        let missing = ForecastSlot::ALL
            .into_iter()
            .filter(|slot| !seen[*slot as usize])
            .collect();

        SlotFill { day, missing }
    }

    /// Snapshot for a given slot
    #[must_use]
    pub const fn slot(&self, slot: ForecastSlot) -> &WeatherSnapshot {
        match slot {
            ForecastSlot::SevenAm => &self.seven_am,
            ForecastSlot::TenAm => &self.ten_am,
            ForecastSlot::OnePm => &self.one_pm,
            ForecastSlot::FourPm => &self.four_pm,
            ForecastSlot::SevenPm => &self.seven_pm,
            ForecastSlot::TenPm => &self.ten_pm,
        }
    }

    fn slot_mut(&mut self, slot: ForecastSlot) -> &mut WeatherSnapshot {
        match slot {
            ForecastSlot::SevenAm => &mut self.seven_am,
            ForecastSlot::TenAm => &mut self.ten_am,
            ForecastSlot::OnePm => &mut self.one_pm,
            ForecastSlot::FourPm => &mut self.four_pm,
            ForecastSlot::SevenPm => &mut self.seven_pm,
            ForecastSlot::TenPm => &mut self.ten_pm,
        }
    }

    /// Iterate slots in chronological order
    pub fn slots(&self) -> impl Iterator<Item = (ForecastSlot, &WeatherSnapshot)> {
        ForecastSlot::ALL.into_iter().map(|slot| (slot, self.slot(slot)))
    }
}
