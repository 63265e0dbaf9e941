//! Property-based tests for domain value objects
//!
//! These tests use proptest to verify invariants across many random inputs.

use domain::{City, DayWeatherSnapshot, EmailAddress, ForecastSlot, Frequency, WeatherSnapshot};
use proptest::prelude::*;

// ============================================================================
// DayWeatherSnapshot Property Tests
// ============================================================================

mod day_weather_tests {
    use super::*;

    proptest! {
        #[test]
        fn every_series_yields_six_slots(
            hours in prop::collection::vec((0u32..24, -40.0f32..50.0), 0..48)
        ) {
            let series = hours
                .iter()
                .map(|(h, t)| (*h, WeatherSnapshot::new(*t, 50.0, "x")));
            let fill = DayWeatherSnapshot::from_hourly(series);

            prop_assert_eq!(fill.day.slots().count(), 6);

            for slot in ForecastSlot::ALL {
                let present = hours.iter().any(|(h, _)| *h == slot.hour());
                prop_assert_eq!(fill.missing.contains(&slot), !present);
                if !present {
                    prop_assert!(fill.day.slot(slot).is_zero());
                }
            }
        }

        #[test]
        fn non_slot_hours_never_fill_a_slot(hour in 0u32..24) {
            prop_assume!(ForecastSlot::from_hour(hour).is_none());
            let fill = DayWeatherSnapshot::from_hourly(vec![(hour, WeatherSnapshot::new(1.0, 1.0, "x"))]);
            prop_assert_eq!(fill.missing.len(), 6);
        }
    }
}

// ============================================================================
// City Property Tests
// ============================================================================

mod city_tests {
    use super::*;

    proptest! {
        #[test]
        fn valid_names_survive_trimming(name in "[A-Za-z][A-Za-z -]{0,40}[A-Za-z]") {
            let padded = format!("  {name}  ");
            let city = City::new(padded).unwrap();
            prop_assert_eq!(city.as_str(), name.as_str());
        }

        #[test]
        fn cache_key_part_is_idempotent(name in "[A-Za-z]{1,30}") {
            let city = City::new(name).unwrap();
            let lowered = City::new(city.cache_key_part()).unwrap();
            prop_assert_eq!(lowered.cache_key_part(), city.cache_key_part());
        }

        #[test]
        fn whitespace_only_is_rejected(ws in "[ \t]{0,10}") {
            prop_assert!(City::new(ws).is_err());
        }
    }
}

// ============================================================================
// EmailAddress Property Tests
// ============================================================================

mod email_tests {
    use super::*;

    proptest! {
        #[test]
        fn well_formed_addresses_are_lowercased(
            local in "[a-zA-Z][a-zA-Z0-9]{0,15}",
            domain in "[a-zA-Z]{2,12}",
            tld in "[a-z]{2,4}"
        ) {
            let raw = format!("{local}@{domain}.{tld}");
            let email = EmailAddress::new(&raw).unwrap();
            prop_assert_eq!(email.as_str(), raw.to_lowercase());
        }

        #[test]
        fn strings_without_at_are_rejected(s in "[a-z0-9.]{1,30}") {
            prop_assert!(EmailAddress::new(s).is_err());
        }
    }
}

// ============================================================================
// Frequency Property Tests
// ============================================================================

mod frequency_tests {
    use super::*;

    proptest! {
        #[test]
        fn only_literal_strings_parse(s in "[a-z]{1,10}") {
            let parsed = s.parse::<Frequency>();
            prop_assert_eq!(parsed.is_ok(), s == "hourly" || s == "daily");
        }
    }
}
