use std::env;

use chrono::Weekday;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub business_hours: BusinessHours,
}

/// Clinic operating parameters. Constructed once at startup and passed by
/// reference into the scheduling services, so per-location hours stay a
/// configuration concern rather than engine state.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
    pub lunch_start_hour: u32,
    pub lunch_end_hour: u32,
    pub slot_duration_minutes: i32,
    pub working_days: Vec<Weekday>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
            lunch_start_hour: 13,
            lunch_end_hour: 14,
            slot_duration_minutes: 15,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ],
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            business_hours: BusinessHours::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

impl BusinessHours {
    /// Read clinic hours from the environment, falling back to the defaults
    /// field by field. A malformed value logs a warning and keeps the default
    /// rather than aborting startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            start_hour: env_hour("CLINIC_OPEN_HOUR", defaults.start_hour),
            end_hour: env_hour("CLINIC_CLOSE_HOUR", defaults.end_hour),
            lunch_start_hour: env_hour("CLINIC_LUNCH_START_HOUR", defaults.lunch_start_hour),
            lunch_end_hour: env_hour("CLINIC_LUNCH_END_HOUR", defaults.lunch_end_hour),
            slot_duration_minutes: env::var("CLINIC_SLOT_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.slot_duration_minutes),
            working_days: env::var("CLINIC_WORKING_DAYS")
                .ok()
                .map(|v| parse_working_days(&v))
                .unwrap_or(defaults.working_days),
        }
    }
}

fn env_hour(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid hour: {}, using default {}", key, value, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_working_days(value: &str) -> Vec<Weekday> {
    value
        .split(',')
        .filter_map(|day| match day.trim().to_lowercase().as_str() {
            "mon" | "monday" => Some(Weekday::Mon),
            "tue" | "tuesday" => Some(Weekday::Tue),
            "wed" | "wednesday" => Some(Weekday::Wed),
            "thu" | "thursday" => Some(Weekday::Thu),
            "fri" | "friday" => Some(Weekday::Fri),
            "sat" | "saturday" => Some(Weekday::Sat),
            "sun" | "sunday" => Some(Weekday::Sun),
            other => {
                warn!("Unrecognized working day: {}", other);
                None
            }
        })
        .collect()
}
