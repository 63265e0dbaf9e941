//! HTML email templates
//!
//! Three templates are compiled into the binary. A configured templates
//! directory may override any of them by file name:
//!
//! - `confirmation.html`
//! - `weather_forecast_daily.html`
//! - `weather_forecast_hourly.html`
//!
//! Links are built by the service from the configured base URL and a hex
//! token, so they are inserted unescaped.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use domain::{DayWeatherSnapshot, WeatherSnapshot};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera, Value};
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIRMATION: &str = "confirmation.html";
pub const WEATHER_FORECAST_DAILY: &str = "weather_forecast_daily.html";
pub const WEATHER_FORECAST_HOURLY: &str = "weather_forecast_hourly.html";

const ALL: [(&str, &str); 3] = [
    (CONFIRMATION, embedded::CONFIRMATION),
    (WEATHER_FORECAST_DAILY, embedded::WEATHER_FORECAST_DAILY),
    (WEATHER_FORECAST_HOURLY, embedded::WEATHER_FORECAST_HOURLY),
];

/// Error type for template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error("Template compilation failed: {0}")]
    Compile(String),

    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<tera::Error> for TemplateError {
    fn from(e: tera::Error) -> Self {
        match e.kind {
            tera::ErrorKind::TemplateNotFound(name) => Self::NotFound(name),
            _ => Self::Render(e.to_string()),
        }
    }
}

/// Template engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Directory whose files override the embedded templates by name
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

mod embedded {
    pub const CONFIRMATION: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Confirm your subscription</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6;">
    <h2>Almost there</h2>
    <p>Please confirm your weather forecast subscription:</p>
    <p><a href="{{ confirmation_link | safe }}">Confirm subscription</a></p>
    <p style="color: #666;">If you did not request this, ignore this email.</p>
</body>
</html>
"#;

    pub const WEATHER_FORECAST_DAILY: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Weather forecast for {{ city }}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6;">
    <h2>{{ city }}, {{ date }}</h2>
    <table cellpadding="6" style="border-collapse: collapse;">
        <tr><th>Time</th><th>Temperature</th><th>Humidity</th><th>Conditions</th></tr>
        {% for slot in slots %}
        <tr>
            <td>{{ slot.label }}</td>
            <td>{{ slot.weather.temperature | celsius }}</td>
            <td>{{ slot.weather.humidity }}%</td>
            <td>{{ slot.weather.description }}</td>
        </tr>
        {% endfor %}
    </table>
    <p style="color: #666;"><a href="{{ unsubscribe_link | safe }}">Unsubscribe</a></p>
</body>
</html>
"#;

    pub const WEATHER_FORECAST_HOURLY: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Weather forecast for {{ city }}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6;">
    <h2>{{ city }}, {{ date }}</h2>
    <p>Temperature: {{ weather.temperature | celsius }}</p>
    <p>Humidity: {{ weather.humidity }}%</p>
    <p>{{ weather.description }}</p>
    <p style="color: #666;"><a href="{{ unsubscribe_link | safe }}">Unsubscribe</a></p>
</body>
</html>
"#;
}

#[derive(Serialize)]
struct SlotView<'a> {
    label: &'static str,
    weather: &'a WeatherSnapshot,
}

/// Tera engine holding the three email templates
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Arc<Tera>,
    config: TemplateConfig,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TemplateEngine {
    /// Engine with the embedded templates only
    pub fn new() -> Result<Self, TemplateError> {
        Self::with_config(TemplateConfig::default())
    }

    /// Engine with embedded templates, overridden from `templates_dir`
    pub fn with_config(config: TemplateConfig) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);
        tera.register_filter("celsius", celsius_filter);

        for (name, source) in ALL {
            let source = match config.templates_dir.as_ref().map(|dir| dir.join(name)) {
                Some(path) if path.is_file() => {
                    debug!(template = name, path = %path.display(), "Loading template override");
                    std::fs::read_to_string(&path)
                        .map_err(|source| TemplateError::Io { path, source })?
                },
                _ => source.to_string(),
            };
            tera.add_raw_template(name, &source)
                .map_err(|e| TemplateError::Compile(format!("{name}: {e}")))?;
        }

        if let Some(dir) = &config.templates_dir {
            info!(dir = %dir.display(), "Email templates loaded");
        }

        Ok(Self {
            tera: Arc::new(tera),
            config,
        })
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        self.tera.render(name, context).map_err(TemplateError::from)
    }

    pub fn render_confirmation(&self, confirmation_link: &str) -> Result<String, TemplateError> {
        let mut ctx = Context::new();
        ctx.insert("confirmation_link", confirmation_link);
        self.render(CONFIRMATION, &ctx)
    }

    pub fn render_hourly_forecast(
        &self,
        city: &str,
        weather: &WeatherSnapshot,
        date: &str,
        unsubscribe_link: &str,
    ) -> Result<String, TemplateError> {
        let mut ctx = Context::new();
        ctx.insert("city", city);
        ctx.insert("weather", weather);
        ctx.insert("date", date);
        ctx.insert("unsubscribe_link", unsubscribe_link);
        self.render(WEATHER_FORECAST_HOURLY, &ctx)
    }

    /// Render the six-slot table, earliest slot first
    pub fn render_daily_forecast(
        &self,
        city: &str,
        weather: &DayWeatherSnapshot,
        date: &str,
        unsubscribe_link: &str,
    ) -> Result<String, TemplateError> {
        let slots: Vec<SlotView<'_>> = weather
            .slots()
            .map(|(slot, weather)| SlotView {
                label: slot.label(),
                weather,
            })
            .collect();

        let mut ctx = Context::new();
        ctx.insert("city", city);
        ctx.insert("slots", &slots);
        ctx.insert("date", date);
        ctx.insert("unsubscribe_link", unsubscribe_link);
        self.render(WEATHER_FORECAST_DAILY, &ctx)
    }
}

/// `21.456 | celsius` renders `21.5°C`
#[allow(clippy::unnecessary_wraps)]
fn celsius_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(value.as_f64().map_or_else(
        || value.clone(),
        |t| Value::String(format!("{t:.1}°C")),
    ))
}
