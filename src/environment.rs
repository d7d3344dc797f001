//! Environment enrichment attached to outgoing traffic
//!
//! The dispatch core never looks inside this; it is opaque context the
//! broker serializes alongside every event so the backend can segment by
//! application, plugin, platform, and locale.

use serde::{Deserialize, Serialize};

/// A named, versioned component (the host application or the reporting
/// plugin).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub version: String,
}

impl Application {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Operating system description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Context attached to every event by the broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub application: Application,
    pub plugin: Application,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }
}

/// Builder for [`Environment`], seeding platform, locale, timezone, and
/// country from the process environment where possible.
#[derive(Debug, Default)]
pub struct EnvironmentBuilder {
    application: Application,
    plugin: Application,
    platform: Option<Platform>,
    locale: Option<String>,
    timezone: Option<String>,
    country: Option<String>,
}

impl EnvironmentBuilder {
    pub fn application(mut self, application: Application) -> Self {
        self.application = application;
        self
    }

    pub fn plugin(mut self, plugin: Application) -> Self {
        self.plugin = plugin;
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn build(self) -> Environment {
        let locale = self.locale.or_else(detect_locale);
        let country = self.country.or_else(|| locale.as_deref().and_then(country_of));
        Environment {
            application: self.application,
            plugin: self.plugin,
            platform: self.platform.unwrap_or_else(detect_platform),
            timezone: self.timezone.or_else(|| std::env::var("TZ").ok()),
            locale,
            country,
        }
    }
}

fn detect_platform() -> Platform {
    Platform {
        name: std::env::consts::OS.to_string(),
        distribution: None,
        version: None,
    }
}

fn detect_locale() -> Option<String> {
    std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .ok()
        .filter(|locale| !locale.is_empty() && locale != "C")
}

/// Extract the country part of a POSIX locale string ("en_US.UTF-8" -> "US").
fn country_of(locale: &str) -> Option<String> {
    let tag = locale.split('.').next()?;
    let country = tag.split('_').nth(1)?;
    if country.len() == 2 && country.chars().all(|c| c.is_ascii_uppercase()) {
        Some(country.to_string())
    } else {
        None
    }
}
