use std::time::Duration;

use pretty_duration::pretty_duration;
use serde::{Deserialize, Serialize};

/// Console output style for structured values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Format {
    None,

    Yaml,

    Json,
}

impl Format {
    pub fn format(name: &str) -> Format {
        match name.to_lowercase().as_str() {
            "json" => Format::Json,
            "yaml" | "yml" => Format::Yaml,
            _ => Format::None,
        }
    }
}

pub fn to_string_pretty<T: Serialize + std::fmt::Debug>(format: &Format, value: &T) -> String {
    match format {
        Format::None => format!("{:?}", value),
        Format::Yaml => serde_yaml::to_string(value).unwrap_or_else(|_| format!("{:?}", value)),
        Format::Json => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| format!("{:?}", value))
        }
    }
}

pub fn to_duration_pretty(duration: &Duration) -> String {
    pretty_duration(duration, None)
}
