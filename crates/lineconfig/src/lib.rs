use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Lines are joined with nothing between them.
    #[default]
    Concatenate,
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub shaders: ShaderSection,
    #[serde(default)]
    pub animation: AnimationSection,
    #[serde(default)]
    pub rotation: RotationSection,
    #[serde(default)]
    pub view: ViewSection,
    #[serde(default)]
    pub window: WindowSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShaderSection {
    #[serde(default = "default_vertex")]
    pub vertex: PathBuf,
    #[serde(default = "default_fragment")]
    pub fragment: PathBuf,
    #[serde(default = "default_true")]
    pub watch: bool,
    #[serde(default)]
    pub line_join: LineJoin,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimationSection {
    #[serde(default = "default_period", deserialize_with = "deserialize_duration")]
    pub period: Duration,
    #[serde(default = "default_time_step")]
    pub time_step: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RotationSection {
    #[serde(default = "default_degrees_per_pixel")]
    pub degrees_per_pixel: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewSection {
    #[serde(default = "default_background")]
    pub background: [f32; 4],
    #[serde(default, deserialize_with = "deserialize_antialias_opt")]
    pub antialias: Option<AntialiasSetting>,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default)]
    pub shape: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowSection {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title")]
    pub title: String,
}

pub const MIN_WINDOW_WIDTH: u32 = 300;
pub const MIN_WINDOW_HEIGHT: u32 = 250;

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_vertex() -> PathBuf {
    PathBuf::from("vertexShader.glsl")
}

fn default_fragment() -> PathBuf {
    PathBuf::from("fragmentShader.glsl")
}

fn default_period() -> Duration {
    Duration::from_millis(16)
}

fn default_time_step() -> f32 {
    0.05
}

fn default_degrees_per_pixel() -> f32 {
    0.5
}

fn default_background() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_title() -> String {
    "lineview".to_owned()
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            shaders: ShaderSection::default(),
            animation: AnimationSection::default(),
            rotation: RotationSection::default(),
            view: ViewSection::default(),
            window: WindowSection::default(),
        }
    }
}

impl Default for ShaderSection {
    fn default() -> Self {
        Self {
            vertex: default_vertex(),
            fragment: default_fragment(),
            watch: true,
            line_join: LineJoin::default(),
        }
    }
}

impl Default for AnimationSection {
    fn default() -> Self {
        Self {
            period: default_period(),
            time_step: default_time_step(),
        }
    }
}

impl Default for RotationSection {
    fn default() -> Self {
        Self {
            degrees_per_pixel: default_degrees_per_pixel(),
        }
    }
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            background: default_background(),
            antialias: None,
            vsync: true,
            shape: None,
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as milliseconds or a human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map_err(|err| E::custom(format!("invalid duration {v}ms: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl LineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LineConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates a config file. Relative shader paths are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.shaders.vertex = resolve_relative(base, &config.shaders.vertex);
            config.shaders.fragment = resolve_relative(base, &config.shaders.fragment);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.shaders.vertex.as_os_str().is_empty() || self.shaders.fragment.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid(
                "shaders.vertex and shaders.fragment may not be empty".into(),
            ));
        }

        if self.animation.period.is_zero() {
            return Err(ConfigError::Invalid(
                "animation.period must be greater than zero".into(),
            ));
        }

        if !self.animation.time_step.is_finite() || self.animation.time_step <= 0.0 {
            return Err(ConfigError::Invalid(
                "animation.time_step must be a positive finite number".into(),
            ));
        }

        if !self.rotation.degrees_per_pixel.is_finite() {
            return Err(ConfigError::Invalid(
                "rotation.degrees_per_pixel must be a finite number".into(),
            ));
        }

        if self
            .view
            .background
            .iter()
            .any(|channel| !(0.0..=1.0).contains(channel))
        {
            return Err(ConfigError::Invalid(
                "view.background channels must be within 0.0..=1.0".into(),
            ));
        }

        if self.window.width < MIN_WINDOW_WIDTH || self.window.height < MIN_WINDOW_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "window must be at least {MIN_WINDOW_WIDTH}x{MIN_WINDOW_HEIGHT}, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        Ok(())
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
