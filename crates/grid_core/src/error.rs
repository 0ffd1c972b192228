/// Request parameters rejected before any kernel is invoked.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("steps must be a positive integer, got {0}")]
    NonPositiveSteps(i64),

    #[error("steps {0} exceeds the u32 range")]
    StepsOutOfRange(i64),

    #[error("wind_speed must be a finite, non-negative number, got {0}")]
    InvalidWindSpeed(f64),

    #[error("unrecognized wind direction '{0}' (expected one of N, NE, E, SE, S, SW, W, NW)")]
    UnknownWindDirection(String),

    #[error("scenario name must not be empty")]
    EmptyScenarioName,

    #[error("at least one scenario name is required")]
    EmptyScenarioList,

    #[error("year must be a non-empty string of digits, got '{0}'")]
    InvalidYear(String),
}
