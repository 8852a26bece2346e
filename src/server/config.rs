use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Default Bernoulli rate for the exploration sampler, overridable per
    /// request via the `exploreRate` query parameter.
    pub default_explore_probability: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            requests_logging_level: RequestsLoggingLevel::default(),
            port: 3002,
            default_explore_probability: 0.15,
        }
    }
}
