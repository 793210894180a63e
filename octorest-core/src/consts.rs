//! Core constants shared across octorest components.

/// Environment variable holding the default access token.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Environment variable overriding the configured API host.
pub const ENV_API_HOST: &str = "OCTOREST_API_HOST";

/// Host name of the public GitHub service.
pub const DEFAULT_API_HOST_NAME: &str = "github.com";

/// Media type requested when a call does not ask for a specific one.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github.v3+json";

/// File name of the engine configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
