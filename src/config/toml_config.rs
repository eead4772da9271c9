use crate::core::routes::default_routes;
use crate::domain::model::RouteDefinition;
use crate::utils::error::{MockError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

const SUPPORTED_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub seed: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            server: None,
            routes: default_routes(),
        }
    }
}

impl MockConfig {
    /// 從 TOML 檔案載入配置，body_file 相對路徑以檔案所在目錄解析
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MockError::IoError)?;
        let mut config = Self::from_toml_str(&content)?;

        if let Some(base_dir) = path.as_ref().parent() {
            config.resolve_body_files(base_dir);
        }

        tracing::debug!(
            "Loaded {} routes from {}",
            config.routes.len(),
            path.as_ref().display()
        );
        Ok(config)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MockError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MOCK_PORT})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MockError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn resolve_body_files(&mut self, base_dir: &Path) {
        for route in &mut self.routes {
            if let Some(file) = &route.body_file {
                if file.is_relative() {
                    route.body_file = Some(base_dir.join(file));
                }
            }
        }
    }

    pub fn bind(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(DEFAULT_BIND)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        validation::validate_socket_addr("server.bind", self.bind())
    }

    pub fn seed(&self) -> Option<u64> {
        self.server.as_ref().and_then(|s| s.seed)
    }

    pub fn with_bind(mut self, bind: &str) -> Self {
        self.server.get_or_insert_with(ServerConfig::default).bind = Some(bind.to_string());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.server.get_or_insert_with(ServerConfig::default).seed = Some(seed);
        self
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.bind_addr()?;

        if self.routes.is_empty() {
            return Err(MockError::MissingConfigError {
                field: "routes".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (index, route) in self.routes.iter().enumerate() {
            let prefix = format!("routes[{}]", index);
            validate_route(&prefix, route)?;

            let key = (route.method.to_uppercase(), route.path.clone());
            if !seen.insert(key) {
                return Err(MockError::ConfigValidationError {
                    field: prefix,
                    message: format!("Duplicate route {}", route.display_name()),
                });
            }
        }

        Ok(())
    }
}

fn validate_route(prefix: &str, route: &RouteDefinition) -> Result<()> {
    let method = route.method.to_uppercase();
    if !SUPPORTED_METHODS.contains(&method.as_str()) {
        return Err(MockError::InvalidConfigValueError {
            field: format!("{}.method", prefix),
            value: route.method.clone(),
            reason: format!("Supported methods: {}", SUPPORTED_METHODS.join(", ")),
        });
    }

    validation::validate_route_path(&format!("{}.path", prefix), &route.path)?;
    validation::validate_range(&format!("{}.status", prefix), route.status(), 100, 599)?;

    match (&route.body, &route.body_file) {
        (Some(_), Some(_)) => {
            return Err(MockError::InvalidConfigValueError {
                field: format!("{}.body_file", prefix),
                value: route
                    .body_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                reason: "Use either body or body_file, not both".to_string(),
            });
        }
        (None, None) => {
            return Err(MockError::MissingConfigError {
                field: format!("{}.body", prefix),
            });
        }
        (None, Some(file)) => {
            validation::validate_non_empty_string(
                &format!("{}.body_file", prefix),
                &file.to_string_lossy(),
            )?;
        }
        (Some(_), None) => {}
    }

    if let Some(failure) = &route.failure {
        validation::validate_range(&format!("{}.failure.rate", prefix), failure.rate, 0.0, 1.0)?;
        validation::validate_range(
            &format!("{}.failure.status", prefix),
            failure.status(),
            100,
            599,
        )?;
    }

    Ok(())
}

impl Validate for MockConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
