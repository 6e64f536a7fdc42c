//! 容器设置加载
//!
//! 从可选的配置文件与 `IOC__` 前缀的环境变量加载可序列化的设置，
//! 再应用到 [`ContainerConfiguration`] 上。

use crate::configuration::ContainerConfiguration;
use crate::logging::LoggingConfig;
use infrastructure_common::{ConfigError, ConfigResult, MarkerKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, error};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "IOC";

/// 日志设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 是否在启动时初始化日志
    pub enabled: bool,
    /// 日志级别
    pub level: String,
    /// 是否使用 JSON 格式
    pub json: bool,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名与行号
    pub show_location: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
            json: false,
            show_target: true,
            show_thread_ids: false,
            show_location: false,
        }
    }
}

impl LoggingSettings {
    /// 转换为日志配置
    pub fn to_logging_config(&self) -> ConfigResult<LoggingConfig> {
        let level = tracing::Level::from_str(&self.level).map_err(|_| {
            ConfigError::ValidationError {
                message: format!("无效的日志级别: {}", self.level),
            }
        })?;
        Ok(LoggingConfig {
            level,
            show_target: self.show_target,
            show_thread_ids: self.show_thread_ids,
            show_file: self.show_location,
            show_line_number: self.show_location,
            json_format: self.json,
        })
    }
}

/// 容器设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// 是否在独立线程中启动
    pub run_in_new_thread: bool,
    /// 额外接受的组件标记名称
    pub custom_markers: Vec<String>,
    /// 日志设置
    pub logging: LoggingSettings,
}

impl ContainerSettings {
    /// 从配置文件与 `IOC__` 环境变量加载
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// 使用指定的环境变量前缀加载
    ///
    /// 环境变量的层级分隔符是 `__`，例如 `IOC__LOGGING__LEVEL=debug`。
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("加载容器设置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("custom_markers"),
            )
            .build()
            .map_err(|e| {
                error!("容器设置构建失败: {}", e);
                ConfigError::parse_error(e)
            })?;

        let settings: Self = settings.try_deserialize().map_err(|e| {
            error!("容器设置绑定失败: {}", e);
            ConfigError::parse_error(e)
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// 校验设置
    pub fn validate(&self) -> ConfigResult<()> {
        self.logging.to_logging_config()?;
        if let Some(blank) = self.custom_markers.iter().find(|m| m.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                message: format!("组件标记名称不能为空: {:?}", blank),
            });
        }
        Ok(())
    }

    /// 应用到容器配置
    pub fn apply(&self, configuration: ContainerConfiguration) -> ContainerConfiguration {
        self.custom_markers
            .iter()
            .map(|name| MarkerKind::from_name(name.trim()))
            .fold(
                configuration.run_in_new_thread(self.run_in_new_thread),
                ContainerConfiguration::add_component_marker,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const UNUSED_PREFIX: &str = "IOC_SETTINGS_UNIT_TEST";

    #[test]
    fn test_defaults_without_sources() {
        let settings =
            ContainerSettings::load_with_prefix(None, UNUSED_PREFIX).expect("默认设置应该可用");
        assert_eq!(settings, ContainerSettings::default());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("创建临时文件失败");
        writeln!(
            file,
            r#"
run_in_new_thread = true
custom_markers = ["Controller", "Handler"]

[logging]
enabled = true
level = "debug"
json = true
"#
        )
        .expect("写入临时文件失败");

        let settings = ContainerSettings::load_with_prefix(Some(file.path()), UNUSED_PREFIX)
            .expect("加载设置应该成功");
        assert!(settings.run_in_new_thread);
        assert_eq!(settings.custom_markers, vec!["Controller", "Handler"]);
        assert!(settings.logging.enabled);

        let logging = settings
            .logging
            .to_logging_config()
            .expect("日志配置应该有效");
        assert_eq!(logging.level, tracing::Level::DEBUG);
        assert!(logging.json_format);
    }

    #[test]
    fn test_missing_file() {
        let result = ContainerSettings::load_with_prefix(
            Some(Path::new("/nonexistent/ioc-settings.toml")),
            UNUSED_PREFIX,
        );
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_invalid_level_rejected() {
        let mut file = Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("创建临时文件失败");
        write!(file, r#"{{ "logging": {{ "level": "loud" }} }}"#).expect("写入临时文件失败");

        let result = ContainerSettings::load_with_prefix(Some(file.path()), UNUSED_PREFIX);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_apply_onto_configuration() {
        let settings = ContainerSettings {
            run_in_new_thread: true,
            custom_markers: vec!["Controller".to_string()],
            logging: LoggingSettings::default(),
        };
        let configuration = settings.apply(ContainerConfiguration::new());
        assert!(configuration.general.run_in_new_thread);
        assert!(configuration.is_component_marker(&MarkerKind::custom("Controller")));
        assert!(configuration.is_component_marker(&MarkerKind::Component));
    }
}
