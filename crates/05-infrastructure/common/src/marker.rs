//! 声明式标记
//!
//! 发现阶段把组件、工厂方法和业务方法上的注解提取为 [`Marker`]，
//! 核心层只读取这些元数据。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// 标记种类
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerKind {
    /// 通用组件
    Component,
    /// 服务组件
    Service,
    /// 仓储组件
    Repository,
    /// 配置组件
    Configuration,
    /// 工厂方法产出的组件
    Bean,
    /// 用户自定义标记
    Custom(String),
}

impl MarkerKind {
    /// 默认接受的组件标记
    pub fn default_component_markers() -> Vec<Self> {
        vec![
            Self::Component,
            Self::Service,
            Self::Repository,
            Self::Configuration,
        ]
    }

    /// 从名称解析标记种类，未知名称视为自定义标记
    pub fn from_name(name: &str) -> Self {
        match name {
            "Component" => Self::Component,
            "Service" => Self::Service,
            "Repository" => Self::Repository,
            "Configuration" => Self::Configuration,
            "Bean" => Self::Bean,
            other => Self::Custom(other.to_string()),
        }
    }

    /// 标记名称
    pub fn name(&self) -> &str {
        match self {
            Self::Component => "Component",
            Self::Service => "Service",
            Self::Repository => "Repository",
            Self::Configuration => "Configuration",
            Self::Bean => "Bean",
            Self::Custom(name) => name,
        }
    }

    /// 创建自定义标记种类
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// 标记实例
///
/// 除种类外还携带注解上声明的属性值，拦截器执行时可以读取。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// 标记种类
    pub kind: MarkerKind,
    /// 标记属性
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Marker {
    /// 创建不带属性的标记
    pub fn new(kind: MarkerKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// `@Component` 标记
    pub fn component() -> Self {
        Self::new(MarkerKind::Component)
    }

    /// `@Service` 标记
    pub fn service() -> Self {
        Self::new(MarkerKind::Service)
    }

    /// `@Bean` 标记
    pub fn bean() -> Self {
        Self::new(MarkerKind::Bean)
    }

    /// 自定义标记
    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(MarkerKind::custom(name))
    }

    /// 添加属性
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 读取属性
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// 判断是否为指定种类
    pub fn is(&self, kind: &MarkerKind) -> bool {
        &self.kind == kind
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::component()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_marker_kind_from_name() {
        assert_eq!(MarkerKind::from_name("Service"), MarkerKind::Service);
        assert_eq!(
            MarkerKind::from_name("Timed"),
            MarkerKind::Custom("Timed".to_string())
        );
        assert_eq!(MarkerKind::custom("Timed").name(), "Timed");
    }

    #[test]
    fn test_marker_attributes() {
        let marker = Marker::custom("Retry").with_attribute("times", 3);
        assert_eq!(marker.attribute("times"), Some(&json!(3)));
        assert!(marker.is(&MarkerKind::custom("Retry")));
        assert_eq!(marker.to_string(), "@Retry");
    }
}
