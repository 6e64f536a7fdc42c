//! 错误类型定义

use thiserror::Error;

/// 装箱的底层错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// 创建解析错误
    pub fn parse_error(source: impl Into<BoxError>) -> Self {
        Self::ParseError {
            source: source.into(),
        }
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("检测到循环依赖: {}", trace.join(" -> "))]
    CyclicDependency { trace: Vec<String> },

    #[error("依赖无法解析: 组件 {component} 需要 {dependency}")]
    UnresolvedDependency {
        component: String,
        dependency: String,
    },

    #[error(
        "依赖存在歧义: 组件 {component} 需要 {dependency}, 候选组件: [{}], 请使用限定名指定实例",
        candidates.join(", ")
    )]
    AmbiguousDependency {
        component: String,
        dependency: String,
        candidates: Vec<String>,
    },

    #[error("限定名未找到: 组件 {component} 需要 {dependency}, 限定名: {qualifier}")]
    QualifierNotFound {
        component: String,
        dependency: String,
        qualifier: String,
    },

    #[error("组件实例化失败: {type_name}, 原因: {source}")]
    InstantiationFailure { type_name: String, source: BoxError },

    #[error("构造参数数量不匹配: {type_name}, 期望 {expected}, 实际 {actual}")]
    ArgumentCountMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("生命周期钩子执行失败: {type_name} ({hook}), 原因: {source}")]
    LifecycleHookFailure {
        type_name: String,
        hook: String,
        source: BoxError,
    },

    #[error("代理实例已创建: {type_name}")]
    ProxyAlreadyCreated { type_name: String },

    #[error(
        "无法按 {dependency} 注入代理作用域组件: 组件 {component} 依赖 {target}, 对外暴露的是代理对象, 请在 {target} 上用 alias_via::<DispatchProxy, _> 声明由代理转换出的别名"
    )]
    ProxyViewUnavailable {
        component: String,
        dependency: String,
        target: String,
    },

    #[error("未找到组件: {type_name}{}", qualifier.as_ref().map(|q| format!(" (限定名: {q})")).unwrap_or_default())]
    LookupFailure {
        type_name: String,
        qualifier: Option<String>,
    },
}

/// 依赖注入错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyErrorKind {
    /// 循环依赖
    Cycle,
    /// 无法解析
    Unresolved,
    /// 歧义
    Ambiguous,
    /// 限定名未找到
    QualifierNotFound,
    /// 实例化失败
    Instantiation,
    /// 生命周期钩子失败
    LifecycleHook,
    /// 代理重复创建
    ProxyAlreadyCreated,
    /// 代理组件缺少可注入的视图
    ProxyView,
    /// 查询失败
    Lookup,
}

impl DependencyError {
    /// 创建实例化失败错误
    pub fn instantiation(type_name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::InstantiationFailure {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 创建查询失败错误
    pub fn lookup(type_name: impl Into<String>, qualifier: Option<&str>) -> Self {
        Self::LookupFailure {
            type_name: type_name.into(),
            qualifier: qualifier.map(str::to_string),
        }
    }

    /// 错误种类
    pub fn kind(&self) -> DependencyErrorKind {
        match self {
            Self::CyclicDependency { .. } => DependencyErrorKind::Cycle,
            Self::UnresolvedDependency { .. } => DependencyErrorKind::Unresolved,
            Self::AmbiguousDependency { .. } => DependencyErrorKind::Ambiguous,
            Self::QualifierNotFound { .. } => DependencyErrorKind::QualifierNotFound,
            Self::InstantiationFailure { .. } | Self::ArgumentCountMismatch { .. } => {
                DependencyErrorKind::Instantiation
            }
            Self::LifecycleHookFailure { .. } => DependencyErrorKind::LifecycleHook,
            Self::ProxyAlreadyCreated { .. } => DependencyErrorKind::ProxyAlreadyCreated,
            Self::ProxyViewUnavailable { .. } => DependencyErrorKind::ProxyView,
            Self::LookupFailure { .. } => DependencyErrorKind::Lookup,
        }
    }

    /// 启动阶段遇到该错误时是否必须中止
    ///
    /// 查询失败只影响单次请求。
    pub fn is_fatal_to_bootstrap(&self) -> bool {
        !matches!(self, Self::LookupFailure { .. })
    }
}

/// 组件错误类型
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("组件扫描失败: {message}")]
    ScanError { message: String },

    #[error("组件元数据无效: {message}")]
    InvalidMetadata { message: String },
}

impl ComponentError {
    /// 创建扫描错误
    pub fn scan_error(message: impl Into<String>) -> Self {
        Self::ScanError {
            message: message.into(),
        }
    }

    /// 创建元数据无效错误
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("组件错误: {source}")]
    ComponentError {
        #[from]
        source: ComponentError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ComponentResult<T> = Result<T, ComponentError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
