//! 组件作用域与生命周期状态

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件作用域类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScopeType {
    /// 单例模式 - 注册表生命周期内只有一个实例
    Singleton,
    /// 原型模式 - 首次读取返回构建时的实例，之后每次读取都创建新实例
    Prototype,
    /// 代理模式 - 对外暴露代理对象，方法调用经过拦截链
    Proxy,
}

impl ScopeType {
    /// 默认作用域
    pub const DEFAULT_SCOPE: Self = Self::Singleton;
}

impl Default for ScopeType {
    fn default() -> Self {
        Self::DEFAULT_SCOPE
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Singleton => "SINGLETON",
            Self::Prototype => "PROTOTYPE",
            Self::Proxy => "PROXY",
        };
        f.write_str(name)
    }
}

/// 组件实例的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// 未初始化
    Uninitialized,
    /// 实例已创建并可用
    Live,
    /// 已执行销毁钩子，实例已释放
    Destroyed,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// 生命周期钩子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// 构建完成后执行
    PostConstruct,
    /// 销毁前执行
    PreDestroy,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostConstruct => f.write_str("post-construct"),
            Self::PreDestroy => f.write_str("pre-destroy"),
        }
    }
}
