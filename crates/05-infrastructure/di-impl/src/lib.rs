//! # 依赖注入具体实现
//!
//! 提供依赖解析、实例化、方法拦截与组件查询的实现：
//!
//! - [`DefaultDependencyResolver`] - 深度优先解析依赖图，输出按依赖排序的构建计划
//! - [`InstantiationEngine`] - 按计划构建实例，处理作用域、生命周期钩子与代理
//! - [`build_chain`] / [`invoke_method`] - 拦截链构建
//! - [`DispatchProxy`] / [`DispatchProxyFactory`] - 默认代理实现
//! - [`ApplicationContext`] - 启动完成后的组件注册表

pub mod chain;
pub mod context;
pub mod engine;
pub mod proxy;
pub mod resolver;

pub use chain::{build_chain, invoke_method};
pub use context::ApplicationContext;
pub use engine::InstantiationEngine;
pub use proxy::{DispatchProxy, DispatchProxyFactory, ProxyError};
pub use resolver::{CandidatePool, DefaultDependencyResolver};
