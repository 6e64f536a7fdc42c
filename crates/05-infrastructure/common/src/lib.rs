//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn IoC 运行时各层共享的基础类型。
//!
//! ## 核心类型
//!
//! - [`TypeInfo`] - 类型标识（名称 + `TypeId`）
//! - [`Marker`] / [`MarkerKind`] - 发现阶段提取出的声明式标记
//! - [`ScopeType`] - 组件作用域（单例 / 原型 / 代理）
//! - [`LifecycleState`] - 组件实例的生命周期状态
//! - [`DependencyError`] - 依赖解析与实例化的错误分类
//!
//! ## 设计原则
//!
//! - 核心层只读取预先提取好的元数据，从不反射源代码
//! - 所有失败都以类型化的错误返回
//! - 不使用全局可变状态，配置对象显式传递

pub mod errors;
pub mod lifecycle;
pub mod marker;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use marker::*;
pub use metadata::*;
