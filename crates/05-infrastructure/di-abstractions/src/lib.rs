//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件描述模型和各类能力接口。
//!
//! ## 数据模型
//!
//! - [`ComponentDescriptor`] - 组件描述符（普通组件与工厂产出组件）
//! - [`DependencySlot`] / [`SlotBinding`] - 依赖槽位及其解析结果
//! - [`InterceptorBinding`] - 标记与拦截器组件的绑定
//! - [`ConstructionPlan`] - 按依赖排序的构建计划
//!
//! ## 核心接口
//!
//! - [`DependencyResolver`] - 依赖解析器接口
//! - [`ExternalDependencyResolver`] - 外部依赖解析器扩展点
//! - [`ProxyFactory`] - 代理创建能力
//! - [`MethodInterceptor`] / [`InvocationChain`] - 方法拦截
//! - [`ComponentScanner`] - 组件扫描器接口
//! - [`ComponentRegistry`] - 组件查询接口
//!
//! ## 代理作用域组件的注入
//!
//! 代理作用域组件对外暴露的是代理对象而不是真实实例，依赖它的槽位无法按组件自身类型取值。
//! 需要以 trait 身份注入时，用 [`ComponentBuilder::alias_via`] 声明由代理转换出的别名：
//!
//! ```ignore
//! ComponentDescriptor::builder::<English>()
//!     .scope(ScopeType::Proxy)
//!     .alias_via::<DispatchProxy, dyn Greeter>(|p| Arc::new(ProxyGreeter(p)) as Arc<dyn Greeter>)
//! ```
//!
//! `ProxyGreeter` 通过 `DispatchProxy::invoke_as` 转发调用，拦截链因此生效。
//! 没有这类别名时，解析阶段返回 [`DependencyError::ProxyViewUnavailable`](infrastructure_common::DependencyError::ProxyViewUnavailable)。

pub mod descriptor;
pub mod interceptor;
pub mod plan;
pub mod proxy;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod slot;

pub use descriptor::*;
pub use interceptor::*;
pub use plan::*;
pub use proxy::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
pub use slot::*;
