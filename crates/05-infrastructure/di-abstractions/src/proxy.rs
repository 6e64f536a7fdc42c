//! 代理创建能力

use crate::descriptor::{ComponentDescriptor, Instance};
use crate::slot::ConstructorArgs;
use infrastructure_common::{BoxError, TypeInfo};
use std::sync::Arc;

/// 代理工厂 trait
///
/// 核心只决定需要代理以及代理要执行的拦截链，生成可调用替身对象的机制由实现方提供。
pub trait ProxyFactory: Send + Sync {
    /// 代理对象的类型
    ///
    /// 依赖代理作用域组件的槽位只能取到这个类型的实例，或由它转换出的别名。
    fn proxy_type(&self) -> TypeInfo;

    /// 为代理作用域组件创建代理，代理调用时委托给描述符上的真实实例
    fn create_proxy(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
        constructor_args: &ConstructorArgs,
    ) -> Result<Instance, BoxError>;

    /// 为代理作用域的工厂产出组件创建接口代理
    fn create_interface_proxy(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
    ) -> Result<Instance, BoxError>;
}
