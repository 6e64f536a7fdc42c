//! 方法拦截抽象接口

use crate::descriptor::{ComponentDescriptor, MethodKey, Value};
use infrastructure_common::{BoxError, Marker, TypeInfo};
use std::fmt;
use std::sync::Arc;

/// 调用链节点
pub trait InvocationChain {
    /// 继续执行内层调用
    fn proceed(&self) -> Result<Value, BoxError>;
}

/// 方法拦截器 trait
///
/// 拦截器本身也是组件，通过 [`ComponentBuilder::interceptor_for`](crate::ComponentBuilder::interceptor_for)
/// 声明它处理的标记种类。
pub trait MethodInterceptor: Send + Sync {
    /// 拦截一次方法调用
    ///
    /// `marker` 是方法上对应的标记实例，调用 `next.proceed()` 进入内层。
    fn intercept(
        &self,
        marker: &Marker,
        method: &MethodKey,
        args: &[Value],
        next: &dyn InvocationChain,
    ) -> Result<Value, BoxError>;
}

/// 拦截器绑定：标记实例与处理它的组件
#[derive(Clone)]
pub struct InterceptorBinding {
    /// 方法上的标记实例
    pub marker: Marker,
    /// 处理该标记的组件
    pub handler: Arc<ComponentDescriptor>,
}

impl InterceptorBinding {
    /// 创建拦截器绑定
    pub fn new(marker: Marker, handler: Arc<ComponentDescriptor>) -> Self {
        Self { marker, handler }
    }

    /// 取出处理组件的拦截器视图
    ///
    /// 使用真实实例，处理组件尚未实例化时返回 `None`。
    pub fn interceptor(&self) -> Option<Arc<dyn MethodInterceptor>> {
        let instance = self.handler.instance()?;
        let view = self
            .handler
            .view(&instance, &TypeInfo::of::<dyn MethodInterceptor>());
        view.downcast_ref::<Arc<dyn MethodInterceptor>>().cloned()
    }
}

impl fmt::Debug for InterceptorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorBinding")
            .field("marker", &self.marker.kind)
            .field("handler", &self.handler.display_name())
            .finish()
    }
}
