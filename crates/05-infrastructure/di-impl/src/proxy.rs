//! 分派代理
//!
//! [`DispatchProxy`] 按方法名分派调用：方法没有拦截器绑定时直接调用真实实例，
//! 否则经过拦截链。代理只持有描述符的弱引用，每次调用时读取当前的真实实例。

use crate::chain::invoke_method;
use di_abstractions::{
    ComponentDescriptor, ConstructorArgs, Instance, MethodKey, ProxyFactory, Value,
};
use infrastructure_common::{BoxError, TypeInfo};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::debug;

/// 代理调用错误
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("代理目标不可用: {type_name}")]
    TargetUnavailable { type_name: String },

    #[error("方法不存在: {type_name}::{method}")]
    UnknownMethod { type_name: String, method: String },

    #[error("拦截器不可用: {handler}")]
    InterceptorUnavailable { handler: String },

    #[error("返回值类型不匹配: {method}, 期望 {expected}")]
    ReturnTypeMismatch { method: String, expected: String },
}

/// 分派代理
pub struct DispatchProxy {
    target: Weak<ComponentDescriptor>,
    type_info: TypeInfo,
}

impl DispatchProxy {
    /// 为描述符创建代理
    pub fn new(descriptor: &Arc<ComponentDescriptor>) -> Self {
        Self {
            target: Arc::downgrade(descriptor),
            type_info: descriptor.type_info().clone(),
        }
    }

    /// 被代理组件的声明类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 调用方法
    ///
    /// 目标方法返回的错误原样传出，不做包装。
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, BoxError> {
        let descriptor = self.target.upgrade().ok_or_else(|| self.unavailable())?;
        let key = MethodKey::new(method);
        let method = descriptor
            .method(&key)
            .ok_or_else(|| ProxyError::UnknownMethod {
                type_name: self.type_info.name.clone(),
                method: key.to_string(),
            })?;
        let target = descriptor.instance().ok_or_else(|| self.unavailable())?;
        let bindings = descriptor.interceptors_for(&key);
        debug!(
            "代理调用: {}::{} (拦截器 {} 个)",
            self.type_info.short_name(),
            key,
            bindings.len()
        );
        invoke_method(method, &target, args, &bindings)
    }

    /// 调用方法并取出指定类型的返回值
    pub fn invoke_as<R: Any>(&self, method: &str, args: &[Value]) -> Result<R, BoxError> {
        let value = self.invoke(method, args)?;
        value.downcast::<R>().map(|boxed| *boxed).map_err(|_| {
            ProxyError::ReturnTypeMismatch {
                method: method.to_string(),
                expected: std::any::type_name::<R>().to_string(),
            }
            .into()
        })
    }

    fn unavailable(&self) -> ProxyError {
        ProxyError::TargetUnavailable {
            type_name: self.type_info.name.clone(),
        }
    }
}

impl fmt::Debug for DispatchProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchProxy")
            .field("type", &self.type_info.name)
            .finish()
    }
}

/// 默认代理工厂：为组件与工厂产出组件都创建 [`DispatchProxy`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchProxyFactory;

impl DispatchProxyFactory {
    /// 创建代理工厂
    pub fn new() -> Self {
        Self
    }
}

impl ProxyFactory for DispatchProxyFactory {
    fn proxy_type(&self) -> TypeInfo {
        TypeInfo::of::<DispatchProxy>()
    }

    fn create_proxy(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
        _constructor_args: &ConstructorArgs,
    ) -> Result<Instance, BoxError> {
        Ok(Arc::new(DispatchProxy::new(descriptor)))
    }

    fn create_interface_proxy(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
    ) -> Result<Instance, BoxError> {
        Ok(Arc::new(DispatchProxy::new(descriptor)))
    }
}
