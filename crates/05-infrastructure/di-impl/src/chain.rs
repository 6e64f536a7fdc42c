//! 拦截链构建
//!
//! 最内层节点直接调用真实实例上的方法，每个拦截器绑定包裹前一个节点。
//! 先注册的拦截器位于外层：绑定 `[A, B]` 的执行顺序是 A 包裹 B 包裹真实调用。

use crate::proxy::ProxyError;
use di_abstractions::{
    Instance, InterceptorBinding, InvocationChain, MethodDescriptor, MethodInterceptor, MethodKey,
    Value,
};
use infrastructure_common::{BoxError, Marker};
use std::sync::Arc;

/// 最内层节点：调用真实方法
struct TargetInvocation<'a> {
    method: &'a MethodDescriptor,
    target: &'a Instance,
    args: &'a [Value],
}

impl InvocationChain for TargetInvocation<'_> {
    fn proceed(&self) -> Result<Value, BoxError> {
        (self.method.invoke)(self.target, self.args)
    }
}

/// 拦截器节点
struct InterceptorNode<'a> {
    interceptor: Arc<dyn MethodInterceptor>,
    marker: &'a Marker,
    method: &'a MethodKey,
    args: &'a [Value],
    next: Box<dyn InvocationChain + 'a>,
}

impl InvocationChain for InterceptorNode<'_> {
    fn proceed(&self) -> Result<Value, BoxError> {
        self.interceptor
            .intercept(self.marker, self.method, self.args, self.next.as_ref())
    }
}

/// 为一次方法调用构建拦截链，返回最外层节点
pub fn build_chain<'a>(
    method: &'a MethodDescriptor,
    target: &'a Instance,
    args: &'a [Value],
    bindings: &'a [InterceptorBinding],
) -> Result<Box<dyn InvocationChain + 'a>, ProxyError> {
    let mut chain: Box<dyn InvocationChain + 'a> = Box::new(TargetInvocation {
        method,
        target,
        args,
    });
    for binding in bindings.iter().rev() {
        let interceptor =
            binding
                .interceptor()
                .ok_or_else(|| ProxyError::InterceptorUnavailable {
                    handler: binding.handler.display_name(),
                })?;
        chain = Box::new(InterceptorNode {
            interceptor,
            marker: &binding.marker,
            method: &method.key,
            args,
            next: chain,
        });
    }
    Ok(chain)
}

/// 调用方法：没有拦截器绑定时直接调用真实方法
pub fn invoke_method(
    method: &MethodDescriptor,
    target: &Instance,
    args: &[Value],
    bindings: &[InterceptorBinding],
) -> Result<Value, BoxError> {
    if bindings.is_empty() {
        return (method.invoke)(target, args);
    }
    let chain = build_chain(method, target, args, bindings)?;
    chain.proceed()
}
