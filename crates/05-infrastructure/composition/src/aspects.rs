//! 拦截器绑定
//!
//! 扫描完成后，为每个组件上带有已注册拦截器标记的方法生成拦截器绑定，
//! 有绑定的组件提升为代理作用域。

use di_abstractions::{ComponentDescriptor, InterceptorBinding, MethodInterceptor};
use infrastructure_common::{ComponentError, ComponentResult, MarkerKind, ScopeType, TypeInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 按标记种类收集拦截器组件
///
/// 同一标记种类只能有一个拦截器组件。
pub fn collect_interceptors(
    descriptors: &[Arc<ComponentDescriptor>],
) -> ComponentResult<HashMap<MarkerKind, Arc<ComponentDescriptor>>> {
    let interceptor_type = TypeInfo::of::<dyn MethodInterceptor>();
    let mut handlers: HashMap<MarkerKind, Arc<ComponentDescriptor>> = HashMap::new();
    for descriptor in descriptors {
        let Some(kind) = descriptor.handles() else {
            continue;
        };
        if !descriptor.is_assignable_to(&interceptor_type) {
            return Err(ComponentError::invalid_metadata(format!(
                "{} 声明处理 {}，但没有实现 MethodInterceptor",
                descriptor.display_name(),
                kind
            )));
        }
        if let Some(existing) = handlers.get(kind) {
            return Err(ComponentError::invalid_metadata(format!(
                "标记 {} 存在多个拦截器: {}, {}",
                kind,
                existing.display_name(),
                descriptor.display_name()
            )));
        }
        debug!("注册拦截器: {} -> {}", kind, descriptor.display_name());
        handlers.insert(kind.clone(), descriptor.clone());
    }
    Ok(handlers)
}

/// 应用拦截器绑定，返回被提升为代理作用域的组件数量
///
/// 绑定按方法上标记的声明顺序追加，拦截器组件不会拦截自身。
pub fn apply_interceptor_bindings(
    descriptors: &[Arc<ComponentDescriptor>],
) -> ComponentResult<usize> {
    let handlers = collect_interceptors(descriptors)?;
    if handlers.is_empty() {
        return Ok(0);
    }

    let mut promoted = 0;
    for descriptor in descriptors {
        let mut bound = false;
        for method in descriptor.methods() {
            for marker in &method.markers {
                let Some(handler) = handlers.get(&marker.kind) else {
                    continue;
                };
                if Arc::ptr_eq(handler, descriptor) {
                    continue;
                }
                descriptor.bind_interceptor(
                    method.key.clone(),
                    InterceptorBinding::new(marker.clone(), handler.clone()),
                );
                bound = true;
            }
        }
        if bound && descriptor.scope() != ScopeType::Proxy {
            debug!("组件提升为代理作用域: {}", descriptor.display_name());
            descriptor.set_scope(ScopeType::Proxy);
            promoted += 1;
        }
    }

    info!(
        "拦截器绑定完成: 拦截器 {} 个, 提升为代理的组件 {} 个",
        handlers.len(),
        promoted
    );
    Ok(promoted)
}
