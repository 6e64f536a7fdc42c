//! 实例化引擎
//!
//! 按构建计划的顺序创建实例：构造、字段注入、构建完成钩子、代理、工厂产出组件，
//! 最后把槽位绑定记录在描述符上，供原型作用域和重载复用。

use crate::proxy::DispatchProxyFactory;
use di_abstractions::{
    ComponentDescriptor, ConstructionPlan, ConstructorArgs, DescriptorKind, Injected, Instance,
    PlanEntry, ProxyFactory, SlotBinding,
};
use infrastructure_common::{
    DependencyError, DependencyResult, HookKind, LifecycleState, ScopeType,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// 实例化引擎
#[derive(Clone)]
pub struct InstantiationEngine {
    proxy_factory: Arc<dyn ProxyFactory>,
}

impl InstantiationEngine {
    /// 使用指定的代理工厂创建引擎
    pub fn new(proxy_factory: Arc<dyn ProxyFactory>) -> Self {
        Self { proxy_factory }
    }

    /// 按计划顺序实例化所有组件
    pub fn materialize(&self, plan: &ConstructionPlan) -> DependencyResult<()> {
        info!("开始实例化组件，共 {} 个", plan.len());
        for entry in plan {
            self.materialize_entry(entry)?;
        }
        info!("组件实例化完成");
        Ok(())
    }

    fn materialize_entry(&self, entry: &PlanEntry) -> DependencyResult<()> {
        let descriptor = &entry.descriptor;
        let needs_instance = descriptor.instance().is_none();
        let needs_proxy = descriptor.scope() == ScopeType::Proxy && descriptor.proxy().is_none();

        if needs_instance || needs_proxy {
            let args = self.constructor_args(&entry.constructor_bindings)?;
            if needs_instance {
                let instance = self.construct(descriptor, &args, &entry.field_bindings)?;
                descriptor.set_instance(instance);
            }
            if needs_proxy {
                let proxy = self
                    .proxy_factory
                    .create_proxy(descriptor, &args)
                    .map_err(|source| instantiation_failure(descriptor, source))?;
                descriptor.set_proxy(proxy)?;
                debug!("代理已创建: {}", descriptor.display_name());
            }
        }

        for factory in descriptor.factories() {
            self.materialize_factory(factory)?;
        }

        descriptor.record_bindings(
            entry.constructor_bindings.clone(),
            entry.field_bindings.clone(),
        );
        Ok(())
    }

    fn materialize_factory(&self, factory: &Arc<ComponentDescriptor>) -> DependencyResult<()> {
        if factory.instance().is_none() {
            let product = self.produce(factory)?;
            factory.set_instance(product);
            debug!("工厂组件已创建: {}", factory.display_name());
        }
        if factory.scope() == ScopeType::Proxy && factory.proxy().is_none() {
            let proxy = self
                .proxy_factory
                .create_interface_proxy(factory)
                .map_err(|source| instantiation_failure(factory, source))?;
            factory.set_proxy(proxy)?;
            debug!("接口代理已创建: {}", factory.display_name());
        }
        Ok(())
    }

    /// 调用构造器、注入字段并执行构建完成钩子
    fn construct(
        &self,
        descriptor: &ComponentDescriptor,
        args: &ConstructorArgs,
        field_bindings: &[SlotBinding],
    ) -> DependencyResult<Instance> {
        let constructor = descriptor.constructor().ok_or_else(|| {
            DependencyError::instantiation(descriptor.type_info().name.clone(), "组件没有可用的构造器")
        })?;
        if constructor.arity != args.len() {
            return Err(DependencyError::ArgumentCountMismatch {
                type_name: descriptor.type_info().name.clone(),
                expected: constructor.arity,
                actual: args.len(),
            });
        }
        let instance =
            (constructor.invoke)(args).map_err(|source| instantiation_failure(descriptor, source))?;

        for (field, binding) in descriptor.field_slots().iter().zip(field_bindings) {
            let value = self.injected(binding)?;
            (field.inject)(&instance, value)
                .map_err(|source| instantiation_failure(descriptor, source))?;
        }

        self.run_hook(descriptor, &instance, HookKind::PostConstruct)?;
        debug!("组件实例已创建: {}", descriptor.display_name());
        Ok(instance)
    }

    /// 在根组件的真实实例上调用工厂方法
    fn produce(&self, factory: &ComponentDescriptor) -> DependencyResult<Instance> {
        let DescriptorKind::Factory { method, .. } = factory.kind() else {
            return Err(DependencyError::instantiation(
                factory.type_info().name.clone(),
                "不是工厂组件",
            ));
        };
        let root = factory.root().ok_or_else(|| {
            DependencyError::instantiation(factory.type_info().name.clone(), "工厂组件的根组件已释放")
        })?;
        let root_instance = root.instance().ok_or_else(|| {
            DependencyError::instantiation(
                factory.type_info().name.clone(),
                format!("根组件尚未实例化: {}", root.display_name()),
            )
        })?;
        let product = method(&root_instance).map_err(|source| instantiation_failure(factory, source))?;
        self.run_hook(factory, &product, HookKind::PostConstruct)?;
        Ok(product)
    }

    fn run_hook(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
        kind: HookKind,
    ) -> DependencyResult<()> {
        let hook = match kind {
            HookKind::PostConstruct => descriptor.post_construct(),
            HookKind::PreDestroy => descriptor.pre_destroy(),
        };
        if let Some(hook) = hook {
            hook(instance).map_err(|source| DependencyError::LifecycleHookFailure {
                type_name: descriptor.type_info().name.clone(),
                hook: kind.to_string(),
                source,
            })?;
            debug!("{} 钩子已执行: {}", kind, descriptor.display_name());
        }
        Ok(())
    }

    fn constructor_args(&self, bindings: &[SlotBinding]) -> DependencyResult<ConstructorArgs> {
        let values = bindings
            .iter()
            .map(|binding| self.injected(binding))
            .collect::<DependencyResult<Vec<_>>>()?;
        Ok(ConstructorArgs::new(values))
    }

    /// 把槽位绑定转换为注入值，依赖组件按作用域语义读取
    fn injected(&self, binding: &SlotBinding) -> DependencyResult<Injected> {
        match binding {
            SlotBinding::Component {
                descriptor,
                as_type,
            } => {
                let instance = self.instance_of(descriptor)?;
                Ok(Injected::One(descriptor.view(&instance, as_type)))
            }
            SlotBinding::Collection {
                descriptors,
                as_type,
            } => {
                let mut items = Vec::with_capacity(descriptors.len());
                for descriptor in descriptors {
                    let instance = self.instance_of(descriptor)?;
                    items.push(descriptor.view(&instance, as_type));
                }
                Ok(Injected::Many(items))
            }
            SlotBinding::External { value } => Ok(Injected::One(value.clone())),
            SlotBinding::Absent => Ok(Injected::Absent),
        }
    }

    /// 按作用域语义读取组件实例
    ///
    /// 原型作用域：第一次读取返回构建时的实例，之后每次读取都创建新实例且不缓存。
    /// 其他作用域：有代理时返回代理，否则返回真实实例。
    pub fn instance_of(&self, descriptor: &ComponentDescriptor) -> DependencyResult<Instance> {
        {
            let mut state = descriptor.lock_state();
            let Some(exposed) = state.exposed() else {
                return Err(DependencyError::instantiation(
                    descriptor.type_info().name.clone(),
                    format!("依赖组件尚未实例化: {}", descriptor.display_name()),
                ));
            };
            if descriptor.scope() != ScopeType::Prototype || !state.served {
                if descriptor.scope() == ScopeType::Prototype {
                    state.served = true;
                }
                return Ok(exposed);
            }
        }
        self.create_new_instance(descriptor)
    }

    /// 使用记录的绑定创建一个新实例，不替换描述符上保存的实例
    pub fn create_new_instance(&self, descriptor: &ComponentDescriptor) -> DependencyResult<Instance> {
        match descriptor.kind() {
            DescriptorKind::Factory { .. } => self.produce(descriptor),
            DescriptorKind::Component { .. } => {
                let (constructor_bindings, field_bindings) =
                    descriptor.recorded_bindings().ok_or_else(|| {
                        DependencyError::instantiation(
                            descriptor.type_info().name.clone(),
                            "组件尚未完成依赖绑定",
                        )
                    })?;
                let args = self.constructor_args(&constructor_bindings)?;
                self.construct(descriptor, &args, &field_bindings)
            }
        }
    }

    /// 执行销毁前钩子并释放实例
    pub fn destroy(&self, descriptor: &ComponentDescriptor) -> DependencyResult<()> {
        let Some(instance) = descriptor.instance() else {
            return Ok(());
        };
        self.run_hook(descriptor, &instance, HookKind::PreDestroy)?;
        let mut state = descriptor.lock_state();
        state.instance = None;
        state.served = false;
        state.lifecycle = LifecycleState::Destroyed;
        info!("组件已销毁: {}", descriptor.display_name());
        Ok(())
    }

    /// 销毁后用记录的绑定重新构建
    ///
    /// 重载前取得的引用仍指向原来的实例。
    pub fn reload(&self, descriptor: &ComponentDescriptor) -> DependencyResult<()> {
        self.destroy(descriptor)?;
        let instance = self.create_new_instance(descriptor)?;
        descriptor.set_instance(instance);
        info!("组件已重载: {}", descriptor.display_name());
        Ok(())
    }

    /// 替换实例，可选先销毁旧实例
    pub fn update(
        &self,
        descriptor: &ComponentDescriptor,
        instance: Instance,
        destroy_old: bool,
    ) -> DependencyResult<()> {
        if destroy_old {
            self.destroy(descriptor)?;
        }
        descriptor.set_instance(instance);
        info!("组件实例已更新: {}", descriptor.display_name());
        Ok(())
    }
}

impl Default for InstantiationEngine {
    fn default() -> Self {
        Self::new(Arc::new(DispatchProxyFactory::new()))
    }
}

impl fmt::Debug for InstantiationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiationEngine").finish_non_exhaustive()
    }
}

fn instantiation_failure(
    descriptor: &ComponentDescriptor,
    source: infrastructure_common::BoxError,
) -> DependencyError {
    DependencyError::InstantiationFailure {
        type_name: descriptor.type_info().name.clone(),
        source,
    }
}
