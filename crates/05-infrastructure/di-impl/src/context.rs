//! 应用上下文
//!
//! 启动完成后的组件注册表。组件按构建计划的顺序保存，每个组件之后紧跟它的工厂产出组件。

use crate::engine::InstantiationEngine;
use crate::proxy::DispatchProxy;
use dashmap::DashMap;
use di_abstractions::{
    ComponentDescriptor, ComponentRegistry, ConstructionPlan, Injected, Instance,
};
use infrastructure_common::{
    DependencyError, DependencyResult, LifecycleState, MarkerKind, TypeInfo,
};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

type LookupKey = (TypeId, Option<String>);

/// 应用上下文
pub struct ApplicationContext {
    components_and_beans: Vec<Arc<ComponentDescriptor>>,
    engine: InstantiationEngine,
    lookup_cache: DashMap<LookupKey, Arc<ComponentDescriptor>>,
}

impl ApplicationContext {
    /// 按计划实例化全部组件并创建上下文
    ///
    /// 任一组件失败时整个启动失败，不返回部分构建的上下文。
    pub fn from_plan(plan: &ConstructionPlan, engine: InstantiationEngine) -> DependencyResult<Self> {
        engine.materialize(plan)?;
        let components_and_beans: Vec<_> = plan
            .iter()
            .flat_map(|entry| {
                std::iter::once(entry.descriptor.clone())
                    .chain(entry.descriptor.factories().iter().cloned())
            })
            .collect();
        info!("应用上下文已创建，组件数量: {}", components_and_beans.len());
        Ok(Self {
            components_and_beans,
            engine,
            lookup_cache: DashMap::new(),
        })
    }

    /// 全部组件描述符
    pub fn descriptors(&self) -> &[Arc<ComponentDescriptor>] {
        &self.components_and_beans
    }

    /// 实例化引擎
    pub fn engine(&self) -> &InstantiationEngine {
        &self.engine
    }

    /// 查找第一个可赋值给指定类型、且限定名匹配（忽略大小写）的组件
    pub fn find(
        &self,
        type_info: &TypeInfo,
        name: Option<&str>,
    ) -> DependencyResult<Arc<ComponentDescriptor>> {
        let key = (type_info.id, name.map(str::to_lowercase));
        if let Some(cached) = self.lookup_cache.get(&key) {
            return Ok(cached.clone());
        }
        let found = self
            .components_and_beans
            .iter()
            .find(|d| d.is_assignable_to(type_info) && name.map_or(true, |n| d.matches_name(n)))
            .cloned()
            .ok_or_else(|| DependencyError::lookup(type_info.name.clone(), name))?;
        debug!("组件查询命中: {} -> {}", type_info.short_name(), found.display_name());
        self.lookup_cache.insert(key, found.clone());
        Ok(found)
    }

    /// 获取具体类型的组件
    pub fn get<T: Any + Send + Sync>(&self) -> DependencyResult<Arc<T>> {
        self.get_named_opt::<T>(None)
    }

    /// 按类型与限定名获取组件
    pub fn get_named<T: Any + Send + Sync>(&self, name: &str) -> DependencyResult<Arc<T>> {
        self.get_named_opt::<T>(Some(name))
    }

    fn get_named_opt<T: Any + Send + Sync>(&self, name: Option<&str>) -> DependencyResult<Arc<T>> {
        let type_info = TypeInfo::of::<T>();
        let instance = self.get_by_type(&type_info, name)?;
        Injected::One(instance)
            .get::<T>()
            .ok_or_else(|| DependencyError::lookup(type_info.name, name))
    }

    /// 按 trait 对象类型获取组件
    pub fn get_dyn<A: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<Arc<A>> {
        let type_info = TypeInfo::of::<A>();
        let instance = self.get_by_type(&type_info, None)?;
        Injected::One(instance)
            .get_dyn::<A>()
            .ok_or_else(|| DependencyError::lookup(type_info.name, None))
    }

    /// 获取所有具体类型的组件
    pub fn get_all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        Injected::Many(self.implementations(&TypeInfo::of::<T>())).all::<T>()
    }

    /// 获取所有实现了指定 trait 的组件
    pub fn get_all_dyn<A: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<A>> {
        Injected::Many(self.implementations(&TypeInfo::of::<A>())).all_dyn::<A>()
    }

    /// 获取组件的分派代理
    pub fn proxy_of(&self, type_info: &TypeInfo) -> DependencyResult<Arc<DispatchProxy>> {
        self.find(type_info, None)?
            .proxy()
            .and_then(|proxy| proxy.downcast::<DispatchProxy>().ok())
            .ok_or_else(|| DependencyError::lookup(type_info.name.clone(), None))
    }

    /// 按类型获取一个新实例
    pub fn new_instance_of<T: Any + Send + Sync>(&self) -> DependencyResult<Arc<T>> {
        let type_info = TypeInfo::of::<T>();
        let instance = self.new_instance(&type_info, None)?;
        Injected::One(instance)
            .get::<T>()
            .ok_or_else(|| DependencyError::lookup(type_info.name, None))
    }

    /// 读取实例，已销毁的组件视为不存在
    fn live_instance(&self, descriptor: &ComponentDescriptor) -> DependencyResult<Instance> {
        if descriptor.lifecycle() == LifecycleState::Destroyed {
            debug!("组件已销毁: {}", descriptor.display_name());
            return Err(DependencyError::lookup(
                descriptor.type_info().name.clone(),
                descriptor.instance_name(),
            ));
        }
        self.engine.instance_of(descriptor)
    }

    fn declares(descriptor: &ComponentDescriptor, type_info: &TypeInfo) -> bool {
        descriptor.type_info() == type_info
            || descriptor.aliases().iter().any(|a| &a.type_info == type_info)
    }

    fn with_marker<'a>(
        &'a self,
        kind: &'a MarkerKind,
    ) -> impl Iterator<Item = &'a Arc<ComponentDescriptor>> + 'a {
        self.components_and_beans
            .iter()
            .filter(move |d| d.marker().is(kind))
    }
}

impl ComponentRegistry for ApplicationContext {
    fn definition_names(&self) -> Vec<String> {
        self.components_and_beans
            .iter()
            .map(|d| d.type_info().short_name().to_string())
            .collect()
    }

    fn definition_count(&self) -> usize {
        self.components_and_beans.len()
    }

    fn get_by_name(&self, name: &str) -> DependencyResult<Instance> {
        let descriptor = self
            .components_and_beans
            .iter()
            .find(|d| d.instance_name() == Some(name))
            .ok_or_else(|| DependencyError::lookup("<any>", Some(name)))?;
        self.live_instance(descriptor)
    }

    fn get_by_type(&self, type_info: &TypeInfo, name: Option<&str>) -> DependencyResult<Instance> {
        let descriptor = self.find(type_info, name)?;
        let instance = self.live_instance(&descriptor)?;
        Ok(descriptor.view(&instance, type_info))
    }

    fn implementations(&self, type_info: &TypeInfo) -> Vec<Instance> {
        self.components_and_beans
            .iter()
            .filter(|d| Self::declares(d, type_info))
            .filter_map(|d| {
                self.live_instance(d)
                    .ok()
                    .map(|instance| d.view(&instance, type_info))
            })
            .collect()
    }

    fn beans_with_marker(&self, kind: &MarkerKind) -> BTreeMap<String, Instance> {
        self.with_marker(kind)
            .filter_map(|d| {
                d.exposed()
                    .map(|instance| (d.type_info().short_name().to_lowercase(), instance))
            })
            .collect()
    }

    fn bean_names_for_marker(&self, kind: &MarkerKind) -> Vec<String> {
        self.with_marker(kind)
            .map(|d| d.type_info().short_name().to_string())
            .collect()
    }

    fn new_instance(&self, type_info: &TypeInfo, name: Option<&str>) -> DependencyResult<Instance> {
        let descriptor = self.find(type_info, name)?;
        let instance = self.engine.create_new_instance(&descriptor)?;
        Ok(descriptor.view(&instance, type_info))
    }

    fn update(
        &self,
        type_info: &TypeInfo,
        instance: Instance,
        destroy_old: bool,
    ) -> DependencyResult<()> {
        let descriptor = self.find(type_info, None)?;
        self.engine.update(&descriptor, instance, destroy_old)
    }

    fn reload(&self, type_info: &TypeInfo) -> DependencyResult<()> {
        let descriptor = self.find(type_info, None)?;
        self.engine.reload(&descriptor)
    }

    fn destroy(&self, type_info: &TypeInfo) -> DependencyResult<()> {
        let descriptor = self.find(type_info, None)?;
        self.engine.destroy(&descriptor)
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field(
                "components",
                &self
                    .components_and_beans
                    .iter()
                    .map(|d| d.display_name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
