//! 依赖解析器实现
//!
//! 深度优先遍历组件依赖图，使用显式的解析链检测循环依赖，
//! 输出按依赖排序的构建计划。

use crate::proxy::DispatchProxy;
use di_abstractions::{
    ComponentDescriptor, ConstructionPlan, DependencyResolver, DependencySlot,
    ExternalDependencyResolver, PlanEntry, ResolveContext, SlotBinding, SlotShape,
};
use infrastructure_common::{DependencyError, DependencyResult, ScopeType, TypeInfo};
use std::sync::Arc;
use tracing::{debug, info};

/// 候选组件池
///
/// 扫描得到的组件与外部提供的组件合并后按（类型名, 限定名, 标记, 作用域）排序，
/// 保证解析结果与输入顺序无关。
pub struct CandidatePool {
    components: Vec<Arc<ComponentDescriptor>>,
}

impl CandidatePool {
    /// 合并并排序候选组件
    pub fn new(
        descriptors: &[Arc<ComponentDescriptor>],
        provided: &[Arc<ComponentDescriptor>],
    ) -> Self {
        let mut components: Vec<Arc<ComponentDescriptor>> =
            descriptors.iter().chain(provided).cloned().collect();
        components.sort_by(|a, b| {
            let key_a = (
                &a.type_info().name,
                a.instance_name(),
                a.marker().kind.name(),
                a.scope(),
            );
            let key_b = (
                &b.type_info().name,
                b.instance_name(),
                b.marker().kind.name(),
                b.scope(),
            );
            key_a.cmp(&key_b)
        });
        Self { components }
    }

    /// 顶层组件（不含工厂产出组件）
    pub fn components(&self) -> &[Arc<ComponentDescriptor>] {
        &self.components
    }

    /// 候选数量（含工厂产出组件）
    pub fn len(&self) -> usize {
        self.candidates().count()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// 所有候选：每个组件之后紧跟它的工厂产出组件
    pub fn candidates(&self) -> impl Iterator<Item = &Arc<ComponentDescriptor>> {
        self.components
            .iter()
            .flat_map(|component| std::iter::once(component).chain(component.factories()))
    }

    /// 按类型与限定名查找
    pub fn find_named(&self, type_info: &TypeInfo, name: &str) -> Option<Arc<ComponentDescriptor>> {
        self.candidates()
            .find(|candidate| candidate.matches_name(name) && candidate.is_assignable_to(type_info))
            .cloned()
    }

    /// 所有可赋值给指定类型的候选
    pub fn assignable(&self, type_info: &TypeInfo) -> Vec<Arc<ComponentDescriptor>> {
        self.candidates()
            .filter(|candidate| candidate.is_assignable_to(type_info))
            .cloned()
            .collect()
    }
}

/// 默认依赖解析器
pub struct DefaultDependencyResolver {
    external_resolvers: Vec<Arc<dyn ExternalDependencyResolver>>,
    proxy_type: TypeInfo,
}

impl Default for DefaultDependencyResolver {
    fn default() -> Self {
        Self {
            external_resolvers: Vec::new(),
            proxy_type: TypeInfo::of::<DispatchProxy>(),
        }
    }
}

impl DefaultDependencyResolver {
    /// 创建新的解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置代理对象的类型，取自所用的代理工厂
    pub fn with_proxy_type(mut self, proxy_type: TypeInfo) -> Self {
        self.proxy_type = proxy_type;
        self
    }

    /// 添加外部依赖解析器，按添加顺序询问
    pub fn with_external_resolver(mut self, resolver: Arc<dyn ExternalDependencyResolver>) -> Self {
        self.external_resolvers.push(resolver);
        self
    }

    /// 批量添加外部依赖解析器
    pub fn with_external_resolvers(
        mut self,
        resolvers: impl IntoIterator<Item = Arc<dyn ExternalDependencyResolver>>,
    ) -> Self {
        self.external_resolvers.extend(resolvers);
        self
    }

    fn resolve_one(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
        pool: &CandidatePool,
        plan: &mut ConstructionPlan,
        context: &mut ResolveContext,
    ) -> DependencyResult<()> {
        context.push(descriptor)?;
        if plan.contains(&descriptor.identity()) {
            context.pop();
            return Ok(());
        }
        debug!(
            "解析组件: {} (深度 {})",
            descriptor.display_name(),
            context.depth()
        );

        // 拦截器组件必须先于被拦截的组件构建
        for handler in descriptor.interceptor_handlers() {
            let producer = producer_of(&handler)?;
            self.resolve_one(&producer, pool, plan, context)?;
        }

        let mut constructor_bindings = Vec::with_capacity(descriptor.constructor_slots().len());
        for slot in descriptor.constructor_slots() {
            let binding = self.bind_slot(descriptor, slot, pool)?;
            self.resolve_bound(&binding, pool, plan, context)?;
            constructor_bindings.push(binding);
        }

        let mut field_bindings = Vec::with_capacity(descriptor.field_slots().len());
        for field in descriptor.field_slots() {
            let binding = self.bind_slot(descriptor, &field.slot, pool)?;
            self.resolve_bound(&binding, pool, plan, context)?;
            field_bindings.push(binding);
        }

        context.pop();
        debug!("组件解析完成: {}", descriptor.display_name());
        plan.push(PlanEntry {
            descriptor: descriptor.clone(),
            constructor_bindings,
            field_bindings,
        });
        Ok(())
    }

    /// 递归解析已绑定的组件，工厂产出组件换成它的根组件
    fn resolve_bound(
        &self,
        binding: &SlotBinding,
        pool: &CandidatePool,
        plan: &mut ConstructionPlan,
        context: &mut ResolveContext,
    ) -> DependencyResult<()> {
        for bound in binding.descriptors() {
            let producer = producer_of(bound)?;
            self.resolve_one(&producer, pool, plan, context)?;
        }
        Ok(())
    }

    fn bind_slot(
        &self,
        owner: &ComponentDescriptor,
        slot: &DependencySlot,
        pool: &CandidatePool,
    ) -> DependencyResult<SlotBinding> {
        let binding = self.match_slot(owner, slot, pool)?;
        let as_type = &slot.required_type;
        for bound in binding.descriptors() {
            self.ensure_proxy_view(owner, slot, bound, as_type)?;
        }
        Ok(binding)
    }

    /// 代理作用域组件只能以代理类型或以代理为来源的别名注入
    fn ensure_proxy_view(
        &self,
        owner: &ComponentDescriptor,
        slot: &DependencySlot,
        target: &ComponentDescriptor,
        as_type: &TypeInfo,
    ) -> DependencyResult<()> {
        if target.scope() != ScopeType::Proxy || as_type == &self.proxy_type {
            return Ok(());
        }
        let viewable = target
            .aliases()
            .iter()
            .any(|alias| &alias.type_info == as_type && alias.source == self.proxy_type);
        if viewable {
            return Ok(());
        }
        Err(DependencyError::ProxyViewUnavailable {
            component: owner.type_info().name.clone(),
            dependency: slot.describe(),
            target: target.display_name(),
        })
    }

    fn match_slot(
        &self,
        owner: &ComponentDescriptor,
        slot: &DependencySlot,
        pool: &CandidatePool,
    ) -> DependencyResult<SlotBinding> {
        let as_type = slot.required_type.clone();

        // 限定名优先，命中后不再做歧义检查
        if let Some(qualifier) = &slot.qualifier {
            if let Some(found) = pool.find_named(&slot.required_type, qualifier) {
                debug!(
                    "限定名匹配: {} -> {}",
                    slot.describe(),
                    found.display_name()
                );
                return Ok(match slot.shape {
                    SlotShape::Single => SlotBinding::Component {
                        descriptor: found,
                        as_type,
                    },
                    SlotShape::Collection => SlotBinding::Collection {
                        descriptors: vec![found],
                        as_type,
                    },
                });
            }
            if slot.required {
                return Err(DependencyError::QualifierNotFound {
                    component: owner.type_info().name.clone(),
                    dependency: slot.describe(),
                    qualifier: qualifier.clone(),
                });
            }
            return self.external_or_absent(owner, slot);
        }

        let candidates = pool.assignable(&slot.required_type);
        match slot.shape {
            SlotShape::Collection => Ok(SlotBinding::Collection {
                descriptors: candidates,
                as_type,
            }),
            SlotShape::Single => match candidates.len() {
                0 => self.external_or_absent(owner, slot),
                1 => Ok(SlotBinding::Component {
                    descriptor: candidates[0].clone(),
                    as_type,
                }),
                _ => Err(DependencyError::AmbiguousDependency {
                    component: owner.type_info().name.clone(),
                    dependency: slot.describe(),
                    candidates: candidates.iter().map(|c| c.display_name()).collect(),
                }),
            },
        }
    }

    fn external_or_absent(
        &self,
        owner: &ComponentDescriptor,
        slot: &DependencySlot,
    ) -> DependencyResult<SlotBinding> {
        if let Some(resolver) = self
            .external_resolvers
            .iter()
            .find(|resolver| resolver.can_resolve(slot))
        {
            let value = resolver
                .resolve(slot)
                .map_err(|source| DependencyError::InstantiationFailure {
                    type_name: owner.type_info().name.clone(),
                    source,
                })?;
            debug!("外部解析器提供依赖: {}", slot.describe());
            return Ok(SlotBinding::External { value });
        }
        if slot.required {
            return Err(DependencyError::UnresolvedDependency {
                component: owner.type_info().name.clone(),
                dependency: slot.describe(),
            });
        }
        debug!("可缺省依赖未找到提供者: {}", slot.describe());
        Ok(SlotBinding::Absent)
    }
}

impl DependencyResolver for DefaultDependencyResolver {
    fn resolve(
        &self,
        descriptors: &[Arc<ComponentDescriptor>],
        provided: &[Arc<ComponentDescriptor>],
    ) -> DependencyResult<ConstructionPlan> {
        let pool = CandidatePool::new(descriptors, provided);
        info!("开始解析依赖，候选组件 {} 个", pool.len());

        let mut plan = ConstructionPlan::new();
        let mut context = ResolveContext::new();
        for descriptor in pool.components() {
            self.resolve_one(descriptor, &pool, &mut plan, &mut context)?;
        }

        info!("依赖解析完成，构建计划包含 {} 个组件", plan.len());
        Ok(plan)
    }
}

fn producer_of(descriptor: &Arc<ComponentDescriptor>) -> DependencyResult<Arc<ComponentDescriptor>> {
    ComponentDescriptor::producer_of(descriptor).ok_or_else(|| {
        DependencyError::instantiation(descriptor.type_info().name.clone(), "工厂组件的根组件已释放")
    })
}
