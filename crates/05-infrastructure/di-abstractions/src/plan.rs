//! 构建计划

use crate::descriptor::{ComponentDescriptor, DescriptorIdentity};
use crate::slot::SlotBinding;
use std::sync::Arc;

/// 计划条目：组件及其已绑定的槽位
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// 组件描述符
    pub descriptor: Arc<ComponentDescriptor>,
    /// 构造参数绑定，与构造参数槽位一一对应
    pub constructor_bindings: Vec<SlotBinding>,
    /// 字段绑定，与字段槽位一一对应
    pub field_bindings: Vec<SlotBinding>,
}

impl PlanEntry {
    /// 该条目直接依赖的组件（工厂产出组件已换成其根组件）
    pub fn dependencies(&self) -> Vec<Arc<ComponentDescriptor>> {
        let mut dependencies: Vec<Arc<ComponentDescriptor>> = Vec::new();
        let bound = self
            .constructor_bindings
            .iter()
            .chain(&self.field_bindings)
            .flat_map(SlotBinding::descriptors)
            .cloned()
            .chain(self.descriptor.interceptor_handlers());
        for descriptor in bound {
            if let Some(producer) = ComponentDescriptor::producer_of(&descriptor) {
                if !dependencies.iter().any(|d| Arc::ptr_eq(d, &producer)) {
                    dependencies.push(producer);
                }
            }
        }
        dependencies
    }
}

/// 构建计划
///
/// 每个组件至多出现一次，且排在它依赖的所有组件之后。
#[derive(Debug, Clone, Default)]
pub struct ConstructionPlan {
    entries: Vec<PlanEntry>,
}

impl ConstructionPlan {
    /// 创建空计划
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加条目，相同身份的组件已存在时忽略
    pub fn push(&mut self, entry: PlanEntry) -> bool {
        if self.contains(&entry.descriptor.identity()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// 是否已包含该身份的组件
    pub fn contains(&self, identity: &DescriptorIdentity) -> bool {
        self.position(identity).is_some()
    }

    /// 组件在计划中的位置
    pub fn position(&self, identity: &DescriptorIdentity) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.descriptor.identity() == identity)
    }

    /// 计划条目
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// 计划中的组件
    pub fn descriptors(&self) -> Vec<Arc<ComponentDescriptor>> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 遍历条目
    pub fn iter(&self) -> std::slice::Iter<'_, PlanEntry> {
        self.entries.iter()
    }
}

impl IntoIterator for ConstructionPlan {
    type Item = PlanEntry;
    type IntoIter = std::vec::IntoIter<PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConstructionPlan {
    type Item = &'a PlanEntry;
    type IntoIter = std::slice::Iter<'a, PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
