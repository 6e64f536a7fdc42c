//! 依赖解析抽象接口
//!
//! 提供依赖图解析、外部解析器扩展点以及循环依赖检测所需的解析上下文

use crate::descriptor::{ComponentDescriptor, Instance};
use crate::plan::ConstructionPlan;
use crate::slot::DependencySlot;
use infrastructure_common::{BoxError, DependencyError, DependencyResult};
use std::sync::Arc;

/// 依赖解析器 trait
///
/// 负责把描述符集合转换为按依赖排序的构建计划
pub trait DependencyResolver: Send + Sync {
    /// 解析扫描得到的描述符与外部提供的描述符
    fn resolve(
        &self,
        descriptors: &[Arc<ComponentDescriptor>],
        provided: &[Arc<ComponentDescriptor>],
    ) -> DependencyResult<ConstructionPlan>;
}

/// 外部依赖解析器
///
/// 没有任何组件能满足单值槽位时才会被询问，用于提供不由组件承载的值。
pub trait ExternalDependencyResolver: Send + Sync {
    /// 是否能解析该槽位
    fn can_resolve(&self, slot: &DependencySlot) -> bool;

    /// 解析槽位的值
    fn resolve(&self, slot: &DependencySlot) -> Result<Instance, BoxError>;
}

/// 解析上下文
#[derive(Debug, Default)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    resolution_chain: Vec<Arc<ComponentDescriptor>>,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加组件到解析链
    ///
    /// 组件已在链上时返回循环依赖错误，轨迹从入口开始一直到重复出现的组件。
    pub fn push(&mut self, descriptor: &Arc<ComponentDescriptor>) -> DependencyResult<()> {
        let identity = descriptor.identity();
        if self
            .resolution_chain
            .iter()
            .any(|entry| entry.identity() == identity)
        {
            let mut trace: Vec<String> = self
                .resolution_chain
                .iter()
                .map(|entry| entry.display_name())
                .collect();
            trace.push(descriptor.display_name());
            return Err(DependencyError::CyclicDependency { trace });
        }
        self.resolution_chain.push(descriptor.clone());
        Ok(())
    }

    /// 从解析链中移除最后一个组件
    pub fn pop(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    /// 当前解析链
    pub fn chain(&self) -> &[Arc<ComponentDescriptor>] {
        &self.resolution_chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Left;
    struct Right;

    #[test]
    fn test_context_detects_repeat() {
        let left = ComponentDescriptor::builder::<Left>().build();
        let right = ComponentDescriptor::builder::<Right>().build();

        let mut context = ResolveContext::new();
        assert!(context.push(&left).is_ok());
        assert!(context.push(&right).is_ok());
        assert_eq!(context.depth(), 2);

        match context.push(&left) {
            Err(DependencyError::CyclicDependency { trace }) => {
                assert_eq!(trace, vec!["Left", "Right", "Left"]);
            }
            other => panic!("应检测到循环依赖: {other:?}"),
        }

        context.pop();
        assert_eq!(context.depth(), 1);
    }
}
