//! 静态组件扫描器
//!
//! 以注册函数的形式登记组件，每次扫描都重新构建描述符，
//! 因此同一个扫描器可以用于多次启动而不会共享实例状态。

use async_trait::async_trait;
use di_abstractions::{ComponentDescriptor, ComponentScanner};
use infrastructure_common::ComponentError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type Registration =
    Arc<dyn Fn() -> Result<Arc<ComponentDescriptor>, ComponentError> + Send + Sync>;

/// 静态组件扫描器
#[derive(Clone)]
pub struct StaticComponentScanner {
    name: String,
    registrations: Vec<Registration>,
}

impl StaticComponentScanner {
    /// 创建扫描器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registrations: Vec::new(),
        }
    }

    /// 登记一个组件
    pub fn component<F>(mut self, register: F) -> Self
    where
        F: Fn() -> Arc<ComponentDescriptor> + Send + Sync + 'static,
    {
        self.registrations.push(Arc::new(move || Ok(register())));
        self
    }

    /// 登记一个可能失败的组件，例如需要校验元数据的组件
    pub fn try_component<F>(mut self, register: F) -> Self
    where
        F: Fn() -> Result<Arc<ComponentDescriptor>, ComponentError> + Send + Sync + 'static,
    {
        self.registrations.push(Arc::new(register));
        self
    }

    /// 已登记的组件数量
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// 是否没有登记任何组件
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[async_trait]
impl ComponentScanner for StaticComponentScanner {
    async fn scan(&self) -> Result<Vec<Arc<ComponentDescriptor>>, ComponentError> {
        let descriptors = self
            .registrations
            .iter()
            .map(|register| register())
            .collect::<Result<Vec<_>, _>>()?;
        debug!("扫描器 {} 发现组件 {} 个", self.name, descriptors.len());
        Ok(descriptors)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for StaticComponentScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticComponentScanner")
            .field("name", &self.name)
            .field("registrations", &self.registrations.len())
            .finish()
    }
}
