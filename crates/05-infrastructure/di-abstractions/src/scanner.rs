//! 组件扫描器抽象接口
//!
//! 发现层的输出边界：扫描器交付已经填好依赖槽位的组件描述符

use crate::descriptor::ComponentDescriptor;
use async_trait::async_trait;
use infrastructure_common::ComponentError;
use std::sync::Arc;

/// 组件扫描器 trait
///
/// 用于自动发现和扫描组件
#[async_trait]
pub trait ComponentScanner: Send + Sync {
    /// 扫描并返回组件描述符
    async fn scan(&self) -> Result<Vec<Arc<ComponentDescriptor>>, ComponentError>;

    /// 获取扫描器名称
    fn name(&self) -> &str;
}
