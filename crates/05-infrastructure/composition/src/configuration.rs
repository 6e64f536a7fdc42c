//! 容器配置
//!
//! 显式传入启动器的配置对象，分为扫描、实例化与通用三部分。

use di_abstractions::{ComponentDescriptor, ExternalDependencyResolver, ProxyFactory};
use di_impl::{ApplicationContext, DispatchProxyFactory};
use infrastructure_common::{BoxError, MarkerKind};
use std::fmt;
use std::sync::Arc;

/// 描述符创建回调，每个被接受的描述符及其工厂产出描述符各调用一次
pub type DescriptorCallback = Arc<dyn Fn(&Arc<ComponentDescriptor>) + Send + Sync>;

/// 启动完成回调
pub type StartupCallback =
    Arc<dyn Fn(&ApplicationContext) -> Result<(), BoxError> + Send + Sync>;

/// 扫描配置
#[derive(Clone)]
pub struct ScanningConfiguration {
    /// 接受的组件标记
    pub component_markers: Vec<MarkerKind>,
    /// 描述符创建回调
    pub descriptor_callbacks: Vec<DescriptorCallback>,
}

impl Default for ScanningConfiguration {
    fn default() -> Self {
        Self {
            component_markers: MarkerKind::default_component_markers(),
            descriptor_callbacks: Vec::new(),
        }
    }
}

/// 实例化配置
#[derive(Clone)]
pub struct InstantiationConfiguration {
    /// 外部提供的组件，不经过标记过滤
    pub provided: Vec<Arc<ComponentDescriptor>>,
    /// 外部依赖解析器
    pub external_resolvers: Vec<Arc<dyn ExternalDependencyResolver>>,
    /// 代理创建能力
    pub proxy_factory: Arc<dyn ProxyFactory>,
}

impl Default for InstantiationConfiguration {
    fn default() -> Self {
        Self {
            provided: Vec::new(),
            external_resolvers: Vec::new(),
            proxy_factory: Arc::new(DispatchProxyFactory::new()),
        }
    }
}

/// 通用配置
#[derive(Clone, Default)]
pub struct GeneralConfiguration {
    /// 是否在独立线程中完成扫描、解析与实例化
    pub run_in_new_thread: bool,
    /// 启动完成回调
    pub startup_callback: Option<StartupCallback>,
}

/// 容器配置
#[derive(Clone, Default)]
pub struct ContainerConfiguration {
    /// 扫描配置
    pub scanning: ScanningConfiguration,
    /// 实例化配置
    pub instantiation: InstantiationConfiguration,
    /// 通用配置
    pub general: GeneralConfiguration,
}

impl ContainerConfiguration {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加接受的组件标记
    pub fn add_component_marker(mut self, kind: MarkerKind) -> Self {
        if !self.scanning.component_markers.contains(&kind) {
            self.scanning.component_markers.push(kind);
        }
        self
    }

    /// 是否为接受的组件标记
    pub fn is_component_marker(&self, kind: &MarkerKind) -> bool {
        self.scanning.component_markers.contains(kind)
    }

    /// 注册描述符创建回调
    pub fn on_descriptor_created<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arc<ComponentDescriptor>) + Send + Sync + 'static,
    {
        self.scanning.descriptor_callbacks.push(Arc::new(callback));
        self
    }

    /// 提供现成的实例作为组件
    pub fn provide<T: Send + Sync + 'static>(self, instance: Arc<T>) -> Self {
        self.provide_descriptor(ComponentDescriptor::provided(instance))
    }

    /// 提供已构建好的描述符
    pub fn provide_descriptor(mut self, descriptor: Arc<ComponentDescriptor>) -> Self {
        self.instantiation.provided.push(descriptor);
        self
    }

    /// 添加外部依赖解析器
    pub fn add_external_resolver(mut self, resolver: Arc<dyn ExternalDependencyResolver>) -> Self {
        self.instantiation.external_resolvers.push(resolver);
        self
    }

    /// 替换代理创建能力
    pub fn with_proxy_factory(mut self, proxy_factory: Arc<dyn ProxyFactory>) -> Self {
        self.instantiation.proxy_factory = proxy_factory;
        self
    }

    /// 设置是否在独立线程中启动
    pub fn run_in_new_thread(mut self, enabled: bool) -> Self {
        self.general.run_in_new_thread = enabled;
        self
    }

    /// 设置启动完成回调
    pub fn on_startup<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApplicationContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.general.startup_callback = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ContainerConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerConfiguration")
            .field("component_markers", &self.scanning.component_markers)
            .field(
                "descriptor_callbacks",
                &self.scanning.descriptor_callbacks.len(),
            )
            .field("provided", &self.instantiation.provided.len())
            .field(
                "external_resolvers",
                &self.instantiation.external_resolvers.len(),
            )
            .field("run_in_new_thread", &self.general.run_in_new_thread)
            .field(
                "startup_callback",
                &self.general.startup_callback.is_some(),
            )
            .finish()
    }
}
