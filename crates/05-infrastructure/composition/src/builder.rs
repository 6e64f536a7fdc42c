//! 容器构建器

use crate::bootstrapper::ContainerBootstrapper;
use crate::configuration::ContainerConfiguration;
use crate::logging::{init_logging, LoggingConfig};
use crate::settings::ContainerSettings;
use di_abstractions::{
    ComponentDescriptor, ComponentScanner, ExternalDependencyResolver, ProxyFactory,
};
use di_impl::ApplicationContext;
use infrastructure_common::{BoxError, ConfigResult, InfrastructureResult, MarkerKind};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 容器构建器
///
/// 使用建造者模式组装容器配置、扫描器与日志设置
pub struct ContainerBuilder {
    /// 容器配置
    configuration: ContainerConfiguration,
    /// 组件扫描器列表
    scanners: Vec<Box<dyn ComponentScanner>>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl ContainerBuilder {
    /// 创建新的容器构建器
    pub fn new() -> Self {
        Self {
            configuration: ContainerConfiguration::new(),
            scanners: Vec::new(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 从已有的容器配置开始构建
    pub fn with_configuration(mut self, configuration: ContainerConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// 加载设置文件，并叠加 `IOC__` 前缀的环境变量
    pub fn with_settings_file<P: AsRef<Path>>(self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        info!("加载容器设置文件: {}", path.display());
        let settings = ContainerSettings::load(Some(path))?;
        Ok(self.with_settings(&settings)?)
    }

    /// 只从环境变量加载设置
    pub fn with_env_settings(self) -> InfrastructureResult<Self> {
        let settings = ContainerSettings::load(None)?;
        Ok(self.with_settings(&settings)?)
    }

    /// 应用已加载的设置
    pub fn with_settings(
        mut self,
        settings: &ContainerSettings,
    ) -> ConfigResult<Self> {
        self.configuration = settings.apply(self.configuration);
        if settings.logging.enabled {
            self.logging_config = settings.logging.to_logging_config()?;
            self.logging_enabled = true;
        }
        Ok(self)
    }

    /// 添加组件扫描器
    pub fn add_scanner<T: ComponentScanner + 'static>(mut self, scanner: T) -> Self {
        debug!("添加组件扫描器: {}", scanner.name());
        self.scanners.push(Box::new(scanner));
        self
    }

    /// 添加接受的组件标记
    pub fn add_component_marker(mut self, kind: MarkerKind) -> Self {
        info!("添加组件标记: {}", kind);
        self.configuration = self.configuration.add_component_marker(kind);
        self
    }

    /// 注册描述符创建回调
    pub fn on_descriptor_created<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arc<ComponentDescriptor>) + Send + Sync + 'static,
    {
        self.configuration = self.configuration.on_descriptor_created(callback);
        self
    }

    /// 提供现成的实例作为组件
    pub fn provide<T: Send + Sync + 'static>(mut self, instance: Arc<T>) -> Self {
        debug!("提供外部组件: {}", std::any::type_name::<T>());
        self.configuration = self.configuration.provide(instance);
        self
    }

    /// 提供已构建好的描述符
    pub fn provide_descriptor(mut self, descriptor: Arc<ComponentDescriptor>) -> Self {
        self.configuration = self.configuration.provide_descriptor(descriptor);
        self
    }

    /// 添加外部依赖解析器
    pub fn add_external_resolver<R: ExternalDependencyResolver + 'static>(
        mut self,
        resolver: R,
    ) -> Self {
        self.configuration = self.configuration.add_external_resolver(Arc::new(resolver));
        self
    }

    /// 替换代理创建能力
    pub fn with_proxy_factory<F: ProxyFactory + 'static>(mut self, proxy_factory: F) -> Self {
        self.configuration = self.configuration.with_proxy_factory(Arc::new(proxy_factory));
        self
    }

    /// 设置是否在独立线程中启动
    pub fn run_in_new_thread(mut self, enabled: bool) -> Self {
        self.configuration = self.configuration.run_in_new_thread(enabled);
        self
    }

    /// 设置启动完成回调
    pub fn on_startup<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApplicationContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.configuration = self.configuration.on_startup(callback);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 自动配置开发环境
    pub fn auto_configure_development(self) -> Self {
        info!("自动配置开发环境");
        self.with_logging(LoggingConfig::development())
    }

    /// 自动配置生产环境
    pub fn auto_configure_production(self) -> Self {
        info!("自动配置生产环境");
        self.with_logging(LoggingConfig::production())
    }

    /// 构建启动器
    pub fn build(self) -> InfrastructureResult<ContainerBootstrapper> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            init_logging(&self.logging_config)?;
        }

        debug!("容器配置: {:?}", self.configuration);
        Ok(ContainerBootstrapper::new(self.configuration).with_boxed_scanners(self.scanners))
    }

    /// 构建并在当前异步运行时中启动容器
    pub async fn start(self) -> InfrastructureResult<ApplicationContext> {
        self.build()?.run_async().await
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
