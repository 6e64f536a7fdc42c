//! 容器启动器
//!
//! 协调扫描、标记过滤、描述符回调、拦截器绑定、依赖解析与实例化，
//! 最后执行启动完成回调。任一步骤失败时整个启动失败。

use crate::aspects::apply_interceptor_bindings;
use crate::configuration::ContainerConfiguration;
use di_abstractions::{ComponentDescriptor, ComponentScanner, DependencyResolver};
use di_impl::{ApplicationContext, DefaultDependencyResolver, InstantiationEngine};
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 启动线程名称
pub const BOOTSTRAP_THREAD_NAME: &str = "ioc-bootstrap";

/// 容器启动器
pub struct ContainerBootstrapper {
    /// 容器配置
    configuration: ContainerConfiguration,
    /// 组件扫描器列表
    scanners: Vec<Box<dyn ComponentScanner>>,
}

impl ContainerBootstrapper {
    /// 创建新的启动器
    pub fn new(configuration: ContainerConfiguration) -> Self {
        Self {
            configuration,
            scanners: Vec::new(),
        }
    }

    /// 添加组件扫描器
    pub fn with_scanner<T: ComponentScanner + 'static>(mut self, scanner: T) -> Self {
        self.scanners.push(Box::new(scanner));
        self
    }

    /// 添加已装箱的组件扫描器
    pub fn with_boxed_scanners(mut self, scanners: Vec<Box<dyn ComponentScanner>>) -> Self {
        self.scanners.extend(scanners);
        self
    }

    /// 容器配置
    pub fn configuration(&self) -> &ContainerConfiguration {
        &self.configuration
    }

    /// 启动容器
    pub async fn bootstrap(&self) -> InfrastructureResult<ApplicationContext> {
        info!("开始启动容器");

        // 第一步：扫描组件
        let scanned = self.scan().await?;

        // 第二步：按组件标记过滤
        let accepted = self.accept(scanned);

        // 第三步：描述符创建回调
        self.notify_created(&accepted);

        // 第四步：应用拦截器绑定
        let provided = &self.configuration.instantiation.provided;
        let all: Vec<_> = accepted.iter().chain(provided).cloned().collect();
        apply_interceptor_bindings(&all)?;

        // 第五步：解析依赖
        let instantiation = &self.configuration.instantiation;
        let resolver = DefaultDependencyResolver::new()
            .with_proxy_type(instantiation.proxy_factory.proxy_type())
            .with_external_resolvers(instantiation.external_resolvers.iter().cloned());
        let plan = resolver.resolve(&accepted, provided).map_err(|e| {
            error!("依赖解析失败: {}", e);
            e
        })?;

        // 第六步：实例化
        let engine =
            InstantiationEngine::new(self.configuration.instantiation.proxy_factory.clone());
        let context = ApplicationContext::from_plan(&plan, engine).map_err(|e| {
            error!("组件实例化失败: {}", e);
            e
        })?;

        // 第七步：启动完成回调
        if let Some(callback) = &self.configuration.general.startup_callback {
            callback(&context).map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("启动回调执行失败: {}", e),
            })?;
        }

        info!("容器启动完成");
        Ok(context)
    }

    /// 同步启动容器
    ///
    /// 配置了 `run_in_new_thread` 时在名为 `ioc-bootstrap` 的独立线程中完成启动。
    /// 不能在异步运行时内部调用，异步代码请使用 [`Self::run_async`]。
    pub fn run(self) -> InfrastructureResult<ApplicationContext> {
        if !self.configuration.general.run_in_new_thread {
            return self.block_on();
        }
        let handle = std::thread::Builder::new()
            .name(BOOTSTRAP_THREAD_NAME.to_string())
            .spawn(move || self.block_on())
            .map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("创建启动线程失败: {}", e),
            })?;
        handle
            .join()
            .map_err(|_| InfrastructureError::BootstrapFailed {
                message: "启动线程异常退出".to_string(),
            })?
    }

    /// 在异步运行时中启动容器
    ///
    /// 配置了 `run_in_new_thread` 时把启动工作交给阻塞线程池。
    pub async fn run_async(self) -> InfrastructureResult<ApplicationContext> {
        if !self.configuration.general.run_in_new_thread {
            return self.bootstrap().await;
        }
        let runtime = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || runtime.block_on(self.bootstrap()))
            .await
            .map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("启动任务异常退出: {}", e),
            })?
    }

    fn block_on(self) -> InfrastructureResult<ApplicationContext> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("创建启动运行时失败: {}", e),
            })?;
        runtime.block_on(self.bootstrap())
    }

    async fn scan(&self) -> InfrastructureResult<Vec<Arc<ComponentDescriptor>>> {
        let mut descriptors = Vec::new();
        for scanner in &self.scanners {
            debug!("使用组件扫描器扫描组件: {}", scanner.name());
            let found = scanner.scan().await.map_err(|e| {
                error!("组件扫描失败 [{}]: {}", scanner.name(), e);
                e
            })?;
            descriptors.extend(found);
        }
        info!("组件扫描完成，共发现 {} 个组件", descriptors.len());
        Ok(descriptors)
    }

    fn accept(&self, scanned: Vec<Arc<ComponentDescriptor>>) -> Vec<Arc<ComponentDescriptor>> {
        scanned
            .into_iter()
            .filter(|descriptor| {
                let accepted = self
                    .configuration
                    .is_component_marker(&descriptor.marker().kind);
                if !accepted {
                    debug!(
                        "跳过非组件标记的描述符: {} ({})",
                        descriptor.display_name(),
                        descriptor.marker().kind
                    );
                }
                accepted
            })
            .collect()
    }

    fn notify_created(&self, accepted: &[Arc<ComponentDescriptor>]) {
        let callbacks = &self.configuration.scanning.descriptor_callbacks;
        if callbacks.is_empty() {
            return;
        }
        for descriptor in accepted {
            for callback in callbacks {
                callback(descriptor);
                for factory in descriptor.factories() {
                    callback(factory);
                }
            }
        }
    }
}

impl fmt::Debug for ContainerBootstrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBootstrapper")
            .field("configuration", &self.configuration)
            .field(
                "scanners",
                &self.scanners.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
