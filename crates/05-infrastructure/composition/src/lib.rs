//! # 基础设施组合层
//!
//! 这个 crate 把依赖解析、实例化与方法拦截组合成一个可启动的容器。
//!
//! ## 主要功能
//!
//! - **容器构建器**: 使用构建者模式组装配置、扫描器与日志
//! - **容器设置**: 从配置文件与环境变量加载可序列化的设置
//! - **拦截器绑定**: 按方法标记绑定拦截器组件并提升为代理作用域
//! - **容器启动器**: 扫描、过滤、解析、实例化并执行启动回调
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::ComponentDescriptor;
//! use infrastructure_composition::{ContainerBuilder, StaticComponentScanner};
//!
//! struct Greeter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scanner = StaticComponentScanner::new("app").component(|| {
//!         ComponentDescriptor::builder::<Greeter>()
//!             .constructor(Vec::new(), |_| Ok(Greeter))
//!             .build()
//!     });
//!
//!     let context = ContainerBuilder::new()
//!         .add_scanner(scanner)
//!         .start()
//!         .await?;
//!
//!     let _greeter = context.get::<Greeter>()?;
//!     Ok(())
//! }
//! ```

pub mod aspects;
pub mod bootstrapper;
pub mod builder;
pub mod configuration;
pub mod logging;
pub mod scanner;
pub mod settings;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use aspects::{apply_interceptor_bindings, collect_interceptors};
pub use bootstrapper::ContainerBootstrapper;
pub use builder::ContainerBuilder;
pub use configuration::{
    ContainerConfiguration, DescriptorCallback, GeneralConfiguration, InstantiationConfiguration,
    ScanningConfiguration, StartupCallback,
};
pub use logging::{init_logging, LoggingConfig};
pub use scanner::StaticComponentScanner;
pub use settings::{ContainerSettings, LoggingSettings};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
