//! 容器启动场景测试

use crate::bootstrapper::BOOTSTRAP_THREAD_NAME;
use crate::builder::ContainerBuilder;
use crate::scanner::StaticComponentScanner;
use anyhow::Result;
use di_abstractions::{
    ComponentDescriptor, ComponentRegistry, DependencySlot, ExternalDependencyResolver, Instance,
    InvocationChain, MethodInterceptor, MethodKey, Value,
};
use infrastructure_common::{
    BoxError, DependencyErrorKind, InfrastructureError, Marker, MarkerKind, ScopeType, TypeInfo,
};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::Builder;

struct Repository {
    url: String,
}

struct OrderService {
    repository: Arc<Repository>,
}

fn repository() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<Repository>()
        .marker(Marker::new(MarkerKind::Repository))
        .constructor(Vec::new(), |_| {
            Ok(Repository {
                url: "memory://orders".to_string(),
            })
        })
        .build()
}

fn order_service() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<OrderService>()
        .marker(Marker::service())
        .constructor(vec![DependencySlot::single::<Repository>()], |args| {
            Ok(OrderService {
                repository: args.one::<Repository>(0)?,
            })
        })
        .build()
}

fn app_scanner() -> StaticComponentScanner {
    StaticComponentScanner::new("app")
        .component(order_service)
        .component(repository)
}

/// 测试基本的扫描、解析与实例化流程
#[tokio::test]
async fn test_builder_starts_container() -> Result<()> {
    let context = ContainerBuilder::new().add_scanner(app_scanner()).start().await?;

    let service = context.get::<OrderService>()?;
    assert_eq!(service.repository.url, "memory://orders");
    assert_eq!(context.definition_count(), 2);
    assert_eq!(
        context.bean_names_for_marker(&MarkerKind::Repository),
        vec!["Repository"]
    );
    Ok(())
}

struct HomeController;

fn controller() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<HomeController>()
        .marker(Marker::custom("Controller"))
        .constructor(Vec::new(), |_| Ok(HomeController))
        .build()
}

/// 测试未登记的组件标记被跳过
#[tokio::test]
async fn test_unaccepted_marker_is_skipped() -> Result<()> {
    let scanner = app_scanner().component(controller);

    let context = ContainerBuilder::new()
        .add_scanner(scanner.clone())
        .start()
        .await?;
    assert!(context.get::<HomeController>().is_err());

    let context = ContainerBuilder::new()
        .add_component_marker(MarkerKind::custom("Controller"))
        .add_scanner(scanner)
        .start()
        .await?;
    assert!(context.get::<HomeController>().is_ok());
    Ok(())
}

/// 测试描述符创建回调覆盖工厂产出组件
#[tokio::test]
async fn test_descriptor_callbacks_include_factories() -> Result<()> {
    struct Settings;
    struct Pool;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let scanner = StaticComponentScanner::new("config").component(|| {
        ComponentDescriptor::builder::<Settings>()
            .marker(Marker::new(MarkerKind::Configuration))
            .constructor(Vec::new(), |_| Ok(Settings))
            .factory(ComponentDescriptor::bean::<Pool>(), |_: &Settings| Ok(Pool))
            .build()
    });

    let context = ContainerBuilder::new()
        .add_scanner(scanner)
        .on_descriptor_created(move |d| recorder.lock().push(d.display_name()))
        .start()
        .await?;

    assert_eq!(*seen.lock(), vec!["Settings", "Pool"]);
    assert!(context.get::<Pool>().is_ok());
    Ok(())
}

struct Audit {
    log: Arc<Mutex<Vec<String>>>,
}

impl MethodInterceptor for Audit {
    fn intercept(
        &self,
        marker: &Marker,
        method: &MethodKey,
        _args: &[Value],
        next: &dyn InvocationChain,
    ) -> Result<Value, BoxError> {
        let level = marker
            .attribute("level")
            .and_then(|v| v.as_str())
            .unwrap_or("normal")
            .to_string();
        self.log.lock().push(format!("审计 {} ({})", method, level));
        next.proceed()
    }
}

struct Ledger {
    entries: AtomicUsize,
}

fn ledger() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<Ledger>()
        .marker(Marker::service())
        .constructor(Vec::new(), |_| {
            Ok(Ledger {
                entries: AtomicUsize::new(0),
            })
        })
        .method(
            "post",
            vec![Marker::custom("Audited").with_attribute("level", "high")],
            |ledger: &Ledger, _: &[Value]| {
                let count = ledger.entries.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Box::new(count) as Value)
            },
        )
        .method("count", Vec::new(), |ledger: &Ledger, _: &[Value]| {
            Ok(Box::new(ledger.entries.load(Ordering::SeqCst)) as Value)
        })
        .build()
}

fn audit_scanner(log: &Arc<Mutex<Vec<String>>>) -> StaticComponentScanner {
    let log = log.clone();
    StaticComponentScanner::new("audit").component(move || {
        let log = log.clone();
        ComponentDescriptor::builder::<Audit>()
            .interceptor_for(MarkerKind::custom("Audited"))
            .constructor(Vec::new(), move |_| Ok(Audit { log: log.clone() }))
            .build()
    })
}

/// 测试带标记的方法经过拦截器，未标记的方法直接调用
#[tokio::test]
async fn test_marked_methods_are_intercepted() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let context = ContainerBuilder::new()
        .add_scanner(StaticComponentScanner::new("ledger").component(ledger))
        .add_scanner(audit_scanner(&log))
        .start()
        .await?;

    let descriptor = context.find(&TypeInfo::of::<Ledger>(), None)?;
    assert_eq!(descriptor.scope(), ScopeType::Proxy);

    let proxy = context.proxy_of(&TypeInfo::of::<Ledger>())?;
    let posted = proxy
        .invoke_as::<usize>("post", &[])
        .map_err(|e| anyhow::anyhow!(e))?;
    let count = proxy
        .invoke_as::<usize>("count", &[])
        .map_err(|e| anyhow::anyhow!(e))?;

    assert_eq!((posted, count), (1, 1));
    assert_eq!(*log.lock(), vec!["审计 post (high)"]);
    Ok(())
}

/// 测试同一标记存在两个拦截器时启动失败
#[tokio::test]
async fn test_duplicate_interceptors_abort_bootstrap() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let result = ContainerBuilder::new()
        .add_scanner(audit_scanner(&log))
        .add_scanner(audit_scanner(&log))
        .start()
        .await;
    assert!(matches!(
        result,
        Err(InfrastructureError::ComponentError { .. })
    ));
}

/// 测试启动回调
#[tokio::test]
async fn test_startup_callback() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    ContainerBuilder::new()
        .add_scanner(app_scanner())
        .on_startup(move |context| {
            context.get::<OrderService>()?;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .start()
        .await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let failed = ContainerBuilder::new()
        .add_scanner(app_scanner())
        .on_startup(|_| Err("预热失败".into()))
        .start()
        .await;
    assert!(matches!(
        failed,
        Err(InfrastructureError::BootstrapFailed { .. })
    ));
    Ok(())
}

/// 测试循环依赖中止启动
#[tokio::test]
async fn test_cycle_aborts_bootstrap() {
    struct Left;
    struct Right;
    let scanner = StaticComponentScanner::new("cycle")
        .component(|| {
            ComponentDescriptor::builder::<Left>()
                .constructor(vec![DependencySlot::single::<Right>()], |_| Ok(Left))
                .build()
        })
        .component(|| {
            ComponentDescriptor::builder::<Right>()
                .constructor(vec![DependencySlot::single::<Left>()], |_| Ok(Right))
                .build()
        });

    let result = ContainerBuilder::new().add_scanner(scanner).start().await;
    match result {
        Err(InfrastructureError::DependencyError { source }) => {
            assert_eq!(source.kind(), DependencyErrorKind::Cycle);
        }
        other => panic!("应该检测到循环依赖: {:?}", other.map(|_| ())),
    }
}

struct Greeting(String);

struct Greeter {
    greeting: Arc<Greeting>,
}

struct GreetingResolver;

impl ExternalDependencyResolver for GreetingResolver {
    fn can_resolve(&self, slot: &DependencySlot) -> bool {
        slot.required_type.is::<Greeting>()
    }

    fn resolve(&self, _slot: &DependencySlot) -> Result<Instance, BoxError> {
        Ok(Arc::new(Greeting("你好".to_string())))
    }
}

fn greeter() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<Greeter>()
        .constructor(vec![DependencySlot::single::<Greeting>()], |args| {
            Ok(Greeter {
                greeting: args.one::<Greeting>(0)?,
            })
        })
        .build()
}

/// 测试外部依赖解析器
#[tokio::test]
async fn test_external_resolver_supplies_value() -> Result<()> {
    let context = ContainerBuilder::new()
        .add_scanner(StaticComponentScanner::new("greeter").component(greeter))
        .add_external_resolver(GreetingResolver)
        .start()
        .await?;
    assert_eq!(context.get::<Greeter>()?.greeting.0, "你好");
    Ok(())
}

/// 测试外部提供的实例参与注入
#[tokio::test]
async fn test_provided_instance_is_injected() -> Result<()> {
    let greeting = Arc::new(Greeting("hello".to_string()));
    let context = ContainerBuilder::new()
        .add_scanner(StaticComponentScanner::new("greeter").component(greeter))
        .provide(greeting.clone())
        .start()
        .await?;
    assert!(Arc::ptr_eq(&context.get::<Greeter>()?.greeting, &greeting));
    Ok(())
}

/// 测试在独立线程中同步启动
#[test]
fn test_run_in_new_thread() -> Result<()> {
    let thread_name = Arc::new(Mutex::new(None));
    let recorder = thread_name.clone();
    let scanner = app_scanner().component(move || {
        let recorder = recorder.clone();
        ComponentDescriptor::builder::<HomeController>()
            .constructor(Vec::new(), move |_| {
                *recorder.lock() = std::thread::current().name().map(str::to_string);
                Ok(HomeController)
            })
            .build()
    });

    let context = ContainerBuilder::new()
        .add_scanner(scanner)
        .run_in_new_thread(true)
        .build()?
        .run()?;

    assert!(context.get::<OrderService>().is_ok());
    assert_eq!(
        thread_name.lock().as_deref(),
        Some(BOOTSTRAP_THREAD_NAME)
    );
    Ok(())
}

/// 测试在异步运行时中交给阻塞线程池启动
#[tokio::test]
async fn test_run_async_in_new_thread() -> Result<()> {
    let context = ContainerBuilder::new()
        .add_scanner(app_scanner())
        .run_in_new_thread(true)
        .build()?
        .run_async()
        .await?;
    assert!(context.get::<OrderService>().is_ok());
    Ok(())
}

/// 测试从设置文件加载组件标记
#[tokio::test]
async fn test_settings_file_adds_markers() -> Result<()> {
    let mut file = Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, r#"custom_markers = ["Controller"]"#)?;

    let context = ContainerBuilder::new()
        .with_settings_file(file.path())?
        .add_scanner(app_scanner().component(controller))
        .start()
        .await?;
    assert!(context.get::<HomeController>().is_ok());
    Ok(())
}
