//! 容器端到端集成测试
//!
//! 通过异步扫描器交付描述符，走完整的启动流程后在注册表上验证行为。

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use di_abstractions::{
    ComponentDescriptor, ComponentRegistry, ComponentScanner, DependencySlot, Injected,
    InvocationChain, MethodInterceptor, MethodKey, Value,
};
use di_impl::DispatchProxy;
use infrastructure_common::{
    BoxError, ComponentError, DependencyErrorKind, InfrastructureError, LifecycleState, Marker,
    MarkerKind, ScopeType, TypeInfo,
};
use infrastructure_composition::{ContainerBuilder, StaticComponentScanner};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;
}

struct CardGateway;

impl PaymentGateway for CardGateway {
    fn name(&self) -> &'static str {
        "card"
    }
}

struct WalletGateway;

impl PaymentGateway for WalletGateway {
    fn name(&self) -> &'static str {
        "wallet"
    }
}

struct Discount;

struct Checkout {
    preferred: Arc<dyn PaymentGateway>,
    gateways: Vec<Arc<dyn PaymentGateway>>,
    discount: Mutex<Option<Arc<Discount>>>,
}

#[derive(Default)]
struct Counters {
    started: AtomicUsize,
    stopped: AtomicUsize,
}

struct Inventory {
    counters: Arc<Counters>,
}

/// 模拟模块扫描：异步地按模块交付描述符
struct ModuleScanner {
    counters: Arc<Counters>,
}

#[async_trait]
impl ComponentScanner for ModuleScanner {
    async fn scan(&self) -> Result<Vec<Arc<ComponentDescriptor>>, ComponentError> {
        tokio::task::yield_now().await;
        let counters = self.counters.clone();
        Ok(vec![
            ComponentDescriptor::builder::<Checkout>()
                .marker(Marker::service())
                .constructor(
                    vec![
                        DependencySlot::single::<dyn PaymentGateway>().qualified("wallet"),
                        DependencySlot::collection::<dyn PaymentGateway>(),
                    ],
                    |args| {
                        Ok(Checkout {
                            preferred: args.one_dyn::<dyn PaymentGateway>(0)?,
                            gateways: args.all_dyn::<dyn PaymentGateway>(1),
                            discount: Mutex::new(None),
                        })
                    },
                )
                .field(
                    DependencySlot::single::<Discount>().optional(),
                    |checkout: &Checkout, value: Injected| {
                        *checkout.discount.lock() = value.get::<Discount>();
                        Ok(())
                    },
                )
                .build(),
            ComponentDescriptor::builder::<CardGateway>()
                .named("card")
                .alias::<dyn PaymentGateway>(|g| g as Arc<dyn PaymentGateway>)
                .constructor(Vec::new(), |_| Ok(CardGateway))
                .build(),
            ComponentDescriptor::builder::<WalletGateway>()
                .named("wallet")
                .alias::<dyn PaymentGateway>(|g| g as Arc<dyn PaymentGateway>)
                .constructor(Vec::new(), |_| Ok(WalletGateway))
                .build(),
            ComponentDescriptor::builder::<Inventory>()
                .marker(Marker::new(MarkerKind::Repository))
                .constructor(Vec::new(), move |_| {
                    Ok(Inventory {
                        counters: counters.clone(),
                    })
                })
                .post_construct(|inventory: &Inventory| {
                    inventory.counters.started.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .pre_destroy(|inventory: &Inventory| {
                    inventory.counters.stopped.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build(),
        ])
    }

    fn name(&self) -> &str {
        "modules"
    }
}

fn module_scanner() -> (ModuleScanner, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    (
        ModuleScanner {
            counters: counters.clone(),
        },
        counters,
    )
}

#[tokio::test]
async fn test_async_scanner_wires_trait_dependencies() -> Result<()> {
    let (scanner, _) = module_scanner();
    let context = ContainerBuilder::new().add_scanner(scanner).start().await?;

    let checkout = context.get::<Checkout>()?;
    assert_eq!(checkout.preferred.name(), "wallet");
    let mut names: Vec<_> = checkout.gateways.iter().map(|g| g.name()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["card", "wallet"]);
    assert!(checkout.discount.lock().is_none());

    let card = context.get_by_type(&TypeInfo::of::<dyn PaymentGateway>(), Some("CARD"))?;
    let card = card
        .downcast_ref::<Arc<dyn PaymentGateway>>()
        .ok_or_else(|| anyhow!("应该得到网关视图"))?;
    assert_eq!(card.name(), "card");

    assert_eq!(context.implementations(&TypeInfo::of::<dyn PaymentGateway>()).len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unqualified_trait_lookup_with_two_candidates_fails_resolution() {
    struct Ambiguous {
        _gateway: Arc<dyn PaymentGateway>,
    }
    struct AmbiguousScanner;

    #[async_trait]
    impl ComponentScanner for AmbiguousScanner {
        async fn scan(&self) -> Result<Vec<Arc<ComponentDescriptor>>, ComponentError> {
            let (modules, _) = module_scanner();
            let mut descriptors = modules.scan().await?;
            descriptors.push(
                ComponentDescriptor::builder::<Ambiguous>()
                    .constructor(vec![DependencySlot::single::<dyn PaymentGateway>()], |args| {
                        Ok(Ambiguous {
                            _gateway: args.one_dyn::<dyn PaymentGateway>(0)?,
                        })
                    })
                    .build(),
            );
            Ok(descriptors)
        }

        fn name(&self) -> &str {
            "ambiguous"
        }
    }

    let result = ContainerBuilder::new()
        .add_scanner(AmbiguousScanner)
        .start()
        .await;
    match result {
        Err(infrastructure_common::InfrastructureError::DependencyError { source }) => {
            assert_eq!(source.kind(), DependencyErrorKind::Ambiguous);
        }
        other => panic!("应该因候选不唯一而失败: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_lifecycle_through_registry() -> Result<()> {
    let (scanner, counters) = module_scanner();
    let context = ContainerBuilder::new().add_scanner(scanner).start().await?;
    let inventory_type = TypeInfo::of::<Inventory>();
    assert_eq!(counters.started.load(Ordering::SeqCst), 1);

    let before = context.get::<Inventory>()?;
    context.reload(&inventory_type)?;
    let after = context.get::<Inventory>()?;
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(counters.started.load(Ordering::SeqCst), 2);
    assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);

    context.destroy(&inventory_type)?;
    assert_eq!(counters.stopped.load(Ordering::SeqCst), 2);
    let descriptor = context.find(&inventory_type, None)?;
    assert_eq!(descriptor.lifecycle(), LifecycleState::Destroyed);
    assert!(context.get::<Inventory>().is_err());
    Ok(())
}

#[tokio::test]
async fn test_prototype_reads_create_fresh_instances() -> Result<()> {
    struct Ticket {
        serial: usize,
    }
    let issued = Arc::new(AtomicUsize::new(0));
    let counter = issued.clone();
    let scanner = StaticComponentScanner::new("tickets").component(
        move || {
            let counter = counter.clone();
            ComponentDescriptor::builder::<Ticket>()
                .scope(ScopeType::Prototype)
                .constructor(Vec::new(), move |_| {
                    Ok(Ticket {
                        serial: counter.fetch_add(1, Ordering::SeqCst),
                    })
                })
                .build()
        },
    );
    let context = ContainerBuilder::new().add_scanner(scanner).start().await?;

    let serials = (0..3)
        .map(|_| context.get::<Ticket>().map(|t| t.serial))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(serials, vec![0, 1, 2]);
    assert_eq!(issued.load(Ordering::SeqCst), 3);
    Ok(())
}

struct Tracer {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl MethodInterceptor for Tracer {
    fn intercept(
        &self,
        _marker: &Marker,
        method: &MethodKey,
        _args: &[Value],
        next: &dyn InvocationChain,
    ) -> Result<Value, BoxError> {
        self.log.lock().push(format!("{} 进入 {}", self.tag, method));
        let result = next.proceed();
        self.log.lock().push(format!("{} 退出", self.tag));
        result
    }
}

struct Guard;

impl MethodInterceptor for Guard {
    fn intercept(
        &self,
        _marker: &Marker,
        _method: &MethodKey,
        args: &[Value],
        next: &dyn InvocationChain,
    ) -> Result<Value, BoxError> {
        let amount = args
            .first()
            .and_then(|a| a.downcast_ref::<i64>())
            .copied()
            .unwrap_or_default();
        if amount <= 0 {
            return Err(format!("金额无效: {}", amount).into());
        }
        next.proceed()
    }
}

struct Payments {
    charged: AtomicUsize,
}

struct AspectScanner {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ComponentScanner for AspectScanner {
    async fn scan(&self) -> Result<Vec<Arc<ComponentDescriptor>>, ComponentError> {
        let traced = self.log.clone();
        let metered = self.log.clone();
        Ok(vec![
            ComponentDescriptor::builder::<Payments>()
                .marker(Marker::service())
                .constructor(Vec::new(), |_| {
                    Ok(Payments {
                        charged: AtomicUsize::new(0),
                    })
                })
                .method(
                    "charge",
                    vec![
                        Marker::custom("Traced"),
                        Marker::custom("Guarded"),
                        Marker::custom("Metered"),
                    ],
                    |payments: &Payments, args: &[Value]| {
                        let amount = args
                            .first()
                            .and_then(|a| a.downcast_ref::<i64>())
                            .copied()
                            .ok_or("缺少金额参数")?;
                        payments.charged.fetch_add(1, Ordering::SeqCst);
                        Ok(Box::new(amount * 100) as Value)
                    },
                )
                .build(),
            ComponentDescriptor::builder::<Tracer>()
                .named("traced")
                .interceptor_for(MarkerKind::custom("Traced"))
                .constructor(Vec::new(), move |_| {
                    Ok(Tracer {
                        tag: "traced",
                        log: traced.clone(),
                    })
                })
                .build(),
            ComponentDescriptor::builder::<Tracer>()
                .named("metered")
                .interceptor_for(MarkerKind::custom("Metered"))
                .constructor(Vec::new(), move |_| {
                    Ok(Tracer {
                        tag: "metered",
                        log: metered.clone(),
                    })
                })
                .build(),
            ComponentDescriptor::builder::<Guard>()
                .interceptor_for(MarkerKind::custom("Guarded"))
                .constructor(Vec::new(), |_| Ok(Guard))
                .build(),
        ])
    }

    fn name(&self) -> &str {
        "aspects"
    }
}

#[tokio::test]
async fn test_interceptors_wrap_in_marker_order() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let context = ContainerBuilder::new()
        .add_scanner(AspectScanner { log: log.clone() })
        .start()
        .await?;
    let proxy = context.proxy_of(&TypeInfo::of::<Payments>())?;

    let cents = proxy
        .invoke_as::<i64>("charge", &[Box::new(12_i64) as Value])
        .map_err(|e| anyhow!(e))?;
    assert_eq!(cents, 1200);
    assert_eq!(
        *log.lock(),
        vec![
            "traced 进入 charge",
            "metered 进入 charge",
            "metered 退出",
            "traced 退出"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_interceptor_can_short_circuit() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let context = ContainerBuilder::new()
        .add_scanner(AspectScanner { log: log.clone() })
        .start()
        .await?;
    let proxy = context.proxy_of(&TypeInfo::of::<Payments>())?;

    let rejected = proxy.invoke("charge", &[Box::new(-5_i64) as Value]);
    let message = rejected.err().map(|e| e.to_string()).unwrap_or_default();
    assert_eq!(message, "金额无效: -5");

    // 外层拦截器仍然完整地进入和退出，目标方法没有执行
    assert_eq!(*log.lock(), vec!["traced 进入 charge", "traced 退出"]);
    let descriptor = context.find(&TypeInfo::of::<Payments>(), None)?;
    let payments = descriptor
        .instance()
        .and_then(|instance| instance.downcast::<Payments>().ok())
        .ok_or_else(|| anyhow!("应该能取到真实实例"))?;
    assert_eq!(payments.charged.load(Ordering::SeqCst), 0);
    Ok(())
}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English;

/// 经由代理转发的 Greeter 实现
struct ProxyGreeter(Arc<DispatchProxy>);

impl Greeter for ProxyGreeter {
    fn greet(&self) -> String {
        self.0
            .invoke_as::<String>("greet", &[])
            .unwrap_or_else(|e| format!("调用失败: {e}"))
    }
}

struct Welcome {
    greeter: Arc<dyn Greeter>,
}

struct StrictWelcome;

fn greeting_scanner(log: &Arc<Mutex<Vec<String>>>) -> StaticComponentScanner {
    let log = log.clone();
    StaticComponentScanner::new("greeting")
        .component(|| {
            ComponentDescriptor::builder::<English>()
                .alias_via::<DispatchProxy, dyn Greeter>(|p| {
                    Arc::new(ProxyGreeter(p)) as Arc<dyn Greeter>
                })
                .constructor(Vec::new(), |_| Ok(English))
                .method("greet", vec![Marker::custom("Timed")], |_: &English, _: &[Value]| {
                    Ok(Box::new("hello".to_string()) as Value)
                })
                .build()
        })
        .component(move || {
            let log = log.clone();
            ComponentDescriptor::builder::<Tracer>()
                .interceptor_for(MarkerKind::custom("Timed"))
                .constructor(Vec::new(), move |_| {
                    Ok(Tracer {
                        tag: "timed",
                        log: log.clone(),
                    })
                })
                .build()
        })
}

/// 按 trait 注入代理作用域组件时调用经过拦截器
#[tokio::test]
async fn test_proxied_component_injected_through_trait() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let scanner = greeting_scanner(&log).component(|| {
        ComponentDescriptor::builder::<Welcome>()
            .constructor(vec![DependencySlot::single::<dyn Greeter>()], |args| {
                Ok(Welcome {
                    greeter: args.one_dyn::<dyn Greeter>(0)?,
                })
            })
            .build()
    });
    let context = ContainerBuilder::new().add_scanner(scanner).start().await?;

    let english = context.find(&TypeInfo::of::<English>(), None)?;
    assert_eq!(english.scope(), ScopeType::Proxy);

    let welcome = context.get::<Welcome>()?;
    assert_eq!(welcome.greeter.greet(), "hello");
    assert_eq!(*log.lock(), vec!["timed 进入 greet", "timed 退出"]);
    Ok(())
}

/// 按具体类型依赖代理作用域组件在解析阶段失败
#[tokio::test]
async fn test_proxied_component_by_concrete_type_fails_resolution() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let scanner = greeting_scanner(&log).component(|| {
        ComponentDescriptor::builder::<StrictWelcome>()
            .constructor(vec![DependencySlot::single::<English>()], |_| Ok(StrictWelcome))
            .build()
    });

    let result = ContainerBuilder::new().add_scanner(scanner).start().await;
    match result {
        Err(InfrastructureError::DependencyError { source }) => {
            assert_eq!(source.kind(), DependencyErrorKind::ProxyView);
            let message = source.to_string();
            assert!(message.contains("StrictWelcome"));
            assert!(message.contains("alias_via::<DispatchProxy, _>"));
        }
        other => panic!("应该在解析阶段失败: {:?}", other.map(|_| ())),
    }
    assert!(log.lock().is_empty());
}
