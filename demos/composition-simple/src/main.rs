//! 容器使用简化示例
//!
//! 演示用静态扫描器登记组件、按 trait 注入依赖，并通过代理调用带拦截器的方法

use di_abstractions::{
    ComponentDescriptor, DependencySlot, InvocationChain, MethodInterceptor, MethodKey, Value,
};
use infrastructure_common::{BoxError, Marker, MarkerKind, TypeInfo};
use infrastructure_composition::{ContainerBuilder, StaticComponentScanner};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// 用户实体
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// 用户仓储
pub trait UserRepository: Send + Sync {
    fn find_by_id(&self, id: u64) -> Option<User>;
}

/// 内存用户仓储
pub struct MemoryUserRepository {
    users: HashMap<u64, User>,
}

impl MemoryUserRepository {
    fn new() -> Self {
        let users = [(1, "Alice"), (2, "Bob")]
            .into_iter()
            .map(|(id, name)| {
                let user = User {
                    id,
                    name: name.to_string(),
                    email: format!("{}@example.com", name.to_lowercase()),
                };
                (id, user)
            })
            .collect();
        Self { users }
    }
}

impl UserRepository for MemoryUserRepository {
    fn find_by_id(&self, id: u64) -> Option<User> {
        self.users.get(&id).cloned()
    }
}

/// 用户服务
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    fn find_user(&self, id: u64) -> Option<User> {
        self.repository.find_by_id(id)
    }
}

/// 记录方法耗时的拦截器
struct TimingInterceptor;

impl MethodInterceptor for TimingInterceptor {
    fn intercept(
        &self,
        marker: &Marker,
        method: &MethodKey,
        _args: &[Value],
        next: &dyn InvocationChain,
    ) -> Result<Value, BoxError> {
        let started = Instant::now();
        let result = next.proceed();
        let label = marker
            .attribute("label")
            .and_then(|v| v.as_str())
            .unwrap_or("未命名");
        info!(
            "[{}] {} 耗时 {:?}",
            label,
            method,
            started.elapsed()
        );
        result
    }
}

fn scanner() -> StaticComponentScanner {
    StaticComponentScanner::new("demo")
        .component(|| {
            ComponentDescriptor::builder::<MemoryUserRepository>()
                .marker(Marker::new(MarkerKind::Repository))
                .alias::<dyn UserRepository>(|r| r as Arc<dyn UserRepository>)
                .constructor(Vec::new(), |_| Ok(MemoryUserRepository::new()))
                .build()
        })
        .component(|| {
            ComponentDescriptor::builder::<UserService>()
                .marker(Marker::service())
                .constructor(vec![DependencySlot::single::<dyn UserRepository>()], |args| {
                    Ok(UserService {
                        repository: args.one_dyn::<dyn UserRepository>(0)?,
                    })
                })
                .method(
                    "find_user",
                    vec![Marker::custom("Timed").with_attribute("label", "用户查询")],
                    |service: &UserService, args: &[Value]| {
                        let id = args
                            .first()
                            .and_then(|a| a.downcast_ref::<u64>())
                            .copied()
                            .ok_or("缺少用户 ID")?;
                        Ok(Box::new(service.find_user(id)) as Value)
                    },
                )
                .build()
        })
        .component(|| {
            ComponentDescriptor::builder::<TimingInterceptor>()
                .interceptor_for(MarkerKind::custom("Timed"))
                .constructor(Vec::new(), |_| Ok(TimingInterceptor))
                .build()
        })
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let context = ContainerBuilder::new()
        .auto_configure_development()
        .add_scanner(scanner())
        .on_startup(|context| {
            info!("容器就绪，共 {} 个组件", context.descriptors().len());
            Ok(())
        })
        .start()
        .await?;

    let proxy = context.proxy_of(&TypeInfo::of::<UserService>())?;
    for id in [1_u64, 3] {
        let user = proxy.invoke_as::<Option<User>>("find_user", &[Box::new(id) as Value])?;
        match user {
            Some(user) => info!("找到用户: {}", serde_json::to_string(&user)?),
            None => info!("用户不存在: {}", id),
        }
    }

    Ok(())
}
