//! 组件描述符
//!
//! [`ComponentDescriptor`] 描述一个受管组件：类型标识、标记、限定名、作用域、
//! 依赖槽位、生命周期钩子、工厂方法产出的子组件以及方法拦截绑定。
//! 普通组件与工厂产出组件共享同一份基础记录，差异放在 [`DescriptorKind`] 中。

use crate::interceptor::{InterceptorBinding, MethodInterceptor};
use crate::slot::{ConstructorArgs, DependencySlot, Injected, SlotBinding};
use infrastructure_common::{
    BoxError, DependencyError, DependencyResult, LifecycleState, Marker, MarkerKind, ScopeType,
    TypeInfo,
};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

/// 组件实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 方法参数与返回值
pub type Value = Box<dyn Any + Send + Sync>;

/// 构造器调用
pub type ConstructorInvoke =
    Arc<dyn Fn(&ConstructorArgs) -> Result<Instance, BoxError> + Send + Sync>;

/// 工厂方法：在根组件的实例上调用
pub type FactoryMethodFn = Arc<dyn Fn(&Instance) -> Result<Instance, BoxError> + Send + Sync>;

/// 字段注入
pub type FieldInjectFn = Arc<dyn Fn(&Instance, Injected) -> Result<(), BoxError> + Send + Sync>;

/// 生命周期钩子
pub type LifecycleHook = Arc<dyn Fn(&Instance) -> Result<(), BoxError> + Send + Sync>;

/// 业务方法
pub type MethodFn = Arc<dyn Fn(&Instance, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// 类型视图转换
pub type CastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// 方法标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey(String);

impl MethodKey {
    /// 创建方法标识
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// 方法名
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MethodKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 构造器
#[derive(Clone)]
pub struct ConstructorFn {
    /// 声明的参数数量
    pub arity: usize,
    /// 调用入口
    pub invoke: ConstructorInvoke,
}

impl ConstructorFn {
    /// 创建构造器
    pub fn new<F>(arity: usize, invoke: F) -> Self
    where
        F: Fn(&ConstructorArgs) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Self {
            arity,
            invoke: Arc::new(invoke),
        }
    }
}

/// 类型别名
///
/// 组件可以以 trait 对象的身份被注入，转换结果是包装在 [`Instance`] 中的 `Arc<dyn Trait>`。
#[derive(Clone)]
pub struct TypeAlias {
    /// 别名类型
    pub type_info: TypeInfo,
    /// 转换的来源类型，普通别名即组件自身类型
    pub source: TypeInfo,
    /// 转换函数
    pub cast: CastFn,
}

/// 字段槽位及其注入函数
#[derive(Clone)]
pub struct FieldSlot {
    /// 依赖槽位
    pub slot: DependencySlot,
    /// 注入函数
    pub inject: FieldInjectFn,
}

/// 方法描述
#[derive(Clone)]
pub struct MethodDescriptor {
    /// 方法标识
    pub key: MethodKey,
    /// 方法上的标记，按声明顺序
    pub markers: Vec<Marker>,
    /// 调用入口
    pub invoke: MethodFn,
}

/// 描述符变体
pub enum DescriptorKind {
    /// 普通组件
    Component {
        /// 构造器，外部提供的实例没有构造器
        constructor: Option<ConstructorFn>,
        /// 工厂方法产出的子组件
        factories: Vec<Arc<ComponentDescriptor>>,
    },
    /// 工厂方法产出的组件
    Factory {
        /// 所属的根组件
        root: Weak<ComponentDescriptor>,
        /// 生产方法
        method: FactoryMethodFn,
    },
}

/// 描述符身份
///
/// 类型、限定名、标记与作用域都相同的描述符视为同一组件。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorIdentity {
    /// 声明类型
    pub type_info: TypeInfo,
    /// 限定名
    pub instance_name: Option<String>,
    /// 标记种类
    pub marker: MarkerKind,
    /// 作用域
    pub scope: ScopeType,
}

/// 实例状态
#[derive(Default)]
pub struct InstanceState {
    /// 真实实例
    pub instance: Option<Instance>,
    /// 代理实例
    pub proxy: Option<Instance>,
    /// 原型作用域：构建时的实例是否已被读取过
    pub served: bool,
    /// 记录的构造参数绑定
    pub constructor_bindings: Option<Vec<SlotBinding>>,
    /// 记录的字段绑定
    pub field_bindings: Option<Vec<SlotBinding>>,
    /// 生命周期状态
    pub lifecycle: LifecycleState,
}

impl InstanceState {
    /// 对外暴露的实例：代理优先
    pub fn exposed(&self) -> Option<Instance> {
        self.proxy.clone().or_else(|| self.instance.clone())
    }
}

/// 组件描述符
pub struct ComponentDescriptor {
    type_info: TypeInfo,
    marker: Marker,
    instance_name: Option<String>,
    scope: RwLock<ScopeType>,
    aliases: Vec<TypeAlias>,
    constructor_slots: Vec<DependencySlot>,
    field_slots: Vec<FieldSlot>,
    post_construct: Option<LifecycleHook>,
    pre_destroy: Option<LifecycleHook>,
    methods: Vec<MethodDescriptor>,
    handles: Option<MarkerKind>,
    interceptors: RwLock<BTreeMap<MethodKey, Vec<InterceptorBinding>>>,
    state: Mutex<InstanceState>,
    kind: DescriptorKind,
}

impl ComponentDescriptor {
    /// 创建 `@Component` 组件构建器
    pub fn builder<T: Send + Sync + 'static>() -> ComponentBuilder<T> {
        ComponentBuilder::new(Marker::component())
    }

    /// 创建 `@Bean` 组件构建器，用于工厂方法产出的组件
    pub fn bean<T: Send + Sync + 'static>() -> ComponentBuilder<T> {
        ComponentBuilder::new(Marker::bean())
    }

    /// 包装外部提供的实例
    pub fn provided<T: Send + Sync + 'static>(instance: Arc<T>) -> Arc<Self> {
        Self::builder::<T>().provide(instance)
    }

    /// 声明类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 来源标记
    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    /// 限定名
    pub fn instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    /// 当前作用域
    pub fn scope(&self) -> ScopeType {
        *self.scope.read()
    }

    /// 调整作用域，仅在解析之前使用
    pub fn set_scope(&self, scope: ScopeType) {
        *self.scope.write() = scope;
    }

    /// 类型别名
    pub fn aliases(&self) -> &[TypeAlias] {
        &self.aliases
    }

    /// 构造参数槽位
    pub fn constructor_slots(&self) -> &[DependencySlot] {
        &self.constructor_slots
    }

    /// 字段槽位
    pub fn field_slots(&self) -> &[FieldSlot] {
        &self.field_slots
    }

    /// 构建完成钩子
    pub fn post_construct(&self) -> Option<&LifecycleHook> {
        self.post_construct.as_ref()
    }

    /// 销毁前钩子
    pub fn pre_destroy(&self) -> Option<&LifecycleHook> {
        self.pre_destroy.as_ref()
    }

    /// 方法表
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// 按名称查找方法
    pub fn method(&self, key: &MethodKey) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| &m.key == key)
    }

    /// 作为拦截器时处理的标记种类
    pub fn handles(&self) -> Option<&MarkerKind> {
        self.handles.as_ref()
    }

    /// 描述符变体
    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    /// 是否为工厂产出的组件
    pub fn is_factory(&self) -> bool {
        matches!(self.kind, DescriptorKind::Factory { .. })
    }

    /// 构造器
    pub fn constructor(&self) -> Option<&ConstructorFn> {
        match &self.kind {
            DescriptorKind::Component { constructor, .. } => constructor.as_ref(),
            DescriptorKind::Factory { .. } => None,
        }
    }

    /// 工厂方法产出的子组件
    pub fn factories(&self) -> &[Arc<ComponentDescriptor>] {
        match &self.kind {
            DescriptorKind::Component { factories, .. } => factories,
            DescriptorKind::Factory { .. } => &[],
        }
    }

    /// 工厂产出组件的根组件
    pub fn root(&self) -> Option<Arc<ComponentDescriptor>> {
        match &self.kind {
            DescriptorKind::Factory { root, .. } => root.upgrade(),
            DescriptorKind::Component { .. } => None,
        }
    }

    /// 负责产出该组件的描述符：普通组件是自身，工厂产出组件是根组件
    pub fn producer_of(descriptor: &Arc<Self>) -> Option<Arc<Self>> {
        match &descriptor.kind {
            DescriptorKind::Component { .. } => Some(descriptor.clone()),
            DescriptorKind::Factory { root, .. } => root.upgrade(),
        }
    }

    /// 描述符身份
    pub fn identity(&self) -> DescriptorIdentity {
        DescriptorIdentity {
            type_info: self.type_info.clone(),
            instance_name: self.instance_name.clone(),
            marker: self.marker.kind.clone(),
            scope: self.scope(),
        }
    }

    /// 诊断用名称
    pub fn display_name(&self) -> String {
        match &self.instance_name {
            Some(name) => format!("{}[{}]", self.type_info.short_name(), name),
            None => self.type_info.short_name().to_string(),
        }
    }

    /// 限定名是否匹配（忽略大小写）
    pub fn matches_name(&self, name: &str) -> bool {
        self.instance_name
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(name))
    }

    /// 是否可以赋值给指定类型
    ///
    /// 声明类型、别名或已存在实例的运行时类型任一匹配即可。
    pub fn is_assignable_to(&self, type_info: &TypeInfo) -> bool {
        if &self.type_info == type_info || self.aliases.iter().any(|a| &a.type_info == type_info)
        {
            return true;
        }
        let state = self.state.lock();
        let hit = [&state.instance, &state.proxy]
            .into_iter()
            .flatten()
            .any(|instance| (**instance).type_id() == type_info.id);
        hit
    }

    /// 把实例转换为指定类型的视图，无法转换时原样返回
    pub fn view(&self, instance: &Instance, as_type: &TypeInfo) -> Instance {
        if (**instance).type_id() == as_type.id {
            return instance.clone();
        }
        self.aliases
            .iter()
            .filter(|alias| &alias.type_info == as_type)
            .find_map(|alias| (alias.cast)(instance))
            .unwrap_or_else(|| instance.clone())
    }

    /// 锁定实例状态
    ///
    /// 持有锁期间不要调用用户代码。
    pub fn lock_state(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock()
    }

    /// 真实实例
    pub fn instance(&self) -> Option<Instance> {
        self.state.lock().instance.clone()
    }

    /// 代理实例
    pub fn proxy(&self) -> Option<Instance> {
        self.state.lock().proxy.clone()
    }

    /// 对外暴露的实例（不触发原型语义）
    pub fn exposed(&self) -> Option<Instance> {
        self.state.lock().exposed()
    }

    /// 保存实例
    pub fn set_instance(&self, instance: Instance) {
        let mut state = self.state.lock();
        state.instance = Some(instance);
        state.served = false;
        state.lifecycle = LifecycleState::Live;
    }

    /// 保存代理实例，只能设置一次
    pub fn set_proxy(&self, proxy: Instance) -> DependencyResult<()> {
        let mut state = self.state.lock();
        if state.proxy.is_some() {
            return Err(DependencyError::ProxyAlreadyCreated {
                type_name: self.type_info.name.clone(),
            });
        }
        state.proxy = Some(proxy);
        Ok(())
    }

    /// 记录解析得到的槽位绑定
    pub fn record_bindings(&self, constructor: Vec<SlotBinding>, fields: Vec<SlotBinding>) {
        let mut state = self.state.lock();
        state.constructor_bindings = Some(constructor);
        state.field_bindings = Some(fields);
    }

    /// 已记录的槽位绑定
    pub fn recorded_bindings(&self) -> Option<(Vec<SlotBinding>, Vec<SlotBinding>)> {
        let state = self.state.lock();
        match (&state.constructor_bindings, &state.field_bindings) {
            (Some(constructor), Some(fields)) => Some((constructor.clone(), fields.clone())),
            _ => None,
        }
    }

    /// 生命周期状态
    pub fn lifecycle(&self) -> LifecycleState {
        self.state.lock().lifecycle
    }

    /// 拦截器绑定表的快照
    pub fn interceptors(&self) -> BTreeMap<MethodKey, Vec<InterceptorBinding>> {
        self.interceptors.read().clone()
    }

    /// 指定方法上的拦截器绑定
    pub fn interceptors_for(&self, method: &MethodKey) -> Vec<InterceptorBinding> {
        self.interceptors
            .read()
            .get(method)
            .cloned()
            .unwrap_or_default()
    }

    /// 是否存在拦截器绑定
    pub fn has_interceptors(&self) -> bool {
        self.interceptors.read().values().any(|b| !b.is_empty())
    }

    /// 追加拦截器绑定
    pub fn bind_interceptor(&self, method: MethodKey, binding: InterceptorBinding) {
        self.interceptors
            .write()
            .entry(method)
            .or_default()
            .push(binding);
    }

    /// 所有拦截器的处理组件
    pub fn interceptor_handlers(&self) -> Vec<Arc<ComponentDescriptor>> {
        let mut handlers: Vec<Arc<ComponentDescriptor>> = Vec::new();
        for binding in self.interceptors.read().values().flatten() {
            if !handlers.iter().any(|h| Arc::ptr_eq(h, &binding.handler)) {
                handlers.push(binding.handler.clone());
            }
        }
        handlers
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type", &self.type_info.name)
            .field("marker", &self.marker.kind)
            .field("instance_name", &self.instance_name)
            .field("scope", &self.scope())
            .field("factory", &self.is_factory())
            .field("constructor_slots", &self.constructor_slots.len())
            .field("field_slots", &self.field_slots.len())
            .field("factories", &self.factories().len())
            .finish()
    }
}

impl fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// 描述符的公共部分
struct DescriptorParts {
    type_info: TypeInfo,
    marker: Marker,
    instance_name: Option<String>,
    scope: ScopeType,
    aliases: Vec<TypeAlias>,
    constructor_slots: Vec<DependencySlot>,
    field_slots: Vec<FieldSlot>,
    post_construct: Option<LifecycleHook>,
    pre_destroy: Option<LifecycleHook>,
    methods: Vec<MethodDescriptor>,
    handles: Option<MarkerKind>,
}

impl DescriptorParts {
    fn into_descriptor(self, kind: DescriptorKind, instance: Option<Instance>) -> ComponentDescriptor {
        let mut state = InstanceState::default();
        if instance.is_some() {
            state.lifecycle = LifecycleState::Live;
            state.instance = instance;
        }
        ComponentDescriptor {
            type_info: self.type_info,
            marker: self.marker,
            instance_name: self.instance_name,
            scope: RwLock::new(self.scope),
            aliases: self.aliases,
            constructor_slots: self.constructor_slots,
            field_slots: self.field_slots,
            post_construct: self.post_construct,
            pre_destroy: self.pre_destroy,
            methods: self.methods,
            handles: self.handles,
            interceptors: RwLock::new(BTreeMap::new()),
            state: Mutex::new(state),
            kind,
        }
    }
}

struct FactoryDraft {
    parts: DescriptorParts,
    method: FactoryMethodFn,
}

fn type_mismatch<T>() -> BoxError {
    format!("实例类型不匹配: 期望 {}", std::any::type_name::<T>()).into()
}

/// 组件描述符构建器
///
/// 发现层用它把类型、依赖槽位和各类调用入口组装成描述符。
pub struct ComponentBuilder<T> {
    parts: DescriptorParts,
    constructor: Option<ConstructorFn>,
    factories: Vec<FactoryDraft>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ComponentBuilder<T> {
    fn new(marker: Marker) -> Self {
        Self {
            parts: DescriptorParts {
                type_info: TypeInfo::of::<T>(),
                marker,
                instance_name: None,
                scope: ScopeType::DEFAULT_SCOPE,
                aliases: Vec::new(),
                constructor_slots: Vec::new(),
                field_slots: Vec::new(),
                post_construct: None,
                pre_destroy: None,
                methods: Vec::new(),
                handles: None,
            },
            constructor: None,
            factories: Vec::new(),
            _type: PhantomData,
        }
    }

    /// 设置来源标记
    pub fn marker(mut self, marker: Marker) -> Self {
        self.parts.marker = marker;
        self
    }

    /// 设置限定名
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.parts.instance_name = Some(name.into());
        self
    }

    /// 设置作用域
    pub fn scope(mut self, scope: ScopeType) -> Self {
        self.parts.scope = scope;
        self
    }

    /// 声明 trait 对象别名
    pub fn alias<A>(self, cast: fn(Arc<T>) -> Arc<A>) -> Self
    where
        A: ?Sized + Send + Sync + 'static,
    {
        self.alias_via::<T, A>(cast)
    }

    /// 从任意来源类型声明别名，例如由代理对象包装出的 trait 实现
    ///
    /// 代理作用域组件要以 trait 身份注入，必须声明以代理类型为来源的别名，
    /// 例如 `alias_via::<DispatchProxy, dyn Greeter>(...)`。
    /// 转换在实例类型与 `S` 不符时跳过。
    pub fn alias_via<S, A>(mut self, cast: fn(Arc<S>) -> Arc<A>) -> Self
    where
        S: Send + Sync + 'static,
        A: ?Sized + Send + Sync + 'static,
    {
        let cast: CastFn = Arc::new(move |instance: &Instance| {
            instance
                .clone()
                .downcast::<S>()
                .ok()
                .map(|source| Arc::new(cast(source)) as Instance)
        });
        self.parts.aliases.push(TypeAlias {
            type_info: TypeInfo::of::<A>(),
            source: TypeInfo::of::<S>(),
            cast,
        });
        self
    }

    /// 声明构造器，参数数量取槽位数量
    pub fn constructor<F>(self, slots: Vec<DependencySlot>, construct: F) -> Self
    where
        F: Fn(&ConstructorArgs) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let arity = slots.len();
        self.raw_constructor(
            slots,
            ConstructorFn::new(arity, move |args| {
                construct(args).map(|value| Arc::new(value) as Instance)
            }),
        )
    }

    /// 直接声明构造器与槽位，参数数量由调用方给出
    pub fn raw_constructor(mut self, slots: Vec<DependencySlot>, constructor: ConstructorFn) -> Self {
        self.parts.constructor_slots = slots;
        self.constructor = Some(constructor);
        self
    }

    /// 使用 `Default` 作为无参构造器
    pub fn with_default(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    /// 声明字段注入
    pub fn field<F>(mut self, slot: DependencySlot, inject: F) -> Self
    where
        F: Fn(&T, Injected) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let inject: FieldInjectFn = Arc::new(move |instance: &Instance, value| {
            let target = instance.downcast_ref::<T>().ok_or_else(type_mismatch::<T>)?;
            inject(target, value)
        });
        self.parts.field_slots.push(FieldSlot { slot, inject });
        self
    }

    /// 声明构建完成钩子
    pub fn post_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.parts.post_construct = Some(Self::wrap_hook(hook));
        self
    }

    /// 声明销毁前钩子
    pub fn pre_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.parts.pre_destroy = Some(Self::wrap_hook(hook));
        self
    }

    fn wrap_hook<F>(hook: F) -> LifecycleHook
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Arc::new(move |instance: &Instance| {
            let target = instance.downcast_ref::<T>().ok_or_else(type_mismatch::<T>)?;
            hook(target)
        })
    }

    /// 声明业务方法
    pub fn method<F>(mut self, name: impl Into<String>, markers: Vec<Marker>, invoke: F) -> Self
    where
        F: Fn(&T, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let invoke: MethodFn = Arc::new(move |instance: &Instance, args: &[Value]| {
            let target = instance.downcast_ref::<T>().ok_or_else(type_mismatch::<T>)?;
            invoke(target, args)
        });
        self.parts.methods.push(MethodDescriptor {
            key: MethodKey::new(name),
            markers,
            invoke,
        });
        self
    }

    /// 声明为指定标记种类的拦截器
    pub fn interceptor_for(mut self, kind: MarkerKind) -> Self
    where
        T: MethodInterceptor,
    {
        self.parts.handles = Some(kind);
        self.alias::<dyn MethodInterceptor>(|handler| handler as Arc<dyn MethodInterceptor>)
    }

    /// 声明工厂方法，`product` 只取其类型、标记、限定名、作用域、别名与方法表
    pub fn factory<P, F>(mut self, product: ComponentBuilder<P>, produce: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn(&T) -> Result<P, BoxError> + Send + Sync + 'static,
    {
        let method: FactoryMethodFn = Arc::new(move |root: &Instance| {
            let root = root.downcast_ref::<T>().ok_or_else(type_mismatch::<T>)?;
            produce(root).map(|value| Arc::new(value) as Instance)
        });
        self.factories.push(FactoryDraft {
            parts: product.parts,
            method,
        });
        self
    }

    /// 构建描述符
    pub fn build(self) -> Arc<ComponentDescriptor> {
        self.assemble(None)
    }

    /// 以现成实例构建描述符
    pub fn provide(self, instance: Arc<T>) -> Arc<ComponentDescriptor> {
        self.assemble(Some(instance as Instance))
    }

    fn assemble(self, instance: Option<Instance>) -> Arc<ComponentDescriptor> {
        let Self {
            parts,
            constructor,
            factories,
            ..
        } = self;
        Arc::new_cyclic(|root| {
            let factories = factories
                .into_iter()
                .map(|draft| {
                    Arc::new(draft.parts.into_descriptor(
                        DescriptorKind::Factory {
                            root: root.clone(),
                            method: draft.method,
                        },
                        None,
                    ))
                })
                .collect();
            parts.into_descriptor(
                DescriptorKind::Component {
                    constructor,
                    factories,
                },
                instance,
            )
        })
    }
}
