//! 依赖槽位
//!
//! 一个构造参数或字段对应一个 [`DependencySlot`]，解析完成后得到 [`SlotBinding`]，
//! 实例化时再转换为注入值 [`Injected`]。

use crate::descriptor::{ComponentDescriptor, Instance};
use infrastructure_common::{BoxError, TypeInfo};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 槽位形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotShape {
    /// 单值，必须恰好绑定一个提供者
    Single,
    /// 集合，绑定所有兼容的提供者
    Collection,
}

/// 依赖槽位
#[derive(Debug, Clone)]
pub struct DependencySlot {
    /// 需要的类型（集合槽位为元素类型）
    pub required_type: TypeInfo,
    /// 限定名
    pub qualifier: Option<String>,
    /// 是否必需
    pub required: bool,
    /// 槽位形态
    pub shape: SlotShape,
    /// 参数名或字段名，仅用于诊断
    pub label: Option<String>,
}

impl DependencySlot {
    /// 单值槽位
    pub fn single<T: ?Sized + 'static>() -> Self {
        Self {
            required_type: TypeInfo::of::<T>(),
            qualifier: None,
            required: true,
            shape: SlotShape::Single,
            label: None,
        }
    }

    /// 集合槽位，请求所有兼容 `T` 的提供者
    pub fn collection<T: ?Sized + 'static>() -> Self {
        Self {
            shape: SlotShape::Collection,
            ..Self::single::<T>()
        }
    }

    /// 设置限定名
    pub fn qualified(mut self, name: impl Into<String>) -> Self {
        self.qualifier = Some(name.into());
        self
    }

    /// 标记为可缺省
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// 设置诊断标签
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 是否为集合槽位
    pub fn is_collection(&self) -> bool {
        self.shape == SlotShape::Collection
    }

    /// 诊断用描述
    pub fn describe(&self) -> String {
        let type_name = match self.shape {
            SlotShape::Single => self.required_type.short_name().to_string(),
            SlotShape::Collection => format!("Vec<{}>", self.required_type.short_name()),
        };
        match &self.label {
            Some(label) => format!("{label}: {type_name}"),
            None => type_name,
        }
    }
}

/// 槽位的解析结果
#[derive(Clone)]
pub enum SlotBinding {
    /// 绑定到单个组件
    Component {
        /// 被绑定的组件（可能是工厂产出的组件）
        descriptor: Arc<ComponentDescriptor>,
        /// 注入时使用的类型视图
        as_type: TypeInfo,
    },
    /// 绑定到所有兼容组件
    Collection {
        /// 被绑定的组件，顺序稳定
        descriptors: Vec<Arc<ComponentDescriptor>>,
        /// 元素类型视图
        as_type: TypeInfo,
    },
    /// 外部解析器提供的值
    External {
        /// 外部值
        value: Instance,
    },
    /// 可缺省槽位未找到提供者
    Absent,
}

impl SlotBinding {
    /// 绑定到的组件列表
    pub fn descriptors(&self) -> Vec<&Arc<ComponentDescriptor>> {
        match self {
            Self::Component { descriptor, .. } => vec![descriptor],
            Self::Collection { descriptors, .. } => descriptors.iter().collect(),
            Self::External { .. } | Self::Absent => Vec::new(),
        }
    }

    /// 是否为缺省值
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Debug for SlotBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component { descriptor, as_type } => f
                .debug_struct("Component")
                .field("descriptor", &descriptor.display_name())
                .field("as_type", &as_type.short_name())
                .finish(),
            Self::Collection {
                descriptors,
                as_type,
            } => f
                .debug_struct("Collection")
                .field(
                    "descriptors",
                    &descriptors
                        .iter()
                        .map(|d| d.display_name())
                        .collect::<Vec<_>>(),
                )
                .field("as_type", &as_type.short_name())
                .finish(),
            Self::External { .. } => f.write_str("External"),
            Self::Absent => f.write_str("Absent"),
        }
    }
}

/// 注入值
#[derive(Clone)]
pub enum Injected {
    /// 单个实例
    One(Instance),
    /// 实例集合
    Many(Vec<Instance>),
    /// 缺省
    Absent,
}

/// 按具体类型读取实例，兼容别名包装 `Arc<Arc<T>>`
fn view<T: Any + Send + Sync>(instance: &Instance) -> Option<Arc<T>> {
    if let Some(wrapped) = instance.downcast_ref::<Arc<T>>() {
        return Some(wrapped.clone());
    }
    instance.clone().downcast::<T>().ok()
}

/// 按 trait 对象类型读取实例
fn view_dyn<A: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Option<Arc<A>> {
    instance.downcast_ref::<Arc<A>>().cloned()
}

fn mismatch<T: ?Sized>() -> BoxError {
    format!("注入值类型不匹配: 期望 {}", std::any::type_name::<T>()).into()
}

impl Injected {
    /// 原始实例
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Self::One(instance) => Some(instance),
            _ => None,
        }
    }

    /// 读取单个具体类型实例
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance().and_then(view::<T>)
    }

    /// 读取单个 trait 对象实例
    pub fn get_dyn<A: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<A>> {
        self.instance().and_then(view_dyn::<A>)
    }

    /// 读取必需的具体类型实例
    pub fn require<T: Any + Send + Sync>(&self) -> Result<Arc<T>, BoxError> {
        self.get::<T>().ok_or_else(mismatch::<T>)
    }

    /// 读取必需的 trait 对象实例
    pub fn require_dyn<A: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<A>, BoxError> {
        self.get_dyn::<A>().ok_or_else(mismatch::<A>)
    }

    /// 读取集合中的具体类型实例，类型不符的元素被忽略
    pub fn all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        match self {
            Self::Many(items) => items.iter().filter_map(view::<T>).collect(),
            Self::One(instance) => view::<T>(instance).into_iter().collect(),
            Self::Absent => Vec::new(),
        }
    }

    /// 读取集合中的 trait 对象实例
    pub fn all_dyn<A: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<A>> {
        match self {
            Self::Many(items) => items.iter().filter_map(view_dyn::<A>).collect(),
            Self::One(instance) => view_dyn::<A>(instance).into_iter().collect(),
            Self::Absent => Vec::new(),
        }
    }

    /// 是否缺省
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(_) => f.write_str("One(..)"),
            Self::Many(items) => write!(f, "Many({})", items.len()),
            Self::Absent => f.write_str("Absent"),
        }
    }
}

/// 构造参数
#[derive(Debug, Clone, Default)]
pub struct ConstructorArgs {
    values: Vec<Injected>,
}

impl ConstructorArgs {
    /// 创建构造参数
    pub fn new(values: Vec<Injected>) -> Self {
        Self { values }
    }

    /// 参数数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 读取指定位置的参数
    pub fn get(&self, index: usize) -> Option<&Injected> {
        self.values.get(index)
    }

    /// 全部参数
    pub fn values(&self) -> &[Injected] {
        &self.values
    }

    fn at(&self, index: usize) -> Result<&Injected, BoxError> {
        self.values
            .get(index)
            .ok_or_else(|| format!("构造参数越界: {index}").into())
    }

    /// 读取必需的具体类型参数
    pub fn one<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        self.at(index)?.require::<T>()
    }

    /// 读取必需的 trait 对象参数
    pub fn one_dyn<A: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Arc<A>, BoxError> {
        self.at(index)?.require_dyn::<A>()
    }

    /// 读取可缺省的具体类型参数
    pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.values.get(index).and_then(Injected::get::<T>)
    }

    /// 读取可缺省的 trait 对象参数
    pub fn optional_dyn<A: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Option<Arc<A>> {
        self.values.get(index).and_then(Injected::get_dyn::<A>)
    }

    /// 读取集合参数
    pub fn all<T: Any + Send + Sync>(&self, index: usize) -> Vec<Arc<T>> {
        self.values.get(index).map(Injected::all::<T>).unwrap_or_default()
    }

    /// 读取 trait 对象集合参数
    pub fn all_dyn<A: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Vec<Arc<A>> {
        self.values
            .get(index)
            .map(Injected::all_dyn::<A>)
            .unwrap_or_default()
    }
}
