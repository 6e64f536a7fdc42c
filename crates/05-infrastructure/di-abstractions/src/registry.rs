//! 组件注册表抽象接口
//!
//! 启动完成后面向使用方的查询边界

use crate::descriptor::Instance;
use infrastructure_common::{DependencyResult, MarkerKind, TypeInfo};
use std::collections::BTreeMap;

/// 组件注册表 trait
///
/// 提供按类型、名称、标记查询组件以及更新、重载实例的接口
pub trait ComponentRegistry: Send + Sync {
    /// 所有组件定义的名称
    fn definition_names(&self) -> Vec<String>;

    /// 组件定义数量
    fn definition_count(&self) -> usize;

    /// 按限定名获取组件
    fn get_by_name(&self, name: &str) -> DependencyResult<Instance>;

    /// 按类型获取组件，可附带限定名
    fn get_by_type(&self, type_info: &TypeInfo, name: Option<&str>) -> DependencyResult<Instance>;

    /// 获取所有可赋值给指定类型的组件
    fn implementations(&self, type_info: &TypeInfo) -> Vec<Instance>;

    /// 获取带有指定标记的组件，键为小写的类型短名
    fn beans_with_marker(&self, kind: &MarkerKind) -> BTreeMap<String, Instance>;

    /// 获取带有指定标记的组件名称
    fn bean_names_for_marker(&self, kind: &MarkerKind) -> Vec<String>;

    /// 创建一个新实例，不替换已保存的实例
    fn new_instance(&self, type_info: &TypeInfo, name: Option<&str>)
        -> DependencyResult<Instance>;

    /// 替换组件实例
    fn update(&self, type_info: &TypeInfo, instance: Instance, destroy_old: bool)
        -> DependencyResult<()>;

    /// 销毁并重新构建组件实例
    fn reload(&self, type_info: &TypeInfo) -> DependencyResult<()>;

    /// 执行销毁钩子并释放组件实例
    fn destroy(&self, type_info: &TypeInfo) -> DependencyResult<()>;
}
