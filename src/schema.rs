//! Schema模块，描述可过滤字段的类型，负责加载JSON配置文件
//!
//! FIQL 的值在文本里都是裸字符串，字段的真实类型（数字、日期、枚举、集合）
//! 由这里的 schema 决定，语法分析器据此为字面量定型

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Schema配置错误
#[derive(Debug)]
pub struct SchemaError {
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "schema error: {}", self.message)
    }
}

impl std::error::Error for SchemaError {}

impl SchemaError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// 单个字段的类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Date,
    /// 枚举字段，值必须是列出的变体名之一
    Enum { values: Vec<String> },
    /// 多值字段，标量比较按字符串处理，count() 检查只对它有意义
    Collection,
}

/// 可过滤字段的类型表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// 属性名到字段类型的映射
    #[serde(flatten)]
    pub fields: HashMap<String, FieldKind>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从JSON文件加载schema
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(SchemaError::new(format!(
                "schema file does not exist: {}",
                path_ref.display()
            )));
        }

        let content = fs::read_to_string(path_ref).map_err(|e| {
            SchemaError::new(format!(
                "failed to read schema file {}: {}",
                path_ref.display(),
                e
            ))
        })?;

        Self::from_json_str(&content).map_err(|e| {
            SchemaError::new(format!(
                "failed to parse schema file {}: {}",
                path_ref.display(),
                e.message
            ))
        })
    }

    /// 从JSON字符串加载schema
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(content).map_err(|e| SchemaError::new(e.to_string()))
    }

    /// 查询字段类型，未声明的字段返回 None
    pub fn field(&self, property: &str) -> Option<&FieldKind> {
        self.fields.get(property)
    }

    /// 登记一个字段类型，主要给测试和手工组装用
    pub fn with_field(mut self, property: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(property.into(), kind);
        self
    }
}
