//! 条件树模型：FIQL过滤表达式解析后的抽象语法树

use chrono::NaiveDateTime;

/// 条件树的一个节点
/// 叶子是一次基础比较，复合节点用 AND/OR 组合若干子节点
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    /// 基础比较运算, 这是条件树的叶子节点
    Leaf(Comparison),
    /// 逻辑组合节点, children 至少有一个元素
    Composite {
        combinator: Combinator,
        children: Vec<ConditionNode>,
    },
}

/// 复合节点的组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// 逻辑与 (FIQL 中的 `;`)
    And,
    /// 逻辑或 (FIQL 中的 `,`)
    Or,
}

/// 一次基础比较, 例如：`storedBytes=gt=100`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub property: String,
    pub op: CompOp,
    pub value: Literal,
    /// `count(prop)` 形式的集合基数检查标记
    /// 只在集合类型字段上出现，结构化输出端会拒绝它
    pub collection_check: Option<CollectionCheck>,
}

/// 比较运算符
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompOp {
    Eq,             // ==
    NotEq,          // !=
    Lt,             // =lt=
    Lte,            // =le=
    Gt,             // =gt=
    Gte,            // =ge=
    Custom(String), // 未识别的 =tok= 运算符，两端都不渲染它
}

impl CompOp {
    /// 返回运算符的 FIQL 文本形式，自定义运算符没有规范形式
    pub fn fiql_token(&self) -> Option<&str> {
        match self {
            CompOp::Eq => Some("=="),
            CompOp::NotEq => Some("!="),
            CompOp::Lt => Some("=lt="),
            CompOp::Lte => Some("=le="),
            CompOp::Gt => Some("=gt="),
            CompOp::Gte => Some("=ge="),
            CompOp::Custom(_) => None,
        }
    }
}

impl std::fmt::Display for CompOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompOp::Custom(tok) => write!(f, "{}", tok),
            _ => write!(f, "{}", self.fiql_token().unwrap_or("")),
        }
    }
}

/// 字面量值，类型由 schema 决定
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(i64),
    Date(NaiveDateTime),
    /// 枚举字段的值，保存的是变体名而不是序号
    Enum(String),
}

/// 集合基数检查, 例如：`count(tags)=ge=2`
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionCheck {
    pub kind: CollectionCheckKind,
    pub value: i64,
}

/// 集合检查的种类，FIQL 目前只定义了元素个数检查
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionCheckKind {
    Size,
}

impl std::fmt::Display for CollectionCheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionCheckKind::Size => write!(f, "SIZE"),
        }
    }
}

impl ConditionNode {
    /// 构造一个不带集合检查标记的叶子节点
    pub fn leaf(property: impl Into<String>, op: CompOp, value: Literal) -> Self {
        ConditionNode::Leaf(Comparison {
            property: property.into(),
            op,
            value,
            collection_check: None,
        })
    }
}
