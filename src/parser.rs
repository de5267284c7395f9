//! FIQL过滤表达式的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   └─ parse_or_expression()          逗号 ',' 结合最松
//!        └─ parse_and_expression()    分号 ';' 其次
//!             └─ parse_primary()
//!                  ├─ "(" → 分组表达式 (递归调用parse_or_expression)
//!                  └─ 比较表达式
//!                       ├─ 属性名，或 count(属性名) 集合检查形式
//!                       ├─ 比较运算符 (==, !=, =lt=, =le=, =gt=, =ge=, 自定义)
//!                       └─ 原始值文本 → 按 schema 定型为字面量
//! ```
//!
//! ## 值的定型规则
//!
//! FIQL 文本里的值都是裸字符串，按 schema 中声明的字段类型定型：
//! - **string**: 原样保留
//! - **number**: 解析为 i64，失败即报错
//! - **date**: 按配置的日期格式解析（默认接受 `2017-07-04` 和
//!   `2017-07-04T07:07:07[.235]` 两类形式），失败即报错
//! - **enum**: 值必须是声明的变体名之一
//! - **collection**: 标量比较按字符串处理；`count(prop)` 形式给叶子
//!   挂上集合基数检查标记，由输出端决定接受与否
//!
//! 未在 schema 中声明的属性是解析错误。`count()` 用在非集合字段上时
//! 直接剥掉，当作对字段本身的普通比较。

use crate::ast::{
    CollectionCheck, CollectionCheckKind, Combinator, CompOp, Comparison, ConditionNode, Literal,
};
use crate::lexer::Lexer;
use crate::schema::{FieldKind, Schema};
use crate::token::{Span, Token, TokenKind};
use crate::value;

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    schema: &'a Schema,
    /// 日期字面量的自定义解析格式（chrono strftime）
    date_parse_format: Option<&'a str>,
    position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self {
            message,
            span: Some(span),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} (at {}-{})", self.message, span.start, span.end),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}

/// 词法分析加语法分析一步到位的便捷入口
pub fn parse_filter(input: &str, schema: &Schema) -> Result<ConditionNode, ParseError> {
    parse_filter_with_date_format(input, schema, None)
}

/// 同 [`parse_filter`]，但日期字面量按给定格式解析
/// 翻译端配置了自定义日期格式时必须同步传入，否则往返会丢失精度
pub fn parse_filter_with_date_format(
    input: &str,
    schema: &Schema,
    date_parse_format: Option<&str>,
) -> Result<ConditionNode, ParseError> {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::with_date_format(&tokens, schema, date_parse_format);
    parser.parse()
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>], schema: &'a Schema) -> Self {
        Self::with_date_format(tokens, schema, None)
    }

    pub fn with_date_format(
        tokens: &'a [Token<'a>],
        schema: &'a Schema,
        date_parse_format: Option<&'a str>,
    ) -> Self {
        Self {
            tokens,
            schema,
            date_parse_format,
            position: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&Token<'a>> {
        if self.position < self.tokens.len() {
            let token = &self.tokens[self.position];
            self.position += 1;
            Some(token)
        } else {
            None
        }
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind) -> Result<&Token<'a>, ParseError> {
        if let Some(token) = self.peek() {
            if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) {
                Ok(self.advance().unwrap())
            } else {
                Err(ParseError::at_position(
                    format!("expected {:?}, found {:?}", expected, token.kind),
                    token.span,
                ))
            }
        } else {
            Err(ParseError::new(
                format!("expected {:?}, but reached end of input", expected),
                None,
            ))
        }
    }

    /// 期望一个文本 token，返回其内容和位置
    fn expect_text(&mut self) -> Result<(&'a str, Span), ParseError> {
        let token = self.expect(TokenKind::Text(""))?;
        match &token.kind {
            TokenKind::Text(text) => Ok((*text, token.span)),
            _ => unreachable!("expect() guarantees a Text token"),
        }
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: &TokenKind) -> bool {
        match self.peek() {
            Some(token) => std::mem::discriminant(&token.kind) == std::mem::discriminant(kind),
            None => false,
        }
    }

    pub fn parse(&mut self) -> Result<ConditionNode, ParseError> {
        let node = self.parse_or_expression()?;

        if let Some(token) = self.peek() {
            return Err(ParseError::at_position(
                format!("unexpected token: {:?}", token.kind),
                token.span,
            ));
        }
        Ok(node)
    }

    /// 解析 ',' 分隔的 OR 表达式
    fn parse_or_expression(&mut self) -> Result<ConditionNode, ParseError> {
        let mut children = vec![self.parse_and_expression()?];

        while self.match_token(&TokenKind::Comma) {
            self.advance(); // 消费 ','
            children.push(self.parse_and_expression()?);
        }

        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(ConditionNode::Composite {
                combinator: Combinator::Or,
                children,
            })
        }
    }

    /// 解析 ';' 分隔的 AND 表达式
    fn parse_and_expression(&mut self) -> Result<ConditionNode, ParseError> {
        let mut children = vec![self.parse_primary()?];

        while self.match_token(&TokenKind::Semicolon) {
            self.advance(); // 消费 ';'
            children.push(self.parse_primary()?);
        }

        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(ConditionNode::Composite {
                combinator: Combinator::And,
                children,
            })
        }
    }

    /// 解析括号分组，或一次基础比较
    fn parse_primary(&mut self) -> Result<ConditionNode, ParseError> {
        if self.match_token(&TokenKind::LParen) {
            self.advance(); // 消费 '('
            let node = self.parse_or_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(node);
        }
        self.parse_comparison()
    }

    /// 解析 `prop==value` 或 `count(prop)=op=value`
    fn parse_comparison(&mut self) -> Result<ConditionNode, ParseError> {
        let (property, property_span, count_form) = self.parse_property()?;

        let op = self.parse_operator()?;

        let (raw_value, value_span) = self.expect_text()?;

        let Some(kind) = self.schema.field(&property) else {
            return Err(ParseError::at_position(
                format!("unknown property '{}'", property),
                property_span,
            ));
        };

        let mut collection_check = None;
        let value = match kind {
            FieldKind::String => Literal::String(raw_value.to_string()),
            FieldKind::Number => Literal::Number(self.parse_number(raw_value, value_span)?),
            FieldKind::Date => match value::parse_date(raw_value, self.date_parse_format) {
                Some(date) => Literal::Date(date),
                None => {
                    return Err(ParseError::at_position(
                        format!("cannot parse '{}' as a date", raw_value),
                        value_span,
                    ));
                }
            },
            FieldKind::Enum { values } => {
                if !values.iter().any(|v| v == raw_value) {
                    return Err(ParseError::at_position(
                        format!(
                            "'{}' is not a value of enum property '{}'",
                            raw_value, property
                        ),
                        value_span,
                    ));
                }
                Literal::Enum(raw_value.to_string())
            }
            FieldKind::Collection => {
                if count_form {
                    // 集合上的 count() 是基数检查，值一定是个数
                    let count = self.parse_number(raw_value, value_span)?;
                    collection_check = Some(CollectionCheck {
                        kind: CollectionCheckKind::Size,
                        value: count,
                    });
                    Literal::Number(count)
                } else {
                    Literal::String(raw_value.to_string())
                }
            }
        };

        Ok(ConditionNode::Leaf(Comparison {
            property,
            op,
            value,
            collection_check,
        }))
    }

    /// 解析属性名，识别 `count(prop)` 形式
    /// 返回 (属性名, 属性名的位置, 是否为 count 形式)
    fn parse_property(&mut self) -> Result<(String, Span, bool), ParseError> {
        let (text, span) = self.expect_text()?;

        // count(prop) 形式：非集合字段上的 count 由调用方剥掉
        if text == "count" && self.match_token(&TokenKind::LParen) {
            self.advance(); // 消费 '('
            let (inner_text, inner_span) = self.expect_text()?;
            self.expect(TokenKind::RParen)?;
            return Ok((inner_text.to_string(), inner_span, true));
        }

        Ok((text.to_string(), span, false))
    }

    /// 解析比较运算符
    fn parse_operator(&mut self) -> Result<CompOp, ParseError> {
        match self.advance() {
            Some(token) => {
                let op = match &token.kind {
                    TokenKind::Eq => CompOp::Eq,
                    TokenKind::NotEq => CompOp::NotEq,
                    TokenKind::Lt => CompOp::Lt,
                    TokenKind::Le => CompOp::Lte,
                    TokenKind::Gt => CompOp::Gt,
                    TokenKind::Ge => CompOp::Gte,
                    TokenKind::Custom(tok) => CompOp::Custom(tok.to_string()),
                    other => {
                        return Err(ParseError::at_position(
                            format!("expected a comparison operator, found {:?}", other),
                            token.span,
                        ));
                    }
                };
                Ok(op)
            }
            None => Err(ParseError::new(
                "expected a comparison operator, but reached end of input".to_string(),
                None,
            )),
        }
    }

    fn parse_number(&self, raw: &str, span: Span) -> Result<i64, ParseError> {
        raw.parse::<i64>().map_err(|_| {
            ParseError::at_position(format!("cannot parse '{}' as a number", raw), span)
        })
    }
}
