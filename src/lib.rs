//! FIQL 过滤表达式翻译器
//!
//! 把 FIQL 过滤字符串解析成条件树，再翻译成两种输出之一：
//! Elasticsearch 风格的结构化查询（[`es_compiler`]），
//! 或经过字段改名/日期重排/自定义替换的新 FIQL 字符串（[`fiql_rewriter`]）。

pub mod ast;
pub mod token;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod value;
pub mod visitor;
pub mod es_compiler;
pub mod fiql_rewriter;
