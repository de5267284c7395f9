use std::collections::HashMap;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use filter_translator::es_compiler::EsQueryCompiler;
use filter_translator::fiql_rewriter::{FiqlRewriter, RewriteContext};
use filter_translator::lexer::Lexer;
use filter_translator::parser;
use filter_translator::schema::{FieldKind, Schema};

/// 创建字段 schema，优先使用JSON配置，失败时使用内置的演示 schema
fn create_schema() -> Schema {
    match Schema::from_json_file("schema.json") {
        Ok(schema) => {
            println!("✅ 成功从JSON配置文件加载字段 schema");
            schema
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用内置演示 schema", e);
            demo_schema()
        }
    }
}

/// 创建改写上下文，优先从JSON文件加载字段映射，失败时使用演示映射
fn create_rewrite_context() -> RewriteContext {
    let mut context = RewriteContext::new();
    match std::fs::read_to_string("field_mapping.json") {
        Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
            Ok(mappings) => {
                println!("✅ 成功从JSON配置文件加载 {} 个字段映射", mappings.len());
                for (from, to) in mappings {
                    context = context.with_field_mapping(from, to);
                }
            }
            Err(e) => {
                println!("❌ 字段映射文件解析失败: {}", e);
                println!("⚠️ 将使用演示映射");
                context = context.with_field_mapping("tenantName", "owner");
            }
        },
        Err(_) => {
            context = context.with_field_mapping("tenantName", "owner");
        }
    }
    context
}

fn demo_schema() -> Schema {
    Schema::new()
        .with_field("tenantName", FieldKind::String)
        .with_field("containerName", FieldKind::String)
        .with_field("storedBytes", FieldKind::Number)
        .with_field("updatedTime", FieldKind::Date)
        .with_field(
            "status",
            FieldKind::Enum {
                values: vec!["AVAILABLE".to_string(), "DELETED".to_string()],
            },
        )
        .with_field("tags", FieldKind::Collection)
}

/// 对一条过滤表达式同时做两种翻译并打印结果
fn translate_and_print(
    filter: &str,
    compiler: &EsQueryCompiler,
    rewriter: &FiqlRewriter,
) {
    match compiler.compile_to_json(filter) {
        Ok(Some(json)) => {
            println!("[结构化查询]:");
            match serde_json::to_string_pretty(&json) {
                Ok(pretty) => println!("{}", pretty),
                Err(e) => println!("❌ JSON 序列化失败: {}", e),
            }
        }
        Ok(None) => println!("[结构化查询]: (空，没有可翻译的比较)"),
        Err(e) => println!("❌ 结构化翻译失败: {}", e),
    }

    match rewriter.translate(filter) {
        Ok(rewritten) if rewritten.is_empty() => {
            println!("[改写后的 FIQL]: (空)");
        }
        Ok(rewritten) => println!("[改写后的 FIQL]: {}", rewritten),
        Err(e) => println!("❌ FIQL 改写失败: {}", e),
    }
}

fn main() -> Result<()> {
    println!("--- Filter Translator: FIQL 过滤表达式翻译器 ---");

    // 显示当前使用的 schema 配置
    println!("\n[配置信息]:");
    let schema = create_schema();

    let compiler = EsQueryCompiler::new(schema.clone());
    let context = create_rewrite_context();
    let rewriter = FiqlRewriter::new(schema.clone(), context);

    // 1. 示例过滤表达式
    let filter = "tenantName==TestTenant;(storedBytes=gt=100;storedBytes=lt=1000),status==AVAILABLE";
    println!("\n[输入 FIQL]:\n{}\n", filter);

    // 2. 词法分析器 - 对表达式进行分词
    println!("[步骤 1]: 对 FIQL 进行分词...");
    let tokens: Vec<_> = Lexer::new(filter).collect();
    println!("生成了 {} 个 token", tokens.len());

    // 3. 语法分析器 - 从 token 构建条件树
    println!("\n[步骤 2]: 将 token 解析为条件树...");
    match parser::parse_filter(filter, &schema) {
        Ok(tree) => {
            println!("✓ 成功解析为条件树");
            println!("条件树结构: {:#?}", tree);
        }
        Err(e) => println!("❌ 解析失败: {}", e),
    }

    // 4. 两种翻译输出
    println!("\n[步骤 3]: 翻译为结构化查询与改写后的 FIQL...");
    translate_and_print(filter, &compiler, &rewriter);

    // 5. 交互模式
    println!("\n--- 交互模式 (输入 FIQL 表达式，exit 退出) ---");
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                editor.add_history_entry(line)?;
                translate_and_print(line, &compiler, &rewriter);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("❌ 读取输入失败: {}", e);
                break;
            }
        }
    }

    println!("再见!");
    Ok(())
}
