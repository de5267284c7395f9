//! FIQL-to-FIQL rewriter: parses a filter, then re-renders it as FIQL text
//! with properties renamed, dates reformatted and individual comparisons
//! replaced through caller-supplied transforms. Used when a filter written
//! against one service's vocabulary has to be forwarded to another.

use std::collections::HashMap;

use crate::ast::{Combinator, Comparison};
use crate::parser;
use crate::schema::Schema;
use crate::value;
use crate::visitor::{self, QueryEmitter, TranslateError};

/// The date output format used when the caller configures none.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Replaces one whole comparison. Receives the already renamed property, the
/// FIQL operator token and the rendered value, and returns the replacement
/// expression verbatim.
pub type TransformFn = Box<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// Rewrite configuration: property renames, the date output format, and
/// per-property transforms. Transforms are keyed by the renamed property.
pub struct RewriteContext {
    field_map: HashMap<String, String>,
    date_format: String,
    transforms: HashMap<String, TransformFn>,
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteContext {
    pub fn new() -> Self {
        Self {
            field_map: HashMap::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            transforms: HashMap::new(),
        }
    }

    /// Renames `from` to `to` in the rewritten output.
    pub fn with_field_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.field_map.insert(from.into(), to.into());
        self
    }

    /// Sets the date format used both to parse date literals in the input and
    /// to render them in the output. Rejected eagerly when the pattern is
    /// malformed or needs timezone data the values do not carry.
    pub fn with_date_format(mut self, format: impl Into<String>) -> anyhow::Result<Self> {
        let format = format.into();
        if !value::validate_date_format(&format) {
            anyhow::bail!("invalid date format pattern: {}", format);
        }
        self.date_format = format;
        Ok(self)
    }

    /// Registers a transform for one (renamed) property.
    pub fn with_transform(
        mut self,
        property: impl Into<String>,
        transform: TransformFn,
    ) -> Self {
        self.transforms.insert(property.into(), transform);
        self
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }
}

/// The FIQL string emitter. Borrows the context; all traversal state lives in
/// the frame stack owned by [`visitor::translate`].
struct FiqlRewriteEmitter<'a> {
    context: &'a RewriteContext,
}

impl QueryEmitter for FiqlRewriteEmitter<'_> {
    type Fragment = String;

    fn build_leaf(&self, leaf: &Comparison) -> Result<Option<String>, TranslateError> {
        // A custom operator has no canonical FIQL rendering.
        let Some(op_token) = leaf.op.fiql_token() else {
            return Ok(None);
        };

        let renamed = self
            .context
            .field_map
            .get(&leaf.property)
            .unwrap_or(&leaf.property);
        let property = match &leaf.collection_check {
            Some(_) => format!("count({})", renamed),
            None => renamed.clone(),
        };
        let rendered = value::fiql_string(&leaf.value, &self.context.date_format);

        let expression = match self.context.transforms.get(renamed) {
            Some(transform) => transform(&property, op_token, &rendered),
            None => format!("{}{}{}", property, op_token, rendered),
        };
        Ok(Some(expression))
    }

    fn build_composite(
        &self,
        combinator: Combinator,
        parts: Vec<String>,
        open_frames: usize,
    ) -> String {
        let separator = match combinator {
            Combinator::And => ";",
            Combinator::Or => ",",
        };
        let joined = parts.join(separator);
        // Only nested scopes get wrapped; the outermost expression never needs
        // parentheses of its own.
        if open_frames > 1 {
            format!("({})", joined)
        } else {
            joined
        }
    }
}

/// Rewrites FIQL filter strings according to a [`RewriteContext`], using a
/// schema to type the comparison values.
pub struct FiqlRewriter {
    schema: Schema,
    context: RewriteContext,
}

impl FiqlRewriter {
    pub fn new(schema: Schema, context: RewriteContext) -> Self {
        Self { schema, context }
    }

    /// Rewrites a filter. An empty string means every comparison was dropped.
    pub fn translate(&self, filter: &str) -> anyhow::Result<String> {
        // With the stock format the parser's lenient date handling stays in
        // effect; a custom format replaces it on both ends.
        let date_parse_format = if self.context.date_format == DEFAULT_DATE_FORMAT {
            None
        } else {
            Some(self.context.date_format.as_str())
        };
        let tree = parser::parse_filter_with_date_format(filter, &self.schema, date_parse_format)?;
        let emitter = FiqlRewriteEmitter {
            context: &self.context,
        };
        Ok(visitor::translate(&tree, &emitter)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    fn test_schema() -> Schema {
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
            .with_field("theirtag", FieldKind::String)
    }

    fn rewrite(filter: &str, context: RewriteContext) -> String {
        FiqlRewriter::new(test_schema(), context)
            .translate(filter)
            .unwrap()
    }

    #[test]
    fn test_identity_round_trip() {
        let filter = "tenantName==taters,(containerName==delicious;tenantName==dinner)";
        assert_eq!(rewrite(filter, RewriteContext::new()), filter);
    }

    #[test]
    fn test_field_mapping_renames_property() {
        let context = RewriteContext::new().with_field_mapping("tenantName", "owner");
        assert_eq!(rewrite("tenantName==taters", context), "owner==taters");
    }

    #[test]
    fn test_default_date_format_round_trips() {
        let filter = "updatedTime=gt=2017-07-04T12:30:00";
        assert_eq!(rewrite(filter, RewriteContext::new()), filter);
    }

    #[test]
    fn test_custom_date_format_applies_to_both_ends() {
        let context = RewriteContext::new().with_date_format("%m/%d/%Y").unwrap();
        assert_eq!(
            rewrite("updatedTime=gt=07/04/2017", context),
            "updatedTime=gt=07/04/2017"
        );
    }

    #[test]
    fn test_default_format_truncates_fractional_seconds() {
        let context = RewriteContext::new();
        assert_eq!(
            rewrite("updatedTime=le=2017-07-04T12:30:00.250", context),
            "updatedTime=le=2017-07-04T12:30:00"
        );
    }

    #[test]
    fn test_timezone_date_format_is_rejected() {
        assert!(RewriteContext::new().with_date_format("%Y-%m-%d%z").is_err());
        assert!(RewriteContext::new().with_date_format("%Y-%m-%Q").is_err());
    }

    #[test]
    fn test_transform_replaces_whole_comparison() {
        let context = RewriteContext::new()
            .with_field_mapping("theirtag", "tags")
            .with_transform(
                "tags",
                Box::new(|property, op, value| format!("{}{}custom:{}", property, op, value)),
            );
        assert_eq!(rewrite("theirtag==blue", context), "tags==custom:blue");
    }

    #[test]
    fn test_transform_combined_with_date_format() {
        let context = RewriteContext::new()
            .with_date_format("%m/%d/%Y")
            .unwrap()
            .with_field_mapping("updatedTime", "modified")
            .with_transform(
                "modified",
                Box::new(|property, op, value| format!("{}{}{}", property, op, value)),
            );
        assert_eq!(
            rewrite("updatedTime=ge=07/04/2017", context),
            "modified=ge=07/04/2017"
        );
    }

    #[test]
    fn test_nested_group_keeps_parentheses() {
        let filter = "tenantName==a;(containerName==b,containerName==c)";
        assert_eq!(rewrite(filter, RewriteContext::new()), filter);
    }

    #[test]
    fn test_top_level_expression_stays_unwrapped() {
        let filter = "tenantName==a;containerName==b";
        assert_eq!(rewrite(filter, RewriteContext::new()), filter);
    }

    #[test]
    fn test_collection_count_round_trips() {
        assert_eq!(
            rewrite("count(tags)=ge=2", RewriteContext::new()),
            "count(tags)=ge=2"
        );
    }

    #[test]
    fn test_custom_operator_is_dropped() {
        let context = RewriteContext::new();
        assert_eq!(
            rewrite("tenantName==a;storedBytes=approx=5", context),
            "tenantName==a"
        );
        assert_eq!(rewrite("storedBytes=approx=5", RewriteContext::new()), "");
    }

    #[test]
    fn test_enum_value_renders_variant_name() {
        assert_eq!(
            rewrite("status!=DELETED", RewriteContext::new()),
            "status!=DELETED"
        );
    }
}
