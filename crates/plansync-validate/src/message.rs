//! Issue message templating.

use plansync_model::{FieldValue, ValidationRule};

/// Template used when a rule has no message of its own.
const DEFAULT_TEMPLATE: &str = "{field} must be {expected}";

/// Render a rule's message template.
///
/// `{field}`, `{value}` and `{expected}` are substituted. An absent value
/// renders as `null`.
pub(crate) fn render_message(rule: &ValidationRule, value: Option<&FieldValue>) -> String {
    let template = if rule.message.trim().is_empty() {
        DEFAULT_TEMPLATE
    } else {
        rule.message.as_str()
    };
    let value = match value {
        None | Some(FieldValue::Null) => "null".to_string(),
        Some(value) => value.to_string(),
    };
    template
        .replace("{field}", &rule.logic.field)
        .replace("{expected}", &rule.logic.operator.expected())
        .replace("{value}", &value)
}
