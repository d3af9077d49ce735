//! Step condition evaluation.

use crate::resolver::Resolver;
use crate::workflow::Condition;
use sf_protocol::workflow_models::ConditionOperator;

/// Whether a step should execute. A step without a condition always does.
pub fn should_execute(condition: Option<&Condition>, resolver: &Resolver<'_>) -> bool {
    let Some(condition) = condition else {
        return true;
    };

    let value = resolver.resolve(&condition.source);
    evaluate(condition.operator, &value, &condition.values)
}

/// Apply an operator to a resolved value.
///
/// Membership and equality compare both sides with surrounding whitespace
/// trimmed, since agent outputs commonly end with a newline. `contains`
/// matches each value verbatim against the untrimmed output.
pub fn evaluate(operator: ConditionOperator, value: &str, values: &[String]) -> bool {
    let trimmed = value.trim();
    let matches = |v: &String| v.trim() == trimmed;
    match operator {
        ConditionOperator::In => values.iter().any(matches),
        ConditionOperator::NotIn => !values.iter().any(matches),
        ConditionOperator::Eq => values.first().is_some_and(matches),
        ConditionOperator::Ne => !values.first().is_some_and(matches),
        ConditionOperator::Contains => values.iter().any(|v| value.contains(v.as_str())),
        ConditionOperator::Empty => trimmed.is_empty(),
        ConditionOperator::NotEmpty => !trimmed.is_empty(),
    }
}
