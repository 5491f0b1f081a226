//! Attribute-level planning
//!
//! Terraform proposes a new state; this module applies the schema's
//! defaults and plan modifiers to it, marks unset computed attributes
//! unknown and collects attributes that force replacement. Only top-level
//! attributes take part; nested blocks are planned as proposed.

use crate::schema::{DefaultRequest, PlanModifierRequest, Schema};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

pub struct PlanResult {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn plan_resource_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed_new_state: &DynamicValue,
    config: &DynamicValue,
) -> PlanResult {
    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    // destroy plans carry no attributes
    if proposed_new_state.is_null() {
        return PlanResult {
            planned_state: DynamicValue::null(),
            requires_replace,
            diagnostics,
        };
    }

    let mut planned_state = proposed_new_state.clone();
    let creating = prior_state.is_null();

    let value_at = |value: &DynamicValue, path: &AttributePath| match value.get(path) {
        Ok(found) => DynamicValue::new(found.clone()),
        Err(_) => DynamicValue::null(),
    };

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        let config_value = value_at(config, &path);

        if config_value.is_null() && attr.computed {
            let planned = match (&attr.default, attr.optional) {
                (Some(default), true) => {
                    default
                        .default_value(DefaultRequest { path: path.clone() })
                        .value
                }
                _ if creating => DynamicValue::unknown(),
                // computed values keep whatever state says unless a
                // modifier decides otherwise
                _ => value_at(prior_state, &path),
            };
            if let Err(e) = planned_state.set(&path, planned.value) {
                diagnostics.push(
                    Diagnostic::error("Failed to plan attribute", e.to_string())
                        .with_attribute(path.clone()),
                );
                continue;
            }
        }

        if attr.plan_modifiers.is_empty() {
            continue;
        }

        let state_value = value_at(prior_state, &path);
        let mut plan_value = value_at(&planned_state, &path);
        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: config_value.clone(),
                state_value: state_value.clone(),
                plan_value,
                path: path.clone(),
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !requires_replace.contains(&path) {
                tracing::debug!(attribute = %path, "change requires replacement");
                requires_replace.push(path.clone());
            }
        }

        if let Err(e) = planned_state.set(&path, plan_value.value) {
            diagnostics.push(
                Diagnostic::error("Failed to plan attribute", e.to_string()).with_attribute(path),
            );
        }
    }

    PlanResult {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::{RequiresReplace, UseStateForUnknown};
    use crate::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

    fn schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("memo", AttributeType::String)
                    .optional()
                    .computed()
                    .default(StaticDefault::string(""))
                    .build(),
            )
            .build()
    }

    fn json(s: &str) -> DynamicValue {
        DynamicValue::decode_json(s.as_bytes()).unwrap()
    }

    #[test]
    fn create_marks_computed_unknown_and_applies_defaults() {
        let config = json(r#"{"id": null, "name": "svc", "memo": null}"#);
        let result = plan_resource_change(&schema(), &DynamicValue::null(), &config, &config);

        let planned = result.planned_state;
        assert!(planned.get(&AttributePath::new("id")).unwrap().is_unknown());
        assert_eq!(planned.get_string(&AttributePath::new("memo")).unwrap(), "");
        assert!(result.requires_replace.is_empty());
    }

    #[test]
    fn update_keeps_id_and_flags_replacement() {
        let prior = json(r#"{"id": "abc", "name": "old", "memo": ""}"#);
        let config = json(r#"{"id": null, "name": "new", "memo": null}"#);
        let proposed = json(r#"{"id": "abc", "name": "new", "memo": ""}"#);
        let result = plan_resource_change(&schema(), &prior, &proposed, &config);

        assert_eq!(
            result
                .planned_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "abc"
        );
        assert_eq!(result.requires_replace, vec![AttributePath::new("name")]);
    }

    #[test]
    fn destroy_plans_null() {
        let prior = json(r#"{"id": "abc", "name": "old"}"#);
        let result = plan_resource_change(&schema(), &prior, &DynamicValue::null(), &prior);
        assert!(result.planned_state.is_null());
    }
}
