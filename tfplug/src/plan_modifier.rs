//! Built-in plan modifiers

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{Diagnostic, Dynamic};

/// Forces replacement whenever a known planned value differs from state.
/// Creation (null state) never requires replacement.
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = is_change(&request.state_value.value, &request.plan_value.value);
        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Like `RequiresReplace`, but only when the predicate also agrees
pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync + 'static,
{
    pub fn create(predicate: F, description: impl Into<String>) -> Box<dyn PlanModifier> {
        Box::new(Self {
            predicate,
            description: description.into(),
        })
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = is_change(&request.state_value.value, &request.plan_value.value)
            && (self.predicate)(&request);
        let mut diagnostics = Vec::new();
        if requires_replace {
            diagnostics.push(
                Diagnostic::warning(
                    format!("{} requires resource replacement", request.path),
                    self.description.clone(),
                )
                .with_attribute(request.path.clone()),
            );
        }
        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics,
        }
    }
}

/// Keeps the prior state value for a computed attribute instead of showing
/// it as unknown in every plan
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "value does not change once set".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let keep_state =
            request.plan_value.is_unknown()
                && !request.state_value.is_null()
                && request.config_value.is_null();
        let plan_value = if keep_state {
            request.state_value
        } else {
            request.plan_value
        };
        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

fn is_change(state: &Dynamic, plan: &Dynamic) -> bool {
    if state.is_null() || state.is_unknown() || plan.is_unknown() {
        return false;
    }
    !values_equal(state, plan)
}

fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request(state: Dynamic, plan: Dynamic, config: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(config),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("name"),
        }
    }

    #[test]
    fn requires_replace_only_on_known_change() {
        let m = RequiresReplace::create();
        let s = |v: &str| Dynamic::String(v.to_string());

        assert!(m.modify(request(s("a"), s("b"), s("b"))).requires_replace);
        assert!(!m.modify(request(s("a"), s("a"), s("a"))).requires_replace);
        assert!(!m.modify(request(Dynamic::Null, s("a"), s("a"))).requires_replace);
        assert!(!m
            .modify(request(s("a"), Dynamic::Unknown, Dynamic::Unknown))
            .requires_replace);
    }

    #[test]
    fn requires_replace_if_consults_predicate() {
        let m = RequiresReplaceIf::create(
            |req: &PlanModifierRequest| !req.plan_value.is_null(),
            "only when still set",
        );
        let resp = m.modify(request(
            Dynamic::String("a".into()),
            Dynamic::Null,
            Dynamic::Null,
        ));
        assert!(!resp.requires_replace);

        let resp = m.modify(request(
            Dynamic::String("a".into()),
            Dynamic::String("b".into()),
            Dynamic::String("b".into()),
        ));
        assert!(resp.requires_replace);
        assert_eq!(resp.diagnostics.len(), 1);
    }

    #[test]
    fn use_state_for_unknown_copies_prior_value() {
        let m = UseStateForUnknown::create();
        let resp = m.modify(request(
            Dynamic::String("abc".into()),
            Dynamic::Unknown,
            Dynamic::Null,
        ));
        assert_eq!(resp.plan_value.value, Dynamic::String("abc".into()));

        let resp = m.modify(request(Dynamic::Null, Dynamic::Unknown, Dynamic::Null));
        assert!(resp.plan_value.is_unknown());
    }
}
