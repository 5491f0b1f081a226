//! Import helpers

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Copies the import ID into a single state attribute, e.g. `id`
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();
    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                "Failed to set import ID",
                format!("Could not set {} to {:?}: {}", attr_path, request.id, e),
            )
            .with_attribute(attr_path),
        );
        return;
    }
    push_imported(request, response, state);
}

/// Records an already-built import state
pub fn push_imported(
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
    state: DynamicValue,
) {
    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    #[test]
    fn passthrough_sets_attribute() {
        let request = ImportResourceStateRequest {
            type_name: "example_thing".to_string(),
            id: "3yAYEDLXKL5".to_string(),
            client_capabilities: ClientCapabilities::default(),
            identity: None,
        };
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };

        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request,
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        let imported = &response.imported_resources[0];
        assert_eq!(imported.type_name, "example_thing");
        assert_eq!(
            imported.state.get_string(&AttributePath::new("id")).unwrap(),
            "3yAYEDLXKL5"
        );
    }
}
