//! Projection of raw API objects into [`NamedItem`]s.

use serde_json::Value;

use crate::resource::{NamedItem, ResourceKind};

const MACHINE_NAME_LABELS: [&str; 4] = ["ServerName", "serverName", "hostname", "hostName"];

/// String field `key` of a JSON object, empty when absent or not a string.
pub fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn first_non_empty(candidates: impl IntoIterator<Item = String>) -> Option<String> {
    candidates
        .into_iter()
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

fn machine_name(value: &Value) -> String {
    let labels = value.get("labels");
    let from_labels = MACHINE_NAME_LABELS
        .iter()
        .filter_map(|key| labels.and_then(|l| l.get(*key)).and_then(Value::as_str))
        .map(str::to_string);

    first_non_empty(
        from_labels
            .chain([str_field(value, "serialNumber"), str_field(value, "id")]),
    )
    .unwrap_or_else(|| "<unknown>".to_string())
}

fn audit_name(value: &Value) -> String {
    let method = first_non_empty([str_field(value, "method")]).unwrap_or_else(|| "AUDIT".into());
    format!("{method} {}", str_field(value, "endpoint"))
        .trim_end()
        .to_string()
}

fn name_for(kind: ResourceKind, value: &Value) -> String {
    let id = str_field(value, "id");
    match kind {
        ResourceKind::Machine => machine_name(value),
        ResourceKind::Audit => audit_name(value),
        ResourceKind::Sku => first_non_empty([str_field(value, "deviceType"), id]).unwrap_or_default(),
        ResourceKind::TenantAccount => {
            first_non_empty([str_field(value, "tenantOrg"), id]).unwrap_or_default()
        }
        ResourceKind::ExpectedMachine => first_non_empty([
            str_field(value, "bmcMacAddress"),
            str_field(value, "chassisSerialNumber"),
            id,
        ])
        .unwrap_or_default(),
        _ => str_field(value, "name"),
    }
}

fn status_for(kind: ResourceKind, value: &Value) -> String {
    match kind {
        ResourceKind::Audit => match value.get("statusCode") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        },
        _ => str_field(value, "status"),
    }
}

/// Projects one API object of `kind`, keeping the object as the payload.
pub fn project(kind: ResourceKind, value: Value) -> NamedItem {
    let mut item = NamedItem {
        name: name_for(kind, &value),
        id: str_field(&value, "id"),
        status: status_for(kind, &value),
        extra: Default::default(),
        raw: Value::Null,
    };
    for key in kind.extra_keys() {
        item.extra.insert((*key).to_string(), str_field(&value, key));
    }
    item.raw = value;
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_projection() {
        let item = project(
            ResourceKind::Vpc,
            json!({"id": "v-1", "name": "prod", "status": "Ready", "siteId": "s-1"}),
        );
        assert_eq!(item.name, "prod");
        assert_eq!(item.id, "v-1");
        assert_eq!(item.status, "Ready");
        assert_eq!(item.extra("siteId"), Some("s-1"));
        assert_eq!(item.raw["name"], "prod");
    }

    #[test]
    fn test_machine_name_fallbacks() {
        let labelled = json!({"id": "m-1", "labels": {"hostname": " node-7 "}, "serialNumber": "SN"});
        assert_eq!(project(ResourceKind::Machine, labelled).name, "node-7");

        let serial = json!({"id": "m-1", "labels": {"hostname": "  "}, "serialNumber": "SN"});
        assert_eq!(project(ResourceKind::Machine, serial).name, "SN");

        let bare = json!({"id": "m-1"});
        assert_eq!(project(ResourceKind::Machine, bare).name, "m-1");

        assert_eq!(project(ResourceKind::Machine, json!({})).name, "<unknown>");
    }

    #[test]
    fn test_audit_projection() {
        let item = project(
            ResourceKind::Audit,
            json!({"id": "a-1", "method": "POST", "endpoint": "/v2/vpc", "statusCode": 201}),
        );
        assert_eq!(item.name, "POST /v2/vpc");
        assert_eq!(item.status, "201");

        let item = project(ResourceKind::Audit, json!({"id": "a-2", "endpoint": "/x"}));
        assert_eq!(item.name, "AUDIT /x");
    }

    #[test]
    fn test_named_by_other_fields() {
        assert_eq!(
            project(ResourceKind::Sku, json!({"id": "k", "deviceType": "gpu"})).name,
            "gpu"
        );
        assert_eq!(
            project(ResourceKind::TenantAccount, json!({"id": "t"})).name,
            "t"
        );
        assert_eq!(
            project(
                ResourceKind::ExpectedMachine,
                json!({"id": "e", "chassisSerialNumber": "CH"})
            )
            .name,
            "CH"
        );
    }
}
