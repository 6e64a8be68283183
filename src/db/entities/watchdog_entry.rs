use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::notifications::models::BarkStatus;

/// Field name -> template string, rendered into the JSON body of a notification.
pub type TemplateMap = BTreeMap<String, String>;

/// Keys managed by the service itself. They cannot be supplied through a definition.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "last_checkin_time",
    "last_checkin_payload",
    "alive",
    "bark_status",
];

/// One watched client as it is described in the definitions file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Definition {
    pub name: String,
    pub interval: f64,
    pub hook: String,
    #[serde(default)]
    pub template_dead: Option<TemplateMap>,
    #[serde(default)]
    pub template_alive: Option<TemplateMap>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    /// Allowed silence window, in minutes.
    pub interval: f64,
    pub hook: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_dead: Option<TemplateMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_alive: Option<TemplateMap>,
    pub last_checkin_time: Option<DateTime<Utc>>,
    pub last_checkin_payload: Value,
    pub alive: bool,
    pub bark_status: Option<BarkStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Model {
    /// Builds a fresh, never-checked-in entry. Reserved keys found among the
    /// definition's extra fields are dropped and returned to the caller.
    pub fn from_definition(id: impl Into<String>, definition: Definition) -> (Self, Vec<String>) {
        let Definition {
            name,
            interval,
            hook,
            template_dead,
            template_alive,
            mut extra,
        } = definition;

        let dropped: Vec<String> = RESERVED_FIELDS
            .iter()
            .filter(|key| extra.remove(**key).is_some())
            .map(|key| key.to_string())
            .collect();

        let model = Self {
            id: id.into(),
            name,
            interval,
            hook,
            template_dead,
            template_alive,
            last_checkin_time: None,
            last_checkin_payload: Value::Null,
            alive: true,
            bark_status: None,
            extra,
        };
        (model, dropped)
    }

    /// Minutes since the last check-in, or `None` if the entry never checked in.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_checkin_time.map(|last| {
            let elapsed = now - last;
            match elapsed.num_microseconds() {
                Some(micros) => micros as f64 / 60_000_000.0,
                None => elapsed.num_milliseconds() as f64 / 60_000.0,
            }
        })
    }

    /// Values a notification template may reference for this entry.
    ///
    /// Optional fields only appear once they hold a value, so a template naming
    /// `bark_status` fails until the first notification has been recorded.
    pub fn template_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        for (key, value) in &self.extra {
            fields.insert(key.clone(), field_text(value));
        }
        fields.insert("id".to_string(), self.id.clone());
        fields.insert("name".to_string(), self.name.clone());
        fields.insert("interval".to_string(), self.interval.to_string());
        fields.insert("hook".to_string(), self.hook.clone());
        fields.insert("alive".to_string(), self.alive.to_string());
        if let Some(last) = self.last_checkin_time {
            fields.insert("last_checkin_time".to_string(), last.to_rfc3339());
            fields.insert(
                "last_checkin_payload".to_string(),
                field_text(&self.last_checkin_payload),
            );
        }
        if let Some(status) = &self.bark_status {
            fields.insert("bark_status".to_string(), status.to_string());
        }
        fields
    }
}

// Strings render verbatim, everything else as JSON text.
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn definition(value: Value) -> Definition {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_definition_keeps_extra_and_drops_reserved() {
        let def = definition(json!({
            "name": "backup",
            "interval": 5,
            "hook": "http://localhost/hook",
            "owner": "ops",
            "alive": false,
        }));

        let (model, dropped) = Model::from_definition("a", def);

        assert_eq!(dropped, vec!["alive".to_string()]);
        assert!(model.alive);
        assert_eq!(model.extra.get("owner"), Some(&json!("ops")));
        assert!(model.last_checkin_time.is_none());
    }

    #[test]
    fn test_elapsed_minutes() {
        let (mut model, _) = Model::from_definition(
            "a",
            definition(json!({"name": "a", "interval": 5, "hook": "http://h"})),
        );
        let now = Utc::now();
        assert_eq!(model.elapsed_minutes(now), None);

        model.last_checkin_time = Some(now - Duration::seconds(90));
        assert_eq!(model.elapsed_minutes(now), Some(1.5));
    }

    #[test]
    fn test_elapsed_minutes_keeps_sub_millisecond_precision() {
        let (mut model, _) = Model::from_definition(
            "a",
            definition(json!({"name": "a", "interval": 1, "hook": "http://h"})),
        );
        let now = Utc::now();
        model.last_checkin_time = Some(now - Duration::seconds(60) - Duration::microseconds(900));

        let elapsed = model.elapsed_minutes(now).unwrap();
        assert!(elapsed > 1.0, "elapsed was {elapsed}");
    }

    #[test]
    fn test_serialized_shape() {
        let (model, _) = Model::from_definition(
            "a",
            definition(json!({"name": "a", "interval": 5, "hook": "http://h", "team": "x"})),
        );
        let value = serde_json::to_value(&model).unwrap();

        assert_eq!(value["id"], "a");
        assert_eq!(value["alive"], true);
        assert_eq!(value["team"], "x");
        assert!(value["last_checkin_time"].is_null());
        assert!(value.get("template_dead").is_none());
    }

    #[test]
    fn test_template_fields_only_include_set_optionals() {
        let (mut model, _) = Model::from_definition(
            "a",
            definition(json!({"name": "Nightly", "interval": 2.5, "hook": "http://h", "retries": 3})),
        );
        let fields = model.template_fields();
        assert_eq!(fields["name"], "Nightly");
        assert_eq!(fields["interval"], "2.5");
        assert_eq!(fields["retries"], "3");
        assert!(!fields.contains_key("bark_status"));
        assert!(!fields.contains_key("last_checkin_payload"));

        model.last_checkin_time = Some(Utc::now());
        model.last_checkin_payload = json!({"rows": 3});
        assert_eq!(model.template_fields()["last_checkin_payload"], r#"{"rows":3}"#);
        model.last_checkin_payload = json!("done");
        assert_eq!(model.template_fields()["last_checkin_payload"], "done");

        model.bark_status = Some(BarkStatus::Delivered { status_code: 204 });
        assert_eq!(model.template_fields()["bark_status"], "204");
    }
}
