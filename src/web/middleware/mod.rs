pub mod require_json;
