use crate::domain::model::{Reply, RouteDefinition};
use serde_json::json;

pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_FAILURE_RATE: f64 = 0.1;

/// Built-in route table served when no config file is given.
pub fn default_routes() -> Vec<RouteDefinition> {
    let success = Reply::success().to_value();
    let failure = Reply::failure().to_value();

    vec![
        RouteDefinition::new("GET", "/t/200", success.clone()).with_name("ok"),
        RouteDefinition::new("POST", "/t/500", failure.clone())
            .with_name("failure")
            .with_status(500),
        RouteDefinition::new("GET", "/t/delay", success.clone())
            .with_name("delay")
            .with_delay_ms(DEFAULT_DELAY_MS),
        RouteDefinition::new("GET", "/t/probability", success.clone())
            .with_name("probability")
            .with_failure(DEFAULT_FAILURE_RATE, failure),
        RouteDefinition::new("GET", "/t/body", success).with_name("external body"),
        RouteDefinition::new("POST", "/t/request/json", request_echo_template())
            .with_name("request echo"),
    ]
}

/// Success body plus the request line and selected body fields.
pub fn request_echo_template() -> serde_json::Value {
    json!({
        "code": 1,
        "msg": "normal return",
        "request_method": "{{request.method}}",
        "request_path": "{{request.path}}",
        "request_url": "{{request.url}}",
        "request_path_0": "{{request.path.0}}",
        "request_path_1": "{{request.path.1}}",
        "request_path_2": "{{request.path.2}}",
        "request_body_0": "{{request.body.req_id}}",
        "request_body_1": "{{request.body.req_name}}",
        "request_body_2": "{{request.body.data.1.id}}",
        "request_body_3": "{{request.body.data.-1.id}}"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::render;
    use crate::domain::model::RequestSnapshot;

    #[test]
    fn test_default_table_covers_contract_routes() {
        let routes = default_routes();
        let keys: Vec<(String, String)> = routes
            .iter()
            .map(|r| (r.method.clone(), r.path.clone()))
            .collect();
        for expected in [
            ("GET", "/t/200"),
            ("POST", "/t/500"),
            ("GET", "/t/delay"),
            ("GET", "/t/probability"),
            ("GET", "/t/body"),
            ("POST", "/t/request/json"),
        ] {
            assert!(
                keys.contains(&(expected.0.to_string(), expected.1.to_string())),
                "missing {:?}",
                expected
            );
        }
    }

    #[test]
    fn test_failure_route_and_probability_route() {
        let routes = default_routes();
        let failure = routes.iter().find(|r| r.path == "/t/500").unwrap();
        assert_eq!(failure.status(), 500);
        assert_eq!(failure.body, Some(json!({"code": 2, "msg": "return failed"})));

        let probability = routes.iter().find(|r| r.path == "/t/probability").unwrap();
        let branch = probability.failure.as_ref().unwrap();
        assert_eq!(branch.rate, 0.1);
        assert_eq!(branch.status(), 200);
    }

    #[test]
    fn test_echo_template_renders_contract_values() {
        let request = RequestSnapshot::new("POST", "/t/request/json").with_json_body(json!({
            "req_id": 123,
            "req_name": "foo",
            "data": [{"id": 0}, {"id": 456}]
        }));
        let body = render(&request_echo_template(), &request);
        assert_eq!(body["code"], 1);
        assert_eq!(body["request_method"], "POST");
        assert_eq!(body["request_path"], "/t/request/json");
        assert_eq!(body["request_url"], "/t/request/json");
        assert_eq!(body["request_path_0"], "t");
        assert_eq!(body["request_path_1"], "request");
        assert_eq!(body["request_path_2"], "json");
        assert_eq!(body["request_body_0"], 123);
        assert_eq!(body["request_body_1"], "foo");
        assert_eq!(body["request_body_2"], 456);
        assert_eq!(body["request_body_3"], 456);
    }
}
