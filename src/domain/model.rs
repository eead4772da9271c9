use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

pub const CODE_SUCCESS: i64 = 1;
pub const CODE_FAILURE: i64 = 2;
pub const MSG_SUCCESS: &str = "normal return";
pub const MSG_FAILURE: &str = "return failed";

/// Standard reply body: `code` 1 is success, 2 is failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub code: i64,
    pub msg: String,
}

impl Reply {
    pub fn success() -> Self {
        Self {
            code: CODE_SUCCESS,
            msg: MSG_SUCCESS.to_string(),
        }
    }

    pub fn failure() -> Self {
        Self {
            code: CODE_FAILURE,
            msg: MSG_FAILURE.to_string(),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "code": self.code, "msg": self.msg })
    }
}

/// One entry of the route table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDefinition {
    pub name: Option<String>,
    pub method: String,
    pub path: String,
    pub status: Option<u16>,
    pub delay_ms: Option<u64>,
    pub body: Option<serde_json::Value>,
    pub body_file: Option<PathBuf>, // 相對路徑以設定檔所在目錄為準
    pub failure: Option<FailureBranch>,
}

/// Alternative response taken with probability `rate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureBranch {
    pub rate: f64,
    pub status: Option<u16>,
    pub body: serde_json::Value,
}

impl RouteDefinition {
    pub fn new(method: &str, path: &str, body: serde_json::Value) -> Self {
        Self {
            name: None,
            method: method.to_string(),
            path: path.to_string(),
            status: None,
            delay_ms: None,
            body: Some(body),
            body_file: None,
            failure: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn with_failure(mut self, rate: f64, body: serde_json::Value) -> Self {
        self.failure = Some(FailureBranch {
            rate,
            status: None,
            body,
        });
        self
    }

    /// 顯示用名稱，未設定時使用 "METHOD path"
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method.to_uppercase(), self.path))
    }

    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms.unwrap_or(0)
    }
}

impl FailureBranch {
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }
}

/// Request data visible to response templates.
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    pub url: String,
    pub segments: Vec<String>,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

impl RequestSnapshot {
    /// `url` is the request target as received: path plus optional query.
    pub fn new(method: &str, url: &str) -> Self {
        let (path, query_str) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };

        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        let query = query_str
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();

        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            url: url.to_string(),
            segments,
            query,
            headers: HashMap::new(),
            body: serde_json::Value::Null,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// 非 JSON 或空的 body 視為 null
    pub fn with_raw_body(mut self, raw: &[u8]) -> Self {
        self.body = serde_json::from_slice(raw).unwrap_or(serde_json::Value::Null);
        self
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_splits_path_and_query() {
        let snapshot = RequestSnapshot::new("post", "/t/request/json?trace=1&name=a%20b");
        assert_eq!(snapshot.method, "POST");
        assert_eq!(snapshot.path, "/t/request/json");
        assert_eq!(snapshot.url, "/t/request/json?trace=1&name=a%20b");
        assert_eq!(snapshot.segments, vec!["t", "request", "json"]);
        assert_eq!(snapshot.query.get("name").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_snapshot_ignores_non_json_body() {
        let snapshot = RequestSnapshot::new("POST", "/t/500").with_raw_body(b"not json");
        assert_eq!(snapshot.body, serde_json::Value::Null);

        let snapshot = RequestSnapshot::new("POST", "/t/500").with_raw_body(br#"{"a":1}"#);
        assert_eq!(snapshot.body, json!({"a": 1}));
    }

    #[test]
    fn test_route_defaults() {
        let route = RouteDefinition::new("get", "/t/200", Reply::success().to_value());
        assert_eq!(route.status(), 200);
        assert_eq!(route.delay_ms(), 0);
        assert_eq!(route.display_name(), "GET /t/200");
    }
}
