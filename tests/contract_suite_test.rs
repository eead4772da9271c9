use anyhow::Result;
use httpmock::{Method::GET, Method::POST, MockServer as FakeServer};
use mock_json_api::core::contract::{ContractClient, OkCase, ProbabilityCase};
use mock_json_api::core::ContractCase;
use mock_json_api::{ContractSuite, MockConfig, MockServer, SuiteConfig};
use serde_json::json;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_suite_passes_against_default_server() -> Result<()> {
    let handle = MockServer::new(&MockConfig::default().with_seed(7))?
        .spawn("127.0.0.1:0".parse()?)
        .await?;

    let suite = ContractSuite::new(&SuiteConfig::new(&handle.base_url()))?;
    let report = suite.run().await;

    for outcome in &report.outcomes {
        assert!(outcome.passed, "{} failed: {}", outcome.name, outcome.detail);
    }
    assert_eq!(report.outcomes.len(), 6);
    assert_eq!(report.summary()["failed_cases"], json!(0));
    assert!(report.outcome("delay").unwrap().elapsed > Duration::from_millis(1000));
    assert_ok!(report.into_result());

    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_short_probability_variant() -> Result<()> {
    let handle = MockServer::new(&MockConfig::default().with_seed(99))?
        .spawn("127.0.0.1:0".parse()?)
        .await?;

    let mut suite = ContractSuite::new(&SuiteConfig::new(&handle.base_url()).with_trials(50))?;
    suite.retain_cases(&["probability".to_string()])?;
    let report = suite.run().await;

    assert_eq!(report.outcomes.len(), 1);
    let outcome = report.outcome("probability").unwrap();
    assert!(outcome.passed, "{}", outcome.detail);
    assert!(outcome.detail.ends_with("/50 trials failed"));

    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_suite_passes_with_shipped_config() -> Result<()> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("mock.toml");
    let config = MockConfig::from_file(path)?.with_bind("127.0.0.1:0").with_seed(3);
    let handle = MockServer::new(&config)?.spawn(config.bind_addr()?).await?;

    let mut suite = ContractSuite::new(&SuiteConfig::new(&handle.base_url()))?;
    suite.retain_cases(&[
        "ok".to_string(),
        "failure".to_string(),
        "external body".to_string(),
        "request echo".to_string(),
    ])?;
    let report = suite.run().await;
    assert!(report.passed(), "{:?}", report.failures());

    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_wrong_message_is_reported() -> Result<()> {
    let server = FakeServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/t/200");
            then.status(200)
                .header("content-type", "application/json;charset=UTF-8")
                .json_body(json!({"code": 1, "msg": "ok"}));
        })
        .await;

    let mut suite = ContractSuite::new(&SuiteConfig::new(&server.base_url()))?;
    suite.retain_cases(&["ok".to_string()])?;
    let report = suite.run().await;

    mock.assert_async().await;
    assert!(!report.passed());
    assert!(report.failures()[0].detail.contains("expected msg 'normal return'"));
    Ok(())
}

#[tokio::test]
async fn test_successful_500_route_is_reported() -> Result<()> {
    let server = FakeServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/t/500")
                .header("content-type", "application/json;charset=UTF-8");
            then.status(200).json_body(json!({"code": 2, "msg": "return failed"}));
        })
        .await;

    let mut suite = ContractSuite::new(&SuiteConfig::new(&server.base_url()))?;
    suite.retain_cases(&["failure".to_string()])?;
    let report = suite.run().await;

    let outcome = report.outcome("failure").unwrap();
    assert!(!outcome.passed);
    assert!(outcome.detail.contains("expected an error status"));
    Ok(())
}

#[tokio::test]
async fn test_missing_delay_is_reported() -> Result<()> {
    let server = FakeServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/t/delay");
            then.status(200).json_body(json!({"code": 1, "msg": "normal return"}));
        })
        .await;

    let mut suite = ContractSuite::new(&SuiteConfig::new(&server.base_url()))?;
    suite.retain_cases(&["delay".to_string()])?;
    let report = suite.run().await;

    let outcome = report.outcome("delay").unwrap();
    assert!(!outcome.passed);
    assert!(outcome.detail.contains("expected a delay over"));
    Ok(())
}

#[tokio::test]
async fn test_probability_extremes_are_reported() -> Result<()> {
    let never = FakeServer::start_async().await;
    let never_mock = never
        .mock_async(|when, then| {
            when.method(GET).path("/t/probability");
            then.status(200).json_body(json!({"code": 1, "msg": "normal return"}));
        })
        .await;

    let always = FakeServer::start_async().await;
    always
        .mock_async(|when, then| {
            when.method(GET).path("/t/probability");
            then.status(200).json_body(json!({"code": 2, "msg": "return failed"}));
        })
        .await;

    let case = ProbabilityCase { trials: 5 };

    let client = ContractClient::new(&never.base_url(), Duration::from_secs(5))?;
    let err = assert_err!(case.run(&client).await);
    assert!(err.to_string().contains("no failures in 5 trials"));
    never_mock.assert_hits_async(5).await;

    let client = ContractClient::new(&always.base_url(), Duration::from_secs(5))?;
    let err = assert_err!(case.run(&client).await);
    assert!(err.to_string().contains("all 5 trials failed"));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_fails_every_case() -> Result<()> {
    // 綁定後立即釋放，取得一個沒有服務的埠
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let mut config = SuiteConfig::new(&format!("http://{}", addr)).with_trials(1);
    config.timeout_seconds = 2;
    let report = ContractSuite::new(&config)?.run().await;

    assert_eq!(report.failed_count(), 6);
    Ok(())
}

#[tokio::test]
async fn test_single_case_against_real_server() -> Result<()> {
    let handle = MockServer::new(&MockConfig::default())?
        .spawn("127.0.0.1:0".parse()?)
        .await?;
    let client = ContractClient::new(&handle.base_url(), Duration::from_secs(5))?;

    let detail = assert_ok!(OkCase.run(&client).await);
    assert_eq!(detail, "200 normal return");

    handle.shutdown().await?;
    Ok(())
}
