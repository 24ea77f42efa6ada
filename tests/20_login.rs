mod common;

use anyhow::Result;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{orders, spawn_app, ScriptedDriver};
use ibmi_gateway::remote::Credentials;

#[tokio::test]
async fn login_then_extract_with_issued_token() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new().returning(orders())).await?;

    let res = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "host": "h", "user": "u", "password": "p" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let token = body["access_token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 3600);

    // The probe ran on its own connection, which was released
    assert_eq!(app.driver.opened(), 1);
    assert_eq!(app.driver.closed(), 1);
    assert_eq!(
        app.driver.descriptors(),
        vec!["as400://h;prompt=false;naming=system;errors=full".to_string()]
    );

    let res = app
        .client
        .post(app.url("/extract"))
        .bearer_auth(&token)
        .json(&json!({ "library": "SALES", "table": "ORDERS", "limit": 10 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert!(body["count"].as_u64().unwrap_or(u64::MAX) <= 10);

    let queries = app.driver.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].query, "SELECT * FROM SALES.ORDERS FETCH FIRST 10 ROWS ONLY");
    assert!(queries[0].params.is_empty());
    Ok(())
}

#[tokio::test]
async fn login_trims_and_embeds_credentials() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new()).await?;

    let res = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "host": " ibmi.local ", "user": "quser\n", "password": " pw " }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let token = res.json::<Value>().await?["access_token"].as_str().unwrap_or_default().to_string();

    let claims = app.signer.verify(&token)?;
    assert_eq!(claims.credentials(), Credentials::new("ibmi.local", "quser", "pw"));
    assert_eq!(claims.exp - claims.iat, 3600);
    Ok(())
}

#[tokio::test]
async fn login_with_blank_fields_is_bad_request() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new()).await?;

    let res = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "host": "h", "user": "   ", "password": "p" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.driver.opened(), 0);
    Ok(())
}

#[tokio::test]
async fn login_body_must_match_schema() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new()).await?;

    for body in [
        json!({ "host": "h", "user": "u" }),
        json!({ "host": "h", "user": "u", "password": "p", "admin": true }),
        json!({ "host": "h", "user": 7, "password": "p" }),
    ] {
        let res = app.client.post(app.url("/login")).json(&body).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "accepted {}", body);
        assert_eq!(res.json::<Value>().await?["code"], "INVALID_JSON");
    }

    let res = app
        .client
        .post(app.url("/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.driver.opened(), 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_host_is_classified() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new().failing_connect(
        "[IBM][System i Access ODBC Driver]Communications link failure. comm rc=10060",
    ))
    .await?;

    let res = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "host": "h", "user": "u", "password": "p" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "CONNECTION_UNREACHABLE");
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("Could not connect to the IBM i host"));
    assert!(!message.contains("comm rc"));
    Ok(())
}

#[tokio::test]
async fn rejected_credentials_are_unauthorized() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new().failing_connect(
        "[IBM][System i Access ODBC Driver]CWBSY0002 - Password for user U on system H is not correct",
    ))
    .await?;

    let res = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "host": "h", "user": "u", "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let message = res.json::<Value>().await?["message"].as_str().unwrap_or_default().to_string();
    assert!(message.starts_with("Invalid credentials"));
    Ok(())
}

#[tokio::test]
async fn me_reports_session_without_password() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new()).await?;

    let res = app.client.get(app.url("/me")).bearer_auth(app.token()).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["user"], "u");
    assert_eq!(body["host"], "h");
    assert_eq!(body["iss"], "ibmi-gateway");
    assert!(body.get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_bad_tokens() -> Result<()> {
    let app = spawn_app(ScriptedDriver::new()).await?;

    // No header at all
    let res = app.client.get(app.url("/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Wrong scheme
    let res = app
        .client
        .get(app.url("/me"))
        .header("authorization", format!("Basic {}", app.token()))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Lower-case scheme is fine
    let res = app
        .client
        .get(app.url("/me"))
        .header("authorization", format!("bearer {}", app.token()))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Expired
    let expired = app
        .signer
        .sign_at(&Credentials::new("h", "u", "p"), "u", Utc::now().timestamp() - 7200)?
        .access_token;
    let res = app.client.get(app.url("/me")).bearer_auth(&expired).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["message"], "Token expired");

    // Tampered
    let token = app.token();
    let index = token.find('.').unwrap_or(0) + 5;
    let replacement = if &token[index..index + 1] == "A" { "B" } else { "A" };
    let mut tampered = token.clone();
    tampered.replace_range(index..index + 1, replacement);
    let res = app.client.get(app.url("/me")).bearer_auth(&tampered).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(app.driver.opened(), 0);
    Ok(())
}
