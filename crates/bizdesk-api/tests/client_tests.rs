// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use bizdesk_api::{Backend, Client};
use bizdesk_app::{
    AccessRole, Collection, FieldEdit, ItemKind, MemberRole, ResourceKind, TenantContext,
};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

fn admin() -> TenantContext {
    TenantContext::new("acme", AccessRole::Admin)
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

#[test]
fn unreachable_backend_error_is_actionable() {
    let client = Client::new(
        "http://127.0.0.1:1/api",
        admin(),
        None,
        Duration::from_millis(50),
    )
    .expect("client should initialize");

    let error = client
        .list(ResourceKind::Members)
        .expect_err("list should fail for unreachable endpoint");
    let message = error.to_string();
    assert!(
        message.contains("[api].base_url") || message.contains("[api].timeout"),
        "unexpected message: {message}"
    );
}

#[test]
fn list_sends_tenant_and_token_headers() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(*request.method(), Method::Get);
        assert_eq!(request.url(), "/api/team-members/");
        assert_eq!(header_value(&request, "X-Tenant-ID").as_deref(), Some("acme"));
        assert_eq!(
            header_value(&request, "Authorization").as_deref(),
            Some("Bearer s3cret")
        );
        let body = r#"[
            {"id":1,"name":"Alice","role":"admin","efficiency_score":80},
            {"id":2,"name":"Bob","role":"member","efficiency_score":null}
        ]"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, admin(), Some("s3cret"), Duration::from_secs(1))?;
    let Collection::Members(members) = client.list(ResourceKind::Members)? else {
        panic!("expected members");
    };
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].role, MemberRole::Admin);
    assert_eq!(members[1].efficiency_score, None);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn list_accepts_paged_results_without_token() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/goals/");
        assert!(header_value(&request, "Authorization").is_none());
        let body = r#"{"count":1,"results":[{"id":4,"title":"Grow revenue","status":"on_track",
            "target_value":200,"current_value":50,"due_at":"2026-03-31T00:00:00Z"}]}"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, admin(), None, Duration::from_secs(1))?;
    let Collection::Goals(goals) = client.list(ResourceKind::Goals)? else {
        panic!("expected goals");
    };
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].progress_percent(), 25.0);
    assert!(goals[0].due_at.is_some());

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn list_keeps_good_rows_next_to_malformed_ones() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/items/");
        let body = r#"{"count":4,"results":[
            {"id":1,"name":"Desk","kind":"item","unit_price_cents":12900,"stock":4,"active":true},
            {"name":"orphan without an id","kind":"item"},
            {"id":2,"name":null,"kind":"bundle","unit_price_cents":"12.5","stock":3.0,
             "active":"no","created_at":"2026-02-14"},
            {"id":3,"name":"Setup","kind":"service","unit_price_cents":"5000","active":true}
        ]}"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, admin(), None, Duration::from_secs(1))?;
    let Collection::Items(items) = client.list(ResourceKind::Items)? else {
        panic!("expected items");
    };
    let ids: Vec<i64> = items.iter().map(|item| item.id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(items[1].name, "");
    assert_eq!(items[1].kind, ItemKind::Item);
    assert_eq!(items[1].unit_price_cents, None);
    assert_eq!(items[1].stock, Some(3));
    assert!(!items[1].active);
    assert!(items[1].created_at.is_some());
    assert_eq!(items[2].kind, ItemKind::Service);
    assert_eq!(items[2].unit_price_cents, Some(5000));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn update_field_patches_single_field() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            let mut request = server.recv().expect("request expected");
            assert_eq!(*request.method(), Method::Patch);
            let mut body = String::new();
            request
                .as_reader()
                .read_to_string(&mut body)
                .expect("request body should be readable");
            let parsed: serde_json::Value =
                serde_json::from_str(&body).expect("request body should be JSON");
            let response = match request.url() {
                "/api/team-members/2/" => {
                    assert_eq!(parsed, serde_json::json!({ "role": "manager" }));
                    Response::from_string("").with_status_code(204)
                }
                "/api/items/9/" => {
                    assert_eq!(parsed, serde_json::json!({ "active": false }));
                    Response::from_string(r#"{"id":9,"active":false}"#).with_status_code(200)
                }
                other => panic!("unexpected url {other}"),
            };
            request.respond(response).expect("response should succeed");
        }
    });

    let client = Client::new(&addr, admin(), None, Duration::from_secs(1))?;
    client.update_field(&FieldEdit::new(ResourceKind::Members, 2, "role", "manager"))?;
    client.update_field(&FieldEdit::new(ResourceKind::Items, 9, "active", "false"))?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn rejected_update_surfaces_backend_detail() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/team-members/1/");
        request
            .respond(json_response(
                r#"{"detail":"A workspace must keep at least one active admin."}"#,
                400,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, admin(), None, Duration::from_secs(1))?;
    let error = client
        .update_field(&FieldEdit::new(ResourceKind::Members, 1, "role", "member"))
        .expect_err("backend rejection should fail");
    assert_eq!(
        error.to_string(),
        "A workspace must keep at least one active admin."
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn disallowed_edit_is_refused_before_any_request() {
    // Port 1 is never listening, so a request would fail with a connection error.
    let client = Client::new(
        "http://127.0.0.1:1/api",
        TenantContext::new("acme", AccessRole::Viewer),
        None,
        Duration::from_millis(50),
    )
    .expect("client should initialize");

    let error = client
        .update_field(&FieldEdit::new(ResourceKind::Goals, 3, "status", "completed"))
        .expect_err("viewer edit should fail");
    assert!(error.to_string().contains("ask a workspace admin"));
}
