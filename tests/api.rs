//! HTTP surface exercised through the router without binding a socket.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat};
use portfolio_admin::{
    build_app,
    config::{AppConfig, Args},
    db,
    state::AppState,
};
use serde_json::{Value, json};
use std::{env, io::Cursor, sync::Arc};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "portfolio-test-boundary";

async fn app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage_dir = dir.path().to_string_lossy().to_string();
    let config = AppConfig::merge(Args::default(), move |name| match name {
        "PORTFOLIO_ADMIN_EMAIL" => Ok("admin@example.com".into()),
        "PORTFOLIO_ADMIN_PASSWORD" => Ok("hunter22".into()),
        "PORTFOLIO_STORAGE_DIR" => Ok(storage_dir.clone()),
        "PORTFOLIO_PROJECTS_PER_PAGE" => Ok("2".into()),
        _ => Err(env::VarError::NotPresent),
    })
    .unwrap();
    let pool = db::connect_in_memory().await.unwrap();
    (build_app(AppState::new(config, Arc::new(pool))), dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

async fn sign_in(app: &Router) -> String {
    let request = Request::post("/auth/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": "Admin@Example.com", "password": "hunter22"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send_json(app, request).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

fn multipart(fields: Value, file: Option<(&str, &str, Vec<u8>)>) -> Body {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"fields\"\r\n\r\n{}\r\n",
            fields
        )
        .as_bytes(),
    );
    if let Some((filename, mime, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn admin_request(method: &str, uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn healthz_is_ok() {
    let (app, _dir) = app().await;
    let (status, body) = send_json(&app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _dir) = app().await;
    let request = Request::post("/auth/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": "admin@example.com", "password": "nope"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid login credentials");
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let (app, _dir) = app().await;
    let (status, _) = send_json(
        &app,
        Request::get("/admin/dashboard").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = sign_in(&app).await;
    let (status, body) = send_json(
        &app,
        Request::get("/admin/dashboard")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"projects": 0, "certificates": 0, "skills": 0}));

    let (status, _) = send(
        &app,
        Request::post("/auth/sign-out")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(
        &app,
        Request::get("/admin/dashboard")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_project_is_listed_and_its_image_is_served() {
    let (app, _dir) = app().await;
    let token = sign_in(&app).await;

    let fields = json!({
        "title": "Quran Digital",
        "description": "Read the Quran online",
        "technologies": "React, Tailwind",
        "githubLink": "https://github.com/rhakelino/quran",
    });
    let (status, body) = send_json(
        &app,
        admin_request(
            "POST",
            "/admin/projects",
            &token,
            multipart(fields, Some(("cover.png", "image/png", png_bytes(1600, 900)))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["record"]["technologies"], json!(["React", "Tailwind"]));
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let image = body["record"]["image"].as_str().unwrap().to_string();
    let path = image
        .strip_prefix("http://localhost:3000")
        .expect("public url uses the configured origin");
    assert!(path.starts_with("/media/project-images/"));

    let response = app
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/webp");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let stored = image::load_from_memory(&bytes).unwrap();
    assert_eq!((stored.width(), stored.height()), (1280, 720));

    let (status, body) = send_json(
        &app,
        Request::get("/api/projects").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["items"][0]["title"], "Quran Digital");

    let (status, body) = send_json(
        &app,
        Request::get("/admin/projects/notification")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project added");
}

#[tokio::test]
async fn out_of_range_page_is_rejected() {
    let (app, _dir) = app().await;
    let (status, body) = send_json(
        &app,
        Request::get("/api/projects?page=2").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    let (status, _) = send_json(
        &app,
        Request::get("/api/projects?page=0").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_submission_maps_to_bad_request() {
    let (app, _dir) = app().await;
    let token = sign_in(&app).await;

    let (status, body) = send_json(
        &app,
        admin_request(
            "POST",
            "/admin/skills",
            &token,
            multipart(json!({"name": "  ", "category": "tools"}), None),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, _) = send_json(
        &app,
        admin_request("DELETE", "/admin/certificates/99", &token, Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn skills_can_be_filtered_and_grouped() {
    let (app, _dir) = app().await;
    let token = sign_in(&app).await;
    for (name, category) in [("React", "frontend"), ("Axum", "backend"), ("Vue", "frontend")] {
        let (status, _) = send_json(
            &app,
            admin_request(
                "POST",
                "/admin/skills",
                &token,
                multipart(json!({"name": name, "category": category}), None),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send_json(
        &app,
        Request::get("/api/skills?category=frontend").body(Body::empty()).unwrap(),
    )
    .await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|skill| skill["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["React", "Vue"]);

    let (_, body) = send_json(
        &app,
        Request::get("/api/skills?grouped=true").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body[0]["category"], "frontend");
    assert_eq!(body[0]["skills"].as_array().unwrap().len(), 2);
    assert_eq!(body[1]["category"], "backend");
}

#[tokio::test]
async fn unknown_media_bucket_is_not_found() {
    let (app, _dir) = app().await;
    let (status, _) = send(
        &app,
        Request::get("/media/avatars/1.png").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
