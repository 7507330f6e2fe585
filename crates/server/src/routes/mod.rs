use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use feature_viewer::builder::build_tree;
use feature_viewer::render::render_html;
use feature_viewer::tree::FeatureTree;
use shared::{FoldState, ModelCard, ProcessData, TreeKind, UploadResponse};

use crate::config::{ServerConfig, Variant};
use crate::convert::{rename_sheet_metal_outputs, ConversionJob};
use crate::error::ServerError;
use crate::pages;
use crate::storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(index))
        .route("/viewer/{*model}", get(viewer))
        .route("/model", post(upload_model))
        .route("/api/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/tree/{*model}", get(feature_tree))
        .nest_service("/data/models", ServeDir::new(&state.config.data_dir));

    if let Some(dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(state.config.upload_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn gallery_cards(config: &ServerConfig) -> Result<Vec<ModelCard>, ServerError> {
    let native = config.native_dir();
    let variant = config.variant;
    let cards = tokio::task::spawn_blocking(move || storage::scan_gallery(&native, variant)).await??;
    Ok(cards)
}

/// Gallery of converted models
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ServerError> {
    let cards = gallery_cards(&state.config).await?;
    Ok(Html(pages::gallery(state.config.variant, &cards)))
}

/// Gallery as JSON
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<ModelCard>>, ServerError> {
    Ok(Json(gallery_cards(&state.config).await?))
}

/// Upload a model file and convert it (multipart fields `data` and `operation`)
pub async fn upload_model(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ServerError> {
    let config = &state.config;
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut operation: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("data") => {
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ServerError::BadRequest("field 'data' has no file name".into()))?;
                let bytes = field.bytes().await?;
                upload = Some((name, bytes.to_vec()));
            }
            Some("operation") => operation = Some(field.text().await?),
            _ => {}
        }
    }

    let (name, bytes) =
        upload.ok_or_else(|| ServerError::BadRequest("missing file field 'data'".into()))?;
    let file_name = storage::sanitize_file_name(&name)?;
    let profile = config
        .variant
        .profile(operation.as_deref(), &config.default_operation);
    storage::validate_operation(&profile)?;

    let input = storage::save_upload(&config.upload_dir(), &file_name, &bytes).await?;
    let output = config.output_dir(&profile, &file_name);
    let job = ConversionJob {
        converter: config.converter.clone(),
        input,
        profile: profile.clone(),
        output: output.clone(),
    };
    job.run(config.converter_timeout).await?;

    let response = match config.variant {
        Variant::SheetMetal => {
            let dir = output.clone();
            let original = file_name.clone();
            let renamed =
                tokio::task::spawn_blocking(move || rename_sheet_metal_outputs(&dir, &original)).await??;
            tracing::debug!("renamed {renamed} geometry files for '{file_name}'");
            UploadResponse {
                model_name: file_name,
                additional_path: None,
                operation: None,
            }
        }
        Variant::Machining => {
            let dir = output.clone();
            let title = tokio::task::spawn_blocking(move || storage::read_process_data(&dir))
                .await?
                .ok()
                .and_then(|data| data.process_title().map(str::to_string))
                .unwrap_or_else(|| storage::UNKNOWN_PROCESS.to_string());
            UploadResponse {
                model_name: file_name,
                additional_path: Some(profile),
                operation: Some(title),
            }
        }
    };

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeFormat {
    #[default]
    Json,
    Html,
}

#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    pub part: Option<String>,
    #[serde(default)]
    pub tree: TreeKind,
    #[serde(default)]
    pub fold: FoldState,
    #[serde(default)]
    pub format: TreeFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    pub part_id: String,
    pub tree_kind: TreeKind,
    pub fold: FoldState,
    pub tree: FeatureTree,
}

async fn load_process_data(config: &ServerConfig, model: &str) -> Result<ProcessData, ServerError> {
    let dir = config.model_dir(&storage::validate_model_path(model)?);
    let result = tokio::task::spawn_blocking(move || storage::read_process_data(&dir)).await?;
    match result {
        Err(ServerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ServerError::NotFound(format!("model '{model}'")))
        }
        other => other,
    }
}

/// Feature or DFM tree of one part of a converted model
pub async fn feature_tree(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(query): Query<TreeQuery>,
) -> Result<Response, ServerError> {
    let data = load_process_data(&state.config, &model).await?;
    let part = match &query.part {
        Some(id) => data.part(id),
        None => data.parts.first(),
    }
    .ok_or_else(|| {
        ServerError::NotFound(format!("part '{}'", query.part.as_deref().unwrap_or_default()))
    })?;

    let tree = build_tree(part, &part.part_id, query.tree, query.fold);
    Ok(match query.format {
        TreeFormat::Html => Html(render_html(&tree)).into_response(),
        TreeFormat::Json => Json(TreeResponse {
            part_id: part.part_id.clone(),
            tree_kind: query.tree,
            fold: query.fold,
            tree,
        })
        .into_response(),
    })
}

/// Viewer page of one converted model
pub async fn viewer(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<Html<String>, ServerError> {
    let data = load_process_data(&state.config, &model).await?;
    let tree_html = data
        .parts
        .first()
        .map(|p| render_html(&build_tree(p, &p.part_id, TreeKind::Features, FoldState::Folded)))
        .unwrap_or_default();

    let dir = state.config.model_dir(&storage::validate_model_path(&model)?);
    let unfolded = dir.join(storage::unfolded_geometry_file(&dir));
    let unfolded_available = tokio::fs::try_exists(&unfolded).await.unwrap_or(false);
    if state.config.variant == Variant::SheetMetal && !unfolded_available {
        tracing::debug!("{} has no unfolded geometry", model);
    }
    Ok(Html(pages::viewer(
        state.config.variant,
        &model,
        &data,
        &tree_html,
        unfolded_available,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use tower::ServiceExt;

    const PLATE_DATA: &str = r#"{"parts":[{"partId":"0:1","process":"CNC Machining Milling",
        "featureRecognition":{"featureGroups":[{"name":"Hole(s)","color":"(126,10,1)",
        "features":[{"shapeIDCount":"1","shapeIDs":[{"id":"42"}]}]}]},
        "dfm":{"message":"No DFM issues found"}}]}"#;

    fn state_in(dir: &std::path::Path, variant: Variant, converter: PathBuf) -> AppState {
        AppState::new(ServerConfig {
            data_dir: dir.to_path_buf(),
            converter,
            variant,
            ..ServerConfig::default()
        })
    }

    fn with_plate(dir: &std::path::Path) {
        let model = dir.join("native/machining_milling/plate.stp");
        std::fs::create_dir_all(&model).unwrap();
        std::fs::write(model.join(storage::PROCESS_DATA_FILE), PLATE_DATA).unwrap();
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn multipart(operation: Option<&str>, file: Option<(&str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(op) = operation {
            body.extend_from_slice(
                format!("--XBOUNDARY\r\nContent-Disposition: form-data; name=\"operation\"\r\n\r\n{op}\r\n")
                    .as_bytes(),
            );
        }
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"data\"; filename=\"{name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--XBOUNDARY--\r\n");
        Request::post("/model")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state_in(dir.path(), Variant::Machining, PathBuf::from("x")));
        let (status, body) = get(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_index_and_models() {
        let dir = tempfile::tempdir().unwrap();
        with_plate(dir.path());
        let state = state_in(dir.path(), Variant::Machining, PathBuf::from("x"));

        let (status, html) = get(router(state.clone()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("href=\"/viewer/machining_milling/plate.stp\""));
        assert!(html.contains("CNC Machining Milling"));

        let (_, json) = get(router(state), "/api/models").await;
        let cards: Vec<ModelCard> = serde_json::from_str(&json).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "plate.stp");
    }

    #[tokio::test]
    async fn test_tree_json_and_html() {
        let dir = tempfile::tempdir().unwrap();
        with_plate(dir.path());
        let state = state_in(dir.path(), Variant::Machining, PathBuf::from("x"));

        let (status, json) = get(router(state.clone()), "/api/tree/machining_milling/plate.stp").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["partId"], "0:1");
        assert_eq!(value["treeKind"], "features");
        assert_eq!(value["tree"]["nodes"][2]["label"], "Hole");
        assert_eq!(value["tree"]["nodes"][2]["shape_ids"][0], 42);

        let (_, html) = get(
            router(state.clone()),
            "/api/tree/machining_milling/plate.stp?tree=dfm&format=html",
        )
        .await;
        assert_eq!(html, "<div class=\"error-message\">No DFM issues found</div>");

        let (status, _) = get(router(state.clone()), "/api/tree/machining_milling/plate.stp?part=9:9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(router(state), "/api/tree/machining_milling/missing.stp").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_viewer_page() {
        let dir = tempfile::tempdir().unwrap();
        with_plate(dir.path());
        let app = router(state_in(dir.path(), Variant::Machining, PathBuf::from("x")));
        let (status, html) = get(app, "/viewer/machining_milling/plate.stp").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("data-shape-id=\"42\""));
        assert!(html.contains(
            "href=\"/data/models/native/machining_milling/plate.stp/process_data.json\" \
             download=\"plate.stp.json\">Export JSON</a>"
        ));
    }

    #[tokio::test]
    async fn test_exported_process_data_is_served() {
        let dir = tempfile::tempdir().unwrap();
        with_plate(dir.path());
        let app = router(state_in(dir.path(), Variant::Machining, PathBuf::from("x")));
        let (status, body) =
            get(app, "/data/models/native/machining_milling/plate.stp/process_data.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, PLATE_DATA);
    }

    #[tokio::test]
    async fn test_sheet_metal_viewer_reports_unfolded_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("native/box.stp");
        std::fs::create_dir_all(&model).unwrap();
        std::fs::write(model.join(storage::PROCESS_DATA_FILE), PLATE_DATA).unwrap();
        std::fs::write(model.join("box.cdxfb"), b"x").unwrap();
        let state = state_in(dir.path(), Variant::SheetMetal, PathBuf::from("x"));

        let (_, html) = get(router(state.clone()), "/viewer/box.stp").await;
        assert!(html.contains("data-unfolded-available=\"false\""));
        assert!(!html.contains("export-json"));

        std::fs::write(model.join("box_unfolded.cdxfb"), b"x").unwrap();
        let (_, html) = get(router(state), "/viewer/box.stp").await;
        assert!(html.contains("data-unfolded-geometry=\"/data/models/native/box.stp/box_unfolded.cdxfb\""));
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state_in(dir.path(), Variant::Machining, PathBuf::from("x")));
        let response = app.oneshot(multipart(Some("machining_milling"), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_conversion_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let converter = dir.path().join("missing-converter");
        let app = router(state_in(dir.path(), Variant::Machining, converter));
        let response = app
            .oneshot(multipart(None, Some(("part.stp", b"ISO-10303-21;"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Command failed: "), "{text}");
        assert!(text.contains("-p machining_milling"));
        // the upload is kept even when conversion fails
        assert!(dir.path().join("upload/part.stp").exists());
    }

    #[cfg(unix)]
    fn fake_converter(dir: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("MTKConverter");
        let script = format!(
            "#!/bin/sh\nout=\"$6\"\nmkdir -p \"$out\"\n\
             echo '{{\"parts\":[{{\"partId\":\"0:1\",\"process\":\"CNC Machining Lathe+Milling\"}}]}}' > \"$out/process_data.json\"\n\
             touch \"$out/.cdxfb\" \"$out/_unfolded.cdxfb\"\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_machining() {
        let dir = tempfile::tempdir().unwrap();
        let converter = fake_converter(dir.path());
        let app = router(state_in(dir.path(), Variant::Machining, converter));
        let response = app
            .oneshot(multipart(Some("machining_turning"), Some(("shaft.stp", b"ISO-10303-21;"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: UploadResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.model_name, "shaft.stp");
        assert_eq!(body.additional_path.as_deref(), Some("machining_turning"));
        assert_eq!(body.operation.as_deref(), Some("CNC Machining Lathe+Milling"));
        assert!(dir
            .path()
            .join("native/machining_turning/shaft.stp/process_data.json")
            .exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_sheet_metal_renames_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let converter = fake_converter(dir.path());
        let app = router(state_in(dir.path(), Variant::SheetMetal, converter));
        let response = app
            .oneshot(multipart(Some("machining_milling"), Some(("box.stp", b"ISO-10303-21;"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "modelName": "box.stp" }));

        let out = dir.path().join("native/box.stp");
        assert!(out.join("box.cdxfb").exists());
        assert!(out.join("box_unfolded.cdxfb").exists());
    }
}
