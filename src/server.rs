use crate::config::AppConfig;
use crate::hit::HitIndex;
use crate::interaction::{
    country_active, on_zoom, tooltip_on, PointerEvent, Tooltip, ViewTransform, ZoomBehavior, ZoomUpdate,
};
use crate::render::PAGE_TITLE;
use crate::scene::Scene;
use crate::svg::{render_page, render_svg, tooltip_html};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct AppState {
    pub scene: Scene,
    pub index: HitIndex,
    pub zoom: ZoomBehavior,
    page: String,
    svg: String,
    scene_json: String,
}

impl AppState {
    pub fn new(scene: Scene, zoom: ZoomBehavior) -> Result<Self> {
        info!("Building spatial index for hover...");
        let index = HitIndex::build(&scene);
        let page = render_page(&scene, PAGE_TITLE);
        let svg = render_svg(&scene, ViewTransform::IDENTITY);
        let scene_json = serde_json::to_string(&scene).context("Failed to serialise scene")?;
        Ok(Self {
            scene,
            index,
            zoom,
            page,
            svg,
            scene_json,
        })
    }
}

#[derive(Deserialize)]
pub struct WheelParams {
    x: f64,
    y: f64,
    k: f64,
    delta_y: f64,
    px: f64,
    py: f64,
}

#[derive(Deserialize)]
pub struct DoubleClickParams {
    x: f64,
    y: f64,
    k: f64,
    px: f64,
    py: f64,
    #[serde(default)]
    shift: bool,
}

#[derive(Deserialize)]
pub struct PanParams {
    x: f64,
    y: f64,
    k: f64,
    dx: f64,
    dy: f64,
}

#[derive(Deserialize)]
pub struct HoverParams {
    x: f64,
    y: f64,
    k: f64,
    px: f64,
    py: f64,
    page_x: f64,
    page_y: f64,
    // Country currently carrying the active class, if any
    active: Option<usize>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ClassChange {
    index: usize,
    active: bool,
}

#[derive(Serialize)]
pub struct HoverResponse {
    meteor: Option<usize>,
    country: Option<usize>,
    country_id: Option<String>,
    lonlat: [f64; 2],
    classes: Vec<ClassChange>,
    tooltip: Tooltip,
    html: String,
}

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/map.svg", get(svg_handler))
        .route("/api/scene", get(scene_handler))
        .route("/api/wheel", get(wheel_handler))
        .route("/api/dblclick", get(dblclick_handler))
        .route("/api/pan", get(pan_handler))
        .route("/api/hover", get(hover_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, scene: Scene) -> Result<()> {
    let state = Arc::new(AppState::new(scene, ZoomBehavior::from(&config.zoom))?);

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let app = router(state, &config.output.dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn page_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.page.clone())
}

async fn svg_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], state.svg.clone())
}

async fn scene_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], state.scene_json.clone())
}

async fn wheel_handler(State(state): State<Arc<AppState>>, Query(params): Query<WheelParams>) -> Json<ZoomUpdate> {
    let current = ViewTransform {
        x: params.x,
        y: params.y,
        k: params.k,
    };
    Json(on_zoom(state.zoom.wheel(current, params.delta_y, [params.px, params.py])))
}

async fn dblclick_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DoubleClickParams>,
) -> Json<ZoomUpdate> {
    let current = ViewTransform {
        x: params.x,
        y: params.y,
        k: params.k,
    };
    Json(on_zoom(state.zoom.double_click(current, [params.px, params.py], params.shift)))
}

async fn pan_handler(State(state): State<Arc<AppState>>, Query(params): Query<PanParams>) -> Json<ZoomUpdate> {
    let current = ViewTransform {
        x: params.x,
        y: params.y,
        k: params.k,
    };
    Json(on_zoom(state.zoom.translate_by(current, params.dx, params.dy)))
}

async fn hover_handler(State(state): State<Arc<AppState>>, Query(params): Query<HoverParams>) -> Json<HoverResponse> {
    let transform = state.zoom.constrain(ViewTransform {
        x: params.x,
        y: params.y,
        k: params.k,
    });
    let screen = [params.px, params.py];
    let hit = state.index.pick(&state.scene, transform, screen);

    let mut classes = Vec::new();
    if params.active != hit.country {
        if let Some(index) = params.active {
            classes.push(ClassChange {
                index,
                active: country_active(PointerEvent::Out, true),
            });
        }
        if let Some(index) = hit.country {
            classes.push(ClassChange {
                index,
                active: country_active(PointerEvent::Over, false),
            });
        }
    }

    let tooltip = match hit.meteor.and_then(|i| state.scene.meteors.get(i)) {
        Some(meteor) => {
            let event = PointerEvent::Move {
                page_x: params.page_x,
                page_y: params.page_y,
            };
            tooltip_on(event, &Tooltip::default(), &meteor.properties)
        }
        None => Tooltip::default(),
    };

    let [sx, sy] = transform.invert(screen);
    Json(HoverResponse {
        meteor: hit.meteor,
        country: hit.country,
        country_id: hit
            .country
            .and_then(|i| state.scene.countries.get(i))
            .map(|c| c.id.clone()),
        lonlat: state.scene.projection.invert(sx, sy),
        classes,
        html: tooltip_html(&tooltip.rows),
        tooltip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoomConfig;
    use crate::scene::tests::synthetic_scene;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(synthetic_scene(), ZoomBehavior::from(&ZoomConfig::default())).unwrap());
        let dir = std::env::temp_dir();
        (router(state.clone(), &dir), state)
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn wheel_zoom_is_clamped_and_sets_stroke() {
        let (app, _) = app();
        let body = get_json(app, "/api/wheel?x=0&y=0&k=1&delta_y=-5000&px=0&py=0").await;
        assert_eq!(body["transform"]["k"], 7.0);
        assert_eq!(body["stroke_width"], 0.25);
        assert_eq!(body["attribute"], "translate(0,0) scale(7)");
    }

    #[tokio::test]
    async fn double_click_doubles_scale_about_pointer() {
        let (app, _) = app();
        let body = get_json(app, "/api/dblclick?x=0&y=0&k=1.5&px=100&py=50").await;
        assert_eq!(body["transform"]["k"], 3.0);
        assert_eq!(body["transform"]["x"], -100.0);
        assert_eq!(body["transform"]["y"], -50.0);
        assert_eq!(body["stroke_width"], 0.5);

        let (app, _) = self::app();
        let body = get_json(app, "/api/dblclick?x=0&y=0&k=1.5&px=0&py=0&shift=true").await;
        assert_eq!(body["transform"]["k"], 1.0);
    }

    #[tokio::test]
    async fn pan_translates() {
        let (app, _) = app();
        let body = get_json(app, "/api/pan?x=1&y=2&k=2.5&dx=10&dy=-5").await;
        assert_eq!(body["transform"]["x"], 11.0);
        assert_eq!(body["transform"]["y"], -3.0);
        assert_eq!(body["stroke_width"], 0.5);
    }

    #[tokio::test]
    async fn hover_over_meteor_shows_tooltip() {
        let (app, state) = app();
        let large = &state.scene.meteors[0];
        let uri = format!(
            "/api/hover?x=0&y=0&k=1&px={}&py={}&page_x=50&page_y=60&active=0",
            large.cx, large.cy
        );
        let body = get_json(app, &uri).await;
        assert_eq!(body["meteor"], 0);
        assert_eq!(body["country"], Value::Null);
        assert_eq!(body["tooltip"]["display"], "inline-block");
        assert_eq!(body["tooltip"]["left"], 70.0);
        assert_eq!(body["tooltip"]["top"], 80.0);
        assert_eq!(body["classes"], serde_json::json!([{"index": 0, "active": false}]));
        assert!(body["html"].as_str().unwrap().contains("large"));
    }

    #[tokio::test]
    async fn hover_over_country_activates_it() {
        let (app, state) = app();
        let [px, py] = state.scene.projection.project(-15.0, 8.0);
        let uri = format!("/api/hover?x=0&y=0&k=1&px={px}&py={py}&page_x=0&page_y=0");
        let body = get_json(app, &uri).await;
        assert_eq!(body["country"], 0);
        assert_eq!(body["country_id"], "west");
        assert_eq!(body["tooltip"]["display"], "none");
        assert_eq!(body["classes"], serde_json::json!([{"index": 0, "active": true}]));
        let lon = body["lonlat"][0].as_f64().unwrap();
        assert!((lon + 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn hover_with_zero_scale_stays_finite() {
        let (app, state) = app();
        let [px, py] = state.scene.projection.project(-15.0, 8.0);
        let uri = format!("/api/hover?x=0&y=0&k=0&px={px}&py={py}&page_x=0&page_y=0");
        let body = get_json(app, &uri).await;
        assert_eq!(body["country"], 0);
        let lon = body["lonlat"][0].as_f64().unwrap();
        let lat = body["lonlat"][1].as_f64().unwrap();
        assert!((lon + 15.0).abs() < 1e-9);
        assert!((lat - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn malformed_query_is_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/api/wheel?x=left").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn page_serves_map() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("class=\"meteor\""));
    }
}
