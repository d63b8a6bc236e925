//! 사용자 관리 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 회원 가입/로그인, 사용자 CRUD, 헬스 체크 등의 엔드포인트를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, Router};
use regex::Regex;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use userhub_api::auth::{authenticate_request, TokenCodec};
use userhub_api::openapi::swagger_ui_router;
use userhub_api::repository::run_migrations;
use userhub_api::routes::create_api_router;
use userhub_api::state::AppState;
use userhub_core::config::AppConfig;
use userhub_core::logging::{init_logging, LogConfig, LogFormat};

/// AppState 초기화.
///
/// 데이터베이스 연결을 시도하고, 성공하면 마이그레이션을 적용합니다.
/// 연결에 실패하면 풀 없이 기동하며, 데이터베이스가 필요한 엔드포인트는
/// 500을 반환합니다.
///
/// # 환경변수
///
/// - `DATABASE_URL`: 설정 파일의 `database.url`보다 우선합니다.
async fn create_app_state(
    config: AppConfig,
    token_codec: TokenCodec,
    email_regex: Regex,
) -> AppState {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database.url.clone());

    let pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&database_url)
        .await
    {
        Ok(pool) => {
            // 연결 테스트
            if sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok() {
                info!("Connected to PostgreSQL successfully");
                Some(pool)
            } else {
                error!("Failed to verify database connection");
                None
            }
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            warn!("Starting without a database, user endpoints will be unavailable");
            None
        }
    };

    let mut state = AppState::new(config, token_codec, email_regex);

    if let Some(pool) = pool {
        match run_migrations(&pool).await {
            Ok(()) => info!("Database migrations applied"),
            Err(e) => error!("Failed to apply migrations: {}", e),
        }
        state = state.with_db_pool(pool);
    }

    state
}

/// CORS 미들웨어 구성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
///
/// # 환경변수
///
/// - `CORS_ORIGINS`: 쉼표로 구분된 허용 origin 목록
///   예: `https://app.example.com,https://admin.example.com`
fn cors_layer() -> CorsLayer {
    let (allow_origin, allow_credentials) = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            // 프로덕션: 특정 origin만 허용
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                (AllowOrigin::any(), false)
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                (AllowOrigin::list(origins), true)
            }
        }
        _ => {
            // 개발: 모든 origin 허용
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            (AllowOrigin::any(), false)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        // 허용되는 HTTP 메서드
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        // 허용되는 헤더
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        // 자격 증명 포함은 origin 목록이 지정된 경우에만 (와일드카드와 함께 사용 불가)
        .allow_credentials(allow_credentials)
        // preflight 요청 캐시 시간
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>) -> Router {
    // API 라우터 (모든 요청이 인증 미들웨어를 통과)
    let api_router = create_api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_request,
        ))
        .with_state(state);

    Router::new()
        .merge(api_router)
        // OpenAPI 문서 및 Swagger UI
        .merge(swagger_ui_router())
        // 기타 미들웨어
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer())
}

/// OpenAPI 스펙 내보내기 처리.
///
/// `--export-openapi` 플래그 또는 `EXPORT_OPENAPI` 환경변수가 설정된 경우
/// OpenAPI JSON 스펙을 stdout으로 출력하고 종료합니다.
fn handle_export_openapi() -> Result<(), Box<dyn std::error::Error>> {
    use userhub_api::openapi::ApiDoc;
    use utoipa::OpenApi as _;

    // 명령줄 인자에서 --export-openapi 플래그 확인
    let export_flag = std::env::args().any(|arg| arg == "--export-openapi");

    // 환경변수 EXPORT_OPENAPI 확인
    let export_env = std::env::var("EXPORT_OPENAPI")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    if export_flag || export_env {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec)?;
        println!("{}", json);
        std::process::exit(0);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // OpenAPI 내보내기 처리 (서버 시작 전)
    handle_export_openapi()?;

    // 설정 로드 (config/default.toml + USERHUB__* 환경변수)
    let config = AppConfig::load_default()?;

    // tracing 초기화 (RUST_LOG가 설정 파일의 레벨보다 우선)
    let log_format = config.logging.format.parse().unwrap_or(LogFormat::Pretty);
    init_logging(LogConfig::new(config.logging.level.clone()).with_format(log_format))?;

    info!("Starting UserHub API server...");

    // 설정 불변 조건 검사 (시크릿 길이, 알고리즘, 이메일 정규식)
    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration is invalid, refusing to start");
        return Err(e.into());
    }

    // 토큰 발급/검증기 생성 (실패 시 기동 중단)
    let token_codec = TokenCodec::from_config(&config.auth).map_err(|e| {
        error!(error = %e, "Failed to initialize token codec");
        e
    })?;

    // 이메일 형식 정규식은 기동 시점에 한 번만 컴파일
    let email_regex = Regex::new(&config.validation.email_pattern)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                error = %e,
                "소켓 주소 설정이 유효하지 않습니다. server.host, server.port 설정을 확인하세요."
            );
            e
        })?;

    // AppState 생성 (DB 연결 및 마이그레이션 포함)
    let state = Arc::new(create_app_state(config, token_codec, email_regex).await);

    info!(version = %state.version, "Application state initialized");
    info!(
        has_db = state.has_db_pool(),
        public_paths = state.config.auth.public_paths.len(),
        "Service connections status"
    );

    // 라우터 생성
    let app = create_router(state);

    // 서버 시작
    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown 처리
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 반환합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
