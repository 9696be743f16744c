use anyhow::Result;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, error, info};

use crate::content::{ContentStore, Game, GamePayload, Note, NotePayload, Review, ReviewPayload};
use crate::github::GithubOauthClient;
use crate::rawg::RawgClient;
use crate::user::{
    AccountManager, FullUserStore, IdentityError, IdentityResolver, LibraryEntry, LibraryError,
    LibrarySet, OwnershipGuard, SessionTokenValue, UserView,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use super::http_layers::{
    http_cache, log_requests, rate_limit_error_handler, IpKeyExtractor, LOGIN_BURST,
    LOGIN_PER_SECOND,
};
use super::metrics::{metrics_handler, record_login_attempt};
use super::session::Session;
use super::state::*;
use super::ServerConfig;
use crate::github::AuthStateStore;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct RegisterBody {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Deserialize, Debug)]
struct UpdateProfileBody {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RemoveLibraryEntryBody {
    pub game_id: String,
}

#[derive(Deserialize, Debug)]
struct RawgListParams {
    pub page: Option<String>,
    pub search: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OauthCallbackParams {
    pub code: String,
    pub state: String,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

// ============================================================================
// Auth handlers
// ============================================================================

fn session_cookie_response(status: StatusCode, token: &str, body: Body) -> Response {
    let cookie_value = HeaderValue::from_str(&format!(
        "session_token={}; Path=/; HttpOnly; SameSite=Lax",
        token
    ))
    .unwrap();
    axum::http::response::Builder::new()
        .status(status)
        .header(axum::http::header::SET_COOKIE, cookie_value)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

async fn register(
    State(accounts): State<GuardedAccountManager>,
    Json(body): Json<RegisterBody>,
) -> Response {
    match accounts.register(&body.username, &body.password) {
        Ok(identity) => Json(UserView::from(&identity)).into_response(),
        Err(IdentityError::Duplicate(name)) => {
            debug!("registration rejected, username {} taken", name);
            StatusCode::CONFLICT.into_response()
        }
        Err(err) => {
            error!("Registration failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn login(
    State(accounts): State<GuardedAccountManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    match accounts.verify_password(&body.username, &body.password) {
        Ok(Some(identity)) => match accounts.issue_session(&identity.id) {
            Ok(token) => {
                record_login_attempt("password", "success");
                let response_body = serde_json::to_string(&LoginSuccessResponse {
                    token: token.value.0.clone(),
                })
                .unwrap();
                session_cookie_response(
                    StatusCode::CREATED,
                    &token.value.0,
                    Body::from(response_body),
                )
            }
            Err(err) => {
                error!("Error with session token generation: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(None) => {
            record_login_attempt("password", "failure");
            StatusCode::FORBIDDEN.into_response()
        }
        Err(err) => {
            error!("Login failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn logout(State(accounts): State<GuardedAccountManager>, session: Session) -> Response {
    match accounts.end_session(session.user_id(), &SessionTokenValue(session.token.clone())) {
        Ok(()) => {
            let cookie_value = Cookie::build(Cookie::new("session_token", ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            axum::http::response::Builder::new()
                .status(StatusCode::OK)
                .header(axum::http::header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn auth_me(session: Session) -> Response {
    Json(UserView::from(&session.identity)).into_response()
}

async fn github_login(
    State(oauth): State<OptionalGithubOauth>,
    State(auth_states): State<GuardedAuthStateStore>,
) -> Response {
    let oauth = match oauth {
        Some(oauth) => oauth,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    match oauth.authorize_url() {
        Ok((url, state)) => {
            auth_states.store(state).await;
            Redirect::to(&url).into_response()
        }
        Err(err) => {
            error!("Failed to build GitHub authorization URL: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn github_callback(
    State(state): State<ServerState>,
    Query(params): Query<OauthCallbackParams>,
) -> Response {
    let oauth = match &state.github_oauth {
        Some(oauth) => oauth.clone(),
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    let stored_state = match state.auth_state_store.take(&params.state).await {
        Some(stored) => stored,
        None => {
            debug!("github callback with unknown or expired state");
            record_login_attempt("github", "failure");
            return StatusCode::FORBIDDEN.into_response();
        }
    };

    let access_token = match oauth
        .exchange_code(&params.code, &params.state, &stored_state)
        .await
    {
        Ok(token) => token,
        Err(err) => {
            debug!("github code exchange failed: {}", err);
            record_login_attempt("github", "failure");
            return StatusCode::FORBIDDEN.into_response();
        }
    };

    let profile = match oauth.fetch_user_profile(&access_token).await {
        Ok(profile) => profile,
        Err(err) => {
            error!("github profile fetch failed: {}", err);
            record_login_attempt("github", "failure");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    // First login creates the identity, later logins return it unchanged
    let identity = match state.identity_resolver.resolve(profile.into_assertion()) {
        Ok(identity) => identity,
        Err(err) => {
            error!("identity resolution failed: {}", err);
            record_login_attempt("github", "failure");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.accounts.issue_session(&identity.id) {
        Ok(token) => {
            record_login_attempt("github", "success");
            let mut response =
                session_cookie_response(StatusCode::SEE_OTHER, &token.value.0, Body::empty());
            response.headers_mut().insert(
                axum::http::header::LOCATION,
                HeaderValue::from_str(oauth.app_url()).unwrap(),
            );
            response
        }
        Err(err) => {
            error!("Error with session token generation: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// User & library handlers
// ============================================================================

async fn get_all_users(session: Session, State(store): State<GuardedUserStore>) -> Response {
    if !session.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }
    match store.list_identities() {
        Ok(identities) => {
            Json(identities.iter().map(UserView::from).collect::<Vec<_>>()).into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn users_me(session: Session) -> Response {
    Json(UserView::from(&session.identity)).into_response()
}

async fn get_user_by_id(
    _session: Session,
    State(store): State<GuardedUserStore>,
    Path(id): Path<String>,
) -> Response {
    match store.find_by_id(&id) {
        Ok(Some(identity)) => Json(UserView::from(&identity)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn update_user(
    session: Session,
    State(store): State<GuardedUserStore>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProfileBody>,
) -> Response {
    if session.user_id() != id && !session.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }
    match store.update_profile(&id, body.display_name, body.avatar_url) {
        Ok(Some(identity)) => Json(UserView::from(&identity)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            debug!("profile update failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn delete_user(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Response {
    if session.user_id() != id && !session.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }

    // Notes and reviews live in the content store, so the user-deletion
    // cascade for them runs here; everything in the user db cascades via
    // foreign keys.
    if let Err(err) = state.content_store.delete_notes_of_user(&id) {
        error!("Failed to cascade notes of {}: {}", id, err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if let Err(err) = state.content_store.delete_reviews_of_user(&id) {
        error!("Failed to cascade reviews of {}: {}", id, err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match state.user_store.delete_identity(&id) {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn library_error_response(err: LibraryError) -> Response {
    match err {
        LibraryError::UserNotFound(_) => StatusCode::NOT_FOUND.into_response(),
        LibraryError::Conflict(user_id) => {
            debug!("library write conflict for {}", user_id);
            StatusCode::CONFLICT.into_response()
        }
        LibraryError::Store(err) => {
            error!("library write failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn add_library_entry(
    session: Session,
    State(library): State<GuardedLibrarySet>,
    Path(id): Path<String>,
    Json(entry): Json<LibraryEntry>,
) -> Response {
    // A library belongs to exactly one identity; only that identity mutates it
    if session.user_id() != id {
        return StatusCode::FORBIDDEN.into_response();
    }
    match library.add(&id, entry) {
        Ok(identity) => Json(UserView::from(&identity)).into_response(),
        Err(err) => library_error_response(err),
    }
}

async fn remove_library_entry(
    session: Session,
    State(library): State<GuardedLibrarySet>,
    Path(id): Path<String>,
    Json(body): Json<RemoveLibraryEntryBody>,
) -> Response {
    if session.user_id() != id {
        return StatusCode::FORBIDDEN.into_response();
    }
    match library.remove(&id, &body.game_id) {
        Ok(identity) => Json(UserView::from(&identity)).into_response(),
        Err(err) => library_error_response(err),
    }
}

// ============================================================================
// Game handlers
// ============================================================================

async fn get_all_games(_session: Session, State(store): State<GuardedContentStore>) -> Response {
    match store.list_games() {
        Ok(games) => Json(games).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn get_game(
    _session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
) -> Response {
    match store.get_game(&id) {
        Ok(Some(game)) => Json(game).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn add_game(
    session: Session,
    State(store): State<GuardedContentStore>,
    Json(payload): Json<GamePayload>,
) -> Response {
    if !session.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }
    let game = Game::from_payload(&payload);
    match store.insert_game(&game) {
        Ok(()) => Json(game).into_response(),
        Err(err) => {
            error!("Failed to insert game: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn update_game(
    session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
    Json(payload): Json<GamePayload>,
) -> Response {
    if !session.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }
    match store.update_game(&id, &payload) {
        Ok(Some(game)) => Json(game).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn delete_game(
    session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
) -> Response {
    if !session.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }
    match store.delete_game(&id) {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn fetch_rawg_games(
    _session: Session,
    State(rawg): State<OptionalRawgClient>,
    Query(params): Query<RawgListParams>,
) -> Response {
    let rawg = match rawg {
        Some(rawg) => rawg,
        None => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
    };
    match rawg.load_games(params.page, params.search).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => {
            error!("RAWG listing fetch failed: {}", err);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

async fn fetch_rawg_game_detail(
    _session: Session,
    State(rawg): State<OptionalRawgClient>,
    Path(id): Path<String>,
) -> Response {
    let rawg = match rawg {
        Some(rawg) => rawg,
        None => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
    };
    match rawg.load_game_detail(&id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(err) => {
            error!("RAWG detail fetch failed: {}", err);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

// ============================================================================
// Note handlers
// ============================================================================

async fn get_all_notes(_session: Session, State(store): State<GuardedContentStore>) -> Response {
    match store.list_notes() {
        Ok(notes) => Json(notes).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn get_note(
    _session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
) -> Response {
    match store.get_note(&id) {
        Ok(Some(note)) => Json(note).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn get_notes_by_user(
    _session: Session,
    State(store): State<GuardedContentStore>,
    Path(user_id): Path<String>,
) -> Response {
    match store.notes_for_user(&user_id) {
        Ok(notes) => Json(notes).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn create_note(
    session: Session,
    State(store): State<GuardedContentStore>,
    Json(payload): Json<NotePayload>,
) -> Response {
    let note = Note::from_payload(session.user_id(), &payload);
    match store.insert_note(&note) {
        Ok(()) => Json(note).into_response(),
        Err(err) => {
            error!("Failed to insert note: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn update_note(
    session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
    Json(payload): Json<NotePayload>,
) -> Response {
    let note = match store.get_note(&id) {
        Ok(Some(note)) => note,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    // Authorization runs strictly before the write
    if OwnershipGuard::authorize(&note, &session.identity).is_err() {
        return StatusCode::FORBIDDEN.into_response();
    }

    match store.update_note(&id, &payload) {
        Ok(Some(updated)) => Json(updated).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn delete_note(
    session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
) -> Response {
    let note = match store.get_note(&id) {
        Ok(Some(note)) => note,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    if OwnershipGuard::authorize(&note, &session.identity).is_err() {
        return StatusCode::FORBIDDEN.into_response();
    }

    match store.delete_note(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// ============================================================================
// Review handlers
// ============================================================================

async fn get_all_reviews(_session: Session, State(store): State<GuardedContentStore>) -> Response {
    match store.list_reviews() {
        Ok(reviews) => Json(reviews).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn get_reviews_by_game(
    _session: Session,
    State(store): State<GuardedContentStore>,
    Path(game_id): Path<String>,
) -> Response {
    match store.reviews_for_game(&game_id) {
        Ok(reviews) => Json(reviews).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn get_reviews_by_user(
    _session: Session,
    State(store): State<GuardedContentStore>,
    Path(user_id): Path<String>,
) -> Response {
    match store.reviews_for_user(&user_id) {
        Ok(reviews) => Json(reviews).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn create_review(
    session: Session,
    State(store): State<GuardedContentStore>,
    Json(payload): Json<ReviewPayload>,
) -> Response {
    let review = Review::from_payload(
        session.user_id(),
        &session.identity.display_name,
        &payload,
    );
    match store.insert_review(&review) {
        Ok(()) => Json(review).into_response(),
        Err(err) => {
            error!("Failed to insert review: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn update_review(
    session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> Response {
    let review = match store.get_review(&id) {
        Ok(Some(review)) => review,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    if OwnershipGuard::authorize(&review, &session.identity).is_err() {
        return StatusCode::FORBIDDEN.into_response();
    }

    match store.update_review(&id, &payload) {
        Ok(Some(updated)) => Json(updated).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn delete_review(
    session: Session,
    State(store): State<GuardedContentStore>,
    Path(id): Path<String>,
) -> Response {
    let review = match store.get_review(&id) {
        Ok(Some(review)) => review,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    if OwnershipGuard::authorize(&review, &session.identity).is_err() {
        return StatusCode::FORBIDDEN.into_response();
    }

    match store.delete_review(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// ============================================================================
// App assembly
// ============================================================================

pub async fn make_app(
    config: ServerConfig,
    user_store: Arc<dyn FullUserStore>,
    content_store: Arc<dyn ContentStore>,
    rawg: Option<Arc<RawgClient>>,
    github_oauth: Option<Arc<GithubOauthClient>>,
) -> Result<Router> {
    let accounts = Arc::new(AccountManager::new(user_store.clone()));
    let identity_resolver = Arc::new(IdentityResolver::new(user_store.clone()));
    let library = Arc::new(LibrarySet::new(user_store.clone()));

    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        user_store,
        content_store,
        accounts,
        identity_resolver,
        library,
        rawg,
        github_oauth,
        auth_state_store: Arc::new(AuthStateStore::new()),
        hash: env!("GIT_HASH").to_string(),
    };

    // Credential endpoints carry an IP rate limit against brute force
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(LOGIN_PER_SECOND)
            .burst_size(LOGIN_BURST)
            .key_extractor(IpKeyExtractor)
            .finish()
            .expect("invalid rate limit configuration"),
    );
    let credential_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(GovernorLayer::new(governor_conf).error_handler(rate_limit_error_handler))
        .with_state(state.clone());

    let auth_routes: Router = Router::new()
        .route("/logout", get(logout))
        .route("/me", get(auth_me))
        .route("/github", get(github_login))
        .route("/github/callback", get(github_callback))
        .with_state(state.clone())
        .merge(credential_routes);

    let user_routes: Router = Router::new()
        .route("/", get(get_all_users))
        .route("/me", get(users_me))
        .route("/{id}", get(get_user_by_id))
        .route("/{id}", put(update_user))
        .route("/{id}", delete(delete_user))
        .route("/{id}/library/add", put(add_library_entry))
        .route("/{id}/library/remove", put(remove_library_entry))
        .with_state(state.clone());

    // RAWG pass-through responses are cacheable by clients
    let rawg_routes: Router = Router::new()
        .route("/fetch", get(fetch_rawg_games))
        .route("/fetch/{id}", get(fetch_rawg_game_detail))
        .layer(middleware::from_fn_with_state(
            config.content_cache_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    let game_routes: Router = Router::new()
        .route("/", get(get_all_games))
        .route("/", post(add_game))
        .route("/{id}", get(get_game))
        .route("/{id}", put(update_game))
        .route("/{id}", delete(delete_game))
        .with_state(state.clone())
        .merge(rawg_routes);

    let note_routes: Router = Router::new()
        .route("/", get(get_all_notes))
        .route("/", post(create_note))
        .route("/{id}", get(get_note))
        .route("/{id}", put(update_note))
        .route("/{id}", delete(delete_note))
        .route("/user/{user_id}", get(get_notes_by_user))
        .with_state(state.clone());

    let review_routes: Router = Router::new()
        .route("/", get(get_all_reviews))
        .route("/", post(create_review))
        .route("/{id}", get(get_reviews_by_game))
        .route("/{id}", put(update_review))
        .route("/{id}", delete(delete_review))
        .route("/user/{user_id}", get(get_reviews_by_user))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/games", game_routes)
        .nest("/api/notes", note_routes)
        .nest("/api/reviews", review_routes);

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

/// Runs the API server and, on a separate port, the Prometheus scrape
/// endpoint. Never returns unless one of the listeners fails.
pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    user_store: Arc<dyn FullUserStore>,
    content_store: Arc<dyn ContentStore>,
    rawg: Option<Arc<RawgClient>>,
    github_oauth: Option<Arc<GithubOauthClient>>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, user_store, content_store, rawg, github_oauth).await?;

    let metrics_app: Router = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind metrics port {}: {}", metrics_port, e))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server failed: {}", e);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind port {}: {}", port, e))?;

    info!("Serving API on port {}", port);
    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?)
}
