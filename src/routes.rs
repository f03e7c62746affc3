use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;

use crate::{
    AppState,
    accounts::AccountError,
    catalog::CatalogError,
    category::Category,
    entities::user,
    error::{AppError, AppResult},
    forms::{AddForm, DetailsForm, FieldErrors, LoginForm, RegisterForm, SearchForm},
    session::{self, CurrentUser, RequireUser},
    templates::{self, PageContext},
};

const DUPLICATE_FILM: &str = "That film is already in the database.";

type Page = (SignedCookieJar, Html<String>);

/// Renders a page, draining pending flash messages into it.
fn render(
    jar: SignedCookieJar,
    user: Option<&user::Model>,
    body: impl FnOnce(&PageContext) -> String,
) -> Page {
    let (jar, flashes) = session::take_flashes(jar);
    let ctx = PageContext { user, flashes: &flashes };
    (jar, Html(body(&ctx)))
}

#[derive(Debug, Deserialize)]
pub struct MovieIdQuery {
    id: i32,
}

#[derive(Debug, Deserialize)]
pub struct ApiIdQuery {
    id: i64,
}

pub async fn index(jar: SignedCookieJar, CurrentUser(user): CurrentUser) -> Page {
    render(jar, user.as_ref(), templates::home_page)
}

pub async fn films(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    CurrentUser(user): CurrentUser,
) -> AppResult<Page> {
    let movies = state.catalog.list().await?;
    Ok(render(jar, user.as_ref(), |ctx| templates::films_page(ctx, &movies)))
}

pub async fn add_form(RequireUser(user): RequireUser, jar: SignedCookieJar) -> Page {
    render(jar, Some(&user), |ctx| templates::add_page(ctx, "", &FieldErrors::default()))
}

pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    jar: SignedCookieJar,
    Form(form): Form<AddForm>,
) -> AppResult<Page> {
    let title = match form.validate() {
        Ok(title) => title,
        Err(errors) => {
            let entered = form.title.unwrap_or_default();
            return Ok(render(jar, Some(&user), |ctx| templates::add_page(ctx, &entered, &errors)));
        },
    };

    let results = state.tmdb.search_movies(&title).await?;
    Ok(render(jar, Some(&user), |ctx| templates::select_page(ctx, &results, state.tmdb.image_url())))
}

/// Fetches the chosen film and stores it straight away; the category comes later.
pub async fn select(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(q): Query<ApiIdQuery>,
) -> AppResult<Response> {
    let details = state.tmdb.get_movie(q.id).await?;
    let new_movie = details.to_new_movie(state.tmdb.image_url());

    match state.catalog.insert(new_movie).await {
        Ok(movie) => Ok(Redirect::to(&format!("/edit?id={}", movie.id)).into_response()),
        Err(CatalogError::DuplicateTitle(_)) => {
            Ok((session::flash(jar, DUPLICATE_FILM), Redirect::to("/add")).into_response())
        },
        Err(err) => Err(err.into()),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MovieIdQuery>,
) -> AppResult<Page> {
    let movie = state.catalog.get(q.id).await?.ok_or_else(|| AppError::not_found("film"))?;
    let selected = movie.category.unwrap_or(Category::DEFAULT);
    Ok(render(jar, user.as_ref(), |ctx| {
        templates::edit_page(ctx, &movie, selected, &FieldErrors::default())
    }))
}

pub async fn edit(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MovieIdQuery>,
    Form(form): Form<DetailsForm>,
) -> AppResult<Response> {
    let movie = state.catalog.get(q.id).await?.ok_or_else(|| AppError::not_found("film"))?;

    let category = match form.validate() {
        Ok(category) => category,
        Err(errors) => {
            let selected = movie.category.unwrap_or(Category::DEFAULT);
            let page = render(jar, user.as_ref(), |ctx| {
                templates::edit_page(ctx, &movie, selected, &errors)
            });
            return Ok(page.into_response());
        },
    };

    state
        .catalog
        .set_category(movie.id, category)
        .await?
        .ok_or_else(|| AppError::not_found("film"))?;
    Ok(Redirect::to("/").into_response())
}

pub async fn search_form(jar: SignedCookieJar, CurrentUser(user): CurrentUser) -> Page {
    render(jar, user.as_ref(), |ctx| {
        templates::search_page(ctx, Category::DEFAULT, &FieldErrors::default())
    })
}

pub async fn search(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    CurrentUser(user): CurrentUser,
    Form(form): Form<SearchForm>,
) -> AppResult<Page> {
    let category = match form.validate() {
        Ok(category) => category,
        Err(errors) => {
            return Ok(render(jar, user.as_ref(), |ctx| {
                templates::search_page(ctx, Category::DEFAULT, &errors)
            }));
        },
    };

    let movies = state.catalog.random_by_category(category).await?;
    let background = category.background_image();
    Ok(render(jar, user.as_ref(), |ctx| templates::result_page(ctx, &movies, Some(&background))))
}

pub async fn delete(
    State(state): State<AppState>,
    Query(q): Query<MovieIdQuery>,
) -> AppResult<Redirect> {
    if !state.catalog.delete(q.id).await? {
        return Err(AppError::not_found("film"));
    }
    Ok(Redirect::to("/films"))
}

pub async fn result(jar: SignedCookieJar, CurrentUser(user): CurrentUser) -> Page {
    render(jar, user.as_ref(), |ctx| templates::result_page(ctx, &[], None))
}

pub async fn register_form(jar: SignedCookieJar, CurrentUser(user): CurrentUser) -> Page {
    render(jar, user.as_ref(), |ctx| {
        templates::register_page(ctx, "", "", &FieldErrors::default())
    })
}

pub async fn register(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => {
            let email = form.email.unwrap_or_default();
            let name = form.name.unwrap_or_default();
            let page = render(jar, None, |ctx| templates::register_page(ctx, &email, &name, &errors));
            return Ok(page.into_response());
        },
    };

    match state
        .accounts
        .register(&registration.email, &registration.name, &registration.password)
        .await
    {
        Ok(user) => {
            let jar = session::log_in(jar, user.id, state.config.session_ttl_days);
            Ok((jar, Redirect::to("/")).into_response())
        },
        Err(err @ AccountError::EmailTaken) => {
            let message = err.user_message().unwrap_or_default();
            Ok((session::flash(jar, message), Redirect::to("/login")).into_response())
        },
        Err(err) => Err(err.into()),
    }
}

pub async fn login_form(jar: SignedCookieJar, CurrentUser(user): CurrentUser) -> Page {
    render(jar, user.as_ref(), |ctx| templates::login_page(ctx, "", &FieldErrors::default()))
}

pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            let email = form.email.unwrap_or_default();
            let page = render(jar, None, |ctx| templates::login_page(ctx, &email, &errors));
            return Ok(page.into_response());
        },
    };

    match state.accounts.authenticate(&credentials.email, &credentials.password).await {
        Ok(user) => {
            let jar = session::log_in(jar, user.id, state.config.session_ttl_days);
            Ok((jar, Redirect::to("/")).into_response())
        },
        Err(err) => match err.user_message() {
            Some(message) => {
                Ok((session::flash(jar, message), Redirect::to("/login")).into_response())
            },
            None => Err(err.into()),
        },
    }
}

pub async fn logout(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    tracing::debug!("user logged out");
    (session::log_out(jar), Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Json, Router,
        body::Body,
        extract::Path,
        http::{HeaderMap, Request, StatusCode, header},
        routing::get,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    /// Drives the router and carries cookies between requests like a browser.
    struct Browser {
        app: Router,
        cookies: HashMap<String, String>,
    }

    struct Visit {
        status: StatusCode,
        location: Option<String>,
        body: String,
    }

    impl Browser {
        async fn new() -> (Self, AppState) {
            Self::with_config(Config::for_tests()).await
        }

        async fn with_config(config: Config) -> (Self, AppState) {
            let state = AppState::new(config, crate::db::memory().await).unwrap();
            (Self { app: crate::app(state.clone()), cookies: HashMap::new() }, state)
        }

        fn store_cookies(&mut self, headers: &HeaderMap) {
            for value in headers.get_all(header::SET_COOKIE) {
                let value = value.to_str().unwrap();
                let pair = value.split(';').next().unwrap();
                let (name, val) = pair.split_once('=').unwrap();
                if val.is_empty() || value.contains("Max-Age=0") {
                    self.cookies.remove(name);
                } else {
                    self.cookies.insert(name.to_string(), val.to_string());
                }
            }
        }

        async fn send(&mut self, req: axum::http::request::Builder, body: Body) -> Visit {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            let req = req.header(header::COOKIE, cookie).body(body).unwrap();
            let resp = self.app.clone().oneshot(req).await.unwrap();
            self.store_cookies(resp.headers());

            let status = resp.status();
            let location = resp
                .headers()
                .get(header::LOCATION)
                .map(|l| l.to_str().unwrap().to_string());
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            Visit { status, location, body: String::from_utf8(bytes.to_vec()).unwrap() }
        }

        async fn get(&mut self, uri: &str) -> Visit {
            self.send(Request::get(uri), Body::empty()).await
        }

        async fn post(&mut self, uri: &str, form: &[(&str, &str)]) -> Visit {
            let body = form
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            let req = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            self.send(req, Body::from(body)).await
        }

        async fn sign_up(&mut self, email: &str) {
            let page = self
                .post("/register", &[("email", email), ("password", "pa55word"), ("name", "Robin")])
                .await;
            assert_eq!(page.status, StatusCode::SEE_OTHER);
            assert_eq!(page.location.as_deref(), Some("/"));
        }
    }

    #[tokio::test]
    async fn public_pages_render() {
        let (mut browser, _) = Browser::new().await;
        for uri in ["/", "/films", "/search", "/result", "/login", "/register"] {
            assert_eq!(browser.get(uri).await.status, StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn add_requires_login() {
        let (mut browser, _) = Browser::new().await;
        let page = browser.get("/add").await;
        assert_eq!(page.status, StatusCode::SEE_OTHER);
        assert_eq!(page.location.as_deref(), Some("/login"));

        let page = browser.get("/login").await;
        assert!(page.body.contains("Please log in to access this page."));

        let page = browser.post("/add", &[("title", "Fight Club")]).await;
        assert_eq!(page.location.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn session_for_unknown_user_is_anonymous() {
        let (mut browser, state) = Browser::new().await;
        let jar = session::log_in(SignedCookieJar::new(state.cookie_key.clone()), 999, 1);
        browser.store_cookies((jar, ()).into_response().headers());
        assert!(browser.cookies.contains_key("session"));

        let page = browser.get("/add").await;
        assert_eq!(page.status, StatusCode::SEE_OTHER);
        assert_eq!(page.location.as_deref(), Some("/login"));
        assert!(!browser.get("/").await.body.contains("/logout"));
    }

    const STUB_TOKEN: &str = "stub-token";
    const STUB_FILM: i64 = 105;

    fn stub_authorized(headers: &HeaderMap) -> bool {
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
            == Some(format!("Bearer {STUB_TOKEN}").as_str())
    }

    async fn stub_search(
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
    ) -> Response {
        if !stub_authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let query = q.get("query").cloned().unwrap_or_default();
        Json(json!({
            "page": 1,
            "results": [{
                "id": STUB_FILM,
                "title": format!("Result for {query}"),
                "release_date": "1985-07-03",
                "overview": "A teenager is sent back in time.",
                "poster_path": "/p.jpg"
            }]
        }))
        .into_response()
    }

    async fn stub_movie(headers: HeaderMap, Path(id): Path<i64>) -> Response {
        if !stub_authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if id != STUB_FILM {
            return (StatusCode::NOT_FOUND, Json(json!({ "status_code": 34 }))).into_response();
        }
        Json(json!({
            "id": STUB_FILM,
            "title": "Back to the Future",
            "release_date": "1985-07-03",
            "overview": "x".repeat(300),
            "poster_path": "/p.jpg"
        }))
        .into_response()
    }

    /// Serves a tiny TMDB lookalike on an ephemeral port and returns its base URL.
    async fn spawn_tmdb_stub() -> String {
        let stub = Router::new()
            .route("/search/movie", get(stub_search))
            .route("/movie/{id}", get(stub_movie));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, stub).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn live_tmdb_client_maps_responses() {
        let config = Config {
            tmdb_access_token: STUB_TOKEN.to_string(),
            tmdb_base_url: spawn_tmdb_stub().await,
            ..Config::for_tests()
        };
        let (mut browser, state) = Browser::with_config(config).await;
        browser.sign_up("robin@example.com").await;

        let page = browser.post("/add", &[("title", "back to the future")]).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("Result for back to the future"));
        assert!(page.body.contains(&format!("/select?id={STUB_FILM}")));

        let page = browser.get(&format!("/select?id={STUB_FILM}")).await;
        assert_eq!(page.status, StatusCode::SEE_OTHER);
        let id: i32 =
            page.location.unwrap().strip_prefix("/edit?id=").unwrap().parse().unwrap();
        let stored = state.catalog.get(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Back to the Future");
        assert_eq!(stored.year, "1985");
        assert_eq!(stored.description, format!("{}..", "x".repeat(245)));
        assert_eq!(stored.image_url, "https://image.tmdb.org/t/p/w500/p.jpg");

        let page = browser.get("/select?id=404").await;
        assert_eq!(page.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(browser.get("/select?id=abc").await.status, StatusCode::BAD_REQUEST);
        assert_eq!(state.catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_select_edit_flow() {
        let (mut browser, state) = Browser::new().await;
        browser.sign_up("robin@example.com").await;

        let page = browser.post("/add", &[("title", "fight club")]).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("/select?id=550"));

        let page = browser.get("/select?id=550").await;
        assert_eq!(page.status, StatusCode::SEE_OTHER);
        let location = page.location.unwrap();
        let id: i32 = location.strip_prefix("/edit?id=").unwrap().parse().unwrap();

        let stored = state.catalog.get(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Fight Club");
        assert_eq!(stored.year, "1999");
        assert_eq!(stored.category, None);
        assert_eq!(stored.description.chars().count(), 247);
        assert!(stored.image_url.ends_with("/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg"));

        assert_eq!(browser.get(&location).await.status, StatusCode::OK);
        let page = browser.post(&location, &[("category", "Christmas rom-com")]).await;
        assert_eq!(page.location.as_deref(), Some("/"));

        let updated = state.catalog.get(id).await.unwrap().unwrap();
        assert_eq!(updated.category, Some(Category::ChristmasRomCom));
        assert_eq!(updated.description, stored.description);

        let page = browser.post("/search", &[("category", "Christmas rom-com")]).await;
        assert!(page.body.contains("Fight Club"));
        assert!(page.body.contains("/static/images/christmas-rom-com-background.png"));

        let page = browser.post("/search", &[("category", "Summer")]).await;
        assert!(!page.body.contains("Fight Club"));
        assert!(page.body.contains("/static/images/Summer-background.png"));
    }

    #[tokio::test]
    async fn selecting_a_stored_film_again_is_flashed() {
        let (mut browser, state) = Browser::new().await;
        browser.sign_up("robin@example.com").await;

        browser.get("/select?id=550").await;
        let page = browser.get("/select?id=550").await;
        assert_eq!(page.status, StatusCode::SEE_OTHER);
        assert_eq!(page.location.as_deref(), Some("/add"));

        let page = browser.get("/add").await;
        assert!(page.body.contains(DUPLICATE_FILM));
        assert_eq!(state.catalog.list().await.unwrap().len(), 1);

        let page = browser.get("/add").await;
        assert!(!page.body.contains(DUPLICATE_FILM));
    }

    #[tokio::test]
    async fn invalid_category_re_renders_edit_form() {
        let (mut browser, state) = Browser::new().await;
        browser.get("/select?id=7").await;

        let page = browser.post("/edit?id=1", &[("category", "Easter")]).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("Not a valid choice."));
        assert_eq!(state.catalog.get(1).await.unwrap().unwrap().category, None);
    }

    #[tokio::test]
    async fn missing_films_are_not_found() {
        let (mut browser, _) = Browser::new().await;
        assert_eq!(browser.get("/edit?id=9").await.status, StatusCode::NOT_FOUND);
        assert_eq!(
            browser.post("/edit?id=9", &[("category", "Winter")]).await.status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(browser.get("/delete?id=9").await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_redirects_to_films() {
        let (mut browser, state) = Browser::new().await;
        browser.get("/select?id=550").await;
        browser.get("/select?id=7").await;

        let page = browser.get("/delete?id=1").await;
        assert_eq!(page.location.as_deref(), Some("/films"));
        assert!(state.catalog.get(1).await.unwrap().is_none());
        assert!(state.catalog.get(2).await.unwrap().is_some());
        assert_eq!(browser.get("/edit?id=1").await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_registration_goes_to_login() {
        let (mut browser, _) = Browser::new().await;
        browser.sign_up("robin@example.com").await;
        browser.get("/logout").await;

        let page = browser
            .post("/register", &[("email", "robin@example.com"), ("password", "other"), ("name", "R")])
            .await;
        assert_eq!(page.location.as_deref(), Some("/login"));
        let page = browser.get("/login").await;
        assert!(page.body.contains("already signed up with that email"));

        let page =
            browser.post("/login", &[("email", "robin@example.com"), ("password", "pa55word")]).await;
        assert_eq!(page.location.as_deref(), Some("/"));
        assert_eq!(browser.get("/add").await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_credentials_are_reported() {
        let (mut browser, _) = Browser::new().await;
        browser.sign_up("robin@example.com").await;
        browser.get("/logout").await;

        browser.post("/login", &[("email", "nobody@example.com"), ("password", "x")]).await;
        assert!(browser.get("/login").await.body.contains("That email does not exist"));

        let page = browser.post("/login", &[("email", "robin@example.com"), ("password", "x")]).await;
        assert_eq!(page.location.as_deref(), Some("/login"));
        assert!(browser.get("/login").await.body.contains("Password incorrect"));
        assert_eq!(browser.get("/add").await.location.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (mut browser, _) = Browser::new().await;
        browser.sign_up("robin@example.com").await;
        assert_eq!(browser.get("/add").await.status, StatusCode::OK);

        let page = browser.get("/logout").await;
        assert_eq!(page.location.as_deref(), Some("/"));
        assert_eq!(browser.get("/add").await.status, StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn empty_form_fields_re_render_with_errors() {
        let (mut browser, _) = Browser::new().await;
        let page = browser.post("/register", &[("email", ""), ("password", ""), ("name", "")]).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains(crate::forms::REQUIRED));

        let page = browser.post("/search", &[]).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains(crate::forms::REQUIRED));
    }
}
