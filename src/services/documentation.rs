use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the TrivAI backend.
#[openapi(
    paths(
        crate::routes::health::welcome,
        crate::routes::health::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::google_login,
        crate::routes::auth::me,
        crate::routes::oauth::start,
        crate::routes::oauth::callback,
        crate::routes::jeopardy::generate,
        crate::routes::jeopardy::create_session,
        crate::routes::jeopardy::get_session,
        crate::routes::jeopardy::select,
        crate::routes::jeopardy::wager,
        crate::routes::jeopardy::answer,
        crate::routes::jeopardy::judge,
        crate::routes::jeopardy::pass,
        crate::routes::feud::generate,
        crate::routes::feud::create_session,
        crate::routes::feud::get_session,
        crate::routes::feud::answer,
        crate::routes::feud::skip,
        crate::routes::connections::generate,
        crate::routes::connections::create_session,
        crate::routes::connections::get_session,
        crate::routes::connections::toggle,
        crate::routes::connections::deselect,
        crate::routes::connections::shuffle,
        crate::routes::connections::submit,
        crate::routes::sessions::abandon,
        crate::routes::games::list_games,
        crate::routes::games::get_game,
        crate::routes::games::my_scores,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::WelcomeResponse,
            crate::dto::auth::RegisterRequest,
            crate::dto::auth::LoginRequest,
            crate::dto::auth::GoogleLoginRequest,
            crate::dto::auth::TokenResponse,
            crate::dto::auth::UserResponse,
            crate::dto::content::JeopardyClueData,
            crate::dto::content::JeopardyBoardData,
            crate::dto::content::FeudRoundData,
            crate::dto::content::FeudGameData,
            crate::dto::content::GroupData,
            crate::dto::content::ConnectionsData,
            crate::dto::generate::JeopardyGenerateRequest,
            crate::dto::generate::JeopardyGenerateResponse,
            crate::dto::generate::FeudGenerateRequest,
            crate::dto::generate::FeudGenerateResponse,
            crate::dto::generate::ConnectionsGenerateRequest,
            crate::dto::generate::ConnectionsGenerateResponse,
            crate::dto::session::PhaseView,
            crate::dto::session::CreateJeopardySessionRequest,
            crate::dto::session::SelectClueRequest,
            crate::dto::session::WagerRequest,
            crate::dto::session::AnswerRequest,
            crate::dto::session::JudgeRequest,
            crate::dto::session::ClueView,
            crate::dto::session::CategoryView,
            crate::dto::session::OpenClueView,
            crate::dto::session::JeopardySessionView,
            crate::dto::session::SelectionResponse,
            crate::dto::session::WagerResponse,
            crate::dto::session::SettlementResponse,
            crate::dto::session::CreateFeudSessionRequest,
            crate::dto::session::AnswerSlotView,
            crate::dto::session::FeudRoundView,
            crate::dto::session::FeudSessionView,
            crate::dto::session::FeudGuessResponse,
            crate::dto::session::FeudSkipResponse,
            crate::dto::session::CreateConnectionsSessionRequest,
            crate::dto::session::ToggleTileRequest,
            crate::dto::session::TileView,
            crate::dto::session::ConnectionsSessionView,
            crate::dto::session::ToggleResponse,
            crate::dto::session::SubmissionResponse,
            crate::dto::games::GameSummaryResponse,
            crate::dto::games::GameDetailResponse,
            crate::dto::games::ScoreResponse,
            crate::dao::models::GameType,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Accounts and access tokens"),
        (name = "oauth", description = "Browser redirect handshake with Google"),
        (name = "jeopardy", description = "Board generation and Jeopardy sessions"),
        (name = "feud", description = "Survey generation and Feud sessions"),
        (name = "connections", description = "Puzzle generation and Connections sessions"),
        (name = "sessions", description = "Session management shared by every game"),
        (name = "games", description = "Saved games and scores"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by authenticated routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_versioned_and_browser_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/auth/login"));
        assert!(paths.contains_key("/api/v1/jeopardy/sessions/{id}/wager"));
        assert!(paths.contains_key("/auth/google/callback"));
        assert!(paths.contains_key("/health"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
