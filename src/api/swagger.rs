use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic Intake Service API",
        version = "1.0.0",
        description = "Intake and feedback forms for a massage therapy clinic.\n\n**Public:** multi-step form wizard, drafts and submission (PDF generation + storage).\n\n**Dashboard (JWT):** analytics, SOAP note assist and PDF downloads.\n\n**Admin (JWT, admin role):** user approval and master file maintenance.",
        contact(
            name = "Clinic Intake Team"
        )
    ),
    paths(
        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Forms
        crate::api::forms::get_steps,
        crate::api::forms::validate_step,
        crate::api::forms::visible_fields,
        crate::api::forms::advance,
        crate::api::forms::submit_form,

        // Drafts
        crate::api::drafts::save_draft,
        crate::api::drafts::get_draft,
        crate::api::drafts::delete_draft,

        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::verify_token,
        crate::api::auth::get_me,

        // Analytics
        crate::api::analytics::get_summary,
        crate::api::analytics::get_trends,
        crate::api::analytics::get_charts,
        crate::api::analytics::get_submissions,

        // SOAP
        crate::api::soap::generate,
        crate::api::soap::export,

        // Submissions
        crate::api::submissions::download_pdf,

        // Admin
        crate::api::admin::list_users,
        crate::api::admin::approve_user,
        crate::api::admin::reject_user,
        crate::api::admin::delete_user,
        crate::api::admin::update_data,
        crate::api::admin::refresh_analytics,
    ),
    components(
        schemas(
            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Forms
            crate::api::forms::StepRequest,
            crate::api::forms::VisibleFieldsRequest,
            crate::models::FormSubmission,
            crate::models::FormType,
            crate::services::wizard_service::StepValidation,
            crate::services::submission_service::SubmitResponse,
            crate::models::StoredFile,
            crate::models::StorageKind,
            crate::utils::FieldError,

            // Drafts
            crate::models::Draft,
            crate::models::SaveDraftRequest,

            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::RegisterResponse,
            crate::services::auth_service::VerifyTokenResponse,
            crate::models::UserInfo,
            crate::models::Role,
            crate::models::UserStatus,

            // Analytics
            crate::models::AnalyticsSummary,
            crate::models::TrendBucket,
            crate::models::TrendPeriod,
            crate::models::ChartData,
            crate::models::CountEntry,
            crate::models::TherapistRating,
            crate::models::MetadataRecord,
            crate::services::analytics_service::SubmissionPage,

            // SOAP
            crate::models::SoapRequest,
            crate::models::SoapNote,

            // Admin
            crate::services::master_file_service::RebuildReport,
        )
    ),
    tags(
        (name = "Health", description = "Health check and Prometheus-style metrics."),
        (name = "Forms", description = "Intake/feedback wizard: step definitions, per-step validation and final submission."),
        (name = "Drafts", description = "Server-side autosave of partially filled forms."),
        (name = "Auth", description = "Dashboard accounts. New registrations wait for admin approval."),
        (name = "Analytics", description = "Aggregates computed from the master files."),
        (name = "SOAP", description = "SOAP note drafting from an intake and optional feedback."),
        (name = "Submissions", description = "Access to stored submission PDFs."),
        (name = "Admin", description = "User approval and data maintenance."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}
