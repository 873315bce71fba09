//! OpenAPI document for the `/api/v1` surface.

use crate::handlers::{appointments, auth, hospitals};
use crate::models::{
    Appointment, AppointmentInput, AppointmentView, Hospital, HospitalInput, HospitalRef, HospitalSummary,
    RegisterInput, Role, UserView,
};
use crate::response::{Empty, ListMeta, TokenBody};
use crate::service::query::{PageRef, Pagination};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vaccine Booking API",
        description = "Hospitals, appointments and accounts. Writes to hospitals are admin-only."
    ),
    servers((url = "http://localhost:5000/api/v1", description = "Local development")),
    paths(
        hospitals::list_hospitals,
        hospitals::get_hospital,
        hospitals::create_hospital,
        hospitals::update_hospital,
        hospitals::delete_hospital,
        appointments::list_appointments,
        appointments::list_hospital_appointments,
        appointments::get_appointment,
        appointments::create_appointment,
        appointments::create_hospital_appointment,
        appointments::update_appointment,
        appointments::delete_appointment,
        auth::register,
        auth::login,
        auth::me,
        auth::logout,
    ),
    components(schemas(
        Hospital,
        HospitalInput,
        HospitalSummary,
        HospitalRef,
        Appointment,
        AppointmentInput,
        AppointmentView,
        Role,
        UserView,
        RegisterInput,
        auth::LoginInput,
        TokenBody,
        ListMeta,
        Pagination,
        PageRef,
        Empty,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "hospitals", description = "Hospital directory"),
        (name = "appointments", description = "Vaccination bookings"),
        (name = "auth", description = "Accounts and sessions"),
    )
)]
pub struct ApiDoc;

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
    use crate::auth::RoutePolicy;

    fn openapi_path(route: &str) -> String {
        route
            .split('/')
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) => format!("{{{}}}", name),
                None => seg.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    #[test]
    fn every_policy_route_is_documented() {
        let doc = ApiDoc::openapi();
        for entry in RoutePolicy::standard().entries() {
            let path = openapi_path(entry.path);
            assert!(doc.paths.paths.contains_key(&path), "{} {} missing from docs", entry.method, path);
        }
    }

    #[test]
    fn declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["components"]["securitySchemes"]["bearer"]["scheme"], "bearer");
        assert_eq!(json["servers"][0]["url"], "http://localhost:5000/api/v1");
    }
}
