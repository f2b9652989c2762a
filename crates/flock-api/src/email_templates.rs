use axum::{
    Extension, Json,
    extract::Path,
};

use flock_types::api::{Claims, EmailTemplateInfo, RenderRequest, RenderedTemplate};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::middleware::require_staff;
use crate::template::{self, merge_missing};

pub struct EmailTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

pub const CATALOGUE: &[EmailTemplate] = &[
    EmailTemplate {
        key: "welcome",
        name: "Welcome",
        subject: "Welcome to {{ church_name }}, {{ first_name }}!",
        body: "Dear {{ first_name }},\n\n\
               We are so glad you have joined {{ church_name }}. Services are held \
               {{ service_times }}, and our team would love to meet you.\n\n\
               Blessings,\n{{ pastor_name }}",
    },
    EmailTemplate {
        key: "donation_receipt",
        name: "Donation receipt",
        subject: "Thank you for your gift of {{ amount }}",
        body: "Dear {{ first_name }},\n\n\
               We received your donation of {{ amount }} on {{ date }} towards \
               {{ project_name }}. Please keep this email as your receipt.\n\n\
               With gratitude,\n{{ church_name }}",
    },
    EmailTemplate {
        key: "event_reminder",
        name: "Event reminder",
        subject: "Reminder: {{ event_title }} on {{ event_date }}",
        body: "Hi {{ first_name }},\n\n\
               This is a reminder that {{ event_title }} takes place on {{ event_date }} \
               at {{ event_location }}. We look forward to seeing you there.",
    },
    EmailTemplate {
        key: "prayer_update",
        name: "Prayer update",
        subject: "An update on your prayer request",
        body: "Dear {{ first_name }},\n\n\
               Your prayer request \"{{ prayer_title }}\" is now {{ prayer_status }}. \
               {{ support_count }} members have been praying with you.",
    },
    EmailTemplate {
        key: "appointment_confirmation",
        name: "Appointment confirmation",
        subject: "Your appointment with {{ pastor_name }} is confirmed",
        body: "Dear {{ first_name }},\n\n\
               Your appointment with {{ pastor_name }} about \"{{ subject }}\" is \
               confirmed for {{ scheduled_at }}.",
    },
];

pub fn find(key: &str) -> Option<&'static EmailTemplate> {
    CATALOGUE.iter().find(|t| t.key == key)
}

impl EmailTemplate {
    fn info(&self) -> EmailTemplateInfo {
        let mut variables = template::placeholders(self.subject);
        merge_missing(&mut variables, template::placeholders(self.body));
        EmailTemplateInfo {
            key: self.key.to_string(),
            name: self.name.to_string(),
            subject: self.subject.to_string(),
            body: self.body.to_string(),
            variables,
        }
    }
}

pub async fn list_templates(
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<EmailTemplateInfo>>> {
    require_staff(&claims)?;
    Ok(Json(CATALOGUE.iter().map(EmailTemplate::info).collect()))
}

pub async fn render_template(
    Extension(claims): Extension<Claims>,
    Path(key): Path<String>,
    ApiJson(req): ApiJson<RenderRequest>,
) -> ApiResult<Json<RenderedTemplate>> {
    require_staff(&claims)?;
    let tpl = find(&key).ok_or(ApiError::NotFound("email template"))?;

    let subject = template::render(tpl.subject, &req.variables);
    let body = template::render(tpl.body, &req.variables);
    let mut missing_variables = subject.missing;
    merge_missing(&mut missing_variables, body.missing);

    Ok(Json(RenderedTemplate {
        subject: subject.text,
        body: body.text,
        missing_variables,
    }))
}
