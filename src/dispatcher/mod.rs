//! Report dispatcher: renders the citizen's report and mails it.

pub mod relay;
pub mod template;

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::MailConfig;
use crate::error::{ApiError, ApiResult};
use crate::image_data::{EmbeddedImage, ImageKind};
use crate::location::{GeoPoint, RawCoordinate};

use relay::{Attachment, MailRelay, OutgoingMail};
use template::{ReportFields, ReportTemplate, ReportView};

pub const SENT_MESSAGE: &str = "E-mail enviado com sucesso!";
pub const FAILED_MESSAGE: &str = "Falha ao enviar o e-mail.";

const SENDER_LABEL: &str = "Formulário de Indicação IA";

/// Report submitted by the app.
///
/// `latitude`/`longitude`/`street_address` are canonical; `gps_latitude`,
/// `gps_longitude` and `endereco` are still accepted from older app builds.
/// Every field may be missing or `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub problema: Option<String>,
    #[serde(default)]
    pub latitude: Option<RawCoordinate>,
    #[serde(default)]
    pub longitude: Option<RawCoordinate>,
    #[serde(default)]
    pub gps_latitude: Option<RawCoordinate>,
    #[serde(default)]
    pub gps_longitude: Option<RawCoordinate>,
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub street_position: Option<String>,
    #[serde(default)]
    pub imagem_base64: Option<String>,
}

impl ReportRequest {
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(
            self.latitude.as_ref().or(self.gps_latitude.as_ref()),
            self.longitude.as_ref().or(self.gps_longitude.as_ref()),
        )
    }

    pub fn address(&self) -> Option<&str> {
        self.street_address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .or(self.endereco.as_deref())
    }

    pub fn image(&self) -> Option<&str> {
        self.imagem_base64
            .as_deref()
            .filter(|img| !img.trim().is_empty())
    }
}

/// Sender and recipient are fixed per process.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub from: String,
    pub to: String,
}

impl From<&MailConfig> for Mailbox {
    fn from(config: &MailConfig) -> Self {
        Self {
            from: format!("{SENDER_LABEL} <{}>", config.sender),
            to: config.recipient.clone(),
        }
    }
}

pub struct Dispatcher {
    relay: Arc<dyn MailRelay>,
    mailbox: Mailbox,
    template: ReportTemplate,
}

impl Dispatcher {
    pub fn new(relay: Arc<dyn MailRelay>, mailbox: Mailbox) -> Result<Self, tera::Error> {
        Ok(Self {
            relay,
            mailbox,
            template: ReportTemplate::new()?,
        })
    }

    /// Builds the message without sending it.
    pub fn compose(&self, request: &ReportRequest) -> ApiResult<OutgoingMail> {
        let location = request.location();
        let image = request.image();

        let view = ReportView::build(&ReportFields {
            name: request.nome.as_deref().unwrap_or(""),
            phone: request.telefone.as_deref(),
            description: request.descricao.as_deref().unwrap_or(""),
            problem: request.problema.as_deref(),
            street_address: request.address(),
            street_position: request.street_position.as_deref(),
            location: location.as_ref(),
            has_image: image.is_some(),
        });

        let attachments = match image {
            Some(image) => vec![attachment(image)?],
            None => Vec::new(),
        };

        Ok(OutgoingMail {
            from: self.mailbox.from.clone(),
            to: self.mailbox.to.clone(),
            subject: template::subject(request.problema.as_deref()),
            html: self.template.render(&view)?,
            attachments,
        })
    }

    pub async fn dispatch(&self, request: ReportRequest) -> ApiResult<()> {
        let mail = self.compose(&request).map_err(|e| {
            error!(error = %e, "could not compose report");
            e
        })?;

        self.relay.send(&mail).await.map_err(|e| {
            error!(error = %e, "could not deliver report");
            ApiError::from(e)
        })?;

        info!(subject = %mail.subject, attachments = mail.attachments.len(), "report sent");
        Ok(())
    }
}

fn attachment(image: &str) -> ApiResult<Attachment> {
    let content = EmbeddedImage::parse(image).decode()?;
    let kind = ImageKind::sniff(&content);
    Ok(Attachment {
        filename: format!(
            "problema-urbano-{}.{}",
            Utc::now().timestamp_millis(),
            kind.extension
        ),
        content_type: kind.mime_type.to_string(),
        content,
    })
}
