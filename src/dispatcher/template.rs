//! HTML report rendering.
//!
//! Every display decision is made on [`ReportView`]; the template only lays it out.
//! Tera autoescapes all fields, so citizen-supplied text cannot inject markup.

use serde::Serialize;
use tera::{Context, Tera};

use crate::location::GeoPoint;

pub const PROBLEM_FALLBACK: &str = "N/A";
pub const PHONE_FALLBACK: &str = "Não informado";
pub const ADDRESS_FALLBACK: &str = "Endereço por extenso não disponível.";
pub const COORDINATES_FALLBACK: &str = "Coordenadas não informadas.";
pub const SUBJECT_FALLBACK: &str = "Nova Indicação de Problema Urbano";

const TEMPLATE_NAME: &str = "report.html";

const REPORT_TEMPLATE: &str = r#"<h1>Nova Indicação Automatizada por IA</h1>
<p><strong>Problema Identificado:</strong> {{ problem }}</p>
<hr>
<h2>Contato do Cidadão</h2>
<p><strong>Nome:</strong> {{ name }}</p>
<p><strong>Telefone/WhatsApp:</strong> {% if phone_link %}<a href="{{ phone_link | safe }}">{{ phone }}</a>{% else %}{{ phone }}{% endif %}</p>
<hr>
<h2>Detalhes da Localização</h2>
<p><strong>Endereço aproximado:</strong></p>
<p style="font-size: 1.1em; background: #f9f9ff; border: 1px solid #ccc; padding: 10px;">{{ address }}</p>
{% if street_position %}<p><strong>Posição na via:</strong> {{ street_position }}</p>
{% endif %}<p><strong>Coordenadas Exatas:</strong> {{ coordinates }}</p>
{% if map_link %}<p><strong><a href="{{ map_link | safe }}" target="_blank">Ver no Google Maps</a></strong></p>
{% endif %}<hr>
<p><strong>Relato Formal Gerado pela IA (Baseado na Imagem e Local):</strong></p>
<div style="border: 1px solid #ccc; padding: 15px; background: #f9f9f9; line-height: 1.5;">
{{ description | escape | linebreaksbr | safe }}
</div>
<hr>
<p>{{ attachment_note }}</p>
"#;

/// Input to [`ReportView::build`]; plain borrowed fields from the request.
#[derive(Debug, Default)]
pub struct ReportFields<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub description: &'a str,
    pub problem: Option<&'a str>,
    pub street_address: Option<&'a str>,
    pub street_position: Option<&'a str>,
    pub location: Option<&'a GeoPoint>,
    pub has_image: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub problem: String,
    pub name: String,
    pub phone: String,
    /// Built from digits only.
    pub phone_link: Option<String>,
    pub address: String,
    pub street_position: Option<String>,
    pub coordinates: String,
    /// Built from validated numeric coordinates only.
    pub map_link: Option<String>,
    pub description: String,
    pub attachment_note: String,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ReportView {
    pub fn build(fields: &ReportFields<'_>) -> Self {
        let phone = present(fields.phone);
        let phone_digits: Option<String> = phone
            .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|d| !d.is_empty());

        Self {
            problem: present(fields.problem).unwrap_or(PROBLEM_FALLBACK).to_string(),
            name: fields.name.trim().to_string(),
            phone: phone.unwrap_or(PHONE_FALLBACK).to_string(),
            phone_link: phone_digits.map(|d| format!("https://wa.me/55{d}")),
            address: present(fields.street_address)
                .unwrap_or(ADDRESS_FALLBACK)
                .to_string(),
            street_position: present(fields.street_position).map(str::to_string),
            coordinates: fields
                .location
                .map(|p| format!("{}, {}", p.latitude, p.longitude))
                .unwrap_or_else(|| COORDINATES_FALLBACK.to_string()),
            map_link: fields.location.map(GeoPoint::maps_link),
            description: fields.description.to_string(),
            attachment_note: if fields.has_image {
                "Uma imagem foi anexada para referência."
            } else {
                "Nenhuma imagem enviada."
            }
            .to_string(),
        }
    }
}

pub fn subject(problem: Option<&str>) -> String {
    format!(
        "[INDICAÇÃO IA] {}",
        present(problem).unwrap_or(SUBJECT_FALLBACK)
    )
}

pub struct ReportTemplate {
    tera: Tera,
}

impl ReportTemplate {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, REPORT_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, view: &ReportView) -> Result<String, tera::Error> {
        let context = Context::from_serialize(view)?;
        self.tera.render(TEMPLATE_NAME, &context)
    }
}
