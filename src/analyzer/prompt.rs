//! Instruction text and output schema sent to the inference service.

use serde_json::{json, Value};

use crate::location::GeoPoint;

pub const NO_PROBLEM_LABEL: &str = "Nenhum problema urbano detectado.";

/// Which parts of the instruction are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    pub include_location: bool,
    pub estimate_address: bool,
    /// Only meaningful together with `estimate_address`.
    pub estimate_position: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            include_location: true,
            estimate_address: false,
            estimate_position: false,
        }
    }
}

impl PromptOptions {
    pub fn wants_address(&self) -> bool {
        self.estimate_address
    }

    pub fn wants_position(&self) -> bool {
        self.estimate_address && self.estimate_position
    }

    /// Field names the reply object must contain, in output order.
    pub fn output_fields(&self) -> Vec<&'static str> {
        let mut fields = vec!["is_inappropriate", "problem_type", "formal_description"];
        if self.wants_address() {
            fields.push("street_address");
        }
        if self.wants_position() {
            fields.push("street_position");
        }
        fields
    }
}

pub fn location_text(location: Option<&GeoPoint>) -> String {
    match location {
        Some(point) => format!(
            "Localização GPS: Latitude {}, Longitude {}.",
            point.latitude, point.longitude
        ),
        None => "Localização GPS indisponível.".to_string(),
    }
}

pub fn build_instruction(options: &PromptOptions, location: Option<&GeoPoint>) -> String {
    let mut out = String::from(
        "Você é um Assistente de Serviço Cívico e Moderador de Conteúdo. \
         Analise a imagem enviada por um cidadão.\n\n",
    );

    out.push_str("MODERAÇÃO (prioritária):\n");
    out.push_str(
        "- Se a imagem contiver nudez, partes íntimas ou conteúdo sexualmente sugestivo \
         ou impróprio, interrompa a análise e defina \"is_inappropriate\" como true.\n",
    );
    out.push_str(&format!(
        "- Se a imagem não mostrar um problema urbano identificável (ex: selfie, paisagem sem \
         defeito), defina \"is_inappropriate\" como false e \"problem_type\" como \"{NO_PROBLEM_LABEL}\".\n\n"
    ));

    out.push_str("SE FOR UM PROBLEMA URBANO:\n");
    out.push_str("1. Defina \"is_inappropriate\" como false.\n");
    out.push_str(
        "2. Em \"problem_type\", descreva o problema principal em uma frase curta \
         (ex: \"Buraco na pavimentação\", \"Poste de luz queimado\", \"Lixo acumulado\").\n",
    );
    out.push_str(
        "3. Em \"formal_description\", escreva em português do Brasil uma descrição formal e \
         técnica do problema, em tom respeitoso, dirigida à prefeitura e solicitando providências. \
         Não use saudações.\n",
    );

    let mut step = 4;
    if options.include_location {
        out.push_str(&format!(
            "{step}. Comece a descrição citando a localização: \"{}\"\n",
            location_text(location)
        ));
        step += 1;
    }

    if options.wants_address() {
        match location {
            Some(point) => out.push_str(&format!(
                "{step}. Usando seu conhecimento geográfico, estime o endereço mais provável \
                 (rua, número aproximado, bairro e cidade) para as coordenadas {}, {} e \
                 coloque-o em \"street_address\".\n",
                point.latitude, point.longitude
            )),
            None => out.push_str(&format!(
                "{step}. Sem coordenadas, defina \"street_address\" como \"Localização indisponível\".\n"
            )),
        }
        step += 1;
    }

    if options.wants_position() {
        out.push_str(&format!(
            "{step}. Em \"street_position\", indique a posição aproximada do problema ao longo \
             dessa rua (ex: \"início\", \"meio\", \"final do quarteirão\", \"próximo à esquina\").\n"
        ));
    }

    out.push_str(
        "\nResponda com UM ÚNICO objeto JSON, sempre com todos os campos abaixo, \
         mesmo quando a imagem for imprópria ou não houver problema:\n",
    );
    out.push_str(&output_template(options));
    out
}

fn output_template(options: &PromptOptions) -> String {
    let mut lines = vec![
        "  \"is_inappropriate\": true/false".to_string(),
        "  \"problem_type\": \"o problema identificado (frase curta)\"".to_string(),
        "  \"formal_description\": \"o texto formal completo (ou o motivo da recusa)\"".to_string(),
    ];
    if options.wants_address() {
        lines.push("  \"street_address\": \"endereço estimado\"".to_string());
    }
    if options.wants_position() {
        lines.push("  \"street_position\": \"posição aproximada na rua\"".to_string());
    }
    format!("{{\n{}\n}}\n", lines.join(",\n"))
}

/// Structured-output schema for the enabled fields.
pub fn response_schema(options: &PromptOptions) -> Value {
    let mut properties = serde_json::Map::new();
    for field in options.output_fields() {
        let kind = if field == "is_inappropriate" {
            "BOOLEAN"
        } else {
            "STRING"
        };
        properties.insert(field.to_string(), json!({ "type": kind }));
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": options.output_fields(),
    })
}
