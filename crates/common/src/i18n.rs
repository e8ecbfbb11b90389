//! Localization lookup for human-readable status text.
//!
//! Templates use `{placeholder}` markers which [`Localizer::format`] fills in.
//! Unknown keys resolve to the key itself so a missing entry is visible rather
//! than silently empty.

use crate::Language;

type Catalog = &'static [(&'static str, &'static str)];

const EN: Catalog = &[
    ("appLocaleCode", "en-US"),
    ("agentTitleLong", "Long Video Agent"),
    ("agentTitleShort", "Short Video Agent"),
    ("marketingLongVideo", "Long Video"),
    ("marketingShortVideo", "Short Video"),
    ("agentStatusRunning", "Running: generating {type} for {lang}..."),
    ("agentStatusIdle", "Next job: {type} ({lang}) at {time}"),
    ("agentStatusDisabled", "Agent is disabled."),
    ("agentStatusActive", "Active"),
    ("agentStatusInactive", "Inactive"),
    ("integrationConnected", "Connected"),
    ("integrationConnecting", "Connecting..."),
    ("integrationDisconnected", "Not connected"),
];

const PT: Catalog = &[
    ("appLocaleCode", "pt-BR"),
    ("agentTitleLong", "Agente de Vídeos Longos"),
    ("agentTitleShort", "Agente de Vídeos Curtos"),
    ("marketingLongVideo", "Vídeo Longo"),
    ("marketingShortVideo", "Vídeo Curto"),
    ("agentStatusRunning", "Executando: gerando {type} para {lang}..."),
    ("agentStatusIdle", "Próximo trabalho: {type} ({lang}) às {time}"),
    ("agentStatusDisabled", "O agente está desativado."),
    ("agentStatusActive", "Ativo"),
    ("agentStatusInactive", "Inativo"),
    ("integrationConnected", "Conectado"),
    ("integrationConnecting", "Conectando..."),
    ("integrationDisconnected", "Não conectado"),
];

const ES: Catalog = &[
    ("appLocaleCode", "es-ES"),
    ("agentTitleLong", "Agente de Videos Largos"),
    ("agentTitleShort", "Agente de Videos Cortos"),
    ("marketingLongVideo", "Video Largo"),
    ("marketingShortVideo", "Video Corto"),
    ("agentStatusRunning", "Ejecutando: generando {type} para {lang}..."),
    ("agentStatusIdle", "Próximo trabajo: {type} ({lang}) a las {time}"),
    ("agentStatusDisabled", "El agente está desactivado."),
    ("agentStatusActive", "Activo"),
    ("agentStatusInactive", "Inactivo"),
    ("integrationConnected", "Conectado"),
    ("integrationConnecting", "Conectando..."),
    ("integrationDisconnected", "No conectado"),
];

/// Pure key → template lookup for one UI locale.
#[derive(Debug, Clone, Copy)]
pub struct Localizer {
    catalog: Catalog,
}

impl Localizer {
    #[must_use]
    pub fn new(locale: Language) -> Self {
        let catalog = match locale {
            Language::En => EN,
            Language::Pt => PT,
            Language::Es => ES,
        };
        Self { catalog }
    }

    /// Raw template for `key`, or `key` itself when absent.
    #[must_use]
    pub fn t(&self, key: &str) -> String {
        self.catalog
            .iter()
            .find(|(k, _)| *k == key)
            .map_or_else(|| key.to_string(), |(_, v)| (*v).to_string())
    }

    /// Template for `key` with every `{name}` replaced by its value.
    #[must_use]
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter()
            .fold(self.t(key), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(Language::En)
    }
}
