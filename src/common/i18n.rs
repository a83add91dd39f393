// src/common/i18n.rs

use std::{collections::HashMap, sync::Arc};

const DEFAULT_LANG: &str = "en";

// (código, inglês, português)
const CATALOG: &[(&str, &str, &str)] = &[
    ("validation_failed", "One or more fields are invalid.", "Um ou mais campos são inválidos."),
    ("too_long", "Value is too long.", "Valor muito longo."),
    ("invalid_date_range", "Start date must not be after end date.", "A data inicial não pode ser posterior à data final."),
    ("missing_credentials", "Authentication token is missing.", "Token de autenticação ausente."),
    ("view_not_found", "View not found.", "View não encontrada."),
    ("upstream_unauthorized", "The CRM backend rejected the credentials.", "O backend do CRM recusou as credenciais."),
    ("upstream_timeout", "The CRM backend did not answer in time.", "O backend do CRM não respondeu a tempo."),
    ("upstream_unavailable", "The CRM backend is unreachable.", "O backend do CRM está inacessível."),
    ("upstream_error", "The CRM backend reported an error.", "O backend do CRM retornou um erro."),
    ("upstream_malformed", "The CRM backend sent an unexpected response.", "O backend do CRM enviou uma resposta inesperada."),
    ("too_many_pages", "The report is too large to be built.", "O relatório é grande demais para ser montado."),
    ("internal_error", "An unexpected error occurred.", "Ocorreu um erro inesperado."),
];

/// Mensagens de erro por idioma. Idioma desconhecido cai no inglês; código
/// desconhecido volta o próprio código.
#[derive(Clone)]
pub struct I18nStore {
    messages: Arc<HashMap<&'static str, HashMap<&'static str, &'static str>>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut en = HashMap::new();
        let mut pt = HashMap::new();
        for (code, en_msg, pt_msg) in CATALOG {
            en.insert(*code, *en_msg);
            pt.insert(*code, *pt_msg);
        }

        let mut messages = HashMap::new();
        messages.insert("en", en);
        messages.insert("pt", pt);

        Self { messages: Arc::new(messages) }
    }

    pub fn translate(&self, lang: &str, code: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|catalog| catalog.get(code))
            .or_else(|| {
                self.messages
                    .get(DEFAULT_LANG)
                    .and_then(|catalog| catalog.get(code))
            })
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| code.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}
