use serde::Serialize;
use std::fmt;

/// Languages the site is served in. English lives at the site root,
/// Portuguese under `/pt`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Pt,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Pt];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pt => "pt",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        match code {
            "en" => Some(Language::En),
            "pt" => Some(Language::Pt),
            _ => None,
        }
    }

    /// Path prefix the pages of this language are mounted under.
    pub fn path_prefix(self) -> &'static str {
        match self {
            Language::En => "",
            Language::Pt => "/pt",
        }
    }

    pub fn catalog(self) -> &'static Catalog {
        match self {
            Language::En => &EN,
            Language::Pt => &PT,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fixed user-facing strings of one language.
pub struct Catalog {
    pub index_title: &'static str,
    pub search_heading: &'static str,
    pub channels_label: &'static str,
    pub all_channels_label: &'static str,
    pub date_start_label: &'static str,
    pub date_end_label: &'static str,
    pub search_button: &'static str,
    pub subscribe_heading: &'static str,
    pub email_label: &'static str,
    pub period_label: &'static str,
    pub hourly_label: &'static str,
    pub daily_label: &'static str,
    pub subscribe_button: &'static str,

    pub search_title: &'static str,
    pub export_ready: &'static str,
    pub export_ready_link: &'static str,
    pub export_validity: &'static str,

    pub subscribe_title: &'static str,
    pub unsubscribe_hint: &'static str,

    pub unsubscribe_title: &'static str,
    pub unsubscribe_question: &'static str,
    pub unsubscribe_button: &'static str,
    pub unsubscribed: &'static str,

    pub notification_subject: &'static str,
}

pub static EN: Catalog = Catalog {
    index_title: "ExpoLIS sensor data",
    search_heading: "Search sensor data",
    channels_label: "Data",
    all_channels_label: "all",
    date_start_label: "From",
    date_end_label: "Up to",
    search_button: "Search",
    subscribe_heading: "Subscribe to sensor data",
    email_label: "Email",
    period_label: "Period",
    hourly_label: "hourly",
    daily_label: "daily",
    subscribe_button: "Subscribe",

    search_title: "Search result",
    export_ready: "Your search is ready to be",
    export_ready_link: "downloaded",
    export_validity: "This link is valid for",

    subscribe_title: "ExpoLIS Subscription",
    unsubscribe_hint: "To unsubscribe use the following link:",

    unsubscribe_title: "Canceling Subscription",
    unsubscribe_question: "Cancel the subscription associated to this email address?",
    unsubscribe_button: "Cancel subscription",
    unsubscribed: "Subscription canceled.",

    notification_subject: "ExpoLIS data",
};

pub static PT: Catalog = Catalog {
    index_title: "Dados dos sensores ExpoLIS",
    search_heading: "Pesquisar dados dos sensores",
    channels_label: "Dados",
    all_channels_label: "todos",
    date_start_label: "Desde",
    date_end_label: "Até",
    search_button: "Pesquisar",
    subscribe_heading: "Subscrever os dados dos sensores",
    email_label: "Correio electrónico",
    period_label: "Período",
    hourly_label: "horário",
    daily_label: "diário",
    subscribe_button: "Subscrever",

    search_title: "Resultado da pesquisa",
    export_ready: "A sua pesquisa está pronta para ser",
    export_ready_link: "descarregada",
    export_validity: "Esta ligação é válida durante",

    subscribe_title: "Subscrição ExpoLIS",
    unsubscribe_hint: "Para cancelar a subscrição, utilize a seguinte ligação:",

    unsubscribe_title: "Cancelamento de Subscrição",
    unsubscribe_question: "Cancelar a subscrição associada a este endereço?",
    unsubscribe_button: "Cancelar subscrição",
    unsubscribed: "Subscrição cancelada.",

    notification_subject: "Dados ExpoLIS",
};

pub fn subscribed(lang: Language, email: &str) -> String {
    match lang {
        Language::En => format!(
            "You are subscribed to the ExpoLIS data. Periodic emails will be sent to {} when new data arrives.",
            email
        ),
        Language::Pt => format!(
            "Você está subscrito aos dados do ExpoLIS. Vão ser enviados mensagens periodicamente para o endereço {} quando houver novos dados.",
            email
        ),
    }
}

pub fn already_subscribed(lang: Language, email: &str) -> String {
    match lang {
        Language::En => format!(
            "The email {} is already associated to a subscription.  Please use the provided link to cancel the last subscription.",
            email
        ),
        Language::Pt => format!(
            "O endereço {} já está associado a uma subscrição.  Para efectuar uma nova subscrição é necessário cancelar a prévia.  Utilize a ligação que foi fornecida.",
            email
        ),
    }
}

/// How long a search link stays valid, e.g. "24 hours".
pub fn validity_hours(lang: Language, hours: i64) -> String {
    match lang {
        Language::En => format!("{} hours", hours),
        Language::Pt => format!("{} horas", hours),
    }
}

/// Plain-text body of a periodic notification email.
pub fn notification_body(
    lang: Language,
    from: &str,
    to: &str,
    download_url: &str,
    validity_days: i64,
    unsubscribe_url: &str,
) -> String {
    match lang {
        Language::En => format!(
            "Sensor data from {from} up to {to} is available at this link:\n\n\
             {download_url}\n\n\
             This link is valid for {validity_days} days.\n\n\
             To unsubscribe:\n\n\
             {unsubscribe_url}\n\n\
             The ExpoLIS project\n"
        ),
        Language::Pt => format!(
            "Os dados dos sensores desde {from} até {to} estão disponíveis nesta ligação:\n\n\
             {download_url}\n\n\
             Esta ligação é válida durante {validity_days} dias.\n\n\
             Para cancelar a subscrição:\n\n\
             {unsubscribe_url}\n\n\
             O projecto ExpoLIS\n"
        ),
    }
}
