//! Localized audit sentences.

use core::str::FromStr;

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;

use rollcall_core::UserId;

use crate::NewLogEntry;

/// Language used for audit sentences and their dates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AuditLocale {
    #[default]
    PtBr,
    En,
}

impl FromStr for AuditLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pt-br" | "pt_br" | "pt" => Ok(Self::PtBr),
            "en" | "en-us" | "en_us" => Ok(Self::En),
            other => Err(format!("unsupported audit locale '{other}'")),
        }
    }
}

const PT_BR_WEEKDAYS: [&str; 7] = [
    "domingo",
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
];

const PT_BR_MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Long date-time in the given zone.
///
/// - `pt-BR`: `segunda-feira, 19 de outubro de 2026 às 14:05`
/// - `en`: `Monday, October 19, 2026 2:05 PM`
pub fn long_date(at: DateTime<Utc>, tz: Tz, locale: AuditLocale) -> String {
    let local = at.with_timezone(&tz);
    match locale {
        AuditLocale::PtBr => format!(
            "{}, {} de {} de {} às {:02}:{:02}",
            PT_BR_WEEKDAYS[local.weekday().num_days_from_sunday() as usize],
            local.day(),
            PT_BR_MONTHS[local.month0() as usize],
            local.year(),
            local.hour(),
            local.minute(),
        ),
        AuditLocale::En => local.format("%A, %B %-d, %Y %-I:%M %p").to_string(),
    }
}

/// Builds the audit entries written by account handlers.
#[derive(Debug, Clone)]
pub struct AuditMessages {
    application: String,
    tz: Tz,
    locale: AuditLocale,
}

impl AuditMessages {
    pub fn new(app_name: &str, company: &str, tz: Tz, locale: AuditLocale) -> Self {
        Self {
            application: format!("{app_name}/{company}"),
            tz,
            locale,
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn user_created(&self, actor: UserId, person_name: &str, at: DateTime<Utc>) -> NewLogEntry {
        let when = long_date(at, self.tz, self.locale);
        let content = match self.locale {
            AuditLocale::PtBr => format!("Um novo usuário para {person_name} foi criado na {when}"),
            AuditLocale::En => format!("A new user for {person_name} was created on {when}"),
        };
        self.entry(actor, content)
    }

    pub fn user_updated(&self, actor: UserId, email: &str, at: DateTime<Utc>) -> NewLogEntry {
        let when = long_date(at, self.tz, self.locale);
        let content = match self.locale {
            AuditLocale::PtBr => format!("O usuário de login {email} foi modificado em {when}"),
            AuditLocale::En => format!("The user with login {email} was modified on {when}"),
        };
        self.entry(actor, content)
    }

    fn entry(&self, actor: UserId, content: String) -> NewLogEntry {
        NewLogEntry {
            application: self.application.clone(),
            content,
            user: actor,
            task: None,
        }
    }
}
