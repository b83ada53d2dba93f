//! System instruction sent with every interpretation request.

use chrono::NaiveDate;

use ana_core::types::PersonaConfig;

/// Format `date` the way `locale` writes dates.
pub fn format_date(date: NaiveDate, locale: &str) -> String {
    match locale {
        "pt-BR" | "pt-PT" | "es-ES" | "en-GB" | "fr-FR" => date.format("%d/%m/%Y").to_string(),
        "en-US" => date.format("%m/%d/%Y").to_string(),
        _ => date.format("%Y-%m-%d").to_string(),
    }
}

/// Build the instruction block describing the persona and its duties.
///
/// `client_name` is omitted from the text when blank. The reminder field is
/// only named when `extract_reminders` is set, matching the response schema.
pub fn build_system_instruction(
    persona: &PersonaConfig,
    client_name: &str,
    today: NaiveDate,
    locale: &str,
    extract_reminders: bool,
) -> String {
    let mut text = format!(
        "Você é a \"{}\", uma secretária financeira pessoal no WhatsApp.\n",
        persona.name
    );
    text.push_str(&format!("Seu tom é {}.", persona.tone.describe()));
    if !client_name.trim().is_empty() {
        text.push_str(&format!(" O cliente é o {}.", client_name.trim()));
    }
    text.push('\n');
    text.push_str(
        "Instruções:\n\
         1. Registre gastos e ganhos: quando o cliente mencionar um valor, preencha extractedTransaction.\n",
    );
    if extract_reminders {
        text.push_str(
            "2. Agende lembretes de contas: quando o cliente pedir para lembrar de algo, preencha extractedReminder.\n",
        );
    } else {
        text.push_str("2. Ajude o cliente a lembrar das contas a pagar, respondendo na conversa.\n");
    }
    text.push_str("3. Use emojis e linguagem de chat.\n4. Seja rápida e direta.\n");
    text.push_str(&format!("Data atual: {}\n", format_date(today, locale)));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use ana_core::types::Tone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_format_date_locales() {
        assert_eq!(format_date(today(), "pt-BR"), "16/10/2026");
        assert_eq!(format_date(today(), "en-US"), "10/16/2026");
        assert_eq!(format_date(today(), "ja-JP"), "2026-10-16");
    }

    #[test]
    fn test_instruction_mentions_persona_and_date() {
        let persona = PersonaConfig::default();
        let text = build_system_instruction(&persona, "Francimário", today(), "pt-BR", true);
        assert!(text.contains("\"Ana\""));
        assert!(text.contains("Seu tom é amigável."));
        assert!(text.contains("O cliente é o Francimário."));
        assert!(text.contains("Data atual: 16/10/2026"));
        assert!(text.contains("Registre gastos e ganhos"));
        assert!(text.contains("Agende lembretes"));
    }

    #[test]
    fn test_instruction_omits_blank_client() {
        let text = build_system_instruction(&PersonaConfig::default(), "  ", today(), "pt-BR", true);
        assert!(!text.contains("O cliente"));
    }

    #[test]
    fn test_tone_changes_only_text() {
        let strict = PersonaConfig {
            tone: Tone::Strict,
            ..PersonaConfig::default()
        };
        let friendly = PersonaConfig::default();
        let a = build_system_instruction(&strict, "", today(), "pt-BR", true);
        let b = build_system_instruction(&friendly, "", today(), "pt-BR", true);
        assert!(a.contains("rígido"));
        assert_ne!(a, b);
        assert_eq!(a.lines().count(), b.lines().count());
    }

    #[test]
    fn test_contact_not_in_instruction() {
        let persona = PersonaConfig {
            contact: "+55 84 90000-0000".to_string(),
            ..PersonaConfig::default()
        };
        let text = build_system_instruction(&persona, "", today(), "pt-BR", true);
        assert!(!text.contains("90000"));
    }

    #[test]
    fn test_reminder_field_named_only_when_extracted() {
        let persona = PersonaConfig::default();
        let full = build_system_instruction(&persona, "", today(), "pt-BR", true);
        let reduced = build_system_instruction(&persona, "", today(), "pt-BR", false);
        assert!(full.contains("extractedReminder"));
        assert!(!reduced.contains("extractedReminder"));
        assert!(reduced.contains("extractedTransaction"));
        assert_eq!(full.lines().count(), reduced.lines().count());
    }
}
