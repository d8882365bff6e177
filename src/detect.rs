//! Source-language detection via whatlang.
//! Used to resolve the "auto" source before engine dispatch; unreliable
//! detections are discarded rather than guessed.

/// Detect the dominant language of `text` as an ISO 639-1 code.
/// Languages without a known code mapping are discarded like unreliable
/// detections; the caller keeps its configured source.
pub fn detect_language(text: &str) -> Option<String> {
    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        return None;
    }
    lang_to_code(info.lang()).map(str::to_string)
}

fn lang_to_code(lang: whatlang::Lang) -> Option<&'static str> {
    use whatlang::Lang::*;
    let code = match lang {
        Eng => "en",
        Ara => "ar",
        Tur => "tr",
        Jpn => "ja",
        Cmn => "zh",
        Spa => "es",
        Hin => "hi",
        Fra => "fr",
        Rus => "ru",
        Deu => "de",
        Por => "pt",
        Kor => "ko",
        Ita => "it",
        Nld => "nl",
        Pol => "pl",
        Ukr => "uk",
        Vie => "vi",
        Tha => "th",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_unambiguous_text() {
        let text = "Это сообщение об ошибке написано по-русски для проверки определения языка";
        assert_eq!(detect_language(text), Some("ru".to_string()));
    }

    #[test]
    fn short_ambiguous_text_is_discarded() {
        assert_eq!(detect_language(""), None);
    }
}
