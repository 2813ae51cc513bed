//! Language tag resolution and display names.

/// Tag used when neither the disc nor the container names a language.
pub const UNDETERMINED: &str = "und";

/// Pick the language for a stream: disc lister tag at the stream's
/// type-relative position, then the container tag, then [`UNDETERMINED`].
pub fn resolve_language(disc_tags: &[String], type_index: usize, container: Option<&str>) -> String {
    disc_tags
        .get(type_index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .or_else(|| container.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or(UNDETERMINED)
        .to_lowercase()
}

/// English display name for an ISO 639-2 (or 639-1) code.
pub fn display_name(code: &str) -> String {
    let name = match code.to_lowercase().as_str() {
        "eng" | "en" => "English",
        "fra" | "fre" | "fr" => "French",
        "deu" | "ger" | "de" => "German",
        "spa" | "es" => "Spanish",
        "ita" | "it" => "Italian",
        "por" | "pt" => "Portuguese",
        "nld" | "dut" | "nl" => "Dutch",
        "swe" | "sv" => "Swedish",
        "nor" | "nob" | "no" => "Norwegian",
        "dan" | "da" => "Danish",
        "fin" | "fi" => "Finnish",
        "pol" | "pl" => "Polish",
        "ces" | "cze" | "cs" => "Czech",
        "hun" | "hu" => "Hungarian",
        "rus" | "ru" => "Russian",
        "ukr" | "uk" => "Ukrainian",
        "ell" | "gre" | "el" => "Greek",
        "tur" | "tr" => "Turkish",
        "ara" | "ar" => "Arabic",
        "heb" | "he" => "Hebrew",
        "hin" | "hi" => "Hindi",
        "tha" | "th" => "Thai",
        "vie" | "vi" => "Vietnamese",
        "ind" | "id" => "Indonesian",
        "msa" | "may" | "ms" => "Malay",
        "chi" | "zho" | "zh" => "Chinese",
        "cmn" => "Mandarin",
        "yue" => "Cantonese",
        "jpn" | "ja" => "Japanese",
        "kor" | "ko" => "Korean",
        "und" | "" => "Undetermined",
        _ => return code.to_string(),
    };
    name.to_string()
}
