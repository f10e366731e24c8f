//! Deterministic keyword and gazetteer heuristics

use crate::error::{AppError, AppResult};
use regex::Regex;

/// Words that suggest the user wants current conditions
const WEATHER_KEYWORDS: &[&str] = &[
    "clima",
    "tiempo",
    "temperatura",
    "lluvia",
    "llover",
    "lloviendo",
    "nublado",
    "soleado",
    "frío",
    "calor",
    "viento",
    "pronóstico",
    "mañana",
    "hoy",
    "humedad",
    "nieve",
    "tormenta",
    "está",
    "esta",
    "sombrilla",
];

const KNOWN_CITIES: &[&str] = &[
    "bogotá",
    "bogota",
    "medellín",
    "medellin",
    "cali",
    "barranquilla",
    "cartagena",
    "bucaramanga",
    "pereira",
    "ibagué",
    "cucuta",
    "santa marta",
    "tunja",
    "madrid",
    "barcelona",
    "valencia",
    "sevilla",
    "bilbao",
    "mexico",
    "guadalajara",
    "monterrey",
    "puebla",
    "tijuana",
    "león",
    "juárez",
    "buenos aires",
    "córdoba",
    "rosario",
    "mendoza",
    "la plata",
    "santiago",
    "valparaíso",
    "concepción",
    "lima",
    "arequipa",
    "trujillo",
    "quito",
    "guayaquil",
    "cuenca",
    "caracas",
    "maracaibo",
    "miami",
    "new york",
    "los angeles",
    "chicago",
    "houston",
    "phoenix",
];

/// Preposition patterns tried in order when no known city matches
const CITY_PATTERNS: &[&str] = &[
    r"\ben (.+?)(?:\s|$|,|\.|\?|!)",
    r"\bde (.+?)(?:\s|$|,|\.|\?|!)",
    r"\bpara (.+?)(?:\s|$|,|\.|\?|!)",
    r"\bclima de (.+?)(?:\s|$|,|\.|\?|!)",
    r"\btiempo en (.+?)(?:\s|$|,|\.|\?|!)",
];

/// Candidate length bounds (exclusive), in characters
const MIN_CANDIDATE_CHARS: usize = 2;
const MAX_CANDIDATE_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct KeywordAnalyzer {
    gazetteer: Vec<(Regex, &'static str)>,
    patterns: Vec<Regex>,
}

impl KeywordAnalyzer {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::Internal(format!("invalid city pattern '{}': {}", pattern, e)))
        };

        let gazetteer = KNOWN_CITIES
            .iter()
            .map(|city| Ok((compile(&format!(r"\b{}\b", regex::escape(city)))?, *city)))
            .collect::<AppResult<Vec<_>>>()?;
        let patterns = CITY_PATTERNS
            .iter()
            .map(|p| compile(p))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            gazetteer,
            patterns,
        })
    }

    /// True when any weather keyword occurs anywhere in the message
    pub fn needs_weather_data(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        WEATHER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    }

    /// Known city that appears first in the message, else a preposition guess
    ///
    /// On a tie in position the longer name wins, so "santa marta" beats a
    /// shorter entry starting at the same offset.
    pub fn extract_city(&self, message: &str) -> Option<String> {
        let lowered = message.to_lowercase();

        let known = self
            .gazetteer
            .iter()
            .filter_map(|(re, city)| re.find(&lowered).map(|m| (m.start(), *city)))
            .min_by(|(pos_a, city_a), (pos_b, city_b)| {
                pos_a.cmp(pos_b).then(city_b.len().cmp(&city_a.len()))
            });
        if let Some((_, city)) = known {
            return Some(title_case(city));
        }

        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(&lowered) {
                let candidate = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                let chars = candidate.chars().count();
                if chars > MIN_CANDIDATE_CHARS && chars < MAX_CANDIDATE_CHARS {
                    return Some(title_case(candidate));
                }
            }
        }

        None
    }
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
