//! Prompt templates
//!
//! Templates live in `prompts/` as plain text with `{{placeholder}}` slots and
//! are compiled into the binary. Bump [`PROMPT_VERSION`] when any of them
//! changes meaning.

/// Revision of the prompt set, logged with each generation
pub const PROMPT_VERSION: &str = "2";

const SYSTEM_PERSONA: &str = include_str!("../../prompts/system_persona.txt");
const CLASSIFY_WEATHER_NEED: &str = include_str!("../../prompts/classify_weather_need.txt");
const EXTRACT_CITY: &str = include_str!("../../prompts/extract_city.txt");

const FIRST_MESSAGE_STAGE: &str = "Este es el PRIMER mensaje de la conversación: empieza con un saludo breve y amable (ej: \"¡Hola! 👋\").";
const CONTINUATION_STAGE: &str = "La conversación ya está en curso: NO vuelvas a saludar, continúa directamente con la respuesta.";
const UNKNOWN_LOCATION: &str =
    "No se conoce la ciudad de interés del usuario; no la supongas.";

/// Render the fixed WeatherBot persona
pub fn system_prompt(is_first_message: bool, user_city: Option<&str>) -> String {
    let stage = if is_first_message {
        FIRST_MESSAGE_STAGE
    } else {
        CONTINUATION_STAGE
    };

    let location = match user_city.map(str::trim).filter(|c| !c.is_empty()) {
        Some(city) => format!(
            "Ciudad de interés del usuario en este mensaje: {}. Solo usa datos de esa ciudad si aparecen en el contexto.",
            city
        ),
        None => UNKNOWN_LOCATION.to_string(),
    };

    SYSTEM_PERSONA
        .replace("{{conversation_stage}}", stage)
        .replace("{{user_location}}", &location)
}

/// Prompt asking whether a message needs live weather data (answer SI/NO)
pub fn classification_prompt(message: &str) -> String {
    CLASSIFY_WEATHER_NEED.replace("{{message}}", &quote_safe(message))
}

/// Prompt asking for the city named in a message (or NINGUNA)
pub fn extraction_prompt(message: &str) -> String {
    EXTRACT_CITY.replace("{{message}}", &quote_safe(message))
}

// The message is embedded between double quotes in the templates
fn quote_safe(message: &str) -> String {
    message.replace('"', "'")
}
