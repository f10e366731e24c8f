//! WMO weather-condition codes to Spanish descriptions

/// Description for codes outside the table
pub const UNKNOWN_CONDITION: &str = "Condición meteorológica desconocida";

/// Human-readable description for a weather code; never fails
pub fn describe(code: i64) -> &'static str {
    match code {
        0 => "Despejado",
        1 => "Principalmente despejado",
        2 => "Parcialmente nublado",
        3 => "Nublado",
        45 => "Neblina",
        48 => "Neblina con escarcha",
        51 => "Llovizna ligera",
        53 => "Llovizna moderada",
        55 => "Llovizna intensa",
        61 => "Lluvia ligera",
        63 => "Lluvia moderada",
        65 => "Lluvia intensa",
        71 => "Nevada ligera",
        73 => "Nevada moderada",
        75 => "Nevada intensa",
        80 => "Chubascos ligeros",
        81 => "Chubascos moderados",
        82 => "Chubascos intensos",
        95 => "Tormenta",
        96 => "Tormenta con granizo ligero",
        99 => "Tormenta con granizo intenso",
        _ => UNKNOWN_CONDITION,
    }
}
