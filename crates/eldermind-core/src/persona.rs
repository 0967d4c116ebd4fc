use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Behavioral tag sent with every request to steer the assistant's voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persona {
    #[default]
    Scholar,
    InCharacter,
    Npc,
    Daedric,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown persona: {0} (expected scholar, in-character, npc or daedric)")]
pub struct PersonaParseError(pub String);

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Scholar => "scholar",
            Persona::InCharacter => "in-character",
            Persona::Npc => "npc",
            Persona::Daedric => "daedric",
        }
    }

    pub fn all() -> Vec<Persona> {
        vec![
            Persona::Scholar,
            Persona::InCharacter,
            Persona::Npc,
            Persona::Daedric,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Scholar => "Scholar (lore-accurate)",
            Persona::InCharacter => "In-Character (Tamrielic voice)",
            Persona::Npc => "NPC (tavern gossip)",
            Persona::Daedric => "Daedric (a Prince speaks)",
        }
    }
}

impl FromStr for Persona {
    type Err = PersonaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scholar" => Ok(Persona::Scholar),
            "in-character" => Ok(Persona::InCharacter),
            "npc" => Ok(Persona::Npc),
            "daedric" => Ok(Persona::Daedric),
            other => Err(PersonaParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for persona in Persona::all() {
            assert_eq!(persona.as_str().parse::<Persona>(), Ok(persona));
        }
    }

    #[test]
    fn serde_uses_kebab_case_wire_names() {
        let json = serde_json::to_string(&Persona::InCharacter).unwrap();
        assert_eq!(json, "\"in-character\"");

        let parsed: Persona = serde_json::from_str("\"daedric\"").unwrap();
        assert_eq!(parsed, Persona::Daedric);
    }

    #[test]
    fn parsing_ignores_case_and_surrounding_space() {
        assert_eq!(" NPC ".parse::<Persona>(), Ok(Persona::Npc));
        assert_eq!("In-Character".parse::<Persona>(), Ok(Persona::InCharacter));
    }

    #[test]
    fn unknown_persona_is_rejected() {
        let err = "bard".parse::<Persona>().unwrap_err();
        assert_eq!(err, PersonaParseError("bard".to_string()));
    }

    #[test]
    fn default_is_scholar() {
        assert_eq!(Persona::default(), Persona::Scholar);
    }
}
