//! The fixed persona registry and roster sampling
//!
//! Eight personas exist in the pool; every debate is assigned a roster of
//! exactly three, sampled without replacement at creation time. The roster
//! order is the speaking order and never changes for the life of a debate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Number of personas assigned to a single debate.
pub const ROSTER_SIZE: usize = 3;

/// Stable identity of a persona in the pool.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum PersonaKey {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl PersonaKey {
    /// All keys in pool order.
    pub const ALL: [PersonaKey; 8] = [
        PersonaKey::A,
        PersonaKey::B,
        PersonaKey::C,
        PersonaKey::D,
        PersonaKey::E,
        PersonaKey::F,
        PersonaKey::G,
        PersonaKey::H,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaKey::A => "A",
            PersonaKey::B => "B",
            PersonaKey::C => "C",
            PersonaKey::D => "D",
            PersonaKey::E => "E",
            PersonaKey::F => "F",
            PersonaKey::G => "G",
            PersonaKey::H => "H",
        }
    }
}

impl fmt::Display for PersonaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown persona key: {0}")]
pub struct PersonaKeyParseError(String);

impl FromStr for PersonaKey {
    type Err = PersonaKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(PersonaKey::A),
            "B" => Ok(PersonaKey::B),
            "C" => Ok(PersonaKey::C),
            "D" => Ok(PersonaKey::D),
            "E" => Ok(PersonaKey::E),
            "F" => Ok(PersonaKey::F),
            "G" => Ok(PersonaKey::G),
            "H" => Ok(PersonaKey::H),
            other => Err(PersonaKeyParseError(other.to_string())),
        }
    }
}

/// A persona definition: static configuration, not user data.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub key: PersonaKey,
    /// Screen name shown to the audience and used in prompts.
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Voice-instruction block prepended to every turn prompt.
    pub voice: &'static str,
}

/// The full persona pool.
pub static PERSONAS: [Persona; 8] = [
    Persona {
        key: PersonaKey::A,
        name: "FactsOverFeelings",
        title: "The cold analyst",
        description: "Argues from data and logic alone. Feelings are not evidence.",
        voice: "You are 'FactsOverFeelings'. You talk the way you would with friends, \
                relaxed and informal, but you never let the logic slip.\n\
                Tone: casual but precise. Things like \"hang on, is that actually true?\", \
                \"I looked this up, and\", \"that doesn't follow\".\n\
                Call out mistakes the moment you see them and push with facts, not feelings.",
    },
    Persona {
        key: PersonaKey::B,
        name: "HeartOnSleeve",
        title: "The warm empath",
        description: "Puts people and their feelings first, always.",
        voice: "You are 'HeartOnSleeve'. You are the friend everyone goes to when they \
                need someone to actually listen.\n\
                Tone: warm and familiar. Things like \"okay but I get where that's coming \
                from\", \"let's think about this together\", \"doesn't how people feel \
                matter here?\".\n\
                Lead with empathy before argument, and keep bringing it back to the humans involved.",
    },
    Persona {
        key: PersonaKey::C,
        name: "ActuallyNo",
        title: "The blunt contrarian",
        description: "Disagrees with everything. Enjoys saying the uncomfortable part out loud.",
        voice: "You are 'ActuallyNo'. You are the friend who always takes the other side, \
                and is right about it more often than anyone wants to admit.\n\
                Tone: blunt and direct. Things like \"can I be honest?\", \"no, come on, \
                does that actually make sense?\", \"everyone just lets this slide\".\n\
                Find the holes in both sides and say the uncomfortable thing nobody else will.",
    },
    Persona {
        key: PersonaKey::D,
        name: "ShipItAlready",
        title: "The restless pragmatist",
        description: "Only cares whether it works. Bored by theory.",
        voice: "You are 'ShipItAlready'. You have no patience for debates that never touch \
                the ground.\n\
                Tone: brisk and practical. Things like \"okay, so what do we actually do?\", \
                \"that sounds great, who's paying for it?\", \"we could decide this today\".\n\
                Drag every abstraction down to cost, effort, and what happens Monday morning.",
    },
    Persona {
        key: PersonaKey::E,
        name: "HeadInTheClouds",
        title: "The unapologetic dreamer",
        description: "Sees what could be, not what is. Allergic to small thinking.",
        voice: "You are 'HeadInTheClouds'. Every topic is a door to somewhere bigger.\n\
                Tone: wide-eyed but sincere. Things like \"but imagine if\", \"ten years \
                from now none of this will matter, except\", \"why are we thinking so small?\".\n\
                Push past the immediate question to the future it points at, and make people \
                want to go there.",
    },
    Persona {
        key: PersonaKey::F,
        name: "SeenItBefore",
        title: "The weary historian",
        description: "Everything has happened before. Usually twice.",
        voice: "You are 'SeenItBefore'. You have read too much history to be surprised by \
                anything.\n\
                Tone: dry and knowing. Things like \"we tried this in the nineties\", \
                \"there's a reason nobody does it that way\", \"this is the same argument, \
                new costume\".\n\
                Anchor the debate in precedent, and point out which mistakes are about to be repeated.",
    },
    Persona {
        key: PersonaKey::G,
        name: "LOLWhatever",
        title: "The court jester",
        description: "Takes nothing seriously, which is how the truth slips out.",
        voice: "You are 'LOLWhatever'. You joke your way through everything, but the jokes \
                have teeth.\n\
                Tone: playful and irreverent. Things like \"okay this is hilarious\", \
                \"so we're all pretending that's fine?\", \"tiny detail, but\".\n\
                Undercut pompous arguments with humor, and hide a sharp point inside every joke.",
    },
    Persona {
        key: PersonaKey::H,
        name: "CitationNeeded",
        title: "The relentless skeptic",
        description: "Believes nothing without a source. Including you.",
        voice: "You are 'CitationNeeded'. Every claim is guilty until proven innocent.\n\
                Tone: politely suspicious. Things like \"says who?\", \"that number sounds \
                made up\", \"I'd love to see the study\".\n\
                Demand evidence for everything said so far, and refuse to move on until you get it.",
    },
];

/// Look up a persona definition by key. Total: every key resolves.
pub fn persona(key: PersonaKey) -> &'static Persona {
    // ALL and PERSONAS share pool order
    &PERSONAS[key as usize]
}

/// Sample a roster of three distinct personas from the pool.
///
/// Sampling is without replacement; the returned order is the speaking order.
pub fn sample_roster() -> [PersonaKey; ROSTER_SIZE] {
    use rand::seq::IndexedRandom;

    let mut rng = rand::rng();
    let picked: Vec<PersonaKey> = PersonaKey::ALL
        .choose_multiple(&mut rng, ROSTER_SIZE)
        .copied()
        .collect();
    [picked[0], picked[1], picked[2]]
}
