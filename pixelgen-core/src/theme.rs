//! Prompt diversification for the topic model.
//!
//! Each round samples a theme from a few fixed pools (visual style, game
//! setting, game object) and wraps it in an instruction that also lists the
//! recent topics the model must avoid. Sampling takes the random source as a
//! parameter so tests can seed it.

use crate::history::TopicHistory;
use rand::seq::SliceRandom;
use rand::Rng;

/// Canvas width every animation targets.
pub const CANVAS_WIDTH: u32 = 192;

/// Canvas height every animation targets.
pub const CANVAS_HEIGHT: u32 = 108;

/// Word ceiling the topic model is told to respect.
pub const MAX_TOPIC_WORDS: usize = 6;

pub const STYLES: &[&str] = &[
    "8-bit",
    "16-bit",
    "Low Poly",
    "Voxel",
    "PS1 Aesthetic",
    "Game Boy Green",
    "CGA Graphics",
    "Atari 2600",
    "Vector Arcade",
    "Cel Shaded",
    "Hand Drawn Indie",
    "CRT Filter",
    "Scanlines",
    "LCD Screen",
    "Dithering",
    "Isometric",
    "2.5D",
    "Paper Mario Style",
    "Y2K Aesthetic",
    "Glitch Art",
    "Retro FPS",
    "Text Adventure",
    "ASCII Art",
    "Wireframe",
    "Minecraft Style",
    "Roblox Style",
    "N64 Blur",
    "Sega Genesis",
    "SNES Mode 7",
    "Commodore 64",
];

pub const SETTINGS: &[&str] = &[
    "Tutorial Level",
    "Boss Arena",
    "Safe Room",
    "Item Shop",
    "Character Select Screen",
    "Underwater Level",
    "Lava Castle",
    "Ice World",
    "Sky Fortress",
    "Sewers",
    "Dungeon",
    "Forest Zone",
    "Desert Temple",
    "Space Station",
    "Cyber City",
    "Haunted Mansion",
    "Racing Track",
    "Bonus Stage",
    "Glitch World",
    "Dev Room",
    "Empty Server",
    "Corrupted Save File",
    "Waiting Lobby",
    "Final Destination",
    "Secret Level",
    "Retro Arcade",
    "Esports Arena",
    "Speedrun Route",
    "Hub World",
    "Loading Screen",
    "Game Over Screen",
    "Victory Podium",
    "Inventory Screen",
    "Skill Tree",
    "Map Screen",
    "Cutscene",
    "QTE Sequence",
    "Crafting Bench",
    "Loot Cave",
    "Gachapon Shop",
];

pub const ELEMENTS: &[&str] = &[
    "Power-up",
    "Health Potion",
    "Mana Potion",
    "Epic Loot",
    "Quest Item",
    "NPC",
    "Final Boss",
    "Mini Boss",
    "Trash Mob",
    "Speedrunner",
    "Noob",
    "Pro Player",
    "Streamer",
    "Griefer",
    "Camper",
    "Save Point",
    "Checkpoint",
    "Spawn Point",
    "Hitbox",
    "Bug/Glitch",
    "Lag",
    "High Score",
    "Achievement",
    "Easter Egg",
    "Cheat Code",
    "Dialogue Box",
    "Health Bar",
    "Minimap",
    "Crosshair",
    "Combo Counter",
    "Critical Hit",
    "Double Jump",
    "Wall Run",
    "Rocket Jump",
    "Teabagging",
    "Rage Quit",
    "Speed Potion",
    "Extra Life",
    "Game Cartridge",
    "Joystick",
    "Keyboard & Mouse",
    "VR Headset",
    "CRT Monitor",
    "Pixel",
    "Voxel",
    "Sprite",
    "Texture",
    "Mesh",
    "Polygon",
    "Shader",
];

/// A pool of theme values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeAxis {
    Style,
    Setting,
    Element,
}

impl ThemeAxis {
    pub const ALL: [ThemeAxis; 3] = [ThemeAxis::Style, ThemeAxis::Setting, ThemeAxis::Element];

    /// Axes that may accompany a style.
    pub const SECONDARY: [ThemeAxis; 2] = [ThemeAxis::Setting, ThemeAxis::Element];

    pub fn pool(self) -> &'static [&'static str] {
        match self {
            ThemeAxis::Style => STYLES,
            ThemeAxis::Setting => SETTINGS,
            ThemeAxis::Element => ELEMENTS,
        }
    }

    /// Label used inside the instruction text.
    pub fn label(self) -> &'static str {
        match self {
            ThemeAxis::Style => "Style",
            ThemeAxis::Setting => "Setting",
            ThemeAxis::Element => "Object/Mechanic",
        }
    }
}

/// How many axes a round samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    /// A style is always drawn, plus one of setting or element.
    #[default]
    StylePlusSecondary,
    /// Exactly one axis, drawn uniformly from all three.
    SingleAxis,
}

/// One sampled axis value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeChoice {
    pub axis: ThemeAxis,
    pub value: &'static str,
}

/// The instruction handed to the topic model, plus what was sampled.
#[derive(Debug, Clone)]
pub struct ThemeInstruction {
    /// Full prompt text.
    pub text: String,
    /// Sampled axis values in prompt order.
    pub choices: Vec<ThemeChoice>,
}

impl ThemeInstruction {
    /// The sampled visual style, if a style axis was drawn.
    pub fn style(&self) -> Option<&'static str> {
        self.choices
            .iter()
            .find(|c| c.axis == ThemeAxis::Style)
            .map(|c| c.value)
    }

    /// Human-readable theme constraint, e.g. `Style: 8-bit + Setting: Sewers`.
    pub fn theme(&self) -> String {
        describe(&self.choices)
    }
}

/// Sample the axes for one round.
pub fn sample_theme<R: Rng + ?Sized>(mode: ThemeMode, rng: &mut R) -> Vec<ThemeChoice> {
    let axes = match mode {
        ThemeMode::StylePlusSecondary => {
            let secondary = pick(&ThemeAxis::SECONDARY, rng).unwrap_or(ThemeAxis::Setting);
            vec![ThemeAxis::Style, secondary]
        }
        ThemeMode::SingleAxis => vec![pick(&ThemeAxis::ALL, rng).unwrap_or(ThemeAxis::Style)],
    };

    axes.into_iter()
        .map(|axis| ThemeChoice {
            axis,
            value: pick(axis.pool(), rng).unwrap_or_default(),
        })
        .collect()
}

/// Build the topic-model instruction for this round.
pub fn build_theme_instruction<R: Rng + ?Sized>(
    history: &TopicHistory,
    mode: ThemeMode,
    rng: &mut R,
) -> ThemeInstruction {
    let choices = sample_theme(mode, rng);
    let text = format_instruction(&describe(&choices), history);
    ThemeInstruction { text, choices }
}

fn format_instruction(theme: &str, history: &TopicHistory) -> String {
    let mut text = format!(
        "Generate a creative, UNIQUE idea for a {CANVAS_WIDTH}x{CANVAS_HEIGHT} (16:9) pixel art animation.\n\
         \n\
         Constraint: Use ONLY this theme constraint: {theme}.\n\
         \n\
         Strictly follow the format: \"[Object/Creature/Event] in [Setting]\".\n\
         Keep it clean and minimalist.\n\
         AVOID GENERIC IDEAS like \"duck on pond\".\n\
         Examples: \"red dragon in snowy cave\", \"spaceship flying over mars\", \"knight resting at save point\".\n"
    );

    if !history.is_empty() {
        let recent = history.iter().collect::<Vec<_>>().join(", ");
        text.push_str(&format!("Do NOT use these recent topics: {recent}\n"));
    }

    text.push_str(&format!(
        "Output ONLY the description. Strictly keep it UNDER {MAX_TOPIC_WORDS} WORDS."
    ));
    text
}

fn describe(choices: &[ThemeChoice]) -> String {
    choices
        .iter()
        .map(|c| format!("{}: {}", c.axis.label(), c.value))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn pick<T: Copy, R: Rng + ?Sized>(pool: &[T], rng: &mut R) -> Option<T> {
    pool.choose(rng).copied()
}
